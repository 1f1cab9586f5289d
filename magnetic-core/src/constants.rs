pub const SYNC_1: u8 = 0x0d;
pub const SYNC_2: u8 = 0x0a;
pub const SYNC_3: u8 = 0x7e;

pub const REPORT_ID: u8 = 0x70;
pub const REPORT_FIELDS: usize = 9;
pub const REPORT_SIZE: usize = REPORT_FIELDS * 2;

// sync + id + size + payload
pub const FRAME_SIZE: usize = 3 + 1 + 1 + REPORT_SIZE;
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

pub const ANGLE_SCALE: f64 = 359.9 / 65536.;
pub const FIELD_SCALE: f64 = 750. / 65536.;

pub const SECTOR_WIDTH: f64 = 10.;
pub const SECTOR_COUNT: usize = 36;

// below this minor to major axis ratio the soft-iron matrix is singular
pub const MIN_AXIS_RATIO: f64 = 1e-6;
