use crate::{
    constants::{REPORT_ID, REPORT_SIZE},
    modules::tilt::to_horizontal,
};
use core::fmt::Write;

pub mod codec;
pub mod frame;
pub mod uart;

/// Values crossing the acquisition channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Message {
    Reading(Reading),
    /// The byte source failed. Nothing follows it.
    TransportFailed,
}

/// One decoded sensor report. Angles in degrees, fields in micro-tesla.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Reading {
    pub roll: f64,
    pub pitch: f64,
    pub heading: f64,
    pub raw: (f64, f64, f64),
    pub corrected: (f64, f64, f64),
}

impl Reading {
    pub fn from_payload(payload: &[u8; REPORT_SIZE]) -> Self {
        let field = |index: usize| [payload[2 * index], payload[2 * index + 1]];

        Self {
            roll: codec::decode_angle(field(0), true),
            pitch: codec::decode_angle(field(1), true),
            heading: codec::decode_angle(field(2), false),
            raw: (
                codec::decode_field(field(3)),
                codec::decode_field(field(4)),
                codec::decode_field(field(5)),
            ),
            corrected: (
                codec::decode_field(field(6)),
                codec::decode_field(field(7)),
                codec::decode_field(field(8)),
            ),
        }
    }

    pub fn to_payload(&self) -> [u8; REPORT_SIZE] {
        let fields = [
            codec::encode_angle(self.roll, true),
            codec::encode_angle(self.pitch, true),
            codec::encode_angle(self.heading, false),
            codec::encode_field(self.raw.0),
            codec::encode_field(self.raw.1),
            codec::encode_field(self.raw.2),
            codec::encode_field(self.corrected.0),
            codec::encode_field(self.corrected.1),
            codec::encode_field(self.corrected.2),
        ];

        let mut payload = [0; REPORT_SIZE];
        for (chunk, bytes) in payload.chunks_exact_mut(2).zip(fields) {
            chunk.copy_from_slice(&bytes);
        }
        payload
    }

    /// Same reading with the raw body-frame field projected to the horizontal plane.
    ///
    /// The sensor reports the field as `(y, x, z)`: roll turns the first and
    /// third wire fields, pitch the second and third.
    pub fn leveled(&self) -> Self {
        let (y, x, z) = self.raw;
        let (x, y, z) = to_horizontal(x, y, z, self.roll, self.pitch);

        Self {
            raw: (y, x, z),
            ..*self
        }
    }

    /// Delimited log row: report id, attitude, raw field, corrected field.
    pub fn to_row(&self) -> String {
        let mut row = format!("{:#x}", REPORT_ID);
        for value in [
            self.roll,
            self.pitch,
            self.heading,
            self.raw.0,
            self.raw.1,
            self.raw.2,
            self.corrected.0,
            self.corrected.1,
            self.corrected.2,
        ] {
            let _ = write!(row, ",{:.3}", value);
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn reading() -> Reading {
        Reading {
            roll: 1.5,
            pitch: -2.25,
            heading: 123.4,
            raw: (10., -20., 30.),
            corrected: (11., -19., 31.),
        }
    }

    #[test]
    fn test_payload_layout() {
        let payload = reading().to_payload();

        assert_eq!([payload[0], payload[1]], codec::encode_angle(1.5, true));
        assert_eq!([payload[4], payload[5]], codec::encode_angle(123.4, false));
        assert_eq!([payload[16], payload[17]], codec::encode_field(31.));

        let decoded = Reading::from_payload(&payload);
        assert_abs_diff_eq!(decoded.heading, 123.4, epsilon = 0.0055);
        assert_abs_diff_eq!(decoded.raw.1, -20., epsilon = 0.0115);
        assert_abs_diff_eq!(decoded.corrected.2, 31., epsilon = 0.0115);
    }

    #[test]
    fn test_leveled_keeps_attitude() {
        let level = Reading {
            roll: 0.,
            pitch: 0.,
            ..reading()
        };
        let leveled = level.leveled();

        assert_eq!(leveled.heading, level.heading);
        assert_eq!(leveled.corrected, level.corrected);
        assert_abs_diff_eq!(leveled.raw.0, 10.);
        assert_abs_diff_eq!(leveled.raw.1, -20.);
        assert_abs_diff_eq!(leveled.raw.2, -30.);
    }

    #[test]
    fn test_leveled_wire_axes() {
        let rolled = Reading {
            roll: 90.,
            pitch: 0.,
            raw: (1., 2., 3.),
            ..reading()
        };
        let (y, x, z) = rolled.leveled().raw;
        assert_abs_diff_eq!(y, 3., epsilon = 1e-12);
        assert_abs_diff_eq!(x, 2., epsilon = 1e-12);
        assert_abs_diff_eq!(z, 1., epsilon = 1e-12);

        let pitched = Reading {
            roll: 0.,
            pitch: 90.,
            raw: (1., 2., 3.),
            ..reading()
        };
        let (y, x, z) = pitched.leveled().raw;
        assert_abs_diff_eq!(y, 1., epsilon = 1e-12);
        assert_abs_diff_eq!(x, -3., epsilon = 1e-12);
        assert_abs_diff_eq!(z, -2., epsilon = 1e-12);
    }

    #[test]
    fn test_row() {
        assert_eq!(
            reading().to_row(),
            "0x70,1.500,-2.250,123.400,10.000,-20.000,30.000,11.000,-19.000,31.000"
        );
    }
}
