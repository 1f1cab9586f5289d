pub mod config;
pub mod constants;
pub mod hardware;
pub mod modules;
pub mod utils;

pub use config::{Config, ConfigError};
pub use hardware::{
    frame::FrameDecoder,
    uart::{Acquisition, ByteSource, ReadSource, ReceiveError, Receiver, StopError, TransportError},
    Message, Reading,
};
pub use modules::{
    calibration::{fit, CalibrationError, CalibrationModel, Rotation},
    collector::Collector,
    tilt::to_horizontal,
};
