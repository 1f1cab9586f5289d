pub mod calibration;
pub mod collector;
pub mod dataset;
pub mod tilt;
