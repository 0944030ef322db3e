//! Bit-level codec: bit reader/writer, calibration laws, scalar encodings and
//! the public content-model trait.
pub mod bits;
pub mod calibration;
pub mod engine;
pub mod traits;
