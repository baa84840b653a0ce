//! Incremental decoding of streamed response bodies.
pub mod frames;
pub mod json_stream;
