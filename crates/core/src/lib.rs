//! Domain logic for the vocalstrip separation service.
//!
//! Everything here is independent of HTTP: upload validation, filename
//! sanitizing, per-request output tokens, and the Demucs subprocess runner.

pub mod error;
pub mod separation;
pub mod token;
pub mod upload;
