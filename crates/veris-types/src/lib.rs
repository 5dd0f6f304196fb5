#![forbid(unsafe_code)]
#![doc = "Common types and error taxonomy for the veris signature-verification core."]

pub mod error;

pub use error::*;
