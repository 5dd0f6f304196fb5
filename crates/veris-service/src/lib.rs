#![forbid(unsafe_code)]
#![doc = "Transport-agnostic signature verification services."]

mod info;
mod service;

pub use info::{IssuerInfo, SignatureInfo, SubjectInfo};
pub use service::SignatureService;

pub use veris_pki::x509::TrustStore;
pub use veris_types::SigError;
