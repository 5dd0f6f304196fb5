//! X.509 certificate model, extensions, and trust validation.

mod certificate;
mod extensions;
mod trust;

pub use certificate::{Certificate, DistinguishedName, SubjectPublicKeyInfo, X509Extension};
pub use extensions::BasicConstraints;
pub use trust::TrustStore;

pub(crate) use certificate::{parse_algorithm_identifier, parse_name};
