#![forbid(unsafe_code)]
#![doc = "Utility modules for veris: ASN.1, OID, PEM, calendar time."]

#[cfg(feature = "asn1")]
pub mod asn1;

#[cfg(feature = "oid")]
pub mod oid;

#[cfg(feature = "pem")]
pub mod pem;

pub mod time;
