#![forbid(unsafe_code)]
#![doc = "X.509 and CMS structures plus trust validation for the veris core."]

#[cfg(feature = "x509")]
pub mod x509;

#[cfg(feature = "cms")]
pub mod cms;
