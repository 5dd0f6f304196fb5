/// Low-level ASN.1 TLV codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("null or empty input")]
    NullInput,
    #[error("truncated element")]
    Truncated,
    #[error("invalid tag")]
    InvalidTag,
    #[error("invalid length")]
    InvalidLength,
    #[error("indefinite length is not valid in DER")]
    IndefiniteLength,
    #[error("unexpected tag")]
    UnexpectedTag,
    #[error("invalid value")]
    InvalidValue,
}

/// Failures surfaced by the signature-verification operations.
///
/// The four variants carry a human-readable message; orchestration
/// layers prepend stable prefixes via [`SigError::context`] so the
/// original cause stays inspectable.
#[derive(Debug, thiserror::Error)]
pub enum SigError {
    /// Malformed base64, malformed ASN.1/BER, or a structure that does
    /// not match the expected CMS/X.509 schema.
    #[error("{0}")]
    Format(String),
    /// A required structural element (signer certificate, signerInfo)
    /// is absent.
    #[error("{0}")]
    NotFound(String),
    /// The signer certificate is not backed by any configured CA.
    #[error("{0}")]
    Trust(String),
    /// Missing or invalid caller input.
    #[error("{0}")]
    Validation(String),
}

impl SigError {
    pub fn format(msg: impl Into<String>) -> Self {
        SigError::Format(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        SigError::NotFound(msg.into())
    }

    pub fn trust(msg: impl Into<String>) -> Self {
        SigError::Trust(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        SigError::Validation(msg.into())
    }

    /// Prefix the message with `prefix` while keeping the variant, so
    /// wrapped errors keep their category through orchestration layers.
    pub fn context(self, prefix: &str) -> Self {
        match self {
            SigError::Format(m) => SigError::Format(format!("{prefix}: {m}")),
            SigError::NotFound(m) => SigError::NotFound(format!("{prefix}: {m}")),
            SigError::Trust(m) => SigError::Trust(format!("{prefix}: {m}")),
            SigError::Validation(m) => SigError::Validation(format!("{prefix}: {m}")),
        }
    }
}

impl From<CodecError> for SigError {
    fn from(e: CodecError) -> Self {
        SigError::Format(format!("ASN.1 parsing failed: {e}"))
    }
}
