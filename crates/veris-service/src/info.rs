//! The signature-info DTO returned to callers.

use serde::{Deserialize, Serialize};

/// Subject identity fields extracted from the signer certificate.
/// Attributes the certificate does not carry come back as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectInfo {
    pub common_name: String,
    pub surname: String,
    pub given_name: String,
    /// The X.520 initials attribute.
    pub middle_name: String,
    pub organization_name: String,
    pub organization_identifier: String,
    pub country_name: String,
    pub locality_name: String,
    /// eIDAS natural-person identifier.
    pub person_identifier: String,
    pub serial_number: String,
}

/// Issuer identity fields extracted from the signer certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerInfo {
    pub common_name: String,
    pub organization_name: String,
    pub organization_identifier: String,
    pub country_name: String,
    pub locality_name: String,
}

/// Everything a caller learns about a signature: who signed, under
/// which issuer, when, over what content, plus the signer certificate
/// itself in PEM form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub subject: SubjectInfo,
    pub issuer: IssuerInfo,
    /// Certificate serial as uppercase hex, byte-exact against the DER
    /// INTEGER value.
    pub serial: String,
    /// ISO-8601 signing time from the signed attributes, or empty.
    pub sign_time: String,
    /// Embedded content as base64; absent for a detached signature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Signer certificate, PEM-framed.
    pub pem: String,
}
