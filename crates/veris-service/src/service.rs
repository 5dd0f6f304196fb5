//! Signature parsing, hash verification, hashing, and reconstruction.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use tracing::debug;
use veris_pki::cms::{ContentInfo, SignedData};
use veris_pki::x509::{Certificate, TrustStore};
use veris_types::SigError;
use veris_utils::oid::known;
use veris_utils::time::to_iso8601;

use crate::info::{IssuerInfo, SignatureInfo, SubjectInfo};

/// Standard-alphabet engine that tolerates missing trailing padding on
/// decode; encoding always pads.
const B64_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// The long-lived signature verification service. Constructed once at
/// startup around an immutable trust store; every method takes `&self`
/// and keeps no per-call state, so calls may run fully in parallel.
pub struct SignatureService {
    trust: TrustStore,
}

impl SignatureService {
    pub fn new(trust: TrustStore) -> Self {
        Self { trust }
    }

    pub fn trust_store(&self) -> &TrustStore {
        &self.trust
    }

    /// Decode and parse a base64 CMS SignedData blob.
    pub fn parse_signature(&self, signature_b64: &str) -> Result<SignedData, SigError> {
        self.parse_signature_inner(signature_b64)
            .map_err(|e| e.context("Failed to parse signature"))
    }

    fn parse_signature_inner(&self, signature_b64: &str) -> Result<SignedData, SigError> {
        let der = STANDARD
            .decode(signature_b64)
            .map_err(|e| SigError::format(format!("invalid base64-encoded string: {e}")))?;
        let content_info = ContentInfo::from_der(&der)?;
        Ok(content_info.signed_data)
    }

    /// Extract signer and issuer identity from a signature, enforcing
    /// that the signer certificate is backed by a trusted CA.
    pub fn signature_info(&self, signature_b64: &str) -> Result<SignatureInfo, SigError> {
        self.signature_info_inner(signature_b64)
            .map_err(|e| e.context("Failed to parse or extract signature info"))
    }

    fn signature_info_inner(&self, signature_b64: &str) -> Result<SignatureInfo, SigError> {
        let signed_data = self.parse_signature(signature_b64)?;
        let signer_cert = find_signer_certificate(&signed_data)?;

        if !self.trust.is_signed_by_trusted_ca(signer_cert) {
            return Err(SigError::trust("Certificate is not signed by a trusted CA"));
        }

        let signer_info = signed_data
            .signer_infos
            .first()
            .ok_or_else(|| SigError::not_found("No signerInfo found in signature"))?;

        let subject = &signer_cert.subject;
        let issuer = &signer_cert.issuer;
        let dn = |name: &veris_pki::x509::DistinguishedName, oid: &veris_utils::oid::Oid| {
            name.get(oid).unwrap_or_default().to_string()
        };

        Ok(SignatureInfo {
            subject: SubjectInfo {
                common_name: dn(subject, &known::common_name()),
                surname: dn(subject, &known::surname()),
                given_name: dn(subject, &known::given_name()),
                middle_name: dn(subject, &known::initials()),
                organization_name: dn(subject, &known::organization_name()),
                organization_identifier: dn(subject, &known::organization_identifier()),
                country_name: dn(subject, &known::country_name()),
                locality_name: dn(subject, &known::locality_name()),
                person_identifier: dn(subject, &known::person_identifier()),
                serial_number: dn(subject, &known::serial_number_attr()),
            },
            issuer: IssuerInfo {
                common_name: dn(issuer, &known::common_name()),
                organization_name: dn(issuer, &known::organization_name()),
                organization_identifier: dn(issuer, &known::organization_identifier()),
                country_name: dn(issuer, &known::country_name()),
                locality_name: dn(issuer, &known::locality_name()),
            },
            serial: signer_cert.serial_hex(),
            sign_time: signer_info
                .signing_time
                .map(to_iso8601)
                .unwrap_or_default(),
            content: signed_data
                .encap_content_info
                .e_content
                .as_deref()
                .map(|c| STANDARD.encode(c)),
            pem: signer_cert.to_pem(),
        })
    }

    /// Check that `hash_b64` is the SHA-256 of the signature's embedded
    /// content and that the signer certificate is trusted.
    ///
    /// Never errors: every failure mode resolves to `false`.
    pub fn verify_hash(&self, hash_b64: &str, signature_b64: &str) -> bool {
        let signed_data = match self.parse_signature(signature_b64) {
            Ok(sd) => sd,
            Err(e) => {
                debug!(error = %e, "hash verification failed at parse stage");
                return false;
            }
        };
        let signer_cert = match find_signer_certificate(&signed_data) {
            Ok(cert) => cert,
            Err(e) => {
                debug!(error = %e, "hash verification found no signer certificate");
                return false;
            }
        };
        if !self.trust.is_signed_by_trusted_ca(signer_cert) {
            debug!("hash verification rejected untrusted signer certificate");
            return false;
        }
        let Some(content) = signed_data.encap_content_info.e_content.as_deref() else {
            debug!("hash verification requires embedded content, signature is detached");
            return false;
        };
        let digest = Sha256::digest(content);
        STANDARD.encode(digest) == hash_b64
    }

    /// SHA-256 over base64-carried data, returned as base64 or hex.
    pub fn hash_data(&self, data_b64: &str, as_base64: bool) -> Result<String, SigError> {
        let decoded = B64_LENIENT
            .decode(data_b64)
            .map_err(|_| SigError::validation("invalid base64-encoded string"))?;
        // Round-trip check, modulo trailing padding: rejects inputs the
        // lenient decoder accepted but that are not canonical base64.
        let reencoded = STANDARD.encode(&decoded);
        if reencoded.trim_end_matches('=') != data_b64.trim_end_matches('=') {
            return Err(SigError::validation("invalid base64-encoded string"));
        }
        let digest = Sha256::digest(&decoded);
        if as_base64 {
            Ok(STANDARD.encode(digest))
        } else {
            Ok(hex::encode(digest))
        }
    }

    /// Reattach content to a detached signature, producing a
    /// self-contained SignedData blob.
    ///
    /// Nothing is re-verified or re-signed; callers needing an
    /// integrity guarantee pair this with [`SignatureService::verify_hash`].
    pub fn to_internal_signature(
        &self,
        signature_b64: &str,
        content_b64: Option<&str>,
    ) -> Result<String, SigError> {
        let content_b64 = match content_b64 {
            Some(c) if !c.is_empty() => c,
            _ => return Err(SigError::validation("Missing content for detached signature")),
        };
        let content = STANDARD
            .decode(content_b64)
            .map_err(|_| SigError::validation("invalid base64-encoded string"))?;
        let signed_data = self.parse_signature(signature_b64)?;
        let rebuilt = signed_data.reattach(&content);
        Ok(STANDARD.encode(rebuilt))
    }
}

/// Pick the signer certificate out of a SignedData.
///
/// Prefers a certificate whose basicConstraints extension is present
/// with cA false; when none carries the extension, the first
/// certificate is used. Selection does not consult signerInfo.sid, so
/// with several end-entity certificates embedded the first match wins.
fn find_signer_certificate(signed_data: &SignedData) -> Result<&Certificate, SigError> {
    let certs = &signed_data.certificates;
    if certs.is_empty() {
        return Err(SigError::not_found("No signer certificate found in signature"));
    }
    let end_entity = certs.iter().find(|cert| {
        matches!(cert.basic_constraints(), Ok(Some(bc)) if !bc.is_ca)
    });
    Ok(end_entity.unwrap_or(&certs[0]))
}
