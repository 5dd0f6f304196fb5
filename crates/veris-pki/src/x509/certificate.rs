//! Core X.509 types and DER/PEM parsing.

use veris_types::SigError;
use veris_utils::asn1::{tags, Decoder, TagClass};
use veris_utils::oid::{known, Oid};

// ---------------------------------------------------------------------------
// Core type definitions
// ---------------------------------------------------------------------------

/// An X.509 certificate. Never mutated after parsing.
#[derive(Debug, Clone)]
pub struct Certificate {
    /// DER-encoded certificate data (kept for PEM export and byte-exact
    /// hashing).
    pub raw: Vec<u8>,
    /// Certificate version (typically 3, encoded as 2).
    pub version: u8,
    /// Serial number: the INTEGER's value bytes exactly as encoded,
    /// including any sign-disambiguation leading zero.
    pub serial_number: Vec<u8>,
    /// Issuer distinguished name.
    pub issuer: DistinguishedName,
    /// Subject distinguished name.
    pub subject: DistinguishedName,
    /// Not-before validity time (UNIX timestamp).
    pub not_before: i64,
    /// Not-after validity time (UNIX timestamp).
    pub not_after: i64,
    /// Subject public key info.
    pub public_key: SubjectPublicKeyInfo,
    /// Extensions.
    pub extensions: Vec<X509Extension>,
    /// Raw TBS certificate bytes (for signature verification).
    pub tbs_raw: Vec<u8>,
    /// Signature algorithm OID value bytes (outer signatureAlgorithm field).
    pub signature_algorithm: Vec<u8>,
    /// Signature value bytes.
    pub signature_value: Vec<u8>,
}

/// A distinguished name: an ordered collection of (OID, value) pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistinguishedName {
    pub entries: Vec<(Oid, String)>,
}

/// Subject public key info.
#[derive(Debug, Clone)]
pub struct SubjectPublicKeyInfo {
    /// The full SubjectPublicKeyInfo DER span (what key-decoding
    /// libraries consume).
    pub raw: Vec<u8>,
    /// Key algorithm OID value bytes (e.g. rsaEncryption).
    pub algorithm_oid: Vec<u8>,
}

/// An X.509 extension, value kept raw except where interpreted.
#[derive(Debug, Clone)]
pub struct X509Extension {
    pub oid: Vec<u8>,
    pub critical: bool,
    pub value: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Distinguished Name helpers
// ---------------------------------------------------------------------------

impl std::fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|(oid, v)| {
                let name = known::oid_to_dn_short_name(oid)
                    .map(str::to_string)
                    .unwrap_or_else(|| oid.to_dot_string());
                format!("{name}={v}")
            })
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

impl DistinguishedName {
    /// Look up an attribute by OID. Returns the first match; duplicate
    /// attributes are kept in order, not merged.
    pub fn get(&self, oid: &Oid) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == oid)
            .map(|(_, v)| v.as_str())
    }
}

// ---------------------------------------------------------------------------
// AlgorithmIdentifier parsing
// ---------------------------------------------------------------------------

pub(crate) fn parse_algorithm_identifier(dec: &mut Decoder<'_>) -> Result<Vec<u8>, SigError> {
    let mut alg_dec = dec.read_sequence()?;
    let oid = alg_dec.read_oid()?.to_vec();
    // Parameters (NULL or algorithm-specific) are not interpreted here.
    if !alg_dec.is_empty() {
        let _ = alg_dec.read_tlv()?;
    }
    Ok(oid)
}

// ---------------------------------------------------------------------------
// Name / DN parsing
// ---------------------------------------------------------------------------

pub(crate) fn parse_name(dec: &mut Decoder<'_>) -> Result<DistinguishedName, SigError> {
    let mut name_dec = dec.read_sequence()?;
    let mut entries = Vec::new();
    while !name_dec.is_empty() {
        let mut rdn_dec = name_dec.read_set()?;
        while !rdn_dec.is_empty() {
            let mut atav_dec = rdn_dec.read_sequence()?;
            let oid_bytes = atav_dec.read_oid()?;
            let oid = Oid::from_der_value(oid_bytes)?;
            let value = atav_dec.read_string()?;
            entries.push((oid, value));
        }
    }
    Ok(DistinguishedName { entries })
}

// ---------------------------------------------------------------------------
// Validity parsing
// ---------------------------------------------------------------------------

fn parse_validity(dec: &mut Decoder<'_>) -> Result<(i64, i64), SigError> {
    let mut val_dec = dec.read_sequence()?;
    let not_before = val_dec.read_time()?;
    let not_after = val_dec.read_time()?;
    Ok((not_before, not_after))
}

// ---------------------------------------------------------------------------
// SubjectPublicKeyInfo parsing
// ---------------------------------------------------------------------------

fn parse_subject_public_key_info(dec: &mut Decoder<'_>) -> Result<SubjectPublicKeyInfo, SigError> {
    let (spki_tlv, spki_raw) = dec.read_tlv_raw()?;
    if spki_tlv.tag.number != tags::SEQUENCE || !spki_tlv.tag.constructed {
        return Err(SigError::format(
            "Object's schema was not verified against requested schema object",
        ));
    }
    let mut spki_dec = Decoder::new(spki_tlv.value);
    let algorithm_oid = parse_algorithm_identifier(&mut spki_dec)?;
    let _ = spki_dec.read_bit_string()?;
    Ok(SubjectPublicKeyInfo {
        raw: spki_raw.to_vec(),
        algorithm_oid,
    })
}

// ---------------------------------------------------------------------------
// Extensions parsing
// ---------------------------------------------------------------------------

fn parse_extensions(ext_data: &[u8]) -> Result<Vec<X509Extension>, SigError> {
    let mut ext_seq = Decoder::new(ext_data).read_sequence()?;
    let mut extensions = Vec::new();
    while !ext_seq.is_empty() {
        let mut ext_dec = ext_seq.read_sequence()?;
        let oid = ext_dec.read_oid()?.to_vec();
        // critical BOOLEAN DEFAULT FALSE
        let critical = if !ext_dec.is_empty() {
            let tag = ext_dec.peek_tag()?;
            if tag.class == TagClass::Universal && tag.number == tags::BOOLEAN {
                ext_dec.read_boolean()?
            } else {
                false
            }
        } else {
            false
        };
        let value = ext_dec.read_octet_string()?.to_vec();
        extensions.push(X509Extension {
            oid,
            critical,
            value,
        });
    }
    Ok(extensions)
}

// ---------------------------------------------------------------------------
// Certificate implementation
// ---------------------------------------------------------------------------

impl Certificate {
    /// Parse a certificate from DER-encoded bytes.
    pub fn from_der(data: &[u8]) -> Result<Self, SigError> {
        let mut outer = Decoder::new(data).read_sequence()?;

        // Capture the raw TBS span (tag + length + value) for signature
        // verification against the issuing CA.
        let (tbs_tlv, tbs_raw) = outer.read_tlv_raw()?;
        let tbs_raw = tbs_raw.to_vec();

        let mut tbs_dec = Decoder::new(tbs_tlv.value);

        // version [0] EXPLICIT INTEGER DEFAULT v1
        let version = {
            let v_tlv = tbs_dec.try_read_context_specific(0, true)?;
            if let Some(v_tlv) = v_tlv {
                let mut v_dec = Decoder::new(v_tlv.value);
                let ver_bytes = v_dec.read_integer()?;
                ver_bytes.last().copied().unwrap_or(0) + 1
            } else {
                1 // default v1
            }
        };

        // serialNumber INTEGER
        let serial_number = tbs_dec.read_integer()?.to_vec();

        // signature AlgorithmIdentifier (inner — must match outer)
        let _inner_sig_oid = parse_algorithm_identifier(&mut tbs_dec)?;

        // issuer Name
        let issuer = parse_name(&mut tbs_dec)?;

        // validity Validity
        let (not_before, not_after) = parse_validity(&mut tbs_dec)?;

        // subject Name
        let subject = parse_name(&mut tbs_dec)?;

        // subjectPublicKeyInfo SubjectPublicKeyInfo
        let public_key = parse_subject_public_key_info(&mut tbs_dec)?;

        // issuerUniqueID [1] / subjectUniqueID [2] IMPLICIT OPTIONAL — skip
        let _ = tbs_dec.try_read_context_specific(1, false)?;
        let _ = tbs_dec.try_read_context_specific(2, false)?;

        // extensions [3] EXPLICIT Extensions OPTIONAL
        let extensions = {
            let ext_tlv = tbs_dec.try_read_context_specific(3, true)?;
            if let Some(ext_tlv) = ext_tlv {
                parse_extensions(ext_tlv.value)?
            } else {
                Vec::new()
            }
        };

        // signatureAlgorithm AlgorithmIdentifier
        let signature_algorithm = parse_algorithm_identifier(&mut outer)?;

        // signatureValue BIT STRING
        let (_, sig_bytes) = outer.read_bit_string()?;

        Ok(Certificate {
            raw: data.to_vec(),
            version,
            serial_number,
            issuer,
            subject,
            not_before,
            not_after,
            public_key,
            extensions,
            tbs_raw,
            signature_algorithm,
            signature_value: sig_bytes.to_vec(),
        })
    }

    /// Parse a certificate from a PEM-encoded string. Multi-block input
    /// is accepted; the first CERTIFICATE block wins.
    pub fn from_pem(pem: &str) -> Result<Self, SigError> {
        let blocks = veris_utils::pem::parse(pem)?;
        let cert_block = blocks
            .iter()
            .find(|b| b.label == "CERTIFICATE")
            .ok_or_else(|| SigError::format("no CERTIFICATE block found"))?;
        Self::from_der(&cert_block.data)
    }

    /// Render this certificate as a PEM string.
    pub fn to_pem(&self) -> String {
        veris_utils::pem::encode("CERTIFICATE", &self.raw)
    }

    /// The serial number's DER value bytes as uppercase hex. Byte-exact,
    /// including any leading zero the encoding mandated.
    pub fn serial_hex(&self) -> String {
        hex::encode_upper(&self.serial_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNER_PEM: &str = "-----BEGIN CERTIFICATE-----
MIIEFDCCAvygAwIBAgIUHdXj8Ia6cM/hRrW3b1a6A3MPvswwDQYJKoZIhvcNAQEL
BQAwYjELMAkGA1UEBhMCTFYxDzANBgNVBAoMBkxpcXVpbzEaMBgGA1UEYQwRTlRS
TFYtNDAxMDMwMDAwMDAxDTALBgNVBAcMBFJpZ2ExFzAVBgNVBAMMDkxpcXVpbyBU
ZXN0IENBMB4XDTI2MDgyOTE5MzI0N1oXDTM2MDgyNjE5MzI0N1owgcYxFjAUBgNV
BAMMDUFubmEgS293YWxza2kxETAPBgNVBAQMCEtvd2Fsc2tpMQ0wCwYDVQQqDARB
bm5hMQowCAYDVQQrDAFNMQ8wDQYDVQQKDAZMaXF1aW8xGjAYBgNVBGEMEU5UUkxW
LTQwMDAzMDAwMDAwMQswCQYDVQQGEwJMVjENMAsGA1UEBwwEUmlnYTEUMBIGA1UE
BRMLMzIwMTkwMTIzNDUxHzAdBgcEAIvsSQEBDBJQTk9MVi0wMTAxOTAtMTIzNDUw
ggEiMA0GCSqGSIb3DQEBAQUAA4IBDwAwggEKAoIBAQC3PNQujQTwJXv1O4mwkzYh
fMfprGJ0viI82WuSBN8dN29pbs04VheJQg4Dx2/SukjSeOR/rmGYu0X1zhIRTe8m
BdaDdrntAf4GsG6aA9/EKySfPkjwlaG7HaGUHudLm01iwOIDekZvAzwxbTNNvCUj
CBPoL4Q+iq3Qkw0jBPH6TSb/tYJUS7n8DESe4njTFpmMCkHp2BdosiPg/1c7PbI4
Nnw0fYU+s4kr3Vvn0a2PqwsX7JkQByvDInyR2Hc67Wym47MnzBZ3lnti9Omr34iL
1um4sLJDmziSX+2xgs8k4crovJenmHuLBMmgHqf/F7Dv70PxtdTnxXlVCyOMzVev
AgMBAAGjXTBbMAwGA1UdEwEB/wQCMAAwCwYDVR0PBAQDAgbAMB0GA1UdDgQWBBT6
Rd30k3B5/0vbZNXjlyVPwVID5jAfBgNVHSMEGDAWgBRS/NvoEIgh7YVRJ3lw1uq1
JotweTANBgkqhkiG9w0BAQsFAAOCAQEAVbbYlrHbuj2EGbt28/Vih5pI1+3BlZRd
s+IpuSQuYoMu7uDDwOgpSIMs+zsmcXENwcikGz7JTgNrhqp5TP56tkm9cONd5yFm
AJA/8bhgt1V1CssFztt1ecJNdyhgGKV4kXbJS+nZjejliFoiUnP0TSwY1FkRbt/p
OxUHIAVj1+lhELvdyCyyE4T9VvSVmII2tAyV2GkdoB9hWKyK9a8LcNOEdGXXBB4d
AD1Xp8+0LnlAdu//58slobYPjfzLOum/T/i/DVyhcjgx7gL4VgsFgtkch0D1ALCp
9Gz/THJQNVpQcWlSxRWjaeZys1KmBkRKBBez+1LZ/QVuCwt6IKLkLQ==
-----END CERTIFICATE-----";

    #[test]
    fn test_parse_subject_fields() {
        let cert = Certificate::from_pem(SIGNER_PEM).unwrap();
        assert_eq!(cert.version, 3);
        assert_eq!(cert.subject.get(&known::common_name()), Some("Anna Kowalski"));
        assert_eq!(cert.subject.get(&known::surname()), Some("Kowalski"));
        assert_eq!(cert.subject.get(&known::given_name()), Some("Anna"));
        assert_eq!(cert.subject.get(&known::initials()), Some("M"));
        assert_eq!(cert.subject.get(&known::organization_name()), Some("Liquio"));
        assert_eq!(
            cert.subject.get(&known::organization_identifier()),
            Some("NTRLV-40003000000")
        );
        assert_eq!(cert.subject.get(&known::country_name()), Some("LV"));
        assert_eq!(cert.subject.get(&known::locality_name()), Some("Riga"));
        assert_eq!(
            cert.subject.get(&known::serial_number_attr()),
            Some("32019012345")
        );
        assert_eq!(
            cert.subject.get(&known::person_identifier()),
            Some("PNOLV-010190-12345")
        );
    }

    #[test]
    fn test_parse_issuer_fields() {
        let cert = Certificate::from_pem(SIGNER_PEM).unwrap();
        assert_eq!(cert.issuer.get(&known::common_name()), Some("Liquio Test CA"));
        assert_eq!(cert.issuer.get(&known::organization_name()), Some("Liquio"));
        assert_eq!(cert.issuer.get(&known::country_name()), Some("LV"));
    }

    #[test]
    fn test_serial_hex_uppercase() {
        let cert = Certificate::from_pem(SIGNER_PEM).unwrap();
        assert_eq!(
            cert.serial_hex(),
            "1DD5E3F086BA70CFE146B5B76F56BA03730FBECC"
        );
    }

    #[test]
    fn test_dn_lookup_missing_attribute() {
        let cert = Certificate::from_pem(SIGNER_PEM).unwrap();
        // Issuer carries no surname
        assert_eq!(cert.issuer.get(&known::surname()), None);
    }

    #[test]
    fn test_validity_window() {
        let cert = Certificate::from_pem(SIGNER_PEM).unwrap();
        assert!(cert.not_before < cert.not_after);
        // Issued 2026-08-29
        assert!(cert.not_before > 1_780_000_000);
    }

    #[test]
    fn test_to_pem_roundtrip() {
        let cert = Certificate::from_pem(SIGNER_PEM).unwrap();
        let pem = cert.to_pem();
        assert!(pem.starts_with("-----BEGIN CERTIFICATE-----\n"));
        assert!(pem.ends_with("-----END CERTIFICATE-----"));
        let again = Certificate::from_pem(&pem).unwrap();
        assert_eq!(again.raw, cert.raw);
    }

    #[test]
    fn test_garbage_der_fails() {
        assert!(Certificate::from_der(&[0xDE, 0xAD, 0xBE, 0xEF]).is_err());
        assert!(Certificate::from_der(&[]).is_err());
    }

    #[test]
    fn test_spki_algorithm_is_rsa() {
        let cert = Certificate::from_pem(SIGNER_PEM).unwrap();
        assert_eq!(
            cert.public_key.algorithm_oid,
            known::rsa_encryption().to_der_value()
        );
    }
}
