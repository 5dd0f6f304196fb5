//! OID (Object Identifier) management.

use veris_types::CodecError;

/// A parsed OID represented as a sequence of arc values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Oid {
    arcs: Vec<u32>,
}

impl Oid {
    /// Create an OID from a slice of arc values.
    pub fn new(arcs: &[u32]) -> Self {
        Self {
            arcs: arcs.to_vec(),
        }
    }

    /// Return the arc values.
    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    /// Encode this OID to DER bytes (just the value, no tag/length).
    pub fn to_der_value(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        if self.arcs.len() >= 2 {
            buf.push((self.arcs[0] * 40 + self.arcs[1]) as u8);
            for &arc in &self.arcs[2..] {
                encode_arc(&mut buf, arc);
            }
        }
        buf
    }

    /// Parse an OID from DER value bytes.
    pub fn from_der_value(data: &[u8]) -> Result<Self, CodecError> {
        if data.is_empty() {
            return Err(CodecError::NullInput);
        }
        let mut arcs = Vec::new();
        let first = data[0] as u32;
        arcs.push(first / 40);
        arcs.push(first % 40);

        let mut i = 1;
        while i < data.len() {
            let (arc, consumed) = decode_arc(&data[i..])?;
            arcs.push(arc);
            i += consumed;
        }

        Ok(Self { arcs })
    }

    /// Return the dotted-string representation (e.g., "2.5.4.3").
    pub fn to_dot_string(&self) -> String {
        self.arcs
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_dot_string())
    }
}

fn encode_arc(buf: &mut Vec<u8>, mut value: u32) {
    if value < 0x80 {
        buf.push(value as u8);
        return;
    }
    let mut bytes = Vec::new();
    while value > 0 {
        bytes.push((value & 0x7F) as u8);
        value >>= 7;
    }
    bytes.reverse();
    for (i, b) in bytes.iter().enumerate() {
        if i < bytes.len() - 1 {
            buf.push(b | 0x80);
        } else {
            buf.push(*b);
        }
    }
}

fn decode_arc(data: &[u8]) -> Result<(u32, usize), CodecError> {
    let mut value: u32 = 0;
    for (i, &byte) in data.iter().enumerate() {
        value = value.checked_shl(7).ok_or(CodecError::InvalidValue)? | (byte & 0x7F) as u32;
        if (byte & 0x80) == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(CodecError::Truncated)
}

/// The fixed OID registry this service extracts fields with. These
/// identifiers are part of the external contract: previously issued
/// signatures must keep resolving to the same fields.
pub mod known {
    use super::Oid;

    // PKCS#7 / CMS content types
    pub fn pkcs7_data() -> Oid {
        Oid::new(&[1, 2, 840, 113549, 1, 7, 1])
    }
    pub fn pkcs7_signed_data() -> Oid {
        Oid::new(&[1, 2, 840, 113549, 1, 7, 2])
    }

    // CMS signed attributes
    pub fn signing_time() -> Oid {
        Oid::new(&[1, 2, 840, 113549, 1, 9, 5])
    }

    // Signature algorithms
    pub fn sha256_with_rsa_encryption() -> Oid {
        Oid::new(&[1, 2, 840, 113549, 1, 1, 11])
    }
    pub fn sha384_with_rsa_encryption() -> Oid {
        Oid::new(&[1, 2, 840, 113549, 1, 1, 12])
    }
    pub fn sha512_with_rsa_encryption() -> Oid {
        Oid::new(&[1, 2, 840, 113549, 1, 1, 13])
    }
    pub fn ecdsa_with_sha256() -> Oid {
        Oid::new(&[1, 2, 840, 10045, 4, 3, 2])
    }
    pub fn ecdsa_with_sha384() -> Oid {
        Oid::new(&[1, 2, 840, 10045, 4, 3, 3])
    }

    // Public key algorithms (SubjectPublicKeyInfo)
    pub fn rsa_encryption() -> Oid {
        Oid::new(&[1, 2, 840, 113549, 1, 1, 1])
    }
    pub fn ec_public_key() -> Oid {
        Oid::new(&[1, 2, 840, 10045, 2, 1])
    }

    // X.509 extensions
    pub fn basic_constraints() -> Oid {
        Oid::new(&[2, 5, 29, 19])
    }

    // DN attribute types (X.520 + ETSI)
    pub fn common_name() -> Oid {
        Oid::new(&[2, 5, 4, 3])
    }
    pub fn surname() -> Oid {
        Oid::new(&[2, 5, 4, 4])
    }
    pub fn serial_number_attr() -> Oid {
        Oid::new(&[2, 5, 4, 5])
    }
    pub fn country_name() -> Oid {
        Oid::new(&[2, 5, 4, 6])
    }
    pub fn locality_name() -> Oid {
        Oid::new(&[2, 5, 4, 7])
    }
    pub fn organization_name() -> Oid {
        Oid::new(&[2, 5, 4, 10])
    }
    pub fn given_name() -> Oid {
        Oid::new(&[2, 5, 4, 42])
    }
    pub fn initials() -> Oid {
        Oid::new(&[2, 5, 4, 43])
    }
    pub fn organization_identifier() -> Oid {
        Oid::new(&[2, 5, 4, 97])
    }
    /// eIDAS natural-person identifier (ETSI EN 319 412-1 semantics id).
    pub fn person_identifier() -> Oid {
        Oid::new(&[0, 4, 0, 194121, 1, 1])
    }

    /// Map a well-known DN attribute OID to its short name.
    pub fn oid_to_dn_short_name(oid: &super::Oid) -> Option<&'static str> {
        match oid.arcs() {
            [2, 5, 4, 3] => Some("CN"),
            [2, 5, 4, 4] => Some("SN"),
            [2, 5, 4, 5] => Some("serialNumber"),
            [2, 5, 4, 6] => Some("C"),
            [2, 5, 4, 7] => Some("L"),
            [2, 5, 4, 10] => Some("O"),
            [2, 5, 4, 42] => Some("GN"),
            [2, 5, 4, 43] => Some("initials"),
            [2, 5, 4, 97] => Some("organizationIdentifier"),
            [0, 4, 0, 194121, 1, 1] => Some("personIdentifier"),
            _ => None,
        }
    }
}
