//! Interpreted X.509 extensions.

use veris_types::SigError;
use veris_utils::asn1::{tags, Decoder};
use veris_utils::oid::known;

use super::certificate::Certificate;

/// The basicConstraints extension (RFC 5280 §4.2.1.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicConstraints {
    pub is_ca: bool,
    pub path_len_constraint: Option<u32>,
}

fn parse_basic_constraints(value: &[u8]) -> Result<BasicConstraints, SigError> {
    let mut dec = Decoder::new(value).read_sequence()?;

    // cA BOOLEAN DEFAULT FALSE
    let is_ca = if !dec.is_empty() && dec.peek_tag()?.number == tags::BOOLEAN {
        dec.read_boolean()?
    } else {
        false
    };

    // pathLenConstraint INTEGER OPTIONAL
    let path_len_constraint = if !dec.is_empty() && dec.peek_tag()?.number == tags::INTEGER {
        let bytes = dec.read_integer()?;
        let mut v: u32 = 0;
        for &b in bytes {
            v = (v << 8) | b as u32;
        }
        Some(v)
    } else {
        None
    };

    Ok(BasicConstraints {
        is_ca,
        path_len_constraint,
    })
}

impl Certificate {
    /// The parsed basicConstraints extension, if the certificate carries
    /// one. A present but malformed extension is an error, not `None`.
    pub fn basic_constraints(&self) -> Result<Option<BasicConstraints>, SigError> {
        let bc_oid = known::basic_constraints().to_der_value();
        match self.extensions.iter().find(|e| e.oid == bc_oid) {
            Some(ext) => Ok(Some(parse_basic_constraints(&ext.value)?)),
            None => Ok(None),
        }
    }

    /// True only when basicConstraints is present and asserts cA.
    pub fn is_ca(&self) -> bool {
        matches!(
            self.basic_constraints(),
            Ok(Some(BasicConstraints { is_ca: true, .. }))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ca_true_with_path_len() {
        // SEQUENCE { BOOLEAN TRUE, INTEGER 0 }
        let der = [0x30, 0x06, 0x01, 0x01, 0xFF, 0x02, 0x01, 0x00];
        let bc = parse_basic_constraints(&der).unwrap();
        assert!(bc.is_ca);
        assert_eq!(bc.path_len_constraint, Some(0));
    }

    #[test]
    fn test_empty_sequence_defaults() {
        // SEQUENCE { } — end-entity form with cA defaulted
        let der = [0x30, 0x00];
        let bc = parse_basic_constraints(&der).unwrap();
        assert!(!bc.is_ca);
        assert_eq!(bc.path_len_constraint, None);
    }

    #[test]
    fn test_explicit_ca_false() {
        let der = [0x30, 0x03, 0x01, 0x01, 0x00];
        let bc = parse_basic_constraints(&der).unwrap();
        assert!(!bc.is_ca);
    }

    #[test]
    fn test_malformed_value() {
        assert!(parse_basic_constraints(&[0x02, 0x01, 0x00]).is_err());
    }
}
