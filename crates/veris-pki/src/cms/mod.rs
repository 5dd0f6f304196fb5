//! CMS (PKCS#7) SignedData model mapper and re-encoder.
//!
//! Parsed structures retain the raw DER spans of the pieces this engine
//! does not interpret (digest algorithm set, certificate list entries,
//! CRLs, signerInfos), so a detached signature can be reattached to its
//! content without changing a byte of the signed material.

use veris_types::{CodecError, SigError};
use veris_utils::asn1::{tags, Decoder, Encoder};
use veris_utils::oid::known;

use crate::x509::{parse_algorithm_identifier, parse_name, Certificate, DistinguishedName};

const SCHEMA_MSG: &str = "Object's schema was not verified against requested schema object";

/// Narrow tag mismatches to the schema-violation message while letting
/// lower-level codec failures keep their own wording.
fn schema(e: CodecError) -> SigError {
    match e {
        CodecError::UnexpectedTag => SigError::format(SCHEMA_MSG),
        other => other.into(),
    }
}

/// The outer CMS ContentInfo wrapper.
#[derive(Debug, Clone)]
pub struct ContentInfo {
    /// contentType OID value bytes; always pkcs7-signedData here.
    pub content_type: Vec<u8>,
    pub signed_data: SignedData,
}

/// A parsed CMS SignedData structure.
#[derive(Debug, Clone)]
pub struct SignedData {
    /// CMSVersion INTEGER value bytes.
    pub version: Vec<u8>,
    /// Raw span of the digestAlgorithms SET (full TLV).
    pub digest_algorithms_raw: Vec<u8>,
    pub encap_content_info: EncapContentInfo,
    /// Embedded certificates, in encounter order.
    pub certificates: Vec<Certificate>,
    /// Raw span of the optional crls [1] field (full TLV), passed
    /// through uninterpreted.
    pub crls_raw: Option<Vec<u8>>,
    /// Raw span of the signerInfos SET (full TLV).
    pub signer_infos_raw: Vec<u8>,
    pub signer_infos: Vec<SignerInfo>,
}

/// EncapsulatedContentInfo: the content type plus the content itself,
/// absent for a detached signature.
#[derive(Debug, Clone)]
pub struct EncapContentInfo {
    /// eContentType OID value bytes.
    pub e_content_type: Vec<u8>,
    /// eContent bytes; `None` means detached.
    pub e_content: Option<Vec<u8>>,
}

/// A single signer's info: who signed, with what, and the signature.
#[derive(Debug, Clone)]
pub struct SignerInfo {
    /// CMSVersion INTEGER value bytes.
    pub version: Vec<u8>,
    /// sid issuerAndSerialNumber: the issuer name.
    pub issuer: DistinguishedName,
    /// sid issuerAndSerialNumber: serial INTEGER value bytes.
    pub serial_number: Vec<u8>,
    /// digestAlgorithm OID value bytes.
    pub digest_algorithm: Vec<u8>,
    pub signed_attrs: Vec<SignedAttribute>,
    /// The signingTime signed attribute, when present, as UNIX seconds.
    pub signing_time: Option<i64>,
    /// signatureAlgorithm OID value bytes.
    pub signature_algorithm: Vec<u8>,
    /// The signature value.
    pub signature: Vec<u8>,
}

/// One signed attribute: its type OID and the raw contents of its
/// value SET.
#[derive(Debug, Clone)]
pub struct SignedAttribute {
    pub oid: Vec<u8>,
    pub values_raw: Vec<u8>,
}

impl ContentInfo {
    /// Parse a top-level ContentInfo. Anything other than a SignedData
    /// payload is rejected up front.
    pub fn from_der(data: &[u8]) -> Result<Self, SigError> {
        let mut outer = Decoder::new(data).read_sequence()?;
        let content_type = outer.read_oid()?.to_vec();
        if content_type != known::pkcs7_signed_data().to_der_value() {
            return Err(SigError::format("Not a PKCS#7 SignedData structure"));
        }
        let inner = outer.read_context_specific(0, true).map_err(schema)?;
        let signed_data = SignedData::from_content(inner.value)?;
        Ok(Self {
            content_type,
            signed_data,
        })
    }
}

impl SignedData {
    /// Parse the SignedData SEQUENCE found inside a ContentInfo's
    /// `[0]` wrapper.
    pub fn from_content(data: &[u8]) -> Result<Self, SigError> {
        let mut dec = Decoder::new(data).read_sequence().map_err(schema)?;

        // version CMSVersion
        let version = dec.read_integer().map_err(schema)?.to_vec();

        // digestAlgorithms SET OF AlgorithmIdentifier, kept raw
        let (da_tlv, da_raw) = dec.read_tlv_raw()?;
        if da_tlv.tag.number != tags::SET || !da_tlv.tag.constructed {
            return Err(SigError::format(SCHEMA_MSG));
        }
        let digest_algorithms_raw = da_raw.to_vec();

        // encapContentInfo EncapsulatedContentInfo
        let encap_content_info = parse_encap_content_info(&mut dec)?;

        // certificates [0] IMPLICIT CertificateSet OPTIONAL
        let mut certificates = Vec::new();
        if let Some(cert_set) = dec.try_read_context_specific(0, true)? {
            let mut cert_dec = Decoder::new(cert_set.value);
            while !cert_dec.is_empty() {
                let (_, cert_raw) = cert_dec.read_tlv_raw()?;
                certificates.push(Certificate::from_der(cert_raw)?);
            }
        }

        // crls [1] IMPLICIT RevocationInfoChoices OPTIONAL, kept raw
        let crls_raw = dec
            .try_read_context_specific_raw(1, true)?
            .map(|(_, raw)| raw.to_vec());

        // signerInfos SET OF SignerInfo, kept raw and parsed
        let (si_tlv, si_raw) = dec.read_tlv_raw()?;
        if si_tlv.tag.number != tags::SET || !si_tlv.tag.constructed {
            return Err(SigError::format(SCHEMA_MSG));
        }
        let signer_infos_raw = si_raw.to_vec();
        let mut signer_infos = Vec::new();
        let mut si_dec = Decoder::new(si_tlv.value);
        while !si_dec.is_empty() {
            signer_infos.push(parse_signer_info(&mut si_dec)?);
        }

        Ok(Self {
            version,
            digest_algorithms_raw,
            encap_content_info,
            certificates,
            crls_raw,
            signer_infos_raw,
            signer_infos,
        })
    }

    /// True when no eContent is embedded.
    pub fn is_detached(&self) -> bool {
        self.encap_content_info.e_content.is_none()
    }

    /// Re-encode this SignedData as a full ContentInfo with `content`
    /// as the embedded eContent.
    ///
    /// The retained raw spans for digestAlgorithms, certificates, CRLs,
    /// and signerInfos are emitted unchanged: no re-signing happens, and
    /// the result only verifies if the original signature already covers
    /// this content's digest.
    pub fn reattach(&self, content: &[u8]) -> Vec<u8> {
        // eContent: [0] EXPLICIT { OCTET STRING content }
        let mut octets = Encoder::new();
        octets.write_octet_string(content);
        let octets = octets.finish();

        let mut encap = Encoder::new();
        encap.write_oid(&self.encap_content_info.e_content_type);
        encap.write_context_specific(0, true, &octets);
        let encap = encap.finish();

        let mut sd = Encoder::new();
        sd.write_integer(&self.version);
        sd.write_raw(&self.digest_algorithms_raw);
        sd.write_sequence(&encap);
        if !self.certificates.is_empty() {
            let mut certs = Encoder::new();
            for cert in &self.certificates {
                certs.write_raw(&cert.raw);
            }
            let certs = certs.finish();
            sd.write_context_specific(0, true, &certs);
        }
        if let Some(crls) = &self.crls_raw {
            sd.write_raw(crls);
        }
        sd.write_raw(&self.signer_infos_raw);
        let sd = sd.finish();

        let mut sd_seq = Encoder::new();
        sd_seq.write_sequence(&sd);
        let sd_seq = sd_seq.finish();

        let mut ci = Encoder::new();
        ci.write_oid(&known::pkcs7_signed_data().to_der_value());
        ci.write_context_specific(0, true, &sd_seq);
        let ci = ci.finish();

        let mut out = Encoder::new();
        out.write_sequence(&ci);
        out.finish()
    }
}

fn parse_encap_content_info(dec: &mut Decoder<'_>) -> Result<EncapContentInfo, SigError> {
    let mut encap_dec = dec.read_sequence().map_err(schema)?;
    let e_content_type = encap_dec.read_oid().map_err(schema)?.to_vec();
    let e_content = match encap_dec.try_read_context_specific(0, true)? {
        Some(wrapper) => {
            let mut inner = Decoder::new(wrapper.value);
            Some(inner.read_octet_string().map_err(schema)?.to_vec())
        }
        None => None,
    };
    Ok(EncapContentInfo {
        e_content_type,
        e_content,
    })
}

fn parse_signer_info(set_dec: &mut Decoder<'_>) -> Result<SignerInfo, SigError> {
    let mut dec = set_dec.read_sequence().map_err(schema)?;

    let version = dec.read_integer().map_err(schema)?.to_vec();

    // sid issuerAndSerialNumber SEQUENCE { issuer Name, serialNumber }
    let mut sid_dec = dec.read_sequence().map_err(schema)?;
    let issuer = parse_name(&mut sid_dec)?;
    let serial_number = sid_dec.read_integer().map_err(schema)?.to_vec();

    let digest_algorithm = parse_algorithm_identifier(&mut dec)?;

    // signedAttrs [0] IMPLICIT SignedAttributes OPTIONAL
    let mut signed_attrs = Vec::new();
    let mut signing_time = None;
    if let Some(attrs_tlv) = dec.try_read_context_specific(0, true)? {
        let mut attrs_dec = Decoder::new(attrs_tlv.value);
        while !attrs_dec.is_empty() {
            let mut attr_dec = attrs_dec.read_sequence().map_err(schema)?;
            let oid = attr_dec.read_oid().map_err(schema)?.to_vec();
            let values = attr_dec.read_tlv().map_err(schema)?;
            if oid == known::signing_time().to_der_value() {
                let mut value_dec = Decoder::new(values.value);
                signing_time = Some(value_dec.read_time()?);
            }
            signed_attrs.push(SignedAttribute {
                oid,
                values_raw: values.value.to_vec(),
            });
        }
    }

    let signature_algorithm = parse_algorithm_identifier(&mut dec)?;
    let signature = dec.read_octet_string().map_err(schema)?.to_vec();

    // unsignedAttrs [1] IMPLICIT OPTIONAL, uninterpreted
    let _ = dec.try_read_context_specific(1, true)?;

    Ok(SignerInfo {
        version,
        issuer,
        serial_number,
        digest_algorithm,
        signed_attrs,
        signing_time,
        signature_algorithm,
        signature,
    })
}
