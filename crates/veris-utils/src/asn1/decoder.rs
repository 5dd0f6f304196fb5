//! ASN.1 DER decoder.

use super::{tags, Tag, TagClass, Tlv};
use crate::time::datetime_to_unix;
use veris_types::CodecError;

/// A streaming ASN.1 DER decoder.
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    /// Create a new decoder over the given data.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the remaining undecoded bytes.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Returns true if all data has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Parse the next TLV element.
    pub fn read_tlv(&mut self) -> Result<Tlv<'a>, CodecError> {
        let (tag, tag_len) = Tag::from_bytes(&self.data[self.pos..])?;
        self.pos += tag_len;

        let length = self.read_length()?;
        let end = self.pos.checked_add(length).ok_or(CodecError::InvalidLength)?;
        if end > self.data.len() {
            return Err(CodecError::Truncated);
        }

        let value = &self.data[self.pos..end];
        self.pos = end;

        Ok(Tlv { tag, value })
    }

    /// Parse the next TLV element together with its raw encoded span
    /// (tag + length + value bytes). The raw span is what the CMS and
    /// X.509 mappers retain for byte-exact re-serialization.
    pub fn read_tlv_raw(&mut self) -> Result<(Tlv<'a>, &'a [u8]), CodecError> {
        let start = self.pos;
        let tlv = self.read_tlv()?;
        Ok((tlv, &self.data[start..self.pos]))
    }

    /// Parse a DER length (definite form only).
    fn read_length(&mut self) -> Result<usize, CodecError> {
        if self.pos >= self.data.len() {
            return Err(CodecError::Truncated);
        }

        let first = self.data[self.pos];
        self.pos += 1;

        if first < 0x80 {
            Ok(first as usize)
        } else if first == 0x80 {
            Err(CodecError::IndefiniteLength)
        } else {
            let num_bytes = (first & 0x7F) as usize;
            if num_bytes > 4 || self.pos + num_bytes > self.data.len() {
                return Err(CodecError::InvalidLength);
            }
            let mut length: usize = 0;
            for i in 0..num_bytes {
                length = (length << 8) | self.data[self.pos + i] as usize;
            }
            self.pos += num_bytes;
            Ok(length)
        }
    }

    /// Read an INTEGER and return its value bytes (big-endian, any
    /// sign-disambiguation leading zero retained).
    pub fn read_integer(&mut self) -> Result<&'a [u8], CodecError> {
        let tlv = self.read_tlv()?;
        if tlv.tag.number != tags::INTEGER {
            return Err(CodecError::UnexpectedTag);
        }
        Ok(tlv.value)
    }

    /// Read an OCTET STRING.
    pub fn read_octet_string(&mut self) -> Result<&'a [u8], CodecError> {
        let tlv = self.read_tlv()?;
        if tlv.tag.number != tags::OCTET_STRING {
            return Err(CodecError::UnexpectedTag);
        }
        Ok(tlv.value)
    }

    /// Read a BIT STRING and return (unused_bits, data).
    pub fn read_bit_string(&mut self) -> Result<(u8, &'a [u8]), CodecError> {
        let tlv = self.read_tlv()?;
        if tlv.tag.number != tags::BIT_STRING || tlv.value.is_empty() {
            return Err(CodecError::UnexpectedTag);
        }
        Ok((tlv.value[0], &tlv.value[1..]))
    }

    /// Read an OID and return the raw value bytes.
    pub fn read_oid(&mut self) -> Result<&'a [u8], CodecError> {
        let tlv = self.read_tlv()?;
        if tlv.tag.number != tags::OID {
            return Err(CodecError::UnexpectedTag);
        }
        Ok(tlv.value)
    }

    /// Read a SEQUENCE, returning a sub-decoder over its contents.
    pub fn read_sequence(&mut self) -> Result<Decoder<'a>, CodecError> {
        let tlv = self.read_tlv()?;
        if tlv.tag.number != tags::SEQUENCE || !tlv.tag.constructed {
            return Err(CodecError::UnexpectedTag);
        }
        Ok(Decoder::new(tlv.value))
    }

    /// Read a SET, returning a sub-decoder over its contents.
    pub fn read_set(&mut self) -> Result<Decoder<'a>, CodecError> {
        let tlv = self.read_tlv()?;
        if tlv.tag.number != tags::SET || !tlv.tag.constructed {
            return Err(CodecError::UnexpectedTag);
        }
        Ok(Decoder::new(tlv.value))
    }

    /// Peek at the next tag without consuming it.
    pub fn peek_tag(&self) -> Result<Tag, CodecError> {
        if self.pos >= self.data.len() {
            return Err(CodecError::Truncated);
        }
        let (tag, _) = Tag::from_bytes(&self.data[self.pos..])?;
        Ok(tag)
    }

    /// Read a BOOLEAN value (DER: 0x00=false, 0xFF=true).
    pub fn read_boolean(&mut self) -> Result<bool, CodecError> {
        let tlv = self.read_tlv()?;
        if tlv.tag.number != tags::BOOLEAN || tlv.value.len() != 1 {
            return Err(CodecError::UnexpectedTag);
        }
        Ok(tlv.value[0] != 0x00)
    }

    /// Read a context-specific tagged value with the expected tag number.
    pub fn read_context_specific(
        &mut self,
        tag_num: u32,
        constructed: bool,
    ) -> Result<Tlv<'a>, CodecError> {
        let tlv = self.read_tlv()?;
        if tlv.tag.class != TagClass::ContextSpecific
            || tlv.tag.number != tag_num
            || tlv.tag.constructed != constructed
        {
            return Err(CodecError::UnexpectedTag);
        }
        Ok(tlv)
    }

    /// Try to read a context-specific tagged value. Returns `None` if
    /// the next tag does not match, without consuming any bytes.
    pub fn try_read_context_specific(
        &mut self,
        tag_num: u32,
        constructed: bool,
    ) -> Result<Option<Tlv<'a>>, CodecError> {
        if self.is_empty() {
            return Ok(None);
        }
        let tag = self.peek_tag()?;
        if tag.class == TagClass::ContextSpecific
            && tag.number == tag_num
            && tag.constructed == constructed
        {
            Ok(Some(self.read_tlv()?))
        } else {
            Ok(None)
        }
    }

    /// Like [`Decoder::try_read_context_specific`] but also returning
    /// the raw encoded span of the matched element.
    pub fn try_read_context_specific_raw(
        &mut self,
        tag_num: u32,
        constructed: bool,
    ) -> Result<Option<(Tlv<'a>, &'a [u8])>, CodecError> {
        if self.is_empty() {
            return Ok(None);
        }
        let tag = self.peek_tag()?;
        if tag.class == TagClass::ContextSpecific
            && tag.number == tag_num
            && tag.constructed == constructed
        {
            Ok(Some(self.read_tlv_raw()?))
        } else {
            Ok(None)
        }
    }

    /// Read a string value (UTF8String, PrintableString, IA5String,
    /// T61String, or BMPString) and return it as a Rust `String`.
    pub fn read_string(&mut self) -> Result<String, CodecError> {
        let tlv = self.read_tlv()?;
        match tlv.tag.number {
            tags::UTF8_STRING | tags::PRINTABLE_STRING | tags::IA5_STRING => {
                String::from_utf8(tlv.value.to_vec()).map_err(|_| CodecError::InvalidValue)
            }
            // TeletexString: treat as Latin-1
            tags::T61_STRING => Ok(tlv.value.iter().map(|&b| b as char).collect()),
            // BMPString: UTF-16BE
            tags::BMP_STRING => {
                if tlv.value.len() % 2 != 0 {
                    return Err(CodecError::InvalidValue);
                }
                let u16s: Vec<u16> = tlv
                    .value
                    .chunks(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                String::from_utf16(&u16s).map_err(|_| CodecError::InvalidValue)
            }
            _ => Err(CodecError::UnexpectedTag),
        }
    }

    /// Read a Time value (UTCTime or GeneralizedTime) as a UNIX timestamp.
    pub fn read_time(&mut self) -> Result<i64, CodecError> {
        let tlv = self.read_tlv()?;
        let s = core::str::from_utf8(tlv.value).map_err(|_| CodecError::InvalidValue)?;
        match tlv.tag.number {
            tags::UTC_TIME => parse_utc_time(s),
            tags::GENERALIZED_TIME => parse_generalized_time(s),
            _ => Err(CodecError::UnexpectedTag),
        }
    }
}

/// Parse UTCTime string "YYMMDDHHMMSSZ" to UNIX timestamp.
/// RFC 5280: 00-49 → 2000-2049, 50-99 → 1950-1999.
fn parse_utc_time(s: &str) -> Result<i64, CodecError> {
    let s = s.strip_suffix('Z').unwrap_or(s);
    // Digit-field slicing below indexes by byte; a multibyte character
    // would land an index inside a char boundary.
    if !s.is_ascii() || s.len() < 12 {
        return Err(CodecError::InvalidValue);
    }
    let yy: u32 = s[0..2].parse().map_err(|_| CodecError::InvalidValue)?;
    let year = if yy < 50 { 2000 + yy } else { 1900 + yy };
    let month: u32 = s[2..4].parse().map_err(|_| CodecError::InvalidValue)?;
    let day: u32 = s[4..6].parse().map_err(|_| CodecError::InvalidValue)?;
    let hour: u32 = s[6..8].parse().map_err(|_| CodecError::InvalidValue)?;
    let min: u32 = s[8..10].parse().map_err(|_| CodecError::InvalidValue)?;
    let sec: u32 = s[10..12].parse().map_err(|_| CodecError::InvalidValue)?;
    datetime_to_unix(year, month, day, hour, min, sec)
}

/// Parse GeneralizedTime string "YYYYMMDDHHMMSSZ" to UNIX timestamp.
fn parse_generalized_time(s: &str) -> Result<i64, CodecError> {
    let s = s.strip_suffix('Z').unwrap_or(s);
    if !s.is_ascii() || s.len() < 14 {
        return Err(CodecError::InvalidValue);
    }
    let year: u32 = s[0..4].parse().map_err(|_| CodecError::InvalidValue)?;
    let month: u32 = s[4..6].parse().map_err(|_| CodecError::InvalidValue)?;
    let day: u32 = s[6..8].parse().map_err(|_| CodecError::InvalidValue)?;
    let hour: u32 = s[8..10].parse().map_err(|_| CodecError::InvalidValue)?;
    let min: u32 = s[10..12].parse().map_err(|_| CodecError::InvalidValue)?;
    let sec: u32 = s[12..14].parse().map_err(|_| CodecError::InvalidValue)?;
    datetime_to_unix(year, month, day, hour, min, sec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_set() {
        // SET { INTEGER 42 }
        let data = [0x31, 0x03, 0x02, 0x01, 0x2A];
        let mut dec = Decoder::new(&data);
        let mut set_dec = dec.read_set().unwrap();
        let val = set_dec.read_integer().unwrap();
        assert_eq!(val, &[0x2A]);
        assert!(set_dec.is_empty());
    }

    #[test]
    fn test_read_integer_keeps_leading_zero() {
        // INTEGER 0x00C8 — leading zero disambiguates the sign and must
        // survive for hex-serial compatibility.
        let data = [0x02, 0x02, 0x00, 0xC8];
        let mut dec = Decoder::new(&data);
        assert_eq!(dec.read_integer().unwrap(), &[0x00, 0xC8]);
    }

    #[test]
    fn test_read_boolean() {
        let data_true = [0x01, 0x01, 0xFF];
        let mut dec = Decoder::new(&data_true);
        assert!(dec.read_boolean().unwrap());

        let data_false = [0x01, 0x01, 0x00];
        let mut dec = Decoder::new(&data_false);
        assert!(!dec.read_boolean().unwrap());
    }

    #[test]
    fn test_truncated_length() {
        // SEQUENCE claiming 5 bytes with only 2 available
        let data = [0x30, 0x05, 0x02, 0x01];
        let mut dec = Decoder::new(&data);
        assert!(matches!(dec.read_tlv(), Err(CodecError::Truncated)));
    }

    #[test]
    fn test_indefinite_length_rejected() {
        let data = [0x30, 0x80, 0x00, 0x00];
        let mut dec = Decoder::new(&data);
        assert!(matches!(dec.read_tlv(), Err(CodecError::IndefiniteLength)));
    }

    #[test]
    fn test_zero_length_input() {
        let mut dec = Decoder::new(&[]);
        assert!(dec.read_tlv().is_err());
    }

    #[test]
    fn test_peek_tag() {
        let data = [0x02, 0x01, 0x05]; // INTEGER 5
        let dec = Decoder::new(&data);
        let tag = dec.peek_tag().unwrap();
        assert_eq!(tag.number, 0x02);
        assert!(!dec.is_empty()); // peek should not consume
    }

    #[test]
    fn test_read_tlv_raw_span() {
        let data = [0x02, 0x01, 0x05, 0x01, 0x01, 0xFF];
        let mut dec = Decoder::new(&data);
        let (tlv, raw) = dec.read_tlv_raw().unwrap();
        assert_eq!(tlv.value, &[0x05]);
        assert_eq!(raw, &[0x02, 0x01, 0x05]);
        assert!(dec.read_boolean().unwrap());
    }

    #[test]
    fn test_read_context_specific() {
        // [0] EXPLICIT { INTEGER 2 } — like X.509 version
        let data = [0xA0, 0x03, 0x02, 0x01, 0x02];
        let mut dec = Decoder::new(&data);
        let tlv = dec.read_context_specific(0, true).unwrap();
        assert_eq!(tlv.value, &[0x02, 0x01, 0x02]);
    }

    #[test]
    fn test_try_read_context_specific() {
        // [0] EXPLICIT { INTEGER 2 } followed by INTEGER 1
        let data = [0xA0, 0x03, 0x02, 0x01, 0x02, 0x02, 0x01, 0x01];
        let mut dec = Decoder::new(&data);

        let tlv = dec.try_read_context_specific(0, true).unwrap();
        assert!(tlv.is_some());

        // Next is INTEGER, try [1] should return None
        let tlv = dec.try_read_context_specific(1, true).unwrap();
        assert!(tlv.is_none());

        let val = dec.read_integer().unwrap();
        assert_eq!(val, &[0x01]);
    }

    #[test]
    fn test_read_string_utf8() {
        let data = [0x0C, 0x05, b'H', b'e', b'l', b'l', b'o'];
        let mut dec = Decoder::new(&data);
        assert_eq!(dec.read_string().unwrap(), "Hello");
    }

    #[test]
    fn test_read_string_printable() {
        let data = [0x13, 0x02, b'L', b'V'];
        let mut dec = Decoder::new(&data);
        assert_eq!(dec.read_string().unwrap(), "LV");
    }

    #[test]
    fn test_read_time_utc() {
        // UTCTime "260829193255Z" → 2026-08-29 19:32:55 UTC
        let time_str = b"260829193255Z";
        let mut data = vec![0x17, time_str.len() as u8];
        data.extend_from_slice(time_str);
        let mut dec = Decoder::new(&data);
        let ts = dec.read_time().unwrap();
        let expected = datetime_to_unix(2026, 8, 29, 19, 32, 55).unwrap();
        assert_eq!(ts, expected);
    }

    #[test]
    fn test_read_time_rejects_multibyte_value() {
        // Valid UTF-8, 13 bytes, but byte index 2 falls inside the
        // two-byte 'é'. Must be an error, not a panic.
        let time_str = "a\u{e9}0829193255Z".as_bytes();
        let mut data = vec![0x17, time_str.len() as u8];
        data.extend_from_slice(time_str);
        let mut dec = Decoder::new(&data);
        assert!(matches!(dec.read_time(), Err(CodecError::InvalidValue)));

        let gen_str = "ab\u{e9}81231235959Z".as_bytes();
        let mut data = vec![0x18, gen_str.len() as u8];
        data.extend_from_slice(gen_str);
        let mut dec = Decoder::new(&data);
        assert!(matches!(dec.read_time(), Err(CodecError::InvalidValue)));
    }

    #[test]
    fn test_read_time_generalized() {
        // GeneralizedTime "20361231235959Z"
        let time_str = b"20361231235959Z";
        let mut data = vec![0x18, time_str.len() as u8];
        data.extend_from_slice(time_str);
        let mut dec = Decoder::new(&data);
        let ts = dec.read_time().unwrap();
        assert_eq!(ts, datetime_to_unix(2036, 12, 31, 23, 59, 59).unwrap());
    }
}
