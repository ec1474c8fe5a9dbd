//! Room-keyed obfuscation of message bodies.
//!
//! Not encryption: anyone who knows the room token can read the room. The
//! pipeline is XOR with a rotating key, then a WTF-8 serialization of the
//! masked units, then standard padded base64.
//!
//! Both the key and the plaintext are processed as UTF-16 code units. Masking
//! can turn a unit into an unpaired surrogate, so the intermediate string is
//! written with WTF-8 rules: surrogate pairs become one 4-byte sequence and
//! unpaired surrogates a 3-byte sequence. Whenever the masked units form valid
//! UTF-16 the intermediate bytes are plain UTF-8.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::CodecError;
use crate::types::RoomToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codec {
    key: Vec<u16>,
}

impl Codec {
    pub fn new(key: &str) -> Result<Self, CodecError> {
        let key: Vec<u16> = key.encode_utf16().collect();
        if key.is_empty() {
            return Err(CodecError::EmptyKey);
        }
        Ok(Self { key })
    }

    /// Codec keyed by a room token. Room tokens are never empty.
    pub fn for_room(room: &RoomToken) -> Self {
        Self {
            key: room.as_str().encode_utf16().collect(),
        }
    }

    /// Turn a plaintext body into an ASCII transport token.
    pub fn encode(&self, plaintext: &str) -> String {
        let masked = self.mask(plaintext.encode_utf16());
        STANDARD.encode(units_to_wtf8(&masked))
    }

    /// Recover the plaintext, reporting why a token could not be decoded.
    pub fn try_decode(&self, token: &str) -> Result<String, CodecError> {
        let bytes = STANDARD
            .decode(token)
            .map_err(|_| CodecError::InvalidBase64)?;
        let masked = wtf8_to_units(&bytes)?;
        let units = self.mask(masked);
        String::from_utf16(&units).map_err(|_| CodecError::InvalidUtf16)
    }

    /// Recover the plaintext; tokens that do not decode are returned unchanged
    /// so legacy plaintext bodies still render.
    pub fn decode(&self, token: &str) -> String {
        self.try_decode(token).unwrap_or_else(|_| token.to_string())
    }

    fn mask<I>(&self, units: I) -> Vec<u16>
    where
        I: IntoIterator<Item = u16>,
    {
        units
            .into_iter()
            .zip(self.key.iter().cycle())
            .map(|(unit, key)| unit ^ key)
            .collect()
    }
}

fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

fn is_low_surrogate(unit: u16) -> bool {
    (0xDC00..=0xDFFF).contains(&unit)
}

fn units_to_wtf8(units: &[u16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(units.len() * 3);
    let mut i = 0;

    while i < units.len() {
        let unit = units[i];
        let code_point = match units.get(i + 1) {
            Some(&next) if is_high_surrogate(unit) && is_low_surrogate(next) => {
                i += 1;
                0x10000 + ((u32::from(unit) - 0xD800) << 10) + (u32::from(next) - 0xDC00)
            }
            _ => u32::from(unit),
        };
        push_code_point(&mut out, code_point);
        i += 1;
    }

    out
}

fn push_code_point(out: &mut Vec<u8>, cp: u32) {
    match cp {
        0..=0x7F => out.push(cp as u8),
        0x80..=0x7FF => {
            out.push(0xC0 | (cp >> 6) as u8);
            out.push(0x80 | (cp & 0x3F) as u8);
        }
        0x800..=0xFFFF => {
            out.push(0xE0 | (cp >> 12) as u8);
            out.push(0x80 | ((cp >> 6) & 0x3F) as u8);
            out.push(0x80 | (cp & 0x3F) as u8);
        }
        _ => {
            out.push(0xF0 | (cp >> 18) as u8);
            out.push(0x80 | ((cp >> 12) & 0x3F) as u8);
            out.push(0x80 | ((cp >> 6) & 0x3F) as u8);
            out.push(0x80 | (cp & 0x3F) as u8);
        }
    }
}

fn wtf8_to_units(bytes: &[u8]) -> Result<Vec<u16>, CodecError> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let lead = bytes[i];
        let (len, min, mut cp) = match lead {
            0x00..=0x7F => (1, 0, u32::from(lead)),
            0xC2..=0xDF => (2, 0x80, u32::from(lead & 0x1F)),
            0xE0..=0xEF => (3, 0x800, u32::from(lead & 0x0F)),
            0xF0..=0xF4 => (4, 0x10000, u32::from(lead & 0x07)),
            _ => return Err(CodecError::InvalidEncoding),
        };

        let tail = bytes
            .get(i + 1..i + len)
            .ok_or(CodecError::InvalidEncoding)?;
        for &b in tail {
            if b & 0xC0 != 0x80 {
                return Err(CodecError::InvalidEncoding);
            }
            cp = (cp << 6) | u32::from(b & 0x3F);
        }
        if cp < min || cp > 0x10FFFF {
            return Err(CodecError::InvalidEncoding);
        }

        if cp >= 0x10000 {
            let v = cp - 0x10000;
            units.push(0xD800 | (v >> 10) as u16);
            units.push(0xDC00 | (v & 0x3FF) as u16);
        } else {
            units.push(cp as u16);
        }
        i += len;
    }

    Ok(units)
}
