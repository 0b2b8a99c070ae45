//! `ASCIIHexDecode`/`ASCIIHexEncode` (spec.md §4.2).

use crate::dictionary::Dictionary;
use crate::error::{ParseError, Result};

use super::Filter;

pub struct AsciiHex;

impl Filter for AsciiHex {
    fn decode(&self, input: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let mut nibbles = Vec::new();
        for &b in input {
            if b == b'>' {
                break;
            }
            if b.is_ascii_whitespace() {
                continue;
            }
            let v = (b as char)
                .to_digit(16)
                .ok_or_else(|| ParseError::FilterError("ASCIIHexDecode: invalid digit".into()))?;
            nibbles.push(v as u8);
        }
        if nibbles.len() % 2 == 1 {
            nibbles.push(0);
        }
        Ok(nibbles.chunks_exact(2).map(|c| (c[0] << 4) | c[1]).collect())
    }

    fn encode(&self, input: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let mut out = String::with_capacity(input.len() * 2 + 1);
        for &b in input {
            out.push_str(&format!("{b:02X}"));
        }
        out.push('>');
        Ok(out.into_bytes())
    }
}
