//! `ASCII85Decode`/`ASCII85Encode` (spec.md §4.2), the Adobe base-85
//! variant with `z` standing in for a zero four-byte group and a `~>` EOD.

use crate::dictionary::Dictionary;
use crate::error::{ParseError, Result};

use super::Filter;

pub struct Ascii85;

impl Filter for Ascii85 {
    fn decode(&self, input: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut group = [0u8; 5];
        let mut group_len = 0usize;
        let mut iter = input.iter().copied().peekable();
        while let Some(b) = iter.next() {
            if b == b'~' {
                break;
            }
            if b.is_ascii_whitespace() {
                continue;
            }
            if b == b'z' && group_len == 0 {
                out.extend_from_slice(&[0, 0, 0, 0]);
                continue;
            }
            if !(b'!'..=b'u').contains(&b) {
                return Err(ParseError::FilterError("ASCII85Decode: invalid character".into()).into());
            }
            group[group_len] = b - b'!';
            group_len += 1;
            if group_len == 5 {
                out.extend_from_slice(&decode_group(&group, 5));
                group_len = 0;
            }
        }
        if group_len > 0 {
            // Pad the trailing partial group with 'u' (84) before decoding,
            // then keep only `group_len - 1` output bytes.
            for slot in group.iter_mut().skip(group_len) {
                *slot = 84;
            }
            let decoded = decode_group(&group, 5);
            out.extend_from_slice(&decoded[..group_len - 1]);
        }
        Ok(out)
    }

    fn encode(&self, input: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(input.len() * 5 / 4 + 2);
        for chunk in input.chunks(4) {
            if chunk.len() == 4 && chunk == [0, 0, 0, 0] {
                out.push(b'z');
                continue;
            }
            let mut buf = [0u8; 4];
            buf[..chunk.len()].copy_from_slice(chunk);
            let value = u32::from_be_bytes(buf);
            let mut digits = [0u8; 5];
            let mut v = value;
            for d in digits.iter_mut().rev() {
                *d = (v % 85) as u8 + b'!';
                v /= 85;
            }
            out.extend_from_slice(&digits[..chunk.len() + 1]);
        }
        out.extend_from_slice(b"~>");
        Ok(out)
    }
}

fn decode_group(group: &[u8; 5], _len: usize) -> [u8; 4] {
    let mut value: u32 = 0;
    for &d in group {
        value = value.wrapping_mul(85).wrapping_add(d as u32);
    }
    value.to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let filter = Ascii85;
        let encoded = filter.encode(b"Man is distinguished", None).unwrap();
        assert_eq!(filter.decode(&encoded, None).unwrap(), b"Man is distinguished");
    }

    #[test]
    fn zero_group_uses_z_shorthand() {
        let filter = Ascii85;
        let encoded = filter.encode(&[0, 0, 0, 0], None).unwrap();
        assert_eq!(encoded, b"z~>");
        assert_eq!(filter.decode(&encoded, None).unwrap(), vec![0, 0, 0, 0]);
    }
}
