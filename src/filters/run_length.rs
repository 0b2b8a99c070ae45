//! `RunLengthDecode`/`RunLengthEncode` (spec.md §4.2), PackBits-style.

use crate::dictionary::Dictionary;
use crate::error::Result;

use super::Filter;

pub struct RunLength;

impl Filter for RunLength {
    fn decode(&self, input: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < input.len() {
            let len = input[i];
            i += 1;
            if len == 128 {
                break;
            } else if len < 128 {
                let count = len as usize + 1;
                let end = (i + count).min(input.len());
                out.extend_from_slice(&input[i..end]);
                i = end;
            } else {
                let count = 257 - len as usize;
                if i < input.len() {
                    out.extend(std::iter::repeat(input[i]).take(count));
                    i += 1;
                }
            }
        }
        Ok(out)
    }

    fn encode(&self, input: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < input.len() {
            let run_end = i + input[i..].iter().take_while(|&&b| b == input[i]).count();
            let run_len = run_end - i;
            if run_len >= 2 {
                let mut remaining = run_len;
                while remaining > 0 {
                    let chunk = remaining.min(128);
                    out.push((257 - chunk) as u8);
                    out.push(input[i]);
                    remaining -= chunk;
                    i += chunk;
                }
            } else {
                let lit_start = i;
                while i < input.len() {
                    let next_run = input[i..].iter().take_while(|&&b| b == input[i]).count();
                    if next_run >= 2 || i - lit_start >= 128 {
                        break;
                    }
                    i += 1;
                }
                out.push((i - lit_start - 1) as u8);
                out.extend_from_slice(&input[lit_start..i]);
            }
        }
        out.push(128);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let filter = RunLength;
        let data = b"aaaaabcdeeeeeeeeff";
        let encoded = filter.encode(data, None).unwrap();
        assert_eq!(filter.decode(&encoded, None).unwrap(), data);
    }

    #[test]
    fn stops_at_eod_marker() {
        let filter = RunLength;
        assert_eq!(filter.decode(&[0, b'x', 128, 0, b'y'], None).unwrap(), b"x");
    }
}
