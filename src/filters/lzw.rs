//! `LZWDecode`/`LZWEncode` (spec.md §4.2), grounded in the teacher's use of
//! `weezl` for exactly this filter (PDF's variable-width MSB-first TIFF/LZW
//! variant, early-change enabled).

use weezl::decode::Decoder as WeezlDecoder;
use weezl::encode::Encoder as WeezlEncoder;
use weezl::BitOrder;

use crate::dictionary::Dictionary;
use crate::error::{ParseError, Result};

use super::Filter;

pub struct Lzw;

impl Filter for Lzw {
    fn decode(&self, input: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let mut decoder = WeezlDecoder::new(BitOrder::Msb, 8);
        let out = decoder
            .decode(input)
            .map_err(|e| ParseError::FilterError(format!("LZWDecode: {e}")))?;
        super::flate::apply_predictor(&out, params)
    }

    fn encode(&self, input: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let mut encoder = WeezlEncoder::new(BitOrder::Msb, 8);
        encoder
            .encode(input)
            .map_err(|e| ParseError::FilterError(format!("LZWEncode: {e}")).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let filter = Lzw;
        let data = b"TOBEORNOTTOBEORTOBEORNOT";
        let encoded = filter.encode(data, None).unwrap();
        let decoded = filter.decode(&encoded, None).unwrap();
        assert_eq!(decoded, data);
    }
}
