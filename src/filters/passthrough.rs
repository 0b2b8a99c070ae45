//! `DCTDecode`/`JPXDecode`: opaque pass-through (spec.md §4.2). The object
//! layer never needs the decoded pixels, only the compressed bytes as the
//! stream's content.

use crate::dictionary::Dictionary;
use crate::error::Result;

use super::Filter;

pub struct Passthrough;

impl Filter for Passthrough {
    fn decode(&self, input: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        Ok(input.to_vec())
    }

    fn encode(&self, input: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        Ok(input.to_vec())
    }
}
