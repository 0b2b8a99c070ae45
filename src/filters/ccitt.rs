//! `CCITTFaxDecode`, decode-only per spec.md §4.2 ("no producer in this
//! crate ever needs to re-encode a fax image"). Implements Group 4 (`K < 0`,
//! the two-dimensional Modified READ coding of ITU-T T.6), the overwhelming
//! majority of what PDF producers emit. Group 3 1-D/2-D (`K >= 0`) is
//! rejected with a clear error rather than silently producing garbage,
//! since no reference implementation in the retrieved pack decodes it
//! either and the pack carries no fax codec crate to lean on.

use crate::dictionary::Dictionary;
use crate::error::{Error, ParseError, Result};

use super::Filter;

pub struct Ccitt;

impl Filter for Ccitt {
    fn decode(&self, input: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let k = params.and_then(|p| p.get(b"K").ok()).and_then(|o| o.as_i64()).unwrap_or(0);
        if k >= 0 {
            return Err(ParseError::FilterError(
                "CCITTFaxDecode: only Group 4 (K < 0) is supported".into(),
            )
            .into());
        }
        let columns = params.and_then(|p| p.get(b"Columns").ok()).and_then(|o| o.as_i64()).unwrap_or(1728).max(1) as usize;
        let rows = params.and_then(|p| p.get(b"Rows").ok()).and_then(|o| o.as_i64()).unwrap_or(0).max(0) as usize;
        let black_is_1 =
            params.and_then(|p| p.get(b"BlackIs1").ok()).and_then(|o| o.as_bool()).unwrap_or(false);
        let byte_align = params
            .and_then(|p| p.get(b"EncodedByteAlign").ok())
            .and_then(|o| o.as_bool())
            .unwrap_or(false);

        decode_group4(input, columns, rows, black_is_1, byte_align)
    }

    fn encode(&self, _input: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        Err(Error::Unimplemented("CCITTFaxEncode"))
    }
}

/// Two-dimensional mode codes (ITU-T T.6 Table 1). Plain `Eol`/2D-extension
/// codes never appear in the Group 4 streams a PDF producer emits, so they
/// are left out; a bitstream that uses them surfaces as an "invalid mode
/// code" error.
#[derive(Clone, Copy, Debug)]
enum Mode {
    Pass,
    Horizontal,
    Vertical(i8),
}

const MODE_CODES: &[(u8, u16, Mode)] = &[
    (1, 0b1, Mode::Vertical(0)),
    (3, 0b011, Mode::Vertical(1)),
    (3, 0b010, Mode::Vertical(-1)),
    (3, 0b001, Mode::Horizontal),
    (4, 0b0001, Mode::Pass),
    (6, 0b000011, Mode::Vertical(2)),
    (6, 0b000010, Mode::Vertical(-2)),
    (7, 0b0000011, Mode::Vertical(3)),
    (7, 0b0000010, Mode::Vertical(-3)),
];

struct CodeEntry {
    bits: u8,
    code: u16,
    run: u16,
}

macro_rules! codes {
    ($( $bits:expr => $code:expr, $run:expr );* $(;)?) => {
        &[ $( CodeEntry { bits: $bits, code: $code, run: $run } ),* ]
    };
}

/// White terminating (run 0-63) and makeup (run 64-1728) codes, ITU-T T.4
/// Tables 2 and 3.
const WHITE_CODES: &[CodeEntry] = codes! {
    8 => 0b00110101, 0;   6 => 0b000111, 1;    4 => 0b0111, 2;       4 => 0b1000, 3;
    4 => 0b1011, 4;       4 => 0b1100, 5;      4 => 0b1110, 6;       4 => 0b1111, 7;
    5 => 0b10011, 8;      5 => 0b10100, 9;     5 => 0b00111, 10;     5 => 0b01000, 11;
    6 => 0b001000, 12;    6 => 0b000011, 13;   6 => 0b110100, 14;    6 => 0b110101, 15;
    6 => 0b101010, 16;    6 => 0b101011, 17;   7 => 0b0100111, 18;   7 => 0b0001100, 19;
    7 => 0b0001000, 20;   7 => 0b0010111, 21;  7 => 0b0000011, 22;   7 => 0b0000100, 23;
    7 => 0b0101000, 24;   7 => 0b0101011, 25;  7 => 0b0010011, 26;   7 => 0b0100100, 27;
    7 => 0b0011000, 28;   8 => 0b00000010, 29; 8 => 0b00000011, 30;  8 => 0b00011010, 31;
    8 => 0b00011011, 32;  8 => 0b00010010, 33; 8 => 0b00010011, 34;  8 => 0b00010100, 35;
    8 => 0b00010101, 36;  8 => 0b00010110, 37; 8 => 0b00010111, 38;  8 => 0b00101000, 39;
    8 => 0b00101001, 40;  8 => 0b00101010, 41; 8 => 0b00101011, 42;  8 => 0b00101100, 43;
    8 => 0b00101101, 44;  8 => 0b00000100, 45; 8 => 0b00000101, 46;  8 => 0b00001010, 47;
    8 => 0b00001011, 48;  8 => 0b01010010, 49; 8 => 0b01010011, 50;  8 => 0b01010100, 51;
    8 => 0b01010101, 52;  8 => 0b00100100, 53; 8 => 0b00100101, 54;  8 => 0b01011000, 55;
    8 => 0b01011001, 56;  8 => 0b01011010, 57; 8 => 0b01011011, 58;  8 => 0b01001010, 59;
    8 => 0b01001011, 60;  8 => 0b01001100, 61; 8 => 0b01001101, 62;  8 => 0b00110100, 63;
    5 => 0b11011, 64;     5 => 0b10010, 128;   6 => 0b010111, 192;   7 => 0b0110111, 256;
    8 => 0b00110110, 320; 8 => 0b00110111, 384;8 => 0b01100100, 448; 8 => 0b01100101, 512;
    8 => 0b01101000, 576; 8 => 0b01100111, 640;9 => 0b011001100, 704;9 => 0b011001101, 768;
    9 => 0b011010010, 832;9 => 0b011010011, 896;9 => 0b011010100, 960;9 => 0b011010101, 1024;
    9 => 0b011010110, 1088;9 => 0b011010111, 1152;9 => 0b011011000, 1216;9 => 0b011011001, 1280;
    9 => 0b011011010, 1344;9 => 0b011011011, 1408;9 => 0b010011000, 1472;9 => 0b010011001, 1536;
    9 => 0b010011010, 1600;6 => 0b011000, 1664;9 => 0b010011011, 1728;
};

/// Black terminating (run 0-63) and makeup (run 64-1728) codes, ITU-T T.4
/// Table 3.
const BLACK_CODES: &[CodeEntry] = codes! {
    10 => 0b0000110111, 0; 3 => 0b010, 1;      2 => 0b11, 2;         2 => 0b10, 3;
    3 => 0b011, 4;         4 => 0b0011, 5;     4 => 0b0010, 6;       5 => 0b00011, 7;
    6 => 0b000101, 8;      6 => 0b000100, 9;   7 => 0b0000100, 10;   7 => 0b0000101, 11;
    7 => 0b0000111, 12;    8 => 0b00000100, 13;8 => 0b00000111, 14;  9 => 0b000011000, 15;
    10 => 0b0000010111, 16;10 => 0b0000011000, 17;10 => 0b0000001000, 18;11 => 0b00001100111, 19;
    11 => 0b00001101000, 20;11 => 0b00001101100, 21;11 => 0b00000110111, 22;11 => 0b00000101000, 23;
    11 => 0b00000010111, 24;11 => 0b00000011000, 25;12 => 0b000011001010, 26;12 => 0b000011001011, 27;
    12 => 0b000011001100, 28;12 => 0b000011001101, 29;12 => 0b000001101000, 30;12 => 0b000001101001, 31;
    12 => 0b000001101010, 32;12 => 0b000001101011, 33;12 => 0b000011010010, 34;12 => 0b000011010011, 35;
    12 => 0b000011010100, 36;12 => 0b000011010101, 37;12 => 0b000011010110, 38;12 => 0b000011010111, 39;
    12 => 0b000001101100, 40;12 => 0b000001101101, 41;12 => 0b000011011010, 42;12 => 0b000011011011, 43;
    12 => 0b000001010100, 44;12 => 0b000001010101, 45;12 => 0b000001010110, 46;12 => 0b000001010111, 47;
    12 => 0b000001100100, 48;12 => 0b000001100101, 49;12 => 0b000001010010, 50;12 => 0b000001010011, 51;
    12 => 0b000000100100, 52;12 => 0b000000110111, 53;12 => 0b000000111000, 54;12 => 0b000000100111, 55;
    12 => 0b000000101000, 56;12 => 0b000001011000, 57;12 => 0b000001011001, 58;12 => 0b000000101011, 59;
    12 => 0b000000101100, 60;12 => 0b000001011010, 61;12 => 0b000001100110, 62;12 => 0b000001100111, 63;
    10 => 0b0000001111, 64;12 => 0b000011001000, 128;12 => 0b000011001001, 192;12 => 0b000001011011, 256;
    12 => 0b000000110011, 320;12 => 0b000000110100, 384;12 => 0b000000110101, 448;13 => 0b0000001101100, 512;
    13 => 0b0000001101101, 576;13 => 0b0000001001010, 640;13 => 0b0000001001011, 704;13 => 0b0000001001100, 768;
    13 => 0b0000001001101, 832;13 => 0b0000001110010, 896;13 => 0b0000001110011, 960;13 => 0b0000001110100, 1024;
    13 => 0b0000001110101, 1088;13 => 0b0000001110110, 1152;13 => 0b0000001110111, 1216;13 => 0b0000001010010, 1280;
    13 => 0b0000001010011, 1344;13 => 0b0000001010100, 1408;13 => 0b0000001010101, 1472;13 => 0b0000001011010, 1536;
    13 => 0b0000001011011, 1600;13 => 0b0000001100100, 1664;13 => 0b0000001100101, 1728;
};

/// Extended makeup codes (run 1792-2560), ITU-T T.4 Table 4, shared between
/// white and black runs.
const EXT_CODES: &[CodeEntry] = codes! {
    11 => 0b00000001000, 1792; 11 => 0b00000001100, 1856; 11 => 0b00000001101, 1920;
    12 => 0b000000010010, 1984;12 => 0b000000010011, 2048;12 => 0b000000010100, 2112;
    12 => 0b000000010101, 2176;12 => 0b000000010110, 2240;12 => 0b000000010111, 2304;
    12 => 0b000000011100, 2368;12 => 0b000000011101, 2432;12 => 0b000000011110, 2496;
    12 => 0b000000011111, 2560;
};

struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
    total_bits: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        BitReader { data, bit_pos: 0, total_bits: data.len() * 8 }
    }

    fn remaining(&self) -> usize {
        self.total_bits.saturating_sub(self.bit_pos)
    }

    fn peek_bits(&self, n: usize) -> Option<u32> {
        if n == 0 || n > self.remaining() {
            return None;
        }
        let mut value = 0u32;
        for i in 0..n {
            let bit_index = self.bit_pos + i;
            let byte = self.data[bit_index / 8];
            let bit = (byte >> (7 - bit_index % 8)) & 1;
            value = (value << 1) | bit as u32;
        }
        Some(value)
    }

    fn consume(&mut self, n: usize) {
        self.bit_pos += n;
    }

    fn align_to_byte(&mut self) {
        self.bit_pos = (self.bit_pos + 7) / 8 * 8;
    }
}

fn read_mode(reader: &mut BitReader) -> Result<Option<Mode>> {
    for &(bits, code, mode) in MODE_CODES {
        if reader.peek_bits(bits as usize) == Some(code as u32) {
            reader.consume(bits as usize);
            return Ok(Some(mode));
        }
    }
    if reader.remaining() == 0 {
        return Ok(None);
    }
    Err(ParseError::FilterError("CCITTFaxDecode: invalid mode code".into()).into())
}

fn decode_run(reader: &mut BitReader, white: bool) -> Result<u32> {
    let mut total = 0u32;
    loop {
        let table: &[CodeEntry] = if white { WHITE_CODES } else { BLACK_CODES };
        let entry = table
            .iter()
            .chain(EXT_CODES.iter())
            .find(|entry| reader.peek_bits(entry.bits as usize) == Some(entry.code as u32))
            .ok_or_else(|| Error::from(ParseError::FilterError("CCITTFaxDecode: invalid run-length code".into())))?;
        reader.consume(entry.bits as usize);
        total += entry.run as u32;
        if entry.run < 64 {
            return Ok(total);
        }
    }
}

/// First two changing elements on the reference line strictly to the right
/// of `a0`, with `b1` of opposite colour to the run currently being coded
/// (`white`). The reference line's changes alternate white-to-black (even
/// index) then black-to-white (odd index), since every line starts white.
fn find_b1_b2(ref_changes: &[usize], a0: i64, white: bool, columns: usize) -> (usize, usize) {
    let mut idx = 0usize;
    while idx < ref_changes.len() && (ref_changes[idx] as i64) <= a0 {
        idx += 1;
    }
    if (idx % 2 == 0) != white {
        idx += 1;
    }
    let b1 = ref_changes.get(idx).copied().unwrap_or(columns);
    let b2 = ref_changes.get(idx + 1).copied().unwrap_or(columns);
    (b1, b2)
}

/// Decodes one coding line against `ref_changes` (the previous line's
/// changing elements), returning this line's own changing elements.
/// `Ok(None)` means the bitstream ended cleanly before any mode code for
/// this line was read (used to detect EOF when `/Rows` wasn't given).
fn decode_row(reader: &mut BitReader, columns: usize, ref_changes: &[usize]) -> Result<Option<Vec<usize>>> {
    let mut cur_changes = Vec::new();
    let mut a0: i64 = -1;
    let mut white = true;
    while a0 < columns as i64 {
        let mode = match read_mode(reader)? {
            Some(mode) => mode,
            None if cur_changes.is_empty() => return Ok(None),
            None => return Err(ParseError::FilterError("CCITTFaxDecode: truncated row".into()).into()),
        };
        let (b1, b2) = find_b1_b2(ref_changes, a0, white, columns);
        match mode {
            Mode::Pass => {
                a0 = b2 as i64;
            }
            Mode::Horizontal => {
                let base = a0.max(0);
                let run1 = decode_run(reader, white)? as i64;
                let run2 = decode_run(reader, !white)? as i64;
                let a1 = (base + run1).min(columns as i64);
                let a2 = (a1 + run2).min(columns as i64);
                cur_changes.push(a1 as usize);
                cur_changes.push(a2 as usize);
                a0 = a2;
            }
            Mode::Vertical(n) => {
                let a1 = (b1 as i64 + n as i64).clamp(0, columns as i64);
                cur_changes.push(a1 as usize);
                a0 = a1;
                white = !white;
            }
        }
    }
    Ok(Some(cur_changes))
}

/// Packs one decoded row's changing elements into `columns` bits, MSB
/// first, padded to a whole number of bytes. Default encoding is 0 = black,
/// 1 = white unless `black_is_1` flips it.
fn render_row(changes: &[usize], columns: usize, black_is_1: bool) -> Vec<u8> {
    let mut row = vec![0u8; (columns + 7) / 8];
    let mut black = false;
    let mut pos = 0usize;
    let mut boundaries: Vec<usize> = changes.iter().map(|&c| c.min(columns)).collect();
    boundaries.push(columns);
    for &end in &boundaries {
        if end > pos {
            let bit_is_one = black == black_is_1;
            if bit_is_one {
                for col in pos..end {
                    row[col / 8] |= 0x80 >> (col % 8);
                }
            }
        }
        pos = end;
        black = !black;
    }
    row
}

fn decode_group4(input: &[u8], columns: usize, rows: usize, black_is_1: bool, byte_align: bool) -> Result<Vec<u8>> {
    let mut reader = BitReader::new(input);
    let mut ref_changes: Vec<usize> = Vec::new();
    let mut out = Vec::new();
    let mut row_count = 0usize;
    loop {
        if rows > 0 && row_count >= rows {
            break;
        }
        if byte_align {
            reader.align_to_byte();
        }
        match decode_row(&mut reader, columns, &ref_changes) {
            Ok(Some(changes)) => {
                out.extend_from_slice(&render_row(&changes, columns, black_is_1));
                ref_changes = changes;
                row_count += 1;
            }
            Ok(None) => break,
            Err(err) => {
                // With no declared row count, trailing padding bits can't be
                // told apart from corruption; stop instead of failing.
                if rows == 0 {
                    break;
                }
                return Err(err);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary;

    #[test]
    fn group3_k_non_negative_is_rejected() {
        let filter = Ccitt;
        let params = dictionary! { "K" => 0i64, "Columns" => 1728i64 };
        let err = filter.decode(b"", Some(&params)).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::FilterError(_))));
    }

    #[test]
    fn decodes_a_single_horizontal_mode_row() {
        // 4 columns: horizontal mode, white run 2, black run 2.
        // "001" (horizontal) + "0111" (white run 2) + "11" (black run 2),
        // padded with zero bits to a whole number of bytes.
        let bits = [0b0010_1111u8, 0b1000_0000u8];
        let params = dictionary! {
            "K" => -1i64,
            "Columns" => 4i64,
            "Rows" => 1i64,
        };
        let out = Ccitt.decode(&bits, Some(&params)).unwrap();
        // col 0-1 white (bit=1), col 2-3 black (bit=0), rest of byte padded 0.
        assert_eq!(out, vec![0b1100_0000]);
    }

    #[test]
    fn decodes_an_all_white_row_via_vertical_mode() {
        // First row, reference line all white: b1 = columns (no changes), so
        // V0 ("1") places a1 at columns, reproducing "no change at all".
        let bits = [0b1000_0000u8];
        let params = dictionary! {
            "K" => -1i64,
            "Columns" => 4i64,
            "Rows" => 1i64,
        };
        let out = Ccitt.decode(&bits, Some(&params)).unwrap();
        assert_eq!(out, vec![0b1111_0000]);
    }

    #[test]
    fn encode_is_unimplemented() {
        let err = Ccitt.encode(b"", None).unwrap_err();
        assert!(matches!(err, Error::Unimplemented(_)));
    }
}
