//! Helpers for assembling GIF streams in tests.

use std::collections::HashMap;

const MAX_CODES: u16 = 1 << 12;

/// Packs `(code, width)` pairs least significant bit first.
pub fn pack_codes(codes: &[(u16, u32)]) -> Vec<u8> {
    let mut bytes = Vec::new();
    let mut accumulator: u32 = 0;
    let mut bits = 0;

    for &(code, width) in codes {
        accumulator |= (code as u32) << bits;
        bits += width;
        while bits >= 8 {
            bytes.push(accumulator as u8);
            accumulator >>= 8;
            bits -= 8;
        }
    }
    if bits > 0 {
        bytes.push(accumulator as u8);
    }

    bytes
}

/// A plain LZW encoder emitting GIF flavoured codes.
///
/// When the table fills up the encoder either emits a clear code or keeps going at 12 bits
/// without adding entries.
pub fn lzw_encode(indices: &[u8], minimum_code_size: u8, reset_when_full: bool) -> Vec<u8> {
    let clear_code: u16 = 1 << minimum_code_size;
    let end_code = clear_code + 1;
    let initial_width = minimum_code_size as u32 + 1;

    let mut table: HashMap<(u16, u8), u16> = HashMap::new();
    let mut width = initial_width;
    let mut next_code = clear_code + 2;
    let mut codes = vec![(clear_code, width)];

    let Some((&first, rest)) = indices.split_first() else {
        codes.push((end_code, width));
        return pack_codes(&codes);
    };

    let mut current = first as u16;
    for &index in rest {
        if let Some(&code) = table.get(&(current, index)) {
            current = code;
            continue;
        }

        codes.push((current, width));
        if next_code < MAX_CODES {
            table.insert((current, index), next_code);
            if next_code == 1 << width && width < 12 {
                width += 1;
            }
            next_code += 1;
        } else if reset_when_full {
            codes.push((clear_code, width));
            table.clear();
            width = initial_width;
            next_code = clear_code + 2;
        }
        current = index as u16;
    }

    codes.push((current, width));
    codes.push((end_code, width));
    pack_codes(&codes)
}

pub fn grey_palette(len: usize) -> Vec<[u8; 3]> {
    (0..len).map(|i| [(i as u8).wrapping_mul(10); 3]).collect()
}

fn table_exponent(table: &[[u8; 3]]) -> u8 {
    assert!(table.len().is_power_of_two() && (2..=256).contains(&table.len()));
    table.len().trailing_zeros() as u8 - 1
}

/// Builds a GIF89a stream block by block. An empty palette means no table.
pub struct GifBuilder {
    bytes: Vec<u8>,
}

impl GifBuilder {
    pub fn new(width: u16, height: u16, global_color_table: &[[u8; 3]]) -> Self {
        let mut bytes = b"GIF89a".to_vec();
        bytes.extend_from_slice(&width.to_le_bytes());
        bytes.extend_from_slice(&height.to_le_bytes());

        let packed_fields = if global_color_table.is_empty() {
            0
        } else {
            0b1000_0000 | table_exponent(global_color_table)
        };
        bytes.extend_from_slice(&[packed_fields, 0, 0]);
        bytes.extend(global_color_table.iter().flatten());

        Self { bytes }
    }

    /// Appends an extension; `body` is everything after the label.
    pub fn extension(mut self, label: u8, body: &[u8]) -> Self {
        self.bytes.extend_from_slice(&[0x21, label]);
        self.bytes.extend_from_slice(body);
        self
    }

    pub fn image(
        mut self,
        width: u16,
        height: u16,
        local_color_table: &[[u8; 3]],
        interlaced: bool,
        minimum_code_size: u8,
        data: &[u8],
    ) -> Self {
        self.bytes.push(0x2c);
        self.bytes.extend_from_slice(&[0, 0, 0, 0]);
        self.bytes.extend_from_slice(&width.to_le_bytes());
        self.bytes.extend_from_slice(&height.to_le_bytes());

        let mut packed_fields = 0;
        if !local_color_table.is_empty() {
            packed_fields |= 0b1000_0000 | table_exponent(local_color_table);
        }
        if interlaced {
            packed_fields |= 0b0100_0000;
        }
        self.bytes.push(packed_fields);
        self.bytes.extend(local_color_table.iter().flatten());

        self.bytes.push(minimum_code_size);
        for block in data.chunks(u8::MAX as usize) {
            self.bytes.push(block.len() as u8);
            self.bytes.extend_from_slice(block);
        }
        self.bytes.push(0);
        self
    }

    pub fn trailer(mut self) -> Vec<u8> {
        self.bytes.push(0x3b);
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_lsb_first() {
        assert_eq!(pack_codes(&[(4, 3), (1, 3), (5, 3)]), vec![0b01_001_100, 0b1]);
    }

    #[test]
    fn encoder_grows_width_like_the_decoder() {
        // 0 1 2 3 with m = 2: the fourth code is already 4 bits wide
        let data = lzw_encode(&[0, 1, 2, 3], 2, true);
        assert_eq!(data, pack_codes(&[(4, 3), (0, 3), (1, 3), (2, 3), (3, 4), (5, 4)]));
    }
}
