use super::bit_reader::BitCursor;
use super::error::{DecodeError, Result};
use crate::image::{ColorTable, Rgb};

use log::{trace, warn};

/// Codes never grow past 12 bits.
pub const MAX_CODE_WIDTH: u32 = 12;
const MAX_CODES: usize = 1 << MAX_CODE_WIDTH;

// palette indices are bytes, so larger roots could never be mapped to a color
const MAX_MINIMUM_CODE_SIZE: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LzwStatus {
    /// The data ran out in the middle of the stream, feed the next sub-block.
    NeedMore,
    /// The end of information code was read.
    Done,
}

/// Maps palette indices to colors and stores them in raster order.
#[derive(Debug)]
pub struct PixelWriter<'a> {
    color_table: &'a ColorTable,
    pixels: &'a mut [Rgb],
    position: usize,
    discarded: usize,
}

impl<'a> PixelWriter<'a> {
    pub fn new(color_table: &'a ColorTable, pixels: &'a mut [Rgb]) -> Self {
        Self {
            color_table,
            pixels,
            position: 0,
            discarded: 0,
        }
    }

    pub fn write(&mut self, index: u8) -> Result<()> {
        let color = self.color_table.get(index).ok_or(DecodeError::ColorIndexOutOfRange {
            index,
            table_len: self.color_table.len(),
        })?;

        match self.pixels.get_mut(self.position) {
            Some(pixel) => {
                *pixel = color;
                self.position += 1;
            }
            None => {
                if self.discarded == 0 {
                    warn!("image data holds more than {} pixels, discarding the rest", self.pixels.len());
                }
                self.discarded += 1;
            }
        }
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.position
    }

    pub fn is_full(&self) -> bool {
        self.position == self.pixels.len()
    }

    pub fn discarded(&self) -> usize {
        self.discarded
    }
}

/// Decompression state for a single frame.
///
/// The dictionary is a forest: every code above the end of information code points at a prefix
/// code and adds one suffix index to it. Codes below the clear code are the roots and stand for
/// their own palette index.
#[derive(Debug)]
pub struct LzwDecoder {
    minimum_code_size: u8,
    clear_code: u16,
    end_of_information_code: u16,

    prefix: Box<[u16]>,
    suffix: Box<[u8]>,
    // next code to be assigned, i.e. the current dictionary occupancy
    next_code: u16,
    code_width: u32,
    previous_code: Option<u16>,

    cursor: BitCursor,
    // reversed sequence of the code being expanded
    stack: Vec<u8>,
    done: bool,
    full_warned: bool,
}

impl LzwDecoder {
    pub fn new(minimum_code_size: u8) -> Result<Self> {
        if !(1..=MAX_MINIMUM_CODE_SIZE).contains(&minimum_code_size) {
            return Err(DecodeError::InvalidCodeSize(minimum_code_size));
        }

        let clear_code: u16 = 1 << minimum_code_size;
        let mut suffix = vec![0; MAX_CODES].into_boxed_slice();
        for (code, index) in suffix.iter_mut().take(clear_code as usize).enumerate() {
            *index = code as u8;
        }

        let decoder = Self {
            minimum_code_size,
            clear_code,
            end_of_information_code: clear_code + 1,
            prefix: vec![0; MAX_CODES].into_boxed_slice(),
            suffix,
            next_code: clear_code + 2,
            code_width: minimum_code_size as u32 + 1,
            previous_code: None,
            cursor: BitCursor::new(),
            stack: Vec::with_capacity(MAX_CODES),
            done: false,
            full_warned: false,
        };
        trace!(
            "lzw clear_code={} end_of_information_code={}",
            decoder.clear_code,
            decoder.end_of_information_code
        );

        Ok(decoder)
    }

    pub fn code_width(&self) -> u32 {
        self.code_width
    }

    /// Number of codes in use, roots and the two control codes included.
    pub fn dictionary_len(&self) -> usize {
        self.next_code as usize
    }

    pub fn previous_code(&self) -> Option<u16> {
        self.previous_code
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Decodes as many codes as `data` holds, writing pixels to `output`.
    ///
    /// Bits of a code left incomplete at the end of `data` are kept for the next call. Once the end
    /// of information code has been read every further call is a no-op.
    pub fn decode(&mut self, data: &[u8], output: &mut PixelWriter<'_>) -> Result<LzwStatus> {
        if self.done {
            return Ok(LzwStatus::Done);
        }

        let mut input = data;
        while let Some(code) = self.cursor.next(self.code_width, &mut input) {
            if code == self.clear_code {
                trace!("cleared");
                self.reset();
                continue;
            }

            if code == self.end_of_information_code {
                self.done = true;
                return Ok(LzwStatus::Done);
            }

            let Some(previous_code) = self.previous_code else {
                // nothing to extend yet, the code has to be a plain index
                if code >= self.clear_code {
                    return Err(self.corruption(code));
                }
                output.write(self.suffix[code as usize])?;
                self.previous_code = Some(code);
                continue;
            };

            if code > self.next_code {
                return Err(self.corruption(code));
            }

            // a code equal to the next free one repeats the previous sequence plus its own first
            // index, so the new entry has to exist before expanding it
            let first_index = if code < self.next_code {
                self.first_index(code)?
            } else {
                self.first_index(previous_code)?
            };
            self.add_entry(previous_code, first_index);

            self.expand(code)?;
            for &index in self.stack.iter().rev() {
                output.write(index)?;
            }

            self.previous_code = Some(code);
        }

        Ok(LzwStatus::NeedMore)
    }

    fn reset(&mut self) {
        self.next_code = self.end_of_information_code + 1;
        self.code_width = self.minimum_code_size as u32 + 1;
        self.previous_code = None;
        self.full_warned = false;
    }

    fn add_entry(&mut self, prefix: u16, suffix: u8) {
        if self.next_code as usize >= MAX_CODES {
            if !self.full_warned {
                warn!("lzw dictionary is full, continuing at {} bits until the next clear code", MAX_CODE_WIDTH);
                self.full_warned = true;
            }
            return;
        }

        self.prefix[self.next_code as usize] = prefix;
        self.suffix[self.next_code as usize] = suffix;
        self.next_code += 1;

        if self.next_code == 1 << self.code_width && self.code_width < MAX_CODE_WIDTH {
            self.code_width += 1;
            trace!("code width grew to {} bits", self.code_width);
        }
    }

    fn first_index(&self, mut code: u16) -> Result<u8> {
        // prefixes always point at smaller codes, the bound only guards against a broken table
        for _ in 0..MAX_CODES {
            if code < self.clear_code {
                return Ok(self.suffix[code as usize]);
            }
            code = self.prefix[code as usize];
        }
        Err(self.corruption(code))
    }

    fn expand(&mut self, code: u16) -> Result<()> {
        self.stack.clear();

        let mut current = code;
        while current >= self.clear_code {
            if self.stack.len() == MAX_CODES {
                return Err(self.corruption(code));
            }
            self.stack.push(self.suffix[current as usize]);
            current = self.prefix[current as usize];
        }
        self.stack.push(self.suffix[current as usize]);

        Ok(())
    }

    fn corruption(&self, code: u16) -> DecodeError {
        DecodeError::DictionaryCorruption {
            code,
            next: self.next_code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{lzw_encode, pack_codes};

    fn palette(len: usize) -> ColorTable {
        let bytes: Vec<u8> = (0..len).flat_map(|i| [i as u8, i as u8, i as u8]).collect();
        ColorTable::from_rgb_bytes(&bytes)
    }

    fn grey(i: u8) -> Rgb {
        Rgb::new(i, i, i)
    }

    #[test]
    fn two_by_two_literal_codes() {
        let table = ColorTable::from_rgb_bytes(&[0, 0, 0, 255, 255, 255, 255, 0, 0, 0, 255, 0]);
        let data = pack_codes(&[(4, 3), (0, 3), (1, 3), (2, 3), (3, 4), (5, 4)]);

        let mut pixels = vec![Rgb::default(); 4];
        let mut writer = PixelWriter::new(&table, &mut pixels);
        let mut decoder = LzwDecoder::new(2).unwrap();

        assert_eq!(decoder.decode(&data, &mut writer).unwrap(), LzwStatus::Done);
        assert!(writer.is_full());
        assert_eq!(
            pixels,
            vec![Rgb::new(0, 0, 0), Rgb::new(255, 255, 255), Rgb::new(255, 0, 0), Rgb::new(0, 255, 0)]
        );
    }

    fn state_after(codes: &[(u16, u32)]) -> (LzwDecoder, usize) {
        let table = palette(4);
        let mut pixels = vec![Rgb::default(); 16];
        let mut writer = PixelWriter::new(&table, &mut pixels);
        let mut decoder = LzwDecoder::new(2).unwrap();

        assert_eq!(decoder.decode(&pack_codes(codes), &mut writer).unwrap(), LzwStatus::Done);
        let written = writer.written();
        (decoder, written)
    }

    #[test]
    fn width_grows_after_two_entries_with_minimum_size_two() {
        let (decoder, _) = state_after(&[(4, 3), (0, 3), (5, 3)]);
        assert_eq!((decoder.dictionary_len(), decoder.code_width()), (6, 3));

        let (decoder, _) = state_after(&[(4, 3), (0, 3), (1, 3), (5, 3)]);
        assert_eq!((decoder.dictionary_len(), decoder.code_width()), (7, 3));

        let (decoder, _) = state_after(&[(4, 3), (0, 3), (1, 3), (2, 3), (5, 4)]);
        assert_eq!((decoder.dictionary_len(), decoder.code_width()), (8, 4));
    }

    #[test]
    fn repeated_clear_codes_reset_without_output() {
        let (decoder, written) = state_after(&[(4, 3), (1, 3), (2, 3), (5, 3)]);
        assert_eq!(decoder.dictionary_len(), 7);
        assert_eq!(decoder.previous_code(), Some(2));
        assert_eq!(written, 2);

        let (decoder, written) = state_after(&[(4, 3), (1, 3), (2, 3), (4, 3), (4, 3), (5, 3)]);
        assert_eq!(written, 2);
        assert_eq!(decoder.dictionary_len(), 6);
        assert_eq!(decoder.code_width(), 3);
        assert_eq!(decoder.previous_code(), None);
    }

    #[test]
    fn self_referencing_code() {
        // 1, then code 6 before it exists: expands to 1 1
        let table = palette(4);
        let mut pixels = vec![Rgb::default(); 3];
        let mut writer = PixelWriter::new(&table, &mut pixels);
        let mut decoder = LzwDecoder::new(2).unwrap();

        let status = decoder
            .decode(&pack_codes(&[(4, 3), (1, 3), (6, 3), (5, 3)]), &mut writer)
            .unwrap();
        assert_eq!(status, LzwStatus::Done);
        assert_eq!(pixels, vec![grey(1), grey(1), grey(1)]);
    }

    #[test]
    fn codes_past_the_next_free_one_are_corrupt() {
        let table = palette(4);
        let mut pixels = vec![Rgb::default(); 8];
        let mut writer = PixelWriter::new(&table, &mut pixels);
        let mut decoder = LzwDecoder::new(2).unwrap();

        let result = decoder.decode(&pack_codes(&[(4, 3), (1, 3), (7, 3)]), &mut writer);
        assert!(matches!(result, Err(DecodeError::DictionaryCorruption { code: 7, next: 6 })));
    }

    #[test]
    fn first_code_after_clear_must_be_a_root() {
        let table = palette(4);
        let mut pixels = vec![Rgb::default(); 8];
        let mut writer = PixelWriter::new(&table, &mut pixels);
        let mut decoder = LzwDecoder::new(2).unwrap();

        let result = decoder.decode(&pack_codes(&[(4, 3), (6, 3)]), &mut writer);
        assert!(matches!(result, Err(DecodeError::DictionaryCorruption { code: 6, .. })));
    }

    #[test]
    fn indices_outside_the_palette_are_rejected() {
        let table = palette(2);
        let mut pixels = vec![Rgb::default(); 8];
        let mut writer = PixelWriter::new(&table, &mut pixels);
        let mut decoder = LzwDecoder::new(2).unwrap();

        let result = decoder.decode(&pack_codes(&[(4, 3), (3, 3)]), &mut writer);
        assert!(matches!(
            result,
            Err(DecodeError::ColorIndexOutOfRange { index: 3, table_len: 2 })
        ));
    }

    #[test]
    fn minimum_code_size_is_bounded() {
        assert!(matches!(LzwDecoder::new(0), Err(DecodeError::InvalidCodeSize(0))));
        assert!(matches!(LzwDecoder::new(9), Err(DecodeError::InvalidCodeSize(9))));
        assert!(LzwDecoder::new(1).is_ok());
        assert!(LzwDecoder::new(8).is_ok());
    }

    #[test]
    fn resumes_across_sub_blocks_of_one_byte() {
        let indices: Vec<u8> = (0..200u32).map(|i| ((i * 7) % 13 % 4) as u8).collect();
        let data = lzw_encode(&indices, 2, true);

        let table = palette(4);
        let mut pixels = vec![Rgb::default(); indices.len()];
        let mut writer = PixelWriter::new(&table, &mut pixels);
        let mut decoder = LzwDecoder::new(2).unwrap();

        let mut status = LzwStatus::NeedMore;
        for byte in data.chunks(1) {
            status = decoder.decode(byte, &mut writer).unwrap();
        }
        assert_eq!(status, LzwStatus::Done);

        let expected: Vec<Rgb> = indices.iter().map(|&i| grey(i)).collect();
        assert_eq!(pixels, expected);
    }

    #[test]
    fn full_dictionary_without_clear_keeps_decoding() {
        // enough varied input to exhaust all 4096 codes
        let mut seed = 0x2545_f491_u32;
        let indices: Vec<u8> = (0..40_000)
            .map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 17;
                seed ^= seed << 5;
                (seed % 16) as u8
            })
            .collect();

        for reset_when_full in [false, true] {
            let data = lzw_encode(&indices, 4, reset_when_full);

            let table = palette(16);
            let mut pixels = vec![Rgb::default(); indices.len()];
            let mut writer = PixelWriter::new(&table, &mut pixels);
            let mut decoder = LzwDecoder::new(4).unwrap();

            assert_eq!(decoder.decode(&data, &mut writer).unwrap(), LzwStatus::Done);
            assert!(writer.is_full());
            assert_eq!(writer.discarded(), 0);
            if !reset_when_full {
                assert_eq!(decoder.dictionary_len(), MAX_CODES);
                assert_eq!(decoder.code_width(), MAX_CODE_WIDTH);
            }

            let expected: Vec<Rgb> = indices.iter().map(|&i| grey(i)).collect();
            assert_eq!(pixels, expected);
        }
    }

    #[test]
    fn ignores_data_after_end_code() {
        let table = palette(4);
        let mut pixels = vec![Rgb::default(); 1];
        let mut writer = PixelWriter::new(&table, &mut pixels);
        let mut decoder = LzwDecoder::new(2).unwrap();

        let data = pack_codes(&[(4, 3), (2, 3), (5, 3), (7, 3)]);
        assert_eq!(decoder.decode(&data, &mut writer).unwrap(), LzwStatus::Done);
        assert_eq!(decoder.decode(&[0xff], &mut writer).unwrap(), LzwStatus::Done);
        assert!(decoder.is_done());
        assert_eq!(pixels, vec![grey(2)]);
    }
}
