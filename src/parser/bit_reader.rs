/// Pulls variable width codes out of a byte stream, least significant bit first.
///
/// The cursor does not own the bytes it reads from. Bits of a code that straddles the end of one
/// data sub-block are kept in the accumulator until the next sub-block is supplied.
#[derive(Debug, Default)]
pub struct BitCursor {
    accumulator: u32,
    // number of valid bits in the accumulator, never more than one code plus a byte
    bits: u32,
}

impl BitCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the next `width` bit code, taking bytes from the front of `input` as needed.
    ///
    /// Returns `None` when `input` runs dry first; whatever was taken is carried into the next
    /// call.
    pub fn next(&mut self, width: u32, input: &mut &[u8]) -> Option<u16> {
        debug_assert!(width <= 16);

        while self.bits < width {
            let (&byte, rest) = input.split_first()?;
            *input = rest;

            self.accumulator |= (byte as u32) << self.bits;
            self.bits += 8;
        }

        let code = self.accumulator & ((1 << width) - 1);
        self.accumulator >>= width;
        self.bits -= width;

        Some(code as u16)
    }

    /// Bits carried over from the last sub-block.
    pub fn pending_bits(&self) -> u32 {
        self.bits
    }
}
