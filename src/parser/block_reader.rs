use super::error::Result;

use log::trace;

use std::io::prelude::*;

/// Reads the fixed records and data sub-block sequences a GIF stream is made of, keeping count of
/// every byte taken from the source.
#[derive(Debug)]
pub struct BlockReader<R: Read> {
    inner: R,
    consumed: usize,
}

impl<R: Read> BlockReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, consumed: 0 }
    }

    /// Total number of bytes read from the source so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buffer = [0; N];
        self.fill(&mut buffer)?;
        Ok(buffer)
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        let [byte] = self.read_fixed::<1>()?;
        Ok(byte)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        // multi-byte numeric fields are ordered with the least significant byte first
        Ok(u16::from_le_bytes(self.read_fixed::<2>()?))
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<Box<[u8]>> {
        let mut buffer = vec![0; count];
        self.fill(&mut buffer)?;
        Ok(buffer.into_boxed_slice())
    }

    /// Reads a single data sub-block into `buffer`, replacing its contents.
    ///
    /// Returns `None` once the zero length block terminator is read.
    pub fn next_data_sub_block(&mut self, buffer: &mut Vec<u8>) -> Result<Option<usize>> {
        let block_size = self.read_byte()? as usize;
        if block_size == 0 {
            return Ok(None);
        }

        buffer.clear();
        buffer.resize(block_size, 0);
        self.fill(buffer)?;

        trace!("read data sub-block of {} bytes", block_size);
        Ok(Some(block_size))
    }

    /// Reads a whole sequence of data sub-blocks up to and including the terminator.
    ///
    /// Returns the concatenated payload and the number of bytes consumed, length prefixes and
    /// terminator included.
    pub fn read_data_sub_blocks(&mut self) -> Result<(Vec<u8>, usize)> {
        let start = self.consumed;
        let mut result = Vec::new();
        let mut block = Vec::with_capacity(u8::MAX as usize);

        while self.next_data_sub_block(&mut block)?.is_some() {
            result.extend_from_slice(&block);
        }

        Ok((result, self.consumed - start))
    }

    /// Consumes a sequence of data sub-blocks without keeping the payload.
    pub fn skip_data_sub_blocks(&mut self) -> Result<usize> {
        let start = self.consumed;
        let mut block = Vec::with_capacity(u8::MAX as usize);

        while self.next_data_sub_block(&mut block)?.is_some() {}

        Ok(self.consumed - start)
    }

    fn fill(&mut self, buffer: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buffer)?;
        self.consumed += buffer.len();
        Ok(())
    }
}
