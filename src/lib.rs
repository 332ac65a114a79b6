//! Single frame GIF decoding into an RGB pixel buffer.
//!
//! ```no_run
//! # fn main() -> Result<(), stillgif::DecodeError> {
//! let file = std::fs::File::open("image.gif")?;
//! let image = stillgif::decode(std::io::BufReader::new(file))?;
//! println!("{}x{}", image.width, image.height);
//! # Ok(())
//! # }
//! ```

pub mod image;
pub mod parser;
pub mod ppm_writer;

#[cfg(test)]
mod test_support;

pub use image::{ColorTable, Image, Rgb};
pub use parser::{DecodeError, Decoder, DecoderOptions, GifMetadata, UnknownExtensions};

use std::io::Read;

/// Decodes the first image of `reader` with the default options.
pub fn decode<R: Read>(reader: R) -> Result<Image, DecodeError> {
    Decoder::new(reader).decode()
}
