mod bit_reader;
mod block_reader;
mod decoder;
mod error;
mod lzw;
mod metadata;

pub use bit_reader::BitCursor;
pub use block_reader::BlockReader;
pub use decoder::Decoder;
pub use error::{DecodeError, Result};
pub use lzw::{LzwDecoder, LzwStatus, PixelWriter, MAX_CODE_WIDTH};
pub use metadata::{
    parse_color_table, parse_extension, parse_header, parse_image_descriptor,
    parse_logical_screen_descriptor, ExtensionBlock, GifMetadata, ImageDescriptor,
    LogicalScreenDescriptor, Version,
};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposalMethod {
    DoNotDispose = 1,
    RestoreToBackgroundColor = 2,
    RestoreToPrevious = 3,
}

impl DisposalMethod {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(DisposalMethod::DoNotDispose),
            2 => Some(DisposalMethod::RestoreToBackgroundColor),
            3 => Some(DisposalMethod::RestoreToPrevious),
            _ => None,
        }
    }
}

/// What to do with an extension whose label is not one of the four GIF89a extensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownExtensions {
    /// Stop decoding with [`DecodeError::UnknownExtension`].
    #[default]
    Fail,
    /// Consume the extension's data sub-blocks and keep going.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderOptions {
    pub unknown_extensions: UnknownExtensions,
    /// Put the rows of interlaced frames back in top to bottom order.
    pub deinterlace: bool,
    /// Largest frame, in pixels, the decoder will allocate for. `None` disables the check.
    pub max_pixels: Option<usize>,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            unknown_extensions: UnknownExtensions::Fail,
            deinterlace: true,
            max_pixels: Some(1 << 26),
        }
    }
}

impl DecoderOptions {
    pub fn unknown_extensions(mut self, policy: UnknownExtensions) -> Self {
        self.unknown_extensions = policy;
        self
    }

    pub fn deinterlace(mut self, deinterlace: bool) -> Self {
        self.deinterlace = deinterlace;
        self
    }

    pub fn max_pixels(mut self, max_pixels: Option<usize>) -> Self {
        self.max_pixels = max_pixels;
        self
    }
}
