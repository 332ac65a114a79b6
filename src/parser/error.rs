use thiserror::Error;

use std::collections::TryReserveError;
use std::io;

pub type Result<T> = std::result::Result<T, DecodeError>;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("stream ended before the block was complete")]
    TruncatedStream,

    #[error("failed to read from the byte source")]
    Io(#[source] io::Error),

    #[error("signature is invalid, got {0:?}")]
    BadSignature([u8; 3]),

    #[error("version {0} in the header is unsupported")]
    UnsupportedVersion(String),

    #[error("encountered extension with label 0x{0:02x}, this label is not supported")]
    UnknownExtension(u8),

    #[error("extension with label 0x{label:02x} is malformed: {reason}")]
    MalformedExtension {
        label: u8,
        reason: &'static str,
    },

    #[error("encountered unexpected block label 0x{0:02x}")]
    UnexpectedBlockLabel(u8),

    #[error("frame is {frame_width}x{frame_height} but the logical screen is {screen_width}x{screen_height}")]
    FrameSizeMismatch {
        screen_width: u16,
        screen_height: u16,
        frame_width: u16,
        frame_height: u16,
    },

    #[error("frame has neither a local nor a global color table")]
    MissingColorTable,

    #[error("stream contains no image")]
    MissingImage,

    #[error("the stream has already been decoded")]
    AlreadyDecoded,

    #[error("lzw minimum code size {0} is out of range")]
    InvalidCodeSize(u8),

    #[error("lzw code {code} is invalid, next free code is {next}")]
    DictionaryCorruption {
        code: u16,
        next: u16,
    },

    #[error("color index {index} is outside of a {table_len} entry color table")]
    ColorIndexOutOfRange {
        index: u8,
        table_len: usize,
    },

    #[error("image data ended after {decoded} of {expected} pixels")]
    IncompleteImage {
        expected: usize,
        decoded: usize,
    },

    #[error("image of {width}x{height} exceeds the limit of {limit} pixels")]
    ImageTooLarge {
        width: u16,
        height: u16,
        limit: usize,
    },

    #[error("could not allocate a buffer for {0} pixels")]
    AllocationFailure(usize, #[source] TryReserveError),
}

impl From<io::Error> for DecodeError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => DecodeError::TruncatedStream,
            _ => DecodeError::Io(err),
        }
    }
}
