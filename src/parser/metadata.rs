use super::block_reader::BlockReader;
use super::error::{DecodeError, Result};
use super::{DisposalMethod, UnknownExtensions};
use crate::image::ColorTable;

use log::{debug, warn};

use std::io::prelude::*;

const SIGNATURE: &[u8; 3] = b"GIF";

// Extension labels
const APPLICATION_EXTENSION: u8 = 0xff;
const COMMENT_EXTENSION: u8 = 0xfe;
const GRAPHIC_CONTROL_EXTENSION: u8 = 0xf9;
const PLAIN_TEXT_EXTENSION: u8 = 0x01;

// Declared sizes of the fixed part of each extension
const PLAIN_TEXT_SIZE: u8 = 12;
const APPLICATION_SIZE: u8 = 11;

#[derive(Debug)]
enum ExtensionType {
    Application,
    Comment,
    GraphicControl,
    PlainText,
}

impl TryFrom<u8> for ExtensionType {
    type Error = DecodeError;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        use ExtensionType::*;

        match value {
            APPLICATION_EXTENSION => Ok(Application),
            COMMENT_EXTENSION => Ok(Comment),
            GRAPHIC_CONTROL_EXTENSION => Ok(GraphicControl),
            PLAIN_TEXT_EXTENSION => Ok(PlainText),

            _ => Err(DecodeError::UnknownExtension(value))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V87a,
    V89a,
}

impl TryFrom<&[u8]> for Version {
    type Error = DecodeError;

    fn try_from(value: &[u8]) -> std::result::Result<Self, Self::Error> {
        match value {
            b"87a" => Ok(Version::V87a),
            b"89a" => Ok(Version::V89a),
            version => Err(DecodeError::UnsupportedVersion(String::from_utf8_lossy(version).into_owned()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalScreenDescriptor {
    pub screen_width: u16,
    pub screen_height: u16,
    pub global_color_table_flag: bool,
    pub color_resolution: u8,
    pub sort_flag: bool,
    pub global_color_table_exponent: u8,
    pub background_color_index: u8,
    pub pixel_aspect_ratio: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub left_position: u16,
    pub top_position: u16,

    pub width: u16,
    pub height: u16,

    pub local_color_table_flag: bool,
    pub interlace_flag: bool,
    pub sort_flag: bool,
    pub local_color_table_exponent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionBlock {
    GraphicControl {
        disposal_method: Option<DisposalMethod>,
        user_input: bool,
        transparent_color: Option<u8>,
        delay_time: u16,
    },
    Comment(Vec<u8>),
    PlainText {
        left_position: u16,
        top_position: u16,
        width: u16,
        height: u16,
        cell_width: u8,
        cell_height: u8,
        foreground_color_index: u8,
        background_color_index: u8,
        text: Vec<u8>,
    },
    Application {
        identifier: [u8; 8],
        authentication_code: [u8; 3],
        data: Vec<u8>,
    },
    Unknown {
        label: u8,
        data: Vec<u8>,
    },
}

/// Everything the decoder learned about the stream besides the pixels.
#[derive(Debug, Default)]
pub struct GifMetadata {
    pub version: Option<Version>,
    pub logical_screen_descriptor: Option<LogicalScreenDescriptor>,
    pub global_color_table: Option<ColorTable>,
    pub extensions: Vec<ExtensionBlock>,
    /// Descriptor of the decoded frame.
    pub image_descriptor: Option<ImageDescriptor>,
    pub frame_count: usize,
    pub bytes_consumed: usize,
}

pub fn parse_header<R: Read>(reader: &mut BlockReader<R>) -> Result<Version> {
    let header = reader.read_fixed::<6>()?;
    let (signature, version) = header.split_at(3);

    if signature != SIGNATURE {
        return Err(DecodeError::BadSignature([signature[0], signature[1], signature[2]]));
    }

    Version::try_from(version)
}

pub fn parse_logical_screen_descriptor<R: Read>(reader: &mut BlockReader<R>) -> Result<LogicalScreenDescriptor> {
    let screen_width = reader.read_u16()?;
    let screen_height = reader.read_u16()?;

    let packed_fields = reader.read_byte()?;
    let background_color_index = reader.read_byte()?;
    let pixel_aspect_ratio = reader.read_byte()?;

    Ok(LogicalScreenDescriptor {
        screen_width,
        screen_height,
        global_color_table_flag: packed_fields & 0b10000000 != 0,
        color_resolution: (packed_fields >> 4) & 0b00000111,
        sort_flag: packed_fields & 0b00001000 != 0,
        global_color_table_exponent: packed_fields & 0b00000111,
        background_color_index,
        pixel_aspect_ratio,
    })
}

pub fn parse_color_table<R: Read>(reader: &mut BlockReader<R>, exponent: u8) -> Result<ColorTable> {
    let size = 3 * ColorTable::len_for_exponent(exponent);
    let bytes = reader.read_bytes(size)?;
    Ok(ColorTable::from_rgb_bytes(&bytes))
}

/// Parses the image descriptor that follows an image separator.
pub fn parse_image_descriptor<R: Read>(reader: &mut BlockReader<R>) -> Result<ImageDescriptor> {
    let left_position = reader.read_u16()?;
    let top_position = reader.read_u16()?;

    let width = reader.read_u16()?;
    let height = reader.read_u16()?;

    let packed_fields = reader.read_byte()?;

    Ok(ImageDescriptor {
        left_position,
        top_position,
        width,
        height,
        local_color_table_flag: packed_fields & 0b10000000 != 0,
        interlace_flag: packed_fields & 0b01000000 != 0,
        sort_flag: packed_fields & 0b00100000 != 0,
        local_color_table_exponent: packed_fields & 0b00000111,
    })
}

/// Parses the extension whose label byte has just been read.
///
/// An unknown label fails before anything past the label is consumed, unless `policy` asks for
/// the extension to be skipped.
pub fn parse_extension<R: Read>(
    reader: &mut BlockReader<R>,
    label: u8,
    policy: UnknownExtensions,
) -> Result<ExtensionBlock> {
    use ExtensionType::*;

    let extension_type = match (ExtensionType::try_from(label), policy) {
        (Ok(extension_type), _) => extension_type,
        (Err(_), UnknownExtensions::Skip) => {
            let (data, consumed) = reader.read_data_sub_blocks()?;
            warn!("skipped unknown extension 0x{:02x} ({} bytes)", label, consumed);
            return Ok(ExtensionBlock::Unknown { label, data });
        }
        (Err(err), UnknownExtensions::Fail) => return Err(err),
    };

    debug!("processing extension type: {:?}", extension_type);
    match extension_type {
        GraphicControl => parse_graphic_control(reader),
        Comment => {
            let (data, _) = reader.read_data_sub_blocks()?;
            debug!("processed comment block, got: {}", String::from_utf8_lossy(&data));
            Ok(ExtensionBlock::Comment(data))
        },
        PlainText => {
            expect_block_size(reader, label, PLAIN_TEXT_SIZE)?;

            let left_position = reader.read_u16()?;
            let top_position = reader.read_u16()?;
            let width = reader.read_u16()?;
            let height = reader.read_u16()?;
            let [cell_width, cell_height, foreground_color_index, background_color_index] = reader.read_fixed::<4>()?;
            let (text, _) = reader.read_data_sub_blocks()?;

            Ok(ExtensionBlock::PlainText {
                left_position,
                top_position,
                width,
                height,
                cell_width,
                cell_height,
                foreground_color_index,
                background_color_index,
                text,
            })
        },
        Application => {
            expect_block_size(reader, label, APPLICATION_SIZE)?;

            let identifier = reader.read_fixed::<8>()?;
            let authentication_code = reader.read_fixed::<3>()?;
            let (data, _) = reader.read_data_sub_blocks()?;

            debug!(
                "processed application block {}{} with {} bytes of data",
                String::from_utf8_lossy(&identifier),
                String::from_utf8_lossy(&authentication_code),
                data.len()
            );
            Ok(ExtensionBlock::Application { identifier, authentication_code, data })
        },
    }
}

fn parse_graphic_control<R: Read>(reader: &mut BlockReader<R>) -> Result<ExtensionBlock> {
    // the declared size decides how much is consumed, the record is only unpacked once it is
    // known to have the one valid length
    let declared_size = reader.read_byte()?;
    let record = reader.read_bytes(declared_size as usize)?;

    let &[packed_fields, delay_low, delay_high, transparent_color_index] = &*record else {
        return Err(DecodeError::MalformedExtension {
            label: GRAPHIC_CONTROL_EXTENSION,
            reason: "record length differs from the fixed graphic control size",
        });
    };

    // packed fields definition
    // XXXYYYZW
    // XXX = reserved, not needed
    // YYY = disposal method, indicates what to do with graphic after displaying
    // Z = user input flag
    // W = transparent color flag
    let disposal_method = DisposalMethod::from_u8((packed_fields >> 2) & 0b00000111);
    let user_input = packed_fields & 0b00000010 != 0;
    let transparent_color_flag = packed_fields & 0b00000001 != 0;

    let delay_time = u16::from_le_bytes([delay_low, delay_high]);

    if reader.read_byte()? != 0 {
        return Err(DecodeError::MalformedExtension {
            label: GRAPHIC_CONTROL_EXTENSION,
            reason: "missing block terminator",
        });
    }

    let extension = ExtensionBlock::GraphicControl {
        disposal_method,
        user_input,
        transparent_color: transparent_color_flag.then_some(transparent_color_index),
        delay_time,
    };
    debug!("processed graphic control extension: {:?}", extension);

    Ok(extension)
}

fn expect_block_size<R: Read>(reader: &mut BlockReader<R>, label: u8, expected: u8) -> Result<()> {
    if reader.read_byte()? != expected {
        return Err(DecodeError::MalformedExtension {
            label,
            reason: "unexpected block size",
        });
    }
    Ok(())
}
