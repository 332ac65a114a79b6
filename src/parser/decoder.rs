use super::block_reader::BlockReader;
use super::error::{DecodeError, Result};
use super::lzw::{LzwDecoder, LzwStatus, PixelWriter};
use super::metadata::{self, GifMetadata, ImageDescriptor};
use super::DecoderOptions;
use crate::image::{ColorTable, Image, Rgb};

use log::{debug, trace, warn};

use std::io::prelude::*;

const EXTENSION_INTRODUCER: u8 = 0x21;
const IMAGE_DESCRIPTOR_LABEL: u8 = 0x2c;
const TRAILER_LABEL: u8 = 0x3b;

// row order of interlaced frames as (first row, step) per pass
const INTERLACE_PASSES: [(usize, usize); 4] = [(0, 8), (4, 8), (2, 4), (1, 2)];

#[derive(Debug)]
enum ParserState {
    ProcessMagic,
    ProcessLogicalScreenDescriptor,
    ProcessGlobalColorTable(u8),
    ProcessTrailer,

    DetermineNextBlock,
    ProcessExtension(u8),
    ProcessImageDescriptor,
    ProcessLocalColorTable(ImageDescriptor),
    ProcessImageData(ImageDescriptor, Option<ColorTable>),

    Done,
}

/// Decodes the first image of a GIF stream.
///
/// The stream is read front to back exactly once, up to and including the trailer. Extensions
/// are collected into [`GifMetadata`]; images after the first are consumed but not decoded.
#[derive(Debug)]
pub struct Decoder<R: Read> {
    reader: BlockReader<R>,
    options: DecoderOptions,
    metadata: GifMetadata,
    image: Option<Image>,
    started: bool,
}

impl<R: Read> Decoder<R> {
    pub fn new(inner: R) -> Self {
        Self::with_options(inner, DecoderOptions::default())
    }

    pub fn with_options(inner: R, options: DecoderOptions) -> Self {
        Self {
            reader: BlockReader::new(inner),
            options,
            metadata: GifMetadata::default(),
            image: None,
            started: false,
        }
    }

    /// Reads the whole stream and returns its first image.
    ///
    /// Nothing is returned on failure; whatever was decoded up to the error is dropped. The
    /// stream can only be walked once, later calls fail with [`DecodeError::AlreadyDecoded`] and
    /// leave the metadata of the first call untouched.
    pub fn decode(&mut self) -> Result<Image> {
        if self.started {
            return Err(DecodeError::AlreadyDecoded);
        }
        self.started = true;

        let mut state = ParserState::ProcessMagic;

        loop {
            debug!("begin parsing state {:?}", state);

            let start = self.reader.consumed();
            state = self.process_next_state(state)?;
            trace!("state consumed {} bytes", self.reader.consumed() - start);

            if let ParserState::Done = state {
                break;
            }
        }

        self.metadata.bytes_consumed = self.reader.consumed();
        debug!("finished decoding after {} bytes", self.metadata.bytes_consumed);

        self.image.take().ok_or(DecodeError::MissingImage)
    }

    pub fn metadata(&self) -> &GifMetadata {
        &self.metadata
    }

    pub fn bytes_consumed(&self) -> usize {
        self.reader.consumed()
    }

    fn process_next_state(&mut self, next_state: ParserState) -> Result<ParserState> {
        use ParserState::*;

        match next_state {
            ProcessMagic => {
                let version = metadata::parse_header(&mut self.reader)?;
                debug!("processed header, got {:?}", version);
                self.metadata.version = Some(version);

                Ok(ProcessLogicalScreenDescriptor)
            },
            ProcessLogicalScreenDescriptor => {
                let screen = metadata::parse_logical_screen_descriptor(&mut self.reader)?;
                debug!("processed logical screen descriptor, got: {:#?}", screen);

                let next_state = if screen.global_color_table_flag {
                    ProcessGlobalColorTable(screen.global_color_table_exponent)
                } else {
                    DetermineNextBlock
                };
                self.metadata.logical_screen_descriptor = Some(screen);

                Ok(next_state)
            },
            ProcessGlobalColorTable(exponent) => {
                let table = metadata::parse_color_table(&mut self.reader, exponent)?;
                debug!("processed global color table with {} entries", table.len());
                self.metadata.global_color_table = Some(table);

                Ok(DetermineNextBlock)
            },
            ProcessTrailer => Ok(Done),
            DetermineNextBlock => {
                let introducer_or_label = self.reader.read_byte()?;

                match introducer_or_label {
                    // extension introducer means that a label follows determining what exact type
                    // of extension it is.
                    EXTENSION_INTRODUCER => Ok(ProcessExtension(self.reader.read_byte()?)),
                    IMAGE_DESCRIPTOR_LABEL => Ok(ProcessImageDescriptor),
                    TRAILER_LABEL => Ok(ProcessTrailer),
                    label => Err(DecodeError::UnexpectedBlockLabel(label)),
                }
            },
            ProcessExtension(label) => {
                let extension = metadata::parse_extension(&mut self.reader, label, self.options.unknown_extensions)?;
                self.metadata.extensions.push(extension);

                Ok(DetermineNextBlock)
            },
            ProcessImageDescriptor => {
                let descriptor = metadata::parse_image_descriptor(&mut self.reader)?;
                debug!("processed image descriptor, got: {:#?}", descriptor);

                if self.image.is_none() {
                    self.check_frame_size(&descriptor)?;
                }

                let next_state = if descriptor.local_color_table_flag {
                    ProcessLocalColorTable(descriptor)
                } else {
                    ProcessImageData(descriptor, None)
                };

                Ok(next_state)
            },
            ProcessLocalColorTable(descriptor) => {
                let table = metadata::parse_color_table(&mut self.reader, descriptor.local_color_table_exponent)?;
                debug!("processed local color table with {} entries", table.len());

                Ok(ProcessImageData(descriptor, Some(table)))
            },
            ProcessImageData(descriptor, local_color_table) => {
                self.metadata.frame_count += 1;

                if self.image.is_some() {
                    let minimum_code_size = self.reader.read_byte()?;
                    let skipped = self.reader.skip_data_sub_blocks()?;
                    warn!(
                        "skipping frame {} (lzw minimum code size {}, {} bytes), only the first frame is decoded",
                        self.metadata.frame_count, minimum_code_size, skipped
                    );
                    return Ok(DetermineNextBlock);
                }

                // a local color table overrides the global one for its frame
                let color_table = local_color_table
                    .as_ref()
                    .or(self.metadata.global_color_table.as_ref())
                    .ok_or(DecodeError::MissingColorTable)?;

                let image = decode_image_data(&mut self.reader, color_table, &descriptor, &self.options)?;
                self.image = Some(image);
                self.metadata.image_descriptor = Some(descriptor);

                Ok(DetermineNextBlock)
            },
            Done => Ok(Done),
        }
    }

    fn check_frame_size(&self, descriptor: &ImageDescriptor) -> Result<()> {
        let Some(screen) = self.metadata.logical_screen_descriptor.as_ref() else {
            return Ok(());
        };

        if descriptor.width != screen.screen_width || descriptor.height != screen.screen_height {
            return Err(DecodeError::FrameSizeMismatch {
                screen_width: screen.screen_width,
                screen_height: screen.screen_height,
                frame_width: descriptor.width,
                frame_height: descriptor.height,
            });
        }
        Ok(())
    }
}

/// Allocates the frame and fills it from the lzw minimum code size byte and the data sub-blocks
/// that follow.
fn decode_image_data<R: Read>(
    reader: &mut BlockReader<R>,
    color_table: &ColorTable,
    descriptor: &ImageDescriptor,
    options: &DecoderOptions,
) -> Result<Image> {
    let width = descriptor.width;
    let height = descriptor.height;
    let pixel_count = width as usize * height as usize;

    if let Some(limit) = options.max_pixels {
        if pixel_count > limit {
            return Err(DecodeError::ImageTooLarge { width, height, limit });
        }
    }

    let mut pixels = Vec::new();
    pixels
        .try_reserve_exact(pixel_count)
        .map_err(|err| DecodeError::AllocationFailure(pixel_count, err))?;
    pixels.resize(pixel_count, Rgb::default());

    let minimum_code_size = reader.read_byte()?;
    debug!("lzw minimum code size: {}", minimum_code_size);

    let mut lzw = LzwDecoder::new(minimum_code_size)?;
    let mut writer = PixelWriter::new(color_table, &mut pixels);
    let mut block = Vec::with_capacity(u8::MAX as usize);
    let mut status = LzwStatus::NeedMore;

    while reader.next_data_sub_block(&mut block)?.is_some() {
        if status == LzwStatus::Done {
            // sub-blocks after the end of information code carry nothing
            continue;
        }

        status = lzw.decode(&block, &mut writer)?;
        if status == LzwStatus::Done && !writer.is_full() {
            return Err(DecodeError::IncompleteImage {
                expected: pixel_count,
                decoded: writer.written(),
            });
        }
    }

    if status == LzwStatus::NeedMore {
        if !writer.is_full() {
            return Err(DecodeError::IncompleteImage {
                expected: pixel_count,
                decoded: writer.written(),
            });
        }
        warn!("image data ended without an end of information code");
    }

    if descriptor.interlace_flag && options.deinterlace {
        pixels = deinterlace(&pixels, width as usize, height as usize);
    }

    Ok(Image { width, height, pixels })
}

/// Moves rows stored in interlaced pass order back to top to bottom order.
fn deinterlace(pixels: &[Rgb], width: usize, height: usize) -> Vec<Rgb> {
    if width == 0 || height == 0 {
        return pixels.to_vec();
    }

    let mut output = vec![Rgb::default(); pixels.len()];
    let mut rows = pixels.chunks_exact(width);

    for (first_row, step) in INTERLACE_PASSES {
        for y in (first_row..height).step_by(step) {
            if let Some(row) = rows.next() {
                output[y * width..(y + 1) * width].copy_from_slice(row);
            }
        }
    }

    output
}
