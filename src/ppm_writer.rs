use crate::image::Image;

use anyhow::{Context, Result};

use std::fs::File;
use std::io::{prelude::*, BufWriter};
use std::path::Path;

const MAGIC_NUMBER: &[u8] = b"P3";

/// Writes `image` as a plain text PPM file.
pub fn write_ppm<P: AsRef<Path>>(path: P, image: &Image) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;

    let mut writer = BufWriter::new(file);
    encode_ppm(&mut writer, image)?;
    writer.flush()?;

    Ok(())
}

pub fn encode_ppm<W: Write>(writer: &mut W, image: &Image) -> Result<()> {
    writer.write_all(MAGIC_NUMBER)?;
    writer.write_all(b"\n")?;
    writer.write_all(format!("{} {}", image.width, image.height).as_bytes())?;
    writer.write_all(b" 255")?;
    writer.write_all(b"\n")?;

    for row in image.rows() {
        let line = row
            .iter()
            .map(|pixel| format!("{: >3} {: >3} {: >3}", pixel.r, pixel.g, pixel.b))
            .collect::<Vec<_>>()
            .join(" ");

        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }

    Ok(())
}
