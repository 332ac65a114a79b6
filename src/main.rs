use std::env;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use log::info;

use stillgif::{ppm_writer, Decoder, Image};

const USAGE: &str = "usage: stillgif [-i <input.gif>] [-o <output.ppm>] [-h]

  -i <file>  GIF to decode, standard input when omitted
  -o <file>  PPM to write, standard output when omitted
  -h         print this help";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Help,
    Convert {
        input: Option<PathBuf>,
        output: Option<PathBuf>,
    },
}

fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Result<Command> {
    let mut input = None;
    let mut output = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" => return Ok(Command::Help),
            "-i" => {
                let Some(path) = args.next() else {
                    bail!("-i needs a file name\n{}", USAGE);
                };
                input = Some(PathBuf::from(path));
            },
            "-o" => {
                let Some(path) = args.next() else {
                    bail!("-o needs a file name\n{}", USAGE);
                };
                output = Some(PathBuf::from(path));
            },
            other => bail!("unknown argument {}\n{}", other, USAGE),
        }
    }

    Ok(Command::Convert { input, output })
}

fn decode_from<R: Read>(reader: R, name: &str) -> Result<Image> {
    let mut decoder = Decoder::new(reader);
    let image = decoder.decode().with_context(|| format!("failed to decode {}", name))?;
    info!(
        "decoded {}x{} image from {} bytes",
        image.width,
        image.height,
        decoder.bytes_consumed()
    );
    Ok(image)
}

fn main() -> Result<()> {
    env_logger::init();

    let (input, output) = match parse_args(env::args().skip(1))? {
        Command::Help => {
            println!("{}", USAGE);
            return Ok(());
        },
        Command::Convert { input, output } => (input, output),
    };

    let image = match &input {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            decode_from(BufReader::new(file), &path.display().to_string())?
        },
        None => decode_from(io::stdin().lock(), "standard input")?,
    };

    match &output {
        Some(path) => ppm_writer::write_ppm(path, &image)?,
        None => {
            let mut writer = BufWriter::new(io::stdout().lock());
            ppm_writer::encode_ppm(&mut writer, &image)?;
            writer.flush().context("failed to flush standard output")?;
        },
    }

    Ok(())
}
