use std::fs;
use std::path::PathBuf;
use std::process::exit;
use std::str::FromStr;

use filebuffer::FileBuffer;
use structopt::StructOpt;
use xnb_lzx_rs::{export, read_asset, Asset, XnbError, XnbFile};

#[derive(Clone, Copy)]
enum Mode {
    Auto,
    Decompress,
    Wav,
    Png,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "auto" => Ok(Mode::Auto),
            "decompress" => Ok(Mode::Decompress),
            "wav" => Ok(Mode::Wav),
            "png" => Ok(Mode::Png),
            other => Err(format!("invalid mode: {}", other)),
        }
    }
}

#[derive(StructOpt)]
struct XnbdParams {
    input: PathBuf,
    output: Option<PathBuf>,
    /// auto, decompress, wav or png
    #[structopt(short, long, default_value = "auto")]
    mode: Mode,
}

fn convert(params: &XnbdParams) -> Result<PathBuf, XnbError> {
    let data = FileBuffer::open(&params.input)?;
    let file = XnbFile::parse(&data)?;

    let mode = match params.mode {
        Mode::Auto => match read_asset(&file.body)? {
            (_, Asset::Sound(_)) => Mode::Wav,
            (_, Asset::Texture(_)) => Mode::Png,
        },
        mode => mode,
    };

    let (output, bytes) = match mode {
        Mode::Decompress => {
            let mut name = params
                .input
                .file_stem()
                .map(|stem| stem.to_owned())
                .unwrap_or_default();
            name.push("_dec.xnb");
            let output = params.input.with_file_name(name);
            (output, file.to_uncompressed_bytes())
        }
        Mode::Wav => {
            let (readers, asset) = read_asset(&file.body)?;
            let sound = match asset {
                Asset::Sound(sound) => sound,
                _ => {
                    return Err(XnbError::UnknownTypeReader(
                        readers
                            .first()
                            .map(|reader| reader.name.clone())
                            .unwrap_or_default(),
                    ))
                }
            };
            (params.input.with_extension("wav"), export::sound_to_wav(&sound))
        }
        Mode::Png => {
            let (readers, asset) = read_asset(&file.body)?;
            let texture = match asset {
                Asset::Texture(texture) => texture,
                _ => {
                    return Err(XnbError::UnknownTypeReader(
                        readers
                            .first()
                            .map(|reader| reader.name.clone())
                            .unwrap_or_default(),
                    ))
                }
            };
            (
                params.input.with_extension("png"),
                export::texture_to_png(&texture)?,
            )
        }
        Mode::Auto => unreachable!(),
    };

    let output = params.output.clone().unwrap_or(output);
    fs::write(&output, bytes)?;
    Ok(output)
}

fn main() {
    let params: XnbdParams = XnbdParams::from_args();

    match convert(&params) {
        Ok(output) => println!("saved {}", output.display()),
        Err(error) => {
            eprintln!(
                "error converting \"{}\" ({})",
                params.input.display(),
                error
            );
            exit(1);
        }
    }
}
