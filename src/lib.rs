pub mod bitstream;
pub mod content;
pub(crate) mod decode_blocks;
pub mod decompress_lzx;
pub mod decompress_xnb;
pub mod export;
mod huffman;
mod lzx_constants;
mod reader;
mod xnb_constants;

#[macro_use]
extern crate static_assertions;

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub use content::{read_asset, Asset, SoundEffect, SurfaceFormat, Texture2D, TypeReader};
pub use decompress_lzx::LzxDecoder;
pub use decompress_xnb::{decompress_stream, Platform, Profile, XnbFile};

/*
 * Failure of an LZX decompress() call or of the outer framing.  Every error
 * aborts the call immediately; a decoder that returned one is in an
 * unspecified intermediate state and must be discarded.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LzxError {
    /* window_bits outside the supported 15..=21 range */
    UnsupportedWindowSize,

    /* the stream header requests Intel E8 call translation */
    IntelE8Unsupported,

    /* a block type field decoded to 0 or above 3 */
    InvalidBlockType,

    /* canonical Huffman lengths overflow or are otherwise malformed */
    TableOverrun,

    /* an overflow-tree walk ran out of bits before reaching a leaf */
    HuffmanDescent,

    /* a decode run would straddle the window wraparound */
    WindowWrap,

    /* structural violation in the compressed data */
    InvalidData,

    /* frame/block sizes of the outer framing don't add up */
    InvalidFraming,
}

impl fmt::Display for LzxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use LzxError::*;

        match self {
            UnsupportedWindowSize => write!(f, "unsupported window size exponent"),
            IntelE8Unsupported => write!(f, "Intel E8 call translation is not supported"),
            InvalidBlockType => write!(f, "invalid block type"),
            TableOverrun => write!(f, "huffman table overrun"),
            HuffmanDescent => write!(f, "huffman descent exhausted the accumulator"),
            WindowWrap => write!(f, "run straddles the window wraparound"),
            InvalidData => write!(f, "invalid compressed data"),
            InvalidFraming => write!(f, "invalid xnb framing"),
        }
    }
}

impl std::error::Error for LzxError {}

/* Failure at the container or asset layer. */
#[derive(Debug)]
pub enum XnbError {
    Io(std::io::Error),
    Lzx(LzxError),

    BadMagic([u8; 3]),
    UnknownPlatform(u8),
    UnsupportedVersion(u8),
    UnknownFlags(u8),
    LengthMismatch { header: u32, actual: usize },

    UnexpectedEof,
    BadSevenBitInt,
    BadString,

    SharedResourcesUnsupported(u32),
    NoPrimaryObject,
    TypeIdOutOfRange(u32),
    UnknownTypeReader(String),

    UnknownSurfaceFormat(i32),
    UnsupportedSurfaceFormat(SurfaceFormat),
    BadTextureData(&'static str),
    UnsupportedSoundFormat(u16),
    BadSoundData(&'static str),
}

impl fmt::Display for XnbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use XnbError::*;

        match self {
            Io(error) => write!(f, "i/o error: {}", error),
            Lzx(error) => write!(f, "decompression failed: {}", error),
            BadMagic(magic) => write!(f, "invalid format magic {:02x?}", magic),
            UnknownPlatform(byte) => write!(f, "unknown platform byte 0x{:02x}", byte),
            UnsupportedVersion(version) => write!(f, "unhandled XNA version {}", version),
            UnknownFlags(flags) => write!(f, "unknown flags byte 0x{:02x}", flags),
            LengthMismatch { header, actual } => write!(
                f,
                "file length mismatch: header says {}, file has {} bytes",
                header, actual
            ),
            UnexpectedEof => write!(f, "unexpected end of data"),
            BadSevenBitInt => write!(f, "malformed 7-bit encoded integer"),
            BadString => write!(f, "malformed string"),
            SharedResourcesUnsupported(count) => {
                write!(f, "shared resources are not supported ({} present)", count)
            }
            NoPrimaryObject => write!(f, "file has no primary object"),
            TypeIdOutOfRange(id) => write!(f, "type id {} is out of range", id),
            UnknownTypeReader(name) => write!(f, "unknown type reader: {}", name),
            UnknownSurfaceFormat(value) => write!(f, "unknown surface format {}", value),
            UnsupportedSurfaceFormat(format) => {
                write!(f, "unsupported surface format: {:?}", format)
            }
            BadTextureData(reason) => write!(f, "bad texture data: {}", reason),
            UnsupportedSoundFormat(tag) => write!(f, "unhandled sound format tag {}", tag),
            BadSoundData(reason) => write!(f, "bad sound data: {}", reason),
        }
    }
}

impl From<LzxError> for XnbError {
    fn from(error: LzxError) -> Self {
        XnbError::Lzx(error)
    }
}

impl From<std::io::Error> for XnbError {
    fn from(error: std::io::Error) -> Self {
        XnbError::Io(error)
    }
}

impl std::error::Error for XnbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            XnbError::Io(error) => Some(error),
            XnbError::Lzx(error) => Some(error),
            _ => None,
        }
    }
}

/// Reads and parses an XNB file, decompressing the body if needed.
pub fn read_xnb_file(path: impl AsRef<Path>) -> Result<XnbFile, XnbError> {
    let mut data = Vec::new();
    File::open(path)?.read_to_end(&mut data)?;
    XnbFile::parse(&data)
}
