/*
 * XNB container: the 10-byte header, the optional LZX-framed compressed
 * body, and the framing loop that feeds compressed blocks to the decoder.
 *
 * A compressed body is a sequence of frames.  Each frame is a compressed
 * block of 'block_size' bytes that decodes to 'frame_size' bytes, 32 KiB by
 * default; an 0xFF escape byte introduces an explicit frame size for the
 * (usually final) short frame.  One decoder instance spans all frames of a
 * body, because window contents and tree lengths carry across them.
 */

use crate::decompress_lzx::LzxDecoder;
use crate::reader::ByteReader;
use crate::xnb_constants::*;
use crate::{LzxError, XnbError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    WindowsPhone7,
    Xbox360,
}

impl Platform {
    fn from_byte(byte: u8) -> Result<Self, XnbError> {
        match byte {
            PLATFORM_WINDOWS => Ok(Platform::Windows),
            PLATFORM_PHONE => Ok(Platform::WindowsPhone7),
            PLATFORM_XBOX => Ok(Platform::Xbox360),
            other => Err(XnbError::UnknownPlatform(other)),
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            Platform::Windows => PLATFORM_WINDOWS,
            Platform::WindowsPhone7 => PLATFORM_PHONE,
            Platform::Xbox360 => PLATFORM_XBOX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Reach,
    HiDef,
}

/// A parsed XNB file: header fields plus the body with any compression
/// already undone.
pub struct XnbFile {
    pub platform: Platform,
    pub profile: Profile,
    pub was_compressed: bool,
    pub body: Vec<u8>,
}

impl XnbFile {
    pub fn parse(data: &[u8]) -> Result<Self, XnbError> {
        let mut reader = ByteReader::new(data);

        let magic = reader.read_bytes(3)?;
        if magic != XNB_MAGIC {
            return Err(XnbError::BadMagic([magic[0], magic[1], magic[2]]));
        }

        let platform = Platform::from_byte(reader.read_u8()?)?;

        let version = reader.read_u8()?;
        if version != XNB_VERSION {
            return Err(XnbError::UnsupportedVersion(version));
        }

        let flags = reader.read_u8()?;
        if flags & !(FLAG_HIDEF | FLAG_COMPRESSED) != 0 {
            return Err(XnbError::UnknownFlags(flags));
        }
        let profile = if flags & FLAG_HIDEF != 0 {
            Profile::HiDef
        } else {
            Profile::Reach
        };
        let compressed = flags & FLAG_COMPRESSED != 0;

        let file_length = reader.read_u32_le()?;
        if file_length as usize != data.len() {
            return Err(XnbError::LengthMismatch {
                header: file_length,
                actual: data.len(),
            });
        }

        let body = if compressed {
            let decompressed_size = reader.read_u32_le()? as usize;
            let framed = reader.read_bytes(file_length as usize - COMPRESSED_HEADER_SIZE)?;
            decompress_stream(framed, decompressed_size)?
        } else {
            reader.read_bytes(file_length as usize - HEADER_SIZE)?.to_vec()
        };

        Ok(XnbFile {
            platform,
            profile,
            was_compressed: compressed,
            body,
        })
    }

    /// Re-emits the file as a valid uncompressed XNB.
    pub fn to_uncompressed_bytes(&self) -> Vec<u8> {
        let total = HEADER_SIZE + self.body.len();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&XNB_MAGIC);
        out.push(self.platform.to_byte());
        out.push(XNB_VERSION);
        out.push(match self.profile {
            Profile::HiDef => FLAG_HIDEF,
            Profile::Reach => 0,
        });
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&self.body);
        out
    }
}

/*
 * Frame header: two bytes of big-endian block size, or the 0xFF escape
 * followed by explicit big-endian frame and block sizes.  Returns the sizes
 * and the number of header bytes consumed.
 */
pub(crate) fn read_frame_header(data: &[u8]) -> Result<(usize, usize, usize), LzxError> {
    if data.len() < 2 {
        return Err(LzxError::InvalidFraming);
    }
    let hi = data[0];
    let lo = data[1];

    if hi == FRAME_HEADER_ESCAPE {
        if data.len() < 5 {
            return Err(LzxError::InvalidFraming);
        }
        let frame_size = ((lo as usize) << 8) | data[2] as usize;
        let block_size = ((data[3] as usize) << 8) | data[4] as usize;
        Ok((frame_size, block_size, 5))
    } else {
        let block_size = ((hi as usize) << 8) | lo as usize;
        Ok((DEFAULT_FRAME_SIZE, block_size, 2))
    }
}

/// Decompresses a framed LZX body to exactly `decompressed_size` bytes.
pub fn decompress_stream(
    compressed: &[u8],
    decompressed_size: usize,
) -> Result<Vec<u8>, LzxError> {
    let mut out = vec![0u8; decompressed_size];
    let mut decoder = LzxDecoder::new(FRAME_WINDOW_BITS)?;

    let mut pos = 0;
    let mut out_pos = 0;
    while pos < compressed.len() {
        let (frame_size, block_size, header_len) = read_frame_header(&compressed[pos..])?;
        pos += header_len;

        /* a zero size in either field is the end marker */
        if frame_size == 0 || block_size == 0 {
            break;
        }

        if frame_size > decompressed_size - out_pos {
            return Err(LzxError::InvalidFraming);
        }
        if block_size > compressed.len() - pos {
            return Err(LzxError::InvalidFraming);
        }

        decoder.decompress(
            &compressed[pos..pos + block_size],
            &mut out[out_pos..out_pos + frame_size],
        )?;
        pos += block_size;
        out_pos += frame_size;
    }

    if out_pos != decompressed_size {
        return Err(LzxError::InvalidFraming);
    }
    Ok(out)
}
