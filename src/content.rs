/*
 * Asset deserialization from a decompressed XNB body: the type-reader
 * table, then the primary object decoded by whichever reader its 7-bit
 * type id selects.
 */

use crate::reader::ByteReader;
use crate::XnbError;

const TEXTURE2D_READER: &str = "Microsoft.Xna.Framework.Content.Texture2DReader";
const SOUND_EFFECT_READER: &str = "Microsoft.Xna.Framework.Content.SoundEffectReader";
const SPRITE_FONT_READER: &str = "Microsoft.Xna.Framework.Content.SpriteFontReader";

/// One entry of the container's reader table: an assembly-qualified .NET
/// type name plus a version number.
pub struct TypeReader {
    pub name: String,
    pub version: i32,
}

impl TypeReader {
    /// The type name without the assembly qualification.
    pub fn base_name(&self) -> &str {
        match self.name.find(',') {
            Some(comma) => &self.name[..comma],
            None => &self.name,
        }
    }

    /// A short human-readable kind, mirroring what the readers produce.
    pub fn kind(&self) -> &'static str {
        match self.base_name() {
            TEXTURE2D_READER => "Image",
            SOUND_EFFECT_READER => "Audio",
            SPRITE_FONT_READER => "Font",
            _ => "Unknown",
        }
    }
}

pub enum Asset {
    Texture(Texture2D),
    Sound(SoundEffect),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceFormat {
    Rgba8888,
    Bgr565,
    Bgra5551,
    Bgra4444,
    Dxt1,
    Dxt3,
    Dxt5,
    NormalizedByte2,
    NormalizedByte4,
    Rgba1010102,
    Rg32,
    Rgba64,
    Alpha8,
    Single,
    Vector2,
    Vector4,
    HalfSingle,
    HalfVector2,
    HalfVector4,
    HdrBlendable,
}

impl SurfaceFormat {
    fn from_i32(value: i32) -> Result<Self, XnbError> {
        use SurfaceFormat::*;
        Ok(match value {
            0 => Rgba8888,
            1 => Bgr565,
            2 => Bgra5551,
            3 => Bgra4444,
            4 => Dxt1,
            5 => Dxt3,
            6 => Dxt5,
            7 => NormalizedByte2,
            8 => NormalizedByte4,
            9 => Rgba1010102,
            10 => Rg32,
            11 => Rgba64,
            12 => Alpha8,
            13 => Single,
            14 => Vector2,
            15 => Vector4,
            16 => HalfSingle,
            17 => HalfVector2,
            18 => HalfVector4,
            19 => HdrBlendable,
            other => return Err(XnbError::UnknownSurfaceFormat(other)),
        })
    }
}

pub struct Texture2D {
    pub format: SurfaceFormat,
    pub width: u32,
    pub height: u32,
    /* mip 0 first; level i is (width >> i) x (height >> i) */
    pub mips: Vec<Vec<u8>>,
}

impl Texture2D {
    pub fn mip_size(&self, level: usize) -> Option<(u32, u32)> {
        if level < self.mips.len() {
            Some((self.width >> level, self.height >> level))
        } else {
            None
        }
    }

    fn read(reader: &mut ByteReader<'_>) -> Result<Self, XnbError> {
        let format = SurfaceFormat::from_i32(reader.read_i32_le()?)?;
        let width = reader.read_u32_le()?;
        let height = reader.read_u32_le()?;
        let mip_count = reader.read_u32_le()?;

        /* only uncompressed 32-bit RGBA payloads are converted */
        if format != SurfaceFormat::Rgba8888 {
            return Err(XnbError::UnsupportedSurfaceFormat(format));
        }

        if width == 0 || height == 0 || width > u32::MAX / 4 / height {
            return Err(XnbError::BadTextureData("image dimensions are invalid"));
        }

        let mut mips = Vec::new();
        for level in 0..mip_count {
            let mip_size = reader.read_u32_le()?;
            if mip_size % 4 != 0 {
                return Err(XnbError::BadTextureData(
                    "image data size is not a multiple of 4",
                ));
            }
            let (mip_width, mip_height) = (width >> level, height >> level);
            if mip_width * mip_height != mip_size / 4 {
                return Err(XnbError::BadTextureData(
                    "image dimensions and data size do not match",
                ));
            }
            mips.push(reader.read_bytes(mip_size as usize)?.to_vec());
        }

        Ok(Texture2D {
            format,
            width,
            height,
            mips,
        })
    }
}

/* WAVEFORMATEX with PCM samples; ADPCM content is rejected up front. */
pub struct SoundEffect {
    pub channel_count: u16,
    pub sample_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data: Vec<u8>,
    pub loop_start: u32,
    pub loop_end: u32,
    pub duration_ms: u32,
}

const WAVE_FORMAT_PCM: u16 = 1;

impl SoundEffect {
    fn read(reader: &mut ByteReader<'_>) -> Result<Self, XnbError> {
        let format_size = reader.read_u32_le()?;
        if format_size != 18 {
            return Err(XnbError::BadSoundData("unhandled format header size"));
        }

        let format_tag = reader.read_u16_le()?;
        if format_tag != WAVE_FORMAT_PCM {
            return Err(XnbError::UnsupportedSoundFormat(format_tag));
        }

        let channel_count = reader.read_u16_le()?;
        let sample_rate = reader.read_u32_le()?;
        let average_byte_rate = reader.read_u32_le()?;
        let block_align = reader.read_u16_le()?;
        let bits_per_sample = reader.read_u16_le()?;

        if bits_per_sample % 8 != 0 {
            return Err(XnbError::BadSoundData(
                "bits per sample is not a multiple of 8",
            ));
        }
        let bytes_per_sample = bits_per_sample / 8;

        if average_byte_rate != sample_rate * channel_count as u32 * bytes_per_sample as u32 {
            return Err(XnbError::BadSoundData(
                "average byte rate does not match rate * channels * sample size",
            ));
        }
        if block_align != channel_count * bytes_per_sample {
            return Err(XnbError::BadSoundData(
                "block align does not match channels * sample size",
            ));
        }

        let extra_info_size = reader.read_u16_le()?;
        if extra_info_size != 0 {
            return Err(XnbError::BadSoundData("unexpected extra format data"));
        }

        let data_size = reader.read_u32_le()?;
        if data_size == 0 {
            return Err(XnbError::BadSoundData("sound is empty"));
        }
        let data = reader.read_bytes(data_size as usize)?.to_vec();

        let loop_start = reader.read_u32_le()?;
        let loop_end = reader.read_u32_le()?;
        let duration_ms = reader.read_u32_le()?;

        Ok(SoundEffect {
            channel_count,
            sample_rate,
            block_align,
            bits_per_sample,
            data,
            loop_start,
            loop_end,
            duration_ms,
        })
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.channel_count as u32 * (self.bits_per_sample / 8) as u32
    }
}

/// Reads the type-reader table and the primary asset from a decompressed
/// XNB body.
pub fn read_asset(body: &[u8]) -> Result<(Vec<TypeReader>, Asset), XnbError> {
    let mut reader = ByteReader::new(body);

    let type_count = reader.read_7bit_encoded_int()?;
    let mut type_readers = Vec::with_capacity(type_count as usize);
    for _ in 0..type_count {
        let name = reader.read_dotnet_string()?;
        let version = reader.read_i32_le()?;
        type_readers.push(TypeReader { name, version });
    }

    let shared_resources = reader.read_7bit_encoded_int()?;
    if shared_resources != 0 {
        return Err(XnbError::SharedResourcesUnsupported(shared_resources));
    }

    /* 1-based type id; zero would mean a null primary object */
    let type_id = reader.read_7bit_encoded_int()?;
    if type_id == 0 {
        return Err(XnbError::NoPrimaryObject);
    }
    if type_id as usize > type_readers.len() {
        return Err(XnbError::TypeIdOutOfRange(type_id));
    }

    let asset = match type_readers[type_id as usize - 1].base_name() {
        TEXTURE2D_READER => Asset::Texture(Texture2D::read(&mut reader)?),
        SOUND_EFFECT_READER => Asset::Sound(SoundEffect::read(&mut reader)?),
        other => return Err(XnbError::UnknownTypeReader(other.to_string())),
    };

    Ok((type_readers, asset))
}
