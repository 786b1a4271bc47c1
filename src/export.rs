/*
 * Re-export of decoded assets into standard formats: PNG for RGBA textures,
 * WAV for PCM sound effects.  Both writers emit into memory; file I/O is
 * the caller's business.
 */

use crc32fast::Hasher;
use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::content::{SoundEffect, SurfaceFormat, Texture2D};
use crate::XnbError;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];
const PNG_COMPRESSION_LEVEL: u8 = 6;

/// Encodes the top mip level of an RGBA texture as an 8-bit RGBA PNG.
pub fn texture_to_png(texture: &Texture2D) -> Result<Vec<u8>, XnbError> {
    if texture.format != SurfaceFormat::Rgba8888 {
        return Err(XnbError::UnsupportedSurfaceFormat(texture.format));
    }
    let rgba = texture
        .mips
        .first()
        .ok_or(XnbError::BadTextureData("texture has no mip levels"))?;

    Ok(write_png(texture.width, texture.height, rgba))
}

fn write_png(width: u32, height: u32, rgba: &[u8]) -> Vec<u8> {
    debug_assert_eq!(rgba.len(), width as usize * height as usize * 4);

    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.push(8); // bit depth
    ihdr.push(6); // color type: RGBA
    ihdr.push(0); // compression method
    ihdr.push(0); // filter method
    ihdr.push(0); // no interlace

    /* one filter byte (0 = None) in front of every scanline */
    let row_size = width as usize * 4;
    let mut raw = Vec::with_capacity(rgba.len() + height as usize);
    for row in rgba.chunks_exact(row_size) {
        raw.push(0);
        raw.extend_from_slice(row);
    }
    let idat = compress_to_vec_zlib(&raw, PNG_COMPRESSION_LEVEL);

    let mut out = Vec::with_capacity(idat.len() + 128);
    out.extend_from_slice(&PNG_SIGNATURE);
    push_chunk(&mut out, b"IHDR", &ihdr);
    push_chunk(&mut out, b"IDAT", &idat);
    push_chunk(&mut out, b"IEND", &[]);
    out
}

/* length, tag, payload, then a CRC-32 over tag and payload */
fn push_chunk(out: &mut Vec<u8>, tag: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(tag);
    out.extend_from_slice(data);

    let mut crc32 = Hasher::new();
    crc32.update(tag);
    crc32.update(data);
    out.extend_from_slice(&crc32.finalize().to_be_bytes());
}

/// Encodes a PCM sound effect as a RIFF/WAVE file.
pub fn sound_to_wav(sound: &SoundEffect) -> Vec<u8> {
    let data_size = sound.data.len() as u32;

    let mut out = Vec::with_capacity(44 + sound.data.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(data_size + 36).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&sound.channel_count.to_le_bytes());
    out.extend_from_slice(&sound.sample_rate.to_le_bytes());
    out.extend_from_slice(&sound.byte_rate().to_le_bytes());
    out.extend_from_slice(&sound.block_align.to_le_bytes());
    out.extend_from_slice(&sound.bits_per_sample.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());
    out.extend_from_slice(&sound.data);
    out
}
