//! End-to-end decompression tests over hand-assembled LZX streams.
//!
//! The bit writer below is the exact inverse of the decoder's bit reader:
//! bits are packed most-significant-first into 16-bit words, and the words
//! are stored little-endian.

use xnb_lzx_rs::{decompress_stream, read_asset, Asset, LzxDecoder, XnbFile};

struct BitWriter {
    bits: Vec<bool>,
}

impl BitWriter {
    fn new() -> Self {
        Self { bits: Vec::new() }
    }

    fn push(&mut self, value: u32, count: u32) {
        for i in (0..count).rev() {
            self.bits.push(value >> i & 1 != 0);
        }
    }

    fn finish(self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for chunk in self.bits.chunks(16) {
            let mut word = 0u16;
            for (i, &bit) in chunk.iter().enumerate() {
                if bit {
                    word |= 1 << (15 - i);
                }
            }
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes
    }
}

/// Canonical code assignment: codewords in (length, symbol) order, exactly
/// what the decoder's table construction expects.
fn canonical_codes(lengths: &[u8]) -> Vec<(u32, u32)> {
    let mut syms: Vec<usize> = (0..lengths.len()).filter(|&sym| lengths[sym] > 0).collect();
    syms.sort_by_key(|&sym| (lengths[sym], sym));

    let mut codes = vec![(0u32, 0u32); lengths.len()];
    let mut code = 0u32;
    let mut prev_len = 0u32;
    for &sym in &syms {
        let len = lengths[sym] as u32;
        code <<= len - prev_len;
        prev_len = len;
        codes[sym] = (code, len);
        code += 1;
    }
    codes
}

fn push_code(writer: &mut BitWriter, codes: &[(u32, u32)], sym: usize) {
    let (code, len) = codes[sym];
    assert!(len > 0, "symbol {} has no code", sym);
    writer.push(code, len);
}

/// Pretree used by every compressed test stream.  It can keep a length
/// (code 0), set one to 2 or 3 (deltas 15 and 14), and emit zero runs
/// (codes 17 and 18).
fn test_pretree_lens() -> [u8; 20] {
    let mut lens = [0u8; 20];
    lens[0] = 2;
    lens[14] = 3;
    lens[15] = 3;
    lens[17] = 2;
    lens[18] = 2;
    lens
}

fn emit_zero_run(writer: &mut BitWriter, codes: &[(u32, u32)], mut count: usize) {
    while count > 0 {
        if count >= 20 {
            let chunk = count.min(51);
            push_code(writer, codes, 18);
            writer.push((chunk - 20) as u32, 5);
            count -= chunk;
        } else if count >= 4 {
            push_code(writer, codes, 17);
            writer.push((count - 4) as u32, 4);
            count -= count.min(19);
        } else {
            push_code(writer, codes, 0);
            count -= 1;
        }
    }
}

/// Encodes one read-lengths range.  `sets` lists (position, previous length,
/// new length) in ascending position order; everything else is zeroed.
fn emit_length_updates(
    writer: &mut BitWriter,
    first: usize,
    last: usize,
    sets: &[(usize, u8, u8)],
) {
    let pretree_lens = test_pretree_lens();
    for len in pretree_lens {
        writer.push(len as u32, 4);
    }
    let codes = canonical_codes(&pretree_lens);

    let mut pos = first;
    for &(at, prev, target) in sets {
        emit_zero_run(writer, &codes, at - pos);
        let delta = (prev as i32 - target as i32).rem_euclid(17) as u32;
        push_code(writer, &codes, delta as usize);
        pos = at + 1;
    }
    emit_zero_run(writer, &codes, last - pos);
}

/// Emits a VERBATIM block header plus its three tree descriptions for a
/// 64 KiB window (main_elements = 512).
fn emit_verbatim_header(
    writer: &mut BitWriter,
    first_in_stream: bool,
    block_length: u32,
    maintree_sets: &[(usize, u8, u8)],
) {
    if first_in_stream {
        writer.push(0, 1); // no E8 translation
    }
    writer.push(1, 3); // VERBATIM
    writer.push(block_length >> 8, 16);
    writer.push(block_length & 0xFF, 8);

    let split = maintree_sets.partition_point(|&(at, _, _)| at < 256);
    emit_length_updates(writer, 0, 256, &maintree_sets[..split]);
    emit_length_updates(writer, 256, 512, &maintree_sets[split..]);
    emit_length_updates(writer, 0, 249, &[]); // empty length tree
}

fn uncompressed_stream(payload: &[u8]) -> Vec<u8> {
    let mut writer = BitWriter::new();
    writer.push(0, 1); // no E8 translation
    writer.push(3, 3); // UNCOMPRESSED
    writer.push(0, 16);
    writer.push(payload.len() as u32, 8);

    let mut stream = writer.finish();
    for _ in 0..3 {
        stream.extend_from_slice(&1u32.to_le_bytes()); // stored R0..R2
    }
    stream.extend_from_slice(payload);
    stream
}

#[test]
fn uncompressed_block_is_identity() {
    let payload = b"hello, xnb world";
    let stream = uncompressed_stream(payload);

    let mut decoder = LzxDecoder::new(16).unwrap();
    let mut out = vec![0u8; payload.len()];
    decoder.decompress(&stream, &mut out).unwrap();
    assert_eq!(out, payload);
}

#[test]
fn verbatim_literals() {
    // four literals with 2-bit codes: a=00, b=01, c=10, d=11
    let sets = [(97, 0, 2), (98, 0, 2), (99, 0, 2), (100, 0, 2)];

    let mut writer = BitWriter::new();
    emit_verbatim_header(&mut writer, true, 8, &sets);
    for sym in [0u32, 1, 2, 3, 0, 1, 2, 3] {
        writer.push(sym, 2);
    }

    let mut decoder = LzxDecoder::new(16).unwrap();
    let mut out = vec![0u8; 8];
    decoder.decompress(&writer.finish(), &mut out).unwrap();
    assert_eq!(out, b"abcdabcd");
}

#[test]
fn verbatim_match_repeats_last_byte() {
    // symbol 258 is a slot-0 match (reuse R0 = 1) of length 4
    let sets = [(97, 0, 2), (98, 0, 2), (258, 0, 2), (282, 0, 2)];

    let mut writer = BitWriter::new();
    emit_verbatim_header(&mut writer, true, 6, &sets);
    writer.push(0, 2); // 'a'
    writer.push(1, 2); // 'b'
    writer.push(2, 2); // match via R0

    let mut decoder = LzxDecoder::new(16).unwrap();
    let mut out = vec![0u8; 6];
    decoder.decompress(&writer.finish(), &mut out).unwrap();
    assert_eq!(out, b"abbbbb");
}

#[test]
fn verbatim_short_offset_slot() {
    // symbol 282 is slot 3, whose offset is always 1
    let sets = [(97, 0, 2), (98, 0, 2), (258, 0, 2), (282, 0, 2)];

    let mut writer = BitWriter::new();
    emit_verbatim_header(&mut writer, true, 6, &sets);
    writer.push(0, 2);
    writer.push(1, 2);
    writer.push(3, 2); // match via slot 3

    let mut decoder = LzxDecoder::new(16).unwrap();
    let mut out = vec![0u8; 6];
    decoder.decompress(&writer.finish(), &mut out).unwrap();
    assert_eq!(out, b"abbbbb");
}

#[test]
fn verbatim_match_with_extra_bits() {
    // codes: a=00, b=01, 258=10, 282=110, 290=111; symbol 290 is slot 4,
    // which carries one extra offset bit
    let sets = [
        (97, 0, 2),
        (98, 0, 2),
        (258, 0, 2),
        (282, 0, 3),
        (290, 0, 3),
    ];

    let mut writer = BitWriter::new();
    emit_verbatim_header(&mut writer, true, 8, &sets);
    for sym_bits in [(0u32, 2u32), (1, 2), (0, 2), (1, 2)] {
        writer.push(sym_bits.0, sym_bits.1);
    }
    writer.push(0b111, 3); // match symbol 290: length 4, slot 4
    writer.push(1, 1); // extra bit: offset = base 4 - 2 + 1 = 3

    let mut decoder = LzxDecoder::new(16).unwrap();
    let mut out = vec![0u8; 8];
    decoder.decompress(&writer.finish(), &mut out).unwrap();
    // the match replicates "bab" with offset 3 over 4 bytes
    assert_eq!(out, b"ababbabb");
}

#[test]
fn truncated_stream_detected_between_blocks() {
    // table reads run far past these two bytes; the 16-bit grace is blown
    let mut decoder = LzxDecoder::new(16).unwrap();
    let mut out = vec![0u8; 4];
    assert!(decoder.decompress(&[0x00, 0x20], &mut out).is_err());
}

#[test]
fn framed_stream_single_frame() {
    let payload = b"hello, xnb world";
    let block = uncompressed_stream(payload);

    let mut body = vec![0xFF];
    body.push((payload.len() >> 8) as u8);
    body.push(payload.len() as u8);
    body.push((block.len() >> 8) as u8);
    body.push(block.len() as u8);
    body.extend_from_slice(&block);

    assert_eq!(decompress_stream(&body, payload.len()).unwrap(), payload);
}

#[test]
fn framed_stream_state_carries_across_frames() {
    let sets = [(97, 0, 2), (98, 0, 2), (99, 0, 2), (100, 0, 2)];
    // second frame re-sends the same tree: all deltas are zero
    let keeps = [(97, 2, 2), (98, 2, 2), (99, 2, 2), (100, 2, 2)];

    let mut writer = BitWriter::new();
    emit_verbatim_header(&mut writer, true, 8, &sets);
    for sym in [0u32, 1, 2, 3, 0, 1, 2, 3] {
        writer.push(sym, 2);
    }
    let frame1 = writer.finish();

    let mut writer = BitWriter::new();
    emit_verbatim_header(&mut writer, false, 8, &keeps);
    for sym in [3u32, 3, 2, 2, 1, 1, 0, 0] {
        writer.push(sym, 2);
    }
    let frame2 = writer.finish();

    let mut body = Vec::new();
    for frame in [&frame1, &frame2] {
        body.push(0xFF);
        body.extend_from_slice(&[0x00, 0x08]); // frame size 8
        body.push((frame.len() >> 8) as u8);
        body.push(frame.len() as u8);
        body.extend_from_slice(frame);
    }

    let out = decompress_stream(&body, 16).unwrap();
    assert_eq!(&out[..8], b"abcdabcd");
    assert_eq!(&out[8..], b"ddccbbaa");
}

#[test]
fn identical_streams_decode_identically_in_parallel() {
    use rayon::prelude::*;

    let payload = b"same bytes, every decoder, every thread.........";
    let stream = uncompressed_stream(payload);

    let results: Vec<Vec<u8>> = (0..8)
        .into_par_iter()
        .map(|_| {
            let mut decoder = LzxDecoder::new(16).unwrap();
            let mut out = vec![0u8; payload.len()];
            decoder.decompress(&stream, &mut out).unwrap();
            out
        })
        .collect();

    for out in results {
        assert_eq!(out, payload);
    }
}

fn texture_body(width: u32, height: u32, rgba: &[u8]) -> Vec<u8> {
    let reader_name = b"Microsoft.Xna.Framework.Content.Texture2DReader";
    let mut body = vec![1u8]; // one type reader
    body.push(reader_name.len() as u8);
    body.extend_from_slice(reader_name);
    body.extend_from_slice(&0i32.to_le_bytes()); // reader version
    body.push(0); // shared resources
    body.push(1); // primary object type id
    body.extend_from_slice(&0i32.to_le_bytes()); // RGBA8888
    body.extend_from_slice(&width.to_le_bytes());
    body.extend_from_slice(&height.to_le_bytes());
    body.extend_from_slice(&1u32.to_le_bytes()); // mip count
    body.extend_from_slice(&(rgba.len() as u32).to_le_bytes());
    body.extend_from_slice(rgba);
    body
}

#[test]
fn compressed_xnb_to_png_round_trip() {
    let rgba: Vec<u8> = (0..64).collect();
    let body = texture_body(4, 4, &rgba);

    // wrap the body in one uncompressed LZX frame
    let block = uncompressed_stream(&body);
    let mut framed = vec![0xFF];
    framed.push((body.len() >> 8) as u8);
    framed.push(body.len() as u8);
    framed.push((block.len() >> 8) as u8);
    framed.push(block.len() as u8);
    framed.extend_from_slice(&block);

    let mut data = b"XNBw\x05\x80".to_vec();
    data.extend_from_slice(&((14 + framed.len()) as u32).to_le_bytes());
    data.extend_from_slice(&(body.len() as u32).to_le_bytes());
    data.extend_from_slice(&framed);

    let file = XnbFile::parse(&data).unwrap();
    assert!(file.was_compressed);
    assert_eq!(file.body, body);

    let (readers, asset) = read_asset(&file.body).unwrap();
    assert_eq!(readers[0].kind(), "Image");
    let texture = match asset {
        Asset::Texture(texture) => texture,
        _ => panic!("expected a texture"),
    };
    assert_eq!((texture.width, texture.height), (4, 4));

    let png = xnb_lzx_rs::export::texture_to_png(&texture).unwrap();
    assert_eq!(&png[1..4], b"PNG");
}
