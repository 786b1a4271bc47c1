/*
 * LZX decompression core, following the CAB variant of the format as used by
 * the XNA content pipeline.
 *
 * One LzxDecoder carries the full inter-call state of a single LZX stream:
 * the sliding window, the three-slot LRU of recent match offsets, and the
 * main/length tree path lengths, which are delta-coded from block to block
 * and therefore must survive between decompress() calls.  Calls must be
 * issued in stream order; after any error the decoder must be discarded.
 */

use crate::bitstream::BitReader;
use crate::decode_blocks::{read_lengths, BlockType};
use crate::huffman::{make_decode_table, read_huff_sym};
use crate::lzx_constants::*;
use crate::LzxError;

#[macro_export]
macro_rules! safety_check {
    ($cond:expr) => {
        if !$cond {
            return Err($crate::LzxError::InvalidData);
        }
    };
}

pub struct LzxDecoder {
    /* Ring of the last 'window_size' decoded bytes; matches copy from it. */
    window: Box<[u8]>,
    window_posn: u32,

    /* Three most recent real match offsets, R0 being the newest. */
    r0: u32,
    r1: u32,
    r2: u32,

    main_elements: u16,
    header_read: bool,
    block_type: BlockType,
    block_remaining: u32,

    /* Path lengths; the main and length arrays persist across blocks. */
    pretree_len: [u8; PRETREE_MAXSYMBOLS],
    aligned_len: [u8; ALIGNED_MAXSYMBOLS],
    maintree_len: [u8; MAINTREE_MAXSYMBOLS + MAX_LENS_OVERRUN],
    length_len: [u8; LENGTH_MAXSYMBOLS + MAX_LENS_OVERRUN],

    pretree_table: [u16; PRETREE_TABLESIZE],
    aligned_table: [u16; ALIGNED_TABLESIZE],
    maintree_table: [u16; MAINTREE_TABLESIZE],
    length_table: [u16; LENGTH_TABLESIZE],
}

impl LzxDecoder {
    /// Creates a decoder for one LZX stream with a window of
    /// `1 << window_bits` bytes.  The format supports exponents 15 through
    /// 21 (32 KiB to 2 MiB).
    pub fn new(window_bits: u16) -> Result<Self, LzxError> {
        if !(15..=21).contains(&window_bits) {
            return Err(LzxError::UnsupportedWindowSize);
        }

        let window_size = 1usize << window_bits;

        /* Window subdivisions depend on the exponent, not linearly. */
        let posn_slots: u16 = match window_bits {
            20 => 42,
            21 => 50,
            bits => bits * 2,
        };

        Ok(Self {
            window: vec![0xDC; window_size].into_boxed_slice(),
            window_posn: 0,
            r0: 1,
            r1: 1,
            r2: 1,
            main_elements: NUM_CHARS as u16 + posn_slots * 8,
            header_read: false,
            block_type: BlockType::Invalid,
            block_remaining: 0,
            pretree_len: [0; PRETREE_MAXSYMBOLS],
            aligned_len: [0; ALIGNED_MAXSYMBOLS],
            maintree_len: [0; MAINTREE_MAXSYMBOLS + MAX_LENS_OVERRUN],
            length_len: [0; LENGTH_MAXSYMBOLS + MAX_LENS_OVERRUN],
            pretree_table: [0; PRETREE_TABLESIZE],
            aligned_table: [0; ALIGNED_TABLESIZE],
            maintree_table: [0; MAINTREE_TABLESIZE],
            length_table: [0; LENGTH_TABLESIZE],
        })
    }

    pub fn window_size(&self) -> usize {
        self.window.len()
    }

    /// Decompresses one compressed block into `out_buf`, filling it
    /// completely.  The output length is caller knowledge (the outer framing
    /// carries it); it is not encoded in the LZX stream itself.
    pub fn decompress(&mut self, in_bytes: &[u8], out_buf: &mut [u8]) -> Result<(), LzxError> {
        safety_check!(!out_buf.is_empty());

        let mut bitbuf = BitReader::new(in_bytes);
        let window_size = self.window.len() as u32;
        let mut window_posn = self.window_posn;
        let mut r = [self.r0, self.r1, self.r2];

        /* One header bit precedes the first block of the stream. */
        if !self.header_read {
            if bitbuf.read_bits(1) != 0 {
                return Err(LzxError::IntelE8Unsupported);
            }
            self.header_read = true;
        }

        let out_len = out_buf.len() as u32;
        let mut togo = out_len;
        while togo > 0 {
            if self.block_remaining == 0 {
                self.read_block_header(&mut bitbuf, &mut r)?;
            }

            /*
             * A run can legitimately end with fewer than 16 bits in the
             * final word: building the decode tables reads ahead and may
             * exhaust the buffer.  Tolerate exactly one phantom word of
             * lookahead, as long as those bits were never consumed.
             */
            if bitbuf.position() > in_bytes.len() {
                safety_check!(
                    bitbuf.position() <= in_bytes.len() + 2 && bitbuf.bits_valid() >= 16
                );
            }

            while self.block_remaining > 0 && togo > 0 {
                let this_run = self.block_remaining.min(togo);
                togo -= this_run;
                self.block_remaining -= this_run;

                window_posn &= window_size - 1;
                /* runs can't straddle the window wraparound */
                if window_posn + this_run > window_size {
                    return Err(LzxError::WindowWrap);
                }

                match self.block_type {
                    BlockType::Verbatim => {
                        self.decode_run(&mut bitbuf, false, &mut window_posn, this_run, &mut r)?
                    }
                    BlockType::Aligned => {
                        self.decode_run(&mut bitbuf, true, &mut window_posn, this_run, &mut r)?
                    }
                    BlockType::Uncompressed => {
                        let pos = bitbuf.position();
                        let run = this_run as usize;
                        safety_check!(pos + run <= in_bytes.len());

                        let dest = window_posn as usize;
                        self.window[dest..dest + run].copy_from_slice(&in_bytes[pos..pos + run]);
                        bitbuf.advance_bytes(run);
                        window_posn += this_run;
                    }
                    BlockType::Invalid => return Err(LzxError::InvalidBlockType),
                }
            }
        }

        /*
         * The requested bytes are the newest in the window.  'window_posn'
         * is deliberately not masked here; masking happens on run entry.
         */
        let mut start = if window_posn == 0 {
            window_size
        } else {
            window_posn
        };
        safety_check!(start >= out_len);
        start -= out_len;
        out_buf.copy_from_slice(&self.window[start as usize..(start + out_len) as usize]);

        self.window_posn = window_posn;
        self.r0 = r[0];
        self.r1 = r[1];
        self.r2 = r[2];
        Ok(())
    }

    fn read_block_header(
        &mut self,
        bitbuf: &mut BitReader<'_>,
        r: &mut [u32; 3],
    ) -> Result<(), LzxError> {
        let block_type = BlockType::from_bits(bitbuf.read_bits(3))?;

        let hi = bitbuf.read_bits(16);
        let lo = bitbuf.read_bits(8);
        self.block_remaining = (hi << 8) | lo;
        self.block_type = block_type;

        match block_type {
            BlockType::Verbatim | BlockType::Aligned => {
                if block_type == BlockType::Aligned {
                    for len in self.aligned_len.iter_mut() {
                        *len = bitbuf.read_bits(3) as u8;
                    }
                    make_decode_table(
                        ALIGNED_MAXSYMBOLS as u32,
                        ALIGNED_TABLEBITS,
                        &self.aligned_len,
                        &mut self.aligned_table,
                    )?;
                    /* the rest of the aligned header matches verbatim */
                }

                let main_elements = self.main_elements as usize;
                read_lengths(
                    &mut self.pretree_len,
                    &mut self.pretree_table,
                    &mut self.maintree_len,
                    0,
                    NUM_CHARS as usize,
                    bitbuf,
                )?;
                read_lengths(
                    &mut self.pretree_len,
                    &mut self.pretree_table,
                    &mut self.maintree_len,
                    NUM_CHARS as usize,
                    main_elements,
                    bitbuf,
                )?;
                make_decode_table(
                    MAINTREE_MAXSYMBOLS as u32,
                    MAINTREE_TABLEBITS,
                    &self.maintree_len,
                    &mut self.maintree_table,
                )?;

                read_lengths(
                    &mut self.pretree_len,
                    &mut self.pretree_table,
                    &mut self.length_len,
                    0,
                    NUM_SECONDARY_LENGTHS as usize,
                    bitbuf,
                )?;
                make_decode_table(
                    LENGTH_MAXSYMBOLS as u32,
                    LENGTH_TABLEBITS,
                    &self.length_len,
                    &mut self.length_table,
                )?;
            }
            BlockType::Uncompressed => {
                /* Byte-align, then the stored LRU offsets follow verbatim. */
                bitbuf.align_input();
                r[0] = bitbuf.read_u32_le();
                r[1] = bitbuf.read_u32_le();
                r[2] = bitbuf.read_u32_le();
            }
            BlockType::Invalid => return Err(LzxError::InvalidBlockType),
        }
        Ok(())
    }

    /*
     * Literal/match decoding shared by VERBATIM and ALIGNED blocks; the two
     * types differ only in how offset slots above 2 turn into raw offsets.
     */
    fn decode_run(
        &mut self,
        bitbuf: &mut BitReader<'_>,
        aligned: bool,
        window_posn: &mut u32,
        mut this_run: u32,
        r: &mut [u32; 3],
    ) -> Result<(), LzxError> {
        let window_size = self.window.len() as u32;

        while this_run > 0 {
            let main_element = read_huff_sym(
                &self.maintree_table,
                &self.maintree_len,
                MAINTREE_MAXSYMBOLS as u32,
                MAINTREE_TABLEBITS,
                bitbuf,
            )?;

            if main_element < NUM_CHARS {
                /* literal */
                self.window[*window_posn as usize] = main_element as u8;
                *window_posn += 1;
                this_run -= 1;
                continue;
            }

            /* match: NUM_CHARS + ((slot << 3) | primary length) */
            let main_element = main_element - NUM_CHARS;

            let mut match_length = main_element & NUM_PRIMARY_LENGTHS;
            if match_length == NUM_PRIMARY_LENGTHS {
                match_length += read_huff_sym(
                    &self.length_table,
                    &self.length_len,
                    LENGTH_MAXSYMBOLS as u32,
                    LENGTH_TABLEBITS,
                    bitbuf,
                )?;
            }
            match_length += MIN_MATCH;

            let slot = main_element >> 3;
            let match_offset = match slot {
                0 => r[0],
                1 => {
                    let offset = r[1];
                    r[1] = r[0];
                    r[0] = offset;
                    offset
                }
                2 => {
                    let offset = r[2];
                    r[2] = r[0];
                    r[0] = offset;
                    offset
                }
                _ => {
                    let offset = if aligned {
                        self.decode_aligned_offset(bitbuf, slot)?
                    } else {
                        Self::decode_verbatim_offset(bitbuf, slot)
                    };
                    r[2] = r[1];
                    r[1] = r[0];
                    r[0] = offset;
                    offset
                }
            };

            safety_check!(match_length <= this_run);
            this_run -= match_length;

            /* stored offsets from uncompressed blocks are unchecked input */
            safety_check!(match_offset <= window_size);
            copy_match(
                &mut self.window,
                window_size,
                window_posn,
                match_offset,
                match_length,
            );
        }
        Ok(())
    }

    fn decode_verbatim_offset(bitbuf: &mut BitReader<'_>, slot: u32) -> u32 {
        if slot == 3 {
            1
        } else {
            let extra = EXTRA_BITS[slot as usize] as u32;
            let verbatim_bits = bitbuf.read_bits(extra);
            POSITION_BASE[slot as usize] - 2 + verbatim_bits
        }
    }

    /*
     * Aligned blocks split large offsets: the low 3 bits go through the
     * aligned tree, anything above comes in verbatim.  Slots with fewer
     * than 3 extra bits can't carry an aligned part and fall back to the
     * verbatim encoding.
     */
    fn decode_aligned_offset(
        &self,
        bitbuf: &mut BitReader<'_>,
        slot: u32,
    ) -> Result<u32, LzxError> {
        let extra = EXTRA_BITS[slot as usize] as u32;
        let mut match_offset = POSITION_BASE[slot as usize] - 2;

        if extra > 3 {
            let verbatim_bits = bitbuf.read_bits(extra - 3);
            match_offset += verbatim_bits << 3;
            match_offset += read_huff_sym(
                &self.aligned_table,
                &self.aligned_len,
                ALIGNED_MAXSYMBOLS as u32,
                ALIGNED_TABLEBITS,
                bitbuf,
            )?;
        } else if extra == 3 {
            match_offset += read_huff_sym(
                &self.aligned_table,
                &self.aligned_len,
                ALIGNED_MAXSYMBOLS as u32,
                ALIGNED_TABLEBITS,
                bitbuf,
            )?;
        } else if extra > 0 {
            match_offset += bitbuf.read_bits(extra);
        } else {
            match_offset = 1;
        }

        Ok(match_offset)
    }
}

/*
 * Copy a match into the window.  Offsets reach backwards through the ring:
 * when the source region precedes the start of the window it wraps to the
 * high end, and the copy splits in two at the seam.
 */
fn copy_match(
    window: &mut [u8],
    window_size: u32,
    window_posn: &mut u32,
    match_offset: u32,
    mut match_length: u32,
) {
    let mut rundest = *window_posn;
    let mut runsrc;

    if *window_posn >= match_offset {
        /* no wrap */
        runsrc = rundest - match_offset;
    } else {
        runsrc = rundest + (window_size - match_offset);
        let copy_length = match_offset - *window_posn;
        if copy_length < match_length {
            match_length -= copy_length;
            *window_posn += copy_length;
            copy_n_safe(window, copy_length, runsrc, &mut rundest);
            runsrc = 0;
        }
    }
    *window_posn += match_length;

    copy_n_safe(window, match_length, runsrc, &mut rundest);
}

/*
 * Forward-overlap-correct copy within the window.  When the destination
 * starts inside the source run ('dest - src' smaller than the length), a
 * plain memmove would be wrong: LZ matches with offset < length mean
 * "replicate the last 'offset' bytes", so the seed region is repeated
 * chunk by chunk instead.  Byte order is identical to a byte-at-a-time
 * forward copy.
 */
fn copy_n_safe(window: &mut [u8], len: u32, src: u32, dest: &mut u32) {
    let len = len as usize;
    let src = src as usize;
    let d = *dest as usize;

    if src != d && len > 0 {
        if d > src && src + len >= d {
            let distance = d - src;
            let mut out = d;
            let mut remaining = len;
            while remaining >= distance {
                window.copy_within(src..src + distance, out);
                out += distance;
                remaining -= distance;
            }
            window.copy_within(src..src + remaining, out);
        } else {
            window.copy_within(src..src + len, d);
        }
    }
    *dest += len as u32;
}
