use crate::bitstream::BitReader;
use crate::huffman::{make_decode_table, read_huff_sym};
use crate::lzx_constants::{
    PRETREE_MAXSYMBOLS, PRETREE_TABLEBITS, PRETREE_TABLESIZE,
};
use crate::LzxError;

/* The 3-bit block type field.  Zero is never emitted by an encoder. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Invalid,
    Verbatim,
    Aligned,
    Uncompressed,
}

impl BlockType {
    pub(crate) fn from_bits(bits: u32) -> Result<Self, LzxError> {
        match bits {
            1 => Ok(BlockType::Verbatim),
            2 => Ok(BlockType::Aligned),
            3 => Ok(BlockType::Uncompressed),
            _ => Err(LzxError::InvalidBlockType),
        }
    }
}

/*
 * Update 'lens[first..last]' from the bitstream.  Tree path lengths are
 * delta-encoded mod 17 against whatever the slots held before, which is why
 * the main and length arrays persist across blocks and start zeroed.
 *
 * The deltas themselves are Huffman-coded through the 20-element pretree,
 * whose own 4-bit path lengths precede every encoded range.  Codes 17 and 18
 * are zero runs, code 19 repeats a single delta-decoded length.
 */
pub(crate) fn read_lengths(
    pretree_len: &mut [u8; PRETREE_MAXSYMBOLS],
    pretree_table: &mut [u16; PRETREE_TABLESIZE],
    lens: &mut [u8],
    first: usize,
    last: usize,
    bitbuf: &mut BitReader<'_>,
) -> Result<(), LzxError> {
    for len in pretree_len.iter_mut() {
        *len = bitbuf.read_bits(4) as u8;
    }
    make_decode_table(
        PRETREE_MAXSYMBOLS as u32,
        PRETREE_TABLEBITS,
        pretree_len,
        pretree_table,
    )?;

    let mut x = first;
    while x < last {
        let z = read_huff_sym(
            pretree_table,
            pretree_len,
            PRETREE_MAXSYMBOLS as u32,
            PRETREE_TABLEBITS,
            bitbuf,
        )?;
        match z {
            17 => {
                let y = bitbuf.read_bits(4) as usize + 4;
                lens[x..x + y].fill(0);
                x += y;
            }
            18 => {
                let y = bitbuf.read_bits(5) as usize + 20;
                lens[x..x + y].fill(0);
                x += y;
            }
            19 => {
                let y = bitbuf.read_bits(1) as usize + 4;
                let z = read_huff_sym(
                    pretree_table,
                    pretree_len,
                    PRETREE_MAXSYMBOLS as u32,
                    PRETREE_TABLEBITS,
                    bitbuf,
                )?;
                let value = delta_mod17(lens[x], z);
                lens[x..x + y].fill(value);
                x += y;
            }
            _ => {
                lens[x] = delta_mod17(lens[x], z);
                x += 1;
            }
        }
    }
    Ok(())
}

#[inline]
fn delta_mod17(prev: u8, code: u32) -> u8 {
    let mut value = prev as i32 - code as i32;
    if value < 0 {
        value += 17;
    }
    value as u8
}
