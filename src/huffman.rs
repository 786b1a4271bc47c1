/*****************************************************************************
 *                              Huffman decoding                             *
 *****************************************************************************/

use crate::bitstream::BitReader;
use crate::LzxError;

/*
 * Build a table for fast decoding of symbols from a canonical Huffman code.
 * As input, this function takes the codeword length of each symbol which may
 * be used in the code.  As output, it produces a decode table indexed by the
 * next 'nbits' bits of compressed data.
 *
 * The table is flat: the first '1 << nbits' entries are the direct lookup
 * for codes of up to 'nbits' bits, the rest holds a binary tree for longer
 * codes.  A direct entry below 'nsyms' is a terminal symbol; anything else
 * is the index of an overflow pair, walked one bit at a time.  Codewords are
 * assigned in symbol order within each length, shortest lengths first, so
 * the table matches the canonical code used by the encoder.
 *
 * An all-zero length set is accepted and produces an empty table; any other
 * length set that does not exactly fill its code space fails.
 */
pub(crate) fn make_decode_table(
    nsyms: u32,
    nbits: u32,
    lengths: &[u8],
    table: &mut [u16],
) -> Result<(), LzxError> {
    debug_assert!(lengths.len() >= nsyms as usize);
    debug_assert!(table.len() == (1 << nbits) + (nsyms as usize) * 2);

    let mut pos: u32 = 0;
    let mut table_mask: u32 = 1 << nbits;
    let mut bit_mask: u32 = table_mask >> 1;
    let mut next_symbol: u32 = bit_mask;
    let mut bit_num: u32 = 1;

    /* Fill entries for codes short enough for a direct mapping. */
    while bit_num <= nbits {
        for sym in 0..nsyms {
            if lengths[sym as usize] as u32 == bit_num {
                let leaf = pos as usize;
                pos += bit_mask;
                if pos > table_mask {
                    return Err(LzxError::TableOverrun);
                }

                /* All lookups with this prefix resolve to the symbol. */
                table[leaf..leaf + bit_mask as usize].fill(sym as u16);
            }
        }
        bit_mask >>= 1;
        bit_num += 1;
    }

    /* Longer codes go through the overflow tree. */
    if pos != table_mask {
        for entry in table[pos as usize..table_mask as usize].iter_mut() {
            *entry = 0;
        }

        /* Track subordinate-path bits in the high half of 'pos'. */
        pos <<= 16;
        table_mask <<= 16;
        let mut bit_mask: u32 = 1 << 15;

        while bit_num <= 16 {
            for sym in 0..nsyms {
                if lengths[sym as usize] as u32 == bit_num {
                    let mut leaf = (pos >> 16) as usize;
                    for fill in 0..(bit_num - nbits) {
                        /* This path hasn't been taken yet: allocate a pair. */
                        if table[leaf] == 0 {
                            let pair = (next_symbol as usize) << 1;
                            if pair + 1 >= table.len() {
                                return Err(LzxError::TableOverrun);
                            }
                            table[pair] = 0;
                            table[pair + 1] = 0;
                            table[leaf] = next_symbol as u16;
                            next_symbol += 1;
                        }

                        /* Descend left or right on the next codeword bit. */
                        leaf = (table[leaf] as usize) << 1;
                        if (pos >> (15 - fill)) & 1 != 0 {
                            leaf += 1;
                        }
                    }
                    table[leaf] = sym as u16;

                    pos += bit_mask;
                    if pos > table_mask {
                        return Err(LzxError::TableOverrun);
                    }
                }
            }
            bit_mask >>= 1;
            bit_num += 1;
        }
    }

    if pos == table_mask {
        return Ok(());
    }

    /* Either an erroneous table, or all elements are zero: find out which. */
    if lengths[..nsyms as usize].iter().any(|&len| len != 0) {
        return Err(LzxError::TableOverrun);
    }
    Ok(())
}

/*
 * Decode one Huffman symbol.  Short codes resolve with a single direct
 * lookup of the next 'nbits' bits; longer codes keep the looked-up overflow
 * index and descend the tree one accumulator bit at a time.  The descent
 * inspects the raw accumulator through a moving mask rather than peeking, so
 * no bit state is disturbed until the symbol's true length is known and
 * removed in one step.
 */
pub(crate) fn read_huff_sym(
    table: &[u16],
    lengths: &[u8],
    nsyms: u32,
    nbits: u32,
    bitbuf: &mut BitReader<'_>,
) -> Result<u32, LzxError> {
    bitbuf.ensure_bits(16);

    let mut i = table[bitbuf.peek_bits(nbits) as usize] as u32;
    if i >= nsyms {
        let mut j = 1u32 << (32 - nbits);
        loop {
            j >>= 1;
            i <<= 1;
            i |= u32::from(bitbuf.accumulator() & j != 0);
            if j == 0 {
                return Err(LzxError::HuffmanDescent);
            }
            i = table[i as usize] as u32;
            if i < nsyms {
                break;
            }
        }
    }

    bitbuf.remove_bits(lengths[i as usize] as u32);
    Ok(i)
}
