/*
 * Constants for the LZX bitstream, following the CAB variant of the format.
 *
 * The four Huffman trees share one flat-table layout: a direct-lookup region
 * of '1 << TABLEBITS' entries followed by an overflow region of
 * 'MAXSYMBOLS * 2' entries holding a binary tree for codes longer than
 * TABLEBITS bits.  Each TABLESIZE below is exactly that sum; changing a
 * TABLEBITS number without its TABLESIZE breaks the table builder.
 */

pub const MIN_MATCH: u32 = 2;
pub const MAX_MATCH: u32 = 257;
pub const NUM_CHARS: u32 = 256;

pub const NUM_PRIMARY_LENGTHS: u32 = 7;
pub const NUM_SECONDARY_LENGTHS: u32 = 249;

/* the longest match: all primary lengths, the top length-tree symbol, base */
const_assert!(MAX_MATCH == MIN_MATCH + NUM_PRIMARY_LENGTHS + NUM_SECONDARY_LENGTHS - 1);

pub const PRETREE_NUM_ELEMENTS: usize = 20;
pub const ALIGNED_NUM_ELEMENTS: usize = 8;

pub const PRETREE_MAXSYMBOLS: usize = PRETREE_NUM_ELEMENTS;
pub const PRETREE_TABLEBITS: u32 = 6;
pub const MAINTREE_MAXSYMBOLS: usize = NUM_CHARS as usize + 50 * 8;
pub const MAINTREE_TABLEBITS: u32 = 12;
pub const LENGTH_MAXSYMBOLS: usize = NUM_SECONDARY_LENGTHS as usize + 1;
pub const LENGTH_TABLEBITS: u32 = 12;
pub const ALIGNED_MAXSYMBOLS: usize = ALIGNED_NUM_ELEMENTS;
pub const ALIGNED_TABLEBITS: u32 = 7;

/*
 * A pretree zero run (code 18) can spill up to 50 entries past the last
 * requested length slot; the persistent length arrays carry that much slack
 * so run-length fills never need a bounds branch.
 */
pub const MAX_LENS_OVERRUN: usize = 50;

pub const PRETREE_TABLESIZE: usize = (1 << PRETREE_TABLEBITS) + (PRETREE_MAXSYMBOLS << 1);
pub const MAINTREE_TABLESIZE: usize = (1 << MAINTREE_TABLEBITS) + (MAINTREE_MAXSYMBOLS << 1);
pub const LENGTH_TABLESIZE: usize = (1 << LENGTH_TABLEBITS) + (LENGTH_MAXSYMBOLS << 1);
pub const ALIGNED_TABLESIZE: usize = (1 << ALIGNED_TABLEBITS) + (ALIGNED_MAXSYMBOLS << 1);

/* When you change a TABLEBITS, you must change the TABLESIZE, and vice versa! */
const_assert!(PRETREE_TABLEBITS == 6 && PRETREE_TABLESIZE == 104);
const_assert!(MAINTREE_TABLEBITS == 12 && MAINTREE_TABLESIZE == 5408);
const_assert!(LENGTH_TABLEBITS == 12 && LENGTH_TABLESIZE == 4596);
const_assert!(ALIGNED_TABLEBITS == 7 && ALIGNED_TABLESIZE == 144);

/*
 * Position-slot geometry.  Each slot encodes a range of raw match offsets as
 * a slot index plus 'EXTRA_BITS[slot]' verbatim (or verbatim + aligned)
 * bits; 'POSITION_BASE[slot]' is the running sum of the range sizes.  Both
 * arrays are fixed by the format: extra-bit counts grow by one every two
 * slots after the first four, clamped at 17.
 */

pub const EXTRA_BITS: [u8; 52] = build_extra_bits();
pub const POSITION_BASE: [u32; 51] = build_position_base();

const fn build_extra_bits() -> [u8; 52] {
    let mut table = [0u8; 52];
    let mut i = 0;
    let mut j = 0u8;
    while i <= 50 {
        table[i] = j;
        table[i + 1] = j;
        if i != 0 && j < 17 {
            j += 1;
        }
        i += 2;
    }
    table
}

const fn build_position_base() -> [u32; 51] {
    let mut table = [0u32; 51];
    let mut i = 0;
    let mut j = 0u32;
    while i <= 50 {
        table[i] = j;
        j += 1 << EXTRA_BITS[i];
        i += 1;
    }
    table
}

const_assert!(EXTRA_BITS[3] == 0 && EXTRA_BITS[4] == 1 && EXTRA_BITS[36] == 17);
const_assert!(POSITION_BASE[3] == 3 && POSITION_BASE[50] == 1 << 21);
