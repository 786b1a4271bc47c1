/* XNB container layout, XNA Game Studio 4.0. */

pub const XNB_MAGIC: [u8; 3] = *b"XNB";
pub const XNB_VERSION: u8 = 5;

pub const PLATFORM_WINDOWS: u8 = b'w';
pub const PLATFORM_PHONE: u8 = b'm';
pub const PLATFORM_XBOX: u8 = b'x';

pub const FLAG_HIDEF: u8 = 0x01;
pub const FLAG_COMPRESSED: u8 = 0x80;

/* header is 10 bytes, plus the decompressed-length field when compressed */
pub const HEADER_SIZE: usize = 10;
pub const COMPRESSED_HEADER_SIZE: usize = 14;

/* outer framing of a compressed body */
pub const FRAME_HEADER_ESCAPE: u8 = 0xFF;
pub const DEFAULT_FRAME_SIZE: usize = 0x8000;
pub const FRAME_WINDOW_BITS: u16 = 16;
