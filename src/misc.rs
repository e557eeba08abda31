#![allow(dead_code)]

use std::fmt;
use std::io::Read;

use crate::errors::DecodeErrors;

/// Start of baseline DCT Huffman coding
pub const START_OF_FRAME_BASE: u16 = 0xffc0;
/// Start of extended sequential DCT Huffman coding
pub const START_OF_FRAME_EXT_SEQ: u16 = 0xffc1;
/// Start of progressive DCT Huffman coding
pub const START_OF_FRAME_PROG_DCT: u16 = 0xffc2;

/// Start of Lossless sequential Huffman coding
pub const START_OF_FRAME_LOS_SEQ: u16 = 0xffc3;
/// Start of extended sequential DCT arithmetic coding
pub const START_OF_FRAME_EXT_AR: u16 = 0xffc9;
/// Start of Progressive DCT arithmetic coding
pub const START_OF_FRAME_PROG_DCT_AR: u16 = 0xffca;
/// Start of Lossless sequential Arithmetic coding
pub const START_OF_FRAME_LOS_SEQ_AR: u16 = 0xffcb;

/// Mapping from the zig-zag serialization order to row-major 8x8 positions
#[rustfmt::skip]
pub const UN_ZIGZAG: [usize; 64] = [
    0,  1,  8,  16, 9,  2,  3, 10,
    17, 24, 32, 25, 18, 11, 4,  5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13, 6,  7,  14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];

/// Mapping from row-major 8x8 positions to the zig-zag serialization order
#[rustfmt::skip]
pub const ZIGZAG: [usize; 64] = [
    0,  1,  5,  6,  14, 15, 27, 28,
    2,  4,  7,  13, 16, 26, 29, 42,
    3,  8,  12, 17, 25, 30, 41, 43,
    9,  11, 18, 24, 31, 40, 44, 53,
    10, 19, 23, 32, 39, 45, 52, 54,
    20, 22, 33, 38, 46, 51, 55, 60,
    21, 34, 37, 47, 50, 56, 59, 61,
    35, 36, 48, 49, 57, 58, 62, 63,
];

/// Markers that identify the different start of frame types.
///
/// They encode whether the frame is sequential or progressive and whether
/// it uses Huffman or arithmetic entropy coding.
#[derive(Eq, PartialEq, Copy, Clone)]
#[allow(clippy::upper_case_acronyms)]
pub enum SOFMarkers
{
    /// Baseline DCT
    BaselineDct,
    /// SOF_1 Extended sequential DCT, Huffman coding
    ExtendedSequentialHuffman,
    /// Progressive DCT, Huffman coding
    ProgressiveDctHuffman,
    /// Lossless (sequential), Huffman coding
    LosslessHuffman,
    /// Extended sequential DCT, arithmetic coding
    ExtendedSequentialDctArithmetic,
    /// Progressive DCT, arithmetic coding
    ProgressiveDctArithmetic,
    /// Lossless (sequential), arithmetic coding
    LosslessArithmetic,
}

impl Default for SOFMarkers
{
    fn default() -> Self
    {
        Self::BaselineDct
    }
}

impl SOFMarkers
{
    /// Is this marker a sequential DCT type?
    #[must_use]
    pub fn is_sequential_dct(self) -> bool
    {
        matches!(
            self,
            Self::BaselineDct
                | Self::ExtendedSequentialHuffman
                | Self::ExtendedSequentialDctArithmetic
        )
    }

    /// Is this marker a lossless type?
    #[must_use]
    pub fn is_lossless(self) -> bool
    {
        matches!(self, Self::LosslessHuffman | Self::LosslessArithmetic)
    }

    /// Is this marker a progressive type?
    #[must_use]
    pub fn is_progressive(self) -> bool
    {
        matches!(
            self,
            Self::ProgressiveDctHuffman | Self::ProgressiveDctArithmetic
        )
    }

    /// Map a two-byte marker code to the SOF type it announces.
    #[must_use]
    pub fn from_int(int: u16) -> Option<SOFMarkers>
    {
        match int
        {
            START_OF_FRAME_BASE => Some(Self::BaselineDct),
            START_OF_FRAME_PROG_DCT => Some(Self::ProgressiveDctHuffman),
            START_OF_FRAME_PROG_DCT_AR => Some(Self::ProgressiveDctArithmetic),
            START_OF_FRAME_LOS_SEQ => Some(Self::LosslessHuffman),
            START_OF_FRAME_LOS_SEQ_AR => Some(Self::LosslessArithmetic),
            START_OF_FRAME_EXT_SEQ => Some(Self::ExtendedSequentialHuffman),
            START_OF_FRAME_EXT_AR => Some(Self::ExtendedSequentialDctArithmetic),
            _ => None,
        }
    }
}

impl fmt::Debug for SOFMarkers
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        match &self
        {
            Self::BaselineDct => write!(f, "Baseline DCT"),
            Self::ExtendedSequentialHuffman =>
            {
                write!(f, "Extended sequential DCT, Huffman coding")
            }
            Self::ProgressiveDctHuffman => write!(f, "Progressive DCT, Huffman coding"),
            Self::LosslessHuffman => write!(f, "Lossless (sequential), Huffman coding"),
            Self::ExtendedSequentialDctArithmetic =>
            {
                write!(f, "Extended sequential DCT, arithmetic coding")
            }
            Self::ProgressiveDctArithmetic => write!(f, "Progressive DCT, arithmetic coding"),
            Self::LosslessArithmetic => write!(f, "Lossless (sequential), arithmetic coding"),
        }
    }
}

/// Read a single byte from the reader.
///
/// # Errors
/// `UnexpectedEof` when the underlying stream is exhausted.
#[inline]
pub fn read_byte<R>(reader: &mut R) -> Result<u8, DecodeErrors>
where
    R: Read,
{
    let mut tmp = [0; 1];

    reader
        .read_exact(&mut tmp)
        .map_err(|_| DecodeErrors::UnexpectedEof)?;

    Ok(tmp[0])
}

/// Read two bytes from the reader and combine them into a `u16` in
/// big-endian order, the byte order of every length and size field in the
/// marker stream.
///
/// # Errors
/// `UnexpectedEof` when the underlying stream is exhausted.
#[inline]
pub fn read_u16_be<R>(reader: &mut R) -> Result<u16, DecodeErrors>
where
    R: Read,
{
    let mut tmp: [u8; 2] = [0, 0];

    reader
        .read_exact(&mut tmp)
        .map_err(|_| DecodeErrors::UnexpectedEof)?;

    Ok(u16::from_be_bytes(tmp))
}

#[cfg(test)]
mod tests
{
    use super::{UN_ZIGZAG, ZIGZAG};

    #[test]
    fn zigzag_inverts_un_zigzag()
    {
        for i in 0..64
        {
            assert_eq!(ZIGZAG[UN_ZIGZAG[i]], i);
            assert_eq!(UN_ZIGZAG[ZIGZAG[i]], i);
        }
    }
}
