//! Errors that may be encountered when decoding a JPEG image
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

use crate::misc::{
    START_OF_FRAME_EXT_AR, START_OF_FRAME_LOS_SEQ, START_OF_FRAME_LOS_SEQ_AR,
    START_OF_FRAME_PROG_DCT_AR,
};

/// Common decode errors
#[allow(clippy::module_name_repetitions)]
pub enum DecodeErrors
{
    /// The stream ended in the middle of a segment or inside entropy
    /// coded data
    UnexpectedEof,
    /// A byte where `0xFF` was expected, or a marker code this decoder
    /// does not know about
    BadMarker(u8),
    /// Structural violations in the marker stream
    Syntax(String),
    /// Structural violations, static message
    SyntaxStatic(&'static str),
    /// Image encoding schemes we do not support
    Unsupported(UnsupportedSchemes),
    /// A Huffman decode consumed more than 16 bits without matching a code
    BrokenHuffmanCode,
    /// Expected `0xFF 0xD0..0xD7` in cyclic order, got something else
    BadRestart(String),
}

impl Debug for DecodeErrors
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        Display::fmt(self, f)
    }
}

impl Display for DecodeErrors
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        match &self
        {
            Self::UnexpectedEof => write!(f, "Reached the end of the stream before the image was complete"),
            Self::BadMarker(m) => write!(f, "Unknown or misplaced marker byte 0x{m:02X}"),
            Self::Syntax(reason) => write!(f, "Malformed JPEG: {reason}"),
            Self::SyntaxStatic(reason) => write!(f, "Malformed JPEG: {reason}"),
            Self::Unsupported(scheme) => write!(f, "{scheme:?}"),
            Self::BrokenHuffmanCode => write!(f, "broken huffman code"),
            Self::BadRestart(reason) => write!(f, "Restart marker error: {reason}"),
        }
    }
}

impl Error for DecodeErrors {}

impl From<std::io::Error> for DecodeErrors
{
    fn from(err: std::io::Error) -> DecodeErrors
    {
        if err.kind() == std::io::ErrorKind::UnexpectedEof
        {
            return DecodeErrors::UnexpectedEof;
        }

        DecodeErrors::Syntax(format!("io error: {err}"))
    }
}

/// Encoding schemes the decoder recognizes but will not decode.
#[derive(Eq, PartialEq, Copy, Clone)]
pub enum UnsupportedSchemes
{
    /// Lossless (sequential), Huffman coding
    LosslessHuffman,
    /// Extended sequential DCT, arithmetic coding
    ExtendedSequentialDctArithmetic,
    /// Progressive DCT, arithmetic coding
    ProgressiveDctArithmetic,
    /// Lossless (sequential), arithmetic coding
    LosslessArithmetic,
    /// Differential (hierarchical) frames of any coding
    Differential,
    /// Arithmetic coding conditioning (DAC segment)
    ArithmeticConditioning,
    /// Hierarchical progression (DHP segment)
    HierarchicalProgression,
    /// Reference component expansion (EXP segment)
    ReferenceExpansion,
    /// Sample precision other than 8 bits
    HighPrecision(u8),
}

impl Debug for UnsupportedSchemes
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        match &self
        {
            Self::LosslessHuffman =>
            {
                write!(f, "The library cannot decode images encoded with the Lossless Huffman scheme")
            }
            Self::ExtendedSequentialDctArithmetic =>
            {
                write!(f, "The library cannot decode images encoded with the Extended Sequential DCT Arithmetic scheme")
            }
            Self::ProgressiveDctArithmetic =>
            {
                write!(f, "The library cannot decode images encoded with the Progressive DCT Arithmetic scheme")
            }
            Self::LosslessArithmetic =>
            {
                write!(f, "The library cannot decode images encoded with the Lossless Arithmetic scheme")
            }
            Self::Differential =>
            {
                write!(f, "The library cannot decode differential (hierarchical) frames")
            }
            Self::ArithmeticConditioning =>
            {
                write!(f, "Arithmetic coding (DAC segment) is not supported")
            }
            Self::HierarchicalProgression =>
            {
                write!(f, "Hierarchical progression (DHP segment) is not supported")
            }
            Self::ReferenceExpansion =>
            {
                write!(f, "Reference component expansion (EXP segment) is not supported")
            }
            Self::HighPrecision(p) =>
            {
                write!(f, "The library can only decode 8-bit images, the image has {p} bits of precision")
            }
        }
    }
}

impl UnsupportedSchemes
{
    /// Map an unsupported SOF marker code to the scheme it announces.
    #[must_use]
    pub fn from_int(int: u16) -> Option<UnsupportedSchemes>
    {
        if matches!(int, 0xffc5..=0xffc7 | 0xffcd..=0xffcf)
        {
            return Some(Self::Differential);
        }

        match int
        {
            START_OF_FRAME_PROG_DCT_AR => Some(Self::ProgressiveDctArithmetic),
            START_OF_FRAME_LOS_SEQ => Some(Self::LosslessHuffman),
            START_OF_FRAME_LOS_SEQ_AR => Some(Self::LosslessArithmetic),
            START_OF_FRAME_EXT_AR => Some(Self::ExtendedSequentialDctArithmetic),
            _ => None,
        }
    }
}
