//! JPEG marker codes.
//!
//! Markers come in two flavours, stand-alone markers (SOI, EOI, RST)
//! and markers that announce a length-prefixed segment body.

use std::fmt;

/// Markers recognized by the decoder.
#[derive(Eq, PartialEq, Copy, Clone)]
pub enum Marker
{
    /// Start of image
    SOI,
    /// End of image
    EOI,
    /// Start of frame, the variant is the low nibble of the marker code
    SOF(u8),
    /// Restart marker, the variant is the modulo-8 restart index
    RST(u8),
    /// Define Huffman table(s)
    DHT,
    /// Define arithmetic coding conditioning
    DAC,
    /// Start of scan
    SOS,
    /// Define quantization table(s)
    DQT,
    /// Define number of lines
    DNL,
    /// Define restart interval
    DRI,
    /// Define hierarchical progression
    DHP,
    /// Expand reference component
    EXP,
    /// Application segment
    APP(u8),
    /// Comment
    COM,
    /// Reserved for JPEG extensions
    JPG,
}

impl Marker
{
    /// Convert the second marker byte to a `Marker`, returning `None` for
    /// codes the format does not define.
    #[must_use]
    pub fn from_u8(n: u8) -> Option<Marker>
    {
        use self::Marker::{APP, COM, DAC, DHP, DHT, DNL, DQT, DRI, EOI, EXP, JPG, RST, SOF, SOI, SOS};
        match n
        {
            0xc0..=0xc3 | 0xc5..=0xc7 | 0xc9..=0xcb | 0xcd..=0xcf => Some(SOF(n & 0x0f)),
            0xc4 => Some(DHT),
            0xc8 => Some(JPG),
            0xcc => Some(DAC),
            0xd0..=0xd7 => Some(RST(n & 7)),
            0xd8 => Some(SOI),
            0xd9 => Some(EOI),
            0xda => Some(SOS),
            0xdb => Some(DQT),
            0xdc => Some(DNL),
            0xdd => Some(DRI),
            0xde => Some(DHP),
            0xdf => Some(EXP),
            0xe0..=0xef => Some(APP(n & 0x0f)),
            0xfe => Some(COM),
            _ => None,
        }
    }

    /// The full two-byte code of the marker.
    #[must_use]
    pub fn code(self) -> u16
    {
        let low: u8 = match self
        {
            Marker::SOF(n) => 0xc0 | n,
            Marker::DHT => 0xc4,
            Marker::JPG => 0xc8,
            Marker::DAC => 0xcc,
            Marker::RST(n) => 0xd0 | n,
            Marker::SOI => 0xd8,
            Marker::EOI => 0xd9,
            Marker::SOS => 0xda,
            Marker::DQT => 0xdb,
            Marker::DNL => 0xdc,
            Marker::DRI => 0xdd,
            Marker::DHP => 0xde,
            Marker::EXP => 0xdf,
            Marker::APP(n) => 0xe0 | n,
            Marker::COM => 0xfe,
        };

        0xff00 | u16::from(low)
    }
}

impl fmt::Debug for Marker
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self
        {
            Marker::SOF(n) => write!(f, "SOF({n})"),
            Marker::RST(n) => write!(f, "RST({n})"),
            Marker::APP(n) => write!(f, "APP({n})"),
            other => write!(f, "{}", match other
            {
                Marker::SOI => "SOI",
                Marker::EOI => "EOI",
                Marker::DHT => "DHT",
                Marker::DAC => "DAC",
                Marker::SOS => "SOS",
                Marker::DQT => "DQT",
                Marker::DNL => "DNL",
                Marker::DRI => "DRI",
                Marker::DHP => "DHP",
                Marker::EXP => "EXP",
                Marker::COM => "COM",
                Marker::JPG => "JPG",
                _ => unreachable!(),
            }),
        }
    }
}
