//! Main image logic.
#![allow(clippy::doc_markdown)]

use std::fs::read;
use std::io::Cursor;
use std::path::Path;

use crate::components::Components;
use crate::errors::{DecodeErrors, UnsupportedSchemes};
use crate::headers::{
    parse_app, parse_dnl, parse_dqt, parse_dri, parse_huffman, parse_sos, parse_start_of_frame,
};
use crate::huffman::HuffmanTable;
use crate::marker::Marker;
use crate::misc::{read_byte, read_u16_be, SOFMarkers};
use crate::scan::Scan;
use crate::worker::finish_components;

/// Maximum table slots (quantization and Huffman) and frame components.
pub(crate) const MAX_COMPONENTS: usize = 4;

/// Maximum image dimensions supported.
pub(crate) const MAX_DIMENSIONS: usize = 1 << 27;

/// The native color layout of a decoded image, keyed off the component
/// count, plus `RGB` which the BMP sink accepts from other producers.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OutputFormat
{
    /// Monochrome, one component
    L,
    /// Luminance / blue chroma / red chroma, three components
    YCbCr,
    /// Red/Green/Blue. Never produced by the decoder, accepted by the
    /// BMP writer
    RGB,
    /// Cyan/Magenta/Yellow/Key, four components
    CMYK,
}

impl OutputFormat
{
    /// Number of channels in this layout
    #[must_use]
    pub const fn num_components(self) -> usize
    {
        match self
        {
            Self::L => 1,
            Self::YCbCr | Self::RGB => 3,
            Self::CMYK => 4,
        }
    }
}

/// A Decoder Instance
#[allow(clippy::upper_case_acronyms)]
pub struct Decoder
{
    /// Struct to hold image information from SOF
    pub(crate) info: ImageInfo,
    /// Quantization tables, de-zigzagged at parse time; components bind
    /// their table at SOF
    pub(crate) qt_tables: [Option<[i32; 64]>; MAX_COMPONENTS],
    /// Arena of every Huffman table the stream defined. Scans hold
    /// indices into this, so later redefinitions of a table slot do not
    /// disturb earlier scans.
    pub(crate) huffman_tables: Vec<HuffmanTable>,
    /// Current DC table slot bindings
    pub(crate) dc_slots: [Option<usize>; MAX_COMPONENTS],
    /// Current AC table slot bindings
    pub(crate) ac_slots: [Option<usize>; MAX_COMPONENTS],
    /// Image components, holding DC predictions, quantization tables and
    /// the coefficient/sample buffers of a component
    pub(crate) components: Vec<Components>,
    /// Every scan of the image, in file order, decoded after the whole
    /// marker stream is validated
    pub(crate) scans: Vec<Scan>,

    /// maximum horizontal sampling factor of all channels in the image
    pub(crate) h_max: usize,
    /// maximum vertical sampling factor of all channels in the image
    pub(crate) v_max: usize,
    /// MCU width in pixels (interleaved scans)
    pub(crate) mcu_width: usize,
    /// MCU height in pixels (interleaved scans)
    pub(crate) mcu_height: usize,
    /// Number of MCUs in the x plane
    pub(crate) mcu_x: usize,
    /// Number of MCUs in the y plane
    pub(crate) mcu_y: usize,

    /// Is the image progressive?
    pub(crate) is_progressive: bool,

    /// restart interval in MCUs, zero means disabled
    pub(crate) restart_interval: usize,
    /// Height override from a DNL segment
    pub(crate) dnl_lines: Option<u16>,

    // Structural bookkeeping for validation
    pub(crate) seen_sof: bool,
    pub(crate) seen_dht: bool,
    pub(crate) seen_dqt: bool,
    pub(crate) seen_dri: bool,
    pub(crate) seen_rst: bool,
    /// A DNL segment is only legal as the marker immediately following
    /// the first scan's entropy data
    dnl_window: bool,

    // Metadata flags, identification headers only
    pub(crate) jfif: bool,
    pub(crate) jfxx: bool,
    pub(crate) exif: bool,
    pub(crate) adobe: bool,
    pub(crate) adobe_color_transform: Option<u8>,
}

impl Default for Decoder
{
    fn default() -> Self
    {
        Decoder {
            info: ImageInfo::default(),
            qt_tables: [None; MAX_COMPONENTS],
            huffman_tables: vec![],
            dc_slots: [None; MAX_COMPONENTS],
            ac_slots: [None; MAX_COMPONENTS],
            components: vec![],
            scans: vec![],
            h_max: 1,
            v_max: 1,
            mcu_width: 0,
            mcu_height: 0,
            mcu_x: 0,
            mcu_y: 0,
            is_progressive: false,
            restart_interval: 0,
            dnl_lines: None,
            seen_sof: false,
            seen_dht: false,
            seen_dqt: false,
            seen_dri: false,
            seen_rst: false,
            dnl_window: false,
            jfif: false,
            jfxx: false,
            exif: false,
            adobe: false,
            adobe_color_transform: None,
        }
    }
}

impl Decoder
{
    /// Create a new Decoder instance
    #[must_use]
    #[allow(clippy::new_without_default)]
    pub fn new() -> Decoder
    {
        Decoder::default()
    }

    /// Decode a buffer already in memory
    ///
    /// The buffer should be a valid jpeg file, perhaps created by the
    /// command `std::fs::read()` or a JPEG file downloaded from the
    /// internet.
    ///
    /// # Errors
    /// See [`DecodeErrors`] for an explanation
    pub fn decode_buffer(&mut self, buf: &[u8]) -> Result<Image, DecodeErrors>
    {
        self.decode_internal(Cursor::new(buf.to_vec()))
    }

    /// Decode a jpeg file
    ///
    /// # Errors
    /// See [`DecodeErrors`] for an explanation
    pub fn decode_file<P>(&mut self, file: P) -> Result<Image, DecodeErrors>
    where
        P: AsRef<Path>,
    {
        // Read to an in memory buffer
        let buffer = Cursor::new(read(file)?);

        info!("File size: {} bytes", buffer.get_ref().len());

        self.decode_internal(buffer)
    }

    /// Returns the image information
    ///
    /// This **must** be called after a call to `decode_file` or
    /// `decode_buffer`, otherwise it will return `None`
    #[must_use]
    pub fn info(&self) -> Option<ImageInfo>
    {
        if !self.seen_sof
        {
            return None;
        }

        return Some(self.info.clone());
    }

    /// Get the width of the image as a u16
    #[must_use]
    pub fn width(&self) -> u16
    {
        self.info.width
    }

    /// Get the height of the image as a u16
    #[must_use]
    pub fn height(&self) -> u16
    {
        self.info.height
    }

    /// Was a JFIF or JFXX identification header present?
    #[must_use]
    pub fn has_jfif(&self) -> bool
    {
        self.jfif || self.jfxx
    }

    /// Was an Exif identification header present?
    #[must_use]
    pub fn has_exif(&self) -> bool
    {
        self.exif
    }

    /// The color-transform byte of an Adobe APP14 segment, when one was
    /// present.
    #[must_use]
    pub fn adobe_transform(&self) -> Option<u8>
    {
        if self.adobe
        {
            return self.adobe_color_transform;
        }

        None
    }

    fn decode_internal(&mut self, buf: Cursor<Vec<u8>>) -> Result<Image, DecodeErrors>
    {
        let mut reader = buf;

        self.parse_marker_stream(&mut reader)?;

        self.validate_structure()?;

        self.prepare_frame()?;

        // entropy decoding was deferred until the whole stream checked
        // out; scans decode strictly in file order
        let scans = std::mem::take(&mut self.scans);

        for scan in &scans
        {
            self.decode_scan(&mut reader, scan)?;
        }

        self.scans = scans;

        finish_components(&mut self.components);

        debug!("Finished decoding image");

        Ok(self.assemble_image())
    }

    /// Walk the whole marker stream, parsing segments and recording scan
    /// offsets, stopping at EOI.
    fn parse_marker_stream(&mut self, reader: &mut Cursor<Vec<u8>>) -> Result<(), DecodeErrors>
    {
        // First two bytes should be the SOI marker
        let magic_bytes = read_u16_be(reader)?;

        if magic_bytes != 0xffd8
        {
            return Err(DecodeErrors::Syntax(format!(
                "Illegal magic bytes 0x{magic_bytes:04X}, not a JPEG stream"
            )));
        }

        let mut pending: Option<Marker> = None;

        loop
        {
            let marker = match pending.take()
            {
                Some(m) => m,
                None => next_marker(reader)?,
            };

            let in_dnl_window = self.dnl_window;
            self.dnl_window = false;

            match marker
            {
                Marker::EOI =>
                {
                    return Ok(());
                }
                Marker::SOI =>
                {
                    return Err(DecodeErrors::SyntaxStatic("Duplicate SOI marker"));
                }
                Marker::RST(_) =>
                {
                    return Err(DecodeErrors::SyntaxStatic(
                        "Restart marker outside entropy coded data",
                    ));
                }
                Marker::DNL =>
                {
                    if !in_dnl_window
                    {
                        return Err(DecodeErrors::SyntaxStatic(
                            "DNL segment must immediately follow the first scan",
                        ));
                    }

                    parse_dnl(self, reader)?;
                }
                Marker::SOS =>
                {
                    pending = Some(self.handle_sos(reader)?);
                }
                other =>
                {
                    self.parse_marker_inner(other, reader)?;
                }
            }
        }
    }

    /// Dispatch one non-positional marker to its segment parser.
    pub(crate) fn parse_marker_inner(
        &mut self, m: Marker, reader: &mut Cursor<Vec<u8>>,
    ) -> Result<(), DecodeErrors>
    {
        match m
        {
            Marker::SOF(v @ (0 | 1 | 2)) =>
            {
                if self.seen_sof
                {
                    return Err(DecodeErrors::SyntaxStatic("Duplicate SOF marker"));
                }

                let marker = match v
                {
                    0 => SOFMarkers::BaselineDct,
                    1 => SOFMarkers::ExtendedSequentialHuffman,
                    _ =>
                    {
                        self.is_progressive = true;

                        SOFMarkers::ProgressiveDctHuffman
                    }
                };

                info!("Image encoding scheme = `{:?}`", marker);

                parse_start_of_frame(reader, marker, self)?;

                self.seen_sof = true;
            }
            // Start of Frame segments not supported
            Marker::SOF(_) =>
            {
                let feature = UnsupportedSchemes::from_int(m.code());

                if let Some(feature) = feature
                {
                    return Err(DecodeErrors::Unsupported(feature));
                }

                return Err(DecodeErrors::SyntaxStatic("Unsupported image format"));
            }
            Marker::DAC => return Err(DecodeErrors::Unsupported(UnsupportedSchemes::ArithmeticConditioning)),
            Marker::DHP => return Err(DecodeErrors::Unsupported(UnsupportedSchemes::HierarchicalProgression)),
            Marker::EXP => return Err(DecodeErrors::Unsupported(UnsupportedSchemes::ReferenceExpansion)),
            Marker::JPG =>
            {
                return Err(DecodeErrors::SyntaxStatic("Reserved JPG marker in stream"));
            }
            Marker::DQT =>
            {
                parse_dqt(self, reader)?;
            }
            Marker::DHT =>
            {
                parse_huffman(self, reader)?;
            }
            Marker::DRI =>
            {
                if self.seen_dri
                {
                    return Err(DecodeErrors::SyntaxStatic("Duplicate DRI marker"));
                }

                parse_dri(self, reader)?;

                self.seen_dri = true;
            }
            Marker::APP(_) =>
            {
                parse_app(self, m, reader)?;
            }
            Marker::COM =>
            {
                let length = read_u16_be(reader)?
                    .checked_sub(2)
                    .ok_or(DecodeErrors::SyntaxStatic("Invalid COM segment length"))?;

                skip_bytes(reader, usize::from(length));
            }
            _ =>
            {
                // SOS/EOI/SOI/RST/DNL are handled positionally by the
                // caller
                return Err(DecodeErrors::Syntax(format!(
                    "Marker {m:?} cannot appear here"
                )));
            }
        }

        Ok(())
    }

    /// Parse an SOS header, record where its entropy data starts, and
    /// skip to the following marker.
    fn handle_sos(&mut self, reader: &mut Cursor<Vec<u8>>) -> Result<Marker, DecodeErrors>
    {
        if !self.seen_sof
        {
            return Err(DecodeErrors::SyntaxStatic("No SOF header before SOS"));
        }

        let mut scan = parse_sos(reader, self)?;

        scan.offset = reader.position();

        let marker = self.skip_entropy_stream(reader)?;

        self.scans.push(scan);

        if self.scans.len() == 1
        {
            self.dnl_window = true;
        }

        Ok(marker)
    }

    /// Skip entropy-coded bytes until the next real marker, honoring byte
    /// stuffing and stepping over in-scan restart markers.
    fn skip_entropy_stream(&mut self, reader: &mut Cursor<Vec<u8>>) -> Result<Marker, DecodeErrors>
    {
        loop
        {
            let byte = read_byte(reader)?;

            if byte != 0xFF
            {
                continue;
            }

            let mut code = read_byte(reader)?;

            while code == 0xFF
            {
                code = read_byte(reader)?;
            }

            if code == 0x00
            {
                // stuffed data byte
                continue;
            }

            match Marker::from_u8(code)
            {
                Some(Marker::RST(_)) =>
                {
                    self.seen_rst = true;
                }
                Some(m) => return Ok(m),
                None => return Err(DecodeErrors::BadMarker(code)),
            }
        }
    }

    /// Structural checks that need the whole stream.
    fn validate_structure(&self) -> Result<(), DecodeErrors>
    {
        if !self.seen_sof
        {
            return Err(DecodeErrors::SyntaxStatic("No SOF header in stream"));
        }

        if self.scans.is_empty()
        {
            return Err(DecodeErrors::SyntaxStatic("No SOS header in stream"));
        }

        if !self.seen_dht
        {
            return Err(DecodeErrors::SyntaxStatic("No Huffman tables in stream"));
        }

        if !self.seen_dqt
        {
            return Err(DecodeErrors::SyntaxStatic("No quantization tables in stream"));
        }

        if self.seen_dri != self.seen_rst
        {
            return Err(DecodeErrors::SyntaxStatic(
                "Restart interval declaration and restart markers must appear together",
            ));
        }

        if !self.is_progressive
        {
            // sequential frames are one scan covering every component
            if self.scans.len() != 1 || self.scans[0].components.len() != self.components.len()
            {
                return Err(DecodeErrors::SyntaxStatic(
                    "Sequential frames must carry exactly one scan covering all components",
                ));
            }
        }

        Ok(())
    }

    /// Fix the frame geometry (DNL override included) and allocate
    /// per-component buffers.
    fn prepare_frame(&mut self) -> Result<(), DecodeErrors>
    {
        if let Some(lines) = self.dnl_lines
        {
            self.info.set_height(lines);
        }

        let width = usize::from(self.info.width);
        let height = usize::from(self.info.height);

        self.mcu_width = self.h_max * 8;
        self.mcu_height = self.v_max * 8;

        self.mcu_x = (width + self.mcu_width - 1) / self.mcu_width;
        self.mcu_y = (height + self.mcu_height - 1) / self.mcu_height;

        for component in &mut self.components
        {
            // nearest-neighbor replication needs whole-number scales
            if self.h_max % component.horizontal_sample != 0
                || self.v_max % component.vertical_sample != 0
            {
                return Err(DecodeErrors::Syntax(format!(
                    "Component {} sampling ({}, {}) does not divide the frame sampling ({}, {})",
                    component.id,
                    component.horizontal_sample,
                    component.vertical_sample,
                    self.h_max,
                    self.v_max
                )));
            }

            component.prepare(width, height, self.h_max, self.v_max, self.mcu_x, self.mcu_y);
        }

        Ok(())
    }

    /// Move the finished sample planes into an [`Image`].
    fn assemble_image(&mut self) -> Image
    {
        let format = match self.components.len()
        {
            1 => OutputFormat::L,
            3 => OutputFormat::YCbCr,
            _ => OutputFormat::CMYK,
        };

        let planes = self
            .components
            .iter_mut()
            .map(|comp| Plane {
                sampling: (comp.horizontal_sample, comp.vertical_sample),
                x_scale: comp.x_scale,
                y_scale: comp.y_scale,
                stride: comp.width_stride(),
                data: std::mem::take(&mut comp.data),
            })
            .collect();

        Image {
            width: usize::from(self.info.width),
            height: usize::from(self.info.height),
            format,
            planes,
        }
    }
}

/// Read the next marker where one is structurally required.
fn next_marker(reader: &mut Cursor<Vec<u8>>) -> Result<Marker, DecodeErrors>
{
    let byte = read_byte(reader)?;

    if byte != 0xFF
    {
        return Err(DecodeErrors::BadMarker(byte));
    }

    let mut code = read_byte(reader)?;

    // 0xFF may repeat as fill before the marker code
    while code == 0xFF
    {
        code = read_byte(reader)?;
    }

    if code == 0x00
    {
        return Err(DecodeErrors::BadMarker(0));
    }

    Marker::from_u8(code).ok_or(DecodeErrors::BadMarker(code))
}

/// Advance the cursor over `n` bytes without reading them.
fn skip_bytes(reader: &mut Cursor<Vec<u8>>, n: usize)
{
    let position = reader.position();

    reader.set_position(position + n as u64);
}

/// One decoded color plane and its relation to the full frame grid.
#[derive(Debug)]
struct Plane
{
    sampling: (usize, usize),
    x_scale:  usize,
    y_scale:  usize,
    stride:   usize,
    data:     Vec<u8>,
}

/// A decoded image in its native color space.
///
/// Samples stay in per-component planes at their decoded resolution;
/// [`Image::linearized_data`] produces the interleaved full-resolution
/// view.
#[derive(Debug)]
pub struct Image
{
    width:  usize,
    height: usize,
    format: OutputFormat,
    planes: Vec<Plane>,
}

impl Image
{
    /// Width of the image in pixels
    #[must_use]
    pub fn width(&self) -> usize
    {
        self.width
    }

    /// Height of the image in pixels
    #[must_use]
    pub fn height(&self) -> usize
    {
        self.height
    }

    /// The native color layout, keyed off the frame component count
    #[must_use]
    pub fn format(&self) -> OutputFormat
    {
        self.format
    }

    /// Per-component (horizontal, vertical) sampling factors
    #[must_use]
    pub fn sampling_factors(&self) -> Vec<(usize, usize)>
    {
        self.planes.iter().map(|p| p.sampling).collect()
    }

    /// Interleave every component into one row-major 8-bit buffer of
    /// `width * height * components` samples.
    ///
    /// Sub-sampled components are upsampled to the frame grid by
    /// nearest-neighbor replication.
    #[must_use]
    pub fn linearized_data(&self) -> Vec<u8>
    {
        let channels = self.planes.len();

        let mut out = vec![0_u8; self.width * self.height * channels];

        for (c, plane) in self.planes.iter().enumerate()
        {
            let mut pos = c;

            for row in 0..self.height
            {
                let base = (row / plane.y_scale) * plane.stride;

                for col in 0..self.width
                {
                    out[pos] = plane.data[base + col / plane.x_scale];

                    pos += channels;
                }
            }
        }

        out
    }
}

/// A struct representing image information
#[derive(Default, Clone, Eq, PartialEq)]
#[allow(clippy::module_name_repetitions)]
pub struct ImageInfo
{
    /// Width of the image
    pub width:         u16,
    /// Height of the image
    pub height:        u16,
    /// Sample precision in bits
    pub pixel_density: u8,
    /// Start of frame marker type
    pub sof:           SOFMarkers,
    /// Number of components
    pub components:    u8,
}

impl ImageInfo
{
    /// Set width of the image
    ///
    /// Found in the start of frame
    pub(crate) fn set_width(&mut self, width: u16)
    {
        self.width = width;
    }

    /// Set height of the image
    ///
    /// Found in the start of frame, possibly overridden by a DNL segment
    pub(crate) fn set_height(&mut self, height: u16)
    {
        self.height = height;
    }

    /// Set the sample precision
    ///
    /// Found in the start of frame
    pub(crate) fn set_density(&mut self, density: u8)
    {
        self.pixel_density = density;
    }

    /// Set image start of frame marker
    ///
    /// Found in the start of frame header
    pub(crate) fn set_sof_marker(&mut self, marker: SOFMarkers)
    {
        self.sof = marker;
    }
}
