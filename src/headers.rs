//! Decode JPEG markers/segments
//!
//! This file deals with decoding header information in a JPEG file
//!
//! A good guide on markers can be found [here](http://vip.sugovica.hu/Sardi/kepnezo/JPEG%20File%20Layout%20and%20Format.htm)

use std::cmp::max;
use std::io::Read;

use crate::components::Components;
use crate::decoder::{Decoder, MAX_COMPONENTS, MAX_DIMENSIONS};
use crate::errors::{DecodeErrors, UnsupportedSchemes};
use crate::huffman::HuffmanTable;
use crate::marker::Marker;
use crate::misc::{read_byte, read_u16_be, SOFMarkers, UN_ZIGZAG};
use crate::scan::{Scan, ScanComponent};

/// **B.2.4.2 Huffman table-specification syntax**
#[allow(clippy::similar_names)]
pub(crate) fn parse_huffman<R>(decoder: &mut Decoder, buf: &mut R) -> Result<(), DecodeErrors>
where
    R: Read,
{
    // Read the length of the Huffman table
    let dht_length = read_u16_be(buf)?
        .checked_sub(2)
        .ok_or(DecodeErrors::SyntaxStatic("Invalid DHT segment length"))?;

    let mut length_read: u16 = 0;

    // A single DHT marker may contain multiple Huffman Tables.
    while length_read < dht_length
    {
        // HT information
        let ht_info = read_byte(buf)?;

        // top nibble indicates whether the table is DC or AC class
        let table_class = ht_info >> 4;

        // bottom nibble is the destination slot, 0..=3
        let index = usize::from(ht_info & 0x0f);

        if table_class > 1 || index >= MAX_COMPONENTS
        {
            return Err(DecodeErrors::Syntax(format!(
                "Bad DHT class/destination byte 0x{ht_info:02X}"
            )));
        }

        let is_dc = table_class == 0;

        // read the number of symbols per code length
        let mut num_symbols: [u8; 16] = [0; 16];

        buf.read_exact(&mut num_symbols)
            .map_err(|_| DecodeErrors::UnexpectedEof)?;

        let symbols_sum: u16 = num_symbols.iter().map(|f| u16::from(*f)).sum();

        // The sum of the number of symbols cannot be greater than 256
        if symbols_sum > 256
        {
            return Err(DecodeErrors::SyntaxStatic(
                "Encountered Huffman table with excessive length in DHT",
            ));
        }

        // The symbols, in increasing code length
        let mut symbols: Vec<u8> = vec![0; symbols_sum.into()];

        buf.read_exact(&mut symbols)
            .map_err(|_| DecodeErrors::UnexpectedEof)?;

        length_read += 17 + symbols_sum;

        let table = HuffmanTable::new(&num_symbols, symbols, is_dc)?;

        // Tables live in an arena so scans already bound to an earlier
        // definition of this slot keep decoding with it.
        let handle = decoder.huffman_tables.len();

        decoder.huffman_tables.push(table);

        if is_dc
        {
            decoder.dc_slots[index] = Some(handle);
        }
        else
        {
            decoder.ac_slots[index] = Some(handle);
        }

        decoder.seen_dht = true;
    }

    if length_read != dht_length
    {
        return Err(DecodeErrors::SyntaxStatic("Invalid DHT segment length"));
    }

    Ok(())
}

/// **B.2.4.1 Quantization table-specification syntax**
pub(crate) fn parse_dqt<R>(decoder: &mut Decoder, buf: &mut R) -> Result<(), DecodeErrors>
where
    R: Read,
{
    let qt_length = read_u16_be(buf)?
        .checked_sub(2)
        .ok_or(DecodeErrors::SyntaxStatic("Invalid DQT segment length"))?;

    let mut length_read: u16 = 0;

    // A single DQT header may have multiple QT's
    while length_read < qt_length
    {
        let qt_info = read_byte(buf)?;

        // 0 = 8 bit, 1 = 16 bit
        let precision = qt_info >> 4;

        // last 4 bits give the destination slot
        let table_position = usize::from(qt_info & 0x0f);

        if precision != 0
        {
            return Err(DecodeErrors::Syntax(format!(
                "Only 8-bit quantization tables are supported, found precision {precision}"
            )));
        }

        if table_position >= MAX_COMPONENTS
        {
            return Err(DecodeErrors::Syntax(format!(
                "Too large quantization table destination {table_position}, expected a value between 0 and 3"
            )));
        }

        let mut qt_values = [0_u8; 64];

        buf.read_exact(&mut qt_values)
            .map_err(|_| DecodeErrors::UnexpectedEof)?;

        length_read += 65;

        // store in row-major order, the values arrive zig-zagged
        let mut table = [0_i32; 64];

        for i in 0..64
        {
            table[UN_ZIGZAG[i]] = i32::from(qt_values[i]);
        }

        decoder.qt_tables[table_position] = Some(table);

        decoder.seen_dqt = true;
    }

    if length_read != qt_length
    {
        return Err(DecodeErrors::SyntaxStatic("Invalid DQT segment length"));
    }

    return Ok(());
}

/// **B.2.4.4 Restart interval definition syntax**
pub(crate) fn parse_dri<R>(decoder: &mut Decoder, buf: &mut R) -> Result<(), DecodeErrors>
where
    R: Read,
{
    if read_u16_be(buf)? != 4
    {
        return Err(DecodeErrors::SyntaxStatic("Bad DRI length, corrupt JPEG"));
    }

    decoder.restart_interval = usize::from(read_u16_be(buf)?);

    info!("Restart interval: {} MCUs", decoder.restart_interval);

    Ok(())
}

/// **B.2.5 Define number of lines syntax**
///
/// Position validation (the segment must immediately follow the first
/// scan's entropy data) happens at the dispatch site.
pub(crate) fn parse_dnl<R>(decoder: &mut Decoder, buf: &mut R) -> Result<(), DecodeErrors>
where
    R: Read,
{
    if read_u16_be(buf)? != 4
    {
        return Err(DecodeErrors::SyntaxStatic("Bad DNL length, corrupt JPEG"));
    }

    let lines = read_u16_be(buf)?;

    if lines == 0
    {
        return Err(DecodeErrors::SyntaxStatic("DNL defines zero lines"));
    }

    info!("DNL override: {lines} lines");

    decoder.dnl_lines = Some(lines);

    Ok(())
}

/// Parse an application segment.
///
/// Only identification headers are inspected: JFIF/JFXX in APP0, Exif in
/// APP1 and Adobe (with its color-transform byte) in APP14. Everything
/// else in the body is skipped.
pub(crate) fn parse_app<R>(
    decoder: &mut Decoder, marker: Marker, buf: &mut R,
) -> Result<(), DecodeErrors>
where
    R: Read,
{
    let length = usize::from(
        read_u16_be(buf)?
            .checked_sub(2)
            .ok_or(DecodeErrors::SyntaxStatic("Invalid APP segment length"))?,
    );

    let mut body = vec![0_u8; length];

    buf.read_exact(&mut body)
        .map_err(|_| DecodeErrors::UnexpectedEof)?;

    match marker
    {
        Marker::APP(0) =>
        {
            if body.starts_with(b"JFIF\0")
            {
                decoder.jfif = true;
            }

            if body.starts_with(b"JFXX\0")
            {
                decoder.jfxx = true;
            }
        }
        Marker::APP(1) =>
        {
            if body.starts_with(b"Exif\0")
            {
                decoder.exif = true;
            }
        }
        Marker::APP(14) =>
        {
            // Adobe\0, a version byte, two two-byte flag words, then the
            // color transform byte
            if body.starts_with(b"Adobe\0") && body.len() >= 12
            {
                decoder.adobe = true;
                decoder.adobe_color_transform = Some(body[11]);

                info!("Adobe APP14 segment, color transform {}", body[11]);
            }
        }
        _ =>
        {}
    }

    Ok(())
}

/// Section: `B.2.2 Frame header syntax`
pub(crate) fn parse_start_of_frame<R>(
    buf: &mut R, sof: SOFMarkers, img: &mut Decoder,
) -> Result<(), DecodeErrors>
where
    R: Read,
{
    // Get length of the frame header
    let length = read_u16_be(buf)?;

    // usually 8, but can be 12 and 16, we only support 8
    let dt_precision = read_byte(buf)?;

    if dt_precision != 8
    {
        return Err(DecodeErrors::Unsupported(UnsupportedSchemes::HighPrecision(
            dt_precision,
        )));
    }

    img.info.set_density(dt_precision);

    // read and set the image height.
    let img_height = read_u16_be(buf)?;

    img.info.set_height(img_height);

    // read and set the image width
    let img_width = read_u16_be(buf)?;

    img.info.set_width(img_width);

    info!("Image width: {img_width}, height: {img_height}");

    if img_width == 0 || img_height == 0
    {
        return Err(DecodeErrors::SyntaxStatic(
            "Image width or height is set to zero, cannot continue",
        ));
    }

    let dimensions = usize::from(img_width) * usize::from(img_height);

    if dimensions > MAX_DIMENSIONS
    {
        return Err(DecodeErrors::Syntax(format!(
            "Image dimensions {dimensions} larger than the supported maximum {MAX_DIMENSIONS}"
        )));
    }

    // Number of components for the image.
    let num_components = read_byte(buf)?;

    if !matches!(num_components, 1 | 3 | 4)
    {
        return Err(DecodeErrors::Syntax(format!(
            "Number of frame components should be 1, 3 or 4, found {num_components}"
        )));
    }

    // length should cover the components
    if length != u16::from(8 + 3 * num_components)
    {
        return Err(DecodeErrors::Syntax(format!(
            "Length of start of frame differs from expected {}, value is {}",
            u16::from(8 + 3 * num_components),
            length
        )));
    }

    // set number of components
    img.info.components = num_components;

    img.info.set_sof_marker(sof);

    let mut components = Vec::with_capacity(usize::from(num_components));

    let mut temp = [0; 3];

    for _ in 0..num_components
    {
        // read 3 bytes for each component
        buf.read_exact(&mut temp)
            .map_err(|_| DecodeErrors::UnexpectedEof)?;

        let component = Components::from(temp)?;

        if components.iter().any(|c: &Components| c.id == component.id)
        {
            return Err(DecodeErrors::Syntax(format!(
                "Duplicate component id {} in the frame header",
                component.id
            )));
        }

        components.push(component);
    }

    for component in &mut components
    {
        // h_max contains the maximum horizontal sampling factor
        img.h_max = max(img.h_max, component.horizontal_sample);

        // v_max contains the maximum vertical sampling factor
        img.v_max = max(img.v_max, component.vertical_sample);

        // Extract quantization tables from the arrays into components
        let qt_table = img.qt_tables[usize::from(component.quantization_table_number)]
            .as_ref()
            .ok_or_else(|| {
                DecodeErrors::Syntax(format!(
                    "No quantization table for component {}",
                    component.id
                ))
            })?;

        component.quantization_table = *qt_table;
    }

    img.components = components;

    Ok(())
}

/// Parse a start of scan header into a [`Scan`] descriptor.
///
/// Resolves component references against the frame, binds the Huffman
/// tables each component will need and validates the spectral selection
/// and successive approximation parameters against the frame type.
pub(crate) fn parse_sos<R>(buf: &mut R, image: &mut Decoder) -> Result<Scan, DecodeErrors>
where
    R: Read,
{
    // Scan header length
    let ls = read_u16_be(buf)?;

    // Number of image components in scan
    let ns = read_byte(buf)?;

    if ls != u16::from(6 + 2 * ns)
    {
        return Err(DecodeErrors::SyntaxStatic("Bad SOS length, corrupt JPEG"));
    }

    if !(1..=4).contains(&ns)
    {
        return Err(DecodeErrors::Syntax(format!(
            "Number of scan components should be between 1 and 4, found {ns}"
        )));
    }

    let progressive = image.info.sof.is_progressive();

    let mut components = Vec::with_capacity(usize::from(ns));

    for _ in 0..ns
    {
        // component selector
        let id = read_byte(buf)?;

        // top 4 bits contain the DC table destination,
        // lower four bits the AC table destination
        let tables = read_byte(buf)?;

        let dc_slot = usize::from((tables >> 4) & 0xF);
        let ac_slot = usize::from(tables & 0xF);

        if dc_slot >= MAX_COMPONENTS || ac_slot >= MAX_COMPONENTS
        {
            return Err(DecodeErrors::Syntax(format!(
                "Bad Huffman table selector byte 0x{tables:02X} in scan header"
            )));
        }

        let component = image
            .components
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| {
                DecodeErrors::Syntax(format!("Scan references unknown component id {id}"))
            })?;

        if components
            .iter()
            .any(|c: &ScanComponent| c.component == component)
        {
            return Err(DecodeErrors::Syntax(format!(
                "Component id {id} appears twice in one scan"
            )));
        }

        components.push(ScanComponent {
            component,
            dc_table: image.dc_slots[dc_slot],
            ac_table: image.ac_slots[ac_slot],
        });
    }

    // Start of spectral selection
    let spec_start = read_byte(buf)?;

    // End of spectral selection
    let spec_end = read_byte(buf)?;

    let bit_approx = read_byte(buf)?;

    // successive approximation bit positions, high and low
    let succ_high = bit_approx >> 4;
    let succ_low = bit_approx & 0xF;

    if spec_start > 63 || spec_end > 63 || spec_end < spec_start
    {
        return Err(DecodeErrors::Syntax(format!(
            "Invalid spectral selection [{spec_start}, {spec_end}]"
        )));
    }

    if succ_high > 13 || succ_low > 13
    {
        return Err(DecodeErrors::Syntax(format!(
            "Invalid successive approximation {succ_high}/{succ_low}"
        )));
    }

    if progressive
    {
        if spec_start == 0 && spec_end != 0
        {
            return Err(DecodeErrors::SyntaxStatic(
                "Progressive scan mixes DC and AC coefficients, corrupt JPEG",
            ));
        }

        if spec_start != 0 && components.len() > 1
        {
            return Err(DecodeErrors::SyntaxStatic(
                "Progressive AC scans must carry exactly one component",
            ));
        }
    }
    else if spec_start != 0 || spec_end != 63 || succ_high != 0 || succ_low != 0
    {
        return Err(DecodeErrors::SyntaxStatic(
            "Sequential scans must cover the full spectrum in one pass",
        ));
    }

    let scan = Scan {
        // the caller records the position of the entropy data
        offset: 0,
        components,
        spec_start,
        spec_end,
        succ_high,
        succ_low,
    };

    // A component needs its DC table for DC-carrying first scans and its
    // AC table whenever AC coefficients are in the scan; DC refinement
    // reads raw bits only.
    for scan_comp in &scan.components
    {
        let id = image.components[scan_comp.component].id;

        if scan.is_dc() && !scan.is_refine() && scan_comp.dc_table.is_none()
        {
            return Err(DecodeErrors::Syntax(format!(
                "No DC Huffman table defined for component id {id}"
            )));
        }

        if scan.spec_end > 0 && scan_comp.ac_table.is_none()
        {
            return Err(DecodeErrors::Syntax(format!(
                "No AC Huffman table defined for component id {id}"
            )));
        }
    }

    Ok(scan)
}
