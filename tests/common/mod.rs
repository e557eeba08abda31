//! Helpers that synthesize JPEG streams in memory.
//!
//! The tests build flat (single-color) images: every block carries a DC
//! difference on the first block of its component and nothing afterwards,
//! which exercises the full marker/entropy/IDCT pipeline while keeping
//! the expected output computable by hand.
//!
//! Two fixed Huffman tables are used throughout:
//! - DC: six symbols (categories 0..=5) at code length 3, codes 000..101.
//! - AC: 00 -> EOB, 01 -> (run 0, magnitude 1), 10 -> ZRL,
//!       110 -> (run 1, magnitude 1), 111 -> EOB run with 8 extension
//!       bits.
#![allow(dead_code)]

/// MSB-first bit accumulator with JPEG byte stuffing.
pub struct BitWriter
{
    pub bytes: Vec<u8>,
    bit_buf:   u32,
    bit_count: u8,
}

impl BitWriter
{
    pub fn new() -> BitWriter
    {
        BitWriter { bytes: Vec::new(), bit_buf: 0, bit_count: 0 }
    }

    pub fn put_bits(&mut self, value: u32, count: u8)
    {
        for i in (0..count).rev()
        {
            self.bit_buf = (self.bit_buf << 1) | ((value >> i) & 1);
            self.bit_count += 1;

            if self.bit_count == 8
            {
                let byte = self.bit_buf as u8;

                self.bytes.push(byte);

                if byte == 0xFF
                {
                    // stuff so the data byte does not read as a marker
                    self.bytes.push(0x00);
                }

                self.bit_buf = 0;
                self.bit_count = 0;
            }
        }
    }

    /// Pad the trailing partial byte with one-bits.
    pub fn byte_align(&mut self)
    {
        while self.bit_count != 0
        {
            self.put_bits(1, 1);
        }
    }

    pub fn finish(mut self) -> Vec<u8>
    {
        self.byte_align();

        self.bytes
    }
}

/// Append a marker segment with its big-endian length field.
pub fn segment(out: &mut Vec<u8>, marker: u8, body: &[u8])
{
    out.push(0xFF);
    out.push(marker);

    let length = (body.len() + 2) as u16;

    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(body);
}

/// A DQT segment defining table 0 as all ones.
pub fn dqt_unit(out: &mut Vec<u8>)
{
    let mut body = vec![0x00];

    body.extend_from_slice(&[1; 64]);

    segment(out, 0xDB, &body);
}

pub fn dht(out: &mut Vec<u8>, class: u8, id: u8, counts: &[u8; 16], symbols: &[u8])
{
    let mut body = vec![(class << 4) | id];

    body.extend_from_slice(counts);
    body.extend_from_slice(symbols);

    segment(out, 0xC4, &body);
}

/// The DC table every test uses: categories 0..=5 at length 3.
pub fn dht_test_dc(out: &mut Vec<u8>)
{
    let mut counts = [0_u8; 16];
    counts[2] = 6;

    dht(out, 0, 0, &counts, &[0, 1, 2, 3, 4, 5]);
}

/// The AC table every test uses; see the module docs for the code map.
pub fn dht_test_ac(out: &mut Vec<u8>)
{
    let mut counts = [0_u8; 16];
    counts[1] = 3;
    counts[2] = 2;

    dht(out, 1, 0, &counts, &[0x00, 0x01, 0xF0, 0x11, 0x80]);
}

/// SOF segment. `components` are `(id, h, v)` triples, all on
/// quantization table 0.
pub fn sof(out: &mut Vec<u8>, sof_marker: u8, width: u16, height: u16, components: &[(u8, u8, u8)])
{
    let mut body = vec![8];

    body.extend_from_slice(&height.to_be_bytes());
    body.extend_from_slice(&width.to_be_bytes());
    body.push(components.len() as u8);

    for &(id, h, v) in components
    {
        body.push(id);
        body.push((h << 4) | v);
        body.push(0);
    }

    segment(out, sof_marker, &body);
}

/// SOS header. Every component uses DC table 0 and AC table 0.
pub fn sos(out: &mut Vec<u8>, component_ids: &[u8], ss: u8, se: u8, ah: u8, al: u8)
{
    let mut body = vec![component_ids.len() as u8];

    for &id in component_ids
    {
        body.push(id);
        body.push(0x00);
    }

    body.push(ss);
    body.push(se);
    body.push((ah << 4) | al);

    segment(out, 0xDA, &body);
}

/// Emit the DC code for `diff` with the test DC table, then the
/// magnitude bits.
pub fn put_dc(bw: &mut BitWriter, diff: i32)
{
    let magnitude = diff.unsigned_abs();
    let category = 32 - magnitude.leading_zeros() as u8;

    assert!(category <= 5, "test DC table covers categories 0..=5");

    bw.put_bits(u32::from(category), 3);

    if category > 0
    {
        let value = if diff >= 0
        {
            diff as u32
        }
        else
        {
            (diff + (1 << category) - 1) as u32
        };

        bw.put_bits(value, category);
    }
}

/// End-of-block with the test AC table.
pub fn put_eob(bw: &mut BitWriter)
{
    bw.put_bits(0b00, 2);
}

pub const fn ceil_div(a: usize, b: usize) -> usize
{
    (a + b - 1) / b
}

/// Entropy data for a flat baseline scan: the first block of every
/// component carries `dc` as its difference, all later blocks ride the
/// prediction.
pub fn flat_scan_bits(
    width: usize, height: usize, components: &[(u8, u8, u8)], dc: i32,
) -> BitWriter
{
    let mut bw = BitWriter::new();

    let h_max = components.iter().map(|c| usize::from(c.1)).max().unwrap();
    let v_max = components.iter().map(|c| usize::from(c.2)).max().unwrap();

    let mut first = vec![true; components.len()];

    if components.len() == 1
    {
        let blocks = ceil_div(width, 8) * ceil_div(height, 8);

        for _ in 0..blocks
        {
            put_dc(&mut bw, if first[0] { dc } else { 0 });
            first[0] = false;

            put_eob(&mut bw);
        }
    }
    else
    {
        let mcus = ceil_div(width, 8 * h_max) * ceil_div(height, 8 * v_max);

        for _ in 0..mcus
        {
            for (pos, &(_, h, v)) in components.iter().enumerate()
            {
                for _ in 0..usize::from(h) * usize::from(v)
                {
                    put_dc(&mut bw, if first[pos] { dc } else { 0 });
                    first[pos] = false;

                    put_eob(&mut bw);
                }
            }
        }
    }

    bw
}

/// A complete flat baseline JPEG.
///
/// `dc` lands in the first block of every component; with the all-ones
/// quantization table every output sample becomes
/// `clamp(((dc << 3) + 32) >> 6) + 128`.
pub fn flat_baseline(width: u16, height: u16, components: &[(u8, u8, u8)], dc: i32) -> Vec<u8>
{
    let mut out = vec![0xFF, 0xD8];

    dqt_unit(&mut out);
    dht_test_dc(&mut out);
    dht_test_ac(&mut out);
    sof(&mut out, 0xC0, width, height, components);

    let ids: Vec<u8> = components.iter().map(|c| c.0).collect();

    sos(&mut out, &ids, 0, 63, 0, 0);

    out.extend_from_slice(&flat_scan_bits(width.into(), height.into(), components, dc).finish());

    out.extend_from_slice(&[0xFF, 0xD9]);

    out
}

/// The sample value a flat image built with `dc` decodes to.
pub fn flat_sample(dc: i32) -> u8
{
    ((((dc << 3) + 32) >> 6) + 128).clamp(0, 255) as u8
}
