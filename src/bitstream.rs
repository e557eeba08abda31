//! A bit reader for entropy-coded segments.
//!
//! JPEG entropy data is a stream of MSB-first bits in which the byte `0xFF`
//! is followed by a stuffed `0x00` to keep it from reading as a marker.
//! Anything else after `0xFF` *is* a marker, and a few of them (RST0..RST7)
//! legally appear in the middle of scan data.
//!
//! The reader hands out one bit at a time, strips the stuffing, and parks
//! any marker it runs into in [`BitStream::marker`] where the scan decoder
//! can inspect it. Huffman decoding is variable length coding, so all of
//! this is unavoidably serial.

use std::io::Cursor;

use crate::errors::DecodeErrors;
use crate::huffman::HuffmanTable;
use crate::marker::Marker;
use crate::misc::read_byte;

/// Progressive AC refinement sub-states.
///
/// See the refinement decoder in `mcu_prog.rs` for how these drive the
/// coefficient walk.
pub(crate) const AC_STATE_READ_SYMBOL: u8 = 0;
pub(crate) const AC_STATE_ZRL_RUN: u8 = 1;
pub(crate) const AC_STATE_ZERO_RUN: u8 = 2;
pub(crate) const AC_STATE_EMIT: u8 = 3;
pub(crate) const AC_STATE_EOB_RUN: u8 = 4;

/// A `BitStream` struct, capable of feeding bits of compressed image data
/// to the Huffman decoders.
pub(crate) struct BitStream
{
    /// The byte currently being drained
    buffer: u8,
    /// Bits left in `buffer`
    bits_left: u8,
    /// Did we find a marker during decoding?
    pub marker: Option<Marker>,

    /// Progressive decoding: blocks left in the current end-of-band run
    pub eob_run: u32,
    /// Progressive decoding: AC refinement sub-state
    pub ac_state: u8,
    /// Progressive decoding: pending coefficient for `AC_STATE_EMIT`
    pub ac_next: i16,
    /// Progressive decoding: zero run countdown shared by the run states
    pub ac_run: u8,
}

impl BitStream
{
    /// Create a new `BitStream`
    pub(crate) const fn new() -> BitStream
    {
        BitStream {
            buffer: 0,
            bits_left: 0,
            marker: None,
            eob_run: 0,
            ac_state: AC_STATE_READ_SYMBOL,
            ac_next: 0,
            ac_run: 0,
        }
    }

    /// Load the next entropy-coded byte into the buffer.
    ///
    /// Stuffed `0xFF 0x00` pairs collapse to a data byte of `0xFF`. A real
    /// marker is parked in `self.marker` and reported as a syntax error,
    /// since a well-formed scan never runs dry in the middle of a block;
    /// restart markers are consumed at MCU boundaries before the bit
    /// reader can trip over them.
    fn refill(&mut self, reader: &mut Cursor<Vec<u8>>) -> Result<(), DecodeErrors>
    {
        if self.marker.is_some()
        {
            return Err(DecodeErrors::SyntaxStatic(
                "marker found inside entropy coded data",
            ));
        }

        let byte = read_byte(reader)?;

        if byte != 0xFF
        {
            self.buffer = byte;
            self.bits_left = 8;

            return Ok(());
        }

        let mut next_byte = read_byte(reader)?;

        // 0xFF 0xFF is legal fill, skip to the real code
        while next_byte == 0xFF
        {
            next_byte = read_byte(reader)?;
        }

        if next_byte == 0x00
        {
            // byte stuffing, the data byte is 0xFF
            self.buffer = 0xFF;
            self.bits_left = 8;

            return Ok(());
        }

        match Marker::from_u8(next_byte)
        {
            Some(m) =>
            {
                self.marker = Some(m);

                Err(DecodeErrors::Syntax(format!(
                    "marker {m:?} found inside entropy coded data"
                )))
            }
            None => Err(DecodeErrors::BadMarker(next_byte)),
        }
    }

    /// Fetch a single bit, MSB first.
    #[inline]
    pub fn next_bit(&mut self, reader: &mut Cursor<Vec<u8>>) -> Result<u8, DecodeErrors>
    {
        if self.bits_left == 0
        {
            self.refill(reader)?;
        }

        self.bits_left -= 1;

        Ok((self.buffer >> self.bits_left) & 1)
    }

    /// Read `n` bits MSB-first and return them as an unsigned integer.
    ///
    /// This is the RECEIVE procedure; `n` never exceeds 16.
    pub fn receive(&mut self, reader: &mut Cursor<Vec<u8>>, n: u8) -> Result<i32, DecodeErrors>
    {
        let mut value = 0;

        for _ in 0..n
        {
            value = (value << 1) | i32::from(self.next_bit(reader)?);
        }

        Ok(value)
    }

    /// Decode one Huffman symbol from the stream.
    pub fn decode_symbol(
        &mut self, reader: &mut Cursor<Vec<u8>>, table: &HuffmanTable,
    ) -> Result<u8, DecodeErrors>
    {
        table.decode(|| self.next_bit(reader))
    }

    /// Decode a DC coefficient difference and fold it into the running
    /// predictor.
    pub fn decode_dc(
        &mut self, reader: &mut Cursor<Vec<u8>>, dc_table: &HuffmanTable, dc_prediction: &mut i32,
    ) -> Result<(), DecodeErrors>
    {
        let symbol = self.decode_symbol(reader, dc_table)?;

        let bits = self.receive(reader, symbol)?;

        *dc_prediction += huff_extend(bits, symbol);

        Ok(())
    }

    /// Discard any buffered partial byte and clear all per-scan state.
    ///
    /// Called at scan start and at every restart boundary.
    pub fn reset(&mut self)
    {
        self.buffer = 0;
        self.bits_left = 0;
        self.marker = None;
        self.eob_run = 0;
        self.ac_state = AC_STATE_READ_SYMBOL;
        self.ac_next = 0;
        self.ac_run = 0;
    }

    /// Resynchronize at a restart boundary.
    ///
    /// Byte-aligns, then demands `0xFF 0xD0..0xD7` with the expected cyclic
    /// index. On success the bit accumulator and progressive sub-state are
    /// cleared; the caller zeroes the DC predictors.
    #[cold]
    pub fn expect_restart(
        &mut self, reader: &mut Cursor<Vec<u8>>, expected: u8,
    ) -> Result<(), DecodeErrors>
    {
        // partial bits before a restart are padding
        self.bits_left = 0;

        let marker = match self.marker.take()
        {
            Some(m) => m,
            None =>
            {
                let byte = read_byte(reader).map_err(|_| {
                    DecodeErrors::BadRestart(format!(
                        "stream ended where RST({expected}) was expected"
                    ))
                })?;

                if byte != 0xFF
                {
                    return Err(DecodeErrors::BadRestart(format!(
                        "expected a restart marker, found byte 0x{byte:02X}"
                    )));
                }

                let mut code = read_byte(reader)?;

                while code == 0xFF
                {
                    code = read_byte(reader)?;
                }

                Marker::from_u8(code).ok_or(DecodeErrors::BadMarker(code))?
            }
        };

        match marker
        {
            Marker::RST(n) if n == expected =>
            {
                self.reset();

                Ok(())
            }
            Marker::RST(n) => Err(DecodeErrors::BadRestart(format!(
                "expected RST({expected}), found RST({n})"
            ))),
            other => Err(DecodeErrors::BadRestart(format!(
                "expected RST({expected}), found {other:?}"
            ))),
        }
    }
}

/// Do the equivalent of JPEG EXTEND (Table F.1).
///
/// `v` is a raw `n`-bit magnitude; values with the top bit clear map to
/// the negative half of the range.
#[inline]
pub(crate) fn huff_extend(v: i32, n: u8) -> i32
{
    if n == 0
    {
        return 0;
    }

    if v < (1 << (n - 1))
    {
        return v + ((-1_i32) << n) + 1;
    }

    v
}

/// Decode an end-of-band run length (Table G.1).
#[inline]
pub(crate) fn huff_extend_pos(v: i32, n: u8) -> i32
{
    v + (1 << n)
}

#[cfg(test)]
mod tests
{
    use std::io::Cursor;

    use super::{huff_extend, huff_extend_pos, BitStream};

    #[test]
    fn bits_come_out_msb_first()
    {
        let mut reader = Cursor::new(vec![0xA0]);
        let mut stream = BitStream::new();

        let bits: Vec<u8> = (0..8).map(|_| stream.next_bit(&mut reader).unwrap()).collect();

        assert_eq!(bits, [1, 0, 1, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn stuffed_ff_is_a_data_byte()
    {
        let mut reader = Cursor::new(vec![0xFF, 0x00, 0xA0]);
        let mut stream = BitStream::new();

        assert_eq!(stream.receive(&mut reader, 16).unwrap(), 0xFFA0);
    }

    #[test]
    fn marker_inside_entropy_data_is_an_error()
    {
        let mut reader = Cursor::new(vec![0xFF, 0xC4]);
        let mut stream = BitStream::new();

        assert!(stream.next_bit(&mut reader).is_err());
    }

    #[test]
    fn extend_spot_values()
    {
        assert_eq!(huff_extend(0, 0), 0);
        assert_eq!(huff_extend(0b0, 1), -1);
        assert_eq!(huff_extend(0b1, 1), 1);
        assert_eq!(huff_extend(0b00, 2), -3);
        assert_eq!(huff_extend(0b01, 2), -2);
        assert_eq!(huff_extend(0b10, 2), 2);
        assert_eq!(huff_extend(0b11, 2), 3);
        assert_eq!(huff_extend(0b000, 3), -7);
        assert_eq!(huff_extend(0b111, 3), 7);
    }

    #[test]
    fn extend_pos_spot_values()
    {
        assert_eq!(huff_extend_pos(0, 0), 1);
        assert_eq!(huff_extend_pos(0b0, 1), 2);
        assert_eq!(huff_extend_pos(0b1, 1), 3);
        assert_eq!(huff_extend_pos(0b00, 2), 4);
        assert_eq!(huff_extend_pos(0b111, 3), 15);
    }

    #[test]
    fn restart_resynchronizes()
    {
        // one padding byte of ones, then RST0
        let mut reader = Cursor::new(vec![0xBF, 0xFF, 0xD0, 0x80]);
        let mut stream = BitStream::new();

        assert_eq!(stream.next_bit(&mut reader).unwrap(), 1);

        stream.expect_restart(&mut reader, 0).unwrap();

        assert_eq!(stream.next_bit(&mut reader).unwrap(), 1);
    }

    #[test]
    fn out_of_sequence_restart_fails()
    {
        let mut reader = Cursor::new(vec![0xFF, 0xD3]);
        let mut stream = BitStream::new();

        assert!(stream.expect_restart(&mut reader, 0).is_err());
    }
}
