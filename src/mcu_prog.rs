//! Routines for progressive decoding
//!
//! Progressive images spread the image over multiple scans, splitting
//! coefficients by spectral band (DC first, AC bands later) and optionally
//! by bit plane (successive approximation). Four block decoders cover the
//! combinations:
//!
//! - DC first: a baseline DC read, shifted up by the approximation
//!   position.
//! - DC refinement: one raw bit per block, OR-ed into the stored
//!   coefficient.
//! - AC first: baseline-style run-length coding plus end-of-band runs
//!   that zero out whole runs of blocks.
//! - AC refinement: the messy one. New coefficients arrive one bit-plane
//!   at a time while every previously nonzero coefficient in the band
//!   receives a correction bit, even inside end-of-band runs. The walk
//!   is an explicit little state machine that survives across blocks of
//!   the scan.

use std::io::Cursor;

use crate::bitstream::{
    huff_extend, huff_extend_pos, BitStream, AC_STATE_EMIT, AC_STATE_EOB_RUN, AC_STATE_READ_SYMBOL,
    AC_STATE_ZERO_RUN, AC_STATE_ZRL_RUN,
};
use crate::errors::DecodeErrors;
use crate::huffman::HuffmanTable;
use crate::misc::UN_ZIGZAG;

impl BitStream
{
    /// Decode the DC coefficient of one block in a first (non-refining)
    /// DC scan.
    pub(crate) fn decode_prog_dc_first(
        &mut self, reader: &mut Cursor<Vec<u8>>, dc_table: &HuffmanTable, block: &mut [i16; 64],
        dc_prediction: &mut i32, succ_low: u8,
    ) -> Result<(), DecodeErrors>
    {
        self.decode_dc(reader, dc_table, dc_prediction)?;

        block[0] = (*dc_prediction << succ_low) as i16;

        Ok(())
    }

    /// Refine the DC coefficient of one block by a single bit plane.
    pub(crate) fn decode_prog_dc_refine(
        &mut self, reader: &mut Cursor<Vec<u8>>, block: &mut [i16; 64], succ_low: u8,
    ) -> Result<(), DecodeErrors>
    {
        let bit = self.next_bit(reader)?;

        block[0] |= i16::from(bit) << succ_low;

        Ok(())
    }

    /// Decode one block of a first (non-refining) AC scan.
    ///
    /// An end-of-band code zeroes the rest of this block and `eob_run`
    /// following blocks; the counter persists on the stream until those
    /// blocks have passed through here.
    pub(crate) fn decode_prog_ac_first(
        &mut self, reader: &mut Cursor<Vec<u8>>, ac_table: &HuffmanTable, block: &mut [i16; 64],
        spec_start: u8, spec_end: u8, succ_low: u8,
    ) -> Result<(), DecodeErrors>
    {
        if self.eob_run > 0
        {
            // inside an end-of-band run, the block stays all zero
            self.eob_run -= 1;

            return Ok(());
        }

        let mut k = usize::from(spec_start);

        while k <= usize::from(spec_end)
        {
            let rs = self.decode_symbol(reader, ac_table)?;

            let r = rs >> 4;
            let s = rs & 15;

            if s == 0
            {
                if r < 15
                {
                    let bits = self.receive(reader, r)?;

                    // the run includes the block we are in
                    self.eob_run = huff_extend_pos(bits, r) as u32 - 1;

                    break;
                }

                // ZRL, sixteen zero coefficients
                k += 16;
            }
            else
            {
                k += usize::from(r);

                let bits = self.receive(reader, s)?;

                if k > usize::from(spec_end)
                {
                    return Err(DecodeErrors::SyntaxStatic(
                        "AC coefficient run overflows the spectral band",
                    ));
                }

                block[UN_ZIGZAG[k]] = (huff_extend(bits, s) << succ_low) as i16;

                k += 1;
            }
        }

        Ok(())
    }

    /// Decode one block of an AC refinement scan.
    ///
    /// `ac_state`, `ac_run`, `ac_next` and `eob_run` live on the stream
    /// because a zero run or an end-of-band run routinely crosses block
    /// boundaries mid-count.
    pub(crate) fn decode_prog_ac_refine(
        &mut self, reader: &mut Cursor<Vec<u8>>, ac_table: &HuffmanTable, block: &mut [i16; 64],
        spec_start: u8, spec_end: u8, succ_low: u8,
    ) -> Result<(), DecodeErrors>
    {
        let bit = 1_i16 << succ_low;

        let mut k = usize::from(spec_start);

        while k <= usize::from(spec_end)
        {
            let z = UN_ZIGZAG[k];

            if self.ac_state == AC_STATE_READ_SYMBOL
            {
                let rs = self.decode_symbol(reader, ac_table)?;

                let r = rs >> 4;
                let s = rs & 15;

                match s
                {
                    0 =>
                    {
                        if r < 15
                        {
                            let bits = self.receive(reader, r)?;

                            self.eob_run = huff_extend_pos(bits, r) as u32;
                            self.ac_state = AC_STATE_EOB_RUN;
                        }
                        else
                        {
                            self.ac_run = 16;
                            self.ac_state = AC_STATE_ZRL_RUN;
                        }
                    }
                    1 =>
                    {
                        let b = self.receive(reader, 1)?;

                        self.ac_next = huff_extend(b, 1) as i16;
                        self.ac_run = r;
                        self.ac_state = if r > 0 { AC_STATE_ZERO_RUN } else { AC_STATE_EMIT };
                    }
                    _ =>
                    {
                        return Err(DecodeErrors::SyntaxStatic(
                            "Refinement scan carries a magnitude above one",
                        ));
                    }
                }

                // revisit position k in the new state
                continue;
            }

            if block[z] != 0
            {
                // every already-nonzero coefficient gets a correction bit,
                // moving its magnitude away from zero
                if self.next_bit(reader)? == 1
                {
                    if block[z] >= 0
                    {
                        block[z] += bit;
                    }
                    else
                    {
                        block[z] -= bit;
                    }
                }
            }
            else
            {
                match self.ac_state
                {
                    AC_STATE_ZRL_RUN | AC_STATE_ZERO_RUN =>
                    {
                        self.ac_run -= 1;

                        if self.ac_run == 0
                        {
                            self.ac_state = if self.ac_state == AC_STATE_ZERO_RUN
                            {
                                AC_STATE_EMIT
                            }
                            else
                            {
                                AC_STATE_READ_SYMBOL
                            };
                        }
                    }
                    AC_STATE_EMIT =>
                    {
                        block[z] = self.ac_next << succ_low;
                        self.ac_state = AC_STATE_READ_SYMBOL;
                    }
                    // zeroes stay zero inside an end-of-band run
                    _ =>
                    {}
                }
            }

            k += 1;
        }

        if self.ac_state == AC_STATE_EOB_RUN
        {
            self.eob_run -= 1;

            if self.eob_run == 0
            {
                self.ac_state = AC_STATE_READ_SYMBOL;
            }
        }

        Ok(())
    }
}
