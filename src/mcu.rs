//! Implements routines to decode the entropy-coded scans.
//!
//! The block decoder is fixed once per scan (baseline, or one of the four
//! progressive passes) and the MCU traversal below drives it across the
//! image, handling restart-interval resynchronization between MCUs.

use std::io::Cursor;

use crate::bitstream::{huff_extend, BitStream};
use crate::decoder::Decoder;
use crate::errors::DecodeErrors;
use crate::huffman::HuffmanTable;
use crate::misc::UN_ZIGZAG;
use crate::scan::Scan;

/// The size of a DCT block.
pub const DCT_BLOCK: usize = 64;

/// Which block decoder a scan uses. Selected once per scan, never
/// re-examined in the MCU loop.
#[derive(Copy, Clone)]
enum BlockDecoder
{
    Baseline,
    DcFirst,
    DcRefine,
    AcFirst,
    AcRefine,
}

impl BlockDecoder
{
    fn select(progressive: bool, scan: &Scan) -> BlockDecoder
    {
        if !progressive
        {
            return BlockDecoder::Baseline;
        }

        match (scan.is_dc(), scan.is_refine())
        {
            (true, false) => BlockDecoder::DcFirst,
            (true, true) => BlockDecoder::DcRefine,
            (false, false) => BlockDecoder::AcFirst,
            (false, true) => BlockDecoder::AcRefine,
        }
    }
}

impl BitStream
{
    /// Decode one fully-coded 8x8 block, the baseline (and extended
    /// sequential) case.
    ///
    /// The DC difference folds into `dc_prediction`, AC coefficients are
    /// run-length decoded and scattered through the zig-zag permutation.
    pub(crate) fn decode_block_baseline(
        &mut self, reader: &mut Cursor<Vec<u8>>, dc_table: &HuffmanTable, ac_table: &HuffmanTable,
        block: &mut [i16; 64], dc_prediction: &mut i32,
    ) -> Result<(), DecodeErrors>
    {
        self.decode_dc(reader, dc_table, dc_prediction)?;

        block[0] = *dc_prediction as i16;

        let mut pos: usize = 1;

        while pos < DCT_BLOCK
        {
            let rs = self.decode_symbol(reader, ac_table)?;

            let r = rs >> 4;
            let s = rs & 15;

            if s == 0
            {
                if r < 15
                {
                    // end of block, the rest is zeroes
                    break;
                }

                // ZRL, sixteen zero coefficients
                pos += 16;
            }
            else
            {
                pos += usize::from(r);

                let bits = self.receive(reader, s)?;

                if pos >= DCT_BLOCK
                {
                    return Err(DecodeErrors::SyntaxStatic(
                        "AC coefficient run overflows the block",
                    ));
                }

                block[UN_ZIGZAG[pos]] = huff_extend(bits, s) as i16;

                pos += 1;
            }
        }

        Ok(())
    }
}

impl Decoder
{
    /// Decode one entropy-coded scan into the component coefficient
    /// buffers.
    ///
    /// The reader is positioned at the scan's recorded offset; MCUs run
    /// left to right, top to bottom. Single-component scans traverse that
    /// component's own block grid, interleaved scans traverse the frame
    /// MCU grid visiting each component's h x v sub-blocks in turn.
    pub(crate) fn decode_scan(
        &mut self, reader: &mut Cursor<Vec<u8>>, scan: &Scan,
    ) -> Result<(), DecodeErrors>
    {
        reader.set_position(scan.offset);

        let mut stream = BitStream::new();

        let decoder_kind = BlockDecoder::select(self.is_progressive, scan);

        // DC prediction is scoped to the scan
        for comp in &mut self.components
        {
            comp.dc_pred = 0;
        }

        let (mcus_x, mcus_y) = if scan.is_interleaved()
        {
            (self.mcu_x, self.mcu_y)
        }
        else
        {
            let comp = &self.components[scan.components[0].component];

            // AC scans and non-interleaved DC scans walk the component's
            // own block grid
            (comp.blocks_w, comp.blocks_h)
        };

        let restart_interval = self.restart_interval;
        let total_mcus = mcus_x * mcus_y;

        let mut mcu_counter: usize = 0;
        let mut rst_index: u8 = 0;

        let components = &mut self.components;
        let tables = &self.huffman_tables;

        let ss = scan.spec_start;
        let se = scan.spec_end;
        let al = scan.succ_low;

        for mcu_row in 0..mcus_y
        {
            for mcu_col in 0..mcus_x
            {
                for scan_comp in &scan.components
                {
                    let comp = &mut components[scan_comp.component];

                    let dc_table = scan_comp.dc_table.map(|i| &tables[i]);
                    let ac_table = scan_comp.ac_table.map(|i| &tables[i]);

                    let (sub_blocks_v, sub_blocks_h) = if scan.is_interleaved()
                    {
                        (comp.vertical_sample, comp.horizontal_sample)
                    }
                    else
                    {
                        (1, 1)
                    };

                    for i in 0..sub_blocks_v
                    {
                        for j in 0..sub_blocks_h
                        {
                            let (block_row, block_col) = if scan.is_interleaved()
                            {
                                (
                                    mcu_row * comp.vertical_sample + i,
                                    mcu_col * comp.horizontal_sample + j,
                                )
                            }
                            else
                            {
                                (mcu_row, mcu_col)
                            };

                            let start = DCT_BLOCK * (block_row * comp.padded_blocks_w + block_col);

                            let block: &mut [i16; 64] = comp
                                .blocks
                                .get_mut(start..start + DCT_BLOCK)
                                .unwrap()
                                .try_into()
                                .unwrap();

                            match decoder_kind
                            {
                                BlockDecoder::Baseline =>
                                {
                                    stream.decode_block_baseline(
                                        reader,
                                        dc_table.expect("validated at SOS"),
                                        ac_table.expect("validated at SOS"),
                                        block,
                                        &mut comp.dc_pred,
                                    )?;
                                }
                                BlockDecoder::DcFirst =>
                                {
                                    stream.decode_prog_dc_first(
                                        reader,
                                        dc_table.expect("validated at SOS"),
                                        block,
                                        &mut comp.dc_pred,
                                        al,
                                    )?;
                                }
                                BlockDecoder::DcRefine =>
                                {
                                    stream.decode_prog_dc_refine(reader, block, al)?;
                                }
                                BlockDecoder::AcFirst =>
                                {
                                    stream.decode_prog_ac_first(
                                        reader,
                                        ac_table.expect("validated at SOS"),
                                        block,
                                        ss,
                                        se,
                                        al,
                                    )?;
                                }
                                BlockDecoder::AcRefine =>
                                {
                                    stream.decode_prog_ac_refine(
                                        reader,
                                        ac_table.expect("validated at SOS"),
                                        block,
                                        ss,
                                        se,
                                        al,
                                    )?;
                                }
                            }
                        }
                    }
                }

                mcu_counter += 1;

                if restart_interval > 0
                    && mcu_counter % restart_interval == 0
                    && mcu_counter != total_mcus
                {
                    stream.expect_restart(reader, rst_index)?;

                    rst_index = (rst_index + 1) & 7;

                    // restart boundaries reset every participating
                    // component's prediction
                    for scan_comp in &scan.components
                    {
                        components[scan_comp.component].dc_pred = 0;
                    }
                }
            }
        }

        Ok(())
    }
}
