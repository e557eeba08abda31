//! This module exports a single struct to store information about
//! JPEG image components
//!
//! The data is extracted from a SOF header.

use crate::errors::DecodeErrors;

/// Component data from the start of frame, plus the buffers the scans and
/// the final assembly write into.
#[derive(Clone)]
pub(crate) struct Components
{
    /// Component identifier byte from the SOF header, unique per frame
    pub id:                        u8,
    /// Sub-sampling factor of this component in the x-plane
    pub horizontal_sample:         usize,
    /// Sub-sampling factor of this component in the y-plane
    pub vertical_sample:           usize,
    /// Quantization table selector
    pub quantization_table_number: u8,
    /// The dequantization table bound to this component, in row-major
    /// order
    pub quantization_table:        [i32; 64],
    /// DC prediction for the component, scoped to the running scan
    pub dc_pred:                   i32,

    /// Horizontal replication factor towards the full frame grid
    /// (`h_max / h`)
    pub x_scale: usize,
    /// Vertical replication factor towards the full frame grid
    /// (`v_max / v`)
    pub y_scale: usize,

    /// Effective pixel width, `ceil(frame_width * h / h_max)`
    pub width:  usize,
    /// Effective pixel height, `ceil(frame_height * v / v_max)`
    pub height: usize,

    /// Block columns covered by non-interleaved scans, `ceil(width / 8)`
    pub blocks_w: usize,
    /// Block rows covered by non-interleaved scans, `ceil(height / 8)`
    pub blocks_h: usize,
    /// Storage stride in blocks, padded up to the interleaved MCU grid
    pub padded_blocks_w: usize,
    /// Block rows allocated, padded up to the interleaved MCU grid
    pub padded_blocks_h: usize,

    /// Coefficient storage, 64 entries per block over the padded grid.
    /// Holds DCT coefficients during scan decoding, spatial samples after
    /// the IDCT pass
    pub blocks: Vec<i16>,
    /// Final sample plane, `width_stride()` samples per row
    pub data:   Vec<u8>,
}

impl Components
{
    /// Create a new instance from the three bytes a SOF header carries per
    /// component.
    pub fn from(a: [u8; 3]) -> Result<Components, DecodeErrors>
    {
        let id = a[0];

        if id == 0
        {
            return Err(DecodeErrors::SyntaxStatic(
                "Component identifier zero in the frame header",
            ));
        }

        let horizontal_sample = usize::from(a[1] >> 4);
        let vertical_sample = usize::from(a[1] & 0x0f);
        let quantization_table_number = a[2];

        if quantization_table_number > 3
        {
            return Err(DecodeErrors::Syntax(format!(
                "Too large quantization table selector {quantization_table_number}, expected a value between 0 and 3"
            )));
        }

        if !(1..=4).contains(&horizontal_sample) || !(1..=4).contains(&vertical_sample)
        {
            return Err(DecodeErrors::Syntax(format!(
                "Sampling factors ({horizontal_sample}, {vertical_sample}) out of the 1..=4 range, cannot decode"
            )));
        }

        info!(
            "Component ID:{} HS:{} VS:{} QT:{}",
            id, horizontal_sample, vertical_sample, quantization_table_number
        );

        Ok(Components {
            id,
            horizontal_sample,
            vertical_sample,
            quantization_table_number,
            quantization_table: [0; 64],
            dc_pred: 0,
            x_scale: 1,
            y_scale: 1,
            width: 0,
            height: 0,
            blocks_w: 0,
            blocks_h: 0,
            padded_blocks_w: 0,
            padded_blocks_h: 0,
            blocks: vec![],
            data: vec![],
        })
    }

    /// Compute sizes and allocate the coefficient and sample buffers.
    ///
    /// Runs once after the SOF header (and a DNL override, when present)
    /// fixed the frame geometry. Storage is padded to the interleaved MCU
    /// grid so interleaved scans can address `mcu_x * h` block columns
    /// without bounds juggling at the right and bottom edges.
    pub fn prepare(
        &mut self, frame_width: usize, frame_height: usize, h_max: usize, v_max: usize,
        mcu_x: usize, mcu_y: usize,
    )
    {
        self.x_scale = h_max / self.horizontal_sample;
        self.y_scale = v_max / self.vertical_sample;

        self.width = (frame_width * self.horizontal_sample + h_max - 1) / h_max;
        self.height = (frame_height * self.vertical_sample + v_max - 1) / v_max;

        self.blocks_w = (self.width + 7) / 8;
        self.blocks_h = (self.height + 7) / 8;

        self.padded_blocks_w = mcu_x * self.horizontal_sample;
        self.padded_blocks_h = mcu_y * self.vertical_sample;

        let blocks = self.padded_blocks_w * self.padded_blocks_h;

        self.blocks = vec![0; blocks * 64];
        self.data = vec![0; blocks * 64];
    }

    /// Samples per row of the sample plane.
    pub fn width_stride(&self) -> usize
    {
        self.padded_blocks_w * 8
    }
}

#[cfg(test)]
mod tests
{
    use super::Components;

    #[test]
    fn sampling_factors_validated()
    {
        assert!(Components::from([1, 0x11, 0]).is_ok());
        assert!(Components::from([1, 0x33, 1]).is_ok());
        assert!(Components::from([1, 0x01, 0]).is_err());
        assert!(Components::from([1, 0x50, 0]).is_err());
        assert!(Components::from([1, 0x11, 4]).is_err());
        assert!(Components::from([0, 0x11, 0]).is_err());
    }

    #[test]
    fn effective_sizes_round_up()
    {
        let mut comp = Components::from([2, 0x11, 0]).unwrap();

        // chroma of a 2x2-sampled 129x65 frame
        comp.prepare(129, 65, 2, 2, 9, 5);

        assert_eq!((comp.width, comp.height), (65, 33));
        assert_eq!((comp.blocks_w, comp.blocks_h), (9, 5));
        assert_eq!((comp.x_scale, comp.y_scale), (2, 2));
        assert_eq!(comp.width_stride(), 72);
    }
}
