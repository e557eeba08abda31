//! Post-scan finishing.
//!
//! Once every scan has been decoded the coefficient blocks are complete,
//! and each component can be finished independently: dequantize, inverse
//! transform, and scatter the spatial samples into the component's sample
//! plane. Components fan out over a scoped thread pool since nothing is
//! shared between them at this point.

use std::cmp::min;

use crate::components::Components;
use crate::idct::idct_int;
use crate::mcu::DCT_BLOCK;

/// Dequantize, inverse-transform and assemble every component.
pub(crate) fn finish_components(components: &mut [Components])
{
    let threads = min(components.len(), num_cpus::get());

    if threads <= 1
    {
        for comp in components.iter_mut()
        {
            finish_component(comp);
        }

        return;
    }

    let mut pool = scoped_threadpool::Pool::new(threads as u32);

    pool.scoped(|scope| {
        for comp in components.iter_mut()
        {
            scope.execute(move || finish_component(comp));
        }
    });

    debug!("Finished post-processing components");
}

/// Turn one component's coefficient blocks into its sample plane.
fn finish_component(comp: &mut Components)
{
    let stride = comp.width_stride();

    for block_row in 0..comp.padded_blocks_h
    {
        for block_col in 0..comp.padded_blocks_w
        {
            let start = DCT_BLOCK * (block_row * comp.padded_blocks_w + block_col);

            let block = &mut comp.blocks[start..start + DCT_BLOCK];

            let mut coeffs = [0_i32; DCT_BLOCK];

            for (coeff, (value, qt)) in coeffs
                .iter_mut()
                .zip(block.iter().zip(comp.quantization_table.iter()))
            {
                // headroom-clamp keeps the transform inside 32 bits even
                // for coefficients a valid stream would never produce
                *coeff = (i32::from(*value) * qt).clamp(-(1 << 15), (1 << 15) - 1);
            }

            let samples = idct_int(&mut coeffs);

            // the block now holds spatial samples
            block.copy_from_slice(&samples);

            let base = block_row * 8 * stride + block_col * 8;

            for (i, row) in samples.chunks_exact(8).enumerate()
            {
                let dst = &mut comp.data[base + i * stride..base + i * stride + 8];

                for (d, s) in dst.iter_mut().zip(row.iter())
                {
                    *d = *s as u8;
                }
            }
        }
    }
}
