//! Direct convolution under per-axis edge policies.
//!
//! Computes the potential U for every cell: the sum of kernel weights
//! against neighboring field values, with out-of-grid samples resolved by
//! the configured [`EdgeMode`] independently for X and Y. The row loop is
//! data-parallel; each output row is written by exactly one worker.

use rayon::prelude::*;

use crate::schema::EdgeMode;

use super::Kernel;

/// Resolve a possibly out-of-range coordinate against one axis.
#[inline]
pub fn sample_coord(coord: i32, size: usize, mode: EdgeMode) -> usize {
    let s = size as i32;
    match mode {
        EdgeMode::Periodic => coord.rem_euclid(s) as usize,
        EdgeMode::Clamp => coord.clamp(0, s - 1) as usize,
        EdgeMode::Mirror => {
            // Reflect over a period of 2*size.
            let m = coord.rem_euclid(2 * s);
            if m < s { m as usize } else { (2 * s - 1 - m) as usize }
        }
    }
}

/// Convolve `input` with `kernel` into `output`.
pub fn convolve_into(
    input: &[f32],
    kernel: &Kernel,
    width: usize,
    height: usize,
    edge_x: EdgeMode,
    edge_y: EdgeMode,
    output: &mut [f32],
) {
    let k_size = kernel.size;
    let k_half = kernel.half();
    let k_data = &kernel.data;

    output
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, out_row)| {
            // Row sample indices are shared by every cell in the row.
            let src_rows: Vec<usize> = (0..k_size)
                .map(|ky| sample_coord(y as i32 + ky as i32 - k_half, height, edge_y))
                .collect();

            for (x, out) in out_row.iter_mut().enumerate() {
                let mut sum = 0.0f32;

                for (ky, &sy) in src_rows.iter().enumerate() {
                    let k_row = &k_data[ky * k_size..(ky + 1) * k_size];
                    let input_row = &input[sy * width..(sy + 1) * width];

                    for (kx, &k_val) in k_row.iter().enumerate() {
                        if k_val == 0.0 {
                            continue;
                        }
                        let sx = sample_coord(x as i32 + kx as i32 - k_half, width, edge_x);
                        sum += input_row[sx] * k_val;
                    }
                }

                *out = sum;
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{KernelConfig, KernelShape};

    fn gol_kernel() -> Kernel {
        Kernel::from_config(&KernelConfig {
            shape: KernelShape::GameOfLife,
            ..Default::default()
        })
    }

    #[test]
    fn test_sample_coord_periodic() {
        assert_eq!(sample_coord(-1, 8, EdgeMode::Periodic), 7);
        assert_eq!(sample_coord(8, 8, EdgeMode::Periodic), 0);
        assert_eq!(sample_coord(-9, 8, EdgeMode::Periodic), 7);
    }

    #[test]
    fn test_sample_coord_clamp() {
        assert_eq!(sample_coord(-3, 8, EdgeMode::Clamp), 0);
        assert_eq!(sample_coord(11, 8, EdgeMode::Clamp), 7);
        assert_eq!(sample_coord(4, 8, EdgeMode::Clamp), 4);
    }

    #[test]
    fn test_sample_coord_mirror() {
        assert_eq!(sample_coord(-1, 8, EdgeMode::Mirror), 0);
        assert_eq!(sample_coord(-2, 8, EdgeMode::Mirror), 1);
        assert_eq!(sample_coord(8, 8, EdgeMode::Mirror), 7);
        assert_eq!(sample_coord(9, 8, EdgeMode::Mirror), 6);
    }

    #[test]
    fn test_neighbor_count_periodic() {
        // Single alive cell: its eight neighbors each see a count of 1,
        // the cell itself sees 0.
        let width = 8;
        let height = 8;
        let mut input = vec![0.0f32; width * height];
        input[3 * width + 3] = 1.0;

        let mut output = vec![0.0f32; width * height];
        convolve_into(
            &input,
            &gol_kernel(),
            width,
            height,
            EdgeMode::Periodic,
            EdgeMode::Periodic,
            &mut output,
        );

        assert_eq!(output[3 * width + 3], 0.0);
        assert_eq!(output[2 * width + 2], 1.0);
        assert_eq!(output[4 * width + 4], 1.0);
        assert_eq!(output[3 * width + 2], 1.0);
        let total: f32 = output.iter().sum();
        assert_eq!(total, 8.0);
    }

    #[test]
    fn test_corner_wraps_under_periodic() {
        let width = 6;
        let height = 6;
        let mut input = vec![0.0f32; width * height];
        input[0] = 1.0;

        let mut output = vec![0.0f32; width * height];
        convolve_into(
            &input,
            &gol_kernel(),
            width,
            height,
            EdgeMode::Periodic,
            EdgeMode::Periodic,
            &mut output,
        );

        // The far corner is a diagonal neighbor on the torus.
        assert_eq!(output[(height - 1) * width + (width - 1)], 1.0);
    }

    #[test]
    fn test_clamp_edges_do_not_wrap() {
        let width = 6;
        let height = 6;
        let mut input = vec![0.0f32; width * height];
        input[0] = 1.0;

        let mut output = vec![0.0f32; width * height];
        convolve_into(
            &input,
            &gol_kernel(),
            width,
            height,
            EdgeMode::Clamp,
            EdgeMode::Clamp,
            &mut output,
        );

        assert_eq!(output[(height - 1) * width + (width - 1)], 0.0);
        // Clamped taps fold back onto the corner: (0,0) counts itself
        // three times through the out-of-range offsets.
        assert_eq!(output[0], 3.0);
    }

    #[test]
    fn test_uniform_input_normalized_kernel() {
        let width = 16;
        let height = 16;
        let input = vec![0.4f32; width * height];

        let kernel = Kernel::from_config(&KernelConfig {
            radius: 4,
            ..Default::default()
        });

        let mut output = vec![0.0f32; width * height];
        convolve_into(
            &input,
            &kernel,
            width,
            height,
            EdgeMode::Periodic,
            EdgeMode::Periodic,
            &mut output,
        );

        // A normalized kernel reproduces a uniform field exactly.
        for &v in &output {
            assert!((v - 0.4).abs() < 1e-5, "got {}", v);
        }
    }

    #[test]
    fn test_mixed_edge_modes_differ() {
        let width = 8;
        let height = 8;
        let mut input = vec![0.0f32; width * height];
        input[0] = 1.0;

        let kernel = Kernel::from_config(&KernelConfig {
            radius: 2,
            ..Default::default()
        });

        let mut wrapped = vec![0.0f32; width * height];
        convolve_into(
            &input,
            &kernel,
            width,
            height,
            EdgeMode::Periodic,
            EdgeMode::Clamp,
            &mut wrapped,
        );

        let mut clamped = vec![0.0f32; width * height];
        convolve_into(
            &input,
            &kernel,
            width,
            height,
            EdgeMode::Clamp,
            EdgeMode::Clamp,
            &mut clamped,
        );

        assert_ne!(wrapped, clamped);
    }
}
