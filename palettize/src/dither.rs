use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::{
    kernel::Kernel,
    palette::{Color, Palette},
    quantize::Quantizer,
};

/// Stores a diffused channel value the way 8-bit clamped pixel storage does: clamped into
/// `[0, 255]` and rounded half to even.
fn store(value: f64) -> u8 {
    value.clamp(0.0, 255.0).round_ties_even() as u8
}

/// Adds `error * weight` of every in-bounds tap to the working buffer. Taps that fall outside of
/// the image are dropped along with their share of the error.
fn spread_error(
    working: &mut RgbaImage,
    (x, y): (u32, u32),
    error: [f64; 3],
    taps: &[(i32, i32, f64)],
) {
    let (width, height) = working.dimensions();
    for &(dx, dy, weight) in taps {
        let (tx, ty) = (i64::from(x) + i64::from(dx), i64::from(y) + i64::from(dy));
        if tx < 0 || ty < 0 || tx >= i64::from(width) || ty >= i64::from(height) {
            continue;
        }
        let Rgba(channels) = working.get_pixel_mut(tx as u32, ty as u32);
        // Alpha is left alone, the zip stops after blue.
        for (channel, error) in channels.iter_mut().zip(error) {
            *channel = store(f64::from(*channel) + error * weight);
        }
    }
}

fn diffuse(working: &mut RgbaImage, palette: &Palette, kernel: Kernel) -> RgbaImage {
    let (width, height) = working.dimensions();
    let taps: Vec<_> = kernel.weighted_taps().collect();
    let mut quantizer = Quantizer::new(palette);
    let mut output = RgbaImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let Rgba([r, g, b, _]) = *working.get_pixel(x, y);
            let chosen = quantizer.closest(Color::new(r, g, b));
            output.put_pixel(x, y, Rgba(chosen.to_rgba()));

            let error = [
                f64::from(r) - f64::from(chosen.r),
                f64::from(g) - f64::from(chosen.g),
                f64::from(b) - f64::from(chosen.b),
            ];
            spread_error(working, (x, y), error, &taps);
        }
    }

    output
}

/// Without diffusion every pixel is independent, so rows are quantized in parallel.
fn quantize_only(source: &RgbaImage, palette: &Palette) -> RgbaImage {
    let (width, height) = source.dimensions();
    let mut output = RgbaImage::new(width, height);
    let row_len = width as usize * 4;
    if row_len == 0 {
        return output;
    }

    let src: &[u8] = source;
    let dst: &mut [u8] = &mut output;
    dst.par_chunks_mut(row_len)
        .zip(src.par_chunks(row_len))
        .for_each_init(
            || Quantizer::new(palette),
            |quantizer, (dst_row, src_row)| {
                for (dst, src) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
                    let chosen = quantizer.closest(Color::new(src[0], src[1], src[2]));
                    dst.copy_from_slice(&chosen.to_rgba());
                }
            },
        );

    output
}

/// Quantizes `working` to `palette`, diffusing the quantization error with `kernel` if one is
/// given.
///
/// The image is scanned row by row, left to right. Each pixel is read from `working` after all
/// error from previously visited pixels has been added to it, so `working` is modified in place
/// and must not be shared with anything else. The returned image is always fully opaque.
pub fn dither(working: &mut RgbaImage, palette: &Palette, kernel: Option<Kernel>) -> RgbaImage {
    match kernel {
        Some(kernel) => diffuse(working, palette, kernel),
        None => quantize_only(working, palette),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantize::closest;

    fn black_and_white() -> Palette {
        Palette::new(
            "bw",
            vec![Color::new(0, 0, 0), Color::new(255, 255, 255)],
        )
        .unwrap()
    }

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(rgba))
    }

    fn added_error(working: &RgbaImage, base: u8) -> [i64; 3] {
        let mut sum = [0; 3];
        for Rgba(p) in working.pixels() {
            for c in 0..3 {
                sum[c] += i64::from(p[c]) - i64::from(base);
            }
        }
        sum
    }

    #[test]
    fn store_clamps_and_rounds_half_to_even() {
        assert_eq!(store(265.0), 255);
        assert_eq!(store(-3.0), 0);
        assert_eq!(store(2.5), 2);
        assert_eq!(store(3.5), 4);
        assert_eq!(store(254.375), 254);
    }

    #[test]
    fn solid_red_becomes_solid_black() {
        let mut working = solid(4, 4, [255, 0, 0, 255]);
        let output = dither(&mut working, &black_and_white(), None);
        assert_eq!(output.dimensions(), (4, 4));
        assert!(output.pixels().all(|p| p.0 == [0, 0, 0, 255]));
    }

    #[test]
    fn without_kernel_each_pixel_is_its_closest_color() {
        let palette = Palette::from_flat_rgb(
            "four",
            &[20, 20, 20, 200, 40, 40, 40, 200, 40, 230, 230, 230],
        )
        .unwrap();
        let source = RgbaImage::from_fn(9, 7, |x, y| {
            Rgba([(x * 28) as u8, (y * 36) as u8, ((x + y) * 15) as u8, 255])
        });
        let mut working = source.clone();
        let output = dither(&mut working, &palette, None);

        assert_eq!(working, source);
        for (x, y, Rgba([r, g, b, a])) in output.enumerate_pixels().map(|(x, y, p)| (x, y, *p)) {
            let Rgba([sr, sg, sb, _]) = *source.get_pixel(x, y);
            assert_eq!(
                closest(&palette, Color::new(sr, sg, sb)),
                Color::new(r, g, b)
            );
            assert_eq!(a, 255);
        }
    }

    #[test]
    fn output_is_opaque_even_for_transparent_input() {
        let mut working = solid(3, 2, [250, 250, 250, 0]);
        let output = dither(&mut working, &black_and_white(), Some(Kernel::Atkinson));
        assert!(output.pixels().all(|p| p.0[3] == 255));
    }

    #[test]
    fn floyd_steinberg_carries_error_to_the_right() {
        let mut working = RgbaImage::from_raw(2, 1, vec![10, 10, 10, 255, 250, 250, 250, 255])
            .unwrap();
        let output = dither(
            &mut working,
            &black_and_white(),
            Some(Kernel::FloydSteinberg),
        );

        // 250 + 10 * 7/16 = 254.375
        assert_eq!(working.get_pixel(1, 0).0, [254, 254, 254, 255]);
        assert_eq!(output.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(output.get_pixel(1, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn interior_pixels_pass_on_the_whole_kernel_weight() {
        let taps: Vec<_> = Kernel::FloydSteinberg.weighted_taps().collect();
        let mut working = solid(7, 7, [100, 100, 100, 255]);
        spread_error(&mut working, (3, 3), [32.0, -32.0, 16.0], &taps);
        assert_eq!(added_error(&working, 100), [32, -32, 16]);
        assert_eq!(working.get_pixel(4, 3).0, [114, 86, 107, 255]);

        let taps: Vec<_> = Kernel::Atkinson.weighted_taps().collect();
        let mut working = solid(7, 7, [100, 100, 100, 255]);
        spread_error(&mut working, (3, 3), [40.0, 40.0, -40.0], &taps);
        assert_eq!(added_error(&working, 100), [30, 30, -30]);
    }

    #[test]
    fn error_falling_off_the_edge_is_dropped() {
        let taps: Vec<_> = Kernel::FloydSteinberg.weighted_taps().collect();

        // Right edge: only the bottom-left and bottom taps land.
        let mut working = solid(7, 7, [100, 100, 100, 255]);
        spread_error(&mut working, (6, 3), [32.0, 32.0, 32.0], &taps);
        assert_eq!(added_error(&working, 100), [16, 16, 16]);

        // Bottom-right corner: nothing lands.
        let mut working = solid(7, 7, [100, 100, 100, 255]);
        spread_error(&mut working, (6, 6), [32.0, 32.0, 32.0], &taps);
        assert_eq!(added_error(&working, 100), [0, 0, 0]);
    }

    #[test]
    fn error_never_reaches_visited_pixels() {
        for kernel in Kernel::ALL {
            let taps: Vec<_> = kernel.weighted_taps().collect();
            let mut working = solid(9, 9, [100, 100, 100, 255]);
            spread_error(&mut working, (4, 4), [64.0, 64.0, 64.0], &taps);
            for (x, y, p) in working.enumerate_pixels() {
                if y < 4 || (y == 4 && x <= 4) {
                    assert_eq!(p.0, [100, 100, 100, 255], "{kernel} touched ({x}, {y})");
                }
            }
        }
    }

    #[test]
    fn accumulation_is_clamped_after_every_tap() {
        let taps = [(1, 0, 1.0)];
        let mut working = RgbaImage::from_raw(2, 1, vec![0, 0, 0, 255, 250, 250, 250, 255])
            .unwrap();
        spread_error(&mut working, (0, 0), [20.0, 20.0, 20.0], &taps);
        spread_error(&mut working, (0, 0), [-20.0, -20.0, -20.0], &taps);
        assert_eq!(working.get_pixel(1, 0).0, [235, 235, 235, 255]);
    }

    #[test]
    fn mid_gray_dithers_into_a_mix() {
        for kernel in Kernel::ALL {
            let mut working = solid(16, 16, [128, 128, 128, 255]);
            let output = dither(&mut working, &black_and_white(), Some(kernel));
            let white = output.pixels().filter(|p| p.0[0] == 255).count();
            assert!(
                (64..=192).contains(&white),
                "{kernel} produced {white} white pixels out of 256"
            );
        }
    }
}
