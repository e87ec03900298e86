//! Floyd-Steinberg dithering to RGB565.
//!
//! The panel's 5/6/5-bit color depth shows visible banding in smooth
//! gradients (skies, neon glows) without error diffusion. This
//! implementation keeps only two rows of error accumulation in memory at a
//! time, which keeps the working set small on a constrained board.

use image::RgbImage;

/// Quantize an 8-bit channel to `bits` bits.
///
/// Returns the quantized value and the diffusion error against the 8-bit
/// reconstruction (bit replication, the same expansion the panel's gamma
/// assumes).
#[inline]
fn quantize(v: i16, bits: u32) -> (u16, i16) {
    let v = v.clamp(0, 255);
    let max_level = (1i32 << bits) - 1;
    let q = ((v as i32 * max_level + 127) / 255) as u16;
    let recon = match bits {
        5 => (q << 3) | (q >> 2),
        6 => (q << 2) | (q >> 4),
        _ => unreachable!("RGB565 channels are 5 or 6 bits"),
    };
    (q, v - recon as i16)
}

/// Apply Floyd-Steinberg dithering to an RGB image
///
/// Returns row-major RGB565 pixels, one `u16` per pixel.
pub fn dither_to_rgb565(img: &RgbImage) -> Vec<u16> {
    let (width, height) = img.dimensions();
    let width_usize = width as usize;
    let height_usize = height as usize;

    tracing::debug!("Dithering {}x{} to RGB565", width, height);

    // Only need 2 rows of accumulated error at a time: current and next.
    // Error range stays within i16 (-255 to +255 per channel).
    let mut curr_row: Vec<(i16, i16, i16)> = vec![(0, 0, 0); width_usize];
    let mut next_row: Vec<(i16, i16, i16)> = vec![(0, 0, 0); width_usize];

    let mut result = vec![0u16; width_usize * height_usize];

    for y in 0..height_usize {
        // Load current row pixels and add accumulated error from the row above
        for x in 0..width_usize {
            let p = img.get_pixel(x as u32, y as u32);
            curr_row[x].0 += p[0] as i16;
            curr_row[x].1 += p[1] as i16;
            curr_row[x].2 += p[2] as i16;
        }

        for x in 0..width_usize {
            let (r, g, b) = curr_row[x];

            let (r5, err_r) = quantize(r, 5);
            let (g6, err_g) = quantize(g, 6);
            let (b5, err_b) = quantize(b, 5);

            // Distribute error to neighboring pixels (Floyd-Steinberg pattern)
            // Right: 7/16
            if x + 1 < width_usize {
                curr_row[x + 1].0 += err_r * 7 / 16;
                curr_row[x + 1].1 += err_g * 7 / 16;
                curr_row[x + 1].2 += err_b * 7 / 16;
            }

            if y + 1 < height_usize {
                // Bottom-left: 3/16
                if x > 0 {
                    next_row[x - 1].0 += err_r * 3 / 16;
                    next_row[x - 1].1 += err_g * 3 / 16;
                    next_row[x - 1].2 += err_b * 3 / 16;
                }

                // Bottom: 5/16
                next_row[x].0 += err_r * 5 / 16;
                next_row[x].1 += err_g * 5 / 16;
                next_row[x].2 += err_b * 5 / 16;

                // Bottom-right: 1/16
                if x + 1 < width_usize {
                    next_row[x + 1].0 += err_r / 16;
                    next_row[x + 1].1 += err_g / 16;
                    next_row[x + 1].2 += err_b / 16;
                }
            }

            result[y * width_usize + x] = (r5 << 11) | (g6 << 5) | b5;
        }

        // Swap rows: next becomes current, then clear the new next row
        std::mem::swap(&mut curr_row, &mut next_row);
        next_row.iter_mut().for_each(|p| *p = (0, 0, 0));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn solid_extremes_map_exactly() {
        let black = RgbImage::from_pixel(8, 8, Rgb([0, 0, 0]));
        assert!(dither_to_rgb565(&black).iter().all(|&px| px == 0x0000));

        let white = RgbImage::from_pixel(8, 8, Rgb([255, 255, 255]));
        assert!(dither_to_rgb565(&white).iter().all(|&px| px == 0xFFFF));
    }

    #[test]
    fn primaries_map_to_their_channel() {
        let red = RgbImage::from_pixel(4, 4, Rgb([255, 0, 0]));
        assert!(dither_to_rgb565(&red).iter().all(|&px| px == 0xF800));

        let green = RgbImage::from_pixel(4, 4, Rgb([0, 255, 0]));
        assert!(dither_to_rgb565(&green).iter().all(|&px| px == 0x07E0));

        let blue = RgbImage::from_pixel(4, 4, Rgb([0, 0, 255]));
        assert!(dither_to_rgb565(&blue).iter().all(|&px| px == 0x001F));
    }

    #[test]
    fn output_matches_pixel_count() {
        let img = RgbImage::from_pixel(13, 7, Rgb([120, 90, 60]));
        assert_eq!(dither_to_rgb565(&img).len(), 13 * 7);
    }

    #[test]
    fn midtone_dithers_around_target() {
        // A mid-gray should quantize to nearby gray levels, not saturate
        let img = RgbImage::from_pixel(16, 16, Rgb([128, 128, 128]));
        for px in dither_to_rgb565(&img) {
            let r5 = (px >> 11) & 0x1F;
            assert!((14..=18).contains(&r5), "red level {} too far from mid", r5);
        }
    }
}
