use crate::config::RecognitionParams;
use image::imageops::{invert, replace, resize, FilterType};
use image::{GenericImageView, GrayImage, ImageBuffer, Luma};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::integral_image::{integral_image, sum_image_pixels};

type IntegralImage = ImageBuffer<Luma<u64>, Vec<u64>>;

/// Mark pixels that are darker than their neighbourhood.
///
/// A pixel becomes foreground (255) if it is at least `c` below the mean of the `(2 * block_radius + 1)` square
/// around it. The window is clipped at the image border.
pub fn adaptive_threshold_inv(gray: &GrayImage, block_radius: u32, c: i32) -> GrayImage {
    let integral: IntegralImage = integral_image::<_, u64>(gray);
    let (w, h) = gray.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        let (left, top) = (x.saturating_sub(block_radius), y.saturating_sub(block_radius));
        let (right, bottom) = ((x + block_radius).min(w - 1), (y + block_radius).min(h - 1));
        let sum = sum_image_pixels(&integral, left, top, right, bottom);
        let count = (right - left + 1) as f64 * (bottom - top + 1) as f64;
        let mean = sum[0] as f64 / count;
        if gray.get_pixel(x, y)[0] as f64 <= mean - c as f64 {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Pixels brighter than `level` become 255, all others 0.
pub fn binarize(gray: &GrayImage, level: u8) -> GrayImage {
    threshold(gray, level, ThresholdType::Binary)
}

/// Binarize with a global threshold from Otsu's method.
pub fn otsu_binarize(gray: &GrayImage) -> GrayImage {
    binarize(gray, otsu_level(gray))
}

pub fn inverted(gray: &GrayImage) -> GrayImage {
    let mut out = gray.clone();
    invert(&mut out);
    out
}

pub fn mean_intensity(gray: &GrayImage) -> f64 {
    let count = gray.width() as u64 * gray.height() as u64;
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = gray.pixels().map(|p| p[0] as u64).sum();
    sum as f64 / count as f64
}

/// Make sure a binary glyph is dark on a light background: if most pixels are dark, invert.
pub fn dark_on_light(binary: GrayImage) -> GrayImage {
    if mean_intensity(&binary) < 128.0 {
        inverted(&binary)
    } else {
        binary
    }
}

/// Contrast limited adaptive histogram equalization.
///
/// The image is divided in `tiles` x `tiles` regions. Each region gets its own equalization lookup table, with the
/// histogram clipped at `clip_limit` times the uniform bin height. Pixels are mapped by bilinear interpolation
/// between the tables of the four nearest region centres.
pub fn clahe(gray: &GrayImage, clip_limit: f32, tiles: u32) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 || tiles == 0 {
        return gray.clone();
    }
    let (tiles_x, tiles_y) = (tiles.min(w), tiles.min(h));
    let (tile_w, tile_h) = ((w + tiles_x - 1) / tiles_x, (h + tiles_y - 1) / tiles_y);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let (x0, y0) = (tx * tile_w, ty * tile_h);
            let (x1, y1) = (((tx + 1) * tile_w).min(w), ((ty + 1) * tile_h).min(h));
            luts.push(tile_lut(gray, (x0, y0, x1, y1), clip_limit));
        }
    }

    GrayImage::from_fn(w, h, |x, y| {
        let v = gray.get_pixel(x, y)[0] as usize;
        let (tx0, tx1, ax) = neighbours(x, tile_w, tiles_x);
        let (ty0, ty1, ay) = neighbours(y, tile_h, tiles_y);
        let lut = |tx: u32, ty: u32| luts[(ty * tiles_x + tx) as usize][v] as f32;
        let top = lut(tx0, ty0) * (1.0 - ax) + lut(tx1, ty0) * ax;
        let bottom = lut(tx0, ty1) * (1.0 - ax) + lut(tx1, ty1) * ax;
        Luma([(top * (1.0 - ay) + bottom * ay).round().clamp(0.0, 255.0) as u8])
    })
}

/// The two tiles whose centres surround `pos`, and the weight of the second one.
fn neighbours(pos: u32, tile: u32, ntiles: u32) -> (u32, u32, f32) {
    let f = (pos as f32 + 0.5) / tile as f32 - 0.5;
    let t0 = (f.floor().max(0.0) as u32).min(ntiles - 1);
    let t1 = (t0 + 1).min(ntiles - 1);
    let a = if t1 == t0 { 0.0 } else { (f - t0 as f32).clamp(0.0, 1.0) };
    (t0, t1, a)
}

fn tile_lut(gray: &GrayImage, (x0, y0, x1, y1): (u32, u32, u32, u32), clip_limit: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    if x0 >= x1 || y0 >= y1 {
        for (i, v) in lut.iter_mut().enumerate() {
            *v = i as u8;
        }
        return lut;
    }
    let mut hist = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[gray.get_pixel(x, y)[0] as usize] += 1;
        }
    }
    let area = (x1 - x0) * (y1 - y0);
    let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
    let mut excess = 0;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let (bonus, residual) = (excess / 256, excess % 256);
    let mut cdf = 0u32;
    let scale = 255.0 / area as f32;
    for (i, bin) in hist.iter().enumerate() {
        cdf += bin + bonus + u32::from((i as u32) < residual);
        lut[i] = (cdf as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

/// Scale the ink of a dark-on-light binary glyph to fill a `size` square, keeping its aspect ratio.
///
/// The ink bounding box is centred on a white square with a margin of 1/8 of its longer side. Cells and templates
/// normalized this way line up no matter where the glyph sat in the cell or how large it was drawn. An image without
/// ink becomes a blank square.
pub fn normalize_glyph(binary: &GrayImage, size: u32) -> GrayImage {
    let bounds = binary
        .enumerate_pixels()
        .filter(|(_, _, p)| p[0] < 128)
        .fold(None, |bounds, (x, y, _)| match bounds {
            None => Some((x, y, x, y)),
            Some((x0, y0, x1, y1)) => Some((x.min(x0), y.min(y0), x.max(x1), y.max(y1))),
        });
    let (x0, y0, x1, y1) = match bounds {
        Some(bounds) => bounds,
        None => return GrayImage::from_pixel(size, size, Luma([255u8])),
    };
    let (w, h) = (x1 - x0 + 1, y1 - y0 + 1);
    let side = w.max(h);
    let margin = side / 8 + 1;
    let mut square = GrayImage::from_pixel(side + 2 * margin, side + 2 * margin, Luma([255u8]));
    let glyph = binary.view(x0, y0, w, h).to_image();
    replace(
        &mut square,
        &glyph,
        (margin + (side - w) / 2) as i64,
        (margin + (side - h) / 2) as i64,
    );
    binarize(&resize(&square, size, size, FilterType::Triangle), 127)
}

/// Normalize a cell image for template matching and structure checks.
///
/// Resize to `template_size` square, equalize local contrast, binarize with Otsu, make the glyph dark on light and
/// scale it to its ink box with [normalize_glyph].
pub fn preprocess_cell(cell: &GrayImage, params: &RecognitionParams) -> GrayImage {
    let size = params.template_size;
    if cell.width() == 0 || cell.height() == 0 {
        return GrayImage::from_pixel(size, size, Luma([255u8]));
    }
    let resized = resize(cell, size, size, FilterType::Triangle);
    let enhanced = clahe(&resized, params.clahe_clip_limit, params.clahe_tiles);
    normalize_glyph(&dark_on_light(otsu_binarize(&enhanced)), size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    #[test]
    fn test_adaptive_threshold() {
        let mut img = GrayImage::from_pixel(40, 40, Luma([220u8]));
        draw_filled_rect_mut(&mut img, Rect::at(0, 20).of_size(40, 2), Luma([30u8]));
        let bw = adaptive_threshold_inv(&img, 5, 2);
        assert_eq!(bw.get_pixel(10, 20)[0], 255);
        assert_eq!(bw.get_pixel(10, 21)[0], 255);
        assert_eq!(bw.get_pixel(10, 5)[0], 0);
        // flat image: nothing is darker than its surroundings
        let flat = GrayImage::from_pixel(20, 20, Luma([128u8]));
        assert!(adaptive_threshold_inv(&flat, 5, 2).pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_clahe_keeps_binary_glyph() {
        let mut img = GrayImage::from_pixel(64, 64, Luma([255u8]));
        draw_filled_rect_mut(&mut img, Rect::at(20, 10).of_size(8, 44), Luma([0u8]));
        let enhanced = clahe(&img, 2.0, 4);
        assert_eq!(enhanced.dimensions(), (64, 64));
        assert!(enhanced.get_pixel(24, 30)[0] < 64);
        assert!(enhanced.get_pixel(50, 50)[0] > 192);
        let bw = otsu_binarize(&enhanced);
        assert_eq!(bw.get_pixel(24, 30)[0], 0);
        assert_eq!(bw.get_pixel(50, 50)[0], 255);
    }

    #[test]
    fn test_preprocess_polarity() {
        // light glyph on a dark cell
        let mut cell = GrayImage::from_pixel(90, 90, Luma([40u8]));
        draw_filled_rect_mut(&mut cell, Rect::at(40, 15).of_size(10, 60), Luma([230u8]));
        let params = RecognitionParams::default();
        let out = preprocess_cell(&cell, &params);
        assert_eq!(out.dimensions(), (64, 64));
        assert!(mean_intensity(&out) > 128.0);
        assert_eq!(out.get_pixel(32, 32)[0], 0);
        assert_eq!(out.get_pixel(5, 5)[0], 255);
    }

    #[test]
    fn test_binarize() {
        let gray = GrayImage::from_fn(4, 1, |x, _| Luma([[0u8, 100, 101, 255][x as usize]]));
        let bw = binarize(&gray, 100);
        let values: Vec<u8> = bw.pixels().map(|p| p[0]).collect();
        assert_eq!(values, vec![0, 0, 255, 255]);
    }

    #[test]
    fn test_normalize_glyph_removes_offset_and_scale() {
        // the same bar, small in a corner and large in the middle
        let mut small = GrayImage::from_pixel(64, 64, Luma([255u8]));
        draw_filled_rect_mut(&mut small, Rect::at(4, 4).of_size(4, 16), Luma([0u8]));
        let mut large = GrayImage::from_pixel(64, 64, Luma([255u8]));
        draw_filled_rect_mut(&mut large, Rect::at(26, 8).of_size(12, 48), Luma([0u8]));
        let (a, b) = (normalize_glyph(&small, 64), normalize_glyph(&large, 64));
        assert_eq!(a.dimensions(), (64, 64));
        let differing = a.pixels().zip(b.pixels()).filter(|(p, q)| p[0] != q[0]).count();
        assert!(differing < 200, "{} pixels differ", differing);
        // centred, with a white margin
        assert_eq!(a.get_pixel(32, 32)[0], 0);
        assert_eq!(a.get_pixel(32, 2)[0], 255);
        assert_eq!(a.get_pixel(10, 32)[0], 255);
    }

    #[test]
    fn test_normalize_blank() {
        let blank = GrayImage::from_pixel(30, 20, Luma([255u8]));
        assert!(normalize_glyph(&blank, 64).pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_preprocess_empty_cell() {
        let params = RecognitionParams::default();
        let out = preprocess_cell(&GrayImage::new(0, 0), &params);
        assert_eq!(out.dimensions(), (64, 64));
    }
}
