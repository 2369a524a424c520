use crate::geometry::Quad;
use crate::Error;
use image::imageops::grayscale;
use image::{GrayImage, Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use log::debug;

/// Warp the board inside `quad` onto a `size` x `size` grayscale square.
///
/// The quad corners map onto the square corners in the same order, so the top-left corner of the board lands at
/// `(0, 0)`. The result is always exactly `size` pixels square.
/// # Errors
/// If the quad has (almost) no area or no projective transform exists for it.
pub fn normalize_board(image: &RgbImage, quad: &Quad, size: u32) -> Result<GrayImage, Error> {
    let area = quad.area();
    if area < 1.0 || size < 2 {
        return Err(Error::DegenerateQuad(area));
    }
    let last = (size - 1) as f32;
    let to = [(0.0, 0.0), (last, 0.0), (last, last), (0.0, last)];
    let projection =
        Projection::from_control_points(quad.as_tuples(), to).ok_or(Error::DegenerateQuad(area))?;
    let mut warped = RgbImage::new(size, size);
    warp_into(image, &projection, Interpolation::Bilinear, Rgb([0, 0, 0]), &mut warped);
    debug!("Warped {} onto {}x{}", quad, size, size);
    Ok(grayscale(&warped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::point::Point;
    use imageproc::rect::Rect;

    #[test]
    fn test_axis_aligned() {
        // dark left half, light right half inside the quad
        let mut img = RgbImage::from_pixel(300, 200, Rgb([0, 0, 255]));
        draw_filled_rect_mut(&mut img, Rect::at(50, 20).of_size(80, 160), Rgb([10, 10, 10]));
        draw_filled_rect_mut(&mut img, Rect::at(130, 20).of_size(80, 160), Rgb([240, 240, 240]));
        let quad = Quad::from_bounds(50.0, 20.0, 209.0, 179.0);
        let board = normalize_board(&img, &quad, 100).unwrap();
        assert_eq!(board.dimensions(), (100, 100));
        assert!(board.get_pixel(20, 50)[0] < 30);
        assert!(board.get_pixel(80, 50)[0] > 220);
    }

    #[test]
    fn test_degenerate() {
        let img = RgbImage::new(100, 100);
        let p = |x, y| Point::new(x, y);
        let line = Quad::from_points([p(0.0, 0.0), p(10.0, 10.0), p(20.0, 20.0), p(30.0, 30.0)]);
        assert!(matches!(
            normalize_board(&img, &line, 400),
            Err(Error::DegenerateQuad(_))
        ));
        let quad = Quad::from_bounds(0.0, 0.0, 50.0, 50.0);
        assert!(normalize_board(&img, &quad, 0).is_err());
    }
}
