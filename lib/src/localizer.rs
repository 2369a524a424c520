use crate::geometry::{bounding_box, outer_contours, polygon_area, to_f32, Quad};
use crate::preprocess::adaptive_threshold_inv;
use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::hough::{detect_lines, LineDetectionOptions};
use imageproc::morphology::dilate;
use imageproc::point::Point;
use log::{debug, info, warn};
use std::fmt;

// sigma of a 5 x 5 gaussian kernel
const BLUR_SIGMA: f32 = 1.1;

/// The strategy that located the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// The largest roughly square four-sided contour
    Contour,
    /// The bounding box of many cell-sized blobs
    CellGrouping,
    /// The outermost horizontal and vertical lines
    Lines,
    /// A fixed central crop, used when everything else fails
    CenterCrop,
}

impl Method {
    /// True if the board was not actually found.
    pub fn is_degraded(&self) -> bool {
        *self == Method::CenterCrop
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Contour => "contour",
            Method::CellGrouping => "cell_grouping",
            Method::Lines => "lines",
            Method::CenterCrop => "center_crop",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the board is, and how it was found.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Localization {
    pub method: Method,
    pub quad: Quad,
}

type Strategy = fn(&GrayImage) -> Option<Quad>;

/// The strategies in the order they are tried.
const STRATEGIES: [(Method, Strategy); 3] = [
    (Method::Contour, find_board_contour),
    (Method::CellGrouping, find_board_from_cells),
    (Method::Lines, find_board_lines),
];

/// Locate the board in a grayscale photo or screenshot.
///
/// The strategies are tried in order and the first quadrilateral found wins. If none succeeds the central 80% x 60%
/// of the image is returned, tagged [Method::CenterCrop]. This function never fails.
pub fn locate_board(gray: &GrayImage) -> Localization {
    for (method, find) in STRATEGIES.iter() {
        if let Some(quad) = find(gray) {
            info!("Board located by {}: {}", method, quad);
            return Localization {
                method: *method,
                quad,
            };
        }
        debug!("Board not located by {}", method);
    }
    let quad = center_crop(gray.width(), gray.height());
    warn!("Board detection fell back to center crop {}", quad);
    Localization {
        method: Method::CenterCrop,
        quad,
    }
}

/// Find the largest four-sided contour with an aspect ratio between 0.6 and 1.6 and at least 5% of the image area.
///
/// Contours are taken from both an adaptive threshold and an edge map of the blurred image.
pub fn find_board_contour(gray: &GrayImage) -> Option<Quad> {
    let blurred = gaussian_blur_f32(gray, BLUR_SIGMA);
    let img_area = gray.width() as f32 * gray.height() as f32;
    let mut best: Option<(f32, Quad)> = None;
    for source in [adaptive_threshold_inv(&blurred, 5, 2), canny(&blurred, 50.0, 150.0)] {
        // two 3 x 3 dilations
        let dilated = dilate(&source, Norm::LInf, 2);
        for points in outer_contours(&dilated) {
            let area = polygon_area(&to_f32(&points));
            if area < img_area * 0.05 {
                continue;
            }
            let quad = match approximate_quad(&points) {
                Some(quad) => refine_corners(&points, &quad).unwrap_or(quad),
                None => continue,
            };
            let height = quad.height();
            if height == 0.0 {
                continue;
            }
            let aspect = quad.width() / height;
            let larger = best.map_or(true, |(best_area, _)| area > best_area);
            if aspect > 0.6 && aspect < 1.6 && larger {
                best = Some((area, quad));
            }
        }
    }
    best.map(|(_, quad)| quad)
}

/// Simplify a closed contour with a tolerance of 2% of its perimeter; `None` unless four corners remain.
fn approximate_quad(points: &[Point<i32>]) -> Option<Quad> {
    let perimeter = arc_length(points, true);
    let mut approx = approximate_polygon_dp(points, 0.02 * perimeter, true);
    if approx.len() > 1 && approx.first() == approx.last() {
        approx.pop();
    }
    if approx.len() != 4 {
        return None;
    }
    let corners = to_f32(&approx);
    Some(Quad::from_points([corners[0], corners[1], corners[2], corners[3]]))
}

/// A straight line through `(x, y)` with unit direction `(dx, dy)`.
#[derive(Debug, Clone, Copy)]
struct Line {
    x: f32,
    y: f32,
    dx: f32,
    dy: f32,
}

/// Move the corners of `quad` to the intersections of lines fitted to the sides of the contour.
///
/// Simplified polygon vertices are contour points, and the contour of a thresholded board is rounded or notched at
/// the corners, so the vertices can be several pixels off. Only the middle 60% of each side is used for the fit.
fn refine_corners(points: &[Point<i32>], quad: &Quad) -> Option<Quad> {
    let c = quad.corners;
    let mut sides = [Line { x: 0.0, y: 0.0, dx: 1.0, dy: 0.0 }; 4];
    for (i, side) in sides.iter_mut().enumerate() {
        *side = fit_side(points, c[i], c[(i + 1) % 4])?;
    }
    let mut corners = c;
    for (i, corner) in corners.iter_mut().enumerate() {
        // corner i joins the side ending there and the side starting there
        *corner = intersect(sides[(i + 3) % 4], sides[i])?;
    }
    Some(Quad::from_points(corners))
}

/// Total least squares line through the contour points near the middle of the segment `a`-`b`.
fn fit_side(points: &[Point<i32>], a: Point<f32>, b: Point<f32>) -> Option<Line> {
    let (sx, sy) = (b.x - a.x, b.y - a.y);
    let len2 = sx * sx + sy * sy;
    if len2 < 1.0 {
        return None;
    }
    let len = len2.sqrt();
    let tolerance = (0.05 * len).max(3.0);
    let near: Vec<(f32, f32)> = points
        .iter()
        .map(|p| (p.x as f32 - a.x, p.y as f32 - a.y))
        .filter(|&(x, y)| {
            let t = (x * sx + y * sy) / len2;
            let dist = (x * sy - y * sx).abs() / len;
            (0.2..=0.8).contains(&t) && dist <= tolerance
        })
        .collect();
    if near.len() < 2 {
        return None;
    }
    let n = near.len() as f32;
    let (mx, my) = near.iter().fold((0.0, 0.0), |(mx, my), &(x, y)| (mx + x / n, my + y / n));
    let (sxx, sxy, syy) = near.iter().fold((0.0, 0.0, 0.0), |(sxx, sxy, syy), &(x, y)| {
        let (x, y) = (x - mx, y - my);
        (sxx + x * x, sxy + x * y, syy + y * y)
    });
    // direction of largest spread
    let angle = 0.5 * (2.0 * sxy).atan2(sxx - syy);
    Some(Line {
        x: mx + a.x,
        y: my + a.y,
        dx: angle.cos(),
        dy: angle.sin(),
    })
}

fn intersect(l1: Line, l2: Line) -> Option<Point<f32>> {
    let cross = l1.dx * l2.dy - l1.dy * l2.dx;
    if cross.abs() < 1e-3 {
        return None;
    }
    let s = ((l2.x - l1.x) * l2.dy - (l2.y - l1.y) * l2.dx) / cross;
    Some(Point::new(l1.x + s * l1.dx, l1.y + s * l1.dy))
}

/// Find at least 12 cell-like blobs (0.8% to 6% of the image area, roughly square) and return their common
/// bounding box, padded by 2% of its smaller side.
pub fn find_board_from_cells(gray: &GrayImage) -> Option<Quad> {
    let (w, h) = gray.dimensions();
    let img_area = w as f32 * h as f32;
    let blurred = gaussian_blur_f32(gray, BLUR_SIGMA);
    let dilated = dilate(&adaptive_threshold_inv(&blurred, 5, 2), Norm::LInf, 2);

    let cells: Vec<(i32, i32, i32, i32)> = outer_contours(&dilated)
        .iter()
        .filter_map(|points| {
            let area = polygon_area(&to_f32(points));
            if area <= img_area * 0.008 || area >= img_area * 0.06 {
                return None;
            }
            let (x0, y0, x1, y1) = bounding_box(points)?;
            // exclusive right and bottom
            let (x1, y1) = (x1 + 1, y1 + 1);
            let aspect = (x1 - x0) as f32 / (y1 - y0) as f32;
            if aspect > 0.6 && aspect < 1.6 {
                Some((x0, y0, x1, y1))
            } else {
                None
            }
        })
        .collect();
    if cells.len() < 12 {
        debug!("Only {} cell-like blobs", cells.len());
        return None;
    }

    let (mut x0, mut y0, mut x1, mut y1) = cells.iter().fold(
        (i32::MAX, i32::MAX, i32::MIN, i32::MIN),
        |(x0, y0, x1, y1), c| (x0.min(c.0), y0.min(c.1), x1.max(c.2), y1.max(c.3)),
    );
    let pad = ((x1 - x0).min(y1 - y0) as f32 * 0.02) as i32;
    x0 = (x0 - pad).max(0);
    y0 = (y0 - pad).max(0);
    x1 = (x1 + pad).min(w as i32);
    y1 = (y1 + pad).min(h as i32);
    info!(
        "Cell grouping found {} cells, bbox=({},{})-({},{})",
        cells.len(),
        x0,
        y0,
        x1,
        y1
    );
    Some(Quad::from_bounds(x0 as f32, y0 as f32, x1 as f32, y1 as f32))
}

/// Find the outermost roughly horizontal and roughly vertical straight lines; at least two of each are needed.
pub fn find_board_lines(gray: &GrayImage) -> Option<Quad> {
    let (w, h) = (gray.width() as f32, gray.height() as f32);
    let edges = canny(gray, 50.0, 150.0);
    let options = LineDetectionOptions {
        vote_threshold: 100,
        suppression_radius: 8,
    };
    let lines = detect_lines(&edges, options);

    let mut horizontal = Vec::new();
    let mut vertical = Vec::new();
    for line in lines.iter() {
        // the line satisfies x cos(theta) + y sin(theta) = r, its direction is (-sin, cos)
        let (sin, cos) = (line.angle_in_degrees as f32).to_radians().sin_cos();
        let angle = cos.abs().atan2(sin.abs());
        if angle < 0.3 {
            // y where the line crosses the vertical center line
            horizontal.push((line.r - w / 2.0 * cos) / sin);
        } else if angle > 1.27 {
            vertical.push((line.r - h / 2.0 * sin) / cos);
        }
    }
    debug!(
        "{} lines: {} horizontal, {} vertical",
        lines.len(),
        horizontal.len(),
        vertical.len()
    );
    if horizontal.len() < 2 || vertical.len() < 2 {
        return None;
    }
    let (top, bottom) = extremes(&horizontal);
    let (left, right) = extremes(&vertical);
    if top >= bottom || left >= right {
        return None;
    }
    Some(Quad::from_bounds(left, top, right, bottom))
}

fn extremes(values: &[f32]) -> (f32, f32) {
    values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// The central 80% of the width and 60% of the height.
pub fn center_crop(width: u32, height: u32) -> Quad {
    let margin_x = (width as f32 * 0.1) as u32;
    let margin_y = (height as f32 * 0.2) as u32;
    Quad::from_bounds(
        margin_x as f32,
        margin_y as f32,
        (width - margin_x) as f32,
        (height - margin_y) as f32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut};
    use imageproc::rect::Rect;

    #[test]
    fn test_center_crop() {
        let quad = center_crop(800, 600);
        assert_eq!(
            quad.as_tuples(),
            [(80., 120.), (720., 120.), (720., 480.), (80., 480.)]
        );
    }

    #[test]
    fn test_blank_image_falls_back() {
        let gray = GrayImage::from_pixel(200, 150, Luma([128u8]));
        let found = locate_board(&gray);
        assert_eq!(found.method, Method::CenterCrop);
        assert!(found.method.is_degraded());
        assert_eq!(found.quad, center_crop(200, 150));
    }

    #[test]
    fn test_contour() {
        // a dark square frame on a light background
        let mut gray = GrayImage::from_pixel(300, 300, Luma([220u8]));
        draw_filled_rect_mut(&mut gray, Rect::at(50, 60).of_size(180, 170), Luma([20u8]));
        draw_filled_rect_mut(&mut gray, Rect::at(60, 70).of_size(160, 150), Luma([220u8]));
        let quad = find_board_contour(&gray).expect("board contour");
        let tl = quad.top_left();
        let br = quad.bottom_right();
        assert!((tl.x - 50.0).abs() < 6.0 && (tl.y - 60.0).abs() < 6.0, "{}", quad);
        assert!((br.x - 229.0).abs() < 6.0 && (br.y - 229.0).abs() < 6.0, "{}", quad);
        assert_eq!(locate_board(&gray).method, Method::Contour);
    }

    #[test]
    fn test_notched_corners_give_square_quad() {
        // a thick dark frame with its outer corners cut away
        let mut gray = GrayImage::from_pixel(300, 300, Luma([220u8]));
        draw_filled_rect_mut(&mut gray, Rect::at(50, 50).of_size(200, 200), Luma([20u8]));
        draw_filled_rect_mut(&mut gray, Rect::at(62, 62).of_size(176, 176), Luma([220u8]));
        for (x, y) in [(50, 50), (242, 50), (242, 242), (50, 242)] {
            draw_filled_rect_mut(&mut gray, Rect::at(x, y).of_size(8, 8), Luma([220u8]));
        }
        let quad = find_board_contour(&gray).expect("board contour");
        let [tl, tr, br, bl] = quad.corners;
        assert!((tl.y - tr.y).abs() < 1.0 && (bl.y - br.y).abs() < 1.0, "{}", quad);
        assert!((tl.x - bl.x).abs() < 1.0 && (tr.x - br.x).abs() < 1.0, "{}", quad);
        assert!((tl.x - 50.0).abs() < 5.0 && (tl.y - 50.0).abs() < 5.0, "{}", quad);
        assert!((br.x - 249.0).abs() < 5.0 && (br.y - 249.0).abs() < 5.0, "{}", quad);
    }

    #[test]
    fn test_refine_corners() {
        // the outline of the square (10, 10)-(90, 90), with a simplified quad cutting its corners
        let mut points = Vec::new();
        for i in 10..=90 {
            points.extend([Point::new(i, 10), Point::new(90, i), Point::new(i, 90), Point::new(10, i)]);
        }
        let p = |x, y| Point::new(x, y);
        let rough = Quad::from_points([p(14.0, 10.0), p(90.0, 15.0), p(86.0, 90.0), p(10.0, 84.0)]);
        let quad = refine_corners(&points, &rough).expect("refined");
        for (corner, (x, y)) in quad.corners.iter().zip([(10.0, 10.0), (90.0, 10.0), (90.0, 90.0), (10.0, 90.0)]) {
            assert!((corner.x - x).abs() < 0.01 && (corner.y - y).abs() < 0.01, "{}", quad);
        }
    }

    #[test]
    fn test_cell_grouping() {
        // 4 x 4 separate dark tiles, no frame around them
        let mut gray = GrayImage::from_pixel(400, 400, Luma([230u8]));
        for row in 0..4 {
            for col in 0..4 {
                let rect = Rect::at(60 + col * 72, 60 + row * 72).of_size(60, 60);
                draw_filled_rect_mut(&mut gray, rect, Luma([30u8]));
            }
        }
        let quad = find_board_from_cells(&gray).expect("cells");
        let (tl, br) = (quad.top_left(), quad.bottom_right());
        assert!(tl.x < 60.0 && tl.x > 40.0, "{}", quad);
        assert!(br.y > 336.0 && br.y < 360.0, "{}", quad);
    }

    #[test]
    fn test_lines() {
        let mut gray = GrayImage::from_pixel(400, 400, Luma([255u8]));
        for i in 0..5 {
            let p = 50.0 + i as f32 * 75.0;
            draw_line_segment_mut(&mut gray, (30.0, p), (370.0, p), Luma([0u8]));
            draw_line_segment_mut(&mut gray, (p, 30.0), (p, 370.0), Luma([0u8]));
        }
        let quad = find_board_lines(&gray).expect("lines");
        let (tl, br) = (quad.top_left(), quad.bottom_right());
        assert!((tl.x - 50.0).abs() < 3.0 && (tl.y - 50.0).abs() < 3.0, "{}", quad);
        assert!((br.x - 350.0).abs() < 3.0 && (br.y - 350.0).abs() < 3.0, "{}", quad);
    }
}
