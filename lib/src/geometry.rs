use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;
use std::fmt;

/// Four board corners in the order top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub corners: [Point<f32>; 4],
}

impl Quad {
    /// Put four points in canonical corner order.
    ///
    /// The order depends on the point positions only: the smallest `x + y` is the top-left corner, the largest the
    /// bottom-right, the smallest `x - y` the top-right and the largest `x - y` the bottom-left.
    pub fn from_points(points: [Point<f32>; 4]) -> Quad {
        let sum = |p: &&Point<f32>| p.x + p.y;
        let diff = |p: &&Point<f32>| p.x - p.y;
        let by = |f: fn(&&Point<f32>) -> f32| {
            move |a: &&Point<f32>, b: &&Point<f32>| f(a).total_cmp(&f(b))
        };
        // iterators over a non-empty array always yield a value
        let pick = |p: Option<&Point<f32>>| p.copied().unwrap_or(points[0]);
        let top_left = pick(points.iter().min_by(by(sum)));
        let bottom_right = pick(points.iter().max_by(by(sum)));
        let top_right = pick(points.iter().max_by(by(diff)));
        let bottom_left = pick(points.iter().min_by(by(diff)));
        Quad {
            corners: [top_left, top_right, bottom_right, bottom_left],
        }
    }

    /// The quad of an axis-aligned rectangle.
    pub fn from_bounds(left: f32, top: f32, right: f32, bottom: f32) -> Quad {
        Quad::from_points([
            Point::new(left, top),
            Point::new(right, top),
            Point::new(right, bottom),
            Point::new(left, bottom),
        ])
    }

    pub fn top_left(&self) -> Point<f32> {
        self.corners[0]
    }

    pub fn bottom_right(&self) -> Point<f32> {
        self.corners[2]
    }

    /// Length of the top edge
    pub fn width(&self) -> f32 {
        distance(self.corners[0], self.corners[1])
    }

    /// Length of the left edge
    pub fn height(&self) -> f32 {
        distance(self.corners[0], self.corners[3])
    }

    pub fn area(&self) -> f32 {
        polygon_area(&self.corners)
    }

    pub fn as_tuples(&self) -> [(f32, f32); 4] {
        let c = &self.corners;
        [
            (c[0].x, c[0].y),
            (c[1].x, c[1].y),
            (c[2].x, c[2].y),
            (c[3].x, c[3].y),
        ]
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let c = &self.corners;
        write!(
            f,
            "[({:.1}, {:.1}), ({:.1}, {:.1}), ({:.1}, {:.1}), ({:.1}, {:.1})]",
            c[0].x, c[0].y, c[1].x, c[1].y, c[2].x, c[2].y, c[3].x, c[3].y
        )
    }
}

pub fn distance(a: Point<f32>, b: Point<f32>) -> f32 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// Absolute area of a simple polygon (shoelace formula).
pub fn polygon_area(points: &[Point<f32>]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: f32 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum();
    twice.abs() / 2.0
}

/// Axis-aligned bounding box `(min_x, min_y, max_x, max_y)` of integer points, inclusive.
pub fn bounding_box(points: &[Point<i32>]) -> Option<(i32, i32, i32, i32)> {
    let first = points.first()?;
    Some(points.iter().fold(
        (first.x, first.y, first.x, first.y),
        |(x0, y0, x1, y1), p| (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
    ))
}

/// The outer borders of the top level foreground regions (non-zero pixels) of a binary image.
pub fn outer_contours(binary: &GrayImage) -> Vec<Vec<Point<i32>>> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| c.parent.is_none() && matches!(c.border_type, BorderType::Outer))
        .map(|c| c.points)
        .collect()
}

/// Convert integer contour points for area and perimeter computations.
pub fn to_f32(points: &[Point<i32>]) -> Vec<Point<f32>> {
    points
        .iter()
        .map(|p| Point::new(p.x as f32, p.y as f32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(v: [(f32, f32); 4]) -> [Point<f32>; 4] {
        v.map(|(x, y)| Point::new(x, y))
    }

    #[test]
    fn test_canonical_order() {
        let quad = Quad::from_points(pts([(300., 0.), (0., 0.), (0., 300.), (300., 300.)]));
        assert_eq!(
            quad.as_tuples(),
            [(0., 0.), (300., 0.), (300., 300.), (0., 300.)]
        );
    }

    #[test]
    fn test_order_independent_of_input() {
        let corners = [(12., 20.), (410., 35.), (395., 420.), (5., 400.)];
        let expected = Quad::from_points(pts(corners)).as_tuples();
        let mut rotated = corners;
        for _ in 0..4 {
            rotated.rotate_left(1);
            let quad = Quad::from_points(pts(rotated));
            assert_eq!(quad.as_tuples(), expected);
            assert_eq!(quad.top_left(), Point::new(12., 20.));
            assert_eq!(quad.bottom_right(), Point::new(395., 420.));
        }
    }

    #[test]
    fn test_area() {
        let quad = Quad::from_bounds(10., 10., 110., 60.);
        assert_eq!(quad.area(), 5000.0);
        assert_eq!(quad.width(), 100.0);
        assert_eq!(quad.height(), 50.0);
        let line = Quad::from_points(pts([(0., 0.), (1., 1.), (2., 2.), (3., 3.)]));
        assert_eq!(line.area(), 0.0);
    }

    #[test]
    fn test_outer_contours() {
        use image::Luma;
        use imageproc::drawing::draw_filled_rect_mut;
        use imageproc::rect::Rect;
        let mut img = GrayImage::new(60, 40);
        // a ring: only its outer border is reported, not the hole or the blob inside it
        draw_filled_rect_mut(&mut img, Rect::at(5, 5).of_size(30, 30), Luma([255u8]));
        draw_filled_rect_mut(&mut img, Rect::at(10, 10).of_size(20, 20), Luma([0u8]));
        draw_filled_rect_mut(&mut img, Rect::at(15, 15).of_size(5, 5), Luma([255u8]));
        draw_filled_rect_mut(&mut img, Rect::at(45, 10).of_size(10, 10), Luma([255u8]));
        let contours = outer_contours(&img);
        assert_eq!(contours.len(), 2);
        let mut boxes: Vec<_> = contours.iter().filter_map(|c| bounding_box(c)).collect();
        boxes.sort();
        assert_eq!(boxes, vec![(5, 5, 34, 34), (45, 10, 54, 19)]);
    }

    #[test]
    fn test_bounding_box() {
        let points = vec![Point::new(3, 4), Point::new(-1, 9), Point::new(7, 2)];
        assert_eq!(bounding_box(&points), Some((-1, 2, 7, 9)));
        assert_eq!(bounding_box(&[]), None);
    }
}
