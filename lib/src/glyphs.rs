//! A small stroke font for the capital letters.
//!
//! Every letter is a list of polylines on a 4 x 6 unit grid, origin top-left. The font is used to build the
//! synthetic template set when no calibrated templates are available, and to draw test boards.
use crate::board::Token;
use image::{GrayImage, Luma};
use imageproc::drawing::draw_line_segment_mut;

type Stroke = &'static [(f32, f32)];

const O_RING: Stroke = &[
    (1., 0.),
    (3., 0.),
    (4., 1.),
    (4., 5.),
    (3., 6.),
    (1., 6.),
    (0., 5.),
    (0., 1.),
    (1., 0.),
];
const P_BOWL: Stroke = &[(0., 6.), (0., 0.), (3., 0.), (4., 0.8), (4., 2.), (3., 2.8), (0., 2.8)];

const STROKES: [&[Stroke]; 26] = [
    // A
    &[&[(0., 6.), (2., 0.), (4., 6.)], &[(1., 3.5), (3., 3.5)]],
    // B
    &[
        &[(0., 0.), (0., 6.)],
        &[(0., 0.), (3., 0.), (4., 0.8), (4., 2.2), (3., 3.), (0., 3.)],
        &[(0., 3.), (3., 3.), (4., 3.8), (4., 5.2), (3., 6.), (0., 6.)],
    ],
    // C
    &[&[(4., 0.8), (3., 0.), (1., 0.), (0., 1.), (0., 5.), (1., 6.), (3., 6.), (4., 5.2)]],
    // D
    &[&[(0., 0.), (0., 6.), (2.5, 6.), (4., 4.5), (4., 1.5), (2.5, 0.), (0., 0.)]],
    // E
    &[&[(4., 0.), (0., 0.), (0., 6.), (4., 6.)], &[(0., 3.), (3., 3.)]],
    // F
    &[&[(4., 0.), (0., 0.), (0., 6.)], &[(0., 3.), (3., 3.)]],
    // G
    &[&[
        (4., 0.8),
        (3., 0.),
        (1., 0.),
        (0., 1.),
        (0., 5.),
        (1., 6.),
        (3., 6.),
        (4., 5.),
        (4., 3.5),
        (2.2, 3.5),
    ]],
    // H
    &[&[(0., 0.), (0., 6.)], &[(4., 0.), (4., 6.)], &[(0., 3.), (4., 3.)]],
    // I
    &[&[(2., 0.), (2., 6.)], &[(1., 0.), (3., 0.)], &[(1., 6.), (3., 6.)]],
    // J
    &[&[(1., 0.), (4., 0.)], &[(3., 0.), (3., 5.), (2., 6.), (1., 6.), (0., 5.)]],
    // K
    &[&[(0., 0.), (0., 6.)], &[(4., 0.), (0., 3.5)], &[(1.2, 2.8), (4., 6.)]],
    // L
    &[&[(0., 0.), (0., 6.), (4., 6.)]],
    // M
    &[&[(0., 6.), (0., 0.), (2., 3.5), (4., 0.), (4., 6.)]],
    // N
    &[&[(0., 6.), (0., 0.), (4., 6.), (4., 0.)]],
    // O
    &[O_RING],
    // P
    &[P_BOWL],
    // Q
    &[O_RING, &[(2.5, 4.5), (4., 6.)]],
    // R
    &[P_BOWL, &[(2., 2.8), (4., 6.)]],
    // S
    &[&[
        (4., 0.8),
        (3., 0.),
        (1., 0.),
        (0., 1.),
        (0., 2.),
        (1., 3.),
        (3., 3.),
        (4., 4.),
        (4., 5.),
        (3., 6.),
        (1., 6.),
        (0., 5.2),
    ]],
    // T
    &[&[(0., 0.), (4., 0.)], &[(2., 0.), (2., 6.)]],
    // U
    &[&[(0., 0.), (0., 5.), (1., 6.), (3., 6.), (4., 5.), (4., 0.)]],
    // V
    &[&[(0., 0.), (2., 6.), (4., 0.)]],
    // W
    &[&[(0., 0.), (1., 6.), (2., 2.5), (3., 6.), (4., 0.)]],
    // X
    &[&[(0., 0.), (4., 6.)], &[(4., 0.), (0., 6.)]],
    // Y
    &[&[(0., 0.), (2., 3.)], &[(4., 0.), (2., 3.)], &[(2., 3.), (2., 6.)]],
    // Z
    &[&[(0., 0.), (4., 0.), (0., 6.), (4., 6.)]],
];

/// Draw `token` centred in the square cell with top-left corner `(x, y)` and side `size`.
///
/// A letter fills 40% of the cell width and 56% of its height, so it stays clear of a cell inset of up to 0.15.
/// The two letters of QU share a wider box. The pen is about `size / 16` pixels wide. Unknown tokens draw nothing.
pub fn draw_token_mut(img: &mut GrayImage, token: Token, x: f32, y: f32, size: f32, ink: Luma<u8>) {
    let pen = ((size / 32.0).round() as i32).max(1);
    let (bh, top) = (0.56 * size, y + 0.22 * size);
    match token {
        Token::Letter(i) => {
            let bw = 0.4 * size;
            draw_strokes(img, STROKES[i as usize], (x + 0.3 * size, top, bw, bh), pen, ink);
        }
        Token::Qu => {
            let bw = 0.27 * size;
            let q = STROKES[(b'Q' - b'A') as usize];
            let u = STROKES[(b'U' - b'A') as usize];
            draw_strokes(img, q, (x + 0.2 * size, top, bw, bh), pen, ink);
            draw_strokes(img, u, (x + 0.53 * size, top, bw, bh), pen, ink);
        }
        Token::Unknown => {}
    }
}

/// Render `token` as a black glyph on a white `size` x `size` image.
pub fn render_token(token: Token, size: u32) -> GrayImage {
    let mut img = GrayImage::from_pixel(size, size, Luma([255u8]));
    draw_token_mut(&mut img, token, 0.0, 0.0, size as f32, Luma([0u8]));
    img
}

fn draw_strokes(
    img: &mut GrayImage,
    strokes: &[Stroke],
    (x0, y0, w, h): (f32, f32, f32, f32),
    pen: i32,
    ink: Luma<u8>,
) {
    let map = |(u, v): (f32, f32)| (x0 + u / 4.0 * w, y0 + v / 6.0 * h);
    for stroke in strokes {
        for segment in stroke.windows(2) {
            let (start, end) = (map(segment[0]), map(segment[1]));
            // a square pen: the same segment at every offset
            for dy in -pen..=pen {
                for dx in -pen..=pen {
                    let (dx, dy) = (dx as f32, dy as f32);
                    draw_line_segment_mut(
                        img,
                        (start.0 + dx, start.1 + dy),
                        (end.0 + dx, end.1 + dy),
                        ink,
                    );
                }
            }
        }
    }
}
