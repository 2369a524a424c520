use anyhow::Result;
use boggle_ocr::{
    draw_token_mut, estimate_grid_size, locate_board, normalize_board, Config, Context, Method, Token, Trie,
    WordSearch,
};
use image::imageops::grayscale;
use image::{DynamicImage, GrayImage, Luma, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use std::io::Write;

const CELL: u32 = 80;
const BORDER: u32 = 100;

/// A white board with black grid lines and letters, on a gray background.
fn photo(rows: &[&str]) -> RgbImage {
    let n = rows.len() as u32;
    let side = n * CELL + 2 * BORDER;
    let mut gray = GrayImage::from_pixel(side, side, Luma([200u8]));
    draw_filled_rect_mut(
        &mut gray,
        Rect::at(BORDER as i32, BORDER as i32).of_size(n * CELL, n * CELL),
        Luma([255u8]),
    );
    for i in 0..=n {
        let p = (BORDER + i * CELL) as i32 - 1;
        draw_filled_rect_mut(&mut gray, Rect::at(p, BORDER as i32 - 1).of_size(2, n * CELL + 2), Luma([0u8]));
        draw_filled_rect_mut(&mut gray, Rect::at(BORDER as i32 - 1, p).of_size(n * CELL + 2, 2), Luma([0u8]));
    }
    for (row, letters) in rows.iter().enumerate() {
        for (col, letter) in letters.split_whitespace().enumerate() {
            let x = (BORDER + col as u32 * CELL) as f32;
            let y = (BORDER + row as u32 * CELL) as f32;
            draw_token_mut(&mut gray, Token::parse(letter), x, y, CELL as f32, Luma([0u8]));
        }
    }
    DynamicImage::ImageLuma8(gray).into_rgb8()
}

fn four() -> Vec<&'static str> {
    vec!["C A T S", "R E P O", "B O N E", "D I G S"]
}

fn five() -> Vec<&'static str> {
    vec!["C A T S X", "R E P O Y", "B O N E W", "D I G S V", "H U M K L"]
}

fn six() -> Vec<&'static str> {
    vec!["C A T S X Y", "R E P O Y Z", "B O N E W F", "D I G S V J", "H U M K L T", "A E I O U R"]
}

#[test]
fn test_locate_and_normalize() -> Result<()> {
    for rows in [four(), five(), six()] {
        let n = rows.len();
        let image = photo(&rows);
        let found = locate_board(&grayscale(&image));
        assert_ne!(found.method, Method::CenterCrop);

        let (tl, br) = (found.quad.top_left(), found.quad.bottom_right());
        let far = (BORDER + n as u32 * CELL) as f32;
        assert!((tl.x - BORDER as f32).abs() < 6.0 && (tl.y - BORDER as f32).abs() < 6.0, "{}", found.quad);
        assert!((br.x - far).abs() < 6.0 && (br.y - far).abs() < 6.0, "{}", found.quad);
        let (tr, bl) = (found.quad.corners[1], found.quad.corners[3]);
        assert!((tl.y - tr.y).abs() < 2.0 && (tl.x - bl.x).abs() < 2.0, "{}", found.quad);

        let board = normalize_board(&image, &found.quad, 400)?;
        assert_eq!(board.dimensions(), (400, 400));
        let estimate = estimate_grid_size(&board);
        assert_eq!(estimate, n, "{}x{} board estimated as {}", n, n, estimate);
    }
    Ok(())
}

#[test]
fn test_no_board() -> Result<()> {
    let image = RgbImage::from_pixel(800, 600, image::Rgb([128, 128, 128]));
    let found = locate_board(&grayscale(&image));
    assert_eq!(found.method, Method::CenterCrop);
    let board = normalize_board(&image, &found.quad, 300)?;
    assert_eq!(board.dimensions(), (300, 300));
    Ok(())
}

#[test]
fn test_solve_photo() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir()?;
    let dictionary = dir.path().join("words.txt");
    let mut file = std::fs::File::create(&dictionary)?;
    writeln!(file, "CAT\nCATS\nBONE\nDIG\nPONG\nZEBRA")?;

    let path = dir.path().join("board.png");
    photo(&four()).save(&path)?;

    let config = Config {
        dictionary_path: dictionary,
        templates_dir: dir.path().join("no-templates"),
        max_results: 2,
        ..Config::default()
    };
    let context = Context::from_config(config)?;
    assert!(!context.recognizer().templates().is_calibrated());
    let result = context.solve_file(&path)?;

    assert_ne!(result.method, Method::CenterCrop);
    assert_eq!(result.grid_size, 4);
    assert_eq!(result.cells.len(), 16);
    assert_eq!(result.recognition.unresolved(), 0);
    assert_eq!(result.board.to_string(), "C  A  T  S\nR  E  P  O\nB  O  N  E\nD  I  G  S");

    // longest first, then alphabetical, truncated to two
    assert_eq!(result.total_words, 5);
    let words: Vec<&str> = result.words.iter().map(|w| w.word.as_str()).collect();
    assert_eq!(words, ["BONE", "CATS"]);

    let trie: &Trie = context.trie();
    let all: Vec<String> = WordSearch::new(trie).solve(&result.board, 0).into_iter().map(|w| w.word).collect();
    assert_eq!(all, ["BONE", "CATS", "PONG", "CAT", "DIG"]);
    Ok(())
}
