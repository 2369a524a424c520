use crate::Error;
use std::fmt;
use std::ops::{Deref, DerefMut};

const ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Maximum board side; the search tracks visited cells in a `u64`.
pub const MAX_BOARD_SIZE: usize = 8;

/// The content of one board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    /// A single letter `A`..`Z`, stored as an index 0..26
    Letter(u8),
    /// The compound "QU" tile
    Qu,
    /// Not recognized
    Unknown,
}

impl Default for Token {
    fn default() -> Self {
        Token::Unknown
    }
}

impl Token {
    /// Parse a letter, "QU" or "?". Case is ignored; a bare "Q" becomes [Token::Qu].
    pub fn parse(s: &str) -> Token {
        let upper = s.trim().to_ascii_uppercase();
        match upper.as_bytes() {
            [b'Q'] | [b'Q', b'U'] => Token::Qu,
            [c] if c.is_ascii_uppercase() => Token::Letter(c - b'A'),
            _ => Token::Unknown,
        }
    }

    /// The token for an uppercase ASCII letter. Unlike [Token::parse] a `Q` stays a `Q`.
    pub fn from_letter(c: char) -> Token {
        if c.is_ascii_uppercase() {
            Token::Letter(c as u8 - b'A')
        } else {
            Token::Unknown
        }
    }

    /// The characters this cell contributes to a word: one letter, `QU`, or nothing.
    pub fn chars(&self) -> &'static [u8] {
        match *self {
            Token::Letter(i) => &ALPHABET[i as usize..i as usize + 1],
            Token::Qu => b"QU",
            Token::Unknown => b"",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Token::Unknown => "?",
            // chars() is always ASCII
            _ => std::str::from_utf8(self.chars()).unwrap_or("?"),
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Token::Unknown
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-cell values organized as a square two-dimensional grid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid<T>(pub Vec<Vec<T>>);

impl<T: Clone> Grid<T> {
    /// Return a `size` x `size` grid with every cell set to `value`.
    pub fn filled(size: usize, value: T) -> Grid<T> {
        let row: Vec<T> = vec![value; size];
        Grid((0..size).map(|_| row.clone()).collect())
    }
}

impl<T> Grid<T> {
    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// Iterate over `((row, col), value)` in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = ((usize, usize), &T)> {
        self.0.iter().enumerate().flat_map(|(row, values)| {
            values
                .iter()
                .enumerate()
                .map(move |(col, value)| ((row, col), value))
        })
    }
}

impl<T> Deref for Grid<T> {
    type Target = Vec<Vec<T>>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Grid<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T: fmt::Display> fmt::Display for Grid<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = self
            .iter()
            .map(|row| {
                row.iter()
                    .map(|v| format!("{:<2}", v.to_string()))
                    .collect::<Vec<_>>()
                    .join(" ")
                    .trim_end()
                    .to_string()
            })
            .collect::<Vec<String>>()
            .join("\n");
        write!(f, "{}", text)
    }
}

/// An immutable N x N board of tokens, the input of the word search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: usize,
    tokens: Vec<Token>,
}

impl Board {
    /// Create a board from recognized tokens.
    ///
    /// # Errors
    /// If the grid is not square or larger than [MAX_BOARD_SIZE].
    pub fn new(grid: &Grid<Token>) -> Result<Board, Error> {
        let size = grid.size();
        if size > MAX_BOARD_SIZE {
            return Err(Error::BoardTooLarge(size));
        }
        for (row, values) in grid.iter().enumerate() {
            if values.len() != size {
                return Err(Error::BoardNotSquare {
                    rows: size,
                    row,
                    cols: values.len(),
                });
            }
        }
        let tokens = grid.iter().flatten().copied().collect();
        Ok(Board { size, tokens })
    }

    /// Create a board from rows of cell strings, e.g. `&[["QU", "I"], ["T", "?"]]`.
    /// # Example
    /// ```
    /// # use boggle_ocr::{Board, Error};
    /// let board = Board::from_rows(&[["C", "A"], ["QU", "?"]])?;
    /// assert_eq!(board.size(), 2);
    /// assert_eq!(board.to_string(), "C  A\nQU ?");
    /// # Ok::<(), Error>(())
    /// ```
    pub fn from_rows<R, S>(rows: &[R]) -> Result<Board, Error>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let grid = Grid(
            rows.iter()
                .map(|row| row.as_ref().iter().map(|s| Token::parse(s.as_ref())).collect())
                .collect(),
        );
        Board::new(&grid)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of cells, N * N
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Token {
        self.tokens[row * self.size + col]
    }

    /// The token at linear index `row * size + col`.
    pub fn at(&self, index: usize) -> Token {
        self.tokens[index]
    }

    /// Linear indices of the (up to 8) cells adjacent to `index`.
    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        let n = self.size as isize;
        let (row, col) = ((index / self.size) as isize, (index % self.size) as isize);
        (-1..=1)
            .flat_map(|dr| (-1..=1).map(move |dc| (dr, dc)))
            .filter(|&(dr, dc)| dr != 0 || dc != 0)
            .map(move |(dr, dc)| (row + dr, col + dc))
            .filter(move |&(r, c)| r >= 0 && r < n && c >= 0 && c < n)
            .map(move |(r, c)| (r * n + c) as usize)
    }

    pub fn to_grid(&self) -> Grid<Token> {
        Grid(self.tokens.chunks(self.size.max(1)).map(|row| row.to_vec()).collect())
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_grid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token() {
        assert_eq!(Token::parse("a"), Token::Letter(0));
        assert_eq!(Token::parse("Z"), Token::Letter(25));
        assert_eq!(Token::parse("q"), Token::Qu);
        assert_eq!(Token::parse("Qu"), Token::Qu);
        assert_eq!(Token::parse("?"), Token::Unknown);
        assert_eq!(Token::parse(""), Token::Unknown);
        assert_eq!(Token::parse("AB"), Token::Unknown);
        assert_eq!(Token::from_letter('Q'), Token::Letter(16));
        assert_eq!(Token::Qu.chars(), b"QU");
        assert_eq!(Token::Letter(2).as_str(), "C");
        assert_eq!(Token::Unknown.to_string(), "?");
    }

    #[test]
    fn test_neighbors() {
        let board = Board::from_rows(&[["A", "B", "C"], ["D", "E", "F"], ["G", "H", "I"]]).unwrap();
        let mut corner: Vec<_> = board.neighbors(0).collect();
        corner.sort();
        assert_eq!(corner, vec![1, 3, 4]);
        assert_eq!(board.neighbors(4).count(), 8);
        let mut edge: Vec<_> = board.neighbors(5).collect();
        edge.sort();
        assert_eq!(edge, vec![1, 2, 4, 7, 8]);
    }

    #[test]
    fn test_not_square() {
        let rows: Vec<Vec<&str>> = vec![vec!["A", "B"], vec!["C"]];
        let err = Board::from_rows(&rows).unwrap_err();
        assert!(matches!(err, Error::BoardNotSquare { row: 1, cols: 1, .. }));
    }

    #[test]
    fn test_too_large() {
        let grid = Grid::filled(9, Token::Letter(0));
        assert!(matches!(Board::new(&grid), Err(Error::BoardTooLarge(9))));
    }

    #[test]
    fn test_grid_display() {
        let mut grid = Grid::filled(2, Token::Letter(4));
        grid[1][0] = Token::Qu;
        grid[1][1] = Token::Unknown;
        assert_eq!(grid.to_string(), "E  E\nQU ?");
        assert_eq!(grid.cells().count(), 4);
    }
}
