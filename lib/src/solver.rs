use crate::board::{Board, Token};
use crate::trie::{NodeId, Trie};
use std::cmp::Reverse;
use std::collections::HashMap;

/// A word found on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundWord {
    pub word: String,
    /// The smallest `(row, col)` from which a path spells the word
    pub start: (usize, usize),
}

/// Finds all dictionary words on a [Board].
///
/// A word is spelled by a path of 8-connected cells that visits every cell at most once. A "QU" cell
/// contributes both letters; a "?" cell never takes part in a word.
pub struct WordSearch<'a> {
    trie: &'a Trie,
}

struct Search<'b> {
    trie: &'b Trie,
    board: &'b Board,
    chars: Vec<&'static [u8]>,
    adjacency: Vec<Vec<usize>>,
    found: HashMap<String, (usize, usize)>,
    path: String,
}

impl<'a> WordSearch<'a> {
    pub fn new(trie: &'a Trie) -> WordSearch<'a> {
        WordSearch { trie }
    }

    /// Return all words on `board`, longest first and alphabetical within a length.
    ///
    /// If `max_results` is not 0 the sorted list is truncated to that many words.
    /// # Example
    /// ```
    /// # use boggle_ocr::{Board, Trie, WordSearch, Error};
    /// let trie = Trie::from_words(["CAT", "CATS", "ACT"], 3);
    /// let board = Board::from_rows(&[["C", "A"], ["S", "T"]])?;
    /// let words = WordSearch::new(&trie).solve(&board, 0);
    /// let words: Vec<_> = words.iter().map(|w| w.word.as_str()).collect();
    /// assert_eq!(words, vec!["CATS", "ACT", "CAT"]);
    /// # Ok::<(), Error>(())
    /// ```
    pub fn solve(&self, board: &Board, max_results: usize) -> Vec<FoundWord> {
        let mut search = Search {
            trie: self.trie,
            board,
            chars: (0..board.len()).map(|i| board.at(i).chars()).collect(),
            adjacency: (0..board.len())
                .map(|i| board.neighbors(i).collect())
                .collect(),
            found: HashMap::new(),
            path: String::new(),
        };
        for start in 0..board.len() {
            search.visit(start, self.trie.root(), 1u64 << start, start);
        }

        let mut words: Vec<FoundWord> = search
            .found
            .into_iter()
            .map(|(word, start)| FoundWord { word, start })
            .collect();
        words.sort_by(|a, b| {
            (Reverse(a.word.len()), &a.word).cmp(&(Reverse(b.word.len()), &b.word))
        });
        if max_results > 0 {
            words.truncate(max_results);
        }
        words
    }
}

impl<'b> Search<'b> {
    fn visit(&mut self, index: usize, node: NodeId, visited: u64, start: usize) {
        if self.board.at(index) == Token::Unknown {
            return;
        }
        // a QU cell walks two edges, it is never split
        let chars = self.chars[index];
        let node = match self.trie.walk(node, chars) {
            Some(node) => node,
            None => return,
        };

        let len = self.path.len();
        // chars are ASCII
        self.path.extend(chars.iter().map(|&c| c as char));
        if self.trie.is_terminal(node) {
            let size = self.board.size();
            let origin = (start / size, start % size);
            self.found
                .entry(self.path.clone())
                .and_modify(|best| *best = (*best).min(origin))
                .or_insert(origin);
        }
        if self.trie.has_children(node) {
            for k in 0..self.adjacency[index].len() {
                let next = self.adjacency[index][k];
                let bit = 1u64 << next;
                if visited & bit == 0 {
                    self.visit(next, node, visited | bit, start);
                }
            }
        }
        self.path.truncate(len);
    }
}
