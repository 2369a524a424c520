use crate::Error;
use log::info;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Index of a node in the [Trie] arena.
pub type NodeId = u32;

const ROOT: NodeId = 0;
// the root is never a child, so 0 marks a missing edge
const NO_CHILD: NodeId = 0;

#[derive(Debug, Clone, Default)]
struct Node {
    children: [NodeId; 26],
    nchildren: u8,
    terminal: bool,
}

/// Prefix tree over an uppercase `A`..`Z` word list.
///
/// Nodes live in a single arena and refer to their children by index. The trie is built once and is only read
/// afterwards, so it can be shared between threads without locking.
#[derive(Debug, Clone)]
pub struct Trie {
    nodes: Vec<Node>,
    words: usize,
    min_length: usize,
}

impl Trie {
    /// An empty trie that accepts words of at least `min_length` letters.
    pub fn new(min_length: usize) -> Trie {
        Trie {
            nodes: vec![Node::default()],
            words: 0,
            min_length,
        }
    }

    /// Build a trie from `words`, see [Trie::insert] for the filtering rules.
    pub fn from_words<I, S>(words: I, min_length: usize) -> Trie
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut trie = Trie::new(min_length);
        for word in words {
            trie.insert(word.as_ref());
        }
        trie
    }

    /// Build a trie from a word list with one word per line.
    pub fn from_reader<R: BufRead>(reader: R, min_length: usize) -> Result<Trie, std::io::Error> {
        let mut trie = Trie::new(min_length);
        for line in reader.lines() {
            trie.insert(&line?);
        }
        Ok(trie)
    }

    /// Load a word list file.
    ///
    /// # Errors
    /// If the file can not be opened or read.
    pub fn load<P: AsRef<Path>>(path: P, min_length: usize) -> Result<Trie, Error> {
        let path = path.as_ref();
        let read_error = |source| Error::DictionaryRead {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(read_error)?;
        let trie = Trie::from_reader(BufReader::new(file), min_length).map_err(read_error)?;
        info!(
            "Loaded {} words ({} nodes) from {}",
            trie.len(),
            trie.nodes.len(),
            path.display()
        );
        Ok(trie)
    }

    /// Insert a word. Surrounding whitespace is removed and the word is uppercased.
    ///
    /// Returns `false` if the word is rejected: too short, or containing anything but ASCII letters.
    pub fn insert(&mut self, word: &str) -> bool {
        let word = word.trim().to_ascii_uppercase();
        if word.len() < self.min_length || !word.bytes().all(|c| c.is_ascii_uppercase()) {
            return false;
        }
        let mut node = ROOT;
        for c in word.bytes() {
            let slot = (c - b'A') as usize;
            let child = self.nodes[node as usize].children[slot];
            node = if child == NO_CHILD {
                let id = self.nodes.len() as NodeId;
                self.nodes.push(Node::default());
                let parent = &mut self.nodes[node as usize];
                parent.children[slot] = id;
                parent.nchildren += 1;
                id
            } else {
                child
            };
        }
        let node = &mut self.nodes[node as usize];
        if !node.terminal {
            node.terminal = true;
            self.words += 1;
        }
        true
    }

    pub fn root(&self) -> NodeId {
        ROOT
    }

    /// Follow the edge for uppercase letter `c`.
    #[inline]
    pub fn child(&self, node: NodeId, c: u8) -> Option<NodeId> {
        if !c.is_ascii_uppercase() {
            return None;
        }
        match self.nodes[node as usize].children[(c - b'A') as usize] {
            NO_CHILD => None,
            child => Some(child),
        }
    }

    /// Follow the edges for every letter in `chars`.
    #[inline]
    pub fn walk(&self, node: NodeId, chars: &[u8]) -> Option<NodeId> {
        chars.iter().try_fold(node, |node, &c| self.child(node, c))
    }

    /// True if a word ends at `node`.
    #[inline]
    pub fn is_terminal(&self, node: NodeId) -> bool {
        self.nodes[node as usize].terminal
    }

    /// True if some longer word continues from `node`.
    #[inline]
    pub fn has_children(&self, node: NodeId) -> bool {
        self.nodes[node as usize].nchildren > 0
    }

    pub fn contains(&self, word: &str) -> bool {
        self.walk(ROOT, word.to_ascii_uppercase().as_bytes())
            .map_or(false, |node| self.is_terminal(node))
    }

    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.walk(ROOT, prefix.to_ascii_uppercase().as_bytes()).is_some()
    }

    /// Number of distinct words
    pub fn len(&self) -> usize {
        self.words
    }

    pub fn is_empty(&self) -> bool {
        self.words == 0
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_filtering() {
        let trie = Trie::from_words(["cat", "CATS", "at", "don't", "café", " dog ", "cat"], 3);
        assert_eq!(trie.len(), 3);
        assert!(trie.contains("CAT"));
        assert!(trie.contains("cats"));
        assert!(trie.contains("DOG"));
        assert!(!trie.contains("AT"));
        assert!(!trie.contains("CA"));
        assert!(trie.has_prefix("CA"));
        assert!(!trie.has_prefix("X"));
    }

    #[test]
    fn test_walk() {
        let trie = Trie::from_words(["QUIT", "QUA"], 3);
        let qu = trie.walk(trie.root(), b"QU").unwrap();
        assert!(trie.has_children(qu));
        assert!(!trie.is_terminal(qu));
        let quit = trie.walk(qu, b"IT").unwrap();
        assert!(trie.is_terminal(quit));
        assert!(!trie.has_children(quit));
        assert_eq!(trie.walk(trie.root(), b"QX"), None);
        assert_eq!(trie.child(trie.root(), b'?'), None);
    }

    #[test]
    fn test_from_reader() {
        let text = "apple\nBanana\n\nab\n12ab\n";
        let trie = Trie::from_reader(Cursor::new(text), 3).unwrap();
        assert_eq!(trie.len(), 2);
        assert!(trie.contains("BANANA"));
        assert_eq!(trie.min_length(), 3);
    }

    #[test]
    fn test_load_missing() {
        let err = Trie::load("/nonexistent/words.txt", 3).unwrap_err();
        assert!(matches!(err, Error::DictionaryRead { .. }));
    }
}
