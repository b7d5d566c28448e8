//! Opening book.
//!
//! A deliberately small, line-oriented format: each line holds the first
//! four FEN fields of a position followed by a move in coordinate notation.
//! Lines starting with `#` are comments. Binary book formats are out of
//! scope; this satisfies the book contract the search consults before
//! thinking.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;

use rand::seq::SliceRandom;

use crate::coretypes::Move;
use crate::error::{self, Error, ErrorKind};
use crate::fen::Fen;
use crate::position::Position;

#[derive(Debug, Clone, Default)]
pub struct Book {
    name: String,
    entries: HashMap<String, Vec<Move>>,
}

impl Book {
    /// Load a book from a file.
    pub fn open<P: AsRef<Path>>(path: P) -> error::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|err| Error::new(ErrorKind::BookUnreadable, err))?;
        let mut book = Self::parse(&text)?;
        book.name = path.as_ref().to_string_lossy().into_owned();
        Ok(book)
    }

    /// Parse book text. Malformed lines are an error so broken books are
    /// noticed instead of silently playing from half a file.
    pub fn parse(text: &str) -> error::Result<Self> {
        let mut entries: HashMap<String, Vec<Move>> = HashMap::new();

        for (line_number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let mut key = String::new();
            for _ in 0..4 {
                let field = tokens.next().ok_or_else(|| {
                    Error::from((ErrorKind::BookUnreadable, format!("line {}", line_number + 1)))
                })?;
                let _ = write!(key, "{field} ");
            }
            key.pop();

            let move_str = tokens.next().ok_or_else(|| {
                Error::from((ErrorKind::BookUnreadable, format!("line {}", line_number + 1)))
            })?;
            let move_ = Move::from_str(move_str).map_err(|err| {
                Error::from((ErrorKind::BookUnreadable, format!("line {}: {err}", line_number + 1)))
            })?;

            entries.entry(key).or_default().push(move_);
        }

        Ok(Self {
            name: String::new(),
            entries,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a legal book move for a position. With `best_only` the first
    /// listed move wins; otherwise a uniformly random candidate is played.
    pub fn probe(&self, position: &Position, best_only: bool) -> Option<Move> {
        let key = position_key(position);
        let candidates = self.entries.get(&key)?;

        let legal: Vec<Move> = candidates
            .iter()
            .copied()
            .filter(|move_| position.is_legal_move(*move_))
            .collect();

        if best_only {
            legal.first().copied()
        } else {
            legal.choose(&mut rand::thread_rng()).copied()
        }
    }
}

/// The first four FEN fields: placement, side to move, castling, en passant.
/// Move counters are ignored so transpositions by move order still hit.
fn position_key(position: &Position) -> String {
    let fen = position.to_fen();
    fen.split_whitespace()
        .take(4)
        .collect::<Vec<&str>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOK_TEXT: &str = "\
# A tiny sample book.
rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - e2e4
rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - d2d4
rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - e7e5
";

    #[test]
    fn parse_and_probe() {
        let book = Book::parse(BOOK_TEXT).unwrap();
        assert_eq!(book.len(), 3);

        let start = Position::start_position();
        let best = book.probe(&start, true).unwrap();
        assert_eq!(best, Move::from_str("e2e4").unwrap());

        let any = book.probe(&start, false).unwrap();
        assert!(start.is_legal_move(any));
    }

    #[test]
    fn probe_misses_unknown_position() {
        let book = Book::parse(BOOK_TEXT).unwrap();
        let pos = Position::start_position().make_move(Move::from_str("a2a3").unwrap());
        assert_eq!(book.probe(&pos, true), None);
    }

    #[test]
    fn illegal_book_moves_are_filtered() {
        // Book claims a move that is not legal in the position.
        let text = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - e2e5\n";
        let book = Book::parse(text).unwrap();
        assert_eq!(book.probe(&Position::start_position(), true), None);
    }

    #[test]
    fn malformed_lines_error() {
        assert!(Book::parse("garbage line\n").is_err());
        assert!(Book::parse("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - zz99\n").is_err());
    }
}
