//! Game structure and the position history used for repetition detection.

use arrayvec::ArrayVec;

use crate::coretypes::MAX_HISTORY;
use crate::error::{self, ErrorKind};
use crate::movelist::MoveHistory;
use crate::position::Position;
use crate::zobrist::HashKind;

/// Game contains information for an in progress game:
/// The base position the game started from, the sequence of moves that were
/// played, and the current position.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Game {
    pub base_position: Position,
    pub moves: MoveHistory,
    pub position: Position,
}

impl Game {
    /// Create a new Game from a base position and a sequence of moves.
    /// This generates the current position by applying the sequence of moves to the base.
    /// If a move in the move history was illegal, Err is returned.
    pub fn new(base_position: Position, moves: MoveHistory) -> error::Result<Self> {
        let mut position = base_position;

        for move_ in &moves {
            position
                .do_legal_move(*move_)
                .ok_or(ErrorKind::GameIllegalMove)?;
        }

        Ok(Self {
            base_position,
            moves,
            position,
        })
    }

    /// Create a new game in the standard chess start position.
    pub fn start_position() -> Self {
        Self::from(Position::start_position())
    }
}

/// Convert a position to a Game with no past moves.
impl From<Position> for Game {
    fn from(position: Position) -> Self {
        Self::new(position, MoveHistory::new()).unwrap()
    }
}

type HashHistory = ArrayVec<HashKind, MAX_HISTORY>;
type Unrepeatables = ArrayVec<usize, MAX_HISTORY>;

/// PositionHistory tracks visited positions to detect repetitions.
/// It is stateful, in that functions assume the next interaction comes from
/// the next possible move in a played game or search path.
///
/// It contains the hashes of all previously visited positions,
/// and the indices of positions which cannot be repeated in future positions.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PositionHistory {
    hash_history: HashHistory,    // All visited position hashes in order.
    unrepeatables: Unrepeatables, // Stack of unrepeatable position indices.
    head: usize,                  // Most recent unrepeatable position.
}

impl PositionHistory {
    /// Create a new empty PositionHistory.
    pub fn empty() -> Self {
        Self {
            hash_history: HashHistory::new(),
            unrepeatables: Unrepeatables::new(),
            head: 0,
        }
    }

    /// Create a new PositionHistory from a game.
    pub fn new(game: &Game) -> Self {
        let mut history = Self::empty();
        let mut position = game.base_position;

        // Only push a move when it is in the past (original hash after a move is applied).
        // The final (current) position is not added to history because it is active.
        for move_ in &game.moves {
            let hash = position.key();
            let move_info = position.do_legal_move(*move_).expect("move not legal");

            history.push(hash, move_info.is_unrepeatable());
        }

        debug_assert_eq!(position, game.position);
        history
    }

    /// Pushes a new position into the hash history, and updates the most recent unrepeatable
    /// index if applicable.
    pub fn push(&mut self, hash: HashKind, is_unrepeatable: bool) {
        self.hash_history.push(hash);

        if is_unrepeatable {
            self.unrepeatables.push(self.head);
            self.head = self.hash_history.len().saturating_sub(1);
        }
    }

    /// Pops a position from history stack. If the popped item was the most recent unrepeatable,
    /// then replace it with the previous unrepeatable index.
    pub fn pop(&mut self) {
        self.hash_history.pop();

        // If the current head exceeds the limit, replace it with the previous unrepeatable index.
        if self.head >= self.hash_history.len() {
            self.head = self.unrepeatables.pop().unwrap_or(0);
        }
    }

    pub fn len(&self) -> usize {
        self.hash_history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hash_history.is_empty()
    }

    /// Returns true if the position occurs at least once in history.
    /// This is done by only checking the history from the last unrepeatable index to the
    /// most recent entry. All positions before the index cannot reoccur.
    pub fn contains(&self, hash: HashKind) -> bool {
        self.contains_n(hash, 1)
    }

    /// Returns true if the position occurs in history at least `n` times,
    /// assuming the position to check may be the next move in this game's history.
    pub fn contains_n(&self, hash: HashKind, count: usize) -> bool {
        let mut counter = 0;
        self.hash_history[self.head..].iter().rev().any(|old_hash| {
            if *old_hash == hash {
                counter += 1;
                if counter >= count {
                    return true;
                }
            }
            false
        })
    }

    /// Returns true if the position occurs twice in history, indicating that the given
    /// position is the second repetition (position occurs total of three times).
    pub fn is_threefold_repetition(&self, hash: HashKind) -> bool {
        self.contains_n(hash, 2)
    }

    /// Returns true if the position occurs once in history, indicating that
    /// the given position is the first repetition (position occurs total of two times).
    pub fn is_twofold_repetition(&self, hash: HashKind) -> bool {
        self.contains(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coretypes::{Move, Square::*};
    use crate::Position;

    #[test]
    fn position_with_no_history() {
        let game = Game::from(Position::start_position());
        let history = PositionHistory::new(&game);

        assert_eq!(history.head, 0);
        assert_eq!(history.hash_history.len(), 0);
        assert_eq!(history.unrepeatables.len(), 0);
    }

    #[test]
    fn repetition_found_after_shuffle() {
        // Knights out and back: start position occurs again.
        let moves: MoveHistory = [
            Move::new(G1, F3, None),
            Move::new(G8, F6, None),
            Move::new(F3, G1, None),
            Move::new(F6, G8, None),
        ]
        .into_iter()
        .collect();
        let game = Game::new(Position::start_position(), moves).unwrap();
        let history = PositionHistory::new(&game);

        // Current position equals the start position, seen once before.
        assert!(history.is_twofold_repetition(game.position.key()));
        assert!(!history.is_threefold_repetition(game.position.key()));
    }

    #[test]
    fn unrepeatable_cuts_off_search() {
        let mut history = PositionHistory::empty();
        history.push(111, false);
        history.push(222, true); // pawn move or capture happened here
        history.push(333, false);

        // 111 is before the unrepeatable watermark.
        assert!(!history.contains(111));
        assert!(history.contains(333));

        history.pop();
        history.pop();
        // Watermark restored, old positions visible again.
        assert!(history.contains(111));
    }
}
