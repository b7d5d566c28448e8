//! MoveList types used in the engine.
//!
//! The underlying container may change during pre-1.0 development,
//! so type aliases make changes easy.

use arrayvec::ArrayVec;

use crate::coretypes::{Move, MoveInfo, MAX_HISTORY, MAX_LINE_LEN, MAX_MOVES};

/// MoveList is a container that can hold at most `MAX_MOVES`, the most number
/// of moves per any chess position.
pub type MoveList = ArrayVec<Move, MAX_MOVES>;

/// MoveInfoList is like MoveList however it also holds metadata for its moves.
pub type MoveInfoList = ArrayVec<MoveInfo, MAX_MOVES>;

/// Line is a sequence of legal moves that can be applied to a position.
/// Useful for retaining a principal variation found from a search.
pub type Line = ArrayVec<Move, MAX_LINE_LEN>;

/// The sequence of moves played over a full game.
pub type MoveHistory = ArrayVec<Move, MAX_HISTORY>;

/// Join a line of moves with spaces, the way UCI `pv` expects.
pub fn line_to_string(line: &Line) -> String {
    line.iter()
        .map(|move_| move_.to_string())
        .collect::<Vec<String>>()
        .join(" ")
}
