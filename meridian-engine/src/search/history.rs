//! Move ordering statistics: per-(piece, to-square) history bonuses for
//! quiet moves that cause cutoffs, and gain estimates for quiet moves.
//!
//! Cells are relaxed atomics so all search threads share one table. Racy
//! read-modify-write cycles are accepted; the values are only heuristics.

use std::sync::atomic::{AtomicI32, Ordering};

use crate::coretypes::{Cp, CpKind, Piece, Square, SquareIndexable, NUM_PIECE_KINDS, NUM_SQUARES};

/// Saturation point for history scores.
const HISTORY_MAX: i32 = 2000;

pub struct History {
    history: [[AtomicI32; NUM_SQUARES]; NUM_PIECE_KINDS],
    gains: [[AtomicI32; NUM_SQUARES]; NUM_PIECE_KINDS],
}

impl History {
    pub fn new() -> Self {
        Self {
            history: std::array::from_fn(|_| std::array::from_fn(|_| AtomicI32::new(0))),
            gains: std::array::from_fn(|_| std::array::from_fn(|_| AtomicI32::new(0))),
        }
    }

    pub fn clear(&self) {
        for row in self.history.iter().chain(self.gains.iter()) {
            for cell in row {
                cell.store(0, Ordering::Relaxed);
            }
        }
    }

    /// Ordering score for a quiet move of `piece` to `to`.
    pub fn value(&self, piece: Piece, to: Square) -> i32 {
        self.history[piece.dense_idx()][to.idx()].load(Ordering::Relaxed)
    }

    /// Reward or punish a quiet move. The score saturates toward
    /// `HISTORY_MAX` so old statistics decay as new ones arrive.
    pub fn update(&self, piece: Piece, to: Square, bonus: i32) {
        let cell = &self.history[piece.dense_idx()][to.idx()];
        let old = cell.load(Ordering::Relaxed);
        let new = old + bonus - old * bonus.abs() / HISTORY_MAX;
        cell.store(new.clamp(-HISTORY_MAX, HISTORY_MAX), Ordering::Relaxed);
    }

    /// Expected static-eval swing of playing a quiet move of `piece` to `to`.
    pub fn gain(&self, piece: Piece, to: Square) -> Cp {
        Cp(self.gains[piece.dense_idx()][to.idx()].load(Ordering::Relaxed))
    }

    /// Track the maximum observed eval swing, decaying stale peaks slowly.
    pub fn update_gain(&self, piece: Piece, to: Square, gain: Cp) {
        let cell = &self.gains[piece.dense_idx()][to.idx()];
        let old = cell.load(Ordering::Relaxed);
        let new = if gain.0 >= old { gain.0 } else { old - 1 };
        cell.store(new, Ordering::Relaxed);
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

/// Cutoff bonus for a quiet move searched to `depth` fractional plies.
pub fn history_bonus(depth: crate::coretypes::Depth) -> i32 {
    let d = depth as CpKind;
    d * d
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coretypes::{Color, PieceKind, Square::*, ONE_PLY};

    #[test]
    fn update_and_read_back() {
        let history = History::new();
        let knight = Piece::new(Color::White, PieceKind::Knight);

        assert_eq!(history.value(knight, F3), 0);
        history.update(knight, F3, history_bonus(4 * ONE_PLY));
        assert!(history.value(knight, F3) > 0);

        history.update(knight, F3, -history_bonus(4 * ONE_PLY));
        // A penalty moves the score back down but need not cancel exactly.
        assert!(history.value(knight, F3) < history_bonus(4 * ONE_PLY));
    }

    #[test]
    fn saturation() {
        let history = History::new();
        let queen = Piece::new(Color::Black, PieceKind::Queen);
        for _ in 0..1000 {
            history.update(queen, D8, 500);
        }
        assert!(history.value(queen, D8) <= HISTORY_MAX);
    }

    #[test]
    fn gains_track_maximum() {
        let history = History::new();
        let rook = Piece::new(Color::White, PieceKind::Rook);

        history.update_gain(rook, E1, Cp(35));
        assert_eq!(history.gain(rook, E1), Cp(35));

        // Lower observations decay the stored peak by one.
        history.update_gain(rook, E1, Cp(10));
        assert_eq!(history.gain(rook, E1), Cp(34));

        history.update_gain(rook, E1, Cp(60));
        assert_eq!(history.gain(rook, E1), Cp(60));
    }
}
