//! Quiescence Search
//!
//! When a position is being searched, nodes at the final depth (leaf nodes)
//! can be either terminal or non-terminal. Statically evaluating non-terminal
//! leaf nodes leads to the horizon effect: an engine may see Queen x Pawn as
//! winning while right over the horizon sits Pawn x Queen.
//!
//! To reduce the horizon effect, quiescence search extends the frontier over
//! noisy moves only: captures, queen promotions, and, near the top of the
//! quiescence tree, checking moves, until the position is quiet enough to
//! stand on its static evaluation.

use std::sync::Arc;

use crate::coretypes::{
    Cp, Move, PieceKind, Square, DEPTH_QS_CHECKS, DEPTH_QS_NO_CHECKS, MAX_PLY, ONE_PLY,
};
use crate::moveorder::MovePicker;
use crate::search::Searcher;
use crate::transposition::{ok_to_use_tt, refine_eval, value_from_tt, value_to_tt, Bound};

impl Searcher {
    /// Search only noisy moves until the position quiets down, returning a
    /// value relative to the player to move.
    pub(crate) fn qsearch<const PV: bool>(
        &mut self,
        mut alpha: Cp,
        beta: Cp,
        depth: crate::coretypes::Depth,
        ply: usize,
    ) -> Cp {
        debug_assert!(alpha >= -Cp::INFINITE && alpha < beta && beta <= Cp::INFINITE);
        debug_assert!(PV || alpha == beta - Cp(1));
        debug_assert!(depth <= 0);

        let shared = Arc::clone(&self.shared);
        self.count_node();

        let old_alpha = alpha;
        let us = *self.pos.player();
        let node_hash = self.pos.key();

        {
            let frame = self.frame_mut(ply);
            frame.current_move = Move::NONE;
            frame.gain_eligible = false;
        }

        // Check for an instant draw or maximum ply reached.
        if ply >= MAX_PLY || self.is_draw() {
            return Cp::DRAW;
        }

        // Decide whether to include checks. This also fixes the depth class
        // used for transposition entries: quiescence stores only under the
        // two quiescence depth sentinels.
        let in_check = self.pos.is_in_check();
        let tt_depth = if in_check || depth >= DEPTH_QS_CHECKS {
            DEPTH_QS_CHECKS
        } else {
            DEPTH_QS_NO_CHECKS
        };

        // Transposition table lookup. At PV nodes the table only orders
        // moves; at non-PV nodes a usable bound returns immediately.
        let mut tte = shared.tt.probe(node_hash);
        let mut tt_move = Move::NONE;
        if let Some(entry) = tte {
            if entry.move_.is_some() {
                if self.pos.is_legal_move(entry.move_) {
                    tt_move = entry.move_;
                } else {
                    tte = None;
                }
            }
        }
        if let Some(entry) = tte {
            let inconsistent = if in_check {
                entry.eval != Cp::NONE || entry.eval_margin != Cp::NONE
            } else {
                entry.eval == Cp::NONE || entry.eval_margin == Cp::NONE
            };
            if inconsistent {
                tte = None;
            }
        }

        if !PV {
            if let Some(entry) = tte {
                if entry.value != Cp::NONE && ok_to_use_tt(&entry, tt_depth, beta, ply) {
                    let value = value_from_tt(entry.value, ply);
                    self.frame_mut(ply).current_move = tt_move;
                    if value >= Cp::MATE_IN_MAX_PLY {
                        self.frame_mut(ply).mate_killer = tt_move;
                    }
                    return value;
                }
            }
        }

        // Evaluate the position statically.
        let mut best_value;
        let mut futility_base = -Cp::INFINITE;
        let enough_material;
        if in_check {
            best_value = -Cp::INFINITE;
            let frame = self.frame_mut(ply);
            frame.eval = Cp::NONE;
            frame.eval_margin = Cp::NONE;
            enough_material = false;
        } else {
            if let Some(entry) = tte {
                {
                    let frame = self.frame_mut(ply);
                    frame.eval = entry.eval;
                    frame.eval_margin = entry.eval_margin;
                }
                best_value = entry.eval;
                if entry.value != Cp::NONE
                    && (!PV
                        || entry.bound == Bound::EXACT
                        || value_from_tt(entry.value, ply).abs() >= Cp::KNOWN_WIN)
                {
                    best_value = refine_eval(&entry, entry.eval, ply);
                }
            } else {
                let (eval, margin) = crate::evaluation::evaluate_with_margin(&self.pos);
                let frame = self.frame_mut(ply);
                frame.eval = eval;
                frame.eval_margin = margin;
                best_value = eval;
            }

            // Save gain for the parent's quiet move.
            let parent = self.frame_back(ply, 1);
            let parent_move = parent.current_move;
            let parent_eval = parent.eval;
            let parent_eligible = parent.gain_eligible;
            let our_eval = self.frame(ply).eval;
            if parent_eligible
                && parent_move.is_some()
                && parent_eval != Cp::NONE
                && our_eval != Cp::NONE
            {
                if let Some(piece) = self.pos.pieces().piece_on(parent_move.to) {
                    shared
                        .history
                        .update_gain(piece, parent_move.to, -(parent_eval + our_eval));
                }
            }

            // Stand pat. Return immediately if the static value beats beta.
            if best_value >= beta {
                if tte.is_none() {
                    let frame = self.frame(ply);
                    shared.tt.store_eval(node_hash, frame.eval, frame.eval_margin);
                }
                return best_value;
            }

            if PV && best_value > alpha {
                alpha = best_value;
            }

            // Futility pruning parameters, not needed when in check.
            let frame = self.frame(ply);
            futility_base = frame.eval + frame.eval_margin + Cp(0x80);
            enough_material = self.pos.non_pawn_material(us) > PieceKind::Rook.centipawns();
        }

        // Only captures, queen promotions, and (inside the checking band)
        // quiet checks are generated; all evasions when in check.
        let mut picker =
            MovePicker::new_qsearch(&self.pos, tt_move, Arc::clone(&shared.history), depth);
        let mut best_move = Move::NONE;

        while alpha < beta {
            let info = match picker.next_move() {
                Some(info) => info,
                None => break,
            };
            let move_ = info.move_();
            let gives_check = self.pos.gives_check(move_);

            // Futility pruning: a capture whose victim cannot lift the score
            // to beta is not worth searching.
            if !PV
                && !in_check
                && !gives_check
                && move_ != tt_move
                && enough_material
                && !info.is_promotion()
                && !(info.piece_kind == PieceKind::Pawn && self.pos.pawn_is_passed(us, move_.to))
            {
                let victim_value = info
                    .captured()
                    .map(|kind| kind.endgame_centipawns())
                    .unwrap_or(Cp(0));
                let futility_value = futility_base + victim_value;

                if futility_value < beta {
                    if futility_value > best_value {
                        best_value = futility_value;
                    }
                    continue;
                }

                // Prune captures with no upside even before the margin.
                if futility_base < beta && self.pos.see(move_) <= 0 {
                    continue;
                }
            }

            // Detect non-capture evasions that are candidates to be pruned.
            let evasion_prunable = in_check
                && best_value > Cp::MATED_IN_MAX_PLY
                && !info.is_capture()
                && !self.pos.castling().has_any(crate::coretypes::Castling::side(us));

            // Don't search moves which lose material.
            if !PV
                && (!in_check || evasion_prunable)
                && move_ != tt_move
                && !info.is_promotion()
                && self.pos.see_sign(move_) < 0
            {
                continue;
            }

            // Don't search useless checks.
            if !PV
                && !in_check
                && gives_check
                && move_ != tt_move
                && move_ != self.frame(ply).mate_killer
                && self.frame_back(ply, 1).current_move != Move::NULL
                && !info.is_capture_or_promotion()
                && self.frame(ply).eval + Cp(PieceKind::Pawn.centipawns().0 / 6) < beta
                && !self.check_is_dangerous(&info, futility_base, beta)
            {
                continue;
            }

            {
                let frame = self.frame_mut(ply);
                frame.current_move = move_;
                frame.gain_eligible = false;
            }

            // Make and search the move.
            let move_info = self.pos.do_move(move_);
            self.rep.push(node_hash, move_info.is_unrepeatable());
            let value = -self.qsearch::<PV>(-beta, -alpha, depth - ONE_PLY, ply + 1);
            self.rep.pop();
            self.pos.undo_move(move_info);

            if value > best_value {
                best_value = value;
                if value > alpha {
                    alpha = value;
                    best_move = move_;
                    if value >= Cp::MATE_IN_MAX_PLY {
                        self.frame_mut(ply).mate_killer = move_;
                    }
                }
            }
        }

        self.frame_mut(ply).current_move = best_move;

        // All noisy moves searched. If we're in check with no legal moves,
        // it is checkmate.
        if in_check && best_value == -Cp::INFINITE {
            return Cp::mated_in(ply);
        }

        // Update the transposition table under the quiescence depth class.
        let bound = Bound::classify(best_value, old_alpha, beta);
        let frame = self.frame(ply);
        shared.tt.store(
            node_hash,
            value_to_tt(best_value, ply),
            bound,
            tt_depth,
            best_move,
            frame.eval,
            frame.eval_margin,
        );

        debug_assert!(best_value > -Cp::INFINITE && best_value < Cp::INFINITE);
        best_value
    }

    /// Tests if a checking move in quiescence is worth searching anyway:
    /// the king is on the board's edge, a queen gives contact check, or the
    /// check uncovers new attacks on enough undefended material.
    pub(crate) fn check_is_dangerous(&self, info: &crate::coretypes::MoveInfo, futility_base: Cp, beta: Cp) -> bool {
        use crate::bitboard::Bitboard;

        let pos = &self.pos;
        let us = *pos.player();
        let them = !us;
        let their_king: Square = pos.king_square(them);

        // Rule 1. King on the border.
        if Bitboard::EDGES.has_square(their_king) {
            return true;
        }

        // Rule 2. Queen contact check is very dangerous.
        let king_zone = crate::movegen::tables::king_pattern(their_king);
        if info.piece_kind == PieceKind::Queen && king_zone.has_square(info.to) {
            return true;
        }

        // Rule 3. The moved piece gains attacks on undefended material that
        // would carry the futility base past beta.
        let mut occupied = pos.occupied();
        occupied.clear_square(info.from);
        occupied.clear_square(their_king);
        let piece = crate::coretypes::Piece::new(us, info.piece_kind);
        let old_attacks = pos.attacks_from(piece, info.from, occupied);
        let new_attacks = pos.attacks_from(piece, info.to, occupied);
        let mut victims = pos.pieces().color_occupied(&them) & new_attacks & !old_attacks;
        victims.clear_square(their_king);

        for victim in victims {
            if let Some(kind) = pos.pieces().piece_kind_on(victim) {
                if futility_base + kind.endgame_centipawns() >= beta {
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::Fen;
    use crate::game::Game;
    use crate::position::Position;
    use crate::search::{SearchSettings, SearchShared, Searcher, Signals};
    use crate::threads::ThreadPool;
    use crate::timeman::{Mode, TimeManager};
    use crate::transposition::TranspositionTable;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU64};
    use std::sync::Arc;
    use std::time::Instant;

    fn searcher_for(fen: &str) -> Searcher {
        let pos = Position::parse_fen(fen).unwrap();
        let game = Game::from(pos);
        let settings = SearchSettings::from_mode(Mode::depth(1, None));
        let mode = settings.mode;
        let shared = Arc::new(SearchShared {
            tt: Arc::new(TranspositionTable::with_capacity(4096)),
            history: Arc::new(crate::search::History::new()),
            signals: Arc::new(Signals::new()),
            pool: ThreadPool::new(1),
            settings,
            time_manager: Mutex::new(TimeManager::new(&mode, crate::coretypes::Color::White)),
            start_time: Instant::now(),
            root_player: *game.position.player(),
            nodes: AtomicU64::new(0),
            nodes_between_polls: 1_000_000,
            current_depth: AtomicU32::new(0),
            aspiration_fail_low: AtomicBool::new(false),
            first_root_move: AtomicBool::new(false),
            last_info_ms: AtomicU64::new(0),
            draw_anchor: AtomicI32::new(0),
        });
        Searcher::new(shared, 0, &game)
    }

    #[test]
    fn qsearch_value_in_bounds() {
        let mut searcher = searcher_for("4k3/8/2p5/3p4/4P3/8/3Q4/4K3 w - - 0 1");
        let value = searcher.qsearch::<true>(-Cp::INFINITE, Cp::INFINITE, 0, 0);
        assert!(value > -Cp::CHECKMATE && value < Cp::CHECKMATE);
    }

    #[test]
    fn qsearch_resolves_hanging_queen() {
        // Black queen hangs on d5; quiescence must cash it in rather than
        // trust the calm material count.
        let mut searcher = searcher_for("4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1");
        let value = searcher.qsearch::<true>(-Cp::INFINITE, Cp::INFINITE, 0, 0);
        assert!(value >= Cp(300), "expected material win, got {value}");
    }

    #[test]
    fn qsearch_checkmate_detection() {
        // Back-rank mate already delivered; side to move is mated.
        let mut searcher = searcher_for("6k1/5ppp/8/8/8/8/8/R5K1 b - - 0 1");
        // Not actually mate: black king has moves. Instead use a real mate.
        let mut mated = searcher_for("R5k1/5ppp/8/8/8/8/8/6K1 b - - 0 1");
        let value = mated.qsearch::<true>(-Cp::INFINITE, Cp::INFINITE, 0, 0);
        assert_eq!(value, Cp::mated_in(0));

        let value = searcher.qsearch::<true>(-Cp::INFINITE, Cp::INFINITE, 0, 0);
        assert!(value > Cp::MATED_IN_MAX_PLY);
    }

    #[test]
    fn stand_pat_respects_beta() {
        // Quiet, materially even position: stand pat should come back fast
        // and inside the window.
        let mut searcher = searcher_for("4k3/pppp4/8/8/8/8/PPPP4/4K3 w - - 0 1");
        let value = searcher.qsearch::<false>(Cp(-50), Cp(-49), 0, 0);
        assert!(value >= Cp(-49));
    }
}
