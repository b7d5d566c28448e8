//! Main recursive search: a negamax alpha-beta with a pipeline of pruning
//! and extension steps ahead of the move loop, specialised by node class.
//!
//! The node class is a compile-time parameter triple `<PV, SP, ROOT>`:
//! principal variation nodes search with an open window, split point nodes
//! re-enter the move loop of a node another thread started, and the root
//! node additionally maintains the root move list. Split point nodes skip
//! everything before the move loop; the master already did that work.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::coretypes::{
    Cp, CpKind, Depth, Move, MoveInfo, Piece, PieceKind, Rank, DEPTH_NONE, DEPTH_QS_NO_CHECKS,
    DEPTH_ZERO, MAX_PLY, ONE_PLY,
};
use crate::movegen as mg;
use crate::movelist::{Line, MoveList};
use crate::moveorder::MovePicker;
use crate::position::Position;
use crate::search::history::history_bonus;
use crate::search::{
    futility_margin, futility_move_count, reduction, Excluded, Searcher,
};
use crate::threads::SplitPoint;
use crate::transposition::{
    ok_to_use_tt, refine_eval, value_from_tt, value_to_tt, Bound, TTEntry,
};
use crate::uci::{UciInfo, UciResponse};

/// Maximum depth for razoring.
const RAZOR_DEPTH: Depth = 4 * ONE_PLY;
/// Maximum depth for dynamic threat detection when a null move fails low.
const THREAT_DEPTH: Depth = 5 * ONE_PLY;
/// Null move verification starts at this depth.
const NULL_VERIFICATION_DEPTH: Depth = 8 * ONE_PLY;
/// Minimum depth for internal iterative deepening, by node class.
const IID_DEPTH: [Depth; 2] = [8 * ONE_PLY, 5 * ONE_PLY];
/// Non-PV nodes only try IID when the static eval is near beta.
const IID_MARGIN: Cp = Cp(0x100);
/// Minimum depth for the singular extension search, by node class.
const SINGULAR_EXTENSION_DEPTH: [Depth; 2] = [8 * ONE_PLY, 6 * ONE_PLY];

/// Extensions indexed by node class: `[non-PV, PV]`.
const CHECK_EXTENSION: [Depth; 2] = [ONE_PLY / 2, ONE_PLY];
const PAWN_ENDGAME_EXTENSION: [Depth; 2] = [DEPTH_ZERO, ONE_PLY];
const PAWN_PUSH_TO_7TH_EXTENSION: [Depth; 2] = [ONE_PLY / 2, ONE_PLY / 2];
const PASSED_PAWN_EXTENSION: [Depth; 2] = [DEPTH_ZERO, ONE_PLY / 2];

/// Dynamic razoring margin based on depth.
fn razor_margin(depth: Depth) -> Cp {
    Cp(0x200 + 0x10 * depth as CpKind)
}

impl Searcher {
    /// Recurse into either the main search or the quiescence search,
    /// depending on the remaining depth.
    pub(crate) fn search_dispatch<const PV: bool>(
        &mut self,
        pv: &mut Line,
        alpha: Cp,
        beta: Cp,
        depth: Depth,
        ply: usize,
    ) -> Cp {
        if depth < ONE_PLY {
            self.qsearch::<PV>(alpha, beta, DEPTH_ZERO, ply)
        } else {
            self.search::<PV, false, false>(pv, alpha, beta, depth, ply)
        }
    }

    /// The main search function for PV, non-PV, split point, and root nodes.
    pub(crate) fn search<const PV: bool, const SP: bool, const ROOT: bool>(
        &mut self,
        pv: &mut Line,
        mut alpha: Cp,
        mut beta: Cp,
        depth: Depth,
        ply: usize,
    ) -> Cp {
        debug_assert!(alpha >= -Cp::INFINITE && alpha < beta && beta <= Cp::INFINITE);
        debug_assert!(PV || alpha == beta - Cp(1));
        debug_assert!(!ROOT || (PV && !SP));
        debug_assert!(depth >= ONE_PLY);

        let shared = Arc::clone(&self.shared);
        self.count_node();

        let old_alpha = alpha;
        let us = *self.pos.player();
        let them = !us;
        let in_check = self.pos.is_in_check();
        let node_hash = self.pos.key();

        let mut best_value = -Cp::INFINITE;
        let mut best_move = Move::NONE;
        let mut threat_move = Move::NONE;
        let mut tte: Option<TTEntry> = None;
        let mut tt_move = Move::NONE;
        let mut excluded = Excluded::None;
        let mut pos_key = node_hash;

        // Step 1. Initialize this node's frame and the state the children read.
        {
            let frame = self.frame_mut(ply);
            frame.current_move = Move::NONE;
            frame.gain_eligible = false;
        }
        {
            let child = self.frame_mut(ply + 1);
            child.excluded = Excluded::None;
            child.skip_null_move = false;
            child.broken_threat = false;
            child.reduction = DEPTH_ZERO;
        }
        {
            let grandchild = self.frame_mut(ply + 2);
            grandchild.killers = [Move::NONE; 2];
            grandchild.mate_killer = Move::NONE;
        }

        let sp: Option<Arc<SplitPoint>> = if SP { self.active_sp.clone() } else { None };

        if SP {
            // Probing, pruning, and extensions were already done by the
            // master before it split; jump straight into the move loop.
            threat_move = sp.as_ref().unwrap().threat_move;
        } else {
            // Step 2. Check for an aborted search or an immediate draw.
            if !ROOT {
                if shared.signals.stop_requested()
                    || self.cutoff_occurred()
                    || self.is_draw()
                    || ply >= MAX_PLY
                {
                    return Cp::DRAW;
                }

                // Step 3. Mate distance pruning.
                alpha = std::cmp::max(Cp::mated_in(ply), alpha);
                beta = std::cmp::min(Cp::mate_in(ply + 1), beta);
                if alpha >= beta {
                    return alpha;
                }
            }

            // Step 4. Transposition table lookup. An excluded move changes
            // the position key so the exclusion subtree cannot shadow the
            // main entry.
            excluded = self.frame(ply).excluded;
            pos_key = if excluded.is_none() {
                node_hash
            } else {
                self.pos.exclusion_key() ^ excluded.key_bits()
            };
            tte = shared.tt.probe(pos_key);

            if ROOT {
                tt_move = self.rml.first().map(|rm| rm.pv[0]).unwrap_or(Move::NONE);
            } else if let Some(entry) = tte {
                if entry.move_.is_some() {
                    if self.pos.is_legal_move(entry.move_) {
                        tt_move = entry.move_;
                    } else {
                        // A hash collision produced a bogus move. Treat the
                        // whole probe as a miss.
                        tte = None;
                    }
                }
            }

            // An entry whose static eval does not match our in-check state
            // was stored under a colliding key.
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

            // At PV nodes only exact scores inside the window are usable; at
            // non-PV nodes any bound on the right side of beta cuts.
            if !ROOT {
                if let Some(entry) = tte {
                    if entry.value != Cp::NONE {
                        let value = value_from_tt(entry.value, ply);
                        let usable = if PV {
                            entry.depth >= depth
                                && entry.bound == Bound::EXACT
                                && value > alpha
                                && value < beta
                        } else {
                            ok_to_use_tt(&entry, depth, beta, ply)
                        };

                        if usable {
                            // Refresh so the entry survives this generation.
                            shared.tt.store(
                                pos_key,
                                entry.value,
                                entry.bound,
                                entry.depth,
                                entry.move_,
                                entry.eval,
                                entry.eval_margin,
                            );
                            self.frame_mut(ply).current_move = tt_move;
                            if value >= Cp::MATE_IN_MAX_PLY {
                                self.frame_mut(ply).mate_killer = tt_move;
                            }
                            if value >= beta
                                && tt_move.is_some()
                                && !self.pos.move_info(tt_move).is_capture_or_promotion()
                                && tt_move != self.frame(ply).killers[0]
                            {
                                let frame = self.frame_mut(ply);
                                frame.killers[1] = frame.killers[0];
                                frame.killers[0] = tt_move;
                            }
                            return value;
                        }
                    }
                }
            }

            // Step 5. Static evaluation and parent gain statistics.
            let mut refined = -Cp::INFINITE;
            if in_check {
                let frame = self.frame_mut(ply);
                frame.eval = Cp::NONE;
                frame.eval_margin = Cp::NONE;
            } else {
                if let Some(entry) = tte {
                    let frame = self.frame_mut(ply);
                    frame.eval = entry.eval;
                    frame.eval_margin = entry.eval_margin;
                    refined = if entry.value != Cp::NONE {
                        refine_eval(&entry, entry.eval, ply)
                    } else {
                        entry.eval
                    };
                } else {
                    let (eval, margin) = crate::evaluation::evaluate_with_margin(&self.pos);
                    let frame = self.frame_mut(ply);
                    frame.eval = eval;
                    frame.eval_margin = margin;
                    refined = eval;
                    shared.tt.store_eval(pos_key, eval, margin);
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
            }

            // Step 6. Razoring (omitted at PV nodes).
            if !PV
                && depth < RAZOR_DEPTH
                && !in_check
                && tt_move.is_none()
                && excluded.is_none()
                && refined + razor_margin(depth) < beta
                && beta.abs() < Cp::MATE_IN_MAX_PLY
                && !self.pos.has_pawn_on_7th(us)
            {
                let rbeta = beta - razor_margin(depth);
                let value = self.qsearch::<false>(rbeta - Cp(1), rbeta, DEPTH_ZERO, ply);
                if value < rbeta {
                    return value;
                }
            }

            // Step 7. Static null move pruning (omitted at PV nodes). We bet
            // the opponent cannot swing the score by a futility margin even
            // if we pass.
            if !PV
                && !self.frame(ply).skip_null_move
                && depth < RAZOR_DEPTH
                && !in_check
                && refined - futility_margin(depth, 0) >= beta
                && beta.abs() < Cp::MATE_IN_MAX_PLY
                && self.pos.non_pawn_material(us) > Cp(0)
            {
                return refined - futility_margin(depth, 0);
            }

            // Step 8. Null move search with verification at high depths.
            if !PV
                && !self.frame(ply).skip_null_move
                && depth > ONE_PLY
                && !in_check
                && refined >= beta
                && beta.abs() < Cp::MATE_IN_MAX_PLY
                && self.pos.non_pawn_material(us) > Cp(0)
            {
                {
                    let frame = self.frame_mut(ply);
                    frame.current_move = Move::NULL;
                    frame.gain_eligible = false;
                }

                // Reduction grows with depth, plus one ply when the eval is
                // a full pawn above beta.
                let mut r = 3 * ONE_PLY + depth / 4;
                if refined - PieceKind::Pawn.centipawns() > beta {
                    r += ONE_PLY;
                }

                let cache = self.pos.do_null_move();
                self.rep.push(node_hash, true);
                self.frame_mut(ply + 1).skip_null_move = true;
                let mut scratch = Line::new();
                let null_value =
                    -self.search_dispatch::<false>(&mut scratch, -beta, -alpha, depth - r, ply + 1);
                self.frame_mut(ply + 1).skip_null_move = false;
                self.rep.pop();
                self.pos.undo_null_move(cache);

                if null_value >= beta {
                    // Do not return unproven mate scores.
                    let null_value = if null_value >= Cp::MATE_IN_MAX_PLY {
                        beta
                    } else {
                        null_value
                    };

                    if depth < NULL_VERIFICATION_DEPTH {
                        return null_value;
                    }

                    // Verify the null result with a reduced normal search.
                    self.frame_mut(ply).skip_null_move = true;
                    let verified = self.search_dispatch::<false>(
                        &mut scratch,
                        beta - Cp(1),
                        beta,
                        depth - r,
                        ply,
                    );
                    self.frame_mut(ply).skip_null_move = false;

                    if verified >= beta {
                        return null_value;
                    }

                    // The pass looked safe but a real line refutes it; treat
                    // the refutation as a threat against reduced parents.
                    self.frame_mut(ply).broken_threat = true;
                    if self.frame_back(ply, 1).reduction != DEPTH_ZERO {
                        return alpha;
                    }
                } else {
                    // The null move failed low: the opponent has an active
                    // idea. Remember which move refuted the pass.
                    threat_move = self.frame(ply + 1).current_move;

                    // Probcut: a shallow capture search against a raised
                    // beta can still prove this node good enough.
                    if depth < NULL_VERIFICATION_DEPTH {
                        let rbeta = std::cmp::max(
                            beta + Cp(200),
                            std::cmp::min(self.frame(ply).eval + Cp(100), Cp::KNOWN_WIN),
                        );
                        let d = depth - 4 * ONE_PLY;
                        let mut picker = MovePicker::new_qsearch(
                            &self.pos,
                            tt_move,
                            Arc::clone(&shared.history),
                            DEPTH_QS_NO_CHECKS,
                        );
                        while let Some(info) = picker.next_move() {
                            if self.must_stop() {
                                break;
                            }
                            let move_ = info.move_();
                            {
                                let frame = self.frame_mut(ply);
                                frame.current_move = move_;
                                frame.gain_eligible = false;
                            }
                            let move_info = self.pos.do_move(move_);
                            self.rep.push(node_hash, move_info.is_unrepeatable());
                            let value = -self.search_dispatch::<false>(
                                &mut scratch,
                                -rbeta,
                                -rbeta + Cp(1),
                                d,
                                ply + 1,
                            );
                            self.rep.pop();
                            self.pos.undo_move(move_info);

                            if value >= rbeta {
                                return value;
                            }
                        }
                    }

                    // A mate threat against a side with a material edge
                    // poisons pruning decisions above us.
                    if null_value <= Cp::MATED_IN_MAX_PLY
                        && self.pos.non_pawn_material(us) - self.pos.non_pawn_material(them)
                            >= PieceKind::Knight.centipawns()
                    {
                        self.frame_mut(ply).broken_threat = true;
                        if self.frame_back(ply, 1).reduction != DEPTH_ZERO {
                            return alpha;
                        }
                    }

                    let prev_move = self.frame_back(ply, 1).current_move;
                    if depth < THREAT_DEPTH
                        && self.frame_back(ply, 1).reduction != DEPTH_ZERO
                        && threat_move.is_some()
                        && prev_move.is_some()
                        && connected_moves(&self.pos, prev_move, threat_move)
                    {
                        self.frame_mut(ply).broken_threat = true;
                        return alpha;
                    }
                }
            }

            // Step 9. Internal iterative deepening populates a hash move
            // when the table has none.
            if tt_move.is_none()
                && depth >= IID_DEPTH[PV as usize]
                && (PV
                    || self.frame(ply).broken_threat
                    || (!in_check && self.frame(ply).eval + IID_MARGIN >= beta))
            {
                let d = if PV { depth - 2 * ONE_PLY } else { depth / 2 };

                self.frame_mut(ply).skip_null_move = true;
                let mut iid_pv = Line::new();
                self.search_dispatch::<PV>(&mut iid_pv, alpha, beta, d, ply);
                if excluded.is_none() {
                    self.frame_mut(ply).skip_null_move = false;
                }

                tt_move = self.frame(ply).current_move;
                if !tt_move.is_some() {
                    tt_move = Move::NONE;
                }
                tte = shared.tt.probe(pos_key);
            }
        }

        // Move loop prologue; at split points this is where search resumes.
        let futility_base = if in_check {
            Cp::NONE
        } else {
            self.frame(ply).eval + self.frame(ply).eval_margin
        };

        let singular_node = !ROOT
            && !SP
            && depth >= SINGULAR_EXTENSION_DEPTH[PV as usize]
            && tt_move.is_some()
            && excluded.is_none()
            && tte
                .map(|entry| {
                    entry.bound.is_lower()
                        && (entry.depth >= depth - 3 * ONE_PLY || self.frame(ply).broken_threat)
                })
                .unwrap_or(false);

        let mut picker = if SP || ROOT {
            None
        } else {
            Some(MovePicker::new(
                &self.pos,
                tt_move,
                Arc::clone(&shared.history),
                self.frame(ply).killers,
            ))
        };

        if SP {
            let state = sp.as_ref().unwrap().state.lock();
            best_value = state.best_value;
            best_move = state.best_move;
        }

        let mut move_count: usize = 0;
        let mut played_quiets = MoveList::new();
        let mut child_pv = Line::new();
        let mut child_pv_valid = false;
        let multipv = shared.settings.multipv.max(1);

        // Step 10. Loop through moves until none remain or beta cuts.
        loop {
            if best_value >= beta || self.must_stop() {
                break;
            }

            // Acquire the next move: from the shared picker under the split
            // point lock, from the root move list, or from our own picker.
            let info: MoveInfo = if SP {
                let sp_ref = sp.as_ref().unwrap();
                let mut state = sp_ref.state.lock();
                match state.picker.next_move() {
                    Some(info) => {
                        state.move_count += 1;
                        move_count = state.move_count;
                        alpha = state.alpha;
                        info
                    }
                    None => break,
                }
            } else if ROOT {
                if move_count >= self.rml.len() {
                    break;
                }
                let move_ = self.rml[move_count].pv[0];
                move_count += 1;
                self.pos.move_info(move_)
            } else {
                match picker.as_mut().unwrap().next_move() {
                    Some(info) => {
                        let move_ = info.move_();
                        // Honour the excluded move: skip the exact move, its
                        // class, and shuffles back to the previous square.
                        let excluded_match = match excluded {
                            Excluded::None => false,
                            Excluded::Move(x) => move_ == x,
                            Excluded::Class(kind) => info.piece_kind == kind,
                        };
                        let shuffles_back = !excluded.is_none()
                            && info.piece_kind != PieceKind::King
                            && {
                                let prev2 = self.frame_back(ply, 2).current_move;
                                prev2.is_some() && move_.to == prev2.from
                            };
                        if excluded_match || shuffles_back {
                            continue;
                        }
                        move_count += 1;
                        info
                    }
                    None => break,
                }
            };

            let move_ = info.move_();
            let mut root_nodes_before = 0;
            if ROOT {
                // Used by time management: most of the tree should belong
                // to the first root move before we stop early.
                shared
                    .first_root_move
                    .store(move_count == 1, Ordering::Relaxed);
                root_nodes_before = shared.nodes_searched();

                if shared.settings.emit_info
                    && shared.elapsed() > std::time::Duration::from_secs(3)
                {
                    let _ = UciResponse::new_info(
                        UciInfo::new().currmove(move_, move_count as u32),
                    )
                    .send();
                }
            }

            let gives_check = self.pos.gives_check(move_);
            if !SP && !excluded.is_none() && gives_check {
                // Checking moves are never representative during an
                // exclusion search.
                move_count -= 1;
                continue;
            }
            let capture_or_promotion = info.is_capture_or_promotion();
            let is_pv_move = PV
                && move_count
                    <= if ROOT {
                        if depth <= ONE_PLY {
                            usize::MAX
                        } else {
                            multipv
                        }
                    } else {
                        1
                    };

            // Step 11. Decide the new search depth.
            let (mut ext, dangerous) = self.extension::<PV>(&info, gives_check);

            // Singular extension: if every move but the hash move fails a
            // reduced search below the hash score, the hash move is the
            // only playable move and deserves a full extra ply.
            if singular_node && !SP && move_ == tt_move && ext < ONE_PLY {
                let tt_value = value_from_tt(tte.unwrap().value, ply);
                if tt_value != Cp::NONE && tt_value.abs() < Cp::KNOWN_WIN {
                    let rbeta = tt_value - Cp(depth as CpKind);
                    let exclusion = if !in_check
                        && !info.is_capture()
                        && (info.piece_kind == PieceKind::Pawn
                            || info.piece_kind == PieceKind::King
                            || gives_check)
                    {
                        Excluded::Class(info.piece_kind)
                    } else {
                        Excluded::Move(move_)
                    };

                    self.frame_mut(ply).excluded = exclusion;
                    self.frame_mut(ply).skip_null_move = true;
                    let mut scratch = Line::new();
                    let value = self.search::<false, false, false>(
                        &mut scratch,
                        rbeta - Cp(1),
                        rbeta,
                        depth / 2,
                        ply,
                    );
                    self.frame_mut(ply).skip_null_move = false;
                    self.frame_mut(ply).excluded = Excluded::None;

                    if value < rbeta {
                        ext = ONE_PLY;
                    }
                }
            }

            // Update current move (after the singular extension search).
            {
                let frame = self.frame_mut(ply);
                frame.current_move = move_;
                frame.gain_eligible =
                    !capture_or_promotion && !info.is_castle() && info.promotion.is_none();
            }
            let new_depth = depth - ONE_PLY + ext;
            let killers = self.frame(ply).killers;

            // Step 12. Futility pruning (omitted at PV nodes).
            if !PV
                && !ROOT
                && !capture_or_promotion
                && !in_check
                && !dangerous
                && move_ != self.frame(ply).mate_killer
                && !info.is_castle()
                && best_value > Cp::MATED_IN_MAX_PLY
                && beta.abs() < Cp::MATE_IN_MAX_PLY
            {
                // Move count based pruning.
                if move_count >= futility_move_count(depth)
                    && (!threat_move.is_some()
                        || !connected_threat(&self.pos, &info, threat_move))
                    && best_value >= futility_base - PieceKind::Pawn.centipawns()
                {
                    continue;
                }

                // Value based pruning against the depth this move would
                // really be searched at after reductions.
                let mut predicted_depth = new_depth;
                let prev_move = self.frame_back(ply, 1).current_move;
                if prev_move != Move::NULL && move_ != killers[0] && move_ != killers[1] {
                    predicted_depth -= reduction(false, depth, move_count);
                }
                let piece = Piece::new(us, info.piece_kind);
                let futility_value = futility_base
                    + futility_margin(predicted_depth, move_count)
                    + shared.history.gain(piece, move_.to);

                if futility_value < beta {
                    if SP {
                        let sp_ref = sp.as_ref().unwrap();
                        let mut state = sp_ref.state.lock();
                        if futility_value > state.best_value {
                            state.best_value = futility_value;
                        }
                        best_value = state.best_value;
                    } else if futility_value > best_value {
                        best_value = futility_value;
                    }
                    continue;
                }

                // Losing captures of defended pawns dressed as quiet moves.
                if predicted_depth < 2 * ONE_PLY && self.pos.see_sign(move_) < 0 {
                    continue;
                }
            }

            // Step 13. Make the move.
            let move_info = self.pos.do_move(move_);
            self.rep.push(node_hash, move_info.is_unrepeatable());
            if !SP && !capture_or_promotion && played_quiets.len() < played_quiets.capacity() {
                played_quiets.push(move_);
            }

            // Step 14. Reduced-depth search for late quiet moves. A fail
            // high re-searches at full depth.
            let mut value;
            let mut do_full_depth_search = !is_pv_move;

            if depth >= 3 * ONE_PLY
                && !is_pv_move
                && !capture_or_promotion
                && !dangerous
                && !info.is_castle()
                && move_ != killers[0]
                && move_ != killers[1]
            {
                let red = reduction(PV, depth, move_count);
                self.frame_mut(ply).reduction = red;
                let d = std::cmp::max(ONE_PLY, new_depth - red);
                if SP {
                    alpha = sp.as_ref().unwrap().state.lock().alpha;
                }
                value = -self.search_dispatch::<false>(
                    &mut child_pv,
                    -(alpha + Cp(1)),
                    -alpha,
                    d,
                    ply + 1,
                );
                do_full_depth_search = value > alpha && red != DEPTH_ZERO;
                self.frame_mut(ply).reduction = DEPTH_ZERO;
            } else {
                value = -Cp::INFINITE;
            }

            // Step 15. Full-depth zero window search.
            if do_full_depth_search {
                if SP {
                    alpha = sp.as_ref().unwrap().state.lock().alpha;
                }
                value = -self.search_dispatch::<false>(
                    &mut child_pv,
                    -(alpha + Cp(1)),
                    -alpha,
                    new_depth,
                    ply + 1,
                );
            }

            self.frame_mut(ply + 1).broken_threat = false;

            // PV search: first moves and zero-window fail-highs get the
            // full window, propagating the child PV.
            child_pv_valid = false;
            if PV && (is_pv_move || (value > alpha && (ROOT || value < beta))) {
                if ROOT && multipv > 1 && move_count <= multipv {
                    alpha = -Cp::INFINITE;
                }
                child_pv.clear();
                value =
                    -self.search_dispatch::<true>(&mut child_pv, -beta, -alpha, new_depth, ply + 1);
                child_pv_valid = true;
            }

            // Step 16. Undo the move.
            self.rep.pop();
            self.pos.undo_move(move_info);

            debug_assert!(value > -Cp::INFINITE && value < Cp::INFINITE || self.must_stop());

            // Step 17. Check for a new best move. At a split point all of
            // this happens under the lock.
            if SP {
                let sp_ref = sp.as_ref().unwrap();
                let cutoff = sp_ref.beta_cutoff_occurred();
                let mut state = sp_ref.state.lock();
                alpha = state.alpha;
                best_value = state.best_value;

                if value > best_value && !cutoff && !shared.signals.stop_requested() {
                    state.best_value = value;
                    best_value = value;
                    if value > alpha {
                        state.best_move = move_;
                        best_move = move_;
                        if PV && value < beta {
                            state.alpha = value;
                            alpha = value;
                        } else {
                            sp_ref.set_beta_cutoff();
                        }
                    }
                }
            } else if value > best_value {
                best_value = value;
                if value > alpha {
                    best_move = move_;
                    if PV && !ROOT {
                        // On a fail high the child line was never resolved
                        // with an open window; report the move alone.
                        if child_pv_valid {
                            compose_pv(pv, move_, &child_pv);
                        } else {
                            compose_pv(pv, move_, &Line::new());
                        }
                    }
                    if PV && !ROOT && value < beta {
                        alpha = value;
                    }
                }
            }

            if ROOT {
                // An interrupted search cannot be trusted past this point:
                // keep the previous iteration's ordering and scores.
                if shared.signals.stop_requested() {
                    break;
                }

                let nodes_spent = shared.nodes_searched() - root_nodes_before;
                let rm = &mut self.rml[move_count - 1];
                rm.nodes += nodes_spent;

                if is_pv_move || value > alpha {
                    rm.pv_score = value;
                    compose_pv(&mut rm.pv, move_, &child_pv);

                    if !is_pv_move && multipv == 1 {
                        // How often the best move changes feeds time
                        // management: instability earns more time.
                        self.best_move_changes += 1;
                    }

                    if multipv > 1 {
                        alpha = self.rml[std::cmp::min(move_count, multipv) - 1].pv_score;
                    } else if value > alpha {
                        // Experimental: at a suspected drawish anchor, keep
                        // the window a point below a zero score that the
                        // static eval disagrees with.
                        alpha = value
                            - if value == Cp(0) && self.frame(ply).eval > Cp(0) {
                                Cp(1)
                            } else {
                                Cp(0)
                            };
                    }

                    let anchor = shared.draw_anchor.load(Ordering::Relaxed);
                    if (alpha.0 >= anchor && anchor < 0) || (alpha.0 <= anchor && anchor > 0) {
                        shared.draw_anchor.store(0, Ordering::Relaxed);
                    }
                } else {
                    rm.pv_score = -Cp::INFINITE;
                }
            }

            // Step 18. Check for a split opportunity.
            if !ROOT
                && !SP
                && depth >= shared.pool.min_split_depth()
                && best_value < beta
                && excluded.is_none()
                && shared.pool.available_slave_exists()
                && !shared.signals.stop_requested()
                && !self.cutoff_occurred()
            {
                let pool = Arc::clone(&shared.pool);
                let (sp_best_value, sp_best_move, sp_alpha) = pool.split(
                    self,
                    PV,
                    ply,
                    depth,
                    alpha,
                    beta,
                    best_value,
                    best_move,
                    move_count,
                    threat_move,
                    picker.take().unwrap(),
                );
                best_value = sp_best_value;
                alpha = sp_alpha;
                if sp_best_move.is_some() {
                    best_move = sp_best_move;
                }
                // The split point consumed the rest of the move list.
                break;
            }
        }

        // Step 19. Mate and stalemate detection. With an excluded move a
        // "no moves" result only says the exclusion covered everything.
        if !SP {
            self.frame_mut(ply).current_move = best_move;
            if move_count == 0 {
                return if !excluded.is_none() {
                    old_alpha
                } else if in_check {
                    Cp::mated_in(ply)
                } else {
                    Cp::DRAW
                };
            }
        }

        // Step 20. Update transposition table, killers and history, unless
        // the result is tainted by a stop or cutoff.
        if !SP && !shared.signals.stop_requested() && !self.cutoff_occurred() {
            let bound = Bound::classify(best_value, old_alpha, beta);
            let store_depth = if self.frame(ply).broken_threat {
                DEPTH_NONE
            } else {
                depth
            };
            shared.tt.store(
                pos_key,
                value_to_tt(best_value, ply),
                bound,
                store_depth,
                best_move,
                self.frame(ply).eval,
                self.frame(ply).eval_margin,
            );

            if best_value >= Cp::MATE_IN_MAX_PLY {
                self.frame_mut(ply).mate_killer = best_move;
            }

            if best_value >= beta
                && best_move.is_some()
                && !self.pos.move_info(best_move).is_capture_or_promotion()
            {
                if best_move != self.frame(ply).killers[0] {
                    let frame = self.frame_mut(ply);
                    frame.killers[1] = frame.killers[0];
                    frame.killers[0] = best_move;
                }
                self.update_history(best_move, depth, &played_quiets);
            }
        }

        debug_assert!(
            best_value > -Cp::INFINITE && best_value < Cp::INFINITE || self.must_stop() || SP
        );
        best_value
    }

    /// Reward the cutoff move and punish the quiet moves searched before it.
    fn update_history(&self, best_move: Move, depth: Depth, played_quiets: &MoveList) {
        let us = *self.pos.player();
        let bonus = history_bonus(depth);

        let piece_of = |move_: &Move| {
            self.pos
                .pieces()
                .piece_kind_on(move_.from)
                .map(|kind| Piece::new(us, kind))
        };

        if let Some(piece) = piece_of(&best_move) {
            self.shared.history.update(piece, best_move.to, bonus);
        }
        for quiet in played_quiets {
            if *quiet == best_move {
                continue;
            }
            if let Some(piece) = piece_of(quiet) {
                self.shared.history.update(piece, quiet.to, -bonus);
            }
        }
    }

    /// Decide how much to extend a move, and whether it is too dangerous to
    /// prune or reduce even unextended.
    pub(crate) fn extension<const PV: bool>(
        &self,
        info: &MoveInfo,
        gives_check: bool,
    ) -> (Depth, bool) {
        let pos = &self.pos;
        let us = *pos.player();
        let them = !us;
        let move_ = info.move_();

        let mut result = DEPTH_ZERO;
        let mut dangerous = gives_check;

        // Safe checks with enough attacking material get extended.
        if gives_check
            && pos.non_pawn_material(us)
                >= PieceKind::Queen.centipawns() + PieceKind::Rook.centipawns()
            && pos.see_sign(move_) >= 0
        {
            result += CHECK_EXTENSION[PV as usize];
        }

        if info.piece_kind == PieceKind::Pawn {
            let to_rank = move_.to.rank().relative(us);
            if pos.pawn_is_passed(us, move_.to) && to_rank >= Rank::R4 {
                result += PASSED_PAWN_EXTENSION[PV as usize];
                if to_rank == Rank::R7 {
                    result += PAWN_PUSH_TO_7TH_EXTENSION[PV as usize];
                }
                dangerous = true;
            }
            // Pawns creeping toward the enemy king with queens on.
            if !pos.pieces[(us, PieceKind::Queen)].is_empty()
                && move_.to.distance(pos.king_square(them)) <= 2
            {
                dangerous = true;
            }
        }

        // Capturing the last enemy piece into a pure pawn endgame changes
        // the game's nature; look deeper.
        if let Some(captured) = info.captured() {
            if captured != PieceKind::Pawn
                && info.promotion.is_none()
                && !matches!(info.move_kind, crate::coretypes::MoveKind::EnPassant)
                && pos.non_pawn_material(crate::coretypes::Color::White)
                    + pos.non_pawn_material(crate::coretypes::Color::Black)
                    - captured.centipawns()
                    == Cp(0)
            {
                result += PAWN_ENDGAME_EXTENSION[PV as usize];
                dangerous = true;
            }
        }

        (std::cmp::min(result, ONE_PLY), dangerous)
    }
}

/// Append `[move, child pv...]` into `pv`, bounded by the line capacity.
pub(crate) fn compose_pv(pv: &mut Line, move_: Move, child_pv: &Line) {
    pv.clear();
    pv.push(move_);
    for child_move in child_pv {
        if pv.len() == pv.capacity() {
            break;
        }
        pv.push(*child_move);
    }
}

/// Tests whether two moves are 'connected' in the sense that the first move
/// somehow made the second move possible: same piece moving on, vacating the
/// destination, opening a line, or defending the destination. The first move
/// is the one that reached the current position; the second is a move from
/// the current position.
pub(crate) fn connected_moves(pos: &Position, m1: Move, m2: Move) -> bool {
    debug_assert!(m1.is_some() && m2.is_some());
    let (f1, t1) = (m1.from, m1.to);
    let (f2, t2) = (m2.from, m2.to);

    // Case 1: The moving piece is the same in both moves.
    if f2 == t1 {
        return true;
    }

    // Case 2: The destination square for m2 was vacated by m1.
    if t2 == f1 {
        return true;
    }

    // Case 3: Moving or checking through the vacated square.
    if let Some(piece) = pos.pieces().piece_on(f2) {
        if is_slider(piece.piece_kind) {
            let king = pos.king_square(*pos.player());
            if mg::squares_between(f2, t2).has_square(f1)
                || mg::squares_between(t2, king).has_square(f1)
            {
                return true;
            }
        }
    }

    // Case 4: The destination square for m2 is defended by the piece moved
    // in m1.
    if let Some(piece) = pos.pieces().piece_on(t1) {
        if pos.attacks_from(piece, t1, pos.occupied()).has_square(t2) {
            return true;
        }

        // Case 5: m1's piece now aims at our king through m2's origin, and
        // m2 does not block the line back.
        if is_slider(piece.piece_kind) {
            let king = pos.king_square(*pos.player());
            let between = mg::squares_between(t1, king);
            if between.has_square(f2) && !between.has_square(t2) {
                return true;
            }
        }
    }

    false
}

/// Tests whether pruning a quiet move is unsafe because it interacts with
/// the threat move found by a failed null search.
pub(crate) fn connected_threat(pos: &Position, info: &MoveInfo, threat: Move) -> bool {
    debug_assert!(threat.is_some());
    let (mfrom, mto) = (info.from, info.to);
    let (tfrom, tto) = (threat.from, threat.to);

    // Case 1: Don't prune moves which move the threatened piece.
    if mfrom == tto {
        return true;
    }

    // Case 2: If the threatened piece is worth at least the threatening
    // piece, don't prune moves which defend it.
    if let (Some(victim), Some(attacker)) = (
        pos.pieces().piece_kind_on(tto),
        pos.pieces().piece_kind_on(tfrom),
    ) {
        let defends = {
            // Does our move attack the threatened square after it is made?
            let piece = Piece::new(*pos.player(), info.promotion.unwrap_or(info.piece_kind));
            let mut occupied = pos.occupied();
            occupied.clear_square(mfrom);
            occupied.set_square(mto);
            pos.attacks_from(piece, mto, occupied).has_square(tto)
        };
        if (attacker.centipawns() >= victim.centipawns() || attacker == PieceKind::King) && defends
        {
            return true;
        }
    }

    // Case 3: Don't prune safe moves which block the threatening slider.
    if let Some(piece) = pos.pieces().piece_on(tfrom) {
        if is_slider(piece.piece_kind)
            && mg::squares_between(tfrom, tto).has_square(mto)
            && pos.see_sign(info.move_()) >= 0
        {
            return true;
        }
    }

    false
}

pub(crate) fn is_slider(kind: PieceKind) -> bool {
    matches!(kind, PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen)
}

/// Entry point for a recruited worker: rebuild search state from the split
/// point snapshots and join the shared move loop.
pub(crate) fn run_split_slave(sp: Arc<SplitPoint>, thread_id: usize) {
    let mut searcher = Searcher {
        shared: Arc::clone(&sp.shared),
        thread_id,
        pos: sp.pos,
        rep: sp.rep.clone(),
        stack: sp.frames.clone(),
        nodes_since_poll: 0,
        rml: Vec::new(),
        best_move_changes: 0,
        active_sp: Some(Arc::clone(&sp)),
    };

    run_split(&mut searcher, &sp);
}

/// The master joins its own split point as a worker.
pub(crate) fn run_split_master(searcher: &mut Searcher, sp: &Arc<SplitPoint>) {
    run_split(searcher, sp);
}

fn run_split(searcher: &mut Searcher, sp: &Arc<SplitPoint>) {
    let alpha = sp.state.lock().alpha;
    let mut scratch = Line::new();
    if sp.pv_node {
        searcher.search::<true, true, false>(&mut scratch, alpha, sp.beta, sp.depth, sp.ply);
    } else {
        searcher.search::<false, true, false>(&mut scratch, alpha, sp.beta, sp.depth, sp.ply);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::Fen;

    #[test]
    fn connected_moves_cases() {
        // After 1... Qd8-h4, the white move g2-g3 attacks the queen's square.
        let pos =
            Position::parse_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 2 3")
                .unwrap();

        // Same piece keeps moving: h4 -> somewhere it just came from.
        let m1 = Move::new(crate::coretypes::Square::D8, crate::coretypes::Square::H4, None);
        let m2 = Move::new(crate::coretypes::Square::H4, crate::coretypes::Square::E1, None);
        // From the perspective of the side to move the connection test works
        // on (previous move, candidate reply).
        assert!(connected_moves(&pos, m1, m2));

        // Unrelated quiet moves are not connected.
        let a = Move::new(crate::coretypes::Square::A7, crate::coretypes::Square::A6, None);
        let b = Move::new(crate::coretypes::Square::H2, crate::coretypes::Square::H3, None);
        assert!(!connected_moves(&pos, a, b));
    }

    #[test]
    fn extension_clamped_to_one_ply() {
        use crate::game::Game;
        use crate::search::{SearchSettings, Signals, SearchShared};
        use crate::threads::ThreadPool;
        use crate::timeman::{Mode, TimeManager};
        use crate::transposition::TranspositionTable;
        use parking_lot::Mutex;
        use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU64};
        use std::time::Instant;

        // A passed pawn check on the 7th would stack extensions without the clamp.
        let pos = Position::parse_fen("4k3/8/8/8/8/8/5P2/4K3 w - - 0 1").unwrap();
        let game = Game::from(pos);
        let settings = SearchSettings::from_mode(Mode::depth(1, None));
        let mode = settings.mode;
        let shared = Arc::new(SearchShared {
            tt: Arc::new(TranspositionTable::with_capacity(256)),
            history: Arc::new(crate::search::History::new()),
            signals: Arc::new(Signals::new()),
            pool: ThreadPool::new(1),
            settings,
            time_manager: Mutex::new(TimeManager::new(&mode, crate::coretypes::Color::White)),
            start_time: Instant::now(),
            root_player: crate::coretypes::Color::White,
            nodes: AtomicU64::new(0),
            nodes_between_polls: 30_000,
            current_depth: AtomicU32::new(0),
            aspiration_fail_low: AtomicBool::new(false),
            first_root_move: AtomicBool::new(false),
            last_info_ms: AtomicU64::new(0),
            draw_anchor: AtomicI32::new(0),
        });
        let searcher = Searcher::new(shared, 0, &game);

        let push = searcher.pos.move_info("f2f4".parse().unwrap());
        let (ext, _dangerous) = searcher.extension::<true>(&push, false);
        assert!(ext <= ONE_PLY);
    }
}
