//! Position holds a chess position and the methods used for assessing itself,
//! including legal move generation, make/undo, attack queries, static exchange
//! evaluation, and an incrementally maintained Zobrist hash.

use std::fmt::{self, Display};

use crate::bitboard::Bitboard;
use crate::boardrepr::PieceSets;
use crate::coretypes::{
    Cache, Castling, Color, Color::*, Cp, CpKind, Move, MoveCount, MoveInfo, MoveKind, Piece,
    PieceKind, PieceKind::*, Rank, Square, Square::*,
};
use crate::movegen as mg;
use crate::movelist::MoveList;
use crate::zobrist::{HashKind, ZOBRIST};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Position {
    pub(crate) pieces: PieceSets,
    pub(crate) player: Color,
    pub(crate) castling: Castling,
    pub(crate) en_passant: Option<Square>,
    pub(crate) halfmoves: MoveCount,
    pub(crate) fullmoves: MoveCount,
    pub(crate) hash: HashKind,
}

impl Position {
    /// Standard chess start position.
    pub fn start_position() -> Self {
        Self::from_parts(
            PieceSets::start_position(),
            White,
            Castling::ALL,
            None,
            0,
            1,
        )
    }

    /// Build a position from its component parts, computing the hash fresh.
    pub(crate) fn from_parts(
        pieces: PieceSets,
        player: Color,
        castling: Castling,
        en_passant: Option<Square>,
        halfmoves: MoveCount,
        fullmoves: MoveCount,
    ) -> Self {
        let mut position = Self {
            pieces,
            player,
            castling,
            en_passant,
            halfmoves,
            fullmoves,
            hash: 0,
        };
        position.hash = ZOBRIST.generate_hash((
            &position.pieces,
            &position.player,
            &position.castling,
            &position.en_passant,
        ));
        position
    }

    pub fn pieces(&self) -> &PieceSets {
        &self.pieces
    }

    pub fn player(&self) -> &Color {
        &self.player
    }

    pub fn castling(&self) -> &Castling {
        &self.castling
    }

    pub fn en_passant(&self) -> &Option<Square> {
        &self.en_passant
    }

    pub fn halfmoves(&self) -> MoveCount {
        self.halfmoves
    }

    pub fn fullmoves(&self) -> MoveCount {
        self.fullmoves
    }

    /// Zobrist key of the position.
    pub fn key(&self) -> HashKind {
        self.hash
    }

    /// Position key used when a move is excluded from search. The caller XORs
    /// in the excluded move so different exclusions map to different entries.
    pub fn exclusion_key(&self) -> HashKind {
        self.hash ^ ZOBRIST.exclusion_hash
    }

    /// State which cannot be recomputed after a move is made.
    pub fn cache(&self) -> Cache {
        Cache {
            castling: self.castling,
            en_passant: self.en_passant,
            halfmoves: self.halfmoves,
        }
    }

    pub fn occupied(&self) -> Bitboard {
        self.pieces.occupied()
    }

    pub fn king_square(&self, color: Color) -> Square {
        self.pieces[(color, King)]
            .get_lowest_square()
            .expect("king must exist")
    }

    /// All squares attacked by a player's pieces against the given occupancy.
    pub fn attacks(&self, color: Color, occupied: Bitboard) -> Bitboard {
        let pieces = &self.pieces;
        mg::pawn_attacks(pieces[(color, Pawn)], color)
            | mg::knight_attacks(pieces[(color, Knight)])
            | mg::king_attacks(pieces[(color, King)])
            | mg::slide_attacks(
                pieces[(color, Queen)],
                pieces[(color, Rook)],
                pieces[(color, Bishop)],
                occupied,
            )
    }

    /// All pieces of `by` color which attack the target square.
    pub fn attackers_to(&self, target: Square, occupied: Bitboard, by: Color) -> Bitboard {
        mg::attackers_to(target, occupied, by, &self.pieces)
    }

    /// Squares a piece of the given kind and color would attack from a
    /// square, against an arbitrary occupancy.
    pub fn attacks_from(&self, piece: Piece, square: Square, occupied: Bitboard) -> Bitboard {
        match piece.piece_kind {
            Pawn => mg::pawn_attacks(Bitboard::from(square), piece.color),
            Knight => mg::tables::knight_pattern(square),
            King => mg::tables::king_pattern(square),
            Bishop => mg::solo_bishop_attacks(square, occupied),
            Rook => mg::solo_rook_attacks(square, occupied),
            Queen => mg::solo_queen_attacks(square, occupied),
        }
    }

    pub fn is_attacked(&self, target: Square, by: Color) -> bool {
        !self.attackers_to(target, self.occupied(), by).is_empty()
    }

    /// Is the player to move in check.
    pub fn is_in_check(&self) -> bool {
        self.color_in_check(self.player)
    }

    pub fn color_in_check(&self, color: Color) -> bool {
        self.is_attacked(self.king_square(color), !color)
    }

    pub fn is_checkmate(&self) -> bool {
        self.is_in_check() && self.get_legal_moves().is_empty()
    }

    pub fn is_stalemate(&self) -> bool {
        !self.is_in_check() && self.get_legal_moves().is_empty()
    }

    /// Neither side can possibly deliver mate.
    pub fn insufficient_material(&self) -> bool {
        let majors_or_pawns = Color::iter().any(|color| {
            !(self.pieces[(color, Pawn)]
                | self.pieces[(color, Rook)]
                | self.pieces[(color, Queen)])
            .is_empty()
        });
        if majors_or_pawns {
            return false;
        }
        let minors = |color| {
            (self.pieces[(color, Knight)] | self.pieces[(color, Bishop)]).count_squares()
        };
        minors(White) + minors(Black) <= 1
    }

    /// Material value of a player's pieces, pawns and king excluded.
    pub fn non_pawn_material(&self, color: Color) -> Cp {
        [Knight, Bishop, Rook, Queen]
            .into_iter()
            .map(|pk| pk.centipawns() * self.pieces[(color, pk)].count_squares())
            .fold(Cp::default(), |acc, value| acc + value)
    }

    pub fn has_pawn_on_7th(&self, color: Color) -> bool {
        let seventh = match color {
            White => Bitboard::RANK_7,
            Black => Bitboard::RANK_2,
        };
        self.pieces[(color, Pawn)].has_any(seventh)
    }

    /// A pawn of `color` on `square` with no enemy pawns ahead of it on the
    /// same or adjacent files.
    pub fn pawn_is_passed(&self, color: Color, square: Square) -> bool {
        let file = Bitboard::from(square.file());
        let mut span = file | file.to_east() | file.to_west();
        let rank_idx = square.rank() as usize;
        let ahead_mask = match color {
            White if rank_idx >= 7 => Bitboard::EMPTY,
            White => Bitboard(!0u64 << ((rank_idx + 1) * 8)),
            Black if rank_idx == 0 => Bitboard::EMPTY,
            Black => Bitboard((1u64 << (rank_idx * 8)) - 1),
        };
        span &= ahead_mask;
        !self.pieces[(!color, Pawn)].has_any(span)
    }

    /// Classify a move against the current position without applying it.
    pub fn move_info(&self, move_: Move) -> MoveInfo {
        let piece_kind = self
            .pieces
            .piece_kind_on(move_.from)
            .expect("move from empty square");

        let move_kind = if piece_kind == King && move_.from.distance(move_.to) == 2 {
            MoveKind::Castle
        } else if piece_kind == Pawn
            && Some(move_.to) == self.en_passant
            && move_.from.file() != move_.to.file()
        {
            MoveKind::EnPassant
        } else if let Some(captured) = self.pieces.piece_kind_on(move_.to) {
            MoveKind::Capture(captured)
        } else {
            MoveKind::Quiet
        };

        MoveInfo {
            from: move_.from,
            to: move_.to,
            promotion: move_.promotion,
            piece_kind,
            move_kind,
            cache: self.cache(),
        }
    }

    /// Apply a move assumed to be legal. Returns the record needed to undo it.
    pub fn do_move(&mut self, move_: Move) -> MoveInfo {
        let move_info = self.move_info(move_);
        let us = self.player;
        let them = !us;
        let cache = move_info.cache;

        // Move the piece, replacing it on promotion.
        self.pieces[(us, move_info.piece_kind)].clear_square(move_.from);
        let placed_kind = move_info.promotion.unwrap_or(move_info.piece_kind);
        self.pieces[(us, placed_kind)].set_square(move_.to);

        match move_info.move_kind {
            MoveKind::Capture(captured) => {
                self.pieces[(them, captured)].clear_square(move_.to);
            }
            MoveKind::EnPassant => {
                let ep_square = cache.en_passant.expect("en passant target");
                let pawn_square = match ep_square.rank() {
                    Rank::R3 => ep_square.increment_rank().unwrap(),
                    _ => ep_square.decrement_rank().unwrap(),
                };
                self.pieces[(them, Pawn)].clear_square(pawn_square);
            }
            MoveKind::Castle => {
                let (rook_from, rook_to) = match move_.to {
                    G1 => (H1, F1),
                    C1 => (A1, D1),
                    G8 => (H8, F8),
                    C8 => (A8, D8),
                    _ => panic!("castle to invalid square"),
                };
                self.pieces[(us, Rook)].clear_square(rook_from);
                self.pieces[(us, Rook)].set_square(rook_to);
            }
            MoveKind::Quiet => (),
        }

        // Castling rights are lost by king moves and by moves touching a
        // rook's home square from either side.
        if move_info.piece_kind == King {
            self.castling.clear(Castling::side(us));
        }
        for (square, rights) in [
            (A1, Castling::W_QUEEN),
            (H1, Castling::W_KING),
            (A8, Castling::B_QUEEN),
            (H8, Castling::B_KING),
        ] {
            if move_.from == square || move_.to == square {
                self.castling.clear(rights);
            }
        }

        // New en-passant square appears only after a double pawn push.
        self.en_passant = if move_info.piece_kind == Pawn
            && move_.from.distance(move_.to) == 2
            && move_.from.file() == move_.to.file()
        {
            match us {
                White => move_.from.increment_rank(),
                Black => move_.from.decrement_rank(),
            }
        } else {
            None
        };

        if move_info.piece_kind == Pawn || move_info.is_capture() {
            self.halfmoves = 0;
        } else {
            self.halfmoves += 1;
        }
        if us == Black {
            self.fullmoves += 1;
        }
        self.player = them;

        // Incrementally update the hash from the post-move state.
        let mut hash = self.hash;
        ZOBRIST.update_hash(
            &mut hash,
            (&self.pieces, &self.player, &self.castling, &self.en_passant),
            move_info,
            cache,
        );
        self.hash = hash;

        move_info
    }

    /// Undo a move previously applied with `do_move`.
    pub fn undo_move(&mut self, move_info: MoveInfo) {
        // The hash update is an xor and works in both directions, but must be
        // computed while the position still reflects the applied move.
        let mut hash = self.hash;
        ZOBRIST.update_hash(
            &mut hash,
            (&self.pieces, &self.player, &self.castling, &self.en_passant),
            move_info,
            move_info.cache,
        );
        self.hash = hash;

        let us = !self.player; // The player who made the move.
        let them = self.player;

        let placed_kind = move_info.promotion.unwrap_or(move_info.piece_kind);
        self.pieces[(us, placed_kind)].clear_square(move_info.to);
        self.pieces[(us, move_info.piece_kind)].set_square(move_info.from);

        match move_info.move_kind {
            MoveKind::Capture(captured) => {
                self.pieces[(them, captured)].set_square(move_info.to);
            }
            MoveKind::EnPassant => {
                let ep_square = move_info.cache.en_passant.expect("en passant target");
                let pawn_square = match ep_square.rank() {
                    Rank::R3 => ep_square.increment_rank().unwrap(),
                    _ => ep_square.decrement_rank().unwrap(),
                };
                self.pieces[(them, Pawn)].set_square(pawn_square);
            }
            MoveKind::Castle => {
                let (rook_from, rook_to) = match move_info.to {
                    G1 => (H1, F1),
                    C1 => (A1, D1),
                    G8 => (H8, F8),
                    C8 => (A8, D8),
                    _ => panic!("castle to invalid square"),
                };
                self.pieces[(us, Rook)].clear_square(rook_to);
                self.pieces[(us, Rook)].set_square(rook_from);
            }
            MoveKind::Quiet => (),
        }

        self.castling = move_info.cache.castling;
        self.en_passant = move_info.cache.en_passant;
        self.halfmoves = move_info.cache.halfmoves;
        if us == Black {
            self.fullmoves -= 1;
        }
        self.player = us;
    }

    /// Apply a move only if it is legal.
    pub fn do_legal_move(&mut self, move_: Move) -> Option<MoveInfo> {
        self.is_legal_move(move_).then(|| self.do_move(move_))
    }

    /// Returns a copy of self with the move applied.
    pub fn make_move(&self, move_: Move) -> Position {
        let mut position = *self;
        position.do_move(move_);
        position
    }

    pub fn is_legal_move(&self, move_: Move) -> bool {
        self.get_legal_moves().contains(&move_)
    }

    /// Pass the turn. Only the hash, player, and en-passant square change.
    /// Returns the state needed by `undo_null_move`.
    pub fn do_null_move(&mut self) -> Cache {
        debug_assert!(!self.is_in_check());
        let cache = self.cache();
        self.hash ^= ZOBRIST.player_hash;
        if let Some(ep_square) = self.en_passant.take() {
            self.hash ^= ZOBRIST[ep_square.file()];
        }
        self.player = !self.player;
        cache
    }

    pub fn undo_null_move(&mut self, cache: Cache) {
        self.player = !self.player;
        if let Some(ep_square) = cache.en_passant {
            self.hash ^= ZOBRIST[ep_square.file()];
        }
        self.en_passant = cache.en_passant;
        self.hash ^= ZOBRIST.player_hash;
    }

    /// Does this move give check to the opponent.
    pub fn gives_check(&self, move_: Move) -> bool {
        let mut copy = *self;
        copy.do_move(move_);
        copy.is_in_check()
    }

    /// Generate all strictly legal moves for the player to move.
    pub fn get_legal_moves(&self) -> MoveList {
        let mut pseudo = MoveList::new();
        let us = self.player;
        let them = !us;
        let occupied = self.occupied();
        let us_occupied = self.pieces.color_occupied(&us);
        let them_occupied = self.pieces.color_occupied(&them);

        mg::pawn_pseudo_moves(
            &mut pseudo,
            self.pieces[(us, Pawn)],
            us,
            occupied,
            them_occupied,
            self.en_passant,
        );
        mg::knight_pseudo_moves(&mut pseudo, self.pieces[(us, Knight)], us_occupied);
        mg::bishop_pseudo_moves(&mut pseudo, self.pieces[(us, Bishop)], occupied, us_occupied);
        mg::rook_pseudo_moves(&mut pseudo, self.pieces[(us, Rook)], occupied, us_occupied);
        mg::queen_pseudo_moves(&mut pseudo, self.pieces[(us, Queen)], occupied, us_occupied);
        mg::king_pseudo_moves(&mut pseudo, self.pieces[(us, King)], us_occupied);

        // Castling generation filters occupancy and attacked pass squares,
        // which also rejects castling while in check.
        let attacked = self.attacks(them, occupied);
        mg::legal_castling_moves(&mut pseudo, us, self.castling, occupied, attacked);

        // Keep only moves which leave our king safe.
        let mut legal = MoveList::new();
        let mut scratch = *self;
        for move_ in pseudo {
            let move_info = scratch.do_move(move_);
            if !scratch.color_in_check(us) {
                legal.push(move_);
            }
            scratch.undo_move(move_info);
        }
        legal
    }

    /// Static exchange evaluation of a move: the expected material outcome of
    /// the capture sequence on the target square, in centipawns.
    pub fn see(&self, move_: Move) -> CpKind {
        let target = move_.to;
        let mut occupied = self.occupied();
        let mut attacker_kind = match self.pieces.piece_kind_on(move_.from) {
            Some(kind) => kind,
            None => return 0,
        };

        let mut gain = [0 as CpKind; 32];
        let mut depth = 0usize;

        // First capture: piece on the target square, or the en-passant pawn.
        gain[0] = if attacker_kind == Pawn
            && Some(target) == self.en_passant
            && move_.from.file() != target.file()
        {
            let ep_pawn = match target.rank() {
                Rank::R3 => target.increment_rank().unwrap(),
                _ => target.decrement_rank().unwrap(),
            };
            occupied.clear_square(ep_pawn);
            Pawn.centipawns().0
        } else {
            self.pieces
                .piece_kind_on(target)
                .map(|kind| kind.centipawns().0)
                .unwrap_or(0)
        };

        occupied.clear_square(move_.from);
        let mut side = !self.player;

        loop {
            let attacker = self.least_valuable_attacker(target, occupied, side);
            let (square, kind) = match attacker {
                Some(found) => found,
                None => break,
            };
            // A king cannot recapture into remaining enemy attackers.
            if kind == King
                && self
                    .least_valuable_attacker(target, occupied ^ Bitboard::from(square), !side)
                    .is_some()
            {
                break;
            }

            depth += 1;
            if depth >= gain.len() {
                break;
            }
            gain[depth] = attacker_kind.centipawns().0 - gain[depth - 1];
            attacker_kind = kind;
            occupied.clear_square(square);
            side = !side;
        }

        while depth > 0 {
            gain[depth - 1] = -std::cmp::max(-gain[depth - 1], gain[depth]);
            depth -= 1;
        }
        gain[0]
    }

    /// Sign of the static exchange: cheap guard used when only winning or
    /// losing matters.
    pub fn see_sign(&self, move_: Move) -> CpKind {
        // A lower-valued piece capturing a higher-valued one never loses material.
        if let (Some(attacker), Some(victim)) = (
            self.pieces.piece_kind_on(move_.from),
            self.pieces.piece_kind_on(move_.to),
        ) {
            if attacker != King && attacker.centipawns() <= victim.centipawns() {
                return 1;
            }
        }
        self.see(move_).signum()
    }

    fn least_valuable_attacker(
        &self,
        target: Square,
        occupied: Bitboard,
        by: Color,
    ) -> Option<(Square, PieceKind)> {
        let attackers = mg::attackers_to(target, occupied, by, &self.pieces) & occupied;
        if attackers.is_empty() {
            return None;
        }
        for kind in [Pawn, Knight, Bishop, Rook, Queen, King] {
            let subset = attackers & self.pieces[(by, kind)];
            if let Some(square) = subset.get_lowest_square() {
                return Some((square, kind));
            }
        }
        None
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.pieces.pretty())?;
        writeln!(
            f,
            "{} to move, castling {}, halfmoves {}, fullmoves {}",
            self.player, self.castling, self.halfmoves, self.fullmoves
        )
    }
}

impl Piece {
    /// Convenience for evaluation and history indexing: dense 0..12 index.
    pub const fn dense_idx(&self) -> usize {
        self.color as usize + self.piece_kind as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::Fen;

    #[test]
    fn start_position_basics() {
        let pos = Position::start_position();
        assert_eq!(*pos.player(), White);
        assert_eq!(pos.get_legal_moves().len(), 20);
        assert!(!pos.is_in_check());
        assert_eq!(pos.king_square(White), E1);
        assert_eq!(pos.king_square(Black), E8);
        assert_eq!(pos.non_pawn_material(White), pos.non_pawn_material(Black));
    }

    #[test]
    fn do_undo_roundtrip() {
        let mut pos = Position::start_position();
        let original = pos;

        for move_str in ["e2e4", "g1f3", "b1c3", "a2a4"] {
            let move_: Move = move_str.parse().unwrap();
            let move_info = pos.do_move(move_);
            assert_ne!(pos, original);
            pos.undo_move(move_info);
            assert_eq!(pos, original, "after undoing {move_str}");
        }
    }

    #[test]
    fn do_undo_capture_castle_promotion() {
        let mut pos =
            Position::parse_fen("r3k2r/pPpp1ppp/8/4p3/8/8/1PP1PPP1/R3K2R w KQkq - 0 10").unwrap();
        let original = pos;

        // Promotion with capture, castling both sides, rook capture.
        for move_str in ["b7a8q", "e1g1", "e1c1", "a1a8"] {
            let move_: Move = move_str.parse().unwrap();
            assert!(pos.is_legal_move(move_), "{move_str} should be legal");
            let move_info = pos.do_move(move_);
            pos.undo_move(move_info);
            assert_eq!(pos, original, "after undoing {move_str}");
        }
    }

    #[test]
    fn en_passant_cycle() {
        let mut pos =
            Position::parse_fen("rnbqkbnr/pp1p1ppp/8/2pPp3/8/8/PPP1PPPP/RNBQKBNR w KQkq e6 0 3")
                .unwrap();
        let original = pos;
        let ep_capture: Move = "d5e6".parse().unwrap();

        assert!(pos.is_legal_move(ep_capture));
        let move_info = pos.do_move(ep_capture);
        assert_eq!(move_info.move_kind, MoveKind::EnPassant);
        assert!(pos.pieces[(Black, Pawn)].has_square(C5));
        assert!(!pos.pieces[(Black, Pawn)].has_square(E5));
        pos.undo_move(move_info);
        assert_eq!(pos, original);
    }

    #[test]
    fn null_move_cycle() {
        let mut pos =
            Position::parse_fen("rnbqkbnr/pp1p1ppp/8/2pPp3/8/8/PPP1PPPP/RNBQKBNR w KQkq e6 0 3")
                .unwrap();
        let original = pos;
        let cache = pos.do_null_move();
        assert_eq!(*pos.player(), Black);
        assert_eq!(*pos.en_passant(), None);
        assert_ne!(pos.key(), original.key());
        pos.undo_null_move(cache);
        assert_eq!(pos, original);
    }

    #[test]
    fn checkmate_with_pinned_piece() {
        // The black rook is pinned and cannot legally capture the bishop.
        let pos = Position::parse_fen("k7/1r6/8/8/4B3/8/1q6/K7 w - - 0 1").unwrap();
        assert!(pos.is_in_check());
    }

    #[test]
    fn stalemate_detection() {
        let pos = Position::parse_fen("k7/2Q5/1K6/8/8/8/8/8 b - - 0 1").unwrap();
        assert!(pos.is_stalemate());
        assert!(!pos.is_checkmate());
    }

    #[test]
    fn gives_check_classification() {
        let pos = Position::parse_fen("4k3/8/8/8/8/8/8/4KQ2 w - - 0 1").unwrap();
        assert!(pos.gives_check("f1e2".parse().unwrap()));
        assert!(pos.gives_check("f1f8".parse().unwrap()));
        assert!(!pos.gives_check("f1g2".parse().unwrap()));
    }

    #[test]
    fn see_simple_exchanges() {
        // Pawn takes pawn, defended by pawn: equal trade for the first pawn.
        let pos = Position::parse_fen("4k3/8/2p5/3p4/4P3/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(pos.see("e4d5".parse().unwrap()), 0);

        // Queen takes a defended pawn: loses queen for pawn.
        let pos = Position::parse_fen("4k3/8/2p5/3p4/8/8/3Q4/4K3 w - - 0 1").unwrap();
        let see = pos.see("d2d5".parse().unwrap());
        assert_eq!(see, Pawn.centipawns().0 - Queen.centipawns().0);
        assert!(pos.see_sign("d2d5".parse().unwrap()) < 0);

        // Undefended pawn grab is simply a pawn up.
        let pos = Position::parse_fen("4k3/8/8/3p4/8/8/3R4/4K3 w - - 0 1").unwrap();
        assert_eq!(pos.see("d2d5".parse().unwrap()), Pawn.centipawns().0);
    }

    #[test]
    fn passed_pawn_predicate() {
        let pos = Position::parse_fen("4k3/8/8/2p5/8/1P6/P7/4K3 w - - 0 1").unwrap();
        // The a2 pawn has no enemy pawns in its way.
        assert!(pos.pawn_is_passed(White, A2));
        // The b3 pawn faces the c5 pawn on an adjacent file.
        assert!(!pos.pawn_is_passed(White, B3));
        // Black's c5 pawn is blocked by b3 on an adjacent file.
        assert!(!pos.pawn_is_passed(Black, C5));
    }

    #[test]
    fn insufficient_material_cases() {
        assert!(Position::parse_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1")
            .unwrap()
            .insufficient_material());
        assert!(Position::parse_fen("4k3/8/8/8/8/8/8/2B1K3 w - - 0 1")
            .unwrap()
            .insufficient_material());
        assert!(!Position::parse_fen("4k3/7p/8/8/8/8/8/4K3 w - - 0 1")
            .unwrap()
            .insufficient_material());
        assert!(!Position::parse_fen("4k3/8/8/8/8/8/8/2BBK3 w - - 0 1")
            .unwrap()
            .insufficient_material());
    }
}
