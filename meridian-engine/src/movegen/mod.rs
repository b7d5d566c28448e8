use crate::bitboard::Bitboard;
use crate::boardrepr::PieceSets;
use crate::coretypes::{Castling, Color, Color::*, Move, PieceKind::*, Square, Square::*};
use crate::movelist::MoveList;

pub mod rays;
pub mod tables;

/// Generate castling moves and append to move list.
/// Castling is legal if there are no pieces between rook and king,
/// the king does not pass through check, and has appropriate castling rights.
/// params:
/// moves - Move list to append to.
/// player - Player that is castling.
/// castling - Castling rights for player.
/// occupied - All occupied squares on chess board.
/// attacked - All Squares directly attacked by opposite player.
pub fn legal_castling_moves(
    moves: &mut MoveList,
    player: Color,
    castling: Castling,
    occupied: Bitboard,
    attacked: Bitboard,
) {
    let (has_kingside, has_queenside, king_rank) = match player {
        White => {
            let kingside = castling.has(Castling::W_KING);
            let queenside = castling.has(Castling::W_QUEEN);
            (kingside, queenside, Bitboard::RANK_1)
        }
        Black => {
            let kingside = castling.has(Castling::B_KING);
            let queenside = castling.has(Castling::B_QUEEN);
            (kingside, queenside, Bitboard::RANK_8)
        }
    };
    if has_kingside {
        let between = occupied & Bitboard::KINGSIDE_BETWEEN & king_rank;
        let pass_attacked = attacked & Bitboard::KINGSIDE_PASS & king_rank;
        if between.is_empty() && pass_attacked.is_empty() {
            match player {
                White => moves.push(Move::new(E1, G1, None)),
                Black => moves.push(Move::new(E8, G8, None)),
            }
        }
    }
    if has_queenside {
        let between = occupied & Bitboard::QUEENSIDE_BETWEEN & king_rank;
        let pass_attacked = attacked & Bitboard::QUEENSIDE_PASS & king_rank;
        if between.is_empty() && pass_attacked.is_empty() {
            match player {
                White => moves.push(Move::new(E1, C1, None)),
                Black => moves.push(Move::new(E8, C8, None)),
            }
        }
    }
}

// *_pseudo_moves:
// generate a move list of pseudo legal moves for each piece, including
// pushes and attacks. These moves do not consider check, but they do consider
// occupancy.

/// Generate all pseudo-legal pawn moves and append to move list.
/// params:
/// moves - move list to add new moves to.
/// pawns - Bitboard with squares of all pawns to generate moves for.
/// color - player to generate moves for.
/// occupied - All occupied squares on board.
/// them - All squares occupied by opposing player.
/// en_passant - Optional en-passant target square.
pub fn pawn_pseudo_moves(
    moves: &mut MoveList,
    pawns: Bitboard,
    color: Color,
    occupied: Bitboard,
    them: Bitboard,
    en_passant: Option<Square>,
) {
    // Pawns can attack ep square as if it was occupied.
    let them_with_ep = match en_passant {
        Some(ep_square) => them | Bitboard::from(ep_square),
        None => them,
    };

    // Consider pushes, attacks, promotions for each pawn individually.
    for from in pawns {
        let pawn = Bitboard::from(from);
        let single_push = pawn_single_pushes(pawn, color) & !occupied;
        let double_push = pawn_double_pushes(pawn, color) & !occupied;
        let valid_double_push = double_push & pawn_single_pushes(single_push, color);
        let pushes = single_push | valid_double_push;
        let attacks = pawn_attacks(pawn, color) & them_with_ep;

        let tos = pushes.into_iter().chain(attacks);

        for to in tos {
            if Bitboard::RANK_1.has_square(to) || Bitboard::RANK_8.has_square(to) {
                moves.push(Move::new(from, to, Some(Queen)));
                moves.push(Move::new(from, to, Some(Rook)));
                moves.push(Move::new(from, to, Some(Bishop)));
                moves.push(Move::new(from, to, Some(Knight)));
            } else {
                moves.push(Move::new(from, to, None));
            }
        }
    }
}

/// Generate all pseudo-legal knight moves and append to move list.
pub fn knight_pseudo_moves(moves: &mut MoveList, knights: Bitboard, us: Bitboard) {
    for from in knights {
        let tos = tables::knight_pattern(from) & !us;
        for to in tos {
            moves.push(Move::new(from, to, None));
        }
    }
}

/// Generate all pseudo-legal king moves, excluding castling.
pub fn king_pseudo_moves(moves: &mut MoveList, kings: Bitboard, us: Bitboard) {
    for from in kings {
        let tos = tables::king_pattern(from) & !us;
        for to in tos {
            moves.push(Move::new(from, to, None));
        }
    }
}

/// Generate all pseudo-legal queen moves and append to move list.
pub fn queen_pseudo_moves(
    moves: &mut MoveList,
    queens: Bitboard,
    occupied: Bitboard,
    us: Bitboard,
) {
    for from in queens {
        let tos = solo_queen_attacks(from, occupied) & !us;
        for to in tos {
            moves.push(Move::new(from, to, None));
        }
    }
}

/// Generate all pseudo-legal rook moves and append to move list.
pub fn rook_pseudo_moves(moves: &mut MoveList, rooks: Bitboard, occupied: Bitboard, us: Bitboard) {
    for from in rooks {
        let tos = solo_rook_attacks(from, occupied) & !us;
        for to in tos {
            moves.push(Move::new(from, to, None));
        }
    }
}

/// Generate all pseudo-legal bishop moves and append to move list.
pub fn bishop_pseudo_moves(
    moves: &mut MoveList,
    bishops: Bitboard,
    occupied: Bitboard,
    us: Bitboard,
) {
    for from in bishops {
        let tos = solo_bishop_attacks(from, occupied) & !us;
        for to in tos {
            moves.push(Move::new(from, to, None));
        }
    }
}

// Pushes and attacks: Calculate pushes or attacks for all pieces on a bitboard.

/// Generate pushes for all pawns of a color on otherwise empty board.
/// Currently generating separately per color because moves are not symmetrical.
pub fn pawn_pushes(pawns: Bitboard, color: Color) -> Bitboard {
    let single_push_bb = pawn_single_pushes(pawns, color);
    let double_push_bb = pawn_double_pushes(pawns, color);
    single_push_bb | double_push_bb
}

/// Generate pseudo-legal single push moves for all pawns of a color.
pub fn pawn_single_pushes(pawns: Bitboard, color: Color) -> Bitboard {
    match color {
        White => pawns.to_north(),
        Black => pawns.to_south(),
    }
}

/// Generate pseudo-legal double push moves for all pawns of a color.
pub fn pawn_double_pushes(pawns: Bitboard, color: Color) -> Bitboard {
    // Double pushes are generated only from pawns on color's starting rank.
    match color {
        White => (pawns & Bitboard::RANK_2).to_north().to_north(),
        Black => (pawns & Bitboard::RANK_7).to_south().to_south(),
    }
}

/// Generate attacks for all pawns in Bitboard for a color.
/// Attacks for any number of pawns are calculated in constant time.
pub fn pawn_attacks(pawns: Bitboard, color: Color) -> Bitboard {
    match color {
        White => pawns.to_north_east() | pawns.to_north_west(),
        Black => pawns.to_south_east() | pawns.to_south_west(),
    }
}

/// Generate Bitboard with squares attacked by knights.
/// Knight attacks are a pattern, so attacks for all knights are calculated in constant time.
pub fn knight_attacks(knights: Bitboard) -> Bitboard {
    let mut attacks = Bitboard::EMPTY;

    attacks |= knights.to_north().to_north().to_east();
    attacks |= knights.to_north().to_east().to_east();
    attacks |= knights.to_south().to_east().to_east();
    attacks |= knights.to_south().to_south().to_east();

    attacks |= knights.to_south().to_south().to_west();
    attacks |= knights.to_south().to_west().to_west();
    attacks |= knights.to_north().to_west().to_west();
    attacks |= knights.to_north().to_north().to_west();

    attacks
}

/// Generate Bitboard with squares attacked by any number of kings, by lookup.
pub fn king_attacks(kings: Bitboard) -> Bitboard {
    kings
        .into_iter()
        .map(|square| tables::king_pattern(square))
        .fold(Bitboard::EMPTY, |acc, attacks| acc | attacks)
}

/// Generate and return Bitboard with squares attacked by all queens.
pub fn queen_attacks(queens: Bitboard, occupied: Bitboard) -> Bitboard {
    queens
        .into_iter()
        .map(|square| solo_queen_attacks(square, occupied))
        .fold(Bitboard::EMPTY, |acc, attacks| acc | attacks)
}

/// Generate and return Bitboard with squares attacked by all rooks.
pub fn rook_attacks(rooks: Bitboard, occupied: Bitboard) -> Bitboard {
    rooks
        .into_iter()
        .map(|square| solo_rook_attacks(square, occupied))
        .fold(Bitboard::EMPTY, |acc, attacks| acc | attacks)
}

/// Generate and return Bitboard with squares attacked by all bishops.
pub fn bishop_attacks(bishops: Bitboard, occupied: Bitboard) -> Bitboard {
    bishops
        .into_iter()
        .map(|square| solo_bishop_attacks(square, occupied))
        .fold(Bitboard::EMPTY, |acc, attacks| acc | attacks)
}

/// Generate and return Bitboard with squares attacked by all sliding pieces.
pub fn slide_attacks(
    queens: Bitboard,
    rooks: Bitboard,
    bishops: Bitboard,
    occupied: Bitboard,
) -> Bitboard {
    let orthogonals = queens | rooks;
    let diagonals = queens | bishops;

    let orthogonal_attacks = orthogonals
        .into_iter()
        .map(|square| solo_rook_attacks(square, occupied))
        .fold(Bitboard::EMPTY, |acc, attacks| acc | attacks);

    let diagonal_attacks = diagonals
        .into_iter()
        .map(|square| solo_bishop_attacks(square, occupied))
        .fold(Bitboard::EMPTY, |acc, attacks| acc | attacks);
    orthogonal_attacks | diagonal_attacks
}

/// Generate Bitboard containing all squares that are directly attacked by a piece at origin,
/// in all 8 orthogonal and diagonal directions.
/// Directly attacked squares are all empty squares along ray up to first any piece, inclusive.
pub fn solo_queen_attacks(origin: Square, occupancy: Bitboard) -> Bitboard {
    solo_rook_attacks(origin, occupancy) | solo_bishop_attacks(origin, occupancy)
}

/// Returns Bitboard with Squares directly attacked from origin in 4 orthogonal directions.
pub fn solo_rook_attacks(origin: Square, occupancy: Bitboard) -> Bitboard {
    rays::north(origin, occupancy)
        | rays::east(origin, occupancy)
        | rays::south(origin, occupancy)
        | rays::west(origin, occupancy)
}

/// Returns Bitboard with Squares directly attacked from origin in 4 diagonal directions.
pub fn solo_bishop_attacks(origin: Square, occupancy: Bitboard) -> Bitboard {
    rays::noea(origin, occupancy)
        | rays::soea(origin, occupancy)
        | rays::sowe(origin, occupancy)
        | rays::nowe(origin, occupancy)
}

/// Returns Bitboard with every piece of `by` color that attacks the target square.
/// Used for check detection and static exchange evaluation.
pub fn attackers_to(
    target: Square,
    occupied: Bitboard,
    by: Color,
    pieces: &PieceSets,
) -> Bitboard {
    let target_bb = Bitboard::from(target);

    // A pawn of `by` attacks target iff a pawn of the opposite color on
    // target would attack the pawn's square.
    let pawns = pawn_attacks(target_bb, !by) & pieces[(by, Pawn)];
    let knights = tables::knight_pattern(target) & pieces[(by, Knight)];
    let kings = tables::king_pattern(target) & pieces[(by, King)];
    let orthogonals =
        solo_rook_attacks(target, occupied) & (pieces[(by, Rook)] | pieces[(by, Queen)]);
    let diagonals =
        solo_bishop_attacks(target, occupied) & (pieces[(by, Bishop)] | pieces[(by, Queen)]);

    pawns | knights | kings | orthogonals | diagonals
}

/// Squares strictly between two squares on a shared rank, file, or diagonal.
/// Empty if the squares are not aligned.
pub fn squares_between(a: Square, b: Square) -> Bitboard {
    if a == b {
        return Bitboard::EMPTY;
    }
    let occupied = Bitboard::from(b);
    let between = if a.file() == b.file() || a.rank() == b.rank() {
        solo_rook_attacks(a, occupied) & solo_rook_attacks(b, Bitboard::from(a))
    } else {
        let diag = solo_bishop_attacks(a, occupied);
        if !diag.has_square(b) {
            return Bitboard::EMPTY;
        }
        diag & solo_bishop_attacks(b, Bitboard::from(a))
    };
    between
}
