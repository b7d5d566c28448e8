//! Attack rays for sliding pieces against an occupancy.
//!
//! The four positive directions (north, east, and the two upward diagonals)
//! use the [o^(o-2r)] subtraction trick over the ray's line mask, which
//! yields the ray capped at the first blocker in constant time. The negative
//! directions fall back on an iterative scan.
//!
//! [o^(o-2r)]: https://www.chessprogramming.org/Subtracting_a_Rook_from_a_Blocking_Piece

use crate::bitboard::Bitboard;
use crate::coretypes::{Square, SquareIndexable};
use crate::movegen::tables;

/// Given one of Bitboard::to_(north|south|east|west|...) directions,
/// generate a ray from the origin exclusive to the first occupied piece
/// inclusive along the ray direction.
#[inline(always)]
fn ray_scan(
    origin: Square,
    occupancy: Bitboard,
    direction_func: fn(&Bitboard) -> Bitboard,
) -> Bitboard {
    let mut ray = direction_func(&Bitboard::from(origin));
    for _ in 0..6 {
        if occupancy.has_any(ray) {
            return ray;
        }
        ray |= direction_func(&ray);
    }
    ray
}

/// Bit trick for rays pointing towards higher square indices. Subtracting
/// twice the origin bit from the masked blockers flips exactly the bits
/// between the origin and the first blocker, inclusive.
///
/// Arguments:
/// * `origin` - Square of sliding piece.
/// * `occupancy` - Occupancy bitboard of all pieces.
/// * `mask` - file, rank, or diagonal line of the ray.
#[inline(always)]
pub(crate) fn positive_ray(origin: Square, occupancy: Bitboard, mask: Bitboard) -> Bitboard {
    let (origin_bit, occ, mask) = (origin.shift(), occupancy.0, mask.0);
    let potential_blockers = occ & mask;
    let diff = potential_blockers.wrapping_sub(origin_bit.wrapping_mul(2));
    let changed = diff ^ occ;
    let ray = Bitboard(changed & mask & !origin_bit);

    debug_assert!(ray.len() <= 7, "No ray can attack more than 7 squares.");
    ray
}

/// Return all squares attacked in North-direction ray, stopping on first attacked piece.
pub(crate) fn north(origin: Square, occupancy: Bitboard) -> Bitboard {
    let ray = positive_ray(origin, occupancy, Bitboard::from(origin.file()));
    debug_assert_eq!(ray, ray_scan(origin, occupancy, Bitboard::to_north));
    ray
}

/// Return all squares attacked in East-direction ray, stopping on first attacked piece.
pub(crate) fn east(origin: Square, occupancy: Bitboard) -> Bitboard {
    let ray = positive_ray(origin, occupancy, Bitboard::from(origin.rank()));
    debug_assert_eq!(ray, ray_scan(origin, occupancy, Bitboard::to_east));
    ray
}

/// Return all squares attacked in NorthEast-direction ray, stopping on first attacked piece.
pub(crate) fn noea(origin: Square, occupancy: Bitboard) -> Bitboard {
    let ray = positive_ray(origin, occupancy, tables::DIAGONAL_MASK[origin.idx()]);
    debug_assert_eq!(ray, ray_scan(origin, occupancy, Bitboard::to_north_east));
    ray
}

/// Return all squares attacked in NorthWest-direction ray, stopping on first attacked piece.
pub(crate) fn nowe(origin: Square, occupancy: Bitboard) -> Bitboard {
    let ray = positive_ray(origin, occupancy, tables::ANTI_DIAGONAL_MASK[origin.idx()]);
    debug_assert_eq!(ray, ray_scan(origin, occupancy, Bitboard::to_north_west));
    ray
}

/// Return all squares attacked in South-direction ray, stopping on first attacked piece.
pub(crate) fn south(origin: Square, occupancy: Bitboard) -> Bitboard {
    ray_scan(origin, occupancy, Bitboard::to_south)
}

/// Return all squares attacked in West-direction ray, stopping on first attacked piece.
pub(crate) fn west(origin: Square, occupancy: Bitboard) -> Bitboard {
    ray_scan(origin, occupancy, Bitboard::to_west)
}

/// Return all squares attacked in SouthEast-direction ray, stopping on first attacked piece.
pub(crate) fn soea(origin: Square, occupancy: Bitboard) -> Bitboard {
    ray_scan(origin, occupancy, Bitboard::to_south_east)
}

/// Return all squares attacked in SouthWest-direction ray, stopping on first attacked piece.
pub(crate) fn sowe(origin: Square, occupancy: Bitboard) -> Bitboard {
    ray_scan(origin, occupancy, Bitboard::to_south_west)
}

#[cfg(test)]
mod tests {
    use std::iter::zip;

    use super::*;
    use crate::coretypes::Square::*;

    fn ray_tester(
        origin: Square,
        occ: Bitboard,
        ray_funcs: [fn(Square, Bitboard) -> Bitboard; 8],
        ray_squares: Vec<Vec<Square>>,
    ) {
        assert_eq!(ray_funcs.len(), ray_squares.len());

        for (ray_func, ray_square) in zip(ray_funcs, ray_squares) {
            let ray = ray_func(origin, occ);
            assert_eq!(ray.len(), ray_square.len());
            for sq in ray_square {
                assert!(ray.has_square(sq));
            }
        }
    }

    #[test]
    fn empty_occupancy_rays() {
        let origin = D4;
        let occ = Bitboard::EMPTY;
        let ray_funcs = [north, south, east, west, noea, nowe, soea, sowe];
        let ray_squares = vec![
            vec![D5, D6, D7, D8],
            vec![D3, D2, D1],
            vec![E4, F4, G4, H4],
            vec![A4, B4, C4],
            vec![E5, F6, G7, H8],
            vec![C5, B6, A7],
            vec![E3, F2, G1],
            vec![C3, B2, A1],
        ];
        ray_tester(origin, occ, ray_funcs, ray_squares);
    }

    #[test]
    fn occupied_rays() {
        let origin = E5;
        let occ = Bitboard::from(vec![D2, D4, A5, G5, E8].as_slice());
        let ray_funcs = [north, south, east, west, noea, nowe, soea, sowe];
        let ray_squares = vec![
            vec![E6, E7, E8],
            vec![E4, E3, E2, E1],
            vec![F5, G5],
            vec![D5, C5, B5, A5],
            vec![F6, G7, H8],
            vec![D6, C7, B8],
            vec![F4, G3, H2],
            vec![D4],
        ];
        ray_tester(origin, occ, ray_funcs, ray_squares);
    }

    #[test]
    fn corner_rays() {
        let occ = Bitboard::EMPTY;
        let ray_funcs = [north, south, east, west, noea, nowe, soea, sowe];
        {
            let origin = A1;
            let ray_squares = vec![
                vec![A2, A3, A4, A5, A6, A7, A8],
                vec![],
                vec![B1, C1, D1, E1, F1, G1, H1],
                vec![],
                vec![B2, C3, D4, E5, F6, G7, H8],
                vec![],
                vec![],
                vec![],
            ];
            ray_tester(origin, occ, ray_funcs, ray_squares);
        }
        {
            let origin = H8;
            let ray_squares = vec![
                vec![],
                vec![H1, H2, H3, H4, H5, H6, H7],
                vec![],
                vec![A8, B8, C8, D8, E8, F8, G8],
                vec![],
                vec![],
                vec![],
                vec![A1, B2, C3, D4, E5, F6, G7],
            ];
            ray_tester(origin, occ, ray_funcs, ray_squares);
        }
    }

    #[test]
    fn positive_ray_stops_at_blocker() {
        // Self-occupancy must not break the trick: the origin is occupied.
        let origin = C1;
        let occ = Bitboard::from(vec![C1, C5, F4].as_slice());
        assert_eq!(north(origin, occ).squares(), vec![C2, C3, C4, C5]);
        assert_eq!(noea(origin, occ).squares(), vec![D2, E3, F4]);
        assert_eq!(east(origin, occ).squares(), vec![D1, E1, F1, G1, H1]);
    }
}
