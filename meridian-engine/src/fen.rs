//! FEN (Forsyth-Edwards Notation) parsing and formatting.

use std::error;
use std::fmt::{self, Display};
use std::str::FromStr;

use crate::boardrepr::PieceSets;
use crate::coretypes::{Castling, Color, File, MoveCount, Piece, PieceKind, Rank, Square};
use crate::position::Position;

/// Error produced when a FEN string cannot be parsed.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ParseFenError {
    message: String,
}

impl ParseFenError {
    fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for ParseFenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "failed to parse fen: {}", self.message)
    }
}

impl error::Error for ParseFenError {}

/// Types which can be converted to and from a FEN string.
pub trait Fen: Sized {
    fn parse_fen(s: &str) -> Result<Self, ParseFenError>;
    fn to_fen(&self) -> String;
}

impl Fen for Position {
    fn parse_fen(s: &str) -> Result<Self, ParseFenError> {
        let mut fields = s.split_whitespace();

        let placement = fields
            .next()
            .ok_or_else(|| ParseFenError::new("missing piece placement"))?;
        let player = fields
            .next()
            .ok_or_else(|| ParseFenError::new("missing side to move"))?;
        let castling = fields
            .next()
            .ok_or_else(|| ParseFenError::new("missing castling rights"))?;
        let en_passant = fields
            .next()
            .ok_or_else(|| ParseFenError::new("missing en passant square"))?;
        // The move counters are optional in practice; default to a fresh game.
        let halfmoves = fields.next().unwrap_or("0");
        let fullmoves = fields.next().unwrap_or("1");

        let mut pieces = PieceSets::new();
        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(ParseFenError::new("placement must have 8 ranks"));
        }
        for (rank_offset, rank_str) in ranks.iter().enumerate() {
            let rank = Rank::from_idx(7 - rank_offset).unwrap();
            let mut file_idx = 0usize;
            for ch in rank_str.chars() {
                if let Some(skip) = ch.to_digit(10) {
                    file_idx += skip as usize;
                } else if let Some((color, piece_kind)) = PieceKind::from_char(ch) {
                    let file = File::from_idx(file_idx)
                        .ok_or_else(|| ParseFenError::new("rank overflows 8 files"))?;
                    pieces[&Piece::new(color, piece_kind)].set_square(Square::new(file, rank));
                    file_idx += 1;
                } else {
                    return Err(ParseFenError::new(format!("invalid placement char {ch}")));
                }
            }
            if file_idx != 8 {
                return Err(ParseFenError::new("rank does not cover 8 files"));
            }
        }

        let player =
            Color::from_str(player).map_err(|_| ParseFenError::new("invalid side to move"))?;
        let castling =
            Castling::from_str(castling).map_err(|_| ParseFenError::new("invalid castling"))?;
        let en_passant = match en_passant {
            "-" => None,
            s => Some(
                Square::from_str(s).map_err(|_| ParseFenError::new("invalid en passant square"))?,
            ),
        };
        let halfmoves: MoveCount = halfmoves
            .parse()
            .map_err(|_| ParseFenError::new("invalid halfmove clock"))?;
        let fullmoves: MoveCount = fullmoves
            .parse()
            .map_err(|_| ParseFenError::new("invalid fullmove number"))?;

        if pieces[(Color::White, PieceKind::King)].count_squares() != 1
            || pieces[(Color::Black, PieceKind::King)].count_squares() != 1
        {
            return Err(ParseFenError::new("each side must have exactly one king"));
        }

        Ok(Position::from_parts(
            pieces, player, castling, en_passant, halfmoves, fullmoves,
        ))
    }

    fn to_fen(&self) -> String {
        let mut fen = String::with_capacity(90);

        for rank_idx in (0..8).rev() {
            let rank = Rank::from_idx(rank_idx).unwrap();
            let mut empty_run = 0;
            for file_idx in 0..8 {
                let square = Square::new(File::from_idx(file_idx).unwrap(), rank);
                match self.pieces().piece_on(square) {
                    Some(piece) => {
                        if empty_run > 0 {
                            fen.push(char::from_digit(empty_run, 10).unwrap());
                            empty_run = 0;
                        }
                        fen.push(piece.piece_kind.to_char(piece.color));
                    }
                    None => empty_run += 1,
                }
            }
            if empty_run > 0 {
                fen.push(char::from_digit(empty_run, 10).unwrap());
            }
            if rank_idx > 0 {
                fen.push('/');
            }
        }

        let en_passant = match self.en_passant() {
            Some(square) => square.to_string(),
            None => "-".to_string(),
        };
        fen.push_str(&format!(
            " {} {} {} {} {}",
            self.player(),
            self.castling(),
            en_passant,
            self.halfmoves(),
            self.fullmoves()
        ));
        fen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn parse_start_position() {
        let parsed = Position::parse_fen(START_FEN).unwrap();
        assert_eq!(parsed, Position::start_position());
    }

    #[test]
    fn roundtrip_various() {
        let fens = [
            START_FEN,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "rnbqkbnr/pp1p1ppp/8/2pPp3/8/8/PPP1PPPP/RNBQKBNR w KQkq e6 0 3",
            "4k3/8/4K3/8/8/8/8/4Q3 w - - 0 1",
        ];
        for fen in fens {
            let pos = Position::parse_fen(fen).unwrap();
            assert_eq!(pos.to_fen(), fen, "roundtrip of {fen}");
        }
    }

    #[test]
    fn rejects_malformed() {
        assert!(Position::parse_fen("").is_err());
        assert!(Position::parse_fen("8/8/8/8/8/8/8 w - - 0 1").is_err());
        assert!(Position::parse_fen("9/8/8/8/8/8/8/8 w - - 0 1").is_err());
        assert!(Position::parse_fen("8/8/8/8/8/8/8/8 w - - 0 1").is_err()); // no kings
        assert!(Position::parse_fen(START_FEN.replace('w', "x").as_str()).is_err());
    }
}
