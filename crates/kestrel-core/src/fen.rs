//! FEN parsing and serialization for [`Position`].

use std::str::FromStr;

use crate::castle_rights::CastleRights;
use crate::color::Color;
use crate::error::FenError;
use crate::piece::Piece;
use crate::position::Position;
use crate::square::Square;

/// The standard starting position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

impl FromStr for Position {
    type Err = FenError;

    /// Parse a FEN string. The two move counters may be omitted.
    fn from_str(fen: &str) -> Result<Position, FenError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if !(4..=6).contains(&fields.len()) {
            return Err(FenError::WrongFieldCount { found: fields.len() });
        }

        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::WrongRankCount { found: ranks.len() });
        }

        let mut pos = Position::empty();
        for (rank_index, text) in ranks.iter().enumerate() {
            let rank = 7 - rank_index as u8;
            let mut file = 0usize;
            for c in text.chars() {
                match c {
                    '1'..='8' => file += c as usize - '0' as usize,
                    _ => {
                        let piece = Piece::from_fen_char(c).ok_or(FenError::InvalidPiece { character: c })?;
                        if file >= 8 {
                            return Err(FenError::BadRankLength { rank_index, length: file + 1 });
                        }
                        pos.put_piece(piece, Square::new(file as u8, rank));
                        file += 1;
                    }
                }
            }
            if file != 8 {
                return Err(FenError::BadRankLength { rank_index, length: file });
            }
        }

        let side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::InvalidColor { found: other.to_string() }),
        };

        let castling = CastleRights::from_fen(fields[2])?;

        let en_passant = match fields[3] {
            "-" => None,
            text => {
                let sq = Square::from_algebraic(text)
                    .filter(|sq| sq.relative_rank(side_to_move) == 5)
                    .ok_or_else(|| FenError::InvalidEnPassant { found: text.to_string() })?;
                Some(sq)
            }
        };

        let counter = |index: usize, field: &'static str, default: u16| -> Result<u16, FenError> {
            match fields.get(index) {
                None => Ok(default),
                Some(text) => text.parse().map_err(|_| FenError::InvalidMoveCounter {
                    field,
                    found: text.to_string(),
                }),
            }
        };
        let halfmove_clock = counter(4, "halfmove clock", 0)?;
        let fullmove_number = counter(5, "fullmove number", 1)?;

        pos.set_state(side_to_move, castling, en_passant, halfmove_clock, fullmove_number);
        pos.validate()?;
        Ok(pos)
    }
}

impl Position {
    pub fn to_fen(&self) -> String {
        let mut fen = String::with_capacity(90);
        for rank in (0..8u8).rev() {
            let mut empty = 0;
            for file in 0..8u8 {
                match self.piece_on(Square::new(file, rank)) {
                    Some(piece) => {
                        if empty > 0 {
                            fen.push(char::from(b'0' + empty));
                            empty = 0;
                        }
                        fen.push(piece.fen_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                fen.push(char::from(b'0' + empty));
            }
            if rank > 0 {
                fen.push('/');
            }
        }
        let en_passant = self.en_passant().map_or_else(|| "-".to_string(), |sq| sq.to_string());
        format!(
            "{fen} {} {} {en_passant} {} {}",
            self.side_to_move(),
            self.castling(),
            self.halfmove_clock(),
            self.fullmove_number()
        )
    }
}
