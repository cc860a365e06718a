use itertools::Itertools;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_SCRAMBLE_LENGTH: usize = 25;

/// The nine rotation axes a move can turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Face {
    R,
    L,
    U,
    D,
    F,
    B,
    M,
    E,
    S,
}

impl Face {
    pub const ALL: [Face; 9] = [
        Face::R,
        Face::L,
        Face::U,
        Face::D,
        Face::F,
        Face::B,
        Face::M,
        Face::E,
        Face::S,
    ];

    fn from_char(c: char) -> Option<Face> {
        match c {
            'R' => Some(Face::R),
            'L' => Some(Face::L),
            'U' => Some(Face::U),
            'D' => Some(Face::D),
            'F' => Some(Face::F),
            'B' => Some(Face::B),
            'M' => Some(Face::M),
            'E' => Some(Face::E),
            'S' => Some(Face::S),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    None,
    Inverse,
    Double,
}

impl Modifier {
    fn suffix(&self) -> &'static str {
        match self {
            Modifier::None => "",
            Modifier::Inverse => "'",
            Modifier::Double => "2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub face: Face,
    pub modifier: Modifier,
}

impl Move {
    /// Full move alphabet: every face with each modifier, in face order
    pub const ALL: [Move; 27] = {
        let modifiers = [Modifier::None, Modifier::Inverse, Modifier::Double];
        let mut moves = [Move {
            face: Face::R,
            modifier: Modifier::None,
        }; 27];
        let mut i = 0;
        while i < 27 {
            moves[i] = Move {
                face: Face::ALL[i / 3],
                modifier: modifiers[i % 3],
            };
            i += 1;
        }
        moves
    };

    pub fn new(face: Face, modifier: Modifier) -> Self {
        Self { face, modifier }
    }

    pub fn same_axis(&self, other: &Move) -> bool {
        self.face == other.face
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.face, self.modifier.suffix())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseScrambleError {
    #[error("unknown move: {0}")]
    UnknownMove(String),
}

impl FromStr for Move {
    type Err = ParseScrambleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let face = chars
            .next()
            .and_then(Face::from_char)
            .ok_or_else(|| ParseScrambleError::UnknownMove(s.to_string()))?;
        let modifier = match chars.as_str() {
            "" => Modifier::None,
            "'" => Modifier::Inverse,
            "2" => Modifier::Double,
            _ => return Err(ParseScrambleError::UnknownMove(s.to_string())),
        };
        Ok(Move::new(face, modifier))
    }
}

/// An ordered move sequence; persisted in its space separated text form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Scramble {
    moves: Vec<Move>,
}

impl Scramble {
    pub fn new(moves: Vec<Move>) -> Self {
        Self { moves }
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

impl fmt::Display for Scramble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.moves.iter().join(" "))
    }
}

impl FromStr for Scramble {
    type Err = ParseScrambleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split_whitespace()
            .map(Move::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map(Scramble::new)
    }
}

impl From<Scramble> for String {
    fn from(scramble: Scramble) -> Self {
        scramble.to_string()
    }
}

impl TryFrom<String> for Scramble {
    type Error = ParseScrambleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Draws uniformly random moves, rejecting any that repeat the previous axis
#[derive(Debug, Clone, Copy, Default)]
pub struct ScrambleGenerator;

impl ScrambleGenerator {
    pub fn generate(length: usize) -> Scramble {
        Self::generate_with(&mut rand::thread_rng(), length)
    }

    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R, length: usize) -> Scramble {
        let mut moves: Vec<Move> = Vec::with_capacity(length);

        while moves.len() < length {
            let candidate = Move::ALL[rng.gen_range(0..Move::ALL.len())];
            let rejected = moves
                .last()
                .is_some_and(|last| last.same_axis(&candidate) || *last == candidate);
            if !rejected {
                moves.push(candidate);
            }
        }

        Scramble::new(moves)
    }
}
