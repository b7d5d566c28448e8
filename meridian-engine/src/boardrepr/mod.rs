//! Board representations.

mod piece_sets;

pub use piece_sets::PieceSets;
