//! Greedy token decoding shared by the speech-to-text, translation and
//! synthesis stages.

pub mod greedy;
pub mod vocab;

pub use greedy::{GreedyTokenDecoder, argmax, join_symbols};
pub use vocab::{RESERVED_SYMBOLS, Vocabulary, is_reserved_symbol};
