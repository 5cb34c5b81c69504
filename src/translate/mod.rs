//! Model-free translation fallback.

pub mod dictionary;

pub use dictionary::DictionaryTranslator;
