//! Token vocabularies.

use crate::defaults::{EOS_TOKEN, PAD_TOKEN, SOS_TOKEN, UNK_TOKEN};
use crate::error::{Result, VoxbridgeError};
use std::collections::HashMap;
use std::path::Path;

/// Symbols that never reach decoded text.
pub const RESERVED_SYMBOLS: &[&str] = &[SOS_TOKEN, EOS_TOKEN, UNK_TOKEN, PAD_TOKEN];

/// Mapping from token id to symbol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vocabulary {
    symbols: HashMap<u32, String>,
}

impl Vocabulary {
    /// Ids are assigned by position.
    pub fn from_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: symbols
                .into_iter()
                .enumerate()
                .map(|(id, s)| (id as u32, s.into()))
                .collect(),
        }
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        Self {
            symbols: pairs.into_iter().map(|(id, s)| (id, s.into())).collect(),
        }
    }

    /// Parse a token file.
    ///
    /// Each non-blank line is either `SYMBOL ID` or a bare `SYMBOL`, in which
    /// case the zero-based line number is the id. A later line with the same
    /// id replaces the earlier one.
    pub fn parse(content: &str) -> Self {
        let mut symbols = HashMap::new();

        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let explicit = line
                .rsplit_once(char::is_whitespace)
                .and_then(|(symbol, id)| Some((symbol.trim(), id.parse::<u32>().ok()?)))
                .filter(|(symbol, _)| !symbol.is_empty());

            match explicit {
                Some((symbol, id)) => {
                    symbols.insert(id, symbol.to_string());
                }
                None => {
                    symbols.insert(line_no as u32, line.trim().to_string());
                }
            }
        }

        Self { symbols }
    }

    /// Load a token file. A missing, unreadable or empty file is a
    /// configuration error for the owning stage.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| VoxbridgeError::Configuration {
                stage: "vocabulary".to_string(),
                message: format!("cannot read {}: {}", path.display(), e),
            })?;

        let vocab = Self::parse(&content);
        if vocab.is_empty() {
            return Err(VoxbridgeError::Configuration {
                stage: "vocabulary".to_string(),
                message: format!("{} contains no tokens", path.display()),
            });
        }
        Ok(vocab)
    }

    pub fn get(&self, id: u32) -> Option<&str> {
        self.symbols.get(&id).map(|s| s.as_str())
    }

    /// Reverse lookup. Linear scan; vocabularies are looked up this way only
    /// when encoding model inputs.
    pub fn id_of(&self, symbol: &str) -> Option<u32> {
        self.symbols
            .iter()
            .filter(|(_, s)| s.as_str() == symbol)
            .map(|(&id, _)| id)
            .min()
    }

    /// True if `id` maps to one of the reserved control symbols.
    pub fn is_reserved(&self, id: u32) -> bool {
        self.get(id).is_some_and(is_reserved_symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

pub fn is_reserved_symbol(symbol: &str) -> bool {
    RESERVED_SYMBOLS.contains(&symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn from_symbols_assigns_positions() {
        let vocab = Vocabulary::from_symbols(["<sos>", "<eos>", "hello"]);
        assert_eq!(vocab.get(0), Some("<sos>"));
        assert_eq!(vocab.get(2), Some("hello"));
        assert_eq!(vocab.get(3), None);
        assert_eq!(vocab.len(), 3);
    }

    #[test]
    fn parse_explicit_ids() {
        let vocab = Vocabulary::parse("$ 0\n; 1\na 43\nb 44\n");
        assert_eq!(vocab.get(0), Some("$"));
        assert_eq!(vocab.get(1), Some(";"));
        assert_eq!(vocab.get(43), Some("a"));
        assert_eq!(vocab.get(44), Some("b"));
        assert_eq!(vocab.len(), 4);
    }

    #[test]
    fn parse_bare_symbols_use_line_numbers() {
        let vocab = Vocabulary::parse("<sos>\n<eos>\nhola\nmundo\n");
        assert_eq!(vocab.get(0), Some("<sos>"));
        assert_eq!(vocab.get(3), Some("mundo"));
    }

    #[test]
    fn parse_numeric_symbol_without_id() {
        // A lone number is a symbol, not an id
        let vocab = Vocabulary::parse("7\n");
        assert_eq!(vocab.get(0), Some("7"));
    }

    #[test]
    fn parse_skips_blank_lines_and_crlf() {
        let vocab = Vocabulary::parse("a 0\r\n\r\nb 1\r\n");
        assert_eq!(vocab.get(0), Some("a"));
        assert_eq!(vocab.get(1), Some("b"));
        assert_eq!(vocab.len(), 2);
    }

    #[test]
    fn reserved_detection() {
        let vocab = Vocabulary::from_symbols(["<sos>", "<eos>", "<unk>", "<pad>", "word"]);
        for id in 0..4 {
            assert!(vocab.is_reserved(id));
        }
        assert!(!vocab.is_reserved(4));
        assert!(!vocab.is_reserved(99));
    }

    #[test]
    fn id_of_finds_lowest_id() {
        let vocab = Vocabulary::from_pairs([(5, "x"), (2, "x"), (3, "y")]);
        assert_eq!(vocab.id_of("x"), Some(2));
        assert_eq!(vocab.id_of("z"), None);
    }

    #[test]
    fn load_missing_file_is_configuration_error() {
        let err = Vocabulary::load(Path::new("/tmp/voxbridge_missing_tokens_98765.txt"))
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn load_empty_file_is_configuration_error() {
        let file = NamedTempFile::new().unwrap();
        let err = Vocabulary::load(file.path()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn load_reads_token_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"<sos> 0\n<eos> 1\nhello 2\n").unwrap();

        let vocab = Vocabulary::load(file.path()).unwrap();
        assert_eq!(vocab.get(2), Some("hello"));
    }
}
