//! Word-for-word dictionary translation.
//!
//! Used when no translation model is configured. Words missing from the
//! table pass through unchanged; a pair missing from the table is an error.

use crate::error::{Result, VoxbridgeError};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

type WordTable = HashMap<String, String>;

const EN_ES: &[(&str, &str)] = &[
    ("hello", "hola"),
    ("hi", "hola"),
    ("goodbye", "adiós"),
    ("bye", "adiós"),
    ("yes", "sí"),
    ("no", "no"),
    ("please", "por favor"),
    ("thanks", "gracias"),
    ("thank", "gracias"),
    ("you", "tú"),
    ("i", "yo"),
    ("we", "nosotros"),
    ("friend", "amigo"),
    ("world", "mundo"),
    ("good", "bueno"),
    ("morning", "mañana"),
    ("night", "noche"),
    ("how", "cómo"),
    ("are", "estás"),
    ("is", "es"),
    ("the", "el"),
    ("a", "un"),
    ("and", "y"),
    ("water", "agua"),
    ("house", "casa"),
    ("love", "amor"),
    ("today", "hoy"),
    ("tomorrow", "mañana"),
    ("where", "dónde"),
    ("what", "qué"),
];

const EN_FR: &[(&str, &str)] = &[
    ("hello", "bonjour"),
    ("hi", "salut"),
    ("goodbye", "au revoir"),
    ("yes", "oui"),
    ("no", "non"),
    ("please", "s'il vous plaît"),
    ("thanks", "merci"),
    ("thank", "merci"),
    ("you", "vous"),
    ("i", "je"),
    ("we", "nous"),
    ("friend", "ami"),
    ("world", "monde"),
    ("good", "bon"),
    ("morning", "matin"),
    ("night", "nuit"),
    ("how", "comment"),
    ("is", "est"),
    ("the", "le"),
    ("and", "et"),
    ("water", "eau"),
    ("house", "maison"),
    ("love", "amour"),
    ("today", "aujourd'hui"),
    ("where", "où"),
];

const EN_DE: &[(&str, &str)] = &[
    ("hello", "hallo"),
    ("hi", "hallo"),
    ("goodbye", "auf wiedersehen"),
    ("yes", "ja"),
    ("no", "nein"),
    ("please", "bitte"),
    ("thanks", "danke"),
    ("thank", "danke"),
    ("you", "du"),
    ("i", "ich"),
    ("we", "wir"),
    ("friend", "freund"),
    ("world", "welt"),
    ("good", "gut"),
    ("morning", "morgen"),
    ("night", "nacht"),
    ("how", "wie"),
    ("is", "ist"),
    ("the", "der"),
    ("and", "und"),
    ("water", "wasser"),
    ("house", "haus"),
    ("love", "liebe"),
    ("today", "heute"),
    ("where", "wo"),
];

/// Extra entries loaded from TOML, keyed `[source.target]`:
///
/// ```toml
/// [en.es]
/// cat = "gato"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
struct DictionaryFile(HashMap<String, HashMap<String, WordTable>>);

/// Lowercased word tables per `(source, target)` language pair.
#[derive(Debug, Clone, Default)]
pub struct DictionaryTranslator {
    pairs: HashMap<(String, String), WordTable>,
}

impl DictionaryTranslator {
    /// Translator with no tables at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in tables: English to and from Spanish, French and German.
    pub fn builtin() -> Self {
        let mut translator = Self::empty();
        for (target, table) in [("es", EN_ES), ("fr", EN_FR), ("de", EN_DE)] {
            for &(en, word) in table {
                translator.insert("en", target, en, word);
                // First English word wins the reverse mapping.
                translator
                    .pairs
                    .entry((target.to_string(), "en".to_string()))
                    .or_default()
                    .entry(word.to_string())
                    .or_insert_with(|| en.to_string());
            }
        }
        translator
    }

    /// Built-in tables with the entries from `path` merged on top.
    pub fn with_file(path: &Path) -> Result<Self> {
        let mut translator = Self::builtin();
        translator.merge_file(path)?;
        Ok(translator)
    }

    /// Merge entries from a TOML dictionary file, overriding existing words.
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let contents = fs::read_to_string(path).map_err(|e| VoxbridgeError::Configuration {
            stage: "dictionary".to_string(),
            message: format!("{}: {}", path.display(), e),
        })?;
        self.merge_toml(&contents)
    }

    /// Merge entries from TOML text.
    pub fn merge_toml(&mut self, contents: &str) -> Result<()> {
        let file: DictionaryFile =
            toml::from_str(contents).map_err(|e| VoxbridgeError::ConfigParse {
                message: format!("dictionary: {}", e),
            })?;
        for (source, targets) in file.0 {
            for (target, words) in targets {
                for (word, translation) in words {
                    self.insert(&source, &target, &word, &translation);
                }
            }
        }
        Ok(())
    }

    pub fn insert(&mut self, source: &str, target: &str, word: &str, translation: &str) {
        self.pairs
            .entry((source.to_lowercase(), target.to_lowercase()))
            .or_default()
            .insert(word.to_lowercase(), translation.to_string());
    }

    /// True when `source → target` can be translated. Identity pairs always can.
    pub fn supports(&self, source: &str, target: &str) -> bool {
        source.eq_ignore_ascii_case(target)
            || self
                .pairs
                .contains_key(&(source.to_lowercase(), target.to_lowercase()))
    }

    /// Pairs with at least one entry, sorted.
    pub fn pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<_> = self.pairs.keys().cloned().collect();
        pairs.sort();
        pairs
    }

    /// Translate word by word.
    ///
    /// Surrounding punctuation is kept, a leading capital is carried over,
    /// and unknown words pass through.
    pub fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        if source.eq_ignore_ascii_case(target) {
            return Ok(text.trim().to_string());
        }
        let table = self
            .pairs
            .get(&(source.to_lowercase(), target.to_lowercase()))
            .ok_or_else(|| VoxbridgeError::UnsupportedPair {
                source_lang: source.to_string(),
                target_lang: target.to_string(),
            })?;

        let words: Vec<String> = text
            .split_whitespace()
            .map(|token| translate_token(table, token))
            .collect();
        Ok(words.join(" "))
    }
}

fn translate_token(table: &WordTable, token: &str) -> String {
    let start = token
        .find(|c: char| c.is_alphanumeric())
        .unwrap_or(token.len());
    let end = token
        .rfind(|c: char| c.is_alphanumeric())
        .map(|i| i + token[i..].chars().next().map_or(1, char::len_utf8))
        .unwrap_or(start);
    if start >= end {
        return token.to_string();
    }

    let (prefix, core, suffix) = (&token[..start], &token[start..end], &token[end..]);
    let Some(translated) = table.get(&core.to_lowercase()) else {
        return token.to_string();
    };

    let translated = if core.chars().next().is_some_and(char::is_uppercase) {
        capitalize(translated)
    } else {
        translated.clone()
    };
    format!("{prefix}{translated}{suffix}")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
