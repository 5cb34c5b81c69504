//! Grapheme → phoneme → viseme lookup tables.
//!
//! A deliberately small rule table per language. Bigrams are matched before
//! single characters. It is a placeholder for a real grapheme-to-phoneme
//! model, good enough to drive plausible mouth motion.

use crate::viseme::types::{Phoneme, VisemeId};

type GraphemeTable = &'static [(&'static str, &'static [&'static str])];

const ENGLISH: GraphemeTable = &[
    // Bigrams
    ("th", &["θ"]),
    ("sh", &["ʃ"]),
    ("ch", &["tʃ"]),
    ("ng", &["ŋ"]),
    ("ph", &["f"]),
    ("wh", &["w"]),
    ("ck", &["k"]),
    ("ee", &["i"]),
    ("ea", &["i"]),
    ("oo", &["u"]),
    ("ou", &["aʊ"]),
    ("oi", &["ɔɪ"]),
    ("ai", &["eɪ"]),
    ("ay", &["eɪ"]),
    ("er", &["ɚ"]),
    // Single letters
    ("a", &["æ"]),
    ("b", &["b"]),
    ("c", &["k"]),
    ("d", &["d"]),
    ("e", &["ɛ"]),
    ("f", &["f"]),
    ("g", &["g"]),
    ("h", &["h"]),
    ("i", &["ɪ"]),
    ("j", &["dʒ"]),
    ("k", &["k"]),
    ("l", &["l"]),
    ("m", &["m"]),
    ("n", &["n"]),
    ("o", &["oʊ"]),
    ("p", &["p"]),
    ("q", &["k"]),
    ("r", &["ɹ"]),
    ("s", &["s"]),
    ("t", &["t"]),
    ("u", &["ʌ"]),
    ("v", &["v"]),
    ("w", &["w"]),
    ("x", &["k", "s"]),
    ("y", &["j"]),
    ("z", &["z"]),
];

const SPANISH: GraphemeTable = &[
    ("ll", &["ʝ"]),
    ("rr", &["r"]),
    ("ch", &["tʃ"]),
    ("qu", &["k"]),
    ("a", &["a"]),
    ("á", &["a"]),
    ("b", &["b"]),
    ("c", &["k"]),
    ("d", &["d"]),
    ("e", &["e"]),
    ("é", &["e"]),
    ("f", &["f"]),
    ("g", &["g"]),
    ("h", &[]),
    ("i", &["i"]),
    ("í", &["i"]),
    ("j", &["x"]),
    ("k", &["k"]),
    ("l", &["l"]),
    ("m", &["m"]),
    ("n", &["n"]),
    ("ñ", &["ɲ"]),
    ("o", &["o"]),
    ("ó", &["o"]),
    ("p", &["p"]),
    ("r", &["ɾ"]),
    ("s", &["s"]),
    ("t", &["t"]),
    ("u", &["u"]),
    ("ú", &["u"]),
    ("ü", &["u"]),
    ("v", &["b"]),
    ("w", &["w"]),
    ("x", &["k", "s"]),
    ("y", &["ʝ"]),
    ("z", &["s"]),
];

const FRENCH: GraphemeTable = &[
    ("ch", &["ʃ"]),
    ("ou", &["u"]),
    ("oi", &["w", "a"]),
    ("au", &["o"]),
    ("eu", &["ø"]),
    ("ai", &["ɛ"]),
    ("an", &["ɑ̃"]),
    ("en", &["ɑ̃"]),
    ("on", &["ɔ̃"]),
    ("in", &["ɛ̃"]),
    ("gn", &["ɲ"]),
    ("qu", &["k"]),
    ("a", &["a"]),
    ("à", &["a"]),
    ("â", &["a"]),
    ("b", &["b"]),
    ("c", &["k"]),
    ("ç", &["s"]),
    ("d", &["d"]),
    ("e", &["ə"]),
    ("é", &["e"]),
    ("è", &["ɛ"]),
    ("ê", &["ɛ"]),
    ("f", &["f"]),
    ("g", &["g"]),
    ("h", &[]),
    ("i", &["i"]),
    ("î", &["i"]),
    ("j", &["ʒ"]),
    ("k", &["k"]),
    ("l", &["l"]),
    ("m", &["m"]),
    ("n", &["n"]),
    ("o", &["o"]),
    ("ô", &["o"]),
    ("p", &["p"]),
    ("r", &["ʁ"]),
    ("s", &["s"]),
    ("t", &["t"]),
    ("u", &["y"]),
    ("û", &["y"]),
    ("v", &["v"]),
    ("w", &["w"]),
    ("x", &["k", "s"]),
    ("y", &["i"]),
    ("z", &["z"]),
];

const GERMAN: GraphemeTable = &[
    ("ch", &["x"]),
    ("ei", &["aɪ"]),
    ("ie", &["i"]),
    ("eu", &["ɔʏ"]),
    ("äu", &["ɔʏ"]),
    ("au", &["aʊ"]),
    ("ng", &["ŋ"]),
    ("qu", &["k", "v"]),
    ("a", &["a"]),
    ("ä", &["ɛ"]),
    ("b", &["b"]),
    ("c", &["k"]),
    ("d", &["d"]),
    ("e", &["ɛ"]),
    ("f", &["f"]),
    ("g", &["g"]),
    ("h", &["h"]),
    ("i", &["ɪ"]),
    ("j", &["j"]),
    ("k", &["k"]),
    ("l", &["l"]),
    ("m", &["m"]),
    ("n", &["n"]),
    ("o", &["ɔ"]),
    ("ö", &["ø"]),
    ("p", &["p"]),
    ("r", &["ʁ"]),
    ("s", &["s"]),
    ("ß", &["s"]),
    ("t", &["t"]),
    ("u", &["ʊ"]),
    ("ü", &["y"]),
    ("v", &["f"]),
    ("w", &["v"]),
    ("x", &["k", "s"]),
    ("y", &["ʏ"]),
    ("z", &["ts"]),
];

const PHONEME_VISEMES: &[(&str, VisemeId)] = &[
    // Vowels
    ("a", VisemeId::Aa),
    ("ɑ", VisemeId::Aa),
    ("ɑ̃", VisemeId::Aa),
    ("æ", VisemeId::Ae),
    ("ʌ", VisemeId::Ah),
    ("ə", VisemeId::Ah),
    ("ɔ", VisemeId::Ao),
    ("ɔ̃", VisemeId::Ao),
    ("aʊ", VisemeId::Aw),
    ("aɪ", VisemeId::Ay),
    ("ɛ", VisemeId::Eh),
    ("ɛ̃", VisemeId::Eh),
    ("ɚ", VisemeId::Er),
    ("e", VisemeId::Ey),
    ("eɪ", VisemeId::Ey),
    ("ɪ", VisemeId::Ih),
    ("i", VisemeId::Iy),
    ("o", VisemeId::Ow),
    ("oʊ", VisemeId::Ow),
    ("ø", VisemeId::Ow),
    ("ɔɪ", VisemeId::Oy),
    ("ɔʏ", VisemeId::Oy),
    ("ʊ", VisemeId::Uh),
    ("ʏ", VisemeId::Uh),
    ("u", VisemeId::Uw),
    ("y", VisemeId::Uw),
    // Consonants
    ("p", VisemeId::Pp),
    ("b", VisemeId::Pp),
    ("m", VisemeId::Pp),
    ("f", VisemeId::Ff),
    ("v", VisemeId::Ff),
    ("θ", VisemeId::Th),
    ("ð", VisemeId::Th),
    ("t", VisemeId::Dd),
    ("d", VisemeId::Dd),
    ("k", VisemeId::Kk),
    ("g", VisemeId::Kk),
    ("x", VisemeId::Kk),
    ("tʃ", VisemeId::Ch),
    ("dʒ", VisemeId::Ch),
    ("ʃ", VisemeId::Ch),
    ("ʒ", VisemeId::Ch),
    ("s", VisemeId::Ss),
    ("z", VisemeId::Ss),
    ("ts", VisemeId::Ss),
    ("n", VisemeId::Nn),
    ("ŋ", VisemeId::Nn),
    ("ɲ", VisemeId::Nn),
    ("l", VisemeId::Ll),
    ("ɹ", VisemeId::Rr),
    ("r", VisemeId::Rr),
    ("ɾ", VisemeId::Rr),
    ("ʁ", VisemeId::Rr),
    ("w", VisemeId::Ww),
    ("j", VisemeId::Yy),
    ("ʝ", VisemeId::Yy),
    ("h", VisemeId::Hh),
];

/// Languages with a dedicated table. Anything else uses English.
pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "es", "fr", "de"];

fn table_for(language: &str) -> GraphemeTable {
    let primary = language.split(['-', '_']).next().unwrap_or(language);
    match primary.to_ascii_lowercase().as_str() {
        "es" => SPANISH,
        "fr" => FRENCH,
        "de" => GERMAN,
        _ => ENGLISH,
    }
}

fn lookup(table: GraphemeTable, grapheme: &str) -> Option<&'static [&'static str]> {
    table
        .iter()
        .find(|(g, _)| *g == grapheme)
        .map(|(_, phonemes)| *phonemes)
}

/// Convert text to phonemes.
///
/// Text is lowercased; whitespace and punctuation are skipped. A bigram is
/// tried before the single character at each position. Characters missing
/// from the table pass through verbatim as their own phoneme.
pub fn phonemize(text: &str, language: &str) -> Vec<Phoneme> {
    let table = table_for(language);
    let chars: Vec<char> = text.to_lowercase().chars().collect();
    let mut phonemes = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() || c.is_ascii_punctuation() || is_unicode_punctuation(c) {
            i += 1;
            continue;
        }

        if i + 1 < chars.len() {
            let bigram: String = chars[i..i + 2].iter().collect();
            if let Some(symbols) = lookup(table, &bigram) {
                phonemes.extend(symbols.iter().map(|s| Phoneme::new(*s, language)));
                i += 2;
                continue;
            }
        }

        let single = c.to_string();
        match lookup(table, &single) {
            Some(symbols) => phonemes.extend(symbols.iter().map(|s| Phoneme::new(*s, language))),
            None => phonemes.push(Phoneme::new(single, language)),
        }
        i += 1;
    }

    phonemes
}

fn is_unicode_punctuation(c: char) -> bool {
    matches!(c, '¿' | '¡' | '«' | '»' | '“' | '”' | '‘' | '’' | '…' | '–' | '—')
}

/// Viseme for a phoneme symbol; unmapped symbols rest.
pub fn viseme_for(symbol: &str) -> VisemeId {
    PHONEME_VISEMES
        .iter()
        .find(|(p, _)| *p == symbol)
        .map(|(_, v)| *v)
        .unwrap_or(VisemeId::Rest)
}
