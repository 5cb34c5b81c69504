//! Viseme identifiers and timed events.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical mouth shapes, named after the ARPAbet sounds that produce them.
///
/// Closed set: consonant groups share one shape (`Pp` covers p/b/m).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VisemeId {
    /// Neutral closed mouth
    Rest,
    // Vowels
    Aa,
    Ae,
    Ah,
    Ao,
    Aw,
    Ay,
    Eh,
    Er,
    Ey,
    Ih,
    Iy,
    Ow,
    Oy,
    Uh,
    Uw,
    // Consonant groups
    Pp,
    Ff,
    Th,
    Dd,
    Kk,
    Ch,
    Ss,
    Nn,
    Ll,
    Rr,
    Ww,
    Yy,
    Hh,
}

impl VisemeId {
    pub const ALL: [VisemeId; 29] = [
        VisemeId::Rest,
        VisemeId::Aa,
        VisemeId::Ae,
        VisemeId::Ah,
        VisemeId::Ao,
        VisemeId::Aw,
        VisemeId::Ay,
        VisemeId::Eh,
        VisemeId::Er,
        VisemeId::Ey,
        VisemeId::Ih,
        VisemeId::Iy,
        VisemeId::Ow,
        VisemeId::Oy,
        VisemeId::Uh,
        VisemeId::Uw,
        VisemeId::Pp,
        VisemeId::Ff,
        VisemeId::Th,
        VisemeId::Dd,
        VisemeId::Kk,
        VisemeId::Ch,
        VisemeId::Ss,
        VisemeId::Nn,
        VisemeId::Ll,
        VisemeId::Rr,
        VisemeId::Ww,
        VisemeId::Yy,
        VisemeId::Hh,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VisemeId::Rest => "REST",
            VisemeId::Aa => "AA",
            VisemeId::Ae => "AE",
            VisemeId::Ah => "AH",
            VisemeId::Ao => "AO",
            VisemeId::Aw => "AW",
            VisemeId::Ay => "AY",
            VisemeId::Eh => "EH",
            VisemeId::Er => "ER",
            VisemeId::Ey => "EY",
            VisemeId::Ih => "IH",
            VisemeId::Iy => "IY",
            VisemeId::Ow => "OW",
            VisemeId::Oy => "OY",
            VisemeId::Uh => "UH",
            VisemeId::Uw => "UW",
            VisemeId::Pp => "PP",
            VisemeId::Ff => "FF",
            VisemeId::Th => "TH",
            VisemeId::Dd => "DD",
            VisemeId::Kk => "KK",
            VisemeId::Ch => "CH",
            VisemeId::Ss => "SS",
            VisemeId::Nn => "NN",
            VisemeId::Ll => "LL",
            VisemeId::Rr => "RR",
            VisemeId::Ww => "WW",
            VisemeId::Yy => "YY",
            VisemeId::Hh => "HH",
        }
    }

    pub fn is_rest(&self) -> bool {
        *self == VisemeId::Rest
    }
}

impl fmt::Display for VisemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A language-tagged phoneme symbol. Phonemes carry no duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phoneme {
    pub symbol: String,
    pub language: String,
}

impl Phoneme {
    pub fn new(symbol: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            language: language.into(),
        }
    }
}

/// One mouth shape held over the half-open interval `[start_time, end_time)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisemeEvent {
    pub symbol: VisemeId,
    /// Seconds
    pub start_time: f64,
    /// Seconds
    pub end_time: f64,
}

impl VisemeEvent {
    pub fn new(symbol: VisemeId, start_time: f64, end_time: f64) -> Self {
        Self {
            symbol,
            start_time,
            end_time,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn contains(&self, time: f64) -> bool {
        self.start_time <= time && time < self.end_time
    }

    pub fn shifted(&self, offset: f64) -> Self {
        Self {
            symbol: self.symbol,
            start_time: self.start_time + offset,
            end_time: self.end_time + offset,
        }
    }
}
