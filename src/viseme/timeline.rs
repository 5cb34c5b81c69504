//! Text → viseme timeline.

use crate::viseme::phonemes::{phonemize, viseme_for};
use crate::viseme::types::{Phoneme, VisemeEvent};

/// Build a viseme timeline for `text` spoken over `total_duration` seconds.
///
/// Every phoneme gets an equal share of the duration. That is a placeholder
/// timing model; real per-phoneme durations need a duration predictor.
/// An empty result means "no animation" and is not an error.
pub fn generate(text: &str, language: &str, total_duration: f64) -> Vec<VisemeEvent> {
    events_from_phonemes(&phonemize(text, language), total_duration)
}

/// Spread `phonemes` evenly over `total_duration`.
///
/// Event `i` spans `[i·Δ, (i+1)·Δ)` with `Δ = total_duration / count`, so each
/// event starts exactly where the previous one ends. The last event ends at
/// `total_duration` exactly. A non-positive or non-finite duration yields no
/// events.
pub fn events_from_phonemes(phonemes: &[Phoneme], total_duration: f64) -> Vec<VisemeEvent> {
    if phonemes.is_empty() || !total_duration.is_finite() || total_duration <= 0.0 {
        return Vec::new();
    }

    let count = phonemes.len();
    let step = total_duration / count as f64;

    phonemes
        .iter()
        .enumerate()
        .map(|(i, phoneme)| {
            let start_time = i as f64 * step;
            let end_time = if i + 1 == count {
                total_duration
            } else {
                (i + 1) as f64 * step
            };
            VisemeEvent::new(viseme_for(&phoneme.symbol), start_time, end_time)
        })
        .collect()
}

/// Sum of event spans.
pub fn total_span(events: &[VisemeEvent]) -> f64 {
    events.iter().map(VisemeEvent::duration).sum()
}
