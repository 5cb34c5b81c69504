//! Greedy (argmax) decoding over a flat logits buffer.
//!
//! The buffer is treated as `steps × vocab_size` scores produced in one model
//! call. Real autoregressive decoding re-invokes the model per step; that
//! loop belongs to the caller, and this decoder stays a pure function of one
//! buffer. Stopping on a stop token only approximates it.

use crate::decode::vocab::Vocabulary;

/// Index of the largest value; the first index wins ties. NaN never wins.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((i, score));
        }
    }
    best.map(|(i, _)| i)
}

/// Stateless greedy decoder shared by the STT, MT and TTS adapters.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyTokenDecoder;

impl GreedyTokenDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Argmax id per `vocab_size` chunk, halting before the first
    /// `stop_token`. A trailing partial chunk is ignored.
    pub fn token_ids(&self, logits: &[f32], vocab_size: usize, stop_token: Option<u32>) -> Vec<u32> {
        if vocab_size == 0 {
            return Vec::new();
        }

        let mut ids = Vec::with_capacity(logits.len() / vocab_size);
        for chunk in logits.chunks_exact(vocab_size) {
            let Some(id) = argmax(chunk) else {
                continue;
            };
            let id = id as u32;
            if stop_token == Some(id) {
                break;
            }
            ids.push(id);
        }
        ids
    }

    /// Decode to symbols. Reserved tokens are removed and ids missing from
    /// `vocab` are dropped silently.
    pub fn decode(
        &self,
        logits: &[f32],
        vocab_size: usize,
        vocab: &Vocabulary,
        stop_token: Option<u32>,
    ) -> Vec<String> {
        self.token_ids(logits, vocab_size, stop_token)
            .into_iter()
            .filter_map(|id| symbol_for(vocab, id))
            .collect()
    }

    /// Decode and join with single spaces.
    pub fn decode_text(
        &self,
        logits: &[f32],
        vocab_size: usize,
        vocab: &Vocabulary,
        stop_token: Option<u32>,
    ) -> String {
        join_symbols(&self.decode(logits, vocab_size, vocab, stop_token))
    }
}

fn symbol_for(vocab: &Vocabulary, id: u32) -> Option<String> {
    if vocab.is_reserved(id) {
        return None;
    }
    vocab
        .get(id)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Join symbols with one space and trim the result.
pub fn join_symbols(symbols: &[String]) -> String {
    symbols.join(" ").trim().to_string()
}
