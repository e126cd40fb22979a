// ============================================================
// Layer 5 — CTC Greedy Decoder
// ============================================================
// Best-path decoding of CTC logits: take the arg-max symbol of
// every valid frame, merge consecutive repeats, then drop blanks.
//
//   frames:  a a _ a b b _
//   result:  a a b

use burn::prelude::*;

use crate::ml::sequence::SequenceBatch;

/// Merge repeated symbols, then remove `blank`.
pub fn collapse_path(path: &[usize], blank: usize) -> Vec<usize> {
    let mut decoded = Vec::new();
    let mut previous = None;
    for &symbol in path {
        if previous != Some(symbol) && symbol != blank {
            decoded.push(symbol);
        }
        previous = Some(symbol);
    }
    decoded
}

/// Per-frame arg-max symbols of every sample, cut to its length.
pub fn best_paths<B: Backend>(logits: &SequenceBatch<B>) -> Vec<Vec<usize>> {
    let max_len = logits.max_len();
    let symbols: Vec<usize> = logits
        .data
        .clone()
        .argmax(2)
        .into_data()
        .iter::<i64>()
        .map(|s| s as usize)
        .collect();

    logits
        .lengths
        .iter()
        .enumerate()
        .map(|(i, &len)| symbols[i * max_len..i * max_len + len].to_vec())
        .collect()
}

/// Greedy CTC decoding of a batch of logits.
pub fn greedy_decode<B: Backend>(logits: &SequenceBatch<B>, blank: usize) -> Vec<Vec<usize>> {
    best_paths(logits)
        .iter()
        .map(|path| collapse_path(path, blank))
        .collect()
}
