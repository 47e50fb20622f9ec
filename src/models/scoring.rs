//! Score post-processing for classifier outputs

/// Convert raw logits into a probability distribution.
///
/// Subtracts the maximum logit before exponentiating so large activations
/// do not overflow.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    if logits.is_empty() {
        return Vec::new();
    }

    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();

    if sum > 0.0 && sum.is_finite() {
        exps.into_iter().map(|e| e / sum).collect()
    } else {
        // Degenerate input (NaN logits); fall back to uniform
        vec![1.0 / logits.len() as f32; logits.len()]
    }
}

/// Index and value of the highest score. Ties resolve to the lower index.
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, s)| match best {
            Some((_, b)) if b >= s => best,
            _ if s.is_nan() => best,
            _ => Some((i, s)),
        })
}

/// The `k` highest scores as `(index, score)` pairs, highest first.
///
/// `k` is clamped to the number of scores. Equal scores keep index order.
pub fn top_k(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut indexed: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    indexed.truncate(k.min(scores.len()));
    indexed
}
