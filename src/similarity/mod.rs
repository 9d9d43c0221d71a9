//! Cosine similarity and chunked similarity matrices.

use std::cmp::Ordering;

use rayon::prelude::*;

use crate::constants::DEFAULT_SIMILARITY_CHUNK_SIZE;

#[cfg(test)]
mod tests;

/// Cosine similarity. Zero-length, mismatched or zero-norm inputs score `0.0`.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (dot, norm_a_sq, norm_b_sq) = a
        .iter()
        .zip(b.iter())
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, na, nb), (&av, &bv)| {
            (dot + av * bv, na + av * av, nb + bv * bv)
        });

    let norm_a = norm_a_sq.sqrt();
    let norm_b = norm_b_sq.sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

/// Row-major `rows.len() x cols.len()` cosine matrix.
///
/// Rows are processed in chunks of `chunk_size` on the rayon pool. Every cell is
/// computed independently, so the result does not depend on the chunk size.
pub fn similarity_matrix<R, C>(rows: &[R], cols: &[C], chunk_size: usize) -> Vec<f32>
where
    R: AsRef<[f32]> + Sync,
    C: AsRef<[f32]> + Sync,
{
    let width = cols.len();
    let mut values = vec![0.0f32; rows.len() * width];
    if width == 0 || rows.is_empty() {
        return values;
    }

    let chunk_rows = if chunk_size == 0 {
        DEFAULT_SIMILARITY_CHUNK_SIZE
    } else {
        chunk_size
    };

    values
        .par_chunks_mut(chunk_rows * width)
        .zip(rows.par_chunks(chunk_rows))
        .for_each(|(out, row_chunk)| {
            for (row_out, row) in out.chunks_mut(width).zip(row_chunk) {
                for (cell, col) in row_out.iter_mut().zip(cols) {
                    *cell = cosine_similarity(row.as_ref(), col.as_ref());
                }
            }
        });

    values
}

/// Orders `(index, score)` by descending score, then ascending index.
#[inline]
pub fn rank_order(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.cmp(&b.0))
}

/// Keeps the `k` best `(index, score)` pairs in [`rank_order`].
pub fn top_k(mut scored: Vec<(usize, f32)>, k: usize) -> Vec<(usize, f32)> {
    scored.sort_by(rank_order);
    scored.truncate(k);
    scored
}
