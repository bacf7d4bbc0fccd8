use rayon::prelude::*;

/// Multiplies each element by `factor`.
/// `chunk_size` splits the work into rayon tasks.
pub fn scale(a_slice: &mut [f64], factor: f64, chunk_size: usize) {
    a_slice
        .par_chunks_mut(chunk_size.max(1))
        .for_each(|a_chunk: &mut [f64]| {
            for a in a_chunk {
                *a *= factor;
            }
        });
}

/// a += b, element wise.
pub fn accumulate(a_slice: &mut [f64], b_slice: &[f64], chunk_size: usize) {
    debug_assert_eq!(a_slice.len(), b_slice.len());
    let chunk_size = chunk_size.max(1);
    a_slice
        .par_chunks_mut(chunk_size)
        .zip(b_slice.par_chunks(chunk_size))
        .for_each(|(a_chunk, b_chunk)| {
            for (a, b) in a_chunk.iter_mut().zip(b_chunk.iter()) {
                *a += *b;
            }
        });
}

pub fn norm_squared(a_slice: &[f64], chunk_size: usize) -> f64 {
    a_slice
        .par_chunks(chunk_size.max(1))
        .map(|a_chunk: &[f64]| a_chunk.iter().map(|a| a * a).sum::<f64>())
        .sum()
}

pub fn max_abs(a_slice: &[f64], chunk_size: usize) -> f64 {
    a_slice
        .par_chunks(chunk_size.max(1))
        .map(|a_chunk: &[f64]| {
            a_chunk.iter().fold(0.0_f64, |m, a| m.max(a.abs()))
        })
        .reduce(|| 0.0, f64::max)
}
