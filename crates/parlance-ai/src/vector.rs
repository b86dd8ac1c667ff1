//! Small vector helpers shared by the provider, index, and matcher.

/// L2-normalize a vector in place. Zero vectors are left untouched.
pub(crate) fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity of two unit vectors.
pub(crate) fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Component-wise mean of equal-length vectors, renormalized to unit length.
pub(crate) fn mean_normalized(vectors: &[Vec<f32>], dim: usize) -> Vec<f32> {
    let mut sum = vec![0.0f32; dim];
    for v in vectors {
        for (acc, &val) in sum.iter_mut().zip(v) {
            *acc += val;
        }
    }
    if !vectors.is_empty() {
        let count = vectors.len() as f32;
        for v in &mut sum {
            *v /= count;
        }
    }
    normalize(&mut sum);
    sum
}
