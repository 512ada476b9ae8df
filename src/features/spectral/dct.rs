//! Orthonormal DCT-II

/// Orthonormal type-II discrete cosine transform
///
/// `X[k] = s(k) Σ x[n] cos(πk(2n + 1) / 2N)` with `s(0) = √(1/N)` and
/// `s(k) = √(2/N)` otherwise. The output has the input's length.
pub fn dct2_orthonormal(input: &[f32]) -> Vec<f32> {
    let n = input.len();
    if n == 0 {
        return Vec::new();
    }
    let nf = n as f32;
    (0..n)
        .map(|k| {
            let scale = if k == 0 { (1.0 / nf).sqrt() } else { (2.0 / nf).sqrt() };
            let sum: f32 = input
                .iter()
                .enumerate()
                .map(|(i, &x)| {
                    x * (std::f32::consts::PI * k as f32 * (2 * i + 1) as f32 / (2.0 * nf)).cos()
                })
                .sum();
            scale * sum
        })
        .collect()
}
