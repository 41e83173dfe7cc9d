//! Three-point parabolic interpolation, used throughout the envelope
//! resampler and phase synthesizer to move between the harmonic (rate-L)
//! and fixed (rate-K) amplitude representations.

/// Interpolates `yp` sampled at `xp` (both length `np`, `xp` increasing)
/// onto the `x` query points, writing `result`. `xp`/`yp` are 0-indexed
/// here; callers pass the sub-slice starting at index 1 the way the
/// reference's 1-indexed arrays do.
pub fn interp_para(result: &mut [f32], xp: &[f32], yp: &[f32], np: usize, x: &[f32]) {
    let mut k = 0usize;
    for (i, &xi) in x.iter().enumerate() {
        while xp[k + 1] < xi && k < np - 3 {
            k += 1;
        }

        let (x1, y1) = (xp[k], yp[k]);
        let (x2, y2) = (xp[k + 1], yp[k + 1]);
        let (x3, y3) = (xp[k + 2], yp[k + 2]);

        let a = ((y3 - y2) / (x3 - x2) - (y2 - y1) / (x2 - x1)) / (x3 - x1);
        let b = ((y3 - y2) / (x3 - x2) * (x2 - x1) + (y2 - y1) / (x2 - x1) * (x3 - x2)) / (x3 - x1);

        result[i] = a * (xi - x2) * (xi - x2) + b * (xi - x2) + y2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reproduces_quadratic_exactly() {
        let xp = [0.0f32, 1.0, 2.0, 3.0, 4.0];
        let yp: [f32; 5] = core::array::from_fn(|i| {
            let x = xp[i];
            2.0 * x * x - 3.0 * x + 1.0
        });
        let queries = [0.5f32, 1.5, 2.5, 3.5];
        let mut out = [0.0f32; 4];
        interp_para(&mut out, &xp, &yp, xp.len(), &queries);
        for (i, &xi) in queries.iter().enumerate() {
            let expected = 2.0 * xi * xi - 3.0 * xi + 1.0;
            assert!((out[i] - expected).abs() < 1e-4, "{} vs {}", out[i], expected);
        }
    }
}
