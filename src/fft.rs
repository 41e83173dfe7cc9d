//! FFT facade and the `SpectralFrame` workspace value.
//!
//! Wraps `microfft` the way `fft/mod.rs` wraps it for the phase vocoder,
//! but narrowed to exactly the two transform shapes this codec needs: a
//! real-input forward FFT at 512 points (speech analysis) and a genuinely
//! complex forward/inverse pair at 128 points (cepstral phase synthesis).

use crate::consts::{FFT_SIZE, PHASE_FFT_SIZE};
use microfft::Complex32;

/// One windowed, FFT'd analysis frame, produced once per sub-frame by the
/// sinusoidal analyzer and shared by reference across pitch refinement,
/// amplitude estimation, and voicing — rather than a module-global buffer
/// every stage reaches into separately.
///
/// Exposes the full Hermitian-symmetric bin range `[0, FFT_SIZE)`: bins
/// at or past the Nyquist point mirror transparently, which matters
/// because harmonic-amplitude and pitch-refinement index arithmetic can
/// legitimately run a few bins past bin `FFT_SIZE/2` for the highest
/// harmonics of a low-pitched voice.
pub struct SpectralFrame {
    /// `microfft::real::rfft_512` output: bins `0..FFT_SIZE/2`, with the
    /// Nyquist bin packed into `half[0].im`.
    half: [Complex32; FFT_SIZE / 2],
}

impl SpectralFrame {
    /// Windows `samples` in place is the caller's job; this just runs the
    /// forward real FFT and snapshots the result.
    pub fn analyze(samples: &mut [f32; FFT_SIZE]) -> Self {
        let spectrum = microfft::real::rfft_512(samples);
        let mut half = [Complex32 { re: 0.0, im: 0.0 }; FFT_SIZE / 2];
        half.copy_from_slice(spectrum);
        Self { half }
    }

    /// Returns `(re, im)` at `bin`, mirrored via conjugate symmetry for
    /// `bin >= FFT_SIZE/2`. `bin` is taken modulo `FFT_SIZE` so an
    /// over-wide harmonic index never panics.
    pub fn complex_at(&self, bin: usize) -> (f32, f32) {
        let b = bin % FFT_SIZE;
        let half_n = FFT_SIZE / 2;
        if b == 0 {
            (self.half[0].re, 0.0)
        } else if b == half_n {
            (self.half[0].im, 0.0)
        } else if b < half_n {
            (self.half[b].re, self.half[b].im)
        } else {
            let m = FFT_SIZE - b;
            (self.half[m].re, -self.half[m].im)
        }
    }

    pub fn magnitude_sq(&self, bin: usize) -> f32 {
        let (re, im) = self.complex_at(bin);
        re * re + im * im
    }
}

/// Real cepstrum round trip used by the amplitude decoder's phase
/// reconstruction step: builds a
/// Hermitian-symmetric 128-point spectrum from `mag[0..NS)`, inverse-FFTs
/// it, folds the non-minimum-phase half back in, and forward-FFTs the
/// fold. Returns the imaginary part of the refolded spectrum, which is
/// the (scaled) minimum phase at each of the `NS` frequency samples.
pub fn real_cepstrum_fold(mag: &[f32; crate::consts::NS]) -> [f32; crate::consts::NS] {
    use crate::consts::NS;

    let mut sdb = [Complex32 { re: 0.0, im: 0.0 }; PHASE_FFT_SIZE];
    sdb[0] = Complex32 { re: mag[0], im: 0.0 };
    for i in 1..NS {
        sdb[i] = Complex32 { re: mag[i], im: 0.0 };
        sdb[PHASE_FFT_SIZE - i] = Complex32 { re: mag[i], im: 0.0 };
    }

    // microfft's inverse transform is normalized by 1/N internally.
    let c = microfft::inverse::ifft_128(&mut sdb);

    let mut cf = [Complex32 { re: 0.0, im: 0.0 }; PHASE_FFT_SIZE];
    cf[0] = c[0];
    for i in 1..(NS - 1) {
        cf[i] = Complex32 {
            re: c[i].re + c[PHASE_FFT_SIZE - i].re,
            im: c[i].im + c[PHASE_FFT_SIZE - i].im,
        };
    }
    cf[NS - 1] = c[NS - 1];

    let folded = microfft::complex::cfft_128(&mut cf);

    let mut phase = [0.0f32; NS];
    for (i, p) in phase.iter_mut().enumerate() {
        *p = folded[i].im / crate::consts::SCALE;
    }
    phase
}

/// Inverse real FFT used by the frame synthesizer's spectral-paint step.
pub fn inverse_real_fft(spectrum: &mut [Complex32; FFT_SIZE / 2 + 1]) -> [f32; FFT_SIZE] {
    // microfft's real module only exposes the forward transform at a
    // fixed size; the inverse real transform is synthesized from the
    // complex inverse FFT over the full (Hermitian-extended) spectrum.
    let mut full = [Complex32 { re: 0.0, im: 0.0 }; FFT_SIZE];
    full[..(FFT_SIZE / 2 + 1)].copy_from_slice(spectrum);
    for i in 1..(FFT_SIZE / 2) {
        full[FFT_SIZE - i] = Complex32 {
            re: spectrum[i].re,
            im: -spectrum[i].im,
        };
    }
    let time = microfft::inverse::ifft_512(&mut full);
    let mut out = [0.0f32; FFT_SIZE];
    for (o, t) in out.iter_mut().zip(time.iter()) {
        *o = t.re;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dc_only_signal_has_flat_spectrum() {
        let mut samples = [1.0f32; FFT_SIZE];
        let frame = SpectralFrame::analyze(&mut samples);
        let (re, im) = frame.complex_at(0);
        assert!(re.abs() > 1.0);
        assert_eq!(im, 0.0);
        assert!(frame.magnitude_sq(10) < 1e-3);
    }

    #[test]
    fn mirrors_past_nyquist() {
        let mut samples = [0.0f32; FFT_SIZE];
        samples[0] = 1.0;
        let frame = SpectralFrame::analyze(&mut samples);
        let (re_a, im_a) = frame.complex_at(300);
        let (re_b, im_b) = frame.complex_at(FFT_SIZE - 300);
        assert_eq!(re_a, re_b);
        assert_eq!(im_a, -im_b);
    }
}
