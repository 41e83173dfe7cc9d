//! Frame synthesis: zero-order phase excitation, background-noise
//! post-filtering, and trapezoidal-window overlap-add reconstruction.

use crate::consts::{
    BG_BETA, BG_MARGIN, BG_THRESH, CODEC2_RND_MAX, FFT_SIZE, N_SAMP, SYNTH_WINDOW, TAU,
};
use crate::model::Model;
use crate::rng::Rng;
use crate::tables::PARZEN;
use microfft::Complex32;

pub struct FrameSynthesizer {
    sn_: [f32; SYNTH_WINDOW],
    ex_phase: f32,
    bg_est: f32,
    rng: Rng,
}

impl FrameSynthesizer {
    pub const fn new() -> Self {
        Self {
            sn_: [0.0; SYNTH_WINDOW],
            ex_phase: 0.0,
            bg_est: 0.0,
            rng: Rng::new(),
        }
    }

    /// Synthesizes one 10 ms (`N_SAMP`-sample) PCM block from a decoded
    /// model, in place, advancing the overlap-add and background-noise
    /// state for the next call.
    pub fn synthesize_one_frame(&mut self, model: &mut Model, out: &mut [i16; N_SAMP]) {
        self.phase_synth_zero_order(model);
        self.postfilter(model);
        self.synthesize(model);

        let mut max_sample = 0.0f32;
        for i in 0..N_SAMP {
            if self.sn_[i] > max_sample {
                max_sample = self.sn_[i];
            }
        }

        let over = max_sample / 30000.0;
        if over > 1.0 {
            #[cfg(feature = "debug-logging")]
            log::trace!("gain limiter engaged: peak={max_sample:.0}, over={over:.3}");
            let gain = 1.0 / (over * over);
            for i in 0..N_SAMP {
                self.sn_[i] *= gain;
            }
        }

        for i in 0..N_SAMP {
            self.sn_[i] *= 1.5;
        }

        for (o, &s) in out.iter_mut().zip(self.sn_[..N_SAMP].iter()) {
            *o = if s > 32760.0 {
                32760
            } else if s < -32760.0 {
                -32760
            } else {
                s as i16
            };
        }
    }

    fn phase_synth_zero_order(&mut self, model: &mut Model) {
        self.ex_phase +=
            model.wo * N_SAMP as f32 - libm::floorf(self.ex_phase / TAU + 0.5) * TAU;

        for m in 1..=model.l {
            let (ex_re, ex_im) = if model.voiced {
                (
                    libm::cosf(m as f32 * self.ex_phase),
                    libm::sinf(m as f32 * self.ex_phase),
                )
            } else {
                let rand_phase = TAU * self.rng.next_u16() as f32 / CODEC2_RND_MAX;
                (libm::cosf(rand_phase), libm::sinf(rand_phase))
            };

            let h = model.h[m];
            let re = ex_re * h.re - ex_im * h.im;
            let im = ex_re * h.im + ex_im * h.re;

            model.phi[m] = libm::atan2f(im, re + 1e-12);
        }
    }

    fn postfilter(&mut self, model: &mut Model) {
        let mut e = 1e-12f32;
        for i in 1..=model.l {
            e += model.a[i] * model.a[i];
        }
        e = 10.0 * libm::log10f(e / model.l as f32);

        if e < BG_THRESH && !model.voiced {
            self.bg_est *= (1.0 - BG_BETA) + e * BG_BETA;
        }

        let thresh = libm::powf(10.0, (self.bg_est + BG_MARGIN) / 20.0);

        if model.voiced {
            for i in 1..=model.l {
                if model.a[i] < thresh {
                    model.phi[i] = TAU * self.rng.next_u16() as f32 / CODEC2_RND_MAX;
                }
            }
        }
    }

    fn synthesize(&mut self, model: &Model) {
        for i in 0..(N_SAMP - 1) {
            self.sn_[i] = self.sn_[N_SAMP + i];
        }
        self.sn_[N_SAMP - 1] = 0.0;

        let mut sw_spectrum = [Complex32 { re: 0.0, im: 0.0 }; FFT_SIZE / 2 + 1];
        let wo = model.wo * FFT_SIZE as f32 / TAU;

        for l in 1..=model.l {
            let mut b = (l as f32 * wo + 0.5) as usize;
            if b > FFT_SIZE / 2 - 1 {
                b = FFT_SIZE / 2 - 1;
            }
            sw_spectrum[b] = Complex32 {
                re: libm::cosf(model.phi[l]) * model.a[l],
                im: libm::sinf(model.phi[l]) * model.a[l],
            };
        }

        let sw = crate::fft::inverse_real_fft(&mut sw_spectrum);

        for i in 0..(N_SAMP - 1) {
            self.sn_[i] += sw[FFT_SIZE - N_SAMP + 1 + i] * PARZEN[i];
        }

        for (j, i) in ((N_SAMP - 1)..(N_SAMP * 2)).enumerate() {
            self.sn_[i] = sw[j] * PARZEN[i];
        }
    }
}

impl Default for FrameSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_model_yields_bounded_pcm() {
        let mut synth = FrameSynthesizer::new();
        let mut model = Model::new();
        model.voiced = false;
        model.l = 0;
        let mut out = [0i16; N_SAMP];
        synth.synthesize_one_frame(&mut model, &mut out);
        for &s in out.iter() {
            assert!(s.abs() <= 32760);
        }
    }

    #[test]
    fn voiced_model_produces_energy() {
        let mut synth = FrameSynthesizer::new();
        let mut model = Model::new();
        model.voiced = true;
        model.wo = TAU / 80.0;
        model.l = 30;
        for m in 1..=model.l {
            model.a[m] = 200.0;
        }
        let mut out = [0i16; N_SAMP];
        for _ in 0..3 {
            synth.synthesize_one_frame(&mut model, &mut out);
        }
        let energy: i64 = out.iter().map(|&s| (s as i64) * (s as i64)).sum();
        assert!(energy > 0);
    }
}
