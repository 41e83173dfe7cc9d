//! Sinusoidal analysis: pitch refinement, amplitude estimation, and
//! MBE-style voicing decision, driven off a fresh [`SpectralFrame`] per
//! 10 ms sub-frame.

use crate::consts::{
    FFT_SIZE, FRACTPI, MAX_AMP, M_PITCH, N_SAMP, NW, ONE_ON_R, PI, P_MAX, P_MIN, SIXTY, TAU,
    V_THRESH,
};
use crate::fft::SpectralFrame;
use crate::model::Model;
use crate::nlp::NlpEstimator;
use crate::tables::HAMMING;

pub struct Analyzer {
    sn: [f32; M_PITCH],
    nlp: NlpEstimator,
    #[cfg(feature = "debug-logging")]
    prev_voiced: bool,
}

impl Analyzer {
    pub const fn new() -> Self {
        Self {
            sn: [0.0; M_PITCH],
            nlp: NlpEstimator::new(),
            #[cfg(feature = "debug-logging")]
            prev_voiced: false,
        }
    }

    /// Processes one 10 ms (`N_SAMP`-sample) block and returns the
    /// refreshed harmonic model. Called four times per 40 ms codec
    /// frame; only the last call's model is quantized.
    pub fn analyze_one_frame(&mut self, speech: &[i16; N_SAMP]) -> Model {
        let base = M_PITCH - N_SAMP;
        for i in 0..base {
            self.sn[i] = self.sn[N_SAMP + i];
        }
        for i in 0..N_SAMP {
            self.sn[base + i] = speech[i] as f32;
        }

        let mut sw = [0.0f32; FFT_SIZE];
        for i in 0..(NW / 2) {
            let half = i + M_PITCH / 2;
            sw[i] = self.sn[half] * crate::tables::HAMMING2[half];
        }
        for i in 0..(NW / 2) {
            let half = i + M_PITCH / 2 - NW / 2;
            sw[FFT_SIZE - NW / 2 + i] = self.sn[half] * crate::tables::HAMMING2[half];
        }

        let frame = SpectralFrame::analyze(&mut sw);

        let pitch_period = self.nlp.estimate_pitch_period(&self.sn);
        let mut model = Model::new();
        model.wo = TAU / pitch_period as f32;
        model.l = libm::floorf(PI / model.wo) as usize;

        two_stage_pitch_refinement(&mut model, &frame);
        estimate_amplitudes(&mut model, &frame);
        est_voicing_mbe(&mut model, &frame);

        #[cfg(feature = "debug-logging")]
        if model.voiced != self.prev_voiced {
            log::debug!(
                "voicing transition: {} -> {} (wo={:.4})",
                self.prev_voiced,
                model.voiced,
                model.wo
            );
            self.prev_voiced = model.voiced;
        }

        model
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn harmonic_energy(model: &Model, frame: &SpectralFrame, wo: f32) -> f32 {
    let mut e = 0.0f32;
    let tval = wo * ONE_ON_R;
    for m in 1..=model.l {
        let b = (m as f32 * tval + 0.5) as usize;
        e += frame.magnitude_sq(b);
    }
    e
}

fn hs_pitch_refinement(model: &mut Model, frame: &SpectralFrame, pmin: f32, pmax: f32, pstep: f32) {
    model.l = libm::floorf(PI / model.wo) as usize;

    let mut wom = model.wo;
    let mut em = 0.0f32;

    let mut pitch = pmin;
    while pitch <= pmax {
        let wo = TAU / pitch;
        let e = harmonic_energy(model, frame, wo);
        if e > em {
            em = e;
            wom = wo;
        }
        pitch += pstep;
    }

    model.wo = wom;
}

fn two_stage_pitch_refinement(model: &mut Model, frame: &SpectralFrame) {
    let tval = TAU / model.wo;
    hs_pitch_refinement(model, frame, tval - 5.0, tval + 5.0, 1.0);

    let tval = TAU / model.wo;
    hs_pitch_refinement(model, frame, tval - 1.0, tval + 1.0, 0.25);

    if model.wo < TAU / P_MAX {
        model.wo = TAU / P_MAX;
    } else if model.wo > TAU / P_MIN {
        model.wo = TAU / P_MIN;
    }

    model.l = libm::floorf(PI / model.wo) as usize;
    if model.wo * model.l as f32 >= FRACTPI {
        model.l -= 1;
    }
}

fn estimate_amplitudes(model: &mut Model, frame: &SpectralFrame) {
    let amp = model.wo * ONE_ON_R;
    model.a = [0.0; MAX_AMP + 1];

    for m in 1..=model.l {
        let am = ((m as f32 - 0.5) * amp + 0.5) as usize;
        let bm = ((m as f32 + 0.5) * amp + 0.5) as usize;

        let mut den = 0.0f32;
        for i in am..bm {
            den += frame.magnitude_sq(i);
        }
        model.a[m] = libm::sqrtf(den);
    }
}

fn est_voicing_mbe(model: &mut Model, frame: &SpectralFrame) {
    let mut sig = 1e-4f32;
    for l in 1..=(model.l / 4) {
        sig += model.a[l] * model.a[l];
    }

    let wo = model.wo * FFT_SIZE as f32 / TAU;
    let mut error = 1e-4f32;

    for l in 1..=(model.l / 4) {
        let al = libm::ceilf((l as f32 - 0.5) * wo) as i32;
        let bl = libm::ceilf((l as f32 + 0.5) * wo) as i32;
        let offset = (FFT_SIZE as f32 / 2.0 - l as f32 * wo + 0.5) as i32;

        let mut am_re = 0.0f32;
        let mut am_im = 0.0f32;
        let mut den = 0.0f32;
        let mut m = al;
        while m < bl {
            let h_idx = (offset + m).clamp(0, FFT_SIZE as i32 - 1) as usize;
            let h = HAMMING[h_idx];
            let (re, im) = frame.complex_at(m.rem_euclid(FFT_SIZE as i32) as usize);
            am_re += re * h;
            am_im += im * h;
            den += h * h;
            m += 1;
        }
        if den > 0.0 {
            am_re /= den;
            am_im /= den;
        }

        let mut m = al;
        while m < bl {
            let h_idx = (offset + m).clamp(0, FFT_SIZE as i32 - 1) as usize;
            let h = HAMMING[h_idx];
            let (re, im) = frame.complex_at(m.rem_euclid(FFT_SIZE as i32) as usize);
            let dre = re - am_re * h;
            let dim = im - am_im * h;
            error += dre * dre + dim * dim;
            m += 1;
        }
    }

    let snr = 10.0 * libm::log10f(sig / error);
    model.voiced = snr > V_THRESH;

    let mut elow = 1e-4f32;
    let mut ehigh = 1e-4f32;
    for l in 1..=(model.l / 2) {
        elow += model.a[l] * model.a[l];
    }
    for l in (model.l / 2)..=model.l {
        ehigh += model.a[l] * model.a[l];
    }
    let eratio = 10.0 * libm::log10f(elow / ehigh);

    if !model.voiced && eratio > 10.0 {
        model.voiced = true;
    }
    if model.voiced {
        if eratio < -10.0 {
            model.voiced = false;
        }
        if eratio < -4.0 && model.wo <= SIXTY {
            model.voiced = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voiced_tone_yields_plausible_pitch_and_voicing() {
        let mut analyzer = Analyzer::new();
        let freq_hz = 150.0f32;
        let mut model = Model::new();
        for frame_idx in 0..8 {
            let mut speech = [0i16; N_SAMP];
            for (i, s) in speech.iter_mut().enumerate() {
                let t = ((frame_idx * N_SAMP + i) as f32) / crate::consts::FS;
                *s = (8000.0 * libm::sinf(TAU * freq_hz * t)) as i16;
            }
            model = analyzer.analyze_one_frame(&speech);
        }
        assert!(model.wo > TAU / P_MAX && model.wo < TAU / P_MIN);
        assert!(model.l > 0);
    }

    #[test]
    fn silence_is_unvoiced() {
        let mut analyzer = Analyzer::new();
        let speech = [0i16; N_SAMP];
        let mut model = Model::new();
        for _ in 0..8 {
            model = analyzer.analyze_one_frame(&speech);
        }
        assert!(!model.voiced);
    }
}
