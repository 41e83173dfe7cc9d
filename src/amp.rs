//! Rate-K envelope quantization/dequantization and frame interpolation.
//!
//! This is the module that ties the harmonic [`Model`] to the wire
//! format: resampling L harmonics down to the fixed K=20 envelope,
//! running the two-stage VQ, and on the decode side reconstructing four
//! 10 ms models (with phase) from one quantized envelope plus pitch.

use crate::codebook::{CODEBOOK1, CODEBOOK2};
use crate::consts::{AMP_K, FFT_SIZE, MAX_AMP, NS, N_MODELS, PHASE_FFT_SIZE, PI, TAU};
use crate::fft::real_cepstrum_fold;
use crate::index::Index;
use crate::interp::interp_para;
use crate::mbest::{mbest_search, MBestList};
use crate::model::Model;
use crate::quantize::{decode_energy, decode_pitch, encode_energy, encode_pitch};
use crate::tables::{AMP_FREQS_KHZ, AMP_PRE};
use microfft::Complex32;

/// Persistent decoder-side state carried frame to frame: the previous
/// rate-K envelope and the previous edge's pitch/voicing, used to
/// interpolate the 25 Hz quantized surface back up to 100 Hz.
pub struct AmpDecoderState {
    prev_rate_k: [f32; AMP_K],
    wo_left: f32,
    voicing_left: bool,
}

impl AmpDecoderState {
    pub const fn new() -> Self {
        Self {
            prev_rate_k: [0.0; AMP_K],
            wo_left: TAU / 100.0,
            voicing_left: false,
        }
    }
}

impl Default for AmpDecoderState {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts the last analyzed [`Model`] of a 40 ms frame into the four
/// wire index words.
pub fn amp_model_to_index(model: &Model) -> [Index; 4] {
    let vec = resample_const_rate_f(model);

    let mean = vec.iter().sum::<f32>() / AMP_K as f32;
    let energy_idx = Index::new(4, encode_energy(mean));

    let mut vec_no_mean = [0.0f32; AMP_K];
    for k in 0..AMP_K {
        vec_no_mean[k] = vec[k] - mean;
    }

    let (vq1, vq2) = rate_k_mbest_encode(&vec_no_mean);

    let pitch_idx = if model.voiced {
        let mut pitch = encode_pitch(model.wo);
        if pitch == 0 {
            pitch = 1;
        }
        Index::new(6, pitch)
    } else {
        Index::new(6, 0)
    };

    [Index::new(9, vq2), Index::new(9, vq1), energy_idx, pitch_idx]
}

fn resample_const_rate_f(model: &Model) -> [f32; AMP_K] {
    let mut amdb = [0.0f32; MAX_AMP + 1];
    let mut freqs = [0.0f32; MAX_AMP + 1];

    let mut peak = -100.0f32;
    let tval = model.wo * 4.0 / PI;

    for m in 1..=model.l {
        amdb[m] = 20.0 * libm::log10f(model.a[m] + 1e-16);
        if amdb[m] > peak {
            peak = amdb[m];
        }
        freqs[m] = m as f32 * tval;
    }
    for m in 1..=model.l {
        if amdb[m] < peak - 50.0 {
            amdb[m] = peak - 50.0;
        }
    }

    let mut vec = [0.0f32; AMP_K];
    interp_para(&mut vec, &freqs[1..=model.l], &amdb[1..=model.l], model.l, &AMP_FREQS_KHZ);
    vec
}

fn rate_k_mbest_encode(vec_no_mean: &[f32; AMP_K]) -> (u16, u16) {
    let mut stage1 = MBestList::new();
    mbest_search(&CODEBOOK1, vec_no_mean, 0, &[0; 4], &mut stage1);

    let mut stage2 = MBestList::new();
    for cand in stage1.entries.iter() {
        let n1 = cand.index[0];
        let mut target = [0.0f32; AMP_K];
        for k in 0..AMP_K {
            target[k] = vec_no_mean[k] - CODEBOOK1[AMP_K * n1 as usize + k];
        }
        mbest_search(&CODEBOOK2, &target, 1, &cand.index, &mut stage2);
    }

    let best = stage2.entries[0];
    (best.index[1], best.index[0])
}

fn post_filter_amp(vec: &mut [f32; AMP_K]) {
    let mut e_before = 0.0f32;
    let mut e_after = 0.0f32;

    for k in 0..AMP_K {
        vec[k] += AMP_PRE[k];
        e_before += libm::powf(10.0, 2.0 * vec[k] / 20.0);
        vec[k] *= 1.5;
        e_after += libm::powf(10.0, 2.0 * vec[k] / 20.0);
    }

    let gain_db = 10.0 * libm::log10f(e_after / e_before);
    for k in 0..AMP_K {
        vec[k] -= gain_db;
        vec[k] -= AMP_PRE[k];
    }
}

fn amp_index_to_rate_k_vec(n1: u16, n2: u16, energy: u16) -> [f32; AMP_K] {
    let mut vec = [0.0f32; AMP_K];
    for k in 0..AMP_K {
        vec[k] = CODEBOOK1[AMP_K * n1 as usize + k] + CODEBOOK2[AMP_K * n2 as usize + k];
    }
    post_filter_amp(&mut vec);

    let mean = decode_energy(energy);
    for v in vec.iter_mut() {
        *v += mean;
    }
    vec
}

fn interp_wo_v(
    wo_left: f32,
    voicing_left: bool,
    wo_right: f32,
    voicing_right: bool,
) -> ([f32; N_MODELS], [usize; N_MODELS], [bool; N_MODELS]) {
    let unvoiced_wo = TAU / 100.0;
    let mut wo = [unvoiced_wo; N_MODELS];
    let mut voicing = [false; N_MODELS];

    match (voicing_left, voicing_right) {
        (false, false) => {
            // wo already defaults to the unvoiced placeholder.
        }
        (true, false) => {
            wo[0] = wo_left;
            wo[1] = wo_left;
            voicing[0] = true;
            voicing[1] = true;
        }
        (false, true) => {
            wo[2] = wo_right;
            wo[3] = wo_right;
            voicing[2] = true;
            voicing[3] = true;
        }
        (true, true) => {
            let mut c = 1.0f32;
            for i in 0..N_MODELS {
                wo[i] = wo_left * c + wo_right * (1.0 - c);
                voicing[i] = true;
                c -= 0.025;
            }
        }
    }

    let mut l = [0usize; N_MODELS];
    for i in 0..N_MODELS {
        l[i] = libm::floorf(PI / wo[i]) as usize;
    }

    (wo, l, voicing)
}

fn resample_rate_l(model: &mut Model, surface: &[f32; AMP_K]) {
    let mut vec_term = [0.0f32; AMP_K + 2];
    let mut freqs_term = [0.0f32; AMP_K + 2];

    vec_term[0] = 0.0;
    vec_term[AMP_K + 1] = 0.0;
    freqs_term[0] = 0.0;
    freqs_term[AMP_K + 1] = 4.0;
    for k in 0..AMP_K {
        vec_term[k + 1] = surface[k];
        freqs_term[k + 1] = AMP_FREQS_KHZ[k];
    }

    let tval = model.wo * 4.0 / PI;
    let mut rate_l_freqs = [0.0f32; MAX_AMP + 1];
    for m in 1..=model.l {
        rate_l_freqs[m] = m as f32 * tval;
    }

    let mut amdb = [0.0f32; MAX_AMP + 1];
    interp_para(
        &mut amdb[1..=model.l],
        &freqs_term,
        &vec_term,
        AMP_K + 2,
        &rate_l_freqs[1..=model.l],
    );

    model.a = [0.0; MAX_AMP + 1];
    for m in 1..=model.l {
        model.a[m] = libm::powf(10.0, amdb[m] / 20.0);
    }
}

fn determine_phase(model: &mut Model) {
    let mut rate_l_freqs = [0.0f32; MAX_AMP + 1];
    let mut amdb = [0.0f32; MAX_AMP + 1];
    let tval = model.wo * 4.0 / PI;
    for m in 1..=model.l {
        amdb[m] = 20.0 * libm::log10f(model.a[m] + 1e-16);
        rate_l_freqs[m] = m as f32 * tval;
    }

    let mut sample_freqs = [0.0f32; NS];
    for (i, f) in sample_freqs.iter_mut().enumerate() {
        *f = 8.0 * i as f32 / PHASE_FFT_SIZE as f32;
    }

    let mut gdbfk = [0.0f32; NS];
    interp_para(&mut gdbfk, &rate_l_freqs[1..=model.l], &amdb[1..=model.l], model.l, &sample_freqs);

    let phase = real_cepstrum_fold(&gdbfk);

    let tval = model.wo * PHASE_FFT_SIZE as f32 / TAU;
    for m in 1..=model.l {
        let b = libm::floorf(0.5 + m as f32 * tval) as usize;
        let b = b.min(NS - 1);
        model.h[m] = Complex32 {
            re: libm::cosf(phase[b]),
            im: libm::sinf(phase[b]),
        };
    }
}

/// Reconstructs the four 10 ms [`Model`]s of a 40 ms frame from the wire
/// index words, advancing `state` for the next call.
pub fn amp_index_to_models(indices: &[Index; 4], state: &mut AmpDecoderState) -> [Model; N_MODELS] {
    let n1 = indices[0].payload();
    let n2 = indices[1].payload();
    let energy = indices[2].payload();
    let pitch = indices[3].payload();

    let vec = amp_index_to_rate_k_vec(n1, n2, energy);

    let (wo_right, voicing_right) = if pitch == 0 {
        (TAU / 100.0, false)
    } else {
        (decode_pitch(pitch), true)
    };

    let mut interp_surface = [[0.0f32; AMP_K]; N_MODELS];
    let mut c = 1.0f32;
    for i in 0..N_MODELS {
        for k in 0..AMP_K {
            interp_surface[i][k] = state.prev_rate_k[k] * c + vec[k] * (1.0 - c);
        }
        c -= 1.0 / N_MODELS as f32;
    }

    let (wo, l, voicing) = interp_wo_v(state.wo_left, state.voicing_left, wo_right, voicing_right);

    let mut models: [Model; N_MODELS] = core::array::from_fn(|_| Model::new());
    for i in 0..N_MODELS {
        models[i].wo = wo[i];
        models[i].l = l[i];
        models[i].voiced = voicing[i];
        resample_rate_l(&mut models[i], &interp_surface[i]);
        determine_phase(&mut models[i]);
    }

    state.prev_rate_k = vec;
    state.wo_left = wo_right;
    state.voicing_left = voicing_right;

    models
}

/// Linear-energy estimate usable without a full decode, per the wire
/// format's `codec_get_energy` contract.
pub fn decode_frame_energy(indices: &[Index; 4]) -> f32 {
    let energy = indices[2].payload();
    let pitch = indices[3].payload();

    let mut mean = decode_energy(energy) - 10.0;
    if pitch == 0 {
        mean -= 10.0;
    }
    libm::powf(10.0, mean / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_filter_preserves_total_energy() {
        let mut vec = [5.0f32, -3.0, 2.0, 1.0, 0.0, -1.0, 4.0, 6.0, -2.0, 3.0, 1.0, 0.0, -4.0,
            2.0, 5.0, -1.0, 3.0, 0.0, 1.0, -2.0];
        let before: f32 = vec.iter().map(|&v| libm::powf(10.0, 2.0 * v / 20.0)).sum();
        post_filter_amp(&mut vec);
        let after: f32 = vec.iter().map(|&v| libm::powf(10.0, 2.0 * v / 20.0)).sum();
        assert!((before - after).abs() / before < 1e-4);
    }

    #[test]
    fn encode_then_decode_index_roundtrips_widths() {
        let mut model = Model::new();
        model.l = 40;
        model.wo = TAU / 80.0;
        model.voiced = true;
        for m in 1..=model.l {
            model.a[m] = 100.0;
        }
        let indices = amp_model_to_index(&model);
        assert_eq!(indices[0].width(), 9);
        assert_eq!(indices[1].width(), 9);
        assert_eq!(indices[2].width(), 4);
        assert_eq!(indices[3].width(), 6);
        assert!(indices[3].payload() >= 1);
    }

    #[test]
    fn unvoiced_model_produces_zero_pitch_payload() {
        let mut model = Model::new();
        model.l = 20;
        model.voiced = false;
        let indices = amp_model_to_index(&model);
        assert_eq!(indices[3].payload(), 0);
    }

    #[test]
    fn decode_models_updates_state() {
        let mut model = Model::new();
        model.l = 30;
        model.wo = TAU / 90.0;
        model.voiced = true;
        for m in 1..=model.l {
            model.a[m] = 50.0;
        }
        let indices = amp_model_to_index(&model);
        let mut state = AmpDecoderState::new();
        let models = amp_index_to_models(&indices, &mut state);
        assert_eq!(models.len(), N_MODELS);
        assert!(state.voicing_left);
    }
}
