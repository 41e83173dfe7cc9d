//! Physical constants for the 700 bit/s harmonic codec.
//!
//! Centralizes the fixed operating point (8 kHz, 320-sample frames) the
//! way `fft_config.rs` pins FFT parameters in the embedded build.

pub const FS: f32 = 8000.0;
pub const TAU: f32 = core::f32::consts::TAU;
pub const PI: f32 = core::f32::consts::PI;

/// Samples per 10 ms sub-frame.
pub const N_SAMP: usize = 80;
/// Sub-frames per 40 ms codec frame.
pub const N_MODELS: usize = 4;
/// PCM samples per codec frame (40 ms).
pub const SAMPLES_PER_FRAME: usize = N_SAMP * N_MODELS;
/// Index words per codec frame.
pub const INDEXES_PER_FRAME: usize = 4;

/// Maximum harmonic count a [`crate::model::Model`] can hold.
pub const MAX_AMP: usize = 80;
/// Length of the NLP pitch-tracking history buffer.
pub const M_PITCH: usize = 320;

pub const P_MIN: f32 = 20.0;
pub const P_MAX: f32 = 160.0;

pub const FFT_SIZE: usize = 512;
pub const PHASE_FFT_SIZE: usize = 128;
/// `PHASE_FFT_SIZE / 2 + 1`, the number of phase samples produced by
/// [`crate::amp::mag_to_phase`].
pub const NS: usize = PHASE_FFT_SIZE / 2 + 1;

pub const V_THRESH: f32 = 6.0;

/// Rate-K envelope dimension (number of VQ'd log-magnitude samples).
pub const AMP_K: usize = 20;
/// Codebook entry count per VQ stage.
pub const AMP_M: usize = 512;
/// M-best survivors kept per VQ stage.
pub const MBEST_ENTRIES: usize = 5;
/// VQ stages chained in the index-prefix list (2 used, 4 allocated like the original).
pub const MBEST_STAGES: usize = 4;

pub const WO_LEVELS: usize = 64;
pub const ENERGY_M: usize = 16;

/// `0.9497 * PI`, the harmonic-count guard used after pitch refinement.
pub const FRACTPI: f32 = 0.9497 * PI;

/// Length of the analysis window applied before the forward FFT.
pub const NW: usize = 279;

/// Analysis window length for the trapezoidal overlap-add window.
pub const SYNTH_WINDOW: usize = N_SAMP * 2;

pub const CODEC2_RND_MAX: f32 = 32767.0;

pub const SIXTY: f32 = TAU * 60.0 / FS;
pub const BG_THRESH: f32 = 40.0;
pub const BG_BETA: f32 = 0.1;
pub const BG_MARGIN: f32 = 6.0;

/// `1.0 / (2*pi / FFT_SIZE)`, converts a Wo in rad/sample to an FFT bin spacing factor.
pub const ONE_ON_R: f32 = 1.0 / (TAU / FFT_SIZE as f32);

/// `20 / ln(10)`, converts natural-log cepstral phase to the reference's phase units.
pub const SCALE: f32 = 20.0 / core::f32::consts::LN_10;

/// DC-notch single-pole coefficient used by the NLP pitch estimator.
pub const NLP_COEFF: f32 = 0.95;
/// Sub-multiple acceptance threshold (fraction of the global peak).
pub const NLP_CNLP: f32 = 0.3;
/// Decimation factor applied before the NLP's 512-point FFT.
pub const NLP_DEC: usize = 5;
/// FIR lowpass tap count.
pub const NLP_NTAP: usize = 48;
/// Lowest allowed sub-multiple bin, `FFT_SIZE * DEC / P_MAX`.
pub const NLP_MIN_BIN: usize = FFT_SIZE * NLP_DEC / (P_MAX as usize);
