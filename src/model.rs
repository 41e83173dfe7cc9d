//! The per-10ms speech parameter record.

use crate::consts::MAX_AMP;
use microfft::Complex32;

/// Harmonic sinusoidal model for one 10 ms sub-frame.
///
/// Slots `0` and `L+1..MAX_AMP` are zero-valued and never read
/// semantically; `L` is the only boundary that matters.
#[derive(Debug, Clone)]
pub struct Model {
    /// Fundamental angular frequency, rad/sample, in `[2*pi/160, 2*pi/20]`.
    pub wo: f32,
    /// Harmonic count, `floor(pi/Wo)` with the FRACTPI guard applied.
    pub l: usize,
    /// Harmonic magnitudes, linear, indexed `1..=l`.
    pub a: [f32; MAX_AMP + 1],
    /// Synthesized harmonic phases, radians, indexed `1..=l`.
    pub phi: [f32; MAX_AMP + 1],
    /// Minimum-phase unit phasors from phase reconstruction, indexed `1..=l`.
    pub h: [Complex32; MAX_AMP + 1],
    pub voiced: bool,
}

impl Model {
    pub const fn new() -> Self {
        Self {
            wo: core::f32::consts::TAU / 100.0,
            l: 0,
            a: [0.0; MAX_AMP + 1],
            phi: [0.0; MAX_AMP + 1],
            h: [Complex32 { re: 1.0, im: 0.0 }; MAX_AMP + 1],
            voiced: false,
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}
