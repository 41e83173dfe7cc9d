//! Scalar quantizers for mean frame energy and fundamental frequency.

use crate::consts::{ENERGY_M, WO_LEVELS};
use crate::tables::{ENERGY_TABLE, PITCH_TABLE};

/// Nearest-neighbor search over the 16-point energy grid.
pub fn encode_energy(energy: f32) -> u16 {
    let mut best_index = 0u16;
    let mut best_error = f32::MAX;
    for (i, &grid) in ENERGY_TABLE.iter().enumerate() {
        let diff = grid - energy;
        let error = diff * diff;
        if error < best_error {
            best_error = error;
            best_index = i as u16;
        }
    }
    best_index & 0x0F
}

pub fn decode_energy(index: u16) -> f32 {
    ENERGY_TABLE[(index as usize) & (ENERGY_M - 1)]
}

/// Log-spaced Wo quantizer, closed-form index (not a table search).
pub fn encode_pitch(wo: f32) -> u16 {
    let wo_min = crate::consts::TAU / crate::consts::P_MAX;
    let wo_max = crate::consts::TAU / crate::consts::P_MIN;
    let wo_diff = libm::log10f(wo_max) - libm::log10f(wo_min);

    let raw = WO_LEVELS as f32 * ((libm::log10f(wo) - libm::log10f(wo_min)) / wo_diff) + 0.5;
    let index = libm::floorf(raw) as i32;
    index.clamp(0, WO_LEVELS as i32 - 1) as u16 & 0x3F
}

pub fn decode_pitch(index: u16) -> f32 {
    PITCH_TABLE[(index as usize) & (WO_LEVELS - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energy_quantizer_is_idempotent_on_grid_points() {
        for (i, &grid) in ENERGY_TABLE.iter().enumerate() {
            assert_eq!(encode_energy(grid) as usize, i);
        }
    }

    #[test]
    fn pitch_quantizer_round_trips_to_nearest_grid_point() {
        for (i, &wo) in PITCH_TABLE.iter().enumerate() {
            let idx = encode_pitch(wo) as usize;
            // Adjacent-grid-point drift is acceptable; exact index should
            // still land within one step of the encoded table value.
            assert!((idx as isize - i as isize).abs() <= 1);
        }
    }

    #[test]
    fn pitch_encode_clamps_to_valid_range() {
        assert_eq!(encode_pitch(0.0001), 0);
        assert_eq!(encode_pitch(10.0), (WO_LEVELS - 1) as u16);
    }
}
