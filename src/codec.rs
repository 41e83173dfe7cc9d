//! Top-level encode/decode entry points.

use crate::amp::{amp_index_to_models, amp_model_to_index, decode_frame_energy, AmpDecoderState};
use crate::analysis::Analyzer;
use crate::consts::{INDEXES_PER_FRAME, N_MODELS, N_SAMP, SAMPLES_PER_FRAME};
use crate::error::CodecError;
use crate::index::Index;
use crate::synth::FrameSynthesizer;

/// Encodes 40 ms (`SAMPLES_PER_FRAME`) of PCM at a time into four wire
/// index words. All state lives in this handle; independent streams use
/// independent `Encoder`s.
pub struct Encoder {
    analyzer: Analyzer,
}

impl Encoder {
    pub const fn new() -> Self {
        Self {
            analyzer: Analyzer::new(),
        }
    }

    /// Analyzes all four 10 ms sub-frames but quantizes only the last
    /// one's model, matching the reference's per-frame data flow.
    pub fn encode(&mut self, pcm: &[i16; SAMPLES_PER_FRAME]) -> [Index; INDEXES_PER_FRAME] {
        let mut model = None;
        for i in 0..N_MODELS {
            let mut block = [0i16; N_SAMP];
            block.copy_from_slice(&pcm[i * N_SAMP..(i + 1) * N_SAMP]);
            model = Some(self.analyzer.analyze_one_frame(&block));
        }
        amp_model_to_index(&model.expect("N_MODELS > 0"))
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes four wire index words into 40 ms of PCM.
pub struct Decoder {
    amp_state: AmpDecoderState,
    synth: FrameSynthesizer,
}

impl Decoder {
    pub const fn new() -> Self {
        Self {
            amp_state: AmpDecoderState::new(),
            synth: FrameSynthesizer::new(),
        }
    }

    /// Validates each index word's width against the fixed per-slot
    /// widths before decoding, so a corrupt or foreign wire word is
    /// rejected instead of silently misinterpreted.
    pub fn decode(
        &mut self,
        indices: &[Index; INDEXES_PER_FRAME],
    ) -> Result<[i16; SAMPLES_PER_FRAME], CodecError> {
        let mut checked = [Index::new(0, 0); INDEXES_PER_FRAME];
        for (slot, &idx) in indices.iter().enumerate() {
            checked[slot] = idx.checked(slot)?;
        }

        let mut models = amp_index_to_models(&checked, &mut self.amp_state);

        let mut pcm = [0i16; SAMPLES_PER_FRAME];
        for i in 0..N_MODELS {
            let mut block = [0i16; N_SAMP];
            self.synth.synthesize_one_frame(&mut models[i], &mut block);
            pcm[i * N_SAMP..(i + 1) * N_SAMP].copy_from_slice(&block);
        }
        Ok(pcm)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Linear-energy estimate derivable from the wire words alone, without
/// running a full decode.
pub fn decode_energy(indices: &[Index; INDEXES_PER_FRAME]) -> f32 {
    decode_frame_energy(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_and_index_constants() {
        assert_eq!(INDEXES_PER_FRAME, 4);
        assert_eq!(SAMPLES_PER_FRAME, 320);
    }

    #[test]
    fn silence_round_trips_to_near_silence() {
        let mut encoder = Encoder::new();
        let mut decoder = Decoder::new();
        let pcm = [0i16; SAMPLES_PER_FRAME];

        let mut last = [0i16; SAMPLES_PER_FRAME];
        for _ in 0..4 {
            let indices = encoder.encode(&pcm);
            last = decoder.decode(&indices).expect("well-formed indices");
        }
        let max_abs = last.iter().map(|&s| s.unsigned_abs()).max().unwrap();
        assert!(max_abs < 5000, "unexpectedly loud output for silence: {max_abs}");
    }

    #[test]
    fn decode_rejects_malformed_index_width() {
        let mut decoder = Decoder::new();
        let mut indices = [
            Index::new(9, 0),
            Index::new(9, 0),
            Index::new(4, 0),
            Index::new(6, 0),
        ];
        indices[2] = Index::new(8, 0);
        let err = decoder.decode(&indices).unwrap_err();
        assert_eq!(
            err,
            CodecError::InvalidIndexWidth {
                slot: 2,
                expected: 4,
                found: 8,
            }
        );
    }

    #[test]
    fn index_widths_are_fixed_every_frame() {
        let mut encoder = Encoder::new();
        let mut pcm = [0i16; SAMPLES_PER_FRAME];
        for (i, s) in pcm.iter_mut().enumerate() {
            *s = (1000.0 * libm::sinf(i as f32 * 0.05)) as i16;
        }
        for _ in 0..3 {
            let indices = encoder.encode(&pcm);
            assert_eq!(indices[0].width(), 9);
            assert_eq!(indices[1].width(), 9);
            assert_eq!(indices[2].width(), 4);
            assert_eq!(indices[3].width(), 6);
        }
    }

    #[test]
    fn two_independent_encoders_are_deterministic() {
        let mut a = Encoder::new();
        let mut b = Encoder::new();
        let mut pcm = [0i16; SAMPLES_PER_FRAME];
        for (i, s) in pcm.iter_mut().enumerate() {
            *s = (2000.0 * libm::sinf(i as f32 * 0.1)) as i16;
        }
        for _ in 0..4 {
            let ia = a.encode(&pcm);
            let ib = b.encode(&pcm);
            for k in 0..4 {
                assert_eq!(ia[k].raw(), ib[k].raw());
            }
        }
    }
}
