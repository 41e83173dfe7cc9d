#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A 700 bit/s harmonic speech codec: NLP pitch estimation, sinusoidal
//! analysis, rate-K envelope resampling, two-stage vector quantization,
//! and minimum-phase overlap-add synthesis. No heap allocation; all
//! state lives in caller-owned `Encoder`/`Decoder` handles.

pub mod amp;
pub mod analysis;
pub mod codebook;
pub mod codec;
pub mod consts;
pub mod error;
pub mod fft;
pub mod index;
pub mod interp;
pub mod mbest;
pub mod model;
pub mod nlp;
pub mod quantize;
pub mod rng;
pub mod synth;
pub mod tables;

pub use codec::{decode_energy, Decoder, Encoder};
pub use consts::{INDEXES_PER_FRAME, SAMPLES_PER_FRAME};
pub use error::CodecError;
pub use index::Index;
pub use model::Model;
