//! Error types for the codec.

/// Errors surfaced at the wire-format boundary.
///
/// Encode and decode of well-formed [`crate::model::Model`] values never
/// fail; this enum only covers malformed index words handed to the
/// decoder from an untrusted wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// An index word's width nibble did not match the fixed per-slot
    /// width (9, 9, 4, or 6) expected at that position.
    InvalidIndexWidth { slot: usize, expected: u8, found: u8 },
}

impl core::fmt::Display for CodecError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CodecError::InvalidIndexWidth {
                slot,
                expected,
                found,
            } => write!(
                f,
                "index slot {slot}: expected width {expected}, found {found}"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CodecError {}
