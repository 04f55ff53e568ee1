/// Validation failures of the codec layer.
///
/// Every variant is recoverable: the caller shows the message and keeps
/// its previous state. Nothing in the engine panics on bad user input.

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A legend line that is not `<binary-code>=<value>` (or `=<colour>`).
    #[error("Invalid legend line: \"{line}\". Use format like {example}.")]
    InvalidLine { line: String, example: &'static str },

    #[error("Legend codes must all be length 1 or 2.")]
    InconsistentWidth,

    #[error("Legend must include every binary code for the selected bit depth.")]
    IncompleteLegend,

    #[error("Legend values must be between 0 and {max}.")]
    ValueOutOfRange { max: u8 },

    #[error("Bitstream length {actual} does not match expected {expected}.")]
    LengthMismatch { actual: usize, expected: usize },

    #[error("Bit pattern {code} is not in the legend.")]
    UnknownCode { code: String },

    #[error("Share code is malformed: {reason}.")]
    MalformedShareCode { reason: String },

    #[error("Legend bit depth must be {expected}-bit for this grid.")]
    DepthMismatch { expected: u8, actual: u8 },

    /// Colour legend names a colour the active palette does not contain.
    #[error("Colour {colour} is not in the current palette.")]
    UnknownColour { colour: String },
}

impl CodecError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        CodecError::MalformedShareCode { reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
