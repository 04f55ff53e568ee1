/// Events emitted while applying a command or polling timers.
/// The presentation layer consumes these for sound and for refreshing
/// its text fields.

use crate::domain::board::BoardId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MosaicEvent {
    CellPainted { board: BoardId, index: usize, value: u8 },
    BoardFilled,
    /// A new challenge is on the decode board. `level` is `None` for a
    /// custom or shared puzzle.
    ChallengeStarted { level: Option<usize> },
    CheckPassed { score: u32 },
    CheckFailed { percentage: u32 },
    EncodeAnswerCorrect,
    ShareCodeExported,
    AllLevelsComplete,
    /// Input refused with a message (bad legend, wrong length, ...).
    InputRejected,
}
