pub mod bitstream;
pub mod board;
pub mod error;
pub mod grid;
pub mod legend;
pub mod palette;
pub mod scoring;
pub mod share;
