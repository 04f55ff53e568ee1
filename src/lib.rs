/// Binary Mosaic: encode pixel grids as bitstreams and decode them back.
///
/// `domain` holds the pure codecs and scoring, `sim` owns the session
/// state and its scheduled tasks, `config` loads `config.toml`.

pub mod config;
pub mod domain;
pub mod sim;
