/// External configuration loader.
///
/// Reads `config.toml` from an explicit path, or else from the first
/// candidate directory that has one (executable's directory, CWD, then
/// the shared data directories). Missing files and missing keys fall
/// back to defaults; a file that fails to parse is logged and ignored.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::grid::{BitDepth, GRID_SIZES};

const APP_DIR: &str = "binmosaic";

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct MosaicConfig {
    pub timing: TimingConfig,
    pub board: BoardConfig,
    pub gamepad: GamepadConfig,
    pub puzzles_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub tick_rate_ms: u64,
    pub timer_interval_ms: u64,
    pub advance_delay_ms: u64,
}

#[derive(Clone, Debug)]
pub struct BoardConfig {
    pub grid_size: usize,
    pub bit_depth: BitDepth,
    pub timer_enabled: bool,
    pub show_mistakes: bool,
    pub colour_blind: bool,
    pub high_contrast: bool,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub paint: Vec<String>,
    pub erase: Vec<String>,
    pub check: Vec<String>,
    pub next_value: Vec<String>,
    pub switch_tab: Vec<String>,
}

impl TimingConfig {
    pub fn tick_rate(&self) -> Duration { Duration::from_millis(self.tick_rate_ms) }
    pub fn timer_interval(&self) -> Duration { Duration::from_millis(self.timer_interval_ms) }
    pub fn advance_delay(&self) -> Duration { Duration::from_millis(self.advance_delay_ms) }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    board: TomlBoard,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_timer_interval")]
    timer_interval_ms: u64,
    #[serde(default = "default_advance_delay")]
    advance_delay_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlBoard {
    #[serde(default = "default_grid_size")]
    grid_size: usize,
    #[serde(default = "default_bit_depth")]
    bit_depth: u8,
    #[serde(default = "default_true")]
    timer_enabled: bool,
    #[serde(default = "default_true")]
    show_mistakes: bool,
    #[serde(default)]
    colour_blind: bool,
    #[serde(default)]
    high_contrast: bool,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_paint")]
    paint: Vec<String>,
    #[serde(default = "default_erase")]
    erase: Vec<String>,
    #[serde(default = "default_check")]
    check: Vec<String>,
    #[serde(default = "default_next_value")]
    next_value: Vec<String>,
    #[serde(default = "default_switch_tab")]
    switch_tab: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_puzzles_dir")]
    puzzles_dir: String,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 50 }
fn default_timer_interval() -> u64 { 500 }
fn default_advance_delay() -> u64 { 700 }
fn default_grid_size() -> usize { 16 }
fn default_bit_depth() -> u8 { 1 }
fn default_true() -> bool { true }

fn default_paint() -> Vec<String> { vec!["A".into()] }
fn default_erase() -> Vec<String> { vec!["B".into()] }
fn default_check() -> Vec<String> { vec!["Start".into()] }
fn default_next_value() -> Vec<String> { vec!["X".into(), "R1".into()] }
fn default_switch_tab() -> Vec<String> { vec!["Select".into(), "L1".into()] }
fn default_puzzles_dir() -> String { "puzzles".into() }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            tick_rate_ms: default_tick_rate(),
            timer_interval_ms: default_timer_interval(),
            advance_delay_ms: default_advance_delay(),
        }
    }
}

impl Default for TomlBoard {
    fn default() -> Self {
        TomlBoard {
            grid_size: default_grid_size(),
            bit_depth: default_bit_depth(),
            timer_enabled: true,
            show_mistakes: true,
            colour_blind: false,
            high_contrast: false,
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            paint: default_paint(),
            erase: default_erase(),
            check: default_check(),
            next_value: default_next_value(),
            switch_tab: default_switch_tab(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral { puzzles_dir: default_puzzles_dir() }
    }
}

// ── Loading ──

impl Default for MosaicConfig {
    fn default() -> Self {
        MosaicConfig::from_toml(TomlConfig::default(), &[])
    }
}

impl MosaicConfig {
    /// Load `config.toml`. An explicit path wins over the directory search.
    pub fn load(explicit: Option<&Path>) -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = match explicit {
            Some(path) => read_toml(path).unwrap_or_default(),
            None => search_dirs
                .iter()
                .map(|d| d.join("config.toml"))
                .find(|p| p.exists())
                .and_then(|p| read_toml(&p))
                .unwrap_or_default(),
        };
        MosaicConfig::from_toml(toml_cfg, &search_dirs)
    }

    /// Parse config text directly; unknown or bad values become defaults.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        let cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(MosaicConfig::from_toml(cfg, &[]))
    }

    fn from_toml(cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let grid_size = if GRID_SIZES.contains(&cfg.board.grid_size) {
            cfg.board.grid_size
        } else {
            tracing::warn!(size = cfg.board.grid_size, "unsupported grid_size, using default");
            default_grid_size()
        };
        let bit_depth = BitDepth::try_from(cfg.board.bit_depth).unwrap_or_else(|e| {
            tracing::warn!("{e}, using 1-bit");
            BitDepth::One
        });

        // Resolve the puzzles directory against the candidate dirs
        let puzzles_dir = PathBuf::from(&cfg.general.puzzles_dir);
        let puzzles_dir = if puzzles_dir.is_absolute() {
            puzzles_dir
        } else {
            search_dirs
                .iter()
                .map(|d| d.join(&puzzles_dir))
                .find(|p| p.is_dir())
                .unwrap_or(puzzles_dir)
        };

        MosaicConfig {
            timing: TimingConfig {
                tick_rate_ms: cfg.timing.tick_rate_ms.max(1),
                timer_interval_ms: cfg.timing.timer_interval_ms.max(1),
                advance_delay_ms: cfg.timing.advance_delay_ms,
            },
            board: BoardConfig {
                grid_size,
                bit_depth,
                timer_enabled: cfg.board.timer_enabled,
                show_mistakes: cfg.board.show_mistakes,
                colour_blind: cfg.board.colour_blind,
                high_contrast: cfg.board.high_contrast,
            },
            gamepad: GamepadConfig {
                paint: cfg.gamepad.paint,
                erase: cfg.gamepad.erase,
                check: cfg.gamepad.check,
                next_value: cfg.gamepad.next_value,
                switch_tab: cfg.gamepad.switch_tab,
            },
            puzzles_dir,
        }
    }
}

/// Candidate directories to search: exe dir + CWD + data paths (deduplicated).
pub fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/binmosaic)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share").join(APP_DIR);
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory (/usr/share/binmosaic)
    let sys = PathBuf::from("/usr/share").join(APP_DIR);
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

fn read_toml(path: &Path) -> Option<TomlConfig> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("could not read {}: {e}", path.display());
            return None;
        }
    };
    match toml::from_str::<TomlConfig>(&text) {
        Ok(cfg) => {
            tracing::info!("loaded {}", path.display());
            Some(cfg)
        }
        Err(e) => {
            tracing::warn!("{} parse error, using default settings: {e}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = MosaicConfig::parse("").unwrap();
        assert_eq!(cfg.timing.tick_rate_ms, 50);
        assert_eq!(cfg.timing.timer_interval(), Duration::from_millis(500));
        assert_eq!(cfg.timing.advance_delay(), Duration::from_millis(700));
        assert_eq!(cfg.board.grid_size, 16);
        assert_eq!(cfg.board.bit_depth, BitDepth::One);
        assert!(cfg.board.timer_enabled);
        assert!(cfg.board.show_mistakes);
        assert!(!cfg.board.colour_blind);
        assert_eq!(cfg.puzzles_dir, PathBuf::from("puzzles"));
        assert_eq!(cfg.gamepad.paint, vec!["A".to_string()]);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = MosaicConfig::parse("[board]\nbit_depth = 2\ncolour_blind = true\n").unwrap();
        assert_eq!(cfg.board.bit_depth, BitDepth::Two);
        assert!(cfg.board.colour_blind);
        assert_eq!(cfg.board.grid_size, 16);
        assert_eq!(cfg.timing.advance_delay_ms, 700);
    }

    #[test]
    fn out_of_range_board_values_fall_back() {
        let cfg = MosaicConfig::parse("[board]\ngrid_size = 10\nbit_depth = 3\n").unwrap();
        assert_eq!(cfg.board.grid_size, 16);
        assert_eq!(cfg.board.bit_depth, BitDepth::One);
    }

    #[test]
    fn zero_intervals_are_clamped() {
        let cfg = MosaicConfig::parse("[timing]\ntick_rate_ms = 0\ntimer_interval_ms = 0\n").unwrap();
        assert_eq!(cfg.timing.tick_rate_ms, 1);
        assert_eq!(cfg.timing.timer_interval_ms, 1);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(MosaicConfig::parse("[board\n").is_err());
    }

    #[test]
    fn shipped_sample_parses_to_defaults() {
        let cfg = MosaicConfig::parse(include_str!("../config.toml")).unwrap();
        assert_eq!(cfg.board.grid_size, 16);
        assert_eq!(cfg.timing.advance_delay_ms, 700);
        assert_eq!(cfg.gamepad.switch_tab, vec!["Select".to_string(), "L1".to_string()]);
    }

    #[test]
    fn missing_explicit_file_uses_defaults() {
        let cfg = MosaicConfig::load(Some(Path::new("/nonexistent/binmosaic.toml")));
        assert_eq!(cfg.board.grid_size, 16);
    }
}
