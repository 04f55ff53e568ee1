/// Entry point and frame loop.

mod ui;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use binmosaic::config::MosaicConfig;
use binmosaic::sim::event::MosaicEvent;
use binmosaic::sim::level::Catalog;
use binmosaic::sim::session::{Command, Session};
use ui::controls::UiState;
use ui::gamepad::GamepadState;
use ui::input::{InputEvent, InputState};
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

#[derive(Parser, Debug)]
#[command(author, version, about = "Binary Mosaic: paint pixel grids, encode them as bits, decode them back")]
struct Cli {
    /// Config file to use instead of searching for config.toml
    #[arg(long)]
    config: Option<PathBuf>,
    /// Share code to open on the decode board (bare code, #mosaic= fragment or URL)
    #[arg(long, value_name = "CODE|FRAGMENT|URL")]
    import: Option<String>,
    /// Log file (default: binmosaic.log in the temp dir)
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Start with the challenge timer off
    #[arg(long)]
    no_timer: bool,
    /// Start with the colour-blind palettes
    #[arg(long)]
    colour_blind: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = cli.log_file.clone().unwrap_or_else(|| std::env::temp_dir().join("binmosaic.log"));
    let log_file = File::create(&log_path).with_context(|| format!("create log file {}", log_path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    let mut config = MosaicConfig::load(cli.config.as_deref());
    if cli.no_timer {
        config.board.timer_enabled = false;
    }
    if cli.colour_blind {
        config.board.colour_blind = true;
    }

    let catalog = Catalog::load(&config.puzzles_dir);
    tracing::info!(levels = catalog.len(), titles = ?catalog.titles().collect::<Vec<_>>(), "catalog ready");

    let mut session = Session::new(&config, catalog);
    let mut ui = UiState::new();
    if let Some(code) = &cli.import {
        let out = session.apply(Command::ImportShareCode(code.clone()), Instant::now());
        ui.on_events(&out.events, &session);
    }

    let mut renderer = Renderer::new();
    renderer.init().context("terminal init failed")?;

    let sound = SoundEngine::new();

    let result = frame_loop(&mut session, &mut ui, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    result?;

    println!();
    println!("Thanks for playing Binary Mosaic!");
    if let Some(code) = &session.share_code {
        println!("Last share code: {code}");
    }
    Ok(())
}

fn frame_loop(
    session: &mut Session,
    ui: &mut UiState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &MosaicConfig,
) -> Result<()> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    tracing::info!(connected = gp.connected, "gamepad");
    let tick_rate = config.timing.tick_rate();
    let mut last_tick = Instant::now();
    let mut dirty = true;

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }

        let mut commands = vec![];
        for event in &kb.events {
            match event {
                InputEvent::Key(key) => commands.extend(ui.handle_key(*key, session)),
                InputEvent::Mouse { action, col, row } => {
                    commands.extend(ui.handle_pointer(*action, renderer.hit_test(*col, *row)))
                }
                InputEvent::Paste(text) => commands.extend(ui.handle_paste(text)),
                InputEvent::Resize => {}
            }
            // Keys that only move focus or edit text still need a redraw.
            dirty = true;
        }
        commands.extend(ui.handle_gamepad(&gp, session));
        if ui.quit {
            break;
        }

        if last_tick.elapsed() >= tick_rate {
            commands.push(Command::Tick);
            last_tick = Instant::now();
        }

        for cmd in commands {
            let out = session.apply(cmd, Instant::now());
            ui.on_events(&out.events, session);
            process_sound_events(sound, session, &out.events);
            dirty |= out.render;
        }

        if dirty {
            renderer.render(session, ui)?;
            dirty = false;
        }
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn process_sound_events(sound: Option<&SoundEngine>, session: &Session, events: &[MosaicEvent]) {
    let Some(sfx) = sound else { return };
    for event in events {
        match event {
            MosaicEvent::CellPainted { board, value, .. } => {
                sfx.play_paint(*value, session.board(*board).depth().levels())
            }
            MosaicEvent::CheckPassed { .. } | MosaicEvent::EncodeAnswerCorrect => sfx.play_correct(),
            MosaicEvent::CheckFailed { .. } => sfx.play_wrong(),
            MosaicEvent::AllLevelsComplete => sfx.play_complete(),
            MosaicEvent::InputRejected => sfx.play_reject(),
            MosaicEvent::ShareCodeExported => sfx.play_share(),
            MosaicEvent::BoardFilled | MosaicEvent::ChallengeStarted { .. } => {}
        }
    }
}
