//! pos-osk - headless on-screen keyboard session driver
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              Event Loop                  │
//! ├──────────────────────────────────────────┤
//! │  stdin commands  →  SessionController    │
//! │  config watcher  →  source snapshots     │
//! │  frame clock     →  animation ticks      │
//! │                          ↓               │
//! │              Commands (stdout)           │
//! └──────────────────────────────────────────┘
//! ```

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use pos_osk::config::{self, Config};
use pos_osk::constants::FRAME_INTERVAL_MS;
use pos_osk::{
    Command, JsonLayoutLoader, Layer, SessionController, SessionError, SessionEvent,
    SourceDescriptor,
};

/// Poll interval while no animation is running (config watcher)
const IDLE_POLL_MS: u64 = 250;

/// A parsed stdin line
#[derive(Debug, PartialEq)]
enum Input {
    Events(Vec<SessionEvent>),
    ListLayouts,
    Quit,
}

/// Print help message
fn print_help() {
    println!(
        r#"pos-osk {} - on-screen keyboard session driver

USAGE:
    pos-osk [OPTIONS]

OPTIONS:
    -h, --help              Print this help message
    -V, --version           Print version information
    --config PATH           Use config file at PATH
    --layouts DIR           Load layout resources from DIR
    --init-config           Generate default config file
    -f, --force             Overwrite config file without confirmation

COMMANDS (stdin, one per line):
    key SYMBOL              Press and activate a key (e.g. "key a", "key KEY_ENTER")
    copy | paste            Clipboard shortcuts
    im on|off               Text-input session state
    show | hide             Fold/unfold the keyboard
    select ID               Switch layout (e.g. "select de+neo", "select terminal")
    layer NAME              normal, caps, symbols, symbols2
    sources [TYPE:ID,...]   Push a source snapshot (e.g. "sources xkb:us,xkb:de+neo")
    layouts                 List layouts
    quit                    Exit

ENVIRONMENT:
    POS_OSK_CONFIG          Config file path
    POS_TEST_LAYOUT         Load only this layout, ignore source changes
    RUST_LOG                Log filter (default: warn)

CONFIG FILE:
    ~/.config/pos-osk/config.toml
"#,
        env!("CARGO_PKG_VERSION")
    );
}

/// Value following `flag` on the command line
fn arg_value(args: &[String], flag: &str) -> Result<Option<String>> {
    match args.iter().position(|a| a == flag) {
        Some(i) => args
            .get(i + 1)
            .cloned()
            .map(Some)
            .ok_or_else(|| anyhow!("{} requires a value", flag)),
        None => Ok(None),
    }
}

/// Parse "xkb:us,xkb:de+neo" into source descriptors
fn parse_sources(spec: &str) -> Result<Vec<SourceDescriptor>> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.split_once(':')
                .map(|(kind, id)| SourceDescriptor::new(kind, id))
                .ok_or_else(|| anyhow!("Invalid source '{}', expected TYPE:ID", s))
        })
        .collect()
}

/// Parse one stdin line
fn parse_input(line: &str) -> Result<Option<Input>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (cmd, arg) = match line.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (line, ""),
    };

    let events = match cmd {
        "key" if !arg.is_empty() => vec![
            SessionEvent::KeyPressed(arg.to_string()),
            SessionEvent::KeyActivated(arg.to_string()),
        ],
        "copy" => vec![SessionEvent::ClipboardCopy],
        "paste" => vec![SessionEvent::ClipboardPaste],
        "im" => match arg {
            "on" => vec![SessionEvent::TextInputActiveChanged(true)],
            "off" => vec![SessionEvent::TextInputActiveChanged(false)],
            _ => return Err(anyhow!("Usage: im on|off")),
        },
        "show" => vec![SessionEvent::SetVisible(true)],
        "hide" => vec![SessionEvent::SetVisible(false)],
        "select" if !arg.is_empty() => vec![SessionEvent::SelectLayout(arg.to_string())],
        "layer" => {
            let layer = Layer::parse(arg).ok_or_else(|| anyhow!("Unknown layer '{}'", arg))?;
            vec![SessionEvent::SetLayer(layer)]
        }
        "sources" => vec![SessionEvent::SourcesChanged(parse_sources(arg)?)],
        "layouts" => return Ok(Some(Input::ListLayouts)),
        "quit" | "exit" => return Ok(Some(Input::Quit)),
        _ => return Err(anyhow!("Unknown command '{}' (see --help)", line)),
    };
    Ok(Some(Input::Events(events)))
}

/// Execute commands (stdout stands in for the collaborators)
fn apply(commands: Vec<Command>) {
    for command in commands {
        match command {
            Command::EmitRawKey { symbol, down } => {
                println!("vk: {} {}", symbol, if down { "down" } else { "up" })
            }
            Command::SendText { text, commit } => println!("im: text {:?} commit={}", text, commit),
            Command::SetMargins {
                top,
                right,
                bottom,
                left,
            } => println!("surface: margins {} {} {} {}", top, right, bottom, left),
            Command::SetExclusiveZone(zone) => println!("surface: exclusive-zone {}", zone),
            Command::ShowSurface => println!("surface: show"),
            Command::HideSurface => println!("surface: hide"),
            Command::StartFrames => debug!("Frame clock started"),
            Command::StopFrames => debug!("Frame clock stopped"),
            Command::LayoutSelected(id) => println!("ui: layout {}", id),
            Command::LayerChanged { layout, layer } => {
                println!("ui: layout {} layer {:?}", layout, layer)
            }
            Command::Feedback(event) => println!("feedback: {}", event),
        }
    }
}

fn print_layouts(session: &SessionController<JsonLayoutLoader>) {
    for layout in session.layouts() {
        let marker = if layout.active { "*" } else { " " };
        println!("{} {:<12} {}", marker, layout.id, layout.display_name);
    }
}

/// Generate the default config file
fn init_config(args: &[String]) -> Result<()> {
    let path = match arg_value(args, "--config")? {
        Some(p) => PathBuf::from(p),
        None => config::default_config_path()
            .ok_or_else(|| anyhow!("Cannot determine config directory"))?,
    };
    let force = args.iter().any(|a| a == "--force" || a == "-f");

    if path.exists() && !force {
        println!("Config file already exists: {}", path.display());
        print!("Overwrite? [y/N]: ");
        std::io::Write::flush(&mut std::io::stdout())?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        let input = input.trim().to_lowercase();

        if input != "y" && input != "yes" {
            println!("Aborted.");
            return Ok(());
        }
    }

    Config::write_default_config(&path)?;
    println!("Config file generated: {}", path.display());
    Ok(())
}

/// Read stdin lines on a separate thread
fn spawn_stdin_reader() -> Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("pos-osk-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("stdin read error: {}", e);
                        break;
                    }
                }
            }
        })
        .context("Failed to start stdin thread")?;
    Ok(rx)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();

    // --help
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    // --version
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("pos-osk {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if args.iter().any(|a| a == "--init-config") {
        return init_config(&args);
    }

    info!("pos-osk starting...");

    // Load config file
    let config_path = match arg_value(&args, "--config")? {
        Some(p) => Some(PathBuf::from(p)),
        None => Config::config_path(),
    };
    let mut cfg = match &config_path {
        Some(path) => Config::load_from_file(path).unwrap_or_else(|e| {
            warn!("{:#}, using defaults", e);
            Config::default()
        }),
        None => Config::load(),
    };

    let layout_dir = match arg_value(&args, "--layouts")? {
        Some(dir) => PathBuf::from(dir),
        None => cfg.layout_dir(),
    };
    info!("Layout resources: {}", layout_dir.display());

    let loader = JsonLayoutLoader::new(layout_dir);
    let mut session = SessionController::new(loader, cfg.session_options())
        .context("Failed to start keyboard session")?;

    apply(session.start());
    apply(session.on_sources_changed(&cfg.source_descriptors())?);
    if cfg.surface.start_visible {
        apply(session.set_visible(true));
    }

    // Config file change watcher (Linux only)
    #[cfg(target_os = "linux")]
    let config_watcher = config_path
        .as_deref()
        .and_then(|path| config::ConfigWatcher::new(path).ok());
    #[cfg(target_os = "linux")]
    if config_watcher.is_some() {
        info!("Config hot-reload enabled");
    }

    let stdin = spawn_stdin_reader()?;
    let clock = Instant::now();

    loop {
        let timeout = if session.is_animating() {
            Duration::from_millis(FRAME_INTERVAL_MS)
        } else {
            Duration::from_millis(IDLE_POLL_MS)
        };

        match stdin.recv_timeout(timeout) {
            Ok(line) => match parse_input(&line) {
                Ok(Some(Input::Events(events))) => {
                    for event in events {
                        match session.handle(event) {
                            Ok(commands) => apply(commands),
                            Err(e @ SessionError::UnknownLayoutSelection(_)) => {
                                eprintln!("{}", e)
                            }
                            Err(e) => return Err(e.into()),
                        }
                    }
                }
                Ok(Some(Input::ListLayouts)) => print_layouts(&session),
                Ok(Some(Input::Quit)) => break,
                Ok(None) => {}
                Err(e) => eprintln!("{}", e),
            },
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                // stdin closed: finish a running animation, then exit
                while session.is_animating() {
                    std::thread::sleep(Duration::from_millis(FRAME_INTERVAL_MS));
                    apply(session.frame_tick(clock.elapsed()));
                }
                break;
            }
        }

        if session.is_animating() {
            apply(session.frame_tick(clock.elapsed()));
        }

        #[cfg(target_os = "linux")]
        if let (Some(watcher), Some(path)) = (&config_watcher, &config_path) {
            if watcher.check_reload() {
                match Config::load_from_file(path) {
                    Ok(new_cfg) => {
                        info!("Config reloaded: {}", path.display());
                        if new_cfg.surface.height != cfg.surface.height {
                            apply(session.set_surface_height(new_cfg.surface.height.max(0)));
                        }
                        cfg = new_cfg;
                        apply(session.on_sources_changed(&cfg.source_descriptors())?);
                    }
                    Err(e) => warn!("Config reload failed: {:#}", e),
                }
            }
        }
    }

    info!("pos-osk exiting");
    Ok(())
}
