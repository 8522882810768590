//! Glow CLI - drive Razer Chroma keyboard lighting from a game HUD.
#![forbid(unsafe_code)]

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use console::style;
use serde::Serialize;

use glow::chroma::{HttpTransport, SessionConfig, SessionManager, SessionStatus};
use glow::cli::{
    Cli, Commands, CompletionsArgs, ConfigArgs, InitArgs, PreviewArgs, RunArgs, SetAreaArgs,
};
use glow::color::{Bgr, Rgb};
use glow::config::path::expand_home;
use glow::config::{
    AppConfig, CaptureArea, FileSettingsStore, LightingOverrides, SettingsStore,
    load_config_or_defaults, load_overrides_or_defaults, resolve_config_dir,
};
use glow::error::GlowError;
use glow::logging::init_logging;
use glow::mapping::snapshot_to_matrix;
use glow::matrix::ColorMatrix;
use glow::runtime::LightingRuntime;
use glow::sensing::{ReadoutFileFactory, SimulatedSourceFactory, SourceFactory};
use glow::snapshot::Snapshot;

/// Build information embedded at compile time.
mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn git_sha() -> &'static str {
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
    }

    pub fn git_dirty() -> bool {
        option_env!("VERGEN_GIT_DIRTY") == Some("true")
    }

    pub fn build_timestamp() -> &'static str {
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
    }

    pub fn rustc_semver() -> &'static str {
        option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown")
    }

    pub fn target() -> &'static str {
        option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown")
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.no_color || !io::stdout().is_terminal() {
        console::set_colors_enabled(false);
    }
    if cli.no_color {
        console::set_colors_enabled_stderr(false);
    }
    init_logging(cli.json, cli.verbose, cli.quiet);

    if let Err(e) = run(&cli) {
        output_error(&cli, &e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        None => print_quick_start(cli),
        Some(Commands::Run(args)) => cmd_run(cli, args),
        Some(Commands::Preview(args)) => cmd_preview(cli, args),
        Some(Commands::Clear) => cmd_clear(cli),
        Some(Commands::Init(args)) => cmd_init(cli, args),
        Some(Commands::Config(args)) => cmd_config(cli, args),
        Some(Commands::SetArea(args)) => cmd_set_area(cli, args),
        Some(Commands::Version) => cmd_version(cli),
        Some(Commands::Completions(args)) => cmd_completions(args),
    }
}

// === Quick Start ===

#[derive(Serialize)]
struct QuickStart {
    tool: &'static str,
    version: &'static str,
    description: &'static str,
    commands: QuickStartCommands,
    keyboard: &'static str,
}

#[derive(Serialize)]
struct QuickStartCommands {
    first_run: &'static str,
    simulate: &'static str,
    live: &'static str,
    preview: &'static str,
    capture_area: &'static str,
    lights_off: &'static str,
}

fn print_quick_start(cli: &Cli) -> Result<()> {
    if cli.json {
        return output_json(&QuickStart {
            tool: "glow",
            version: build_info::VERSION,
            description: "Mirror a game's health and resource bars on a Razer Chroma keyboard",
            commands: QuickStartCommands {
                first_run: "glow init",
                simulate: "glow run --simulate",
                live: "glow run --readout-file <PATH>",
                preview: "glow preview --primary 50/100 --secondary 30/100 --resource MANA",
                capture_area: "glow set-area <X> <Y> <W> <H>",
                lights_off: "glow clear",
            },
            keyboard: "6 rows x 22 columns; primary bar on row 0, secondary on row 1 by default",
        });
    }

    println!(
        "{} {} - HUD to Chroma keyboard lighting\n",
        style("glow").bold().cyan(),
        build_info::VERSION
    );
    println!("{}", style("QUICK START").bold().underlined());
    println!();
    println!("  {}  Write default configuration", style("glow init").green());
    println!("  {}  Try it with generated readings", style("glow run --simulate").green());
    println!(
        "  {}  Follow a recognizer's output",
        style("glow run --readout-file hud.txt").green()
    );
    println!("  {}  Show a frame without a keyboard", style("glow preview").green());
    println!("  {}  Turn the lights off", style("glow clear").green());
    println!();
    println!("Run {} for full help", style("glow --help").yellow());
    Ok(())
}

// === Lighting ===

fn open_store(cli: &Cli) -> Result<Arc<FileSettingsStore>> {
    let dir = resolve_config_dir(cli.config_dir.as_deref())?;
    Ok(Arc::new(FileSettingsStore::new(dir)))
}

fn connect(config: &AppConfig) -> Result<SessionManager> {
    let transport = HttpTransport::new(config.service.timeout())?;
    let session = SessionManager::new(
        Arc::new(transport),
        SessionConfig::from_settings(&config.service),
    )?;
    Ok(session)
}

#[derive(Serialize)]
struct RunSummary {
    session: &'static str,
    session_uri: Option<String>,
    last_snapshot: Option<Snapshot>,
    capture_area: CaptureArea,
}

fn cmd_run(cli: &Cli, args: &RunArgs) -> Result<()> {
    let store = open_store(cli)?;
    let config = load_config_or_defaults(&*store);
    let sources: Arc<dyn SourceFactory> = match &args.readout_file {
        Some(path) => Arc::new(ReadoutFileFactory::new(expand_home(path)?)),
        None => Arc::new(SimulatedSourceFactory),
    };
    let period = args
        .period_ms
        .map_or_else(|| config.poller.period(), Duration::from_millis);

    let session = connect(&config)?;
    if session.status() != SessionStatus::Registered && !cli.json {
        eprintln!(
            "{}: Chroma service not reachable yet at {}; will keep trying",
            style("Warning").yellow(),
            config.service.register_url
        );
    }

    let runtime = LightingRuntime::new(session, store, sources).with_poll_period(period);
    runtime.start()?;
    let stop = StopSignal::install()?;

    if !cli.json {
        let stop_hint = match args.duration {
            Some(secs) => format!("stopping in {secs}s or on Ctrl-C"),
            None if io::stdin().is_terminal() => "press Enter or Ctrl-C to stop".to_string(),
            None => "stop with Ctrl-C or SIGTERM".to_string(),
        };
        println!(
            "{} lighting ({})",
            style("Running").green().bold(),
            style(stop_hint).dim()
        );
        io::stdout().flush().ok();
    }

    let reason = stop.wait(args.duration.map(Duration::from_secs));
    tracing::info!(?reason, "Stopping lighting");

    let summary = RunSummary {
        session: runtime.session().status().as_str(),
        session_uri: runtime.session().session_uri(),
        last_snapshot: runtime.last_snapshot().map(|o| o.snapshot),
        capture_area: runtime.capture_area(),
    };
    runtime.shutdown();

    if cli.json {
        return output_json(&summary);
    }
    match summary.last_snapshot {
        Some(snapshot) => println!("Last reading: {snapshot}"),
        None => println!("No readings received"),
    }
    println!("{}", style("Stopped").bold());
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Elapsed,
    Enter,
    Signal,
}

/// Waits for the end of a `run`: the duration, Enter on a terminal, Ctrl-C
/// or SIGTERM.
///
/// Signal handlers are registered by [`StopSignal::install`], so a signal
/// that arrives before [`StopSignal::wait`] is not lost.
struct StopSignal {
    rt: tokio::runtime::Runtime,
    signals: Signals,
}

#[cfg(unix)]
struct Signals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn install() -> Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};
        Ok(Self {
            interrupt: signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?,
            terminate: signal(SignalKind::terminate())
                .context("Failed to install SIGTERM handler")?,
        })
    }

    async fn recv(&mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => {}
            _ = self.terminate.recv() => {}
        }
    }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    fn install() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl StopSignal {
    fn install() -> Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start signal runtime")?;
        let signals = {
            let _guard = rt.enter();
            Signals::install()?
        };
        Ok(Self { rt, signals })
    }

    fn wait(self, duration: Option<Duration>) -> StopReason {
        let enter = (duration.is_none() && io::stdin().is_terminal()).then(spawn_enter_reader);
        let Self { rt, mut signals } = self;

        rt.block_on(async move {
            let elapsed = async {
                match duration {
                    Some(d) => tokio::time::sleep(d).await,
                    None => std::future::pending::<()>().await,
                }
            };
            let entered = async {
                if let Some(rx) = enter {
                    if rx.await.is_ok() {
                        return;
                    }
                }
                std::future::pending::<()>().await;
            };

            tokio::select! {
                () = elapsed => StopReason::Elapsed,
                () = entered => StopReason::Enter,
                () = signals.recv() => StopReason::Signal,
            }
        })
    }
}

/// Read one line from stdin on a helper thread.
fn spawn_enter_reader() -> tokio::sync::oneshot::Receiver<()> {
    let (tx, rx) = tokio::sync::oneshot::channel();
    let spawned = thread::Builder::new()
        .name("glow-stdin".to_string())
        .spawn(move || {
            let mut line = String::new();
            if io::stdin().read_line(&mut line).is_ok() {
                let _ = tx.send(());
            }
        });
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "Cannot watch stdin; stop with Ctrl-C");
    }
    rx
}

#[derive(Serialize)]
struct PreviewOutput {
    snapshot: Snapshot,
    primary_pct: f64,
    secondary_pct: f64,
    matrix: ColorMatrix,
}

fn cmd_preview(cli: &Cli, args: &PreviewArgs) -> Result<()> {
    let store = open_store(cli)?;
    let overrides = load_overrides_or_defaults(&*store);
    let snapshot = Snapshot::new(
        args.primary.current,
        args.primary.max,
        args.secondary.current,
        args.secondary.max,
        args.resource,
    );
    let matrix = snapshot_to_matrix(&snapshot, &overrides);

    if cli.json {
        return output_json(&PreviewOutput {
            snapshot,
            primary_pct: snapshot.primary_pct(),
            secondary_pct: snapshot.secondary_pct(),
            matrix,
        });
    }

    println!(
        "{} {}  ({:.0}% / {:.0}%)\n",
        style("Preview").bold(),
        snapshot,
        snapshot.primary_pct() * 100.0,
        snapshot.secondary_pct() * 100.0
    );
    print_matrix(&matrix);
    Ok(())
}

/// Print the grid with one letter per distinct color, plus a legend.
fn print_matrix(matrix: &ColorMatrix) {
    let mut palette: Vec<Bgr> = Vec::new();
    for &cell in matrix.rows().flatten() {
        if !palette.contains(&cell) {
            palette.push(cell);
        }
    }
    let glyph = |color: Bgr| {
        let index = palette.iter().position(|&c| c == color).unwrap_or(0);
        char::from(b'A' + (index % 26) as u8)
    };

    for row in matrix.rows() {
        let line: String = row
            .iter()
            .map(|&cell| {
                style(format!("{} ", glyph(cell)))
                    .on_color256(ansi256(cell.to_rgb()))
                    .to_string()
            })
            .collect();
        println!("  {line}");
    }
    println!();
    for &color in &palette {
        println!("  {} {}", glyph(color), color.to_rgb());
    }
}

/// Nearest entry in the xterm 6x6x6 color cube.
fn ansi256(color: Rgb) -> u8 {
    let packed = color.packed();
    let level = |shift: u32| ((packed >> shift) & 0xFF) * 5 / 255;
    (16 + 36 * level(16) + 6 * level(8) + level(0)) as u8
}

fn cmd_clear(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    let config = load_config_or_defaults(&*store);
    let session = connect(&config)?;
    if session.status() != SessionStatus::Registered {
        return Err(GlowError::ServiceUnreachable {
            url: config.service.register_url,
        }
        .into());
    }
    session.clear_all();
    session.close();

    if cli.json {
        return output_json(&serde_json::json!({ "cleared": true }));
    }
    println!("{} all Chroma devices", style("Cleared").green());
    Ok(())
}

// === Configuration ===

fn cmd_init(cli: &Cli, args: &InitArgs) -> Result<()> {
    let dir = resolve_config_dir(cli.config_dir.as_deref())?;
    let store = FileSettingsStore::new(&dir);
    let files = [store.config_path(), store.overrides_path()];

    if !args.force && files.iter().any(|f| f.exists()) {
        bail!(
            "Configuration already exists in {} (use --force to overwrite)",
            dir.display()
        );
    }
    store.save_config(&AppConfig::default())?;
    store.save_overrides(&LightingOverrides::default())?;

    if cli.json {
        return output_json(&serde_json::json!({
            "config_dir": dir,
            "files": files,
        }));
    }
    for file in &files {
        println!("{} {}", style("Created").green(), file.display());
    }
    Ok(())
}

#[derive(Serialize)]
struct ConfigOutput {
    config_dir: PathBuf,
    config: AppConfig,
    overrides: LightingOverrides,
    overrides_saved: bool,
}

fn cmd_config(cli: &Cli, args: &ConfigArgs) -> Result<()> {
    let dir = resolve_config_dir(cli.config_dir.as_deref())?;
    if args.path {
        if cli.json {
            return output_json(&serde_json::json!({ "config_dir": dir }));
        }
        println!("{}", dir.display());
        return Ok(());
    }

    let store = FileSettingsStore::new(&dir);
    let config = store
        .load_config()
        .with_context(|| format!("Reading {}", store.config_path().display()))?;
    let saved = store
        .load_overrides()
        .with_context(|| format!("Reading {}", store.overrides_path().display()))?;
    let overrides_saved = saved.is_some();
    let overrides = saved.unwrap_or_default();

    if cli.json {
        return output_json(&ConfigOutput {
            config_dir: dir,
            config,
            overrides,
            overrides_saved,
        });
    }

    println!("{} {}", style("Config directory:").bold(), dir.display());
    println!();
    println!("{}", style("config.toml").bold().underlined());
    print!("{}", config.to_toml()?);
    println!();
    let label = if overrides_saved {
        "lighting_overrides.json"
    } else {
        "lighting overrides (defaults, not saved)"
    };
    println!("{}", style(label).bold().underlined());
    println!("{}", overrides.to_json_pretty()?);
    Ok(())
}

fn cmd_set_area(cli: &Cli, args: &SetAreaArgs) -> Result<()> {
    if args.width == 0 || args.height == 0 {
        bail!("Capture area must have a non-zero width and height");
    }
    let store = open_store(cli)?;
    let mut config = store.load_config()?;
    config.capture.area = CaptureArea {
        x: args.x,
        y: args.y,
        width: args.width,
        height: args.height,
    };
    store.save_config(&config)?;

    if cli.json {
        return output_json(&config.capture.area);
    }
    let area = config.capture.area;
    println!(
        "{} capture area {}x{} at ({}, {})",
        style("Saved").green(),
        area.width,
        area.height,
        area.x,
        area.y
    );
    Ok(())
}

// === Utilities ===

fn cmd_version(cli: &Cli) -> Result<()> {
    if cli.json {
        return output_json(&serde_json::json!({
            "version": build_info::VERSION,
            "git_sha": build_info::git_sha(),
            "git_dirty": build_info::git_dirty(),
            "build_timestamp": build_info::build_timestamp(),
            "rustc_version": build_info::rustc_semver(),
            "target": build_info::target(),
        }));
    }
    println!("glow {}", build_info::VERSION);
    println!(
        "git: {}{}",
        build_info::git_sha(),
        if build_info::git_dirty() { " (dirty)" } else { "" }
    );
    println!("built: {}", build_info::build_timestamp());
    println!("rustc: {}", build_info::rustc_semver());
    println!("target: {}", build_info::target());
    Ok(())
}

#[allow(clippy::unnecessary_wraps)]
fn cmd_completions(args: &CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    clap_complete::generate(args.shell, &mut Cli::command(), "glow", &mut io::stdout());
    Ok(())
}

fn output_json<T: Serialize>(data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("Failed to encode JSON output")?;
    println!("{json}");
    Ok(())
}

fn output_error(cli: &Cli, error: &anyhow::Error) {
    let suggestion = error
        .downcast_ref::<GlowError>()
        .and_then(GlowError::suggestion);
    if cli.json {
        let json = serde_json::json!({
            "error": true,
            "message": format!("{error:#}"),
            "suggestion": suggestion,
        });
        eprintln!("{json}");
    } else {
        eprintln!("{}: {error:#}", style("Error").red().bold());
        if let Some(suggestion) = suggestion {
            eprintln!("{}: {suggestion}", style("Hint").yellow());
        }
    }
}
