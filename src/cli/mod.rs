//! CLI argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::snapshot::ResourceType;

/// Glow - mirror a game's health and resource bars on a Razer Chroma keyboard.
///
/// Use --json for machine-parseable output.
#[derive(Parser, Debug)]
#[command(name = "glow", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// JSON output and JSON log lines, for scripts
    #[arg(long, global = true, env = "GLOW_JSON")]
    pub json: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Configuration directory [default: $GLOW_CONFIG_DIR or the platform config dir]
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // === Lighting ===
    /// Drive the keyboard from live readings
    Run(RunArgs),

    /// Print the frame a reading would produce, without touching the keyboard
    Preview(PreviewArgs),

    /// Turn all Chroma devices off
    Clear,

    // === Configuration ===
    /// Write default configuration files
    Init(InitArgs),

    /// Show current configuration
    Config(ConfigArgs),

    /// Set the screen area the recognizer reads
    SetArea(SetAreaArgs),

    // === Utilities ===
    /// Show version and build information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// === Argument Structs ===

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Use generated readings instead of a recognizer
    #[arg(long)]
    pub simulate: bool,

    /// File the recognizer keeps overwriting with the text it reads
    #[arg(
        long,
        value_name = "PATH",
        conflicts_with = "simulate",
        required_unless_present = "simulate"
    )]
    pub readout_file: Option<PathBuf>,

    /// Stop after this many seconds (default: run until Enter, Ctrl-C or SIGTERM)
    #[arg(long, value_name = "SECS")]
    pub duration: Option<u64>,

    /// Poll period in milliseconds (minimum 30)
    #[arg(long, value_name = "N")]
    pub period_ms: Option<u64>,
}

/// A `CURRENT/MAX` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub current: u32,
    pub max: u32,
}

fn parse_reading(s: &str) -> Result<Reading, String> {
    let (current, max) = s
        .split_once('/')
        .ok_or_else(|| format!("expected CURRENT/MAX, got '{s}'"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid number '{part}': {e}"))
    };
    Ok(Reading {
        current: parse(current)?,
        max: parse(max)?,
    })
}

#[derive(Parser, Debug)]
pub struct PreviewArgs {
    /// Primary bar reading
    #[arg(long, value_name = "CUR/MAX", default_value = "50/100", value_parser = parse_reading)]
    pub primary: Reading,

    /// Secondary bar reading
    #[arg(long, value_name = "CUR/MAX", default_value = "30/100", value_parser = parse_reading)]
    pub secondary: Reading,

    /// Secondary resource type (e.g. MANA, rage, runic-power)
    #[arg(long, value_name = "TYPE", default_value = "MANA")]
    pub resource: ResourceType,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Overwrite existing configuration
    #[arg(long, short = 'f')]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Only print the configuration directory
    #[arg(long)]
    pub path: bool,
}

#[derive(Parser, Debug)]
pub struct SetAreaArgs {
    /// Left edge in screen pixels
    #[arg(allow_negative_numbers = true)]
    pub x: i32,
    /// Top edge in screen pixels
    #[arg(allow_negative_numbers = true)]
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
