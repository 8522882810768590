//! Glow - game HUD readings to Razer Chroma keyboard lighting.
//!
//! This library exposes the core of the `glow` CLI for use in tests and
//! other front ends.
//!
//! # Modules
//!
//! - `sensing`: snapshot sources (recognizer output, simulation)
//! - `scheduler`: fixed-rate polling
//! - `mapping` / `matrix`: snapshot → 6x22 keyboard frame
//! - `chroma`: Chroma REST session client
//! - `runtime`: the pipeline tying them together
//! - `config`: overrides, settings and their storage
//! - `error`: error types with fix-it hints
#![forbid(unsafe_code)]

pub mod chroma;
pub mod cli;
pub mod color;
pub mod config;
pub mod error;
pub mod logging;
pub mod mapping;
pub mod matrix;
pub mod runtime;
pub mod scheduler;
pub mod sensing;
pub mod snapshot;
