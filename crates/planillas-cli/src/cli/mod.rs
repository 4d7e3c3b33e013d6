//! # CLI Layer
//!
//! The only place that knows about terminal I/O, exit codes and output
//! formatting. For the library architecture see the `planillas` crate docs.
//!
//! - [`setup`]: clap argument definitions
//! - [`commands`]: context setup and dispatch to the API facade
//! - [`render`]: coloured text and JSON output for `CmdResult`

pub mod commands;
pub mod render;
pub mod setup;

pub use commands::run;
