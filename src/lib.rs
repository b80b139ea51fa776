#![doc = include_str!("../README.md")]

/// Stylesheet tree, parser and printer
pub mod syntax;
/// The per-module transformation stages, and the plugin interface
pub mod passes;
/// Scoped name generation
pub mod scoped_name;
/// Module references, import resolution, the module cache and linking
pub mod import_export;
/// Processes a single module: read, parse, transform, link, print
pub mod compile;
/// The build driver: walks the input root and writes every output
pub mod compiler;
/// Build options and the optional config file
pub mod config;
/// Utilities which could go in any crate
pub mod misc;

pub use compiler::{BuildError, BuildOutput, Compiler};
pub use config::{Encoding, Options};
