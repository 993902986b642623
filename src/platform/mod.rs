// LogFold - platform/mod.rs
//
// Platform abstraction layer: directories, config file, file reading.
// Dependencies: standard library, directories, toml, core value types.
// Must NOT depend on: app.

pub mod config;
pub mod fs;
