// LogFold - lib.rs
//
// Library entry point. The `logfold` binary in `main.rs` is a thin host over
// these modules; editors and other hosts can embed them directly.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;
