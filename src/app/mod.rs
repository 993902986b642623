// LogFold - app/mod.rs
//
// Application layer: per-document sessions, background visibility runs,
// profile loading.
// Dependencies: core layer.
// Must NOT depend on: platform specifics.

pub mod fold;
pub mod profile_mgr;
pub mod session;
