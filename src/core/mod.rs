// LogFold - core/mod.rs
//
// Core engine layer: segmentation, extraction, visibility.
// Dependencies: regex, chrono, rayon, serde.
// Must NOT depend on: app, platform, or any file I/O.

pub mod document;
pub mod export;
pub mod extractor;
pub mod model;
pub mod profile;
pub mod segmenter;
pub mod selection;
pub mod visibility;
