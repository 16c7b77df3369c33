pub mod branch;
pub mod config;
pub mod content;
pub mod document;
pub mod flags;
pub mod graph;
pub mod localization;
pub mod runtime;
pub mod session;
pub mod simulation;
