//! Hydrangea engine: scene graph resolution and mood simulation for
//! branching interactive fiction.
//!
//! Content is a declarative scene graph (speaker/text nodes, player choices
//! and conditional auto-transitions) linked into a dense index arena at load
//! time. A single-threaded [`core::session::Session`] walks that graph while
//! three bounded mood statistics drift, damp and smooth over simulated time.
//! Rendering, audio and input live outside the crate and talk to the session
//! through commands, ticks and read accessors.

pub mod core;
pub mod schema;
