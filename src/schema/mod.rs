pub mod bounded;
pub mod condition;
pub mod scene;
pub mod stats;
