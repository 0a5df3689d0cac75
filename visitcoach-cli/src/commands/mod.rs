pub mod analyze;
pub mod config;
pub mod render;
pub mod replay;
