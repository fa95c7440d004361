//! Terminal front-end: configuration, logging, the dispatch loop and media players.

mod app;
mod config;
mod effects;
mod logging;
mod player;
mod render;

pub use app::run_app;
