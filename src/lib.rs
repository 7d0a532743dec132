pub mod app;
pub mod config;
pub mod filter;
pub mod flatten;
pub mod ingest;
pub mod input;
pub mod sync;
pub mod theme;
pub mod ui;
