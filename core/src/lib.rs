pub mod api;
pub mod config;
pub mod editor;
pub mod errors;
pub mod fileio;
pub mod highlight;
pub mod runner;
