//! Subfill - Automated Subtitle Translation Driver for Bazarr
//!
//! Polls the Bazarr API for movies and episodes that are missing subtitles
//! in the preferred language, downloads English subtitles as a fallback
//! source, and asks Bazarr to machine-translate them.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod retry;
pub mod scheduler;
pub mod workflow;
