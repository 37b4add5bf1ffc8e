//! Quality lookup and downloading on top of `yt-dlp` and `ffmpeg`.

// Settings file handling
pub mod config;
// yt-dlp / ffmpeg availability checks
pub mod deps;
// External downloader spawning logic (yt-dlp)
pub mod downloader;
pub mod error;
// Format list to quality menu
pub mod formats;
// Data models for metadata, selections and download events
pub mod model;
// Progress parsing utilities
pub mod progress;
// Thumbnail fetching module
pub mod thumbnail;

pub use error::AppError;
