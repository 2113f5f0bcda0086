pub mod backend;
pub mod cache;
pub mod collector;
pub mod config;
pub mod error;
pub mod format;
pub mod models;
pub mod pipeline;
pub mod sequencer;
pub mod track;
pub mod tui;

pub use config::{AnalysisConfig, EmptyAlbumPolicy};
pub use error::{Error, Result};
pub use models::{AlbumReport, GainRecord};
pub use sequencer::{analyze_album, analyze_album_with_events, compute_album_gain};
