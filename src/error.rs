//! Error types for album gain analysis.

use thiserror::Error;

/// Errors surfaced to callers of the analysis entry points.
///
/// Per-track problems (undecodable files, mid-track pipeline errors) are not
/// errors at this level; they show up as skipped tracks or as records with an
/// `error` note.
#[derive(Error, Debug)]
pub enum Error {
    /// GStreamer could not be initialized
    #[error("Failed to initialize GStreamer: {0}")]
    Init(String),

    /// Building or driving the shared pipeline failed
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// No track with a recognized extension was given and empty albums are rejected
    #[error("No audio tracks to analyze")]
    EmptyAlbum,

    /// The event source went away before the run finished
    #[error("Pipeline event loop closed before the album finished")]
    EventLoopClosed,
}

/// Convenience Result type using the crate error
pub type Result<T> = std::result::Result<T, Error>;

impl From<gstreamer::glib::BoolError> for Error {
    fn from(err: gstreamer::glib::BoolError) -> Self {
        Self::Pipeline(err.to_string())
    }
}

impl From<gstreamer::StateChangeError> for Error {
    fn from(err: gstreamer::StateChangeError) -> Self {
        Self::Pipeline(err.to_string())
    }
}
