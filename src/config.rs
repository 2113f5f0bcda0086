//! Run configuration for an album analysis.

use std::time::Duration;

/// What to do when none of the given paths has a recognized extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyAlbumPolicy {
    /// Return just the album record, with no gain or peak
    #[default]
    AggregateOnly,
    /// Fail with `Error::EmptyAlbum`
    Reject,
}

/// Decoder ordering applied when decodebin has several candidates for a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderPreference {
    /// Factory moved in front of the low-quality candidates when installed
    pub preferred: String,
    /// Factories that should not win by default
    pub low_quality: Vec<String>,
}

impl Default for DecoderPreference {
    fn default() -> Self {
        Self {
            preferred: "avdec_mp3float".to_string(),
            low_quality: vec!["mad".to_string(), "flump3dec".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisConfig {
    /// Give up on a decodability probe after this long. `None` waits forever.
    pub probe_timeout: Option<Duration>,
    /// End a track's analysis turn after this long. `None` waits forever.
    pub track_timeout: Option<Duration>,
    pub empty_album: EmptyAlbumPolicy,
    pub decoders: DecoderPreference,
}
