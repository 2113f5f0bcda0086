use serde::{Deserialize, Serialize};

/// Gain and peak for one track or for the whole album.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GainRecord {
    pub gain: Option<f64>,
    pub peak: Option<f64>,
    /// Set when the track's analysis ended on a pipeline error instead of end-of-stream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GainRecord {
    pub fn new(gain: Option<f64>, peak: Option<f64>) -> Self {
        Self {
            gain,
            peak,
            error: None,
        }
    }
}

/// Album-level gain and peak, filled in by late tag messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlbumAggregate {
    pub gain: Option<f64>,
    pub peak: Option<f64>,
}

impl AlbumAggregate {
    pub fn to_record(&self) -> GainRecord {
        GainRecord::new(self.gain, self.peak)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackReport {
    pub filename: String,
    #[serde(flatten)]
    pub result: GainRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumReport {
    pub tracks: Vec<TrackReport>,
    pub album: GainRecord,
}

impl AlbumReport {
    /// Flatten into the ordered record list: one per track, then the album.
    pub fn records(&self) -> Vec<GainRecord> {
        self.tracks
            .iter()
            .map(|t| t.result.clone())
            .chain(std::iter::once(self.album.clone()))
            .collect()
    }
}

/// Sent from the analysis thread to the TUI for live progress
#[derive(Debug, Clone)]
pub enum AnalysisEvent {
    TrackProbing { index: usize },
    TrackAnalyzing { index: usize },
    TrackCompleted { index: usize, result: GainRecord },
    TrackSkipped { index: usize },
    AlbumCompleted { report: AlbumReport },
}
