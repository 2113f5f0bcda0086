use std::path::{Path, PathBuf};

const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "mp2", "mp4", "m4a", "ogg", "oga", "wma", "asf", "flac",
];

/// Check if a path has a recognized audio file extension.
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Scan a directory for audio files, sorted by filename.
pub fn scan_audio_files(path: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(path)
        .into_iter()
        .flatten()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_audio_file(p))
        .collect();
    files.sort();
    files
}

/// Round a gain in dB to 2 decimal places.
pub fn round_gain(value: f64) -> f64 {
    round_to(value, 2)
}

/// Round a linear peak to 6 decimal places.
pub fn round_peak(value: f64) -> f64 {
    round_to(value, 6)
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// One file queued for analysis.
///
/// Gain and peak are filled in while the track has its turn in the shared
/// pipeline; both stay `None` if the analysis stage never reports them.
#[derive(Debug, Clone)]
pub struct TrackDescriptor {
    position: usize,
    display_name: String,
    path: PathBuf,
    gain: Option<f64>,
    peak: Option<f64>,
}

impl TrackDescriptor {
    pub fn new(position: usize, path: &Path) -> Self {
        let display_name = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        Self {
            position,
            display_name,
            path,
            gain: None,
            peak: None,
        }
    }

    /// Position among the tracks of the album that have a recognized extension.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn gain(&self) -> Option<f64> {
        self.gain
    }

    pub fn peak(&self) -> Option<f64> {
        self.peak
    }

    pub fn set_gain(&mut self, gain: f64) {
        self.gain = Some(round_gain(gain));
    }

    pub fn set_peak(&mut self, peak: f64) {
        self.peak = Some(round_peak(peak));
    }
}

/// Build descriptors for the paths with a recognized extension, in input order.
pub fn admit_paths<P: AsRef<Path>>(paths: &[P]) -> Vec<TrackDescriptor> {
    paths
        .iter()
        .map(AsRef::as_ref)
        .filter(|p| is_audio_file(p))
        .enumerate()
        .map(|(position, p)| TrackDescriptor::new(position, p))
        .collect()
}
