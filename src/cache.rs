use std::io;
use std::path::Path;

use crate::models::AlbumReport;

const CACHE_FILENAME: &str = "rgain_report.json";

/// Load a cached album report from `rgain_report.json` in the given directory.
/// Returns `None` if the file is missing or cannot be parsed.
pub fn load_cached_report(dir: &Path) -> Option<AlbumReport> {
    let path = dir.join(CACHE_FILENAME);
    let data = std::fs::read_to_string(&path).ok()?;
    serde_json::from_str(&data).ok()
}

/// Save an album report as pretty-printed JSON to `rgain_report.json` in the given directory.
pub fn save_report(dir: &Path, report: &AlbumReport) -> io::Result<()> {
    let path = dir.join(CACHE_FILENAME);
    let json = serde_json::to_string_pretty(report).map_err(io::Error::other)?;
    std::fs::write(&path, json)
}

const TEXT_REPORT_FILENAME: &str = "rgain_report.txt";

/// Check if all requested report files already exist in the given directory.
pub fn reports_exist(dir: &Path, json: bool, txt: bool) -> bool {
    if json && !dir.join(CACHE_FILENAME).exists() {
        return false;
    }
    if txt && !dir.join(TEXT_REPORT_FILENAME).exists() {
        return false;
    }
    true
}

/// Save a text report to `rgain_report.txt` in the given directory.
pub fn save_text_report(dir: &Path, content: &str) -> io::Result<()> {
    let path = dir.join(TEXT_REPORT_FILENAME);
    std::fs::write(&path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GainRecord, TrackReport};

    #[test]
    fn test_report_roundtrip_through_cache() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_cached_report(dir.path()).is_none());

        let report = AlbumReport {
            tracks: vec![TrackReport {
                filename: "a.flac".to_string(),
                result: GainRecord::new(Some(-3.5), Some(0.7)),
            }],
            album: GainRecord::new(Some(-3.5), Some(0.7)),
        };
        save_report(dir.path(), &report).unwrap();
        assert_eq!(load_cached_report(dir.path()), Some(report));
    }

    #[test]
    fn test_unparseable_cache_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CACHE_FILENAME), "not json").unwrap();
        assert!(load_cached_report(dir.path()).is_none());
    }
}
