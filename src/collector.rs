use crate::models::{AlbumReport, GainRecord, TrackReport};

/// Append-only, ordered store of per-track results and the final album record.
#[derive(Debug, Default)]
pub struct ResultCollector {
    tracks: Vec<TrackReport>,
    album: Option<GainRecord>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_track(&mut self, filename: &str, result: GainRecord) {
        self.tracks.push(TrackReport {
            filename: filename.to_string(),
            result,
        });
    }

    /// Record the album aggregate. Only the first call has any effect.
    pub fn finish(&mut self, album: GainRecord) {
        if self.album.is_none() {
            self.album = Some(album);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.album.is_some()
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Hand the results over. Returns `None` until `finish` was called.
    pub fn into_report(self) -> Option<AlbumReport> {
        let album = self.album?;
        Some(AlbumReport {
            tracks: self.tracks,
            album,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_unavailable_until_finished() {
        let mut collector = ResultCollector::new();
        collector.push_track("a.flac", GainRecord::new(Some(-1.0), Some(0.5)));
        assert!(!collector.is_finished());
        assert!(collector.into_report().is_none());
    }

    #[test]
    fn test_records_keep_insertion_order() {
        let mut collector = ResultCollector::new();
        collector.push_track("a.flac", GainRecord::new(Some(-1.0), Some(0.5)));
        collector.push_track("b.flac", GainRecord::new(Some(-2.0), Some(0.6)));
        collector.push_track("a.flac", GainRecord::new(Some(-1.0), Some(0.5)));
        collector.finish(GainRecord::new(Some(-1.5), Some(0.6)));
        collector.finish(GainRecord::new(None, None));
        assert_eq!(collector.track_count(), 3);

        let report = collector.into_report().unwrap();
        let names: Vec<&str> = report.tracks.iter().map(|t| t.filename.as_str()).collect();
        assert_eq!(names, vec!["a.flac", "b.flac", "a.flac"]);

        let records = report.records();
        assert_eq!(records.len(), 4);
        assert_eq!(records[3], GainRecord::new(Some(-1.5), Some(0.6)));
    }
}
