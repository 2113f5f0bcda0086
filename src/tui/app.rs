use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::models::{AlbumReport, AnalysisEvent, GainRecord};

#[derive(Debug, Clone, PartialEq)]
pub enum TrackStatus {
    Pending,
    Probing,
    Analyzing,
    Complete(GainRecord),
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Main,
    About,
    Export,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportFormat {
    Text,
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

pub struct App {
    pub tracks: Vec<(String, TrackStatus)>,
    pub album_report: Option<AlbumReport>,
    pub view: View,
    pub selected: usize,
    pub scroll_offset: usize,
    pub should_quit: bool,
    pub path: PathBuf,
    pub export_format: ExportFormat,
    pub export_message: Option<String>,
    /// Visible height of the track table (updated each frame by the renderer)
    pub visible_rows: usize,
    pub loaded_from_cache: bool,
    pub analysis_error: Option<String>,
    pub analysis_start: Option<Instant>,
    pub elapsed: Option<Duration>,
}

impl App {
    pub fn new(filenames: Vec<String>, path: PathBuf) -> Self {
        Self {
            tracks: filenames
                .into_iter()
                .map(|name| (name, TrackStatus::Pending))
                .collect(),
            album_report: None,
            view: View::Main,
            selected: 0,
            scroll_offset: 0,
            should_quit: false,
            path,
            export_format: ExportFormat::Text,
            export_message: None,
            visible_rows: 20,
            loaded_from_cache: false,
            analysis_error: None,
            analysis_start: None,
            elapsed: None,
        }
    }

    /// Show a cached report. Tracks missing from it were skipped when it was made.
    pub fn load_from_cache(&mut self, report: AlbumReport) {
        for (name, status) in self.tracks.iter_mut() {
            *status = match report.tracks.iter().find(|t| t.filename == *name) {
                Some(track) => TrackStatus::Complete(track.result.clone()),
                None => TrackStatus::Skipped,
            };
        }
        self.album_report = Some(report);
        self.loaded_from_cache = true;
    }

    pub fn reset_for_regeneration(&mut self) {
        for (_, status) in self.tracks.iter_mut() {
            *status = TrackStatus::Pending;
        }
        self.album_report = None;
        self.loaded_from_cache = false;
        self.analysis_error = None;
        self.analysis_start = Some(Instant::now());
        self.elapsed = None;
        self.export_message = None;
        self.view = View::Main;
    }

    pub fn apply_event(&mut self, event: AnalysisEvent) {
        match event {
            AnalysisEvent::TrackProbing { index } => self.set_status(index, TrackStatus::Probing),
            AnalysisEvent::TrackAnalyzing { index } => {
                self.set_status(index, TrackStatus::Analyzing)
            }
            AnalysisEvent::TrackCompleted { index, result } => {
                self.set_status(index, TrackStatus::Complete(result))
            }
            AnalysisEvent::TrackSkipped { index } => self.set_status(index, TrackStatus::Skipped),
            AnalysisEvent::AlbumCompleted { report } => {
                self.elapsed = self.analysis_start.map(|start| start.elapsed());
                self.album_report = Some(report);
            }
        }
    }

    fn set_status(&mut self, index: usize, status: TrackStatus) {
        if let Some(track) = self.tracks.get_mut(index) {
            track.1 = status;
        }
    }

    pub fn is_running(&self) -> bool {
        self.album_report.is_none() && self.analysis_error.is_none()
    }

    pub fn completed_count(&self) -> usize {
        self.tracks
            .iter()
            .filter(|(_, s)| matches!(s, TrackStatus::Complete(_)))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.tracks
            .iter()
            .filter(|(_, s)| *s == TrackStatus::Skipped)
            .count()
    }

    pub fn select_next(&mut self) {
        if !self.tracks.is_empty() {
            self.selected = (self.selected + 1).min(self.tracks.len() - 1);
            self.ensure_visible();
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
        self.ensure_visible();
    }

    /// Adjust scroll_offset so that self.selected is within the visible window.
    fn ensure_visible(&mut self) {
        if self.visible_rows == 0 {
            return;
        }
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        } else if self.selected >= self.scroll_offset + self.visible_rows {
            self.scroll_offset = self.selected - self.visible_rows + 1;
        }
    }

    pub fn cycle_export_format(&mut self) {
        self.export_format = match self.export_format {
            ExportFormat::Text => ExportFormat::Json,
            ExportFormat::Json => ExportFormat::Csv,
            ExportFormat::Csv => ExportFormat::Text,
        };
    }
}
