//! Album sequencing: probe each track, feed the decodable ones through the
//! shared analysis pipeline one at a time, and collect their gain and peak.
//!
//! ```text
//! Idle -> ProbingTrack -> AnalyzingTrack -> ProbingTrack ... -> Finished
//!              |  ^
//!              +--+  (probe failed: skip, or probe passed: hold)
//! ```
//!
//! A decodable track is held back until the next decodable one is found (or
//! the queue runs out). The analysis stage posts album tags only at the
//! end-of-stream that brings its track count to zero, so the count must
//! already be exact when the last admitted track is started.
//!
//! All transitions happen in [`AlbumSequencer::dispatch`], driven by the
//! events the backend reports. The caller's thread blocks in
//! [`AlbumSequencer::run`] until the album is finished.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::mpsc::Sender;

use tracing::{debug, info, warn};

use crate::backend::{AnalysisBackend, GainTag, PipelineEvent};
use crate::collector::ResultCollector;
use crate::config::{AnalysisConfig, EmptyAlbumPolicy};
use crate::error::{Error, Result};
use crate::models::{AlbumAggregate, AlbumReport, AnalysisEvent, GainRecord};
use crate::pipeline::GstBackend;
use crate::track::{admit_paths, is_audio_file, round_gain, round_peak, TrackDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    ProbingTrack,
    AnalyzingTrack,
    Finished,
}

pub struct AlbumSequencer<B: AnalysisBackend> {
    backend: B,
    config: AnalysisConfig,
    state: State,
    queue: VecDeque<TrackDescriptor>,
    /// Track whose decodability probe is running
    probing: Option<TrackDescriptor>,
    /// Decodable track waiting for its turn
    ready: Option<TrackDescriptor>,
    /// Track attached to the shared pipeline
    current: Option<TrackDescriptor>,
    album: AlbumAggregate,
    collector: ResultCollector,
    events: Option<Sender<AnalysisEvent>>,
}

impl<B: AnalysisBackend> AlbumSequencer<B> {
    /// Queue every path with a recognized extension, in input order.
    pub fn new<P: AsRef<Path>>(backend: B, paths: &[P], config: AnalysisConfig) -> Self {
        Self {
            backend,
            config,
            state: State::Idle,
            queue: admit_paths(paths).into(),
            probing: None,
            ready: None,
            current: None,
            album: AlbumAggregate::default(),
            collector: ResultCollector::new(),
            events: None,
        }
    }

    /// Report progress through `sender` while running.
    pub fn with_events(mut self, sender: Sender<AnalysisEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Analyze the whole album and return its results.
    pub fn run(mut self) -> Result<AlbumReport> {
        self.start()?;

        while self.state != State::Finished {
            let timeout = match self.state {
                State::ProbingTrack => self.config.probe_timeout,
                State::AnalyzingTrack => self.config.track_timeout,
                State::Idle | State::Finished => None,
            };
            match self.backend.next_event(timeout) {
                Some(event) => self.dispatch(event)?,
                None if timeout.is_some() => self.on_timeout()?,
                None => return Err(Error::EventLoopClosed),
            }
        }

        let report = std::mem::take(&mut self.collector)
            .into_report()
            .ok_or(Error::EventLoopClosed)?;
        self.emit(AnalysisEvent::AlbumCompleted {
            report: report.clone(),
        });
        Ok(report)
    }

    fn start(&mut self) -> Result<()> {
        if self.queue.is_empty() && self.config.empty_album == EmptyAlbumPolicy::Reject {
            return Err(Error::EmptyAlbum);
        }
        info!("Analyzing album of {} track(s)", self.queue.len());
        self.backend.set_expected_tracks(self.queue.len())?;
        self.probe_next()
    }

    fn dispatch(&mut self, event: PipelineEvent) -> Result<()> {
        match (self.state, event) {
            (State::ProbingTrack, PipelineEvent::ProbeFinished { decodable: true }) => {
                self.hold_probed()
            }
            (State::ProbingTrack, PipelineEvent::ProbeFinished { decodable: false }) => {
                self.skip_probed()
            }
            (State::AnalyzingTrack, PipelineEvent::Tags(tags)) => {
                self.apply_tags(&tags);
                Ok(())
            }
            (State::AnalyzingTrack, PipelineEvent::EndOfStream) => self.end_current(None),
            (State::AnalyzingTrack, PipelineEvent::Error(message)) => {
                self.end_current(Some(message))
            }
            (state, event) => {
                debug!("Ignoring {:?} while {:?}", event, state);
                Ok(())
            }
        }
    }

    /// Tracks that may still be analyzed, not counting the attached one.
    fn remaining(&self) -> usize {
        usize::from(self.ready.is_some()) + self.queue.len()
    }

    /// Probe the next queued track. With nothing left to probe, the held
    /// track is the last one of the album.
    fn probe_next(&mut self) -> Result<()> {
        let Some(track) = self.queue.pop_front() else {
            return match self.ready.take() {
                Some(last) => self.admit(last),
                None => {
                    self.finish();
                    Ok(())
                }
            };
        };
        debug!("Probing {}", track.display_name());
        self.emit(AnalysisEvent::TrackProbing {
            index: track.position(),
        });
        self.backend.start_probe(&track)?;
        self.probing = Some(track);
        self.state = State::ProbingTrack;
        Ok(())
    }

    /// The probed track is decodable. A track held from earlier is now known
    /// not to be the last one, so it gets its turn.
    fn hold_probed(&mut self) -> Result<()> {
        let Some(track) = self.probing.take() else {
            return self.probe_next();
        };
        match self.ready.replace(track) {
            Some(earlier) => self.admit(earlier),
            None => self.probe_next(),
        }
    }

    fn admit(&mut self, track: TrackDescriptor) -> Result<()> {
        // The analysis stage skips the end-of-stream countdown for tracks
        // that end in an error, so the count is restated on every admission.
        self.backend.set_expected_tracks(1 + self.remaining())?;
        match self.backend.admit(&track) {
            Ok(()) => {
                info!("Analyzing {}", track.display_name());
                self.emit(AnalysisEvent::TrackAnalyzing {
                    index: track.position(),
                });
                self.current = Some(track);
                self.state = State::AnalyzingTrack;
                Ok(())
            }
            Err(e) => {
                warn!("Could not attach {}: {}", track.display_name(), e);
                if let Err(e) = self.backend.detach(&track) {
                    warn!("Could not detach {}: {}", track.display_name(), e);
                }
                self.emit(AnalysisEvent::TrackSkipped {
                    index: track.position(),
                });
                self.probe_next()
            }
        }
    }

    /// Drop the probed track without analyzing it.
    fn skip_probed(&mut self) -> Result<()> {
        if let Some(track) = self.probing.take() {
            warn!("Skipping {}: not decodable", track.display_name());
            self.emit(AnalysisEvent::TrackSkipped {
                index: track.position(),
            });
        }
        self.backend.set_expected_tracks(self.remaining())?;
        self.probe_next()
    }

    fn apply_tags(&mut self, tags: &[GainTag]) {
        for tag in tags {
            match *tag {
                GainTag::TrackGain(v) => {
                    if let Some(track) = self.current.as_mut() {
                        track.set_gain(v);
                    }
                }
                GainTag::TrackPeak(v) => {
                    if let Some(track) = self.current.as_mut() {
                        track.set_peak(v);
                    }
                }
                GainTag::AlbumGain(v) => self.album.gain = Some(round_gain(v)),
                GainTag::AlbumPeak(v) => self.album.peak = Some(round_peak(v)),
            }
        }
    }

    fn end_current(&mut self, error: Option<String>) -> Result<()> {
        self.backend.end_track()?;

        if let Some(track) = self.current.take() {
            let mut record = GainRecord::new(track.gain(), track.peak());
            match error {
                Some(message) => {
                    warn!("Analysis of {} ended with an error: {}", track.display_name(), message);
                    record.error = Some(message);
                }
                None => info!(
                    "{}: gain {:?} dB, peak {:?}",
                    track.display_name(),
                    record.gain,
                    record.peak
                ),
            }
            self.emit(AnalysisEvent::TrackCompleted {
                index: track.position(),
                result: record.clone(),
            });
            self.collector.push_track(track.display_name(), record);
            self.backend.detach(&track)?;
        }

        self.probe_next()
    }

    fn on_timeout(&mut self) -> Result<()> {
        match self.state {
            State::ProbingTrack => {
                warn!("Probe timed out");
                self.backend.cancel_probe();
                self.skip_probed()
            }
            State::AnalyzingTrack => self.end_current(Some("analysis timed out".to_string())),
            State::Idle | State::Finished => Ok(()),
        }
    }

    fn finish(&mut self) {
        let album = self.album.to_record();
        info!(
            "Album: gain {:?} dB, peak {:?} ({} track(s) analyzed)",
            album.gain,
            album.peak,
            self.collector.track_count()
        );
        self.collector.finish(album);
        self.state = State::Finished;
    }

    fn emit(&self, event: AnalysisEvent) {
        if let Some(sender) = &self.events {
            let _ = sender.send(event);
        }
    }
}

/// Analyze one album and return one record per analyzed track, in input
/// order, followed by the album record.
pub fn compute_album_gain<P: AsRef<Path>>(
    paths: &[P],
    config: &AnalysisConfig,
) -> Result<Vec<GainRecord>> {
    Ok(analyze_album(paths, config)?.records())
}

/// Analyze one album, keeping each record paired with its filename.
pub fn analyze_album<P: AsRef<Path>>(paths: &[P], config: &AnalysisConfig) -> Result<AlbumReport> {
    if !paths.iter().any(|p| is_audio_file(p.as_ref())) {
        return empty_album(config);
    }
    let backend = GstBackend::new(config)?;
    AlbumSequencer::new(backend, paths, config.clone()).run()
}

/// Same as [`analyze_album`], reporting progress through `sender`.
pub fn analyze_album_with_events<P: AsRef<Path>>(
    paths: &[P],
    config: &AnalysisConfig,
    sender: Sender<AnalysisEvent>,
) -> Result<AlbumReport> {
    if !paths.iter().any(|p| is_audio_file(p.as_ref())) {
        let report = empty_album(config)?;
        let _ = sender.send(AnalysisEvent::AlbumCompleted {
            report: report.clone(),
        });
        return Ok(report);
    }
    let backend = GstBackend::new(config)?;
    AlbumSequencer::new(backend, paths, config.clone())
        .with_events(sender)
        .run()
}

/// Result for an album with no recognized track. Nothing would reach the
/// pipeline, so it is never built.
fn empty_album(config: &AnalysisConfig) -> Result<AlbumReport> {
    match config.empty_album {
        EmptyAlbumPolicy::Reject => Err(Error::EmptyAlbum),
        EmptyAlbumPolicy::AggregateOnly => Ok(AlbumReport {
            tracks: Vec::new(),
            album: AlbumAggregate::default().to_record(),
        }),
    }
}
