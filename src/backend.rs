//! The seam between the album sequencer and the media framework.
//!
//! The sequencer never touches pipeline objects directly. It asks a backend
//! to start an asynchronous step and then waits for the backend to report
//! what happened through [`PipelineEvent`]s, one at a time, on the caller's
//! thread.

use std::time::Duration;

use crate::error::Result;
use crate::track::TrackDescriptor;

/// A loudness measurement reported by the analysis stage. Values are unrounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GainTag {
    TrackGain(f64),
    TrackPeak(f64),
    AlbumGain(f64),
    AlbumPeak(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// The probe for the current track finished and its pipeline is already torn down
    ProbeFinished { decodable: bool },
    /// Measurements posted by the analysis stage
    Tags(Vec<GainTag>),
    /// The shared pipeline drained the active track
    EndOfStream,
    /// The shared pipeline failed while analyzing the active track
    Error(String),
}

pub trait AnalysisBackend {
    /// Tell the analysis stage how many more tracks make up the album.
    fn set_expected_tracks(&mut self, count: usize) -> Result<()>;

    /// Start a disposable decode-only run for `track`. The verdict arrives as
    /// [`PipelineEvent::ProbeFinished`].
    fn start_probe(&mut self, track: &TrackDescriptor) -> Result<()>;

    /// Tear down the running probe without delivering a verdict.
    fn cancel_probe(&mut self);

    /// Attach `track`'s source to the shared pipeline and start it.
    fn admit(&mut self, track: &TrackDescriptor) -> Result<()>;

    /// Stop the shared pipeline after the active track ended, keeping album state.
    fn end_track(&mut self) -> Result<()>;

    /// Unlink and remove `track`'s source from the shared pipeline.
    fn detach(&mut self, track: &TrackDescriptor) -> Result<()>;

    /// Wait for the next event. `None` means the timeout elapsed or no more
    /// events can arrive.
    fn next_event(&mut self, timeout: Option<Duration>) -> Option<PipelineEvent>;
}
