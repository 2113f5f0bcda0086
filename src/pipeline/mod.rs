//! GStreamer implementation of [`AnalysisBackend`].
//!
//! One long-lived pipeline is reused for every admitted track:
//!
//! ```text
//! filesrc (per track) ! decodebin ! audioconvert ! audioresample ! rganalysis ! fakesink
//! ```
//!
//! Each track's `filesrc` is added in front of the shared decodebin for its
//! turn and removed afterwards. `rganalysis` is locked in its state between
//! tracks so it keeps the album accumulators across the NULL resets.
//!
//! Bus messages from the shared pipeline and from the per-track probe
//! pipelines are forwarded by sync handlers into a single channel. The thread
//! running the album pops them in [`GstBackend::next_event`], which is the
//! only place messages are turned into [`PipelineEvent`]s.

pub mod decoders;
mod probe;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use gstreamer as gst;
use gstreamer::prelude::*;
use tracing::{debug, warn};

use crate::backend::{AnalysisBackend, GainTag, PipelineEvent};
use crate::config::{AnalysisConfig, DecoderPreference};
use crate::error::{Error, Result};
use crate::track::TrackDescriptor;

use probe::ProbePipeline;

/// Where a forwarded bus message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    Probe(u64),
    Shared(u64),
}

pub(crate) type Envelope = (Origin, gst::Message);

static GST_INIT: OnceLock<std::result::Result<(), String>> = OnceLock::new();

/// Initialize GStreamer once per process. Safe to call repeatedly.
pub fn init() -> Result<()> {
    GST_INIT
        .get_or_init(|| gst::init().map_err(|e| e.to_string()))
        .clone()
        .map_err(Error::Init)
}

pub(crate) fn make_element(factory: &str, name: &str) -> Result<gst::Element> {
    gst::ElementFactory::make(factory)
        .name(name)
        .build()
        .map_err(|_| Error::Pipeline(format!("Missing GStreamer element '{}'", factory)))
}

pub(crate) fn location(track: &TrackDescriptor) -> Result<&str> {
    track
        .path()
        .to_str()
        .ok_or_else(|| Error::Pipeline(format!("Invalid path: {}", track.path().display())))
}

/// Link each decoded stream to `conv`. Streams that cannot be linked (the
/// converter is taken, or the stream is not audio) are left dangling.
pub(crate) fn link_decoded_pads(decodebin: &gst::Element, conv: &gst::Element) {
    let conv_weak = conv.downgrade();
    decodebin.connect_pad_added(move |_, pad| {
        let Some(sink) = conv_weak.upgrade().and_then(|c| c.static_pad("sink")) else {
            return;
        };
        match pad.link(&sink) {
            Ok(_) => debug!("Linked decoded stream {}", pad.name()),
            Err(e) => warn!("Ignoring decoded stream {}: {:?}", pad.name(), e),
        }
    });
    decodebin.connect_pad_removed(|_, pad| {
        if let Some(peer) = pad.peer() {
            let _ = pad.unlink(&peer);
        }
    });
}

/// Forward every message posted on `pipeline`'s bus into `sender`, tagged with
/// the origin current at posting time. Messages posted while `origin` returns
/// `None` are dropped.
pub(crate) fn forward_bus(
    pipeline: &gst::Pipeline,
    sender: Sender<Envelope>,
    origin: impl Fn() -> Option<Origin> + Send + Sync + 'static,
) -> Result<()> {
    let bus = pipeline
        .bus()
        .ok_or_else(|| Error::Pipeline(format!("{} has no bus", pipeline.name())))?;
    bus.set_sync_handler(move |_, msg| {
        if let Some(origin) = origin() {
            let _ = sender.send((origin, msg.clone()));
        }
        gst::BusSyncReply::Drop
    });
    Ok(())
}

/// Extract the ReplayGain measurements from a tag list.
pub(crate) fn gain_tags(tags: &gst::TagListRef) -> Vec<GainTag> {
    let mut found = Vec::new();
    if let Some(v) = tags.get::<gst::tags::TrackGain>() {
        found.push(GainTag::TrackGain(v.get()));
    }
    if let Some(v) = tags.get::<gst::tags::TrackPeak>() {
        found.push(GainTag::TrackPeak(v.get()));
    }
    if let Some(v) = tags.get::<gst::tags::AlbumGain>() {
        found.push(GainTag::AlbumGain(v.get()));
    }
    if let Some(v) = tags.get::<gst::tags::AlbumPeak>() {
        found.push(GainTag::AlbumPeak(v.get()));
    }
    found
}

pub struct GstBackend {
    pipeline: gst::Pipeline,
    decodebin: gst::Element,
    rganalysis: gst::Element,
    sink: gst::Element,
    decoders: DecoderPreference,
    sender: Sender<Envelope>,
    receiver: Receiver<Envelope>,
    /// Run id the shared bus handler tags messages with; 0 while stopped
    live_run: Arc<AtomicU64>,
    runs_started: u64,
    current_run: u64,
    probe: Option<ProbePipeline>,
    next_probe: u64,
    source: Option<gst::Element>,
    pending: VecDeque<PipelineEvent>,
}

impl GstBackend {
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        init()?;

        let pipeline = gst::Pipeline::with_name("rgain");
        let decodebin = make_element("decodebin", "decbin")?;
        let conv = make_element("audioconvert", "conv")?;
        let resample = make_element("audioresample", "resample")?;
        let rganalysis = make_element("rganalysis", "rg")?;
        let sink = make_element("fakesink", "rg-sink")?;

        pipeline.add_many([&decodebin, &conv, &resample, &rganalysis, &sink])?;
        gst::Element::link_many([&conv, &resample, &rganalysis, &sink])?;

        decoders::connect_autoplug_sort(&decodebin, config.decoders.clone());
        link_decoded_pads(&decodebin, &conv);

        let (sender, receiver) = mpsc::channel();
        let live_run = Arc::new(AtomicU64::new(0));
        let bus_run = Arc::clone(&live_run);
        forward_bus(&pipeline, sender.clone(), move || {
            match bus_run.load(Ordering::SeqCst) {
                0 => None,
                run => Some(Origin::Shared(run)),
            }
        })?;

        Ok(Self {
            pipeline,
            decodebin,
            rganalysis,
            sink,
            decoders: config.decoders.clone(),
            sender,
            receiver,
            live_run,
            runs_started: 0,
            current_run: 0,
            probe: None,
            next_probe: 0,
            source: None,
            pending: VecDeque::new(),
        })
    }

    fn stop_shared(&mut self) -> Result<()> {
        self.live_run.store(0, Ordering::SeqCst);
        self.current_run = 0;
        self.rganalysis.set_locked_state(true);
        self.pipeline.set_state(gst::State::Null)?;
        Ok(())
    }

    /// Whether a tag message was posted by the analysis stage or by the sink
    /// right after it, which is where rganalysis' tag events end up.
    fn from_analysis_stage(&self, msg: &gst::Message) -> bool {
        match msg.src() {
            Some(src) => {
                src == self.rganalysis.upcast_ref::<gst::Object>()
                    || src == self.sink.upcast_ref::<gst::Object>()
            }
            None => false,
        }
    }

    /// Turn a forwarded bus message into a sequencer event, or drop it.
    fn adapt(&mut self, origin: Origin, msg: &gst::Message) -> Option<PipelineEvent> {
        match origin {
            Origin::Probe(id) => {
                let decodable = match &self.probe {
                    Some(probe) if probe.id() == id => probe.verdict(msg)?,
                    _ => return None,
                };
                if let Some(probe) = self.probe.take() {
                    probe.teardown();
                }
                Some(PipelineEvent::ProbeFinished { decodable })
            }
            Origin::Shared(run) if run == self.current_run => match msg.view() {
                gst::MessageView::Tag(tag) => {
                    if !self.from_analysis_stage(msg) {
                        return None;
                    }
                    let tags = gain_tags(&tag.tags());
                    (!tags.is_empty()).then_some(PipelineEvent::Tags(tags))
                }
                gst::MessageView::Eos(_) => Some(PipelineEvent::EndOfStream),
                gst::MessageView::Error(err) => {
                    let text = match err.debug() {
                        Some(debug) => format!("{} ({})", err.error(), debug),
                        None => err.error().to_string(),
                    };
                    Some(PipelineEvent::Error(text))
                }
                _ => None,
            },
            Origin::Shared(_) => None,
        }
    }
}

impl AnalysisBackend for GstBackend {
    fn set_expected_tracks(&mut self, count: usize) -> Result<()> {
        debug!("Analysis stage expects {} more track(s)", count);
        self.rganalysis
            .set_property("num-tracks", i32::try_from(count).unwrap_or(i32::MAX));
        Ok(())
    }

    fn start_probe(&mut self, track: &TrackDescriptor) -> Result<()> {
        self.cancel_probe();
        self.next_probe += 1;
        match ProbePipeline::start(self.next_probe, track, &self.decoders, self.sender.clone()) {
            Ok(probe) => self.probe = Some(probe),
            Err(e) => {
                warn!("Could not start probe for {}: {}", track.display_name(), e);
                self.pending
                    .push_back(PipelineEvent::ProbeFinished { decodable: false });
            }
        }
        Ok(())
    }

    fn cancel_probe(&mut self) {
        if let Some(probe) = self.probe.take() {
            probe.teardown();
        }
    }

    fn admit(&mut self, track: &TrackDescriptor) -> Result<()> {
        let source = make_element("filesrc", track.display_name())?;
        source.set_property("location", location(track)?);
        self.pipeline.add(&source)?;
        self.source = Some(source.clone());
        source.link(&self.decodebin)?;

        self.rganalysis.set_locked_state(false);
        self.runs_started += 1;
        self.current_run = self.runs_started;
        self.live_run.store(self.current_run, Ordering::SeqCst);
        if let Err(e) = self.pipeline.set_state(gst::State::Playing) {
            self.stop_shared()?;
            return Err(e.into());
        }
        Ok(())
    }

    fn end_track(&mut self) -> Result<()> {
        self.stop_shared()
    }

    fn detach(&mut self, _track: &TrackDescriptor) -> Result<()> {
        if let Some(source) = self.source.take() {
            source.unlink(&self.decodebin);
            self.pipeline.remove(&source)?;
        }
        Ok(())
    }

    fn next_event(&mut self, timeout: Option<Duration>) -> Option<PipelineEvent> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            let (origin, msg) = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match self.receiver.recv_timeout(remaining) {
                        Ok(envelope) => envelope,
                        Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                            return None
                        }
                    }
                }
                None => self.receiver.recv().ok()?,
            };
            if let Some(event) = self.adapt(origin, &msg) {
                return Some(event);
            }
        }
    }
}

impl Drop for GstBackend {
    fn drop(&mut self) {
        self.cancel_probe();
        self.live_run.store(0, Ordering::SeqCst);
        let _ = self.pipeline.set_state(gst::State::Null);
        if let Some(bus) = self.pipeline.bus() {
            bus.unset_sync_handler();
        }
    }
}
