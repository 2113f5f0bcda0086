//! Disposable decode-only pipeline used to check that a file can be decoded
//! before it is admitted to the shared analysis pipeline.

use std::sync::mpsc::Sender;

use gstreamer as gst;
use gstreamer::prelude::*;
use tracing::{debug, warn};

use super::{decoders, forward_bus, link_decoded_pads, location, make_element, Envelope, Origin};
use crate::config::DecoderPreference;
use crate::error::Result;
use crate::track::TrackDescriptor;

/// `filesrc ! decodebin ! audioconvert ! fakesink`, torn down as soon as it
/// either reaches PLAYING or fails.
pub(crate) struct ProbePipeline {
    id: u64,
    pipeline: gst::Pipeline,
}

impl ProbePipeline {
    pub(crate) fn start(
        id: u64,
        track: &TrackDescriptor,
        decoders: &DecoderPreference,
        sender: Sender<Envelope>,
    ) -> Result<Self> {
        let name = track.display_name();
        let pipeline = gst::Pipeline::with_name(&format!("test-pipeline-{}", name));

        let src = make_element("filesrc", &format!("test-{}", name))?;
        src.set_property("location", location(track)?);
        let decodebin = make_element("decodebin", &format!("test-decbin-{}", name))?;
        let conv = make_element("audioconvert", &format!("test-conv-{}", name))?;
        let sink = make_element("fakesink", &format!("test-sink-{}", name))?;

        pipeline.add_many([&src, &decodebin, &conv, &sink])?;
        src.link(&decodebin)?;
        conv.link(&sink)?;

        decoders::connect_autoplug_sort(&decodebin, decoders.clone());
        link_decoded_pads(&decodebin, &conv);
        forward_bus(&pipeline, sender, move || Some(Origin::Probe(id)))?;

        let probe = Self { id, pipeline };
        debug!("Probing {}", track.path().display());
        if let Err(e) = probe.pipeline.set_state(gst::State::Playing) {
            probe.teardown();
            return Err(e.into());
        }
        Ok(probe)
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Interpret a message from this probe's bus. `Some(true)` once the whole
    /// pipeline is PLAYING, `Some(false)` on any error.
    pub(crate) fn verdict(&self, msg: &gst::Message) -> Option<bool> {
        match msg.view() {
            gst::MessageView::Error(err) => {
                warn!(
                    "Probe {} failed: {} ({:?})",
                    self.pipeline.name(),
                    err.error(),
                    err.debug()
                );
                Some(false)
            }
            gst::MessageView::StateChanged(change) => {
                let from_pipeline = msg.src() == Some(self.pipeline.upcast_ref::<gst::Object>());
                (from_pipeline && change.current() == gst::State::Playing).then_some(true)
            }
            _ => None,
        }
    }

    /// Return the pipeline to NULL and stop forwarding its messages.
    pub(crate) fn teardown(self) {
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            warn!("Failed to stop probe {}: {}", self.pipeline.name(), e);
        }
        if let Some(bus) = self.pipeline.bus() {
            bus.unset_sync_handler();
        }
    }
}
