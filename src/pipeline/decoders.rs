//! Decoder selection for decodebin's `autoplug-sort` signal.

use gstreamer as gst;
use gstreamer::glib;
use gstreamer::prelude::*;
use tracing::debug;

use crate::config::DecoderPreference;

/// Reorder decoder candidates so the preferred decoder goes right before the
/// first low-quality one.
///
/// Returns `None` when decodebin's own order should be kept: no low-quality
/// candidate, the preferred decoder is not installed, or it already comes first.
pub fn preferred_order(
    candidates: &[String],
    preference: &DecoderPreference,
    is_installed: impl Fn(&str) -> bool,
) -> Option<Vec<String>> {
    let first_low = candidates
        .iter()
        .position(|name| preference.low_quality.iter().any(|lq| lq == name))?;

    let already_listed = candidates.iter().any(|name| *name == preference.preferred);
    if !already_listed && !is_installed(&preference.preferred) {
        return None;
    }

    let mut order: Vec<String> = candidates
        .iter()
        .filter(|name| **name != preference.preferred)
        .cloned()
        .collect();
    let insert_at = order
        .iter()
        .position(|name| preference.low_quality.iter().any(|lq| lq == name))
        .unwrap_or(first_low);
    order.insert(insert_at, preference.preferred.clone());

    if order == candidates {
        None
    } else {
        Some(order)
    }
}

/// Install the preference on a decodebin instance.
pub(crate) fn connect_autoplug_sort(decodebin: &gst::Element, preference: DecoderPreference) {
    decodebin.connect("autoplug-sort", false, move |args| {
        let keep_default = || Some(glib::Value::from_type(glib::ValueArray::static_type()));

        let Some(Ok(factories)) = args.get(3).map(|v| v.get::<glib::ValueArray>()) else {
            return keep_default();
        };
        let candidates: Vec<gst::ElementFactory> = factories
            .iter()
            .filter_map(|v| v.get::<gst::ElementFactory>().ok())
            .collect();
        let names: Vec<String> = candidates.iter().map(|f| f.name().to_string()).collect();

        let Some(order) = preferred_order(&names, &preference, |name| {
            gst::ElementFactory::find(name).is_some()
        }) else {
            return keep_default();
        };

        debug!("Reordered decoder candidates: {:?} -> {:?}", names, order);
        let sorted: Vec<gst::ElementFactory> = order
            .iter()
            .filter_map(|name| {
                candidates
                    .iter()
                    .find(|f| f.name().as_str() == name)
                    .cloned()
                    .or_else(|| gst::ElementFactory::find(name))
            })
            .collect();
        Some(glib::ValueArray::new(sorted).to_value())
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_prefers_float_decoder_over_low_quality() {
        let pref = DecoderPreference::default();
        let order = preferred_order(&names(&["mad", "mpg123audiodec"]), &pref, |_| true);
        assert_eq!(
            order,
            Some(names(&["avdec_mp3float", "mad", "mpg123audiodec"]))
        );
    }

    #[test]
    fn test_inserted_before_first_low_quality_only() {
        let pref = DecoderPreference::default();
        let order = preferred_order(
            &names(&["mpg123audiodec", "flump3dec", "mad"]),
            &pref,
            |_| true,
        );
        assert_eq!(
            order,
            Some(names(&["mpg123audiodec", "avdec_mp3float", "flump3dec", "mad"]))
        );
    }

    #[test]
    fn test_keeps_default_without_low_quality_candidates() {
        let pref = DecoderPreference::default();
        assert_eq!(
            preferred_order(&names(&["flacdec", "avdec_flac"]), &pref, |_| true),
            None
        );
        assert_eq!(preferred_order(&[], &pref, |_| true), None);
    }

    #[test]
    fn test_missing_preferred_decoder_is_skipped() {
        let pref = DecoderPreference::default();
        assert_eq!(preferred_order(&names(&["mad"]), &pref, |_| false), None);
    }

    #[test]
    fn test_listed_preferred_decoder_is_moved_forward() {
        let pref = DecoderPreference::default();
        let order = preferred_order(&names(&["mad", "avdec_mp3float"]), &pref, |_| false);
        assert_eq!(order, Some(names(&["avdec_mp3float", "mad"])));

        let already_first = names(&["avdec_mp3float", "mad"]);
        assert_eq!(preferred_order(&already_first, &pref, |_| true), None);
    }
}
