use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use gstreamer as gst;
use gstreamer::prelude::*;

use rgain::cache;
use rgain::format;
use rgain::models::{AlbumReport, GainRecord, TrackReport};
use rgain::track::scan_audio_files;
use rgain::{analyze_album, compute_album_gain, AnalysisConfig};

const REQUIRED_ELEMENTS: &[&str] = &[
    "audiotestsrc",
    "audioconvert",
    "audioresample",
    "flacenc",
    "filesrc",
    "filesink",
    "decodebin",
    "rganalysis",
    "fakesink",
];

/// Whether this machine has the GStreamer plugins the end-to-end tests need.
fn gstreamer_available() -> bool {
    if rgain::pipeline::init().is_err() {
        return false;
    }
    let missing: Vec<_> = REQUIRED_ELEMENTS
        .iter()
        .filter(|name| gst::ElementFactory::find(name).is_none())
        .collect();
    if !missing.is_empty() {
        eprintln!("skipping: missing GStreamer elements {:?}", missing);
        return false;
    }
    true
}

/// Encode a short test tone to FLAC.
fn generate_flac(dir: &Path, filename: &str, frequency: f64, volume: f64) -> PathBuf {
    let path = dir.join(filename);

    let pipeline = gst::parse::launch(
        "audiotestsrc name=src num-buffers=40 ! audioconvert ! flacenc ! filesink name=out",
    )
    .unwrap()
    .downcast::<gst::Pipeline>()
    .unwrap();
    let src = pipeline.by_name("src").unwrap();
    src.set_property("freq", frequency);
    src.set_property("volume", volume);
    pipeline
        .by_name("out")
        .unwrap()
        .set_property("location", path.to_str().unwrap());

    pipeline.set_state(gst::State::Playing).unwrap();
    let bus = pipeline.bus().unwrap();
    let msg = bus
        .timed_pop_filtered(
            gst::ClockTime::from_seconds(30),
            &[gst::MessageType::Eos, gst::MessageType::Error],
        )
        .expect("encoder did not finish");
    pipeline.set_state(gst::State::Null).unwrap();
    assert!(
        matches!(msg.view(), gst::MessageView::Eos(_)),
        "failed to encode {}",
        filename
    );

    path
}

fn sample_report() -> AlbumReport {
    AlbumReport {
        tracks: vec![
            TrackReport {
                filename: "01.flac".to_string(),
                result: GainRecord::new(Some(-7.12), Some(0.988281)),
            },
            TrackReport {
                filename: "02.flac".to_string(),
                result: GainRecord::new(Some(-4.5), Some(0.5)),
            },
        ],
        album: GainRecord::new(Some(-6.03), Some(0.988281)),
    }
}

#[test]
fn test_scan_audio_files() {
    let dir = tempfile::tempdir().unwrap();

    std::fs::write(dir.path().join("track.flac"), b"fake").unwrap();
    std::fs::write(dir.path().join("track.mp3"), b"fake").unwrap();
    std::fs::write(dir.path().join("cover.jpg"), b"fake").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"fake").unwrap();
    std::fs::write(dir.path().join("raw.wav"), b"fake").unwrap();

    let files = scan_audio_files(dir.path());
    assert_eq!(files.len(), 2);
    assert!(files[0].extension().unwrap() == "flac");
    assert!(files[1].extension().unwrap() == "mp3");
}

#[test]
fn test_table_formatter_columns() {
    let table = format::format_table(&sample_report());

    assert!(table.contains("Gain"));
    assert!(table.contains("Peak"));
    assert!(table.contains("Track"));
    assert!(table.contains("-7.12 dB"));
    assert!(table.contains("0.988281"));
    assert!(table.contains("02.flac"));
    assert!(table.contains("-6.03 dB"));
    assert!(table.contains("Number of tracks: 2"));
}

#[test]
fn test_album_json_roundtrip() {
    let json = format::format_json(&sample_report());
    let parsed: AlbumReport = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, sample_report());
}

// --- Cache helper tests ---

#[test]
fn test_reports_exist_no_files() {
    let dir = tempfile::tempdir().unwrap();
    assert!(!cache::reports_exist(dir.path(), true, false));
    assert!(!cache::reports_exist(dir.path(), false, true));
    assert!(!cache::reports_exist(dir.path(), true, true));
    // Neither requested
    assert!(cache::reports_exist(dir.path(), false, false));
}

#[test]
fn test_reports_exist_json_only() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("rgain_report.json"), "{}").unwrap();

    assert!(cache::reports_exist(dir.path(), true, false));
    assert!(!cache::reports_exist(dir.path(), true, true));
    assert!(!cache::reports_exist(dir.path(), false, true));
}

#[test]
fn test_reports_exist_both() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("rgain_report.json"), "{}").unwrap();
    std::fs::write(dir.path().join("rgain_report.txt"), "report").unwrap();

    assert!(cache::reports_exist(dir.path(), true, true));
    assert!(cache::reports_exist(dir.path(), true, false));
    assert!(cache::reports_exist(dir.path(), false, true));
}

#[test]
fn test_save_text_report() {
    let dir = tempfile::tempdir().unwrap();
    let content = "  -6.54 dB   0.891234  01.flac";
    cache::save_text_report(dir.path(), content).unwrap();

    let path = dir.path().join("rgain_report.txt");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), content);
}

// --- CLI validation tests ---

#[test]
fn test_bulk_and_tui_conflict() {
    cargo_bin_cmd!("rgain")
        .args([".", "--bulk", "--tui"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("--bulk and --tui cannot be used together"));
}

#[test]
fn test_bulk_requires_output_format() {
    cargo_bin_cmd!("rgain")
        .args([".", "--bulk"])
        .assert()
        .failure()
        .stderr(predicates::str::contains(
            "--bulk requires at least one output format",
        ));
}

#[test]
fn test_negative_timeout_rejected() {
    cargo_bin_cmd!("rgain")
        .args([".", "--probe-timeout=-1"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("--probe-timeout"));
}

#[test]
fn test_bulk_no_subdirectories() {
    let base = tempfile::tempdir().unwrap();
    std::fs::write(base.path().join("file.txt"), "not a dir").unwrap();

    cargo_bin_cmd!("rgain")
        .args([base.path().to_str().unwrap(), "--bulk", "--json"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("No subdirectories found"));
}

#[test]
fn test_directory_without_audio_follows_empty_album_policy() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("cover.jpg"), b"fake").unwrap();

    cargo_bin_cmd!("rgain")
        .args([dir.path().to_str().unwrap(), "--reject-empty"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("No audio tracks to analyze"));

    cargo_bin_cmd!("rgain")
        .args([dir.path().to_str().unwrap(), "--records"])
        .assert()
        .success()
        .stdout(predicates::str::contains("\"gain\": null"));
}

#[test]
fn test_cached_report_is_reused() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("01.flac"), b"fake").unwrap();
    cache::save_report(dir.path(), &sample_report()).unwrap();

    cargo_bin_cmd!("rgain")
        .args([dir.path().to_str().unwrap(), "--json"])
        .assert()
        .success()
        .stderr(predicates::str::contains("loaded from cached report"))
        .stdout(predicates::str::contains("-7.12"));
}

// --- End-to-end analysis (needs GStreamer plugins) ---

#[test]
fn test_single_track_album_matches_track() {
    if !gstreamer_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let track = generate_flac(dir.path(), "01.flac", 440.0, 0.5);

    let records = compute_album_gain(&[track], &AnalysisConfig::default()).unwrap();

    assert_eq!(records.len(), 2);
    assert!(records[0].gain.is_some());
    assert!(records[0].peak.is_some());
    assert_eq!(records[0].gain, records[1].gain);
    assert_eq!(records[0].peak, records[1].peak);
}

#[test]
fn test_records_output_is_flat_list() {
    if !gstreamer_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let good = generate_flac(dir.path(), "01.flac", 440.0, 0.5);
    let bad = dir.path().join("02.mp3");
    std::fs::write(&bad, b"this is not an mp3 stream").unwrap();

    let output = cargo_bin_cmd!("rgain")
        .args([good.to_str().unwrap(), bad.to_str().unwrap(), "--records"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let records: Vec<GainRecord> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(records.len(), 2);
    assert!(records[1].gain.is_some());
}

#[test]
fn test_undecodable_track_is_skipped() {
    if !gstreamer_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let good = generate_flac(dir.path(), "01.flac", 440.0, 0.5);
    let bad = dir.path().join("02.mp3");
    std::fs::write(&bad, b"this is not an mp3 stream").unwrap();

    let report = analyze_album(&[good, bad], &AnalysisConfig::default()).unwrap();

    assert_eq!(report.tracks.len(), 1);
    assert_eq!(report.tracks[0].filename, "01.flac");
    assert_eq!(report.records().len(), 2);
    assert!(report.album.gain.is_some());
}

#[test]
fn test_tracks_keep_input_order() {
    if !gstreamer_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let quiet = generate_flac(dir.path(), "quiet.flac", 440.0, 0.1);
    let loud = generate_flac(dir.path(), "loud.flac", 440.0, 0.9);

    let report = analyze_album(&[loud, quiet], &AnalysisConfig::default()).unwrap();

    let names: Vec<_> = report.tracks.iter().map(|t| t.filename.as_str()).collect();
    assert_eq!(names, ["loud.flac", "quiet.flac"]);
    // Louder material needs less gain
    assert!(report.tracks[0].result.gain < report.tracks[1].result.gain);
    assert!(report.tracks[0].result.peak > report.tracks[1].result.peak);
    // Album totals survive the pipeline reset between the two tracks
    assert!(report.album.gain.is_some());
    assert_eq!(report.album.peak, report.tracks[0].result.peak);
}

#[test]
fn test_reject_empty_album() {
    let dir = tempfile::tempdir().unwrap();
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "liner notes").unwrap();

    cargo_bin_cmd!("rgain")
        .args([notes.to_str().unwrap(), "--json"])
        .assert()
        .success()
        .stdout(predicates::str::contains("\"tracks\": []"));

    cargo_bin_cmd!("rgain")
        .args([notes.to_str().unwrap(), "--reject-empty"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("No audio tracks to analyze"));
}

/// Two album directories, each with one encoded track.
fn setup_bulk_dir() -> tempfile::TempDir {
    let base = tempfile::tempdir().unwrap();

    let album_a = base.path().join("Album A");
    let album_b = base.path().join("Album B");
    std::fs::create_dir(&album_a).unwrap();
    std::fs::create_dir(&album_b).unwrap();

    generate_flac(&album_a, "01-track.flac", 440.0, 0.5);
    generate_flac(&album_b, "01-track.flac", 880.0, 0.5);

    base
}

#[test]
fn test_bulk_json_and_txt() {
    if !gstreamer_available() {
        return;
    }
    let base = setup_bulk_dir();

    cargo_bin_cmd!("rgain")
        .args([base.path().to_str().unwrap(), "--bulk", "--json", "--txt"])
        .assert()
        .success()
        .stderr(predicates::str::contains(
            "Done: 2 analyzed, 0 skipped, 0 failed (out of 2 total)",
        ));

    for album in &["Album A", "Album B"] {
        assert!(base.path().join(album).join("rgain_report.json").exists());
        assert!(base.path().join(album).join("rgain_report.txt").exists());
    }

    let json = std::fs::read_to_string(base.path().join("Album A/rgain_report.json")).unwrap();
    let parsed: AlbumReport = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.tracks.len(), 1);
}

#[test]
fn test_bulk_skips_existing_reports() {
    if !gstreamer_available() {
        return;
    }
    let base = setup_bulk_dir();

    cargo_bin_cmd!("rgain")
        .args([base.path().to_str().unwrap(), "--bulk", "--json"])
        .assert()
        .success();

    let report_path = base.path().join("Album A/rgain_report.json");
    let mtime_before = std::fs::metadata(&report_path).unwrap().modified().unwrap();

    std::thread::sleep(std::time::Duration::from_millis(50));

    cargo_bin_cmd!("rgain")
        .args([base.path().to_str().unwrap(), "--bulk", "--json"])
        .assert()
        .success()
        .stderr(predicates::str::contains("Skipping"));

    let mtime_after = std::fs::metadata(&report_path).unwrap().modified().unwrap();
    assert_eq!(mtime_before, mtime_after, "Report should not have been rewritten");
}

#[test]
fn test_single_dir_txt_flag() {
    if !gstreamer_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    generate_flac(dir.path(), "track.flac", 440.0, 0.5);

    cargo_bin_cmd!("rgain")
        .args([dir.path().to_str().unwrap(), "--txt"])
        .assert()
        .success();

    assert!(dir.path().join("rgain_report.json").exists());
    let txt = std::fs::read_to_string(dir.path().join("rgain_report.txt")).unwrap();
    assert!(txt.contains("Album"));
    assert!(txt.contains("Number of tracks: 1"));
}
