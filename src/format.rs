use crate::models::{AlbumReport, GainRecord};

/// Format a gain in dB, or "--" when the analysis stage never reported one.
pub fn format_gain(gain: Option<f64>) -> String {
    match gain {
        Some(g) => format!("{:.2} dB", g),
        None => "--".to_string(),
    }
}

/// Format a linear peak, or "--" when missing.
pub fn format_peak(peak: Option<f64>) -> String {
    match peak {
        Some(p) => format!("{:.6}", p),
        None => "--".to_string(),
    }
}

fn format_row(record: &GainRecord, name: &str) -> String {
    let note = match record.error {
        Some(ref e) => format!("  ({})", e),
        None => String::new(),
    };
    format!(
        "{:>10} {:>10}  {}{}",
        format_gain(record.gain),
        format_peak(record.peak),
        name,
        note,
    )
}

/// Format an album report as a table.
pub fn format_table(report: &AlbumReport) -> String {
    let separator = "\u{2500}".repeat(48);
    let mut output = String::new();

    // Header
    output.push_str(&format!("{:>10} {:>10}  {}\n", "Gain", "Peak", "Track"));
    output.push_str(&separator);
    output.push('\n');

    for track in &report.tracks {
        output.push_str(&format_row(&track.result, &track.filename));
        output.push('\n');
    }

    output.push_str(&separator);
    output.push('\n');

    // Footer
    output.push_str(&format_row(&report.album, "Album"));
    output.push('\n');
    output.push_str(&format!("Number of tracks: {}", report.tracks.len()));

    output
}

/// Format an album report as pretty-printed JSON.
pub fn format_json(report: &AlbumReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
}

/// Format the flat record list (tracks, then album) as pretty-printed JSON.
pub fn format_records_json(records: &[GainRecord]) -> String {
    serde_json::to_string_pretty(records).unwrap_or_else(|_| "[]".to_string())
}

/// Format an album report as CSV. The album row comes last.
pub fn format_csv(report: &AlbumReport) -> String {
    let mut output = String::from("Gain dB,Peak,Track\n");
    let rows = report
        .tracks
        .iter()
        .map(|t| (&t.result, t.filename.as_str()))
        .chain(std::iter::once((&report.album, "Album")));
    for (record, name) in rows {
        output.push_str(&format!(
            "{},{},{}\n",
            record.gain.map(|g| format!("{:.2}", g)).unwrap_or_default(),
            record.peak.map(|p| format!("{:.6}", p)).unwrap_or_default(),
            name,
        ));
    }
    output
}
