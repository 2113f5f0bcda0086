use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use ratatui::Frame;

use super::app::{App, ExportFormat, TrackStatus, View};
use crate::format::{format_gain, format_peak};

const ACCENT: Color = Color::Cyan;
const DIM: Color = Color::DarkGray;
const COMPLETE_COLOR: Color = Color::Green;
const ERROR_COLOR: Color = Color::Red;
const PROGRESS_COLOR: Color = Color::Yellow;

pub fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(5),    // Track table
            Constraint::Length(3), // Summary
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    render_track_table(frame, app, chunks[1]);
    render_summary(frame, app, chunks[2]);
    render_footer(frame, app, chunks[3]);

    // Overlays
    match app.view {
        View::About => render_about_overlay(frame),
        View::Export => render_export_overlay(frame, app),
        View::Main => {}
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let source = if app.loaded_from_cache {
        "cached"
    } else {
        "live"
    };

    let text = vec![Line::from(vec![
        Span::styled("Path: ", Style::default().fg(DIM)),
        Span::styled(
            app.path.display().to_string(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(format!("({})", source), Style::default().fg(DIM)),
    ])];

    let block = Block::default()
        .title(Span::styled(
            " ReplayGain ",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));

    let paragraph = Paragraph::new(text).block(block);
    frame.render_widget(paragraph, area);
}

fn render_track_table(frame: &mut Frame, app: &mut App, area: Rect) {
    // 2 for borders, 1 for header
    let inner_height = area.height.saturating_sub(3) as usize;
    app.visible_rows = inner_height;

    let total = app.tracks.len();
    let scroll_info = if total > inner_height {
        let has_above = app.scroll_offset > 0;
        let has_below = app.scroll_offset + inner_height < total;
        match (has_above, has_below) {
            (true, true) => format!(
                " [{}-{}/{}] \u{2191}\u{2193} ",
                app.scroll_offset + 1,
                (app.scroll_offset + inner_height).min(total),
                total
            ),
            (true, false) => format!(" [{}-{}/{}] \u{2191} ", app.scroll_offset + 1, total, total),
            (false, true) => format!(" [1-{}/{}] \u{2193} ", inner_height.min(total), total),
            (false, false) => String::new(),
        }
    } else {
        String::new()
    };

    let header = Row::new(vec![
        Cell::from("#").style(Style::default().fg(DIM)),
        Cell::from("Track").style(Style::default().fg(DIM)),
        Cell::from("Gain").style(Style::default().fg(DIM)),
        Cell::from("Peak").style(Style::default().fg(DIM)),
        Cell::from("").style(Style::default().fg(DIM)),
    ])
    .height(1);

    let end = (app.scroll_offset + inner_height).min(app.tracks.len());
    let visible_slice = &app.tracks[app.scroll_offset..end];

    let rows: Vec<Row> = visible_slice
        .iter()
        .enumerate()
        .map(|(vi, (name, status))| {
            let actual_index = app.scroll_offset + vi;
            let num = format!("{}", actual_index + 1);
            let style = if actual_index == app.selected {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };

            let cells = match status {
                TrackStatus::Pending => vec![
                    Cell::from(num),
                    Cell::from(name.as_str()),
                    Cell::from("\u{00b7}").style(Style::default().fg(DIM)),
                    Cell::from(""),
                    Cell::from("\u{00b7}").style(Style::default().fg(DIM)),
                ],
                TrackStatus::Probing => vec![
                    Cell::from(num),
                    Cell::from(name.as_str()),
                    Cell::from("probing").style(Style::default().fg(PROGRESS_COLOR)),
                    Cell::from(""),
                    Cell::from("?").style(Style::default().fg(PROGRESS_COLOR)),
                ],
                TrackStatus::Analyzing => vec![
                    Cell::from(num),
                    Cell::from(name.as_str()),
                    Cell::from("analyzing").style(Style::default().fg(PROGRESS_COLOR)),
                    Cell::from(""),
                    Cell::from("\u{27f3}").style(Style::default().fg(PROGRESS_COLOR)),
                ],
                TrackStatus::Complete(record) => match record.error {
                    Some(ref msg) => vec![
                        Cell::from(num),
                        Cell::from(name.as_str()),
                        Cell::from(format_gain(record.gain)),
                        Cell::from(msg.as_str()).style(Style::default().fg(ERROR_COLOR)),
                        Cell::from("!").style(Style::default().fg(ERROR_COLOR)),
                    ],
                    None => vec![
                        Cell::from(num),
                        Cell::from(name.as_str()),
                        Cell::from(format_gain(record.gain)),
                        Cell::from(format_peak(record.peak)),
                        Cell::from("\u{2713}").style(Style::default().fg(COMPLETE_COLOR)),
                    ],
                },
                TrackStatus::Skipped => vec![
                    Cell::from(num),
                    Cell::from(name.as_str()).style(Style::default().fg(DIM)),
                    Cell::from("skipped").style(Style::default().fg(ERROR_COLOR)),
                    Cell::from(""),
                    Cell::from("\u{2717}").style(Style::default().fg(ERROR_COLOR)),
                ],
            };
            Row::new(cells).style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Min(20),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(2),
    ];

    let block = Block::default()
        .title(Span::styled(scroll_info, Style::default().fg(DIM)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(Style::default().bg(Color::DarkGray));

    frame.render_widget(table, area);
}

fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let completed = app.completed_count();
    let skipped = app.skipped_count();
    let total = app.tracks.len();

    let (album_text, color) = if let Some(ref error) = app.analysis_error {
        (format!("Analysis failed: {}", error), ERROR_COLOR)
    } else if let Some(ref report) = app.album_report {
        (
            format!(
                "Album gain {}  peak {}",
                format_gain(report.album.gain),
                format_peak(report.album.peak)
            ),
            Color::White,
        )
    } else {
        ("Album gain --  peak --".to_string(), DIM)
    };

    let timing = match app.elapsed {
        Some(elapsed) => format!("  in {:.1}s", elapsed.as_secs_f64()),
        None => String::new(),
    };

    let text = format!(
        "{} ({}/{} analyzed, {} skipped){}",
        album_text, completed, total, skipped, timing
    );
    let paragraph = Paragraph::new(text)
        .style(Style::default().fg(color))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT)),
        );
    frame.render_widget(paragraph, area);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let keys = match app.view {
        View::Main if app.is_running() => "[a]bout  [q]uit",
        View::Main => "[e]xport  [r]egenerate  [a]bout  [q]uit",
        View::About | View::Export => "[Esc] close",
    };
    let footer = Paragraph::new(keys)
        .style(Style::default().fg(DIM))
        .alignment(Alignment::Center);
    frame.render_widget(footer, area);
}

fn render_about_overlay(frame: &mut Frame) {
    let area = centered_rect(44, 10, frame.area());
    frame.render_widget(Clear, area);

    let text = vec![
        Line::from(Span::styled(
            "rgain",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!("Version {}", env!("CARGO_PKG_VERSION"))),
        Line::from(""),
        Line::from("ReplayGain analyzer for audio albums."),
        Line::from("Uses the GStreamer rganalysis element."),
        Line::from(""),
        Line::from(Span::styled("[Esc] close", Style::default().fg(DIM))),
    ];

    let block = Block::default()
        .title(" About ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));

    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(block);
    frame.render_widget(paragraph, area);
}

fn render_export_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect(50, 12, frame.area());
    frame.render_widget(Clear, area);

    let format_name = match app.export_format {
        ExportFormat::Text => "Text (gain table)",
        ExportFormat::Json => "JSON",
        ExportFormat::Csv => "CSV",
    };

    let output_path = app
        .path
        .join(format!("rgain_report.{}", app.export_format.extension()));

    let mut text = vec![
        Line::from(Span::styled(
            "Export Report",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Format: ", Style::default().fg(DIM)),
            Span::styled(format_name, Style::default().fg(Color::White)),
        ]),
        Line::from(vec![
            Span::styled("Output: ", Style::default().fg(DIM)),
            Span::styled(
                output_path.display().to_string(),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "[Tab] cycle format  [Enter] save  [Esc] cancel",
            Style::default().fg(DIM),
        )),
    ];

    if let Some(ref msg) = app.export_message {
        text.push(Line::from(""));
        text.push(Line::from(Span::styled(
            msg.as_str(),
            Style::default().fg(COMPLETE_COLOR),
        )));
    }

    let block = Block::default()
        .title(" Export ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));

    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(block);
    frame.render_widget(paragraph, area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
