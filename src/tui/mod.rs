pub mod app;
pub mod ui;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::cache;
use crate::config::AnalysisConfig;
use crate::format;
use crate::models::{AlbumReport, AnalysisEvent};
use crate::sequencer::analyze_album_with_events;
use crate::track::scan_audio_files;

use app::{App, ExportFormat, View};

/// A running album analysis: its progress channel and the thread doing the work.
struct Analysis {
    events: mpsc::Receiver<AnalysisEvent>,
    handle: Option<JoinHandle<crate::Result<AlbumReport>>>,
}

impl Analysis {
    fn spawn(files: Vec<PathBuf>, config: AnalysisConfig) -> Self {
        let (tx, rx) = mpsc::channel::<AnalysisEvent>();
        let handle = std::thread::spawn(move || analyze_album_with_events(&files, &config, tx));
        Self {
            events: rx,
            handle: Some(handle),
        }
    }

    /// Move pending events into the app and pick up the thread's outcome once it exits.
    fn drain(&mut self, app: &mut App) {
        while let Ok(event) = self.events.try_recv() {
            if let AnalysisEvent::AlbumCompleted { ref report } = event {
                if let Err(e) = cache::save_report(&app.path, report) {
                    app.export_message = Some(format!("Warning: failed to save cache: {}", e));
                }
            }
            app.apply_event(event);
        }

        if self.handle.as_ref().is_some_and(|h| h.is_finished()) {
            if let Some(handle) = self.handle.take() {
                match handle.join() {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => app.analysis_error = Some(e.to_string()),
                    Err(_) => app.analysis_error = Some("analysis thread panicked".to_string()),
                }
            }
        }
    }
}

/// One row per scanned file, so progress indices line up with the rows.
fn track_rows(files: &[PathBuf]) -> Vec<String> {
    files
        .iter()
        .map(|p| {
            p.file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string())
        })
        .collect()
}

pub fn run(path: &Path, config: AnalysisConfig, regenerate: bool) -> Result<()> {
    let files = scan_audio_files(path);
    let mut app = App::new(track_rows(&files), path.to_path_buf());

    let mut analysis = match cache::load_cached_report(path).filter(|_| !regenerate) {
        Some(cached) => {
            app.load_from_cache(cached);
            None
        }
        None => {
            app.analysis_start = Some(Instant::now());
            Some(Analysis::spawn(files.clone(), config.clone()))
        }
    };

    // Setup terminal
    enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, &mut analysis, &files, &config);

    // Restore terminal
    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    analysis: &mut Option<Analysis>,
    files: &[PathBuf],
    config: &AnalysisConfig,
) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;
        // Note: ui::render updates app.visible_rows each frame

        if let Some(running) = analysis.as_mut() {
            running.drain(app);
        }

        // Poll for key events
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match app.view {
                    View::Main => match key.code {
                        KeyCode::Char('q') => {
                            app.should_quit = true;
                        }
                        KeyCode::Char('e') => {
                            if app.album_report.is_some() {
                                app.view = View::Export;
                                app.export_message = None;
                            }
                        }
                        KeyCode::Char('r') => {
                            if !app.is_running() {
                                app.reset_for_regeneration();
                                *analysis = Some(Analysis::spawn(files.to_vec(), config.clone()));
                            }
                        }
                        KeyCode::Char('a') => {
                            app.view = View::About;
                        }
                        KeyCode::Char('j') | KeyCode::Down => {
                            app.select_next();
                        }
                        KeyCode::Char('k') | KeyCode::Up => {
                            app.select_prev();
                        }
                        _ => {}
                    },
                    View::About => match key.code {
                        KeyCode::Esc | KeyCode::Char('q') => {
                            app.view = View::Main;
                        }
                        _ => {}
                    },
                    View::Export => match key.code {
                        KeyCode::Esc => {
                            app.view = View::Main;
                        }
                        KeyCode::Tab => {
                            app.cycle_export_format();
                            app.export_message = None;
                        }
                        KeyCode::Enter => export(app),
                        _ => {}
                    },
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn export(app: &mut App) {
    let Some(ref report) = app.album_report else {
        return;
    };
    let content = match app.export_format {
        ExportFormat::Text => format::format_table(report),
        ExportFormat::Json => format::format_json(report),
        ExportFormat::Csv => format::format_csv(report),
    };
    let output_path = app
        .path
        .join(format!("rgain_report.{}", app.export_format.extension()));
    app.export_message = Some(match std::fs::write(&output_path, &content) {
        Ok(_) => format!("Saved to {}", output_path.display()),
        Err(e) => format!("Error: {}", e),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_every_file_gets_a_row() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let files = vec![
            PathBuf::from("/album/01.flac"),
            PathBuf::from("/album").join(OsStr::from_bytes(b"02-\xff.flac")),
            PathBuf::from("/album/03.flac"),
        ];
        let rows = track_rows(&files);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], "01.flac");
        assert_eq!(rows[1], "02-\u{fffd}.flac");
        assert_eq!(rows[2], "03.flac");
    }
}
