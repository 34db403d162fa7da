use anyhow::Result;
use chrono::Local;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::prelude::*;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use scanlog::capture::{CaptureLoop, CaptureState, TickOutcome};
use scanlog::config::Config;
use scanlog::db::{DailyCount, Detection, DetectionFilter, DetectionStore};
use scanlog::error::StoreError;
use scanlog::export::export_daily_report;
use scanlog::opener::open_video;

use crate::ui;
use crate::ui::capture_tab::LivePreview;
use crate::ui::search_tab::{SearchField, SearchForm};

/// Rows shown in the Capture tab's list.
const RECENT_LIMIT: usize = 200;

/// How long in-flight writes may delay exit.
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Capture,
    Search,
    Reports,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Capture, Tab::Search, Tab::Reports];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Capture => "Capture",
            Tab::Search => "Search",
            Tab::Reports => "Reports",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Tab::Capture => 0,
            Tab::Search => 1,
            Tab::Reports => 2,
        }
    }

    fn next(&self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn prev(&self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

pub struct App {
    pub config: Config,
    pub store: DetectionStore,
    pub capture: CaptureLoop,
    pub tab: Tab,
    pub should_quit: bool,
    pub show_help: bool,
    pub status_message: Option<String>,
    /// Why the camera is not running, if it is not.
    pub camera_error: Option<String>,
    pub recent: Vec<Detection>,
    pub recent_selected: usize,
    pub report: Vec<DailyCount>,
    pub report_selected: usize,
    pub search: SearchForm,
    pub preview: LivePreview,
}

impl App {
    pub fn new(
        config: Config,
        store: DetectionStore,
        capture: CaptureLoop,
        camera_error: Option<String>,
    ) -> Result<Self> {
        let preview = LivePreview::new(&config.preview);
        let status_message = camera_error
            .as_ref()
            .map(|e| format!("Camera Error: {}", e))
            .or_else(|| Some("No barcode detected yet.".to_string()));

        let mut app = Self {
            config,
            store,
            capture,
            tab: Tab::Capture,
            should_quit: false,
            show_help: false,
            status_message,
            camera_error,
            recent: Vec::new(),
            recent_selected: 0,
            report: Vec::new(),
            report_selected: 0,
            search: SearchForm::new(),
            preview,
        };
        app.refresh_lists();
        Ok(app)
    }

    pub async fn run(&mut self, terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) -> Result<()> {
        let tick = Duration::from_millis(self.config.capture.tick_ms.max(1));
        let mut last_tick = Instant::now();

        while !self.should_quit {
            self.poll_writes();

            terminal.draw(|frame| ui::render(frame, self))?;

            let timeout = tick.saturating_sub(last_tick.elapsed());
            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key)?;
                    }
                }
            }

            if last_tick.elapsed() >= tick {
                self.on_tick();
                last_tick = Instant::now();
            }
        }

        self.shutdown();
        Ok(())
    }

    fn on_tick(&mut self) {
        let TickOutcome {
            frame,
            detections,
            stopped,
            recording_lost,
            ..
        } = self.capture.tick();

        if let Some(e) = stopped {
            self.camera_error = Some(e.to_string());
            self.status_message = Some(format!("Camera Error: {}", e));
        }

        if let Some(last) = detections.last() {
            self.status_message = Some(format!(
                "Detected barcode: {} at {}",
                last.value,
                last.detected_at.format("%Y-%m-%d %H:%M:%S")
            ));
        }

        if let Some(e) = recording_lost {
            self.status_message = Some(format!("Recording: {}", e));
        }

        if let Some(frame) = frame {
            self.preview.update(frame);
        }
    }

    /// Collect finished background writes and refresh the views they affect.
    fn poll_writes(&mut self) {
        let completions = self.capture.writer_mut().poll_updates();
        if completions.is_empty() {
            return;
        }

        for completion in &completions {
            if let Err(ref error) = completion.outcome {
                self.status_message = Some(format!(
                    "Failed to save barcode {}: {}",
                    completion.detection.value, error
                ));
            }
        }
        if completions.iter().any(|c| c.success()) {
            self.refresh_lists();
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if self.show_help {
            self.show_help = false;
            return Ok(());
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Ok(());
        }

        if self.tab == Tab::Search && self.search.editing {
            return self.handle_search_input(key);
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Tab => self.tab = self.tab.next(),
            KeyCode::BackTab => self.tab = self.tab.prev(),
            KeyCode::Char('1') => self.tab = Tab::Capture,
            KeyCode::Char('2') => self.tab = Tab::Search,
            KeyCode::Char('3') => self.tab = Tab::Reports,
            KeyCode::Char('r') => self.toggle_recording(),
            KeyCode::Char('R') | KeyCode::F(5) => {
                self.refresh_lists();
                self.status_message = Some("Refreshed.".to_string());
            }
            KeyCode::Char('e') => self.export_report(),
            KeyCode::Char('o') | KeyCode::Enter => self.open_selected_video(),
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('/') | KeyCode::Char('i') if self.tab == Tab::Search => {
                self.search.editing = true;
            }
            KeyCode::Char('c') if self.tab == Tab::Search => {
                self.search.clear();
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_search_input(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => self.search.editing = false,
            KeyCode::Enter => {
                self.search.editing = false;
                self.perform_search();
            }
            KeyCode::Tab | KeyCode::BackTab => self.search.toggle_field(),
            KeyCode::Backspace => self.search.backspace(),
            KeyCode::Char(c) => self.search.handle_char(c),
            _ => {}
        }
        Ok(())
    }

    fn toggle_recording(&mut self) {
        if self.capture.recorder().is_recording() {
            self.status_message = Some(match self.capture.stop_recording() {
                Ok(_) => "Recording stopped.".to_string(),
                Err(e) => format!("Recording stopped with an error: {}", e),
            });
            return;
        }

        if self.capture.state() == CaptureState::Stopped {
            self.status_message = Some("Camera not available.".to_string());
            return;
        }

        self.status_message = Some(match self.capture.start_recording() {
            Ok(path) => format!("Recording started: {}", path.display()),
            Err(e) => {
                warn!("{}", e);
                format!("Recording: {}", e)
            }
        });
    }

    fn perform_search(&mut self) {
        let filter = match DetectionFilter::parse(&self.search.value, &self.search.day) {
            Ok(filter) => filter,
            Err(StoreError::InvalidFilter(_)) => {
                self.search.status = Some("Invalid date. Use YYYY-MM-DD format.".to_string());
                self.search.field = SearchField::Day;
                return;
            }
            Err(e) => {
                self.search.status = Some(e.to_string());
                return;
            }
        };

        match self.store.find(&filter) {
            Ok(results) => self.search.set_results(results),
            Err(e) => self.search.status = Some(format!("Search failed: {}", e)),
        }
    }

    fn export_report(&mut self) {
        let now = Local::now().naive_local();
        self.status_message = Some(
            match export_daily_report(&self.store, &self.config.data_dir(), now) {
                Ok(Some(path)) => format!("Report saved to: {}", path.display()),
                Ok(None) => "No data available to export.".to_string(),
                Err(e) => format!("Export failed: {:#}", e),
            },
        );
    }

    fn selected_detection(&self) -> Option<&Detection> {
        match self.tab {
            Tab::Capture => self.recent.get(self.recent_selected),
            Tab::Search => self.search.selected_result(),
            Tab::Reports => None,
        }
    }

    fn open_selected_video(&mut self) {
        if self.tab == Tab::Reports {
            return;
        }
        let path = match self.selected_detection().map(|d| d.video_path.clone()) {
            None => {
                self.status_message = Some("Select a row that has an associated video.".to_string());
                return;
            }
            Some(None) => {
                self.status_message = Some("The selected row has no stored video path.".to_string());
                return;
            }
            Some(Some(path)) => path,
        };

        let viewer = self.config.preview.external_viewer.as_deref();
        self.status_message = Some(match open_video(&path, viewer) {
            Ok(()) => format!("Opened: {}", path.display()),
            Err(e) => format!("Open Video: {}", e),
        });
    }

    fn move_selection(&mut self, delta: isize) {
        let (index, len) = match self.tab {
            Tab::Capture => (&mut self.recent_selected, self.recent.len()),
            Tab::Search => (&mut self.search.selected_index, self.search.results.len()),
            Tab::Reports => (&mut self.report_selected, self.report.len()),
        };
        if len == 0 {
            *index = 0;
            return;
        }
        *index = (*index as isize + delta).clamp(0, len as isize - 1) as usize;
    }

    pub fn refresh_lists(&mut self) {
        match self.store.recent(RECENT_LIMIT) {
            Ok(rows) => {
                self.recent = rows;
                self.recent_selected = self.recent_selected.min(self.recent.len().saturating_sub(1));
            }
            Err(e) => warn!("Failed to load recent detections: {}", e),
        }
        match self.store.daily_counts() {
            Ok(rows) => {
                self.report = rows;
                self.report_selected = self.report_selected.min(self.report.len().saturating_sub(1));
            }
            Err(e) => warn!("Failed to load daily report: {}", e),
        }
    }

    fn shutdown(&mut self) {
        self.capture.shutdown();
        let pending = self.capture.writer().in_flight();
        if pending > 0 {
            info!("Waiting for {} detection writes", pending);
            self.capture.writer_mut().drain(SHUTDOWN_DRAIN);
        }
    }
}
