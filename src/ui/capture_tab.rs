use image::{DynamicImage, RgbImage};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use ratatui_image::{picker::Picker, protocol::StatefulProtocol, Resize, StatefulImage};
use std::time::{Duration, Instant};

use scanlog::config::{ImageProtocol, PreviewConfig};
use scanlog::db::Detection;

use crate::app::App;

/// Terminal image encoding is slow; the preview refreshes at most this often.
const PREVIEW_INTERVAL: Duration = Duration::from_millis(100);

/// Latest camera frame, encoded for the terminal's image protocol.
pub struct LivePreview {
    picker: Option<Picker>,
    protocol: Option<StatefulProtocol>,
    last_update: Option<Instant>,
    enabled: bool,
}

impl LivePreview {
    pub fn new(config: &PreviewConfig) -> Self {
        let picker = if config.live_video {
            Self::create_picker(config.protocol)
        } else {
            None
        };
        Self {
            picker,
            protocol: None,
            last_update: None,
            enabled: config.live_video,
        }
    }

    fn create_picker(protocol: ImageProtocol) -> Option<Picker> {
        match protocol {
            ImageProtocol::None => None,
            ImageProtocol::Auto => Picker::from_query_stdio().ok(),
        }
    }

    /// Check if image preview is available
    pub fn is_available(&self) -> bool {
        self.picker.is_some()
    }

    pub fn update(&mut self, frame: RgbImage) {
        let Some(ref mut picker) = self.picker else {
            return;
        };
        if let Some(last) = self.last_update {
            if last.elapsed() < PREVIEW_INTERVAL {
                return;
            }
        }
        self.protocol = Some(picker.new_resize_protocol(DynamicImage::ImageRgb8(frame)));
        self.last_update = Some(Instant::now());
    }
}

pub fn render(frame: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    render_video(frame, app, chunks[0]);
    render_side_panel(frame, app, chunks[1]);
}

fn render_video(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Camera ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if let Some(ref error) = app.camera_error {
        let message = Paragraph::new(vec![
            Line::from(Span::styled("Camera Error", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))),
            Line::from(""),
            Line::from(error.as_str()),
            Line::from(""),
            Line::from(Span::styled(
                "Search and reports are still available.",
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
        frame.render_widget(message, inner);
        return;
    }

    if let Some(ref mut protocol) = app.preview.protocol {
        let image = StatefulImage::new(None).resize(Resize::Fit(None));
        frame.render_stateful_widget(image, inner, protocol);
        return;
    }

    let text = if !app.preview.enabled {
        "Live preview disabled"
    } else if !app.preview.is_available() {
        "Live preview not supported by this terminal"
    } else {
        "Waiting for camera..."
    };
    let placeholder = Paragraph::new(text)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(placeholder, inner);
}

fn render_side_panel(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(3)])
        .split(area);

    let recorder = app.capture.recorder();
    let (indicator, indicator_style) = if recorder.is_recording() {
        ("● REC", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
    } else {
        ("○ Idle", Style::default().fg(Color::DarkGray))
    };
    let path = recorder
        .current_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "-".to_string());
    let last = app.capture.dedup().last_value().unwrap_or("-").to_string();

    let info = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("Recording: ", Style::default().fg(Color::DarkGray)),
            Span::styled(indicator, indicator_style),
        ]),
        Line::from(vec![
            Span::styled("File: ", Style::default().fg(Color::DarkGray)),
            Span::raw(path),
        ]),
        Line::from(vec![
            Span::styled("Last barcode: ", Style::default().fg(Color::DarkGray)),
            Span::styled(last, Style::default().fg(Color::Green)),
        ]),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Session "),
    );
    frame.render_widget(info, chunks[0]);

    let items: Vec<ListItem> = app.recent.iter().map(detection_item).collect();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(format!(" Recent ({}) ", app.recent.len())),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Cyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    if !app.recent.is_empty() {
        state.select(Some(app.recent_selected));
    }
    frame.render_stateful_widget(list, chunks[1], &mut state);
}

/// One-line list row shared by the Capture and Search tabs.
pub fn detection_item(detection: &Detection) -> ListItem<'static> {
    let video = if detection.video_path.is_some() { " ▶" } else { "" };
    ListItem::new(Line::from(vec![
        Span::styled(
            format!("{} ", detection.detected_at.format("%Y-%m-%d %H:%M:%S")),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(detection.value.clone(), Style::default().fg(Color::White)),
        Span::styled(video.to_string(), Style::default().fg(Color::Green)),
    ]))
}
