use ratatui::{
    prelude::*,
    widgets::Paragraph,
};

use scanlog::capture::CaptureState;

use crate::app::App;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = Vec::new();

    let (camera, camera_style) = match app.capture.state() {
        CaptureState::Running => (" CAM ", Style::default().fg(Color::Black).bg(Color::Green)),
        CaptureState::Stopped => (" NO CAM ", Style::default().fg(Color::White).bg(Color::Red)),
    };
    spans.push(Span::styled(camera, camera_style));

    if app.capture.recorder().is_recording() {
        spans.push(Span::styled(
            " REC ",
            Style::default().fg(Color::White).bg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }

    let pending = app.capture.writer().in_flight();
    if pending > 0 {
        spans.push(Span::styled(
            format!(" [saving:{}] ", pending),
            Style::default().fg(Color::Cyan),
        ));
    }

    if let Some(ref message) = app.status_message {
        spans.push(Span::styled(
            format!(" {} ", message),
            Style::default().fg(Color::Yellow).bg(Color::DarkGray),
        ));
    }

    let content_len: usize = spans.iter().map(|s| s.content.chars().count()).sum();
    let help_text = " r:record e:export ?:help q:quit ";
    let help_len = help_text.len();

    let available = area.width as usize;
    if available > content_len + help_len {
        let spacing = " ".repeat(available - content_len - help_len);
        spans.push(Span::raw(spacing));
    }

    spans.push(Span::styled(
        help_text,
        Style::default().fg(Color::White).bg(Color::DarkGray),
    ));

    let paragraph = Paragraph::new(Line::from(spans));
    frame.render_widget(paragraph, area);
}
