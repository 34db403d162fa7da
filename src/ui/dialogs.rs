use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

pub fn render_help(frame: &mut Frame, area: Rect) {
    let dialog_width = 56.min(area.width.saturating_sub(4));
    let dialog_height = 28.min(area.height.saturating_sub(4));

    let x = (area.width - dialog_width) / 2;
    let y = (area.height - dialog_height) / 2;

    let dialog_area = Rect::new(x, y, dialog_width, dialog_height);

    frame.render_widget(Clear, dialog_area);

    let heading = Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan);
    let help_text = vec![
        Line::from(Span::styled("Navigation", heading)),
        Line::from(""),
        Line::from("  Tab / 1-3  Switch tab"),
        Line::from("  j / ↓      Move down"),
        Line::from("  k / ↑      Move up"),
        Line::from(""),
        Line::from(Span::styled("Capture", heading)),
        Line::from(""),
        Line::from("  r          Start / stop recording"),
        Line::from("  o / ↵      Open the selected row's video"),
        Line::from("  R / F5     Refresh lists"),
        Line::from(""),
        Line::from(Span::styled("Search", heading)),
        Line::from(""),
        Line::from("  / or i     Edit the search form"),
        Line::from("  Tab        Switch field while editing"),
        Line::from("  ↵          Run the search"),
        Line::from("  c          Clear the form and results"),
        Line::from(""),
        Line::from(Span::styled("Reports", heading)),
        Line::from(""),
        Line::from("  e          Export the daily report as CSV"),
        Line::from("  ?          Show this help"),
        Line::from("  q          Quit"),
        Line::from(""),
        Line::from(Span::styled("Press any key to close", Style::default().fg(Color::DarkGray))),
    ];

    let paragraph = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Help ")
                .title_style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, dialog_area);
}
