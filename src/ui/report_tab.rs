use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use crate::app::App;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    let total: i64 = app.report.iter().map(|row| row.total).sum();
    let widest = app.report.iter().map(|row| row.total).max().unwrap_or(0).max(1);
    let bar_room = chunks[0].width.saturating_sub(30) as i64;

    let items: Vec<ListItem> = app
        .report
        .iter()
        .map(|row| {
            let bar_len = (row.total * bar_room / widest).max(1) as usize;
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{}  ", row.day.format("%Y-%m-%d")),
                    Style::default().fg(Color::White),
                ),
                Span::styled(format!("{:>6}  ", row.total), Style::default().fg(Color::Yellow)),
                Span::styled("█".repeat(bar_len), Style::default().fg(Color::Cyan)),
            ]))
        })
        .collect();

    let title = format!(" Daily Report ({} days, {} detections) ", app.report.len(), total);
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

    let mut state = ListState::default();
    if !app.report.is_empty() {
        state.select(Some(app.report_selected));
    }
    frame.render_stateful_widget(list, chunks[0], &mut state);

    let footer = Paragraph::new("e: export CSV | R: refresh")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[1]);
}
