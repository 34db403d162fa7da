pub mod capture_tab;
mod dialogs;
mod report_tab;
pub mod search_tab;
mod status_bar;

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Tabs},
};

use crate::app::{App, Tab};

pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    // Tabs header, content area, status bar
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    let titles: Vec<Line> = Tab::ALL.iter().map(|t| Line::from(t.title())).collect();
    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(" scanlog "),
        )
        .select(app.tab.index())
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, main_chunks[0]);

    match app.tab {
        Tab::Capture => capture_tab::render(frame, app, main_chunks[1]),
        Tab::Search => search_tab::render(frame, &app.search, main_chunks[1]),
        Tab::Reports => report_tab::render(frame, app, main_chunks[1]),
    }

    status_bar::render(frame, app, main_chunks[2]);

    if app.show_help {
        dialogs::render_help(frame, area);
    }
}
