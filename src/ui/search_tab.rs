use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use scanlog::db::Detection;

use super::capture_tab::detection_item;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Value,
    Day,
}

/// State for the search form and its results
pub struct SearchForm {
    /// Barcode substring input
    pub value: String,
    /// Day input, YYYY-MM-DD
    pub day: String,
    pub field: SearchField,
    /// Keystrokes go to the form instead of the key bindings
    pub editing: bool,
    pub results: Vec<Detection>,
    pub selected_index: usize,
    pub status: Option<String>,
}

impl SearchForm {
    pub fn new() -> Self {
        Self {
            value: String::new(),
            day: String::new(),
            field: SearchField::Value,
            editing: false,
            results: Vec::new(),
            selected_index: 0,
            status: None,
        }
    }

    fn active_input(&mut self) -> &mut String {
        match self.field {
            SearchField::Value => &mut self.value,
            SearchField::Day => &mut self.day,
        }
    }

    pub fn handle_char(&mut self, c: char) {
        self.active_input().push(c);
    }

    pub fn backspace(&mut self) {
        self.active_input().pop();
    }

    pub fn toggle_field(&mut self) {
        self.field = match self.field {
            SearchField::Value => SearchField::Day,
            SearchField::Day => SearchField::Value,
        };
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.day.clear();
        self.field = SearchField::Value;
        self.results.clear();
        self.selected_index = 0;
        self.status = None;
    }

    pub fn set_results(&mut self, results: Vec<Detection>) {
        self.results = results;
        self.selected_index = 0;
        if self.results.is_empty() {
            self.status = Some("No results found".to_string());
        } else {
            self.status = Some(format!("Found {} results", self.results.len()));
        }
    }

    pub fn selected_result(&self) -> Option<&Detection> {
        self.results.get(self.selected_index)
    }
}

impl Default for SearchForm {
    fn default() -> Self {
        Self::new()
    }
}

pub fn render(frame: &mut Frame, form: &SearchForm, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Inputs
            Constraint::Min(3),    // Results list
            Constraint::Length(1), // Status
        ])
        .split(area);

    let inputs = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[0]);

    render_input(
        frame,
        " Barcode contains ",
        &form.value,
        form.editing && form.field == SearchField::Value,
        inputs[0],
    );
    render_input(
        frame,
        " Day (YYYY-MM-DD) ",
        &form.day,
        form.editing && form.field == SearchField::Day,
        inputs[1],
    );

    let items: Vec<ListItem> = form.results.iter().map(detection_item).collect();
    let results_title = if form.results.is_empty() {
        " Results ".to_string()
    } else {
        format!(" Results ({}) ", form.results.len())
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(results_title)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Cyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    if !form.results.is_empty() {
        state.select(Some(form.selected_index));
    }
    frame.render_stateful_widget(list, chunks[1], &mut state);

    let status_text = match form.status.as_deref() {
        Some(status) => status,
        None if form.editing => "Enter: search | Tab: next field | Esc: stop editing",
        None => "/: edit | c: clear | ↑↓: select | o: open video",
    };
    let status = Paragraph::new(status_text).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(status, chunks[2]);
}

fn render_input(frame: &mut Frame, title: &str, text: &str, focused: bool, area: Rect) {
    let (content, color) = if focused {
        (format!("{}|", text), Color::Yellow)
    } else {
        (text.to_string(), Color::DarkGray)
    };
    let input = Paragraph::new(content)
        .style(Style::default().fg(color))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_string())
                .border_style(Style::default().fg(color)),
        );
    frame.render_widget(input, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typing_goes_to_active_field() {
        let mut form = SearchForm::new();
        for c in "ABC".chars() {
            form.handle_char(c);
        }
        form.toggle_field();
        for c in "2024-03-0".chars() {
            form.handle_char(c);
        }
        form.backspace();

        assert_eq!(form.value, "ABC");
        assert_eq!(form.day, "2024-03-");
        assert_eq!(form.field, SearchField::Day);
    }

    #[test]
    fn test_empty_results_report_status() {
        let mut form = SearchForm::new();
        form.selected_index = 4;
        form.set_results(Vec::new());

        assert_eq!(form.selected_index, 0);
        assert_eq!(form.status.as_deref(), Some("No results found"));
        assert!(form.selected_result().is_none());

        form.clear();
        assert!(form.status.is_none());
    }
}
