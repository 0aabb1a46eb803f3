use crate::coordinator::Phase;
use crate::tui::app::{App, Mode};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use serde_json::Value;

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Query input
            Constraint::Min(5),    // Results / details
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    draw_query_input(f, app, chunks[0]);

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);
    draw_results_list(f, app, main[0]);
    draw_details(f, app, main[1]);

    draw_status_bar(f, app, chunks[2]);

    if app.mode == Mode::Help {
        draw_help(f, f.area());
    }
}

fn draw_query_input(f: &mut Frame, app: &App, area: Rect) {
    let marker = match app.phase() {
        Phase::Idle => "",
        Phase::Debouncing => " [typing]",
        Phase::Querying | Phase::QueryingStale => " [searching]",
    };
    let input = Paragraph::new(app.query.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Search{} (F1: help, F5: reload, Esc: quit) ", marker)),
        );

    f.render_widget(input, area);

    if app.mode == Mode::Search {
        let width = app.query.chars().count() as u16;
        f.set_cursor_position((area.x + width + 1, area.y + 1));
    }
}

fn draw_results_list(f: &mut Frame, app: &App, area: Rect) {
    let matcher = app.matcher();
    let items: Vec<ListItem> = app
        .results
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let style = if i == app.selected {
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            let spans = match matcher.match_range(&record.name, &app.results_term) {
                Some(span) => highlight_match(&record.name, span.start, span.end),
                None => vec![Span::raw(record.name.as_str())],
            };
            ListItem::new(Line::from(spans)).style(style)
        })
        .collect();

    let title = if app.is_busy() && app.results.is_empty() {
        " Results (...) ".to_string()
    } else {
        format!(" Results ({}) ", app.results.len())
    };
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));

    f.render_widget(list, area);
}

fn draw_details(f: &mut Frame, app: &App, area: Rect) {
    let content = match app.selected_record() {
        Some(record) => {
            let mut lines = vec![Line::from(Span::styled(
                record.name.as_str(),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ))];
            for (key, value) in &record.fields {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                lines.push(Line::from(vec![
                    Span::styled(format!("{}: ", key), Style::default().fg(Color::Blue)),
                    Span::raw(value),
                ]));
            }
            Text::from(lines)
        }
        None => match &app.failure {
            Some(message) => Text::styled(message.as_str(), Style::default().fg(Color::Red)),
            None => Text::raw("No selection"),
        },
    };

    let details = Paragraph::new(content)
        .block(Block::default().borders(Borders::ALL).title(" Details "))
        .wrap(Wrap { trim: false });

    f.render_widget(details, area);
}

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let status =
        Paragraph::new(app.status_message.as_str()).style(Style::default().fg(Color::Cyan));

    f.render_widget(status, area);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let lines = [
        "Type to search; results follow 250ms after the last key",
        "",
        "Up/Down, Tab        move selection",
        "PageUp/PageDown     move by 10",
        "Home/End            first/last result",
        "Ctrl+W              delete word",
        "Ctrl+U              clear query",
        "F5                  reload record file",
        "Esc                 clear query, or quit when empty",
        "Ctrl+C              quit",
    ];
    let width = 60.min(area.width);
    let height = (lines.len() as u16 + 2).min(area.height);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };

    let help = Paragraph::new(Text::from(lines.map(Line::from).to_vec()))
        .block(Block::default().borders(Borders::ALL).title(" Help "));
    f.render_widget(Clear, popup);
    f.render_widget(help, popup);
}

/// Highlight the matched span of a name
fn highlight_match(text: &str, start: usize, end: usize) -> Vec<Span<'_>> {
    let mut spans = Vec::new();

    if start > 0 {
        spans.push(Span::raw(&text[..start]));
    }

    spans.push(Span::styled(
        &text[start..end],
        Style::default()
            .fg(Color::Black)
            .bg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    ));

    if end < text.len() {
        spans.push(Span::raw(&text[end..]));
    }

    spans
}
