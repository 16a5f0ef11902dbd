use crate::logs::{access_line_status, error_line_level, LogLevel};
use crate::tui::app::{App, LogSource};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let visible = area.height.saturating_sub(2) as usize;
    let total = app.log_lines.len();

    // Scroll offset counts lines back from the end; 0 = pinned to tail.
    let end = total.saturating_sub(app.log_scroll);
    let start = end.saturating_sub(visible);

    let lines: Vec<Line> = app
        .log_lines
        .iter()
        .skip(start)
        .take(end - start)
        .map(|line| style_line(app.log_source, line))
        .collect();

    let follow = if app.following { " · following" } else { "" };
    let position = if app.log_scroll > 0 {
        format!(" · {} lines back", app.log_scroll)
    } else {
        String::new()
    };
    let title = format!(" {}{}{} ", app.log_source.label(), follow, position);

    let block = Block::default().borders(Borders::ALL).title(title);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn style_line(source: LogSource, line: &str) -> Line<'static> {
    let style = match source {
        LogSource::NginxAccess => match access_line_status(line) {
            Some(status) if status >= 500 => Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
            Some(status) if status >= 400 => Style::default().fg(Color::Yellow),
            Some(status) if status >= 300 => Style::default().fg(Color::Cyan),
            Some(_) => Style::default(),
            None => Style::default().fg(Color::DarkGray),
        },
        LogSource::NginxError => match error_line_level(line) {
            Some(LogLevel::Error) => Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
            Some(LogLevel::Warn) => Style::default().fg(Color::Yellow),
            Some(LogLevel::Notice) => Style::default().fg(Color::Cyan),
            Some(LogLevel::Info) => Style::default().fg(Color::Blue),
            _ => Style::default().fg(Color::DarkGray),
        },
    };
    Line::from(Span::styled(line.to_string(), style))
}
