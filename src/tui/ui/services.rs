use crate::systemd::UnitState;
use crate::tui::app::App;
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Row, Table},
    Frame,
};

pub fn draw(f: &mut Frame, app: &App, area: Rect) {
    let rows: Vec<Row> = app
        .services
        .iter()
        .enumerate()
        .map(|(idx, service)| {
            let state_style = match service.state {
                UnitState::Active => Style::default().fg(Color::Green),
                UnitState::Inactive => Style::default().fg(Color::DarkGray),
                UnitState::Failed => Style::default().fg(Color::Red),
                UnitState::Unknown => Style::default().fg(Color::Yellow),
            };
            let critical = if service.critical { "*" } else { " " };
            let boot = if service.enabled { "✓" } else { "-" };
            let row = Row::new(vec![
                ratatui::text::Text::from(Line::from(vec![
                    Span::styled(service.state.icon(), state_style),
                    Span::raw(format!(" {}{}", service.label, critical)),
                ])),
                ratatui::text::Text::from(Line::from(Span::styled(
                    service.state.to_string(),
                    state_style,
                ))),
                ratatui::text::Text::from(service.substate.clone().unwrap_or_default()),
                ratatui::text::Text::from(boot),
                ratatui::text::Text::from(service.memory.clone().unwrap_or_else(|| "-".into())),
                ratatui::text::Text::from(service.uptime.clone().unwrap_or_else(|| "-".into())),
            ]);
            if idx == app.service_index {
                row.style(Style::default().add_modifier(Modifier::REVERSED))
            } else {
                row
            }
        })
        .collect();

    let running = app
        .services
        .iter()
        .filter(|s| s.state == UnitState::Active)
        .count();
    let failed = app
        .services
        .iter()
        .filter(|s| s.state == UnitState::Failed)
        .count();
    let title = format!(
        " Services — {} running, {} failed, {} total (* critical) ",
        running,
        failed,
        app.services.len()
    );

    let table = Table::new(
        rows,
        [
            Constraint::Length(22),
            Constraint::Length(9),
            Constraint::Length(10),
            Constraint::Length(5),
            Constraint::Length(10),
            Constraint::Min(8),
        ],
    )
    .header(
        Row::new(vec!["Service", "Status", "State", "Boot", "Memory", "Uptime"]).style(
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        ),
    )
    .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(table, area);
}
