use crate::tui::app::App;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Row, Table},
    Frame,
};

/// Installed-software table (the "System Status" view).
pub fn draw_status(f: &mut Frame, app: &App, area: Rect) {
    let rows: Vec<Row> = app
        .software
        .iter()
        .map(|software| {
            let (icon, icon_style) = if software.installed {
                ("●", Style::default().fg(Color::Green))
            } else {
                ("○", Style::default().fg(Color::DarkGray))
            };
            let status = if software.installed {
                "Installed"
            } else {
                "Not Found"
            };
            Row::new(vec![
                ratatui::text::Text::from(Line::from(vec![
                    Span::styled(icon, icon_style),
                    Span::raw(" "),
                    Span::raw(software.name),
                ])),
                ratatui::text::Text::from(status),
                ratatui::text::Text::from(software.version.clone().unwrap_or_else(|| "-".into())),
                ratatui::text::Text::from(software.details.clone().unwrap_or_default()),
            ])
        })
        .collect();

    let title = if app.software_loaded {
        " Server Software Status "
    } else {
        " Scanning system... "
    };
    let table = Table::new(
        rows,
        [
            Constraint::Length(16),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Min(16),
        ],
    )
    .header(
        Row::new(vec!["Software", "Status", "Version", "Details"]).style(
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        ),
    )
    .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(table, area);
}

/// Resource gauges (the "Monitor" view).
pub fn draw_monitor(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // CPU
            Constraint::Length(3), // Memory
            Constraint::Length(3), // Disk
            Constraint::Length(3), // Swap
            Constraint::Min(4),    // Load / uptime / alerts
        ])
        .split(area);

    draw_gauge(f, chunks[0], "CPU", app.cpu_percent, String::new());
    draw_gauge(
        f,
        chunks[1],
        "Memory",
        app.memory.percent,
        app.memory.summary(),
    );
    draw_gauge(
        f,
        chunks[2],
        "Disk /",
        app.disk.percent,
        format!("{}/{}", app.disk.used, app.disk.size),
    );
    draw_gauge(f, chunks[3], "Swap", app.swap.percent, app.swap.summary());

    let mut lines = Vec::new();
    if let Some(load) = app.load {
        lines.push(Line::from(format!(
            "Load:   {:.2} / {:.2} / {:.2}",
            load.one, load.five, load.fifteen
        )));
    }
    if let Some(ref uptime) = app.uptime {
        lines.push(Line::from(format!("Uptime: {}", uptime)));
    }
    let alerts_line = if app.active_alerts > 0 {
        Line::from(Span::styled(
            format!("Alerts: {} active (forge alerts show)", app.active_alerts),
            Style::default().fg(Color::Red),
        ))
    } else {
        Line::from(Span::styled(
            "Alerts: none active",
            Style::default().fg(Color::DarkGray),
        ))
    };
    lines.push(alerts_line);

    let block = Block::default().borders(Borders::ALL).title(" System ");
    f.render_widget(Paragraph::new(lines).block(block), chunks[4]);
}

fn draw_gauge(f: &mut Frame, area: Rect, label: &str, percent: f64, detail: String) {
    let color = if percent < 50.0 {
        Color::Green
    } else if percent < 80.0 {
        Color::Yellow
    } else {
        Color::Red
    };
    let title = if detail.is_empty() {
        format!(" {} ", label)
    } else {
        format!(" {} ({}) ", label, detail)
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .gauge_style(Style::default().fg(color))
        .ratio((percent / 100.0).clamp(0.0, 1.0))
        .label(format!("{:.1}%", percent));
    f.render_widget(gauge, area);
}
