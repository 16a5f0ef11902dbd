use crate::ssl::CertUrgency;
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
        .sites
        .iter()
        .enumerate()
        .map(|(idx, site)| {
            let enabled = if site.enabled {
                Span::styled("● enabled", Style::default().fg(Color::Green))
            } else {
                Span::styled("○ disabled", Style::default().fg(Color::DarkGray))
            };
            let ssl = match (site.cert.present, site.cert.urgency()) {
                (false, _) => Span::styled("none", Style::default().fg(Color::DarkGray)),
                (true, CertUrgency::Critical) => Span::styled(
                    format!("{}d!", site.cert.days_remaining.unwrap_or(0)),
                    Style::default().fg(Color::Red),
                ),
                (true, CertUrgency::Warning) => Span::styled(
                    format!("{}d", site.cert.days_remaining.unwrap_or(0)),
                    Style::default().fg(Color::Yellow),
                ),
                (true, _) => Span::styled("OK", Style::default().fg(Color::Green)),
            };
            let managed = if site.managed { "" } else { " (unmanaged)" };
            let row = Row::new(vec![
                ratatui::text::Text::from(format!("{}{}", site.domain, managed)),
                ratatui::text::Text::from(Line::from(enabled)),
                ratatui::text::Text::from(Line::from(ssl)),
                ratatui::text::Text::from(site.kind.label()),
                ratatui::text::Text::from(site.target.clone()),
            ]);
            if idx == app.site_index {
                row.style(Style::default().add_modifier(Modifier::REVERSED))
            } else {
                row
            }
        })
        .collect();

    let with_ssl = app.sites.iter().filter(|s| s.cert.present).count();
    let enabled = app.sites.iter().filter(|s| s.enabled).count();
    let title = format!(
        " Nginx Sites — {} total, {} enabled, {} with SSL ",
        app.sites.len(),
        enabled,
        with_ssl
    );

    let table = Table::new(
        rows,
        [
            Constraint::Min(24),
            Constraint::Length(11),
            Constraint::Length(6),
            Constraint::Length(9),
            Constraint::Min(20),
        ],
    )
    .header(
        Row::new(vec!["Site", "Status", "SSL", "Type", "Port/Root"]).style(
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        ),
    )
    .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(table, area);
}
