use crate::tui::app::{App, MessageLevel, View, MENU_ITEMS};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

pub mod dashboard;
pub mod logs;
pub mod services;
pub mod sites;

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header + breadcrumb
            Constraint::Min(8),    // View content
            Constraint::Length(1), // Status / key hints
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);

    match app.view {
        View::Menu => draw_menu(f, app, chunks[1]),
        View::Status => dashboard::draw_status(f, app, chunks[1]),
        View::Monitor => dashboard::draw_monitor(f, app, chunks[1]),
        View::Services => services::draw(f, app, chunks[1]),
        View::Sites => sites::draw(f, app, chunks[1]),
        View::Logs => logs::draw(f, app, chunks[1]),
    }

    draw_status_bar(f, app, chunks[2]);
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let breadcrumb = if app.view == View::Menu {
        "Main".to_string()
    } else {
        format!("Main › {}", app.view.title())
    };
    let text = Line::from(vec![
        Span::styled(
            "forge ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("  "),
        Span::styled(breadcrumb, Style::default().fg(Color::White)),
    ]);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    f.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_menu(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = MENU_ITEMS
        .iter()
        .enumerate()
        .map(|(idx, (_, label, description))| {
            let selected = idx == app.menu_index;
            let pointer = if selected { "▶ " } else { "  " };
            let style = if selected {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{}{}. {:<16}", pointer, idx + 1, label), style),
                Span::styled(*description, Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" What would you like to do? ");
    f.render_widget(List::new(items).block(block), area);
}

fn draw_status_bar(f: &mut Frame, app: &App, area: Rect) {
    // A pending confirmation takes priority, then transient messages,
    // then the per-view key hints.
    let line = if let Some(ref pending) = app.pending {
        Line::from(Span::styled(
            pending.prompt.clone(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ))
    } else if let Some(ref message) = app.status_message {
        let color = match message.level {
            MessageLevel::Info => Color::Cyan,
            MessageLevel::Success => Color::Green,
            MessageLevel::Error => Color::Red,
        };
        Line::from(Span::styled(
            message.text.clone(),
            Style::default().fg(color),
        ))
    } else {
        let hints = match app.view {
            View::Menu => "↑↓ select · Enter open · 1-5 jump · q quit",
            View::Status => "r refresh · q back",
            View::Monitor => "r refresh · q back",
            View::Services => {
                "↑↓ select · s start · x stop · r restart · l reload · e/d boot · q back"
            }
            View::Sites => "↑↓ select · t toggle · r refresh · q back",
            View::Logs => "a access · e errors · f follow · ↑↓ scroll · q back",
        };
        Line::from(Span::styled(hints, Style::default().fg(Color::DarkGray)))
    };
    f.render_widget(Paragraph::new(line), area);
}
