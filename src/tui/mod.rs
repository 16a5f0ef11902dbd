//! Interactive menu-driven terminal UI.

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;

pub mod app;
pub mod events;
pub mod ui;

use app::App;
use events::EventHandler;

/// Run the TUI until the user quits.
pub async fn run(config: crate::Config) -> anyhow::Result<()> {
    // Install a panic hook that restores the terminal BEFORE the default
    // hook prints, so the panic message lands on a usable screen.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        let _ = execute!(io::stdout(), crossterm::cursor::Show);
        original_hook(panic_info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config);
    let events = EventHandler::new(250);

    let result = run_app(&mut terminal, &mut app, events).await;

    // Always restore the terminal, even when the loop errored
    let cleanup_result = restore_terminal(&mut terminal);

    match (result, cleanup_result) {
        (Ok(()), Ok(())) => Ok(()),
        (Err(e), _) => Err(e),
        (Ok(()), Err(e)) => Err(e.into()),
    }
}

fn restore_terminal<B: ratatui::backend::Backend + std::io::Write>(
    terminal: &mut Terminal<B>,
) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        crossterm::cursor::Show
    )?;
    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    mut events: EventHandler,
) -> anyhow::Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if let Some(event) = events.next().await {
            match event {
                events::Event::Tick => app.on_tick().await?,
                events::Event::Key(key) => {
                    if !app.handle_key(key).await? {
                        break;
                    }
                }
                events::Event::Resize(_, _) => {}
                events::Event::Shutdown => break,
            }
        }
    }

    events.shutdown();
    Ok(())
}
