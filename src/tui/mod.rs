mod app;
mod ui;

use crate::coordinator::CoordinatorOptions;
use crate::store::TextIndexStore;
use anyhow::{Context, Result};
use app::App;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Event poll timeout; also bounds how late a published batch is drawn
const TICK: Duration = Duration::from_millis(50);

pub fn run(
    source: PathBuf,
    store: Arc<TextIndexStore>,
    options: CoordinatorOptions,
    initial_term: Option<String>,
) -> Result<()> {
    // Coordinator cycles run here; the UI loop stays on this thread
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("typeahead-search")
        .enable_time()
        .build()
        .context("Failed to start search runtime")?;
    let _enter = runtime.enter();

    let mut app = App::new(source, store, options)?;
    if let Some(term) = initial_term {
        app.set_query(&term);
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Clear the terminal to prevent any artifacts from previous content
    terminal.clear()?;

    let result = run_app(&mut terminal, &mut app);
    app.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        app.poll_feed();

        terminal.draw(|f| ui::draw(f, app))?;

        if !event::poll(TICK)? {
            continue;
        }
        // Only handle key press events, not release or repeat
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if let (KeyModifiers::CONTROL, KeyCode::Char('c' | 'q')) = (key.modifiers, key.code) {
            return Ok(());
        }

        if app.mode == app::Mode::Help {
            // Any key closes help
            app.hide_help();
            continue;
        }

        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('w')) => app.delete_word(),
            (KeyModifiers::CONTROL, KeyCode::Char('u')) => app.clear_query(),
            (KeyModifiers::CONTROL, KeyCode::Char('h')) => app.backspace(),
            (KeyModifiers::CONTROL, KeyCode::Char('n' | 'j')) => app.select_next(),
            (KeyModifiers::CONTROL, KeyCode::Char('p' | 'k')) => app.select_prev(),
            (KeyModifiers::NONE | KeyModifiers::SHIFT, code) => match code {
                KeyCode::Esc => {
                    if app.query.is_empty() {
                        return Ok(());
                    }
                    app.clear_query();
                }
                KeyCode::Down | KeyCode::Tab => app.select_next(),
                KeyCode::Up | KeyCode::BackTab => app.select_prev(),
                KeyCode::PageDown => app.select_page_down(),
                KeyCode::PageUp => app.select_page_up(),
                KeyCode::Home => app.select_first(),
                KeyCode::End => app.select_last(),
                KeyCode::Backspace => app.backspace(),
                KeyCode::Char(c) => app.push_char(c),
                KeyCode::F(1) => app.show_help(),
                KeyCode::F(5) => app.reload(),
                _ => {}
            },
            _ => {}
        }
    }
}
