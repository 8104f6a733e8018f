use std::io;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use crossterm::cursor::SetCursorStyle;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;

mod app;
mod catalog;
mod dispatch;
mod error;
mod events;
mod history_store;
mod line;
mod logging;
mod protocol;
mod scroll;
mod state;
mod suggest;
mod text_layout;
mod theme;
mod transport;
mod ui;

use app::App;
use events::AppEvent;
use history_store::{ClientConfig, HistoryFile, expand_home, load_config};
use scroll::ScrollController;
use state::Store;
use theme::Theme;
use transport::WebSocketTransport;

const DEFAULT_LOG_FILE: &str = "~/.multichat/multichat.log";

#[derive(Debug, Parser)]
#[command(name = "multichat", version, about = "Terminal client for a multi-channel chat server")]
struct Cli {
    /// WebSocket endpoint; overrides `server.url` from the config file.
    #[arg(long)]
    url: Option<String>,
    /// Start with this channel active and connect right away.
    #[arg(long)]
    channel: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    log_file: Option<PathBuf>,
    #[arg(long, default_value = "theme.toml")]
    theme: PathBuf,
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).map_err(io::Error::other)?;
    let log_file = match cli.log_file.clone() {
        Some(path) => path,
        None => expand_home(DEFAULT_LOG_FILE).map_err(io::Error::other)?,
    };
    logging::init_global(&log_file).map_err(io::Error::other)?;
    let app = build_app(&cli, &config).map_err(io::Error::other)?;
    let theme = Theme::load_or_default(&cli.theme);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        SetCursorStyle::SteadyBar
    )?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    let result = run_app(&mut terminal, app, &theme, cli.channel, config.server.auto_connect);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        SetCursorStyle::DefaultUserShape,
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    if let Err(err) = &result {
        tracing::error!(%err, "terminal loop failed");
    }
    result
}

fn build_app(
    cli: &Cli,
    config: &ClientConfig,
) -> Result<App<WebSocketTransport>, error::StorageError> {
    let history = HistoryFile::from_config(&config.storage)?;
    tracing::info!(path = %history.path().display(), "using history file");
    let url = cli.url.clone().unwrap_or_else(|| config.server.url.clone());
    tracing::info!(%url, "client starting");
    Ok(App::new(
        Store::hydrate(Box::new(history)),
        ScrollController::new(&config.scroll),
        WebSocketTransport::new(url, config.transport.clone()),
        config.display.highlight_words.clone(),
    ))
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App<WebSocketTransport>,
    theme: &Theme,
    channel: Option<String>,
    auto_connect: bool,
) -> io::Result<()> {
    app.start(channel, auto_connect);

    while app.running {
        app.pump_transport();
        app.tick(Instant::now());

        let size = terminal.size()?;
        let screen = Rect::new(0, 0, size.width, size.height);
        let (scroll_height, client_height) = ui::message_viewport(screen, &app, theme);
        app.layout(scroll_height, client_height);
        terminal.draw(|frame| ui::render(frame, &app, theme))?;

        let now = Instant::now();
        match events::next_event()? {
            AppEvent::Tick => {}
            AppEvent::Quit => app.quit(),
            AppEvent::MoveUp => app.move_up(),
            AppEvent::MoveDown => app.move_down(),
            AppEvent::Complete => app.complete(),
            AppEvent::Dismiss => app.dismiss(),
            AppEvent::CursorLeft => app.move_cursor_left(),
            AppEvent::CursorRight => app.move_cursor_right(),
            AppEvent::CursorHome => app.move_cursor_home(),
            AppEvent::CursorEnd => app.move_cursor_end(),
            AppEvent::InputChar(c) => app.input_char(c),
            AppEvent::Backspace => app.backspace_input(),
            AppEvent::Delete => app.delete_input(),
            AppEvent::Submit => app.submit(),
            AppEvent::PageUp => app.page_up(now),
            AppEvent::PageDown => app.page_down(now),
            AppEvent::JumpToBottom => app.jump_to_bottom(now),
            AppEvent::MouseScrollUp => app.wheel_up(now),
            AppEvent::MouseScrollDown => app.wheel_down(now),
            AppEvent::MouseLeftClick(x, y) => {
                if let Some(index) = ui::suggestion_hit_test(screen, &app, x, y) {
                    app.commit_suggestion(index);
                } else if let Some(target) = ui::message_hit_test(screen, &app, theme, x, y) {
                    app.click_message(target);
                }
            }
        }
    }

    app.persist();
    app.transport_mut().shutdown();
    tracing::info!("client stopped");
    Ok(())
}
