use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{error, info};
use cinerec_core::{logging, Config};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    // Stdout belongs to the terminal UI, so logs go to a file
    let log_path = logging::default_log_path()?;
    logging::init(&log_path, &config.log_filter())?;
    info!(api_url = %config.api_url(), "starting");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, &config).await;

    tui::restore()?;
    if let Err(e) = &result {
        error!(error = %e, "exited with error");
    }
    result
}

async fn run(terminal: &mut Tui, config: &Config) -> Result<()> {
    let (replies_tx, mut replies_rx) = mpsc::unbounded_channel();
    let mut app = App::new(config, replies_tx)?;
    let mut events = EventHandler::new();

    app.start();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        tokio::select! {
            Some(event) = events.next() => handler::handle_event(&mut app, event),
            Some(reply) = replies_rx.recv() => app.handle_reply(reply),
            else => break,
        }
    }

    info!("quitting");
    Ok(())
}
