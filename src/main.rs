use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use termcolor::{ColorChoice, StandardStream};
use tokio::io::{AsyncBufReadExt, BufReader};

use fleetwatch::logging::init_logging;
use fleetwatch::render::render;
use fleetwatch::{Cli, Config, DataClient, Poller, Store};

fn redraw(stdout: &mut StandardStream, store: &Store) -> Result<()> {
    // clear screen, cursor home
    write!(stdout, "\x1b[2J\x1b[H")?;
    render(stdout, &store.snapshot()).context("Failed to draw dashboard")?;
    Ok(())
}

/// Handle one line typed by the user. Returns false to quit.
fn handle_input(line: &str, store: &Store, pending: &mut Option<String>) -> bool {
    let input = line.trim();
    match input {
        "q" | "quit" => return false,
        "" => {
            *pending = None;
            store.clear_selection();
        }
        id => {
            if store.select_by_id(id) {
                *pending = None;
            } else {
                log::info!("Device {} not in roster yet, will select when it appears", id);
                *pending = Some(id.to_string());
            }
        }
    }
    true
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_cli(Cli::parse()).context("Invalid configuration")?;
    let _logger = init_logging(&config)?;
    log::info!("Monitoring {}", config.base_url);

    let store = Store::new();
    let mut poller = Poller::new(
        DataClient::from_config(&config),
        store.clone(),
        config.poll_interval,
        config.log_limit,
    )
    .context("Invalid poller settings")?;
    poller.start();

    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let mut changes = store.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut pending = config.select.clone();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    redraw(&mut stdout, &store)?;

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(id) = pending.as_deref() {
                    if store.select_by_id(id) {
                        pending = None;
                    }
                }
                redraw(&mut stdout, &store)?;
            }
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => {
                        if !handle_input(&line, &store, &mut pending) {
                            break;
                        }
                    }
                    Ok(None) => stdin_open = false,
                    Err(e) => {
                        log::warn!("Failed to read input: {}", e);
                        stdin_open = false;
                    }
                }
            }
            _ = &mut ctrl_c => break,
        }
    }

    poller.stop();
    log::info!("Dashboard closed");
    Ok(())
}
