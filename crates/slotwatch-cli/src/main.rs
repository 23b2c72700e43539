//! `slotwatch` binary.

use std::{error::Error, io};

use clap::Parser;
use slotwatch_app::{Runtime, RuntimeHandle, SystemEnv};
use slotwatch_cli::{
    Args, Command, ConsoleView, Settings, commands, commands::HELP, logging,
};
use slotwatch_client::{HttpMonitorApi, WsTransport};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    logging::init();

    let settings = Settings::load(&args)?;
    info!(
        api = %settings.endpoints.api_base(),
        push = %settings.endpoints.push(),
        "starting"
    );

    let transport = WsTransport::new(settings.endpoints.push().clone());
    let api = HttpMonitorApi::new(settings.endpoints.clone(), settings.request_timeout)?;
    let (runtime, handle) = Runtime::new(SystemEnv, settings.client, transport, api)?;
    let runtime = tokio::spawn(runtime.run());

    let mut console = ConsoleView::new(io::stdout());
    console.line("type /help for commands")?;
    handle.start()?;

    let mut views = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                console.render(&view)?;
            },
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if dispatch(commands::parse(&line), &handle, &mut console)? == Flow::Quit {
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            },
        }
    }

    if handle.stop().is_err() {
        warn!("runtime already stopped");
    }
    runtime.await?;
    console.render(&handle.view())?;
    Ok(())
}

fn dispatch(
    command: Command,
    handle: &RuntimeHandle,
    console: &mut ConsoleView<io::Stdout>,
) -> Result<Flow, Box<dyn Error>> {
    match command {
        Command::Empty => {},
        Command::Control(request) => handle.control(request)?,
        Command::Reconnect => handle.restart()?,
        Command::Clear => handle.clear_log()?,
        Command::Dismiss => handle.dismiss_error()?,
        Command::Status => console.status(&handle.view())?,
        Command::Help => console.line(HELP)?,
        Command::Quit => return Ok(Flow::Quit),
        Command::Unknown { input } => console.line(&format!("unknown command: {input}"))?,
        Command::InvalidArgs { error, .. } => console.line(&error)?,
    }
    Ok(Flow::Continue)
}
