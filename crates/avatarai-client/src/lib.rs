pub mod app;
pub mod components;
pub mod config;
pub mod console;
pub mod error;
pub mod events;
pub mod media;
pub mod state;

use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::App;
use crate::config::ClientConfig;
use crate::events::EventSink;

pub use crate::app::AppCommand;
pub use crate::error::{ClientError, Result};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("avatarai_client=debug,avatarai_net=debug,avatarai_store=info,warn")
    });

    // stdout belongs to the console front end.
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Run the console client until stdin closes, `/quit` or Ctrl-C.
pub async fn run() -> anyhow::Result<()> {
    init_tracing();
    info!("Starting AvatarAI client v{}", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();
    info!(?config, "Loaded configuration");

    let (events, ui_rx) = EventSink::channel();
    let (app, inbox) = App::new(&config, events)?;

    tokio::spawn(console::print_events(ui_rx));
    println!("{}", console::HELP);

    if let Err(e) = app.start().await {
        error!(error = %e, "Failed to restore session");
    }
    tokio::spawn(console::read_commands(app.commands()));

    app.run(inbox).await?;
    info!("AvatarAI client stopped");
    Ok(())
}
