use std::env;

use anyhow::Result;
use dotenv::dotenv;

use midnight_wallet_cli::interactive::App;

#[tokio::main]
async fn main() -> Result<()> {
    // Interactive only; there are no subcommands or flags.
    if env::args().count() > 1 {
        eprintln!("This program only runs in interactive mode. Please run without any arguments.");
        eprintln!("Usage: midnight-wallet");
        std::process::exit(1);
    }

    // Load .env first so RUST_LOG can live there.
    dotenv().ok();
    env_logger::init();

    let mut app = App::new();
    if let Err(err) = app.run().await {
        eprintln!("Fatal: {err:#}");
        std::process::exit(1);
    }

    Ok(())
}
