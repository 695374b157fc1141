mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    // Logging is initialized inside once the config (and its log path) is known.
    if let Err(err) = CliCommand::run_from_args().await {
        eprintln!("relocale error: {:#}", err);
        std::process::exit(1);
    }
}
