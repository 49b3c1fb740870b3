use clap::Parser;
use dotenv::dotenv;
use mcstatusd::{apply_favicon, setup_tracing, AppResult, ServerConfig, StatusServer};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(version)]
pub struct CommandLine {
    /// path to config file
    #[arg(short, long)]
    pub conf: Option<String>,
    #[command(subcommand)]
    pub command: Option<Command>,
    /// log level when RUST_LOG is unset (none: info, v: debug, vv: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Parser)]
pub enum Command {
    /// print the effective configuration as json and exit
    PrintConfig,
}

fn main() -> AppResult<()> {
    dotenv().ok();

    //setup config
    let commandline: CommandLine = CommandLine::parse();
    // an explicitly given config file has to exist, the default one may be missing
    let (config_path, required) = match commandline.conf.as_ref() {
        Some(path) => (PathBuf::from(path), true),
        None => (PathBuf::from("./conf.toml"), false),
    };
    let mut server_config = ServerConfig::set_up_config(config_path, required)?;

    if let Some(Command::PrintConfig) = commandline.command {
        println!("{}", serde_json::to_string_pretty(&server_config)?);
        return Ok(());
    }

    let _log_guard = setup_tracing(commandline.verbose, &server_config.log)?;

    if let Err(err) = apply_favicon(&mut server_config.motd) {
        error!(
            "There was an error while loading the favicon {}: {}",
            server_config.motd.favicon_path, err
        );
        return Err(err);
    }

    info!(
        "starting {} {} on {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        server_config.network.listen_address()
    );
    let server = StatusServer::new(server_config);
    server.start()?;

    Ok(())
}
