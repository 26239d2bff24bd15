use std::path::Path;

use clap::Parser;
use trafficlink::{
    app::App,
    cli::{Cli, Command},
    config::Config,
    serial::available_ports,
    Result,
};

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    match Cli::parse().into_command() {
        Command::Run(opts) => App::from_options(opts)?.run(),
        Command::Ports => list_ports(),
        Command::Config { config } => show_config(config.as_deref()),
    }
}

fn list_ports() -> Result<()> {
    let ports = available_ports()?;
    if ports.is_empty() {
        println!("no serial ports found");
    }
    for port in ports {
        println!("{port}");
    }
    Ok(())
}

fn show_config(path: Option<&Path>) -> Result<()> {
    let (path, config) = match path {
        Some(path) => {
            let config = Config::load_from_path(path)?;
            if !path.exists() {
                config.save_to_path(path)?;
            }
            (path.to_path_buf(), config)
        }
        None => (Config::default_path()?, Config::load_or_default()?),
    };
    println!("# {}", path.display());
    let body = toml::to_string_pretty(&config)
        .map_err(|e| trafficlink::Error::Config(format!("cannot serialize config: {e}")))?;
    print!("{body}");
    Ok(())
}
