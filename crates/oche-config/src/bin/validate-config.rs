//! Config validation CLI tool
//!
//! Validates an oched configuration file and reports any errors.

use oche_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates an oched configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            eprintln!("  validate-config config.example.toml");
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match oche_config::load_config(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", oche_config::CURRENT_CONFIG_VERSION);
            println!(
                "  Default cost per attendee: {}",
                config.training.default_cost_per_attendee
            );
            println!("  Match generation: {:?}", config.training.match_generation);
            println!("  Players: {}", config.players.len());
            println!("  Game modes: {}", config.game_modes.len());

            if !config.players.is_empty() {
                println!();
                println!("Players:");
                for player in &config.players {
                    match &player.nickname {
                        Some(nick) => println!("  - {} \"{}\" <{}>", player.name, nick, player.email),
                        None => println!("  - {} <{}>", player.name, player.email),
                    }
                }
            }

            println!();
            println!("Game modes:");
            for mode in &config.game_modes {
                let state = if mode.is_active { "active" } else { "inactive" };
                println!("  - {} [{}]", mode.name, state);
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                oche_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                oche_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                oche_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                oche_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        oche_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
