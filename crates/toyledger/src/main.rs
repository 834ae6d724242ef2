//! `toyledger` - CLI for the toy ledger
//!
//! This binary serves the records API and offers a few read-only commands for
//! inspecting profiles, records, and configuration.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use clap::Parser;

use toyledger::cli::{Cli, Command, ConfigCommand, OutputFormat, RecordsCommand, ServeCommand};
use toyledger::{group_by_month, init_logging, open_store, server, users, Config};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Execute the command
    match cli.command {
        Command::Serve(serve_cmd) => handle_serve(config, serve_cmd),
        Command::Users => {
            handle_users();
            Ok(())
        }
        Command::Records(records_cmd) => handle_records(&config, &records_cmd),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

fn handle_serve(mut config: Config, cmd: ServeCommand) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(host) = cmd.host {
        config.server.host = host;
    }
    if let Some(port) = cmd.port {
        config.server.port = port;
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server::serve(&config))?;
    Ok(())
}

fn handle_users() {
    let default_id = users::default_user().id;
    for user in users::USERS {
        let marker = if user.id == default_id { "*" } else { " " };
        println!("{marker} {:<10} {}", user.id, user.name);
    }
}

fn handle_records(config: &Config, cmd: &RecordsCommand) -> Result<(), Box<dyn std::error::Error>> {
    users::require(&cmd.user)?;
    let store = open_store(config)?;
    let groups = group_by_month(store.list(&cmd.user)?);

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&groups)?),
        OutputFormat::Plain => {
            if groups.is_empty() {
                println!("No records for {}.", cmd.user);
            }
            for group in &groups {
                println!("{} ({})", group.label, group.records.len());
                for record in &group.records {
                    let name = record.name.as_deref().unwrap_or("-");
                    let amount = record
                        .amount
                        .map_or_else(|| "-".to_string(), |a| format!("{a:.2}"));
                    let photo = if record.photo.src().starts_with("data:") {
                        "(inline)"
                    } else {
                        record.photo.src()
                    };
                    println!("  {}  {name:<16} {amount:>9}  {photo}", record.date);
                }
            }
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Listen address:     {}:{}", config.server.host, config.server.port);
                println!("  Max upload bytes:   {}", config.server.max_upload_bytes);
                println!("  Max photos:         {}", config.server.max_photos_per_upload);
                println!();
                println!("[Storage]");
                println!("  Backend:            {}", config.storage.backend);
                println!("  Database path:      {}", config.database_path().display());
                println!("  Upload directory:   {}", config.upload_dir().display());
                println!("  Snapshot path:      {}", config.snapshot_path().display());
                println!("  Snapshot quota:     {}", config.storage.snapshot_quota_bytes);
                println!();
                println!("[Ingest]");
                println!("  Mode:               {:?}", config.ingest.mode);
                println!("  Downscale:          {}", config.downscale_enabled());
                println!("  Max width:          {}", config.ingest.max_width);
                println!("  JPEG quality:       {}", config.ingest.jpeg_quality);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
