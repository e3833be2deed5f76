use clap::{Arg, Command};
use log::LevelFilter;
use sightline::{SightlineClient, SightlineConfig};
use std::process;

#[tokio::main]
async fn main() {
    let matches = Command::new("sightline")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Client-side fraud and bot risk assessment")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/etc/sightline.yaml"),
        )
        .arg(
            Arg::new("token")
                .short('t')
                .long("token")
                .value_name("TOKEN")
                .help("Site token (overrides the config file)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("context")
                .long("context")
                .value_name("DATA")
                .help("Context data forwarded with the assessment")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("decrypt")
                .long("decrypt")
                .value_name("VERDICT")
                .help("Decrypt a previously obtained opaque verdict instead of assessing")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Test configuration validity")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    // Initialize logger based on verbose flag
    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config_path = matches.get_one::<String>("config").unwrap();
    let mut config = load_config(config_path);

    if let Some(token) = matches.get_one::<String>("token") {
        config.token = token.clone();
    }
    if let Some(context) = matches.get_one::<String>("context") {
        config.context = Some(context.clone());
    }

    if matches.get_flag("test-config") {
        match config.validate() {
            Ok(()) => println!("✅ Configuration is valid"),
            Err(e) => {
                println!("❌ Configuration validation failed: {e}");
                process::exit(1);
            }
        }
        return;
    }

    let client = match SightlineClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error initializing client: {e}");
            process::exit(1);
        }
    };

    if let Some(verdict) = matches.get_one::<String>("decrypt") {
        match client.decrypt_assessment(verdict).await {
            Ok(assessment) => match serde_json::to_string_pretty(&assessment) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error rendering assessment: {e}");
                    process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Error decrypting assessment: {e}");
                process::exit(1);
            }
        }
        return;
    }

    let response = client.assess().await;
    println!("status: {}", response.status);
    match response.data {
        Some(verdict) => println!("verdict: {verdict}"),
        None => process::exit(1),
    }
}

fn load_config(path: &str) -> SightlineConfig {
    if !std::path::Path::new(path).exists() {
        log::debug!("config file {path} not found, using defaults");
        return SightlineConfig::default();
    }
    match SightlineConfig::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(1);
        }
    }
}

fn generate_default_config(path: &str) {
    let config = SightlineConfig::default();
    match config.to_file(path) {
        Ok(()) => {
            println!("Default configuration written to {path}");
            println!("Set the site token before running an assessment.");
        }
        Err(e) => {
            eprintln!("Error writing configuration: {e}");
            process::exit(1);
        }
    }
}
