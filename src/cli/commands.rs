//! Subcommand handlers for run, profiles and config actions.

use std::path::Path;

use imagen_batch::config::{
    default_path as get_config_path, ClientConfig, FileConfig, Overrides, DEFAULT_CONFIG_TEMPLATE,
};
use imagen_batch::imagen::{self, ImagenClient, ImagenError, ProfileSelector, RunRequest};

use super::args::{ConfigAction, RunArgs};

fn runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Runtime::new().map_err(|e| format!("Failed to create async runtime: {}", e))
}

fn load_client_config(
    config_path: Option<&Path>,
    overrides: Overrides,
) -> Result<ClientConfig, ImagenError> {
    let file = FileConfig::load_optional(config_path)?;
    ClientConfig::resolve(&file, overrides)
}

/// Run a full batch edit.
pub fn run_batch(args: RunArgs) -> Result<(), String> {
    let config = load_client_config(args.config.as_deref(), args.overrides())
        .map_err(|e| e.to_string())?;
    let profile = ProfileSelector::from_parts(args.profile_key.clone(), args.profile_name.clone())
        .map_err(|e| e.to_string())?;

    let request = RunRequest {
        input_dir: args.input_dir.clone(),
        output_dir: args.output_dir.clone(),
        profile,
        options: args.edit_options(),
        export: args.export,
    };

    let report = runtime()?
        .block_on(imagen::run(config, &request))
        .map_err(|e| e.to_string())?;

    println!();
    println!("Project {} done.", report.job_id);
    println!("  Uploaded:   {} files", report.uploaded.len());
    println!(
        "  Downloaded: {} {} files to {}",
        report.downloaded.len(),
        report.artifacts,
        request.output_dir.display()
    );
    Ok(())
}

/// Print the profiles visible to the API key.
pub fn list_profiles(api_key: Option<String>, config_path: Option<&Path>) -> Result<(), String> {
    let overrides = Overrides {
        api_key,
        ..Default::default()
    };
    let config = load_client_config(config_path, overrides).map_err(|e| e.to_string())?;

    let profiles = runtime()?.block_on(async {
        let client = ImagenClient::new(config)?;
        client.list_profiles().await
    });
    let profiles = profiles.map_err(|e| e.to_string())?;

    if profiles.is_empty() {
        println!("No profiles found for this API key.");
        return Ok(());
    }

    println!("Available profiles:");
    for profile in profiles {
        println!("  {:<32} {}", profile.profile_name, profile.profile_key);
    }
    println!();
    println!("Use --profile-name <name> or --profile-key <key> with `imagen-batch run`.");
    Ok(())
}

/// Handle config subcommand actions.
pub fn handle_config_action(action: ConfigAction) -> Result<(), String> {
    match action {
        ConfigAction::Show { config } => {
            let path = config.clone().unwrap_or_else(get_config_path);
            let file = FileConfig::load_optional(config.as_deref()).map_err(|e| e.to_string())?;

            // Show the effective values even when no key is configured yet.
            let effective = match ClientConfig::resolve(&file, Overrides::default()) {
                Ok(c) => c,
                Err(_) => ClientConfig::resolve(
                    &file,
                    Overrides {
                        api_key: Some("<unset>".to_string()),
                        ..Default::default()
                    },
                )
                .map_err(|e| e.to_string())?,
            };

            println!("Current configuration:");
            println!("  Base URL:          {}", effective.base_url);
            println!("  API key:           {}", mask_key(&effective.api_key));
            println!("  Workers:           {}", effective.workers);
            println!("  Transfer attempts: {}", effective.transfer_attempts);
            println!("  Status attempts:   {}", effective.status_attempts);
            println!("  Poll interval:     {:?}", effective.poll_interval);
            match effective.poll_deadline {
                Some(deadline) => println!("  Poll deadline:     {:?}", deadline),
                None => println!("  Poll deadline:     none"),
            }
            println!();

            if path.exists() {
                println!("Config file: {} (exists)", path.display());
            } else {
                println!("Config file: {} (not found)", path.display());
            }
            Ok(())
        }
        ConfigAction::Init => {
            let config_path = get_config_path();

            if config_path.exists() {
                return Err(format!(
                    "Config file already exists: {}\nUse 'imagen-batch config show' to view current settings.",
                    config_path.display()
                ));
            }

            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Error creating config directory: {}", e))?;
            }

            std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)
                .map_err(|e| format!("Error writing config file: {}", e))?;

            println!("Created config file: {}", config_path.display());
            Ok(())
        }
    }
}

/// Keep only the last four characters of a key visible.
fn mask_key(key: &str) -> String {
    if key.starts_with('<') {
        return key.to_string();
    }
    let visible: String = key
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("****{}", visible)
}
