//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use imagen_batch::config::Overrides;
use imagen_batch::imagen::EditOptions;

/// Batch photo editing through the Imagen API
#[derive(Parser, Debug)]
#[command(name = "imagen-batch")]
#[command(version, about = "Batch photo editing through the Imagen API", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Edit a folder with a named profile
    imagen-batch run --input-dir ./shoot --output-dir ./edited --profile-name \"Wedding\"

    # Edit, then export to JPG
    imagen-batch run --input-dir ./shoot --output-dir ./jpg --profile-key 12345 --crop --export

ENVIRONMENT:
    IMAGEN_API_KEY    API key used when --api-key is not given.
    MAX_WORKERS       Number of concurrent transfers (default 10).")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload a folder, edit it with a profile and download the results
    Run(RunArgs),
    /// List the edit profiles available to the API key
    Profiles {
        /// API key (default: $IMAGEN_API_KEY)
        #[arg(long, alias = "api_key")]
        api_key: Option<String>,

        /// Config file path
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show {
        /// Config file path
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
    /// Create the default config file
    Init,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// Folder containing the photos to edit
    #[arg(long, alias = "input_dir")]
    pub input_dir: PathBuf,

    /// Folder the edited (or exported) files are written to
    #[arg(long, alias = "output_dir")]
    pub output_dir: PathBuf,

    /// Name of the edit profile
    #[arg(long, alias = "profile_name")]
    pub profile_name: Option<String>,

    /// Key of the edit profile (skips the name lookup)
    #[arg(long, alias = "profile_key")]
    pub profile_key: Option<String>,

    /// API key (default: $IMAGEN_API_KEY)
    #[arg(long, alias = "api_key")]
    pub api_key: Option<String>,

    /// URL notified by the service when the edit finishes
    #[arg(long, alias = "callback_url")]
    pub callback_url: Option<String>,

    /// Crop
    #[arg(long)]
    pub crop: bool,

    /// Straighten
    #[arg(long)]
    pub straighten: bool,

    /// Subject mask
    #[arg(long, alias = "subject_mask")]
    pub subject_mask: bool,

    /// Merge HDR brackets
    #[arg(long, alias = "hdr_merge")]
    pub hdr_merge: bool,

    /// Smooth skin
    #[arg(long, alias = "smooth_skin")]
    pub smooth_skin: bool,

    /// Perspective correction
    #[arg(long, alias = "perspective_correction")]
    pub perspective_correction: bool,

    /// Export to JPG after editing and download the exported files
    #[arg(long)]
    pub export: bool,

    /// Concurrent transfers (default: $MAX_WORKERS or 10)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Seconds between status checks (default 30)
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Give up waiting for the project after this many seconds
    #[arg(long)]
    pub deadline: Option<u64>,

    /// Config file path
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

impl RunArgs {
    pub fn edit_options(&self) -> EditOptions {
        EditOptions {
            crop: self.crop,
            straighten: self.straighten,
            subject_mask: self.subject_mask,
            hdr_merge: self.hdr_merge,
            smooth_skin: self.smooth_skin,
            perspective_correction: self.perspective_correction,
            callback_url: self.callback_url.clone(),
            ..Default::default()
        }
    }

    pub fn overrides(&self) -> Overrides {
        Overrides {
            api_key: self.api_key.clone(),
            workers: self.workers,
            poll_interval_secs: self.poll_interval,
            deadline_secs: self.deadline,
        }
    }
}
