use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Version string; dev builds carry the git hash.
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            format!("v{}", VERSION)
        } else {
            format!("v{} (dev: {})", VERSION, GIT_HASH)
        }
    })
}

#[derive(Parser, Debug)]
#[command(
    name = "planillas",
    bin_name = "planillas",
    version = get_version(),
    disable_help_subcommand = true
)]
#[command(about = "Durable planilla records, mirrored to a remote document store", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ./planillas.toml when present)
    #[arg(long, global = true, value_name = "PATH", help_heading = "Options")]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true, help_heading = "Options")]
    pub json: bool,

    /// Verbose logging on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count, help_heading = "Options")]
    pub verbose: u8,
}

/// Where the planilla metadata comes from.
#[derive(Args, Debug, Clone, Default)]
#[group(multiple = false)]
pub struct MetaSource {
    /// Metadata as a JSON document
    #[arg(long, value_name = "JSON")]
    pub meta: Option<String>,

    /// Read the metadata JSON from a file
    #[arg(long, value_name = "PATH")]
    pub meta_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a planilla
    Create {
        #[command(flatten)]
        source: MetaSource,

        /// Image to upload and attach (repeatable)
        #[arg(long = "image", value_name = "PATH")]
        images: Vec<PathBuf>,
    },

    /// List all planillas
    #[command(alias = "ls")]
    List,

    /// Show one planilla
    Get { id: String },

    /// Mark a planilla as confirmed by the mirror
    Sync {
        id: String,

        /// Document id assigned by the mirror
        #[arg(long)]
        remote_id: Option<String>,
    },

    /// Replace a planilla's metadata; images it no longer declares are dropped
    Update {
        id: String,

        #[command(flatten)]
        source: MetaSource,

        /// Image to upload and attach (repeatable)
        #[arg(long = "image", value_name = "PATH")]
        images: Vec<PathBuf>,
    },

    /// Delete a planilla and its files
    #[command(alias = "rm")]
    Delete { id: String },

    /// Store an image for later attachment
    Upload { path: PathBuf },

    /// Remove an upload no planilla references
    RemoveUpload { filename: String },

    /// Sweep orphaned files and report broken references
    Doctor {
        /// Also delete attachments no planilla references
        #[arg(long)]
        prune_attachments: bool,

        /// Leave files younger than this many seconds alone
        #[arg(long, value_name = "N", default_value_t = 60)]
        grace_secs: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_create_with_images() {
        let cli = Cli::try_parse_from([
            "planillas",
            "create",
            "--meta",
            r#"{"title":"A"}"#,
            "--image",
            "a.png",
            "--image",
            "b.png",
        ])
        .unwrap();
        match cli.command {
            Commands::Create { source, images } => {
                assert_eq!(source.meta.as_deref(), Some(r#"{"title":"A"}"#));
                assert_eq!(images.len(), 2);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_meta_sources_are_exclusive() {
        let parsed = Cli::try_parse_from([
            "planillas",
            "create",
            "--meta",
            "{}",
            "--meta-file",
            "m.json",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["planillas", "list", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_doctor_defaults() {
        let cli = Cli::try_parse_from(["planillas", "doctor"]).unwrap();
        match cli.command {
            Commands::Doctor {
                prune_attachments,
                grace_secs,
            } => {
                assert!(!prune_attachments);
                assert_eq!(grace_secs, 60);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
