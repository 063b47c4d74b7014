//! xcexport - Archive a macOS application and export it re-signed for a
//! distribution channel.

mod artifacts;
mod config;
mod run;
mod xcodebuild;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::StepConfig;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use xcexport_archive::MacosArchive;
use xcexport_common::ExportMethod;
use xcexport_inventory::{collect_inventory, profiles, LocalExecutor};
use xcexport_resolver::{resolve, Resolution, ResolvedSigningGroup};
use xcexport_signing_schema::ExportOptions;

#[derive(Parser)]
#[command(name = "xcexport")]
#[command(
    author,
    version,
    about = "Archive a macOS app with xcodebuild and export it for a distribution channel"
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full archive-and-export step
    Run {
        /// Step configuration YAML file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Path to the .xcodeproj or .xcworkspace
        #[arg(long)]
        project: Option<PathBuf>,

        /// Scheme to archive
        #[arg(long)]
        scheme: Option<String>,

        /// Build configuration (e.g. Release)
        #[arg(long)]
        configuration: Option<String>,

        /// Export method (none, app-store, development, developer-id)
        #[arg(long)]
        method: Option<String>,

        /// Output directory for produced artifacts
        #[arg(long, short)]
        out: Option<PathBuf>,

        /// Base name for produced artifacts (defaults to the scheme)
        #[arg(long)]
        artifact_name: Option<String>,

        /// Run a clean build action before archiving
        #[arg(long)]
        clean: bool,

        /// Disable index-while-building
        #[arg(long)]
        disable_index: bool,

        /// Force DEVELOPMENT_TEAM
        #[arg(long)]
        force_team_id: Option<String>,

        /// Force CODE_SIGN_IDENTITY
        #[arg(long)]
        force_code_sign_identity: Option<String>,

        /// Force PROVISIONING_PROFILE_SPECIFIER
        #[arg(long)]
        force_provisioning_profile_specifier: Option<String>,

        /// Force PROVISIONING_PROFILE
        #[arg(long)]
        force_provisioning_profile: Option<String>,

        /// Custom export-options plist file (bypasses resolution)
        #[arg(long)]
        export_options_plist: Option<PathBuf>,

        /// Also package the .xcarchive itself
        #[arg(long)]
        export_archive_zip: bool,

        /// Package framework dSYMs along with the app dSYM
        #[arg(long)]
        export_all_dsyms: bool,
    },

    /// Resolve the signing group for an existing archive without exporting
    Resolve {
        /// Path to the .xcarchive
        #[arg(long)]
        archive: PathBuf,

        /// Export method (app-store, development, developer-id, none)
        #[arg(long)]
        method: String,

        /// Provisioning profile directory override
        #[arg(long)]
        profiles_dir: Option<PathBuf>,

        /// Write the resulting export options plist here
        #[arg(long, short)]
        out: Option<PathBuf>,
    },

    /// Print the signing requirements discovered in an archive
    Inspect {
        /// Path to the .xcarchive
        #[arg(long)]
        archive: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            config,
            project,
            scheme,
            configuration,
            method,
            out,
            artifact_name,
            clean,
            disable_index,
            force_team_id,
            force_code_sign_identity,
            force_provisioning_profile_specifier,
            force_provisioning_profile,
            export_options_plist,
            export_archive_zip,
            export_all_dsyms,
        } => {
            let mut step = match config {
                Some(ref path) => StepConfig::from_yaml_file(path)?,
                None => StepConfig::default(),
            };

            if let Some(project) = project {
                step.project_path = project;
            }
            if let Some(scheme) = scheme {
                step.scheme = scheme;
            }
            if configuration.is_some() {
                step.configuration = configuration;
            }
            if let Some(method) = method {
                step.export_method = method.parse::<ExportMethod>()?;
            }
            if let Some(out) = out {
                step.output_dir = out;
            }
            if let Some(artifact_name) = artifact_name {
                step.artifact_name = artifact_name;
            }
            if clean {
                step.clean_build = true;
            }
            if disable_index {
                step.disable_index_while_building = true;
            }
            if force_team_id.is_some() {
                step.force_team_id = force_team_id;
            }
            if force_code_sign_identity.is_some() {
                step.force_code_sign_identity = force_code_sign_identity;
            }
            if force_provisioning_profile_specifier.is_some() {
                step.force_provisioning_profile_specifier = force_provisioning_profile_specifier;
            }
            if force_provisioning_profile.is_some() {
                step.force_provisioning_profile = force_provisioning_profile;
            }
            if let Some(ref path) = export_options_plist {
                step.custom_export_options_plist_content = Some(
                    std::fs::read_to_string(path)
                        .with_context(|| format!("cannot read {}", path.display()))?,
                );
            }
            if export_archive_zip {
                step.export_archive_zip = true;
            }
            if export_all_dsyms {
                step.export_all_dsyms = true;
            }

            let outputs = run::run(step).await?;
            if let Some(ref exported) = outputs.exported_path {
                info!("exported artifact: {}", exported.display());
            }
        }

        Commands::Resolve {
            archive,
            method,
            profiles_dir,
            out,
        } => {
            let method: ExportMethod = method.parse()?;
            let archive = MacosArchive::load(&archive)?;
            info!(
                "archive contains bundles: {}",
                archive.bundle_ids().join(", ")
            );

            let profiles_dir = profiles_dir
                .or_else(profiles::default_profiles_directory)
                .context("cannot determine the provisioning profile directory (HOME unset)")?;
            let executor = LocalExecutor::new();
            let inventory = collect_inventory(&executor, method, &profiles_dir).await?;

            let resolution = resolve(
                &archive.requirements,
                &inventory.certificates,
                &inventory.installer_certificates,
                &inventory.profiles,
                method,
                archive.has_embedded_profile(),
            )?;
            println!("{}", serde_json::to_string_pretty(&resolution)?);

            if let Some(out) = out {
                if let Resolution::Resolved { ref group, .. } = resolution {
                    let options = match group {
                        ResolvedSigningGroup::AppStore(resolved) => {
                            ExportOptions::app_store(resolved)
                        }
                        ResolvedSigningGroup::Standard(standard) => {
                            ExportOptions::signed(method, standard)
                        }
                    };
                    options.write_to_file(&out)?;
                    info!("export options written to {}", out.display());
                }
            }
        }

        Commands::Inspect { archive } => {
            let archive = MacosArchive::load(&archive)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&archive.requirements)?
            );
        }
    }

    Ok(())
}
