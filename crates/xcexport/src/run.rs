//! The archive-and-export step.

use crate::artifacts;
use crate::config::StepConfig;
use crate::xcodebuild::{self, ArchiveCommand, ExportCommand};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use xcexport_archive::MacosArchive;
use xcexport_common::ExportMethod;
use xcexport_inventory::{collect_inventory, profiles, LocalExecutor};
use xcexport_resolver::{resolve, Resolution, ResolvedSigningGroup};
use xcexport_signing_schema::ExportOptions;

/// Paths of every artifact the step produced, published for the host
/// pipeline as `outputs.json` in the output directory.
#[derive(Debug, Serialize)]
pub struct StepOutputs {
    pub generated_at: DateTime<Utc>,
    pub archive_path: PathBuf,
    pub archive_zip_path: Option<PathBuf>,
    pub export_options_path: Option<PathBuf>,
    pub exported_path: Option<PathBuf>,
    pub dsym_zip_path: Option<PathBuf>,
    pub raw_log_path: Option<PathBuf>,
    pub distribution_logs_zip_path: Option<PathBuf>,
    pub warnings: Vec<String>,
}

impl StepOutputs {
    fn new(archive_path: PathBuf) -> Self {
        Self {
            generated_at: Utc::now(),
            archive_path,
            archive_zip_path: None,
            export_options_path: None,
            exported_path: None,
            dsym_zip_path: None,
            raw_log_path: None,
            distribution_logs_zip_path: None,
            warnings: Vec::new(),
        }
    }
}

/// Run the full step: archive, resolve, export, package.
pub async fn run(config: StepConfig) -> Result<StepOutputs> {
    let config = config.normalized()?;
    let method = config.export_method;

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("cannot create output dir {}", config.output_dir.display()))?;
    let output_dir = config.output_dir.canonicalize()?;

    let work_dir = std::env::temp_dir().join(format!("xcexport-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&work_dir)?;

    let archive_path = work_dir.join(format!("{}.xcarchive", config.artifact_name));
    let archive_zip_path = output_dir.join(format!("{}.xcarchive.tar.gz", config.artifact_name));
    let export_options_path = output_dir.join("export_options.plist");
    let raw_log_path = output_dir.join("raw-xcodebuild-output.log");
    let dsym_zip_path = output_dir.join(format!("{}.dSYM.tar.gz", config.artifact_name));
    let distribution_logs_zip_path = output_dir.join("xcodebuild.xcdistributionlogs.tar.gz");

    for stale in [
        &archive_zip_path,
        &export_options_path,
        &raw_log_path,
        &dsym_zip_path,
        &distribution_logs_zip_path,
    ] {
        artifacts::remove_if_exists(stale)?;
    }

    info!("Creating archive ...");
    let archive_cmd = ArchiveCommand {
        project_path: config.project_path.clone(),
        is_workspace: config.is_workspace()?,
        scheme: config.scheme.clone(),
        configuration: config.configuration.clone(),
        archive_path: archive_path.clone(),
        clean_build: config.clean_build,
        disable_index_while_building: config.disable_index_while_building,
        force_team_id: config.force_team_id.clone(),
        force_code_sign_identity: config.force_code_sign_identity.clone(),
        force_provisioning_profile_specifier: config.force_provisioning_profile_specifier.clone(),
        force_provisioning_profile: config.force_provisioning_profile.clone(),
    };
    info!("$ {}", archive_cmd.printable());

    let build = archive_cmd.run().await?;
    append_log(&raw_log_path, &build.combined)?;
    if !build.success() {
        warn!(
            "last lines of the build log:\n{}",
            xcodebuild::last_lines(&build.combined, 10)
        );
        bail!("archive failed, full log at {}", raw_log_path.display());
    }
    if !archive_path.exists() {
        bail!("no archive generated at {}", archive_path.display());
    }

    let archive =
        MacosArchive::load(&archive_path).context("failed to parse generated archive")?;
    info!(
        "codesign identity: {}",
        archive.signing_identity.as_deref().unwrap_or("-")
    );

    let mut outputs = StepOutputs::new(archive_path.clone());
    outputs.raw_log_path = Some(raw_log_path.clone());

    if config.export_archive_zip {
        artifacts::export_targz(&archive_path, &archive_zip_path)?;
        outputs.archive_zip_path = Some(archive_zip_path);
    }

    if method == ExportMethod::None {
        export_unsigned_copy(&config, &archive, &output_dir, &mut outputs)?;
    } else {
        export_with_options(
            &config,
            &archive,
            &output_dir,
            &work_dir,
            &export_options_path,
            &raw_log_path,
            &distribution_logs_zip_path,
            &mut outputs,
        )
        .await?;
    }

    export_dsyms(&config, &archive, &work_dir, &dsym_zip_path, &mut outputs)?;

    let summary_path = output_dir.join("outputs.json");
    std::fs::write(&summary_path, serde_json::to_string_pretty(&outputs)?)?;
    info!("step outputs recorded at {}", summary_path.display());

    Ok(outputs)
}

/// `none` export method: copy the built application through untouched.
fn export_unsigned_copy(
    config: &StepConfig,
    archive: &MacosArchive,
    output_dir: &Path,
    outputs: &mut StepOutputs,
) -> Result<()> {
    info!("Exporting a copy of the application without re-signing ...");

    if !archive.application_path.is_dir() {
        bail!(
            "no embedded application found at {}",
            archive.application_path.display()
        );
    }

    let app_copy = output_dir.join(format!("{}.app", config.artifact_name));
    artifacts::remove_if_exists(&app_copy)?;
    artifacts::copy_dir(&archive.application_path, &app_copy)?;

    let zipped = output_dir.join(format!("{}.app.tar.gz", config.artifact_name));
    artifacts::export_targz(&app_copy, &zipped)?;
    outputs.exported_path = Some(zipped);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn export_with_options(
    config: &StepConfig,
    archive: &MacosArchive,
    output_dir: &Path,
    work_dir: &Path,
    export_options_path: &Path,
    raw_log_path: &Path,
    distribution_logs_zip_path: &Path,
    outputs: &mut StepOutputs,
) -> Result<()> {
    let method = config.export_method;
    info!("Exporting {} from the archive ...", method);

    if let Some(ref content) = config.custom_export_options_plist_content {
        info!("using custom export options");
        std::fs::write(export_options_path, content)?;
    } else {
        let options = generate_export_options(config, archive, outputs).await?;
        info!("generated export options:\n{}", options.to_xml_string()?);
        options.write_to_file(export_options_path)?;
    }
    outputs.export_options_path = Some(export_options_path.to_path_buf());

    let export_dir = work_dir.join("export");
    std::fs::create_dir_all(&export_dir)?;
    let export_cmd = ExportCommand {
        archive_path: archive.path.clone(),
        export_dir: export_dir.clone(),
        options_plist: export_options_path.to_path_buf(),
    };
    info!("$ {}", export_cmd.printable());

    let result = export_cmd.run().await?;
    append_log(raw_log_path, &result.combined)?;
    if !result.success() {
        if let Some(logs_dir) = xcodebuild::ide_distribution_logs_path(&result.combined) {
            if logs_dir.is_dir() {
                artifacts::export_targz(&logs_dir, distribution_logs_zip_path)?;
                outputs.distribution_logs_zip_path =
                    Some(distribution_logs_zip_path.to_path_buf());
                warn!(
                    "distribution logs packaged at {}",
                    distribution_logs_zip_path.display()
                );
            }
        }
        bail!("export failed, full log at {}", raw_log_path.display());
    }

    let extension = method.artifact_extension();
    let produced = artifacts::find_with_extension(&export_dir, extension)?;
    let produced = match produced.as_slice() {
        [] => bail!("export produced no .{extension} artifact"),
        [single] => single.clone(),
        [first, ..] => {
            warn!(
                "export produced multiple .{extension} artifacts, using {}",
                first.display()
            );
            first.clone()
        }
    };

    if extension == "pkg" {
        let dest = output_dir.join(format!("{}.pkg", config.artifact_name));
        std::fs::copy(&produced, &dest)?;
        outputs.exported_path = Some(dest);
    } else {
        let app_copy = output_dir.join(format!("{}.app", config.artifact_name));
        artifacts::remove_if_exists(&app_copy)?;
        artifacts::copy_dir(&produced, &app_copy)?;
        let zipped = output_dir.join(format!("{}.app.tar.gz", config.artifact_name));
        artifacts::export_targz(&app_copy, &zipped)?;
        outputs.exported_path = Some(zipped);
    }

    Ok(())
}

/// Resolve the signing group and turn it into export options.
///
/// The inventory is read only when the archive actually carries an
/// embedded profile (or the method is Developer ID, which always needs
/// one); otherwise the export proceeds unsigned by policy.
async fn generate_export_options(
    config: &StepConfig,
    archive: &MacosArchive,
    outputs: &mut StepOutputs,
) -> Result<ExportOptions> {
    let method = config.export_method;

    if !archive.has_embedded_profile() && method != ExportMethod::DeveloperId {
        warn!(
            "archive was generated without an embedded provisioning profile and the export \
             method is not developer-id"
        );
        info!("exporting the application without re-signing");
        return Ok(ExportOptions::unsigned(method));
    }

    let profiles_dir = profiles::default_profiles_directory()
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

    match resolution {
        Resolution::Skipped { reason } => {
            warn!("signing group resolution skipped: {reason}");
            Ok(ExportOptions::unsigned(method))
        }
        Resolution::Resolved { group, warnings } => {
            for warning in &warnings {
                warn!("{warning}");
            }
            outputs.warnings.extend(warnings);
            info!(
                "selected signing certificate: {}",
                group.signing_group().certificate.common_name
            );
            Ok(match group {
                ResolvedSigningGroup::AppStore(ref resolved) => ExportOptions::app_store(resolved),
                ResolvedSigningGroup::Standard(ref standard) => {
                    ExportOptions::signed(method, standard)
                }
            })
        }
    }
}

fn export_dsyms(
    config: &StepConfig,
    archive: &MacosArchive,
    work_dir: &Path,
    dsym_zip_path: &Path,
    outputs: &mut StepOutputs,
) -> Result<()> {
    let (app_dsym, framework_dsyms) = archive.find_dsyms()?;
    let app_dsym = match app_dsym {
        Some(path) => path,
        None => {
            info!("no dSYM produced for the application");
            return Ok(());
        }
    };

    info!("Exporting dSYM files ...");
    let stage = work_dir.join("dsyms");
    std::fs::create_dir_all(&stage)?;

    let mut to_copy = vec![app_dsym];
    if config.export_all_dsyms {
        to_copy.extend(framework_dsyms);
    }
    for dsym in to_copy {
        let name = dsym
            .file_name()
            .context("dSYM path has no file name")?
            .to_os_string();
        artifacts::copy_dir(&dsym, &stage.join(name))?;
    }

    artifacts::export_targz(&stage, dsym_zip_path)?;
    outputs.dsym_zip_path = Some(dsym_zip_path.to_path_buf());
    Ok(())
}

fn append_log(path: &Path, content: &str) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outputs_serialize_with_paths() {
        let mut outputs = StepOutputs::new(PathBuf::from("/tmp/Acme.xcarchive"));
        outputs.exported_path = Some(PathBuf::from("/deploy/Acme.pkg"));
        outputs.warnings.push("2 matching signing groups".to_string());

        let json = serde_json::to_string_pretty(&outputs).unwrap();
        assert!(json.contains("Acme.xcarchive"));
        assert!(json.contains("Acme.pkg"));
        assert!(json.contains("2 matching signing groups"));
    }

    #[test]
    fn test_append_log_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("raw.log");
        append_log(&log, "archive output\n").unwrap();
        append_log(&log, "export output\n").unwrap();
        let content = std::fs::read_to_string(&log).unwrap();
        assert!(content.contains("archive output"));
        assert!(content.contains("export output"));
    }
}
