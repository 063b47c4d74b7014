//! Final group selection and disambiguation.

use tracing::warn;
use xcexport_common::{Error, ExportMethod, Result};
use xcexport_signing_schema::{
    requirement, BundleRequirement, CertificateInfo, CertificateKind, SelectableSigningGroup,
};

/// Pick exactly one group from the filtered candidates.
///
/// Candidates are ordered by (certificate common name, team id); when more
/// than one survives, the first is taken and an ambiguity warning is
/// recorded. Any survivor is valid by construction, so ambiguity is
/// recoverable, not fatal.
pub fn select_group(
    mut groups: Vec<SelectableSigningGroup>,
    requirements: &[BundleRequirement],
    method: ExportMethod,
) -> Result<(SelectableSigningGroup, Vec<String>)> {
    if groups.is_empty() {
        return Err(Error::NoSigningGroupFound {
            bundle_ids: requirement::bundle_ids(requirements).join(", "),
            method: method.to_string(),
        });
    }

    groups.sort_by(|a, b| {
        a.certificate
            .common_name
            .cmp(&b.certificate.common_name)
            .then_with(|| a.certificate.team_id.cmp(&b.certificate.team_id))
    });

    let mut warnings = Vec::new();
    if groups.len() > 1 {
        let message = format!(
            "{} matching signing groups found, using certificate {}",
            groups.len(),
            groups[0].certificate.common_name
        );
        warn!("{message}");
        warnings.push(message);
    }

    Ok((groups.remove(0), warnings))
}

/// Pick the installer certificate paired with an App Store signing group:
/// Installer-kind certificates of the same team, ordered by common name.
pub fn select_installer_certificate(
    installers: &[CertificateInfo],
    team_id: &str,
) -> Result<(CertificateInfo, Vec<String>)> {
    let mut matching: Vec<&CertificateInfo> = installers
        .iter()
        .filter(|c| c.kind == CertificateKind::Installer && c.team_id == team_id)
        .collect();

    if matching.is_empty() {
        return Err(Error::NoInstallerCertificateFound {
            team_id: team_id.to_string(),
        });
    }

    matching.sort_by(|a, b| a.common_name.cmp(&b.common_name));

    let mut warnings = Vec::new();
    if matching.len() > 1 {
        let message = format!(
            "{} installer certificates found for team {}, using {}",
            matching.len(),
            team_id,
            matching[0].common_name
        );
        warn!("{message}");
        warnings.push(message);
    }

    Ok((matching[0].clone(), warnings))
}
