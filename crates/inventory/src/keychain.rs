//! Keychain certificate inventory.
//!
//! Certificates are listed with `security find-certificate` and parsed
//! from PEM into normalized records. Certificates whose common name does
//! not identify an Apple signing role are skipped; expired ones are
//! dropped with a warning by `filter_valid_certificates`.

use crate::executor::Executor;
use chrono::{DateTime, NaiveDateTime, Utc};
use openssl::asn1::Asn1TimeRef;
use openssl::nid::Nid;
use openssl::x509::X509;
use tracing::{debug, warn};
use xcexport_common::{fingerprint, Error, Result, ValidityWindow};
use xcexport_signing_schema::{CertificateInfo, CertificateKind};

const DEVELOPMENT_PREFIXES: [&str; 3] = ["Apple Development", "Mac Developer", "iPhone Developer"];
const DISTRIBUTION_PREFIXES: [&str; 4] = [
    "Apple Distribution",
    "3rd Party Mac Developer Application",
    "Developer ID Application",
    "iPhone Distribution",
];
const INSTALLER_PREFIXES: [&str; 3] = [
    "3rd Party Mac Developer Installer",
    "Developer ID Installer",
    "Mac Installer Distribution",
];

/// The installed code-signing identities (development and distribution).
pub async fn installed_codesigning_certificates(
    executor: &dyn Executor,
) -> Result<Vec<CertificateInfo>> {
    let pem = query_certificates(executor).await?;
    Ok(parse_pem_certificates(&pem)?
        .into_iter()
        .filter(|c| c.kind != CertificateKind::Installer)
        .collect())
}

/// The installed installer identities used for App Store packages.
pub async fn installed_installer_certificates(
    executor: &dyn Executor,
) -> Result<Vec<CertificateInfo>> {
    let pem = query_certificates(executor).await?;
    Ok(parse_pem_certificates(&pem)?
        .into_iter()
        .filter(|c| c.kind == CertificateKind::Installer)
        .collect())
}

/// Drop certificates whose validity window does not cover `now`.
/// Silently ineligible, not an error; each drop is logged.
pub fn filter_valid_certificates(
    certificates: Vec<CertificateInfo>,
    now: DateTime<Utc>,
) -> Vec<CertificateInfo> {
    certificates
        .into_iter()
        .filter(|certificate| {
            let valid = certificate.is_valid_at(now);
            if !valid {
                warn!("dropping certificate outside validity window: {certificate}");
            }
            valid
        })
        .collect()
}

async fn query_certificates(executor: &dyn Executor) -> Result<String> {
    let args: Vec<String> = ["find-certificate", "-a", "-p"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let (code, stdout, stderr) = executor
        .execute("security", &args)
        .await
        .map_err(|e| Error::InventoryUnavailable(e.to_string()))?;

    if code != Some(0) {
        return Err(Error::InventoryUnavailable(format!(
            "security find-certificate failed: {}",
            stderr.trim()
        )));
    }
    Ok(stdout)
}

/// Parse a PEM certificate stream into normalized records.
pub fn parse_pem_certificates(pem: &str) -> Result<Vec<CertificateInfo>> {
    if pem.trim().is_empty() {
        return Ok(Vec::new());
    }

    let stack = X509::stack_from_pem(pem.as_bytes())
        .map_err(|e| Error::InventoryUnavailable(format!("cannot parse certificate PEM: {e}")))?;

    let mut certificates = Vec::new();
    for x509 in &stack {
        match certificate_info(x509) {
            Some(certificate) => certificates.push(certificate),
            None => debug!("skipping certificate without an Apple signing role"),
        }
    }
    Ok(certificates)
}

fn certificate_info(x509: &X509) -> Option<CertificateInfo> {
    let common_name = subject_entry(x509, Nid::COMMONNAME)?;
    let kind = classify(&common_name)?;
    let team_id = subject_entry(x509, Nid::ORGANIZATIONALUNITNAME)?;

    let serial_number = x509
        .serial_number()
        .to_bn()
        .ok()
        .and_then(|bn| bn.to_hex_str().ok().map(|s| s.to_string()))?;
    let not_before = parse_asn1_time(x509.not_before())?;
    let not_after = parse_asn1_time(x509.not_after())?;
    let fingerprint = fingerprint::certificate_fingerprint(&x509.to_der().ok()?);

    Some(CertificateInfo {
        common_name,
        team_id,
        serial_number,
        validity: ValidityWindow::new(not_before, not_after),
        fingerprint,
        kind,
    })
}

fn subject_entry(x509: &X509, nid: Nid) -> Option<String> {
    x509.subject_name()
        .entries_by_nid(nid)
        .next()
        .and_then(|entry| entry.data().as_utf8().ok())
        .map(|s| s.to_string())
}

fn classify(common_name: &str) -> Option<CertificateKind> {
    let starts_with_any =
        |prefixes: &[&str]| prefixes.iter().any(|p| common_name.starts_with(p));

    if starts_with_any(&INSTALLER_PREFIXES) {
        Some(CertificateKind::Installer)
    } else if starts_with_any(&DISTRIBUTION_PREFIXES) {
        Some(CertificateKind::Distribution)
    } else if starts_with_any(&DEVELOPMENT_PREFIXES) {
        Some(CertificateKind::Development)
    } else {
        None
    }
}

// Asn1Time renders like "Feb  4 20:28:00 2029 GMT".
fn parse_asn1_time(time: &Asn1TimeRef) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(&time.to_string(), "%b %e %H:%M:%S %Y GMT")
        .ok()
        .map(|naive| naive.and_utc())
}
