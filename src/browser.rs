//! One-shot "open the docs in a browser" path used by `open-gemdocs browse`.
//!
//! Versions are resolved from an explicit flag, the working directory's
//! `Gemfile.lock`, or gemdocs.org's latest entry.

use std::path::Path;
use std::process::Command;

use serde::Deserialize;
use tracing::{debug, info};

use crate::errors::{GemdocsError, Result};

/// Base URL of the hosted documentation index.
pub const GEMDOCS_BASE_URL: &str = "https://gemdocs.org";

/// Which version of a gem's hosted docs to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionChoice {
    Exact(String),
    Latest,
}

/// One entry of gemdocs.org's `versions.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VersionEntry {
    pub version: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct VersionsDocument {
    versions: Vec<VersionEntry>,
}

/// Picks the version to open.
///
/// An explicit version wins; otherwise the version locked in
/// `<working_dir>/Gemfile.lock` is used unless `use_latest` is set.
pub fn resolve_version(
    gem_name: &str,
    explicit: Option<&str>,
    use_latest: bool,
    working_dir: &Path,
) -> VersionChoice {
    if let Some(version) = explicit {
        return VersionChoice::Exact(version.to_string());
    }

    if !use_latest {
        let lockfile = working_dir.join("Gemfile.lock");
        if let Ok(contents) = std::fs::read_to_string(&lockfile) {
            if let Some(version) = locked_version(&contents, gem_name) {
                info!(gem = gem_name, %version, "using version from Gemfile.lock");
                return VersionChoice::Exact(version);
            }
        }
    }

    VersionChoice::Latest
}

/// Finds `gem_name`'s resolved version in Gemfile.lock contents.
///
/// Resolved specs are indented by exactly four spaces, e.g. `    rails (7.1.2)`;
/// platform suffixes such as `-x86_64-linux` are dropped.
pub fn locked_version(lockfile: &str, gem_name: &str) -> Option<String> {
    let prefix = format!("{} (", gem_name);
    lockfile.lines().find_map(|line| {
        let spec = line.strip_prefix("    ")?;
        if spec.starts_with(' ') {
            return None;
        }
        let rest = spec.strip_prefix(&prefix)?;
        let version: String = rest
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        if version.is_empty() {
            None
        } else {
            Some(version)
        }
    })
}

/// Fetches the published documentation versions of a gem from gemdocs.org.
pub fn fetch_versions(gem_name: &str) -> Result<Vec<VersionEntry>> {
    let url = format!("{}/gems/{}/versions.json", GEMDOCS_BASE_URL, gem_name);
    debug!(%url, "fetching documentation versions");
    let mut response = ureq::get(&url).call()?;
    let document: VersionsDocument = response.body_mut().read_json()?;
    Ok(document.versions)
}

/// URL of the chosen version, with the `production.` host prefix removed.
pub fn select_url(versions: &[VersionEntry], choice: &VersionChoice) -> Option<String> {
    let entry = match choice {
        VersionChoice::Latest => versions.last(),
        VersionChoice::Exact(version) => versions.iter().find(|v| &v.version == version),
    }?;
    Some(entry.url.replacen("production.", "", 1))
}

/// Opens `url` in the platform's default browser.
pub fn open_url(url: &str) -> Result<()> {
    let mut command = if cfg!(target_os = "macos") {
        let mut c = Command::new("open");
        c.arg(url);
        c
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", "", url]);
        c
    } else {
        let mut c = Command::new("xdg-open");
        c.arg(url);
        c
    };

    let status = command.status().map_err(|e| GemdocsError::Browser {
        message: format!("failed to launch browser: {}", e),
    })?;
    if !status.success() {
        return Err(GemdocsError::Browser {
            message: format!("browser launcher exited with {}", status),
        });
    }
    Ok(())
}

/// Resolves and opens the hosted documentation for a gem.
///
/// Returns the URL that was opened.
pub fn browse_hosted(
    gem_name: &str,
    explicit: Option<&str>,
    use_latest: bool,
    working_dir: &Path,
) -> Result<String> {
    if gem_name.trim().is_empty() {
        return Err(GemdocsError::MissingArgument {
            name: "gem_name".to_string(),
        });
    }

    let choice = resolve_version(gem_name, explicit, use_latest, working_dir);
    let versions = fetch_versions(gem_name)?;
    let url = select_url(&versions, &choice).ok_or_else(|| GemdocsError::Browser {
        message: match &choice {
            VersionChoice::Exact(v) => format!("no documentation found for {} v{}", gem_name, v),
            VersionChoice::Latest => format!("no documentation versions found for {}", gem_name),
        },
    })?;

    open_url(&url)?;
    Ok(url)
}
