//! Access to the host's installed gems.
//!
//! The `PackageManager` trait is what the rest of the crate consumes; `GemCli`
//! implements it by shelling out to `gem` and `ruby`.

use std::path::PathBuf;
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GemdocsConfig;
use crate::errors::{GemdocsError, Result};

/// One line of `gem list --local`: a gem name and its installed versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledGem {
    pub name: String,
    /// Versions as printed by RubyGems, e.g. `"13.0.6, 12.3.3"`.
    pub versions: String,
}

/// Metadata of a single installed gem.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GemSpec {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub licenses: Vec<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    /// Root of the installed gem's source tree.
    #[serde(default)]
    pub full_gem_path: Option<PathBuf>,
}

/// Source of installed-gem records.
pub trait PackageManager: Send + Sync {
    /// Lists every locally installed gem.
    fn list_installed(&self) -> Result<Vec<InstalledGem>>;

    /// Looks up the newest installed spec for `name`; `None` when not installed.
    fn find(&self, name: &str) -> Result<Option<GemSpec>>;

    /// Returns the installed source tree of `name`, if any.
    fn locate_source(&self, name: &str) -> Result<Option<PathBuf>> {
        Ok(self.find(name)?.and_then(|spec| spec.full_gem_path))
    }

    /// The RubyGems installation directory (`Gem.dir`), if known.
    fn gem_dir(&self) -> Option<PathBuf> {
        None
    }
}

/// Ruby snippet printing the spec of `ARGV[0]` as JSON, or `null`.
const GEM_SPEC_SCRIPT: &str = r#"
require "json"
begin
  spec = Gem::Specification.find_by_name(ARGV[0])
rescue Gem::LoadError
  puts "null"
  exit 0
end
puts JSON.generate(
  "name" => spec.name,
  "version" => spec.version.to_s,
  "summary" => spec.summary,
  "description" => spec.description,
  "homepage" => spec.homepage,
  "licenses" => spec.licenses,
  "authors" => spec.authors,
  "full_gem_path" => spec.full_gem_path
)
"#;

/// `PackageManager` backed by the `gem` and `ruby` executables.
#[derive(Debug, Clone)]
pub struct GemCli {
    gem_bin: String,
    ruby_bin: String,
}

impl GemCli {
    pub fn new(config: &GemdocsConfig) -> Self {
        Self {
            gem_bin: config.gem_bin.clone(),
            ruby_bin: config.ruby_bin.clone(),
        }
    }

    fn capture(&self, program: &str, args: &[&str]) -> Result<String> {
        let command = format!("{} {}", program, args.join(" "));
        debug!(%command, "running package manager command");

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| GemdocsError::PackageManager {
                message: format!("failed to spawn: {}", e),
                command: command.clone(),
            })?;

        if !output.status.success() {
            return Err(GemdocsError::PackageManager {
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                command,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl PackageManager for GemCli {
    fn list_installed(&self) -> Result<Vec<InstalledGem>> {
        let stdout = self.capture(&self.gem_bin, &["list", "--local"])?;
        Ok(parse_gem_list(&stdout))
    }

    fn find(&self, name: &str) -> Result<Option<GemSpec>> {
        // `--` keeps a name starting with `-` out of ruby's own option parsing.
        let stdout = self.capture(&self.ruby_bin, &["-e", GEM_SPEC_SCRIPT, "--", name])?;
        let spec: Option<GemSpec> = serde_json::from_str(stdout.trim())?;
        Ok(spec)
    }

    fn gem_dir(&self) -> Option<PathBuf> {
        let stdout = self
            .capture(&self.gem_bin, &["environment", "gemdir"])
            .ok()?;
        let dir = stdout.trim();
        if dir.is_empty() {
            None
        } else {
            Some(PathBuf::from(dir))
        }
    }
}

/// Parses the output of `gem list --local`.
///
/// Each gem line has the form `name (1.2.3, 1.0.0)`; headers and blank lines
/// are skipped.
pub fn parse_gem_list(output: &str) -> Vec<InstalledGem> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let open = line.find(" (")?;
            let close = line.rfind(')')?;
            if close <= open {
                return None;
            }
            let name = &line[..open];
            if name.is_empty() || name.contains(char::is_whitespace) {
                return None;
            }
            Some(InstalledGem {
                name: name.to_string(),
                versions: line[open + 2..close].to_string(),
            })
        })
        .collect()
}

/// Case-insensitive substring filter over installed gem names.
pub fn filter_gems<'a>(gems: &'a [InstalledGem], query: &str) -> Vec<&'a InstalledGem> {
    let needle = query.to_lowercase();
    gems.iter()
        .filter(|gem| gem.name.to_lowercase().contains(&needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gem_list_skips_header() {
        let output = "\n*** LOCAL GEMS ***\n\nrake (13.0.6, 12.3.3)\njson (default: 2.6.1)\n";
        let gems = parse_gem_list(output);
        assert_eq!(gems.len(), 2);
        assert_eq!(gems[0].name, "rake");
        assert_eq!(gems[0].versions, "13.0.6, 12.3.3");
        assert_eq!(gems[1].versions, "default: 2.6.1");
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let gems = parse_gem_list("RSpec-core (3.12.0)\nrake (13.0.6)\n");
        let found = filter_gems(&gems, "rspec");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "RSpec-core");
    }

    #[test]
    fn test_spec_null_means_not_installed() {
        let spec: Option<GemSpec> = serde_json::from_str("null").unwrap();
        assert!(spec.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_find_passes_name_after_option_terminator() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let log = dir.path().join("args.log");
        let script = dir.path().join("ruby");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{}'\necho null\n",
                log.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let cli = GemCli::new(&GemdocsConfig {
            ruby_bin: script.display().to_string(),
            ..GemdocsConfig::default()
        });
        assert_eq!(cli.find("-r/tmp/evil").unwrap(), None);

        let args = std::fs::read_to_string(&log).unwrap();
        let lines: Vec<&str> = args.lines().collect();
        assert_eq!(lines[lines.len() - 2..], ["--", "-r/tmp/evil"]);
    }
}
