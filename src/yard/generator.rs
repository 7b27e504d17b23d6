use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::config::GemdocsConfig;
use crate::errors::{GemdocsError, Result};

use super::registry::{DocRegistry, ObjectFacts};

/// Builds and loads documentation databases.
pub trait DocGenerator: Send + Sync {
    /// Parses the gem sources under `source` into a database at `output`.
    fn build_database(&self, source: &Path, output: &Path) -> Result<()>;

    /// Loads the database at `database` into an in-memory registry.
    fn load(&self, database: &Path) -> Result<DocRegistry>;
}

/// Ruby script that loads the `.yardoc` database given as `ARGV[0]` and prints
/// every class, module, constant and method as a JSON array.
const REGISTRY_DUMP_SCRIPT: &str = r#"
require "yard"
require "json"

def docstring_of(obj)
  text = obj.docstring.to_s
  text.strip.empty? ? nil : text
end

def tags_of(obj)
  obj.tags.map do |tag|
    out = { "tag_name" => tag.tag_name, "text" => tag.text.to_s }
    out["types"] = tag.types if tag.respond_to?(:types) && tag.types
    out["name"] = tag.name.to_s if tag.respond_to?(:name) && tag.name
    out
  end
end

def real?(obj)
  !obj.is_a?(YARD::CodeObjects::Proxy)
end

YARD::Registry.load!(ARGV[0])

objects = YARD::Registry.all(:module, :class, :constant, :method).map do |obj|
  namespace = obj.namespace
  facts = {
    "name" => obj.name.to_s,
    "path" => obj.path,
    "type" => obj.type.to_s,
    "namespace" => namespace && !namespace.root? ? namespace.path : nil,
    "docstring" => docstring_of(obj),
    "tags" => tags_of(obj),
    "file" => obj.file,
    "line" => obj.line
  }

  case obj.type
  when :class, :module
    if obj.type == :class && obj.superclass
      facts["superclass"] = obj.superclass.path
    end
    facts["includes"] = obj.mixins(:instance).map(&:path)
    facts["extends"] = obj.mixins(:class).map(&:path)
    facts["methods"] = obj.meths.select { |m| real?(m) }.map(&:path)
    facts["attributes"] = obj.attributes.flat_map do |scope, attrs|
      attrs.map do |name, pair|
        {
          "name" => name.to_s,
          "scope" => scope.to_s,
          "read" => pair[:read] && pair[:read].path,
          "write" => pair[:write] && pair[:write].path
        }
      end
    end
  when :method
    facts["signature"] = obj.signature
    facts["parameters"] = (obj.parameters || []).map { |name, default| [name.to_s, default] }
    facts["visibility"] = obj.visibility.to_s
    facts["scope"] = obj.scope.to_s
    facts["aliases"] = obj.aliases.map { |a| a.name.to_s }
  end

  facts
end

puts JSON.generate(objects)
"#;

/// `DocGenerator` backed by `yardoc` and a `ruby -ryard` registry dump.
#[derive(Debug, Clone)]
pub struct YardCli {
    yardoc_bin: String,
    ruby_bin: String,
}

impl YardCli {
    pub fn new(config: &GemdocsConfig) -> Self {
        Self {
            yardoc_bin: config.yardoc_bin.clone(),
            ruby_bin: config.ruby_bin.clone(),
        }
    }
}

impl DocGenerator for YardCli {
    fn build_database(&self, source: &Path, output: &Path) -> Result<()> {
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!(source = %source.display(), db = %output.display(), "generating yard database");
        let result = Command::new(&self.yardoc_bin)
            .current_dir(source)
            .arg("--no-output")
            .arg("--no-stats")
            .arg("--quiet")
            .arg("--db")
            .arg(output)
            .output()
            .map_err(|e| GemdocsError::Generator {
                message: format!("failed to spawn {}: {}", self.yardoc_bin, e),
            })?;

        if !result.status.success() {
            return Err(GemdocsError::Generator {
                message: format!(
                    "{} exited with {}: {}",
                    self.yardoc_bin,
                    result.status,
                    String::from_utf8_lossy(&result.stderr).trim()
                ),
            });
        }

        Ok(())
    }

    fn load(&self, database: &Path) -> Result<DocRegistry> {
        debug!(db = %database.display(), "loading yard registry");
        let result = Command::new(&self.ruby_bin)
            .arg("-e")
            .arg(REGISTRY_DUMP_SCRIPT)
            .arg(database)
            .output()
            .map_err(|e| GemdocsError::Generator {
                message: format!("failed to spawn {}: {}", self.ruby_bin, e),
            })?;

        if !result.status.success() {
            return Err(GemdocsError::Generator {
                message: format!(
                    "failed to load registry '{}': {}",
                    database.display(),
                    String::from_utf8_lossy(&result.stderr).trim()
                ),
            });
        }

        let objects: Vec<ObjectFacts> = serde_json::from_slice(&result.stdout)?;
        debug!(count = objects.len(), "registry loaded");
        Ok(DocRegistry::from_objects(objects))
    }
}
