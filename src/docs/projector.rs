use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use glob::Pattern;
use tracing::{debug, info};

use crate::config::GemdocsConfig;
use crate::errors::{GemdocsError, Result};
use crate::gems::PackageManager;
use crate::yard::{AttributeFacts, DocGenerator, DocRegistry, ObjectFacts, ObjectKind};

use super::types::*;

/// Directory name YARD uses for its database.
const YARDOC_DIR: &str = ".yardoc";

/// Turns a gem's YARD registry into serializable projections.
///
/// Each call resolves a database, loads it, projects it and releases it
/// again. Calls for the same gem name are serialized.
pub struct RegistryProjector {
    packages: Arc<dyn PackageManager>,
    generator: Arc<dyn DocGenerator>,
    doc_dirs: Vec<PathBuf>,
    scratch_dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RegistryProjector {
    pub fn new(
        packages: Arc<dyn PackageManager>,
        generator: Arc<dyn DocGenerator>,
        config: &GemdocsConfig,
    ) -> Self {
        Self {
            packages,
            generator,
            doc_dirs: config.doc_dirs.clone(),
            scratch_dir: std::env::temp_dir(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Overrides where freshly generated databases are written.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Projects the gem overview, or a single object when `object_path` is set.
    pub fn project(&self, gem_name: &str, object_path: Option<&str>) -> Result<DocsProjection> {
        match object_path {
            Some(path) => Ok(DocsProjection::Object(Box::new(
                self.project_object(gem_name, path)?,
            ))),
            None => Ok(DocsProjection::Overview(self.project_overview(gem_name)?)),
        }
    }

    pub fn project_overview(&self, gem_name: &str) -> Result<GemOverview> {
        let summary = self.gem_summary(gem_name);
        self.with_registry(gem_name, |registry| {
            Ok(build_overview(gem_name, summary, registry))
        })
    }

    pub fn project_object(&self, gem_name: &str, object_path: &str) -> Result<ObjectDoc> {
        self.with_registry(gem_name, |registry| {
            let facts = registry
                .lookup(object_path)
                .ok_or_else(|| GemdocsError::ObjectNotFound {
                    path: object_path.to_string(),
                    gem: gem_name.to_string(),
                })?;
            Ok(build_object_doc(facts, registry))
        })
    }

    /// Finds an existing `.yardoc` for the gem, generating one if needed.
    pub fn resolve_database(&self, gem_name: &str) -> Result<PathBuf> {
        if let Some(existing) = self.find_existing_database(gem_name) {
            debug!(gem = gem_name, db = %existing.display(), "using existing yard database");
            return Ok(existing);
        }

        let source = self
            .packages
            .locate_source(gem_name)?
            .ok_or_else(|| GemdocsError::PackageNotFound {
                name: gem_name.to_string(),
            })?;

        let database = self
            .scratch_dir
            .join(format!("yard_{}_{}", gem_name, std::process::id()))
            .join(YARDOC_DIR);

        if !database.exists() {
            info!(gem = gem_name, "no yard database found, generating one");
            self.generator.build_database(&source, &database)?;
        }
        Ok(database)
    }

    fn find_existing_database(&self, gem_name: &str) -> Option<PathBuf> {
        let mut roots = self.doc_dirs.clone();
        if let Some(gem_dir) = self.packages.gem_dir() {
            roots.push(gem_dir.join("doc"));
        }

        roots
            .iter()
            .find_map(|root| newest_database_under(root, gem_name))
    }

    fn gem_summary(&self, gem_name: &str) -> GemSummary {
        match self.packages.find(gem_name) {
            Ok(Some(spec)) => GemSummary {
                version: Some(spec.version),
                description: spec.description,
                summary: spec.summary,
                homepage: spec.homepage,
            },
            Ok(None) => GemSummary::default(),
            Err(e) => {
                debug!(gem = gem_name, error = %e, "gem summary unavailable");
                GemSummary::default()
            }
        }
    }

    fn with_registry<T>(
        &self,
        gem_name: &str,
        project: impl FnOnce(&DocRegistry) -> Result<T>,
    ) -> Result<T> {
        let lock = self.lock_for(gem_name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let database = self.resolve_database(gem_name)?;
        let mut registry = self.generator.load(&database)?;
        let result = project(&registry);
        registry.release();
        result
    }

    fn lock_for(&self, gem_name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(gem_name.to_string()).or_default().clone()
    }
}

/// Matches `<root>/<gem>-<version>/.yardoc`, preferring the greatest version
/// directory name.
fn newest_database_under(root: &Path, gem_name: &str) -> Option<PathBuf> {
    let pattern = format!(
        "{}/{}-[0-9]*/{}",
        Pattern::escape(&root.to_string_lossy()),
        Pattern::escape(gem_name),
        YARDOC_DIR
    );
    let mut matches: Vec<PathBuf> = glob::glob(&pattern).ok()?.filter_map(|m| m.ok()).collect();
    matches.sort();
    matches.pop()
}

/// `None` for missing or whitespace-only docstrings.
pub fn normalize_docstring(docstring: Option<&str>) -> Option<String> {
    docstring
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

/// Builds the gem overview from a loaded registry.
pub fn build_overview(gem_name: &str, summary: GemSummary, registry: &DocRegistry) -> GemOverview {
    let namespaces = registry
        .all(&[ObjectKind::Module, ObjectKind::Class])
        .into_iter()
        .filter(|obj| obj.is_root_level())
        .map(|obj| NamespaceEntry {
            name: obj.name.clone(),
            path: obj.path.clone(),
            kind: obj.kind.as_str().to_string(),
        })
        .collect();

    let classes = registry
        .all(&[ObjectKind::Class])
        .into_iter()
        .map(|obj| ClassEntry {
            name: obj.name.clone(),
            path: obj.path.clone(),
            namespace: namespace_of(obj),
            superclass: obj.superclass.clone(),
            docstring: normalize_docstring(obj.docstring.as_deref()),
            methods_count: obj.methods.len(),
        })
        .collect();

    let modules = registry
        .all(&[ObjectKind::Module])
        .into_iter()
        .map(|obj| ModuleEntry {
            name: obj.name.clone(),
            path: obj.path.clone(),
            namespace: namespace_of(obj),
            docstring: normalize_docstring(obj.docstring.as_deref()),
            methods_count: obj.methods.len(),
        })
        .collect();

    GemOverview {
        gem: gem_name.to_string(),
        summary,
        namespaces,
        classes,
        modules,
    }
}

/// Builds the full projection of one object.
pub fn build_object_doc(obj: &ObjectFacts, registry: &DocRegistry) -> ObjectDoc {
    let details = match obj.kind {
        ObjectKind::Class | ObjectKind::Module => Some(ObjectDetails::Namespace {
            superclass: if obj.kind == ObjectKind::Class {
                obj.superclass.clone()
            } else {
                None
            },
            includes: obj.includes.clone(),
            extends: obj.extends.clone(),
            methods: obj
                .methods
                .iter()
                .filter_map(|path| registry.lookup(path))
                .filter(|m| m.kind == ObjectKind::Method)
                .map(method_info)
                .collect(),
            attributes: obj
                .attributes
                .iter()
                .filter_map(|attr| attribute_info(attr, registry))
                .collect(),
        }),
        ObjectKind::Method => Some(ObjectDetails::Method {
            signature: signature_of(obj),
            parameters: parameters_of(obj),
            visibility: obj.visibility,
            scope: obj.scope,
            aliases: obj.aliases.clone(),
        }),
        ObjectKind::Constant | ObjectKind::Other => None,
    };

    ObjectDoc {
        name: obj.name.clone(),
        path: obj.path.clone(),
        kind: obj.kind.as_str().to_string(),
        namespace: namespace_of(obj),
        docstring: normalize_docstring(obj.docstring.as_deref()),
        tags: obj
            .tags
            .iter()
            .map(|tag| TagInfo {
                tag_name: tag.tag_name.clone(),
                text: tag.text.clone(),
                types: tag.types.clone(),
                name: tag.name.clone(),
            })
            .collect(),
        source: obj.file.as_ref().map(|file| SourceLocation {
            file: file.clone(),
            line: obj.line,
        }),
        details,
    }
}

/// Member listing entry for a method.
pub fn method_info(method: &ObjectFacts) -> MethodInfo {
    MethodInfo {
        name: method.name.clone(),
        path: method.path.clone(),
        signature: signature_of(method),
        visibility: method.visibility,
        scope: method.scope,
        docstring: normalize_docstring(method.docstring.as_deref()),
        parameters: parameters_of(method),
        return_type: method.return_types().map(<[String]>::to_vec),
    }
}

/// Projects an attribute; `None` when it has neither reader nor writer.
pub fn attribute_info(attr: &AttributeFacts, registry: &DocRegistry) -> Option<AttributeInfo> {
    let accessor = attr.read.as_ref().or(attr.write.as_ref())?;
    let docstring = registry
        .lookup(accessor)
        .and_then(|method| normalize_docstring(method.docstring.as_deref()));

    Some(AttributeInfo {
        name: attr.name.trim_end_matches('=').to_string(),
        scope: attr.scope,
        read: attr.read.is_some(),
        write: attr.write.is_some(),
        docstring,
    })
}

fn namespace_of(obj: &ObjectFacts) -> Option<String> {
    obj.namespace.clone().filter(|ns| !ns.is_empty())
}

fn signature_of(method: &ObjectFacts) -> String {
    method
        .signature
        .clone()
        .unwrap_or_else(|| format!("def {}", method.name))
}

fn parameters_of(method: &ObjectFacts) -> Vec<ParameterInfo> {
    method
        .parameters
        .iter()
        .map(|(name, default)| ParameterInfo {
            name: name.clone(),
            default: default.clone(),
        })
        .collect()
}
