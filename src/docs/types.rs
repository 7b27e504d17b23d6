use serde::Serialize;

use crate::yard::{Scope, Visibility};

/// Gem metadata shown at the top of an overview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GemSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
}

/// A class or module declared at the root of the gem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassEntry {
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superclass: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    pub methods_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleEntry {
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    pub methods_count: usize,
}

/// Projection of a whole gem: its metadata and every class and module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GemOverview {
    pub gem: String,
    pub summary: GemSummary,
    pub namespaces: Vec<NamespaceEntry>,
    pub classes: Vec<ClassEntry>,
    pub modules: Vec<ModuleEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagInfo {
    pub tag_name: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// A method as listed inside its class or module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodInfo {
    pub name: String,
    pub path: String,
    pub signature: String,
    pub visibility: Visibility,
    pub scope: Scope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    pub parameters: Vec<ParameterInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeInfo {
    pub name: String,
    pub scope: Scope,
    pub read: bool,
    pub write: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
}

/// Kind-specific part of an [`ObjectDoc`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ObjectDetails {
    Namespace {
        #[serde(skip_serializing_if = "Option::is_none")]
        superclass: Option<String>,
        includes: Vec<String>,
        extends: Vec<String>,
        methods: Vec<MethodInfo>,
        attributes: Vec<AttributeInfo>,
    },
    Method {
        signature: String,
        parameters: Vec<ParameterInfo>,
        visibility: Visibility,
        scope: Scope,
        aliases: Vec<String>,
    },
}

/// Projection of a single class, module, method or other object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectDoc {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    pub tags: Vec<TagInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceLocation>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub details: Option<ObjectDetails>,
}

/// What `fetch_gem_docs` renders: either an overview or one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DocsProjection {
    Overview(GemOverview),
    Object(Box<ObjectDoc>),
}
