use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Kinds of code objects stored in a YARD registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Class,
    Module,
    Method,
    Constant,
    #[serde(other)]
    Other,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Class => "class",
            ObjectKind::Module => "module",
            ObjectKind::Method => "method",
            ObjectKind::Constant => "constant",
            ObjectKind::Other => "other",
        }
    }
}

/// Method visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    /// Rendering order used when grouping methods.
    pub const ALL: [Visibility; 3] = [Visibility::Public, Visibility::Protected, Visibility::Private];

    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        }
    }

    /// Capitalized label, e.g. `Public`.
    pub fn label(&self) -> &'static str {
        match self {
            Visibility::Public => "Public",
            Visibility::Protected => "Protected",
            Visibility::Private => "Private",
        }
    }
}

/// Whether a method or attribute belongs to instances or the class itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Instance,
    Class,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Instance => "instance",
            Scope::Class => "class",
        }
    }
}

/// A docstring tag such as `@param`, `@return` or `@example`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFacts {
    pub tag_name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub types: Option<Vec<String>>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Reader/writer pair declared with `attr_reader`, `attr_writer` or `attr_accessor`.
///
/// `read` and `write` hold the paths of the generated accessor methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeFacts {
    pub name: String,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub read: Option<String>,
    #[serde(default)]
    pub write: Option<String>,
}

/// Everything the registry declares about one code object.
///
/// Namespace-only and method-only fields are empty for other kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectFacts {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    /// Path of the enclosing namespace; `None` at the root.
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub docstring: Option<String>,
    #[serde(default)]
    pub tags: Vec<TagFacts>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,

    #[serde(default)]
    pub superclass: Option<String>,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub extends: Vec<String>,
    /// Paths of the methods this namespace responds to.
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeFacts>,

    #[serde(default)]
    pub signature: Option<String>,
    /// `(name, default)` pairs in declaration order.
    #[serde(default)]
    pub parameters: Vec<(String, Option<String>)>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl ObjectFacts {
    /// Creates a bare object; remaining fields are filled in by the caller.
    pub fn new(kind: ObjectKind, path: &str) -> Self {
        let (namespace, name) = split_path(path);
        Self {
            name: name.to_string(),
            path: path.to_string(),
            kind,
            namespace: namespace.map(str::to_string),
            docstring: None,
            tags: Vec::new(),
            file: None,
            line: None,
            superclass: None,
            includes: Vec::new(),
            extends: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
            signature: None,
            parameters: Vec::new(),
            visibility: Visibility::Public,
            scope: Scope::Instance,
            aliases: Vec::new(),
        }
    }

    pub fn is_root_level(&self) -> bool {
        self.namespace.as_deref().map_or(true, str::is_empty)
    }

    /// Types declared by the first `@return` tag.
    pub fn return_types(&self) -> Option<&[String]> {
        self.tags
            .iter()
            .find(|tag| tag.tag_name == "return")
            .and_then(|tag| tag.types.as_deref())
    }
}

/// Splits `A::B::C`, `A::B#c` or `A::B.c` into `(Some("A::B"), name)`.
fn split_path(path: &str) -> (Option<&str>, &str) {
    let tail_start = path.rfind("::").map_or(0, |i| i + 2);
    if let Some(offset) = path[tail_start..].find(['#', '.']) {
        let sep = tail_start + offset;
        if sep > 0 {
            return (Some(&path[..sep]), &path[sep + 1..]);
        }
    }
    match path.rfind("::") {
        Some(i) => (Some(&path[..i]), &path[i + 2..]),
        None => (None, path),
    }
}

/// In-memory view over a loaded documentation database.
///
/// Objects keep the order the generator reported them in.
#[derive(Debug, Clone, Default)]
pub struct DocRegistry {
    objects: Vec<ObjectFacts>,
    index: HashMap<String, usize>,
}

impl DocRegistry {
    /// Builds a registry; later duplicates of a path are ignored.
    pub fn from_objects(objects: Vec<ObjectFacts>) -> Self {
        let mut registry = Self::default();
        for object in objects {
            if registry.index.contains_key(&object.path) {
                continue;
            }
            registry.index.insert(object.path.clone(), registry.objects.len());
            registry.objects.push(object);
        }
        registry
    }

    pub fn lookup(&self, path: &str) -> Option<&ObjectFacts> {
        self.index.get(path).map(|&i| &self.objects[i])
    }

    /// All objects whose kind is in `kinds`, in registry order.
    pub fn all(&self, kinds: &[ObjectKind]) -> Vec<&ObjectFacts> {
        self.objects
            .iter()
            .filter(|object| kinds.contains(&object.kind))
            .collect()
    }

    /// Drops every loaded object.
    pub fn release(&mut self) {
        self.objects.clear();
        self.index.clear();
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
