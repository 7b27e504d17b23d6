use crate::yard::Visibility;

use super::types::{DocsProjection, GemOverview, ObjectDetails, ObjectDoc};

/// Overview docstrings are cut to this many characters.
const OVERVIEW_DOCSTRING_CHARS: usize = 100;

/// Formats a documentation projection as Markdown suitable for LLM consumption.
pub fn format_docs_as_markdown(projection: &DocsProjection) -> String {
    match projection {
        DocsProjection::Overview(overview) => format_overview(overview),
        DocsProjection::Object(object) => format_object(object),
    }
}

/// Formats a projection as pretty-printed JSON.
pub fn format_docs_as_json(projection: &DocsProjection) -> String {
    serde_json::to_string_pretty(projection).unwrap_or_default()
}

fn format_overview(overview: &GemOverview) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n", overview.gem));

    let summary = &overview.summary;
    if let Some(ref version) = summary.version {
        out.push_str(&format!("\n**Version:** {}\n", version));
    }
    if let Some(ref homepage) = summary.homepage {
        out.push_str(&format!("**Homepage:** {}\n", homepage));
    }
    if let Some(description) = summary.description.as_ref().or(summary.summary.as_ref()) {
        out.push_str(&format!("\n{}\n", description.trim()));
    }
    out.push('\n');

    if !overview.namespaces.is_empty() {
        out.push_str("## Top-level Namespaces\n");
        for ns in &overview.namespaces {
            out.push_str(&format!("- `{}` ({})\n", ns.path, ns.kind));
        }
        out.push('\n');
    }

    if !overview.classes.is_empty() {
        out.push_str("## Classes\n");
        for class in &overview.classes {
            let super_info = class
                .superclass
                .as_ref()
                .map(|s| format!(" < {}", s))
                .unwrap_or_default();
            out.push_str(&format!(
                "- `{}{}` ({} methods)\n",
                class.path, super_info, class.methods_count
            ));
            if let Some(ref doc) = class.docstring {
                out.push_str(&format!("  {}\n", excerpt(doc)));
            }
        }
        out.push('\n');
    }

    if !overview.modules.is_empty() {
        out.push_str("## Modules\n");
        for module in &overview.modules {
            out.push_str(&format!(
                "- `{}` ({} methods)\n",
                module.path, module.methods_count
            ));
            if let Some(ref doc) = module.docstring {
                out.push_str(&format!("  {}\n", excerpt(doc)));
            }
        }
        out.push('\n');
    }

    out
}

fn format_object(obj: &ObjectDoc) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {}\n\n", obj.path));
    out.push_str(&format!("**Type:** {}\n", obj.kind));
    if let Some(ref ns) = obj.namespace {
        out.push_str(&format!("**Namespace:** {}\n", ns));
    }
    out.push('\n');

    if let Some(ref doc) = obj.docstring {
        out.push_str("## Description\n");
        out.push_str(doc.trim_end());
        out.push_str("\n\n");
    }

    match obj.details {
        Some(ObjectDetails::Namespace {
            ref superclass,
            ref includes,
            ref extends,
            ref methods,
            ref attributes,
        }) => {
            if let Some(parent) = superclass {
                out.push_str(&format!("**Inherits from:** {}\n\n", parent));
            }
            if !includes.is_empty() {
                out.push_str(&format!("**Includes:** {}\n\n", includes.join(", ")));
            }
            if !extends.is_empty() {
                out.push_str(&format!("**Extends:** {}\n\n", extends.join(", ")));
            }

            if !methods.is_empty() {
                out.push_str("## Methods\n");
                for visibility in Visibility::ALL {
                    let group: Vec<_> = methods
                        .iter()
                        .filter(|m| m.visibility == visibility)
                        .collect();
                    if group.is_empty() {
                        continue;
                    }
                    out.push_str(&format!("\n### {} Methods\n", visibility.label()));
                    for method in group {
                        let return_info = method
                            .return_type
                            .as_ref()
                            .map(|types| format!(" → {}", types.join(", ")))
                            .unwrap_or_default();
                        out.push_str(&format!("- `{}`{}\n", method.signature, return_info));
                        if let Some(ref doc) = method.docstring {
                            out.push_str(&format!("  {}\n", indent_continuation(doc)));
                        }
                    }
                }
                out.push('\n');
            }

            if !attributes.is_empty() {
                out.push_str("## Attributes\n");
                for attr in attributes {
                    let mut access = Vec::new();
                    if attr.read {
                        access.push("read");
                    }
                    if attr.write {
                        access.push("write");
                    }
                    out.push_str(&format!("- `{}` ({})\n", attr.name, access.join("/")));
                    if let Some(ref doc) = attr.docstring {
                        out.push_str(&format!("  {}\n", indent_continuation(doc)));
                    }
                }
                out.push('\n');
            }
        }
        Some(ObjectDetails::Method {
            ref signature,
            ref parameters,
            visibility,
            scope,
            ref aliases,
        }) => {
            out.push_str(&format!("**Signature:** `{}`\n", signature));
            out.push_str(&format!(
                "**Visibility:** {} {} method\n",
                visibility.as_str(),
                scope.as_str()
            ));
            if !aliases.is_empty() {
                out.push_str(&format!("**Aliases:** {}\n", aliases.join(", ")));
            }
            out.push('\n');

            if !parameters.is_empty() {
                out.push_str("## Parameters\n");
                for param in parameters {
                    let default = param
                        .default
                        .as_ref()
                        .map(|d| format!(" = {}", d))
                        .unwrap_or_default();
                    out.push_str(&format!("- `{}{}`\n", param.name, default));
                }
                out.push('\n');
            }
        }
        None => {}
    }

    let examples: Vec<_> = obj
        .tags
        .iter()
        .filter(|tag| tag.tag_name == "example")
        .collect();
    if !examples.is_empty() {
        out.push_str("## Examples\n");
        for example in examples {
            if let Some(title) = example.name.as_ref().filter(|t| !t.is_empty()) {
                out.push_str(&format!("**{}**\n", title));
            }
            out.push_str("```ruby\n");
            out.push_str(example.text.trim_end());
            out.push_str("\n```\n");
        }
        out.push('\n');
    }

    if let Some(ref source) = obj.source {
        match source.line {
            Some(line) => out.push_str(&format!("**Defined in:** {}:{}\n", source.file, line)),
            None => out.push_str(&format!("**Defined in:** {}\n", source.file)),
        }
    }

    out
}

/// First line-joined 100 characters of a docstring, with `...` when cut.
fn excerpt(doc: &str) -> String {
    let flat = doc.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= OVERVIEW_DOCSTRING_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(OVERVIEW_DOCSTRING_CHARS).collect();
    format!("{}...", cut)
}

/// Keeps multi-line docstrings inside their list item.
fn indent_continuation(doc: &str) -> String {
    doc.trim_end().replace('\n', "\n  ")
}
