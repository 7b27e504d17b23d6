//! MCP tool definitions and dispatch.
//!
//! Every tool is a variant of [`Tool`]. Its result is always a [`ToolResult`]
//! envelope: failures are reported with `isError: true` and a readable
//! message rather than as JSON-RPC errors.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::GemdocsConfig;
use crate::docs::{format_docs_as_markdown, RegistryProjector};
use crate::errors::{GemdocsError, Result};
use crate::gems::{filter_gems, GemCli, PackageManager};
use crate::yard::{StartOutcome, YardCli, YardProcess, YardServer};

/// Maximum character length for a tool response before truncation.
const MAX_RESPONSE_CHARS: usize = 15_000;

/// A tool definition exposed by the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema describing the tool's input parameters.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// The tools this server offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    SearchGems,
    GetGemInfo,
    StartYardServer,
    StopYardServer,
    GetYardServerStatus,
    GetGemDocumentationUrl,
    FetchGemDocs,
}

impl Tool {
    /// Every tool, in catalog order.
    pub const ALL: [Tool; 7] = [
        Tool::SearchGems,
        Tool::GetGemInfo,
        Tool::StartYardServer,
        Tool::StopYardServer,
        Tool::GetYardServerStatus,
        Tool::GetGemDocumentationUrl,
        Tool::FetchGemDocs,
    ];

    /// Wire name used in `tools/list` and `tools/call`.
    pub fn name(self) -> &'static str {
        match self {
            Tool::SearchGems => "search_gems",
            Tool::GetGemInfo => "get_gem_info",
            Tool::StartYardServer => "start_yard_server",
            Tool::StopYardServer => "stop_yard_server",
            Tool::GetYardServerStatus => "get_yard_server_status",
            Tool::GetGemDocumentationUrl => "get_gem_documentation_url",
            Tool::FetchGemDocs => "fetch_gem_docs",
        }
    }

    pub fn from_name(name: &str) -> Option<Tool> {
        Tool::ALL.into_iter().find(|tool| tool.name() == name)
    }

    fn description(self) -> &'static str {
        match self {
            Tool::SearchGems => "Search for installed Ruby gems",
            Tool::GetGemInfo => {
                "Get information about a specific gem including version and summary"
            }
            Tool::StartYardServer => "Start the Yard documentation server",
            Tool::StopYardServer => "Stop the Yard documentation server",
            Tool::GetYardServerStatus => "Check if the Yard documentation server is running",
            Tool::GetGemDocumentationUrl => {
                "Get the local documentation URL for a gem (Note: Use fetch_gem_docs instead to get actual documentation content)"
            }
            Tool::FetchGemDocs => {
                "Fetch structured documentation content for a gem or specific class/module. Returns formatted documentation with methods, attributes, parameters, and examples. Use this instead of fetching URLs directly."
            }
        }
    }

    fn input_schema(self) -> Value {
        match self {
            Tool::SearchGems => json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query for gem names (partial match supported)"
                    }
                },
                "required": ["query"]
            }),
            Tool::GetGemInfo => json!({
                "type": "object",
                "properties": {
                    "gem_name": {
                        "type": "string",
                        "description": "Exact name of the gem"
                    }
                },
                "required": ["gem_name"]
            }),
            Tool::StartYardServer | Tool::StopYardServer | Tool::GetYardServerStatus => json!({
                "type": "object",
                "properties": {}
            }),
            Tool::GetGemDocumentationUrl => json!({
                "type": "object",
                "properties": {
                    "gem_name": {
                        "type": "string",
                        "description": "Name of the gem"
                    },
                    "class_name": {
                        "type": "string",
                        "description": "Optional: specific class or module name"
                    }
                },
                "required": ["gem_name"]
            }),
            Tool::FetchGemDocs => json!({
                "type": "object",
                "properties": {
                    "gem_name": {
                        "type": "string",
                        "description": "Name of the gem"
                    },
                    "path": {
                        "type": "string",
                        "description": "Optional: specific class or module path (e.g., \"FactoryBot::Trait\" or \"ActiveRecord::Base\")"
                    }
                },
                "required": ["gem_name"]
            }),
        }
    }

    pub fn definition(self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Returns the list of all tool definitions exposed by this MCP server.
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    Tool::ALL.into_iter().map(Tool::definition).collect()
}

/// One content block of a tool result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

/// The `{content, isError?}` envelope returned by every tool call.
///
/// `isError` is only serialized when it is `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent {
                kind: "text".to_string(),
                text: text.into(),
            }],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::text(text)
        }
    }

    /// Text of the first content block.
    pub fn first_text(&self) -> &str {
        self.content.first().map_or("", |c| c.text.as_str())
    }
}

/// Dispatches tool calls against the gem, documentation and daemon backends.
pub struct GemdocsTools {
    packages: Arc<dyn PackageManager>,
    projector: RegistryProjector,
    yard: YardServer,
    working_dir: PathBuf,
}

impl GemdocsTools {
    pub fn new(
        packages: Arc<dyn PackageManager>,
        projector: RegistryProjector,
        yard: YardServer,
        working_dir: PathBuf,
    ) -> Self {
        Self {
            packages,
            projector,
            yard,
            working_dir,
        }
    }

    /// Wires the real `gem`, `yardoc` and `yard server` backends.
    pub fn from_config(config: &GemdocsConfig, working_dir: PathBuf) -> Self {
        let packages: Arc<dyn PackageManager> = Arc::new(GemCli::new(config));
        let projector =
            RegistryProjector::new(packages.clone(), Arc::new(YardCli::new(config)), config);
        let yard = YardServer::new(Arc::new(YardProcess::new(config)), config);
        Self::new(packages, projector, yard, working_dir)
    }

    pub fn yard(&self) -> &YardServer {
        &self.yard
    }

    /// Runs a tool by wire name. Never fails: every error becomes an
    /// `isError` envelope.
    pub fn call(&self, tool_name: &str, args: &Value) -> ToolResult {
        let Some(tool) = Tool::from_name(tool_name) else {
            warn!(tool = tool_name, "unknown tool requested");
            return ToolResult::error(format!("Unknown tool: {}", tool_name));
        };

        debug!(tool = tool_name, %args, "calling tool");
        match self.dispatch(tool, args) {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = tool_name, error = %e, "tool failed");
                ToolResult::error(e.to_string())
            }
        }
    }

    fn dispatch(&self, tool: Tool, args: &Value) -> Result<ToolResult> {
        match tool {
            Tool::SearchGems => self.search_gems(args),
            Tool::GetGemInfo => self.get_gem_info(args),
            Tool::StartYardServer => Ok(self.start_yard_server()),
            Tool::StopYardServer => self.stop_yard_server(),
            Tool::GetYardServerStatus => Ok(self.get_yard_server_status()),
            Tool::GetGemDocumentationUrl => self.get_gem_documentation_url(args),
            Tool::FetchGemDocs => self.fetch_gem_docs(args),
        }
    }

    fn search_gems(&self, args: &Value) -> Result<ToolResult> {
        let Some(query) = optional_str(args, "query") else {
            return Ok(ToolResult::error("Query cannot be empty"));
        };

        let installed = self.packages.list_installed()?;
        let matches = filter_gems(&installed, query);
        if matches.is_empty() {
            return Ok(ToolResult::text(format!(
                "No gems found matching '{}'",
                query
            )));
        }

        let listing: Vec<String> = matches
            .iter()
            .map(|gem| format!("• {} ({})", gem.name, gem.versions))
            .collect();
        Ok(ToolResult::text(format!(
            "Found {} gem(s):\n{}",
            matches.len(),
            listing.join("\n")
        )))
    }

    fn get_gem_info(&self, args: &Value) -> Result<ToolResult> {
        let gem_name = required_str(args, "gem_name")?;

        let spec = match self.packages.find(gem_name)? {
            Some(spec) => spec,
            None => {
                return Ok(ToolResult::error(format!(
                    "Gem '{}' not found: could not find '{}' among installed gems",
                    gem_name, gem_name
                )))
            }
        };

        let mut info = vec![format!("**{}** v{}", spec.name, spec.version), String::new()];
        if let Some(ref summary) = spec.summary {
            info.push(format!("**Summary:** {}", summary));
        }
        if let Some(ref description) = spec.description {
            if spec.summary.as_ref() != Some(description) {
                info.push(format!("**Description:** {}", description));
            }
        }
        if let Some(ref homepage) = spec.homepage {
            info.push(format!("**Homepage:** {}", homepage));
        }
        if !spec.licenses.is_empty() {
            info.push(format!("**License:** {}", spec.licenses.join(", ")));
        }
        if !spec.authors.is_empty() {
            info.push(format!("**Authors:** {}", spec.authors.join(", ")));
        }

        Ok(ToolResult::text(info.join("\n")))
    }

    fn start_yard_server(&self) -> ToolResult {
        let port = self.yard.port();
        match self.yard.ensure_running(&self.working_dir) {
            Ok(StartOutcome::AlreadyRunning {
                serving_dir: Some(dir),
            }) if !same_dir(&dir, &self.working_dir) => ToolResult::text(format!(
                "Yard server is already running in a different directory:\n\
                 Running in: {}\n\
                 Current dir: {}\n\n\
                 The server is serving gems from '{}'.\n\
                 To serve gems from the current directory, stop the server first with 'stop_yard_server' tool.",
                dir.display(),
                self.working_dir.display(),
                dir.display()
            )),
            Ok(StartOutcome::AlreadyRunning { .. }) => {
                ToolResult::text(format!("Yard server is already running on port {}", port))
            }
            Ok(StartOutcome::Started) => {
                ToolResult::text(format!("Yard server started successfully on port {}", port))
            }
            Err(e) => ToolResult::error(format!("Failed to start Yard server: {}", e)),
        }
    }

    fn stop_yard_server(&self) -> Result<ToolResult> {
        if !self.yard.is_running() {
            return Ok(ToolResult::text("Yard server is not running"));
        }
        let pids = self.yard.stop()?;
        if pids.is_empty() {
            return Ok(ToolResult::text(
                "Yard server is listening but no owning process was found to stop",
            ));
        }
        Ok(ToolResult::text(format!(
            "Yard server stopped successfully (PID: {})",
            join_pids(&pids)
        )))
    }

    fn get_yard_server_status(&self) -> ToolResult {
        let status = self.yard.status();
        if !status.running {
            return ToolResult::text("Yard server is not running");
        }

        let pids = if status.pids.is_empty() {
            "unknown".to_string()
        } else {
            join_pids(&status.pids)
        };
        let mut text = format!(
            "Yard server is running (PID: {}) on port {}",
            pids,
            self.yard.port()
        );
        if let Some(ref dir) = status.serving_dir {
            text.push_str(&format!("\nServing from: {}", dir.display()));
            if !same_dir(dir, &self.working_dir) {
                text.push_str(&format!(
                    "\nCurrent directory: {}\n\nNote: The server is serving gems from a different directory.",
                    self.working_dir.display()
                ));
            }
        }
        ToolResult::text(text)
    }

    fn get_gem_documentation_url(&self, args: &Value) -> Result<ToolResult> {
        let gem_name = required_str(args, "gem_name")?;
        let class_name = optional_str(args, "class_name");

        if let Err(e) = self.yard.ensure_running(&self.working_dir) {
            warn!(error = %e, "documentation server unavailable; returning URL anyway");
        }

        let url = self.yard.docs_url(gem_name, class_name);
        let path_hint = class_name.unwrap_or("the gem overview");
        Ok(ToolResult::text(format!(
            "Documentation URL: {}\n\n\
             **Tip:** Instead of fetching this URL directly, use the `fetch_gem_docs` tool with:\n\
             - gem_name: \"{}\"\n\
             - path: \"{}\" (if you want specific class documentation)\n\n\
             This will give you structured documentation for {}.",
            url,
            gem_name,
            class_name.unwrap_or(""),
            path_hint
        )))
    }

    fn fetch_gem_docs(&self, args: &Value) -> Result<ToolResult> {
        let gem_name = required_str(args, "gem_name")?;
        let path = optional_str(args, "path");

        let projection = self.projector.project(gem_name, path)?;
        let output = format_docs_as_markdown(&projection);
        Ok(ToolResult::text(truncate_response(&output)))
    }
}

/// A non-empty string argument.
fn optional_str<'a>(args: &'a Value, name: &str) -> Option<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn required_str<'a>(args: &'a Value, name: &str) -> Result<&'a str> {
    optional_str(args, name).ok_or_else(|| GemdocsError::MissingArgument {
        name: name.to_string(),
    })
}

fn join_pids(pids: &[u32]) -> String {
    pids.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Compares directories after resolving symlinks where possible.
fn same_dir(a: &Path, b: &Path) -> bool {
    let canonical = |p: &Path| std::fs::canonicalize(p).unwrap_or_else(|_| p.to_path_buf());
    canonical(a) == canonical(b)
}

/// Truncates a string to the maximum response character limit, appending
/// a truncation notice if necessary.
fn truncate_response(s: &str) -> String {
    if s.len() <= MAX_RESPONSE_CHARS {
        s.to_string()
    } else {
        let mut end = MAX_RESPONSE_CHARS;
        while !s.is_char_boundary(end) && end > 0 {
            end -= 1;
        }
        format!("{}\n\n[... truncated at {} chars]", &s[..end], end)
    }
}
