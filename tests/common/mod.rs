#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use open_gemdocs::config::GemdocsConfig;
use open_gemdocs::docs::RegistryProjector;
use open_gemdocs::errors::{GemdocsError, Result};
use open_gemdocs::gems::{GemSpec, InstalledGem, PackageManager};
use open_gemdocs::mcp::GemdocsTools;
use open_gemdocs::yard::{
    AttributeFacts, DocGenerator, DocRegistry, DocServer, ObjectFacts, ObjectKind, Scope,
    ServeMode, TagFacts, Visibility,
};
use tempfile::TempDir;

/// In-memory package manager.
#[derive(Default)]
pub struct FakePackageManager {
    pub installed: Vec<InstalledGem>,
    pub specs: HashMap<String, GemSpec>,
    pub gem_dir: Option<PathBuf>,
}

impl FakePackageManager {
    pub fn with_gem(mut self, name: &str, version: &str, source: Option<&Path>) -> Self {
        self.installed.push(InstalledGem {
            name: name.to_string(),
            versions: version.to_string(),
        });
        self.specs.insert(
            name.to_string(),
            GemSpec {
                name: name.to_string(),
                version: version.to_string(),
                summary: Some(format!("The {} gem", name)),
                description: None,
                homepage: Some(format!("https://example.org/{}", name)),
                licenses: vec!["MIT".to_string()],
                authors: vec!["Jane Doe".to_string()],
                full_gem_path: source.map(Path::to_path_buf),
            },
        );
        self
    }
}

impl PackageManager for FakePackageManager {
    fn list_installed(&self) -> Result<Vec<InstalledGem>> {
        Ok(self.installed.clone())
    }

    fn find(&self, name: &str) -> Result<Option<GemSpec>> {
        Ok(self.specs.get(name).cloned())
    }

    fn gem_dir(&self) -> Option<PathBuf> {
        self.gem_dir.clone()
    }
}

/// Package manager whose every lookup panics.
pub struct PanickingPackageManager;

impl PackageManager for PanickingPackageManager {
    fn list_installed(&self) -> Result<Vec<InstalledGem>> {
        panic!("gem index is corrupt")
    }

    fn find(&self, _name: &str) -> Result<Option<GemSpec>> {
        panic!("gem index is corrupt")
    }
}

/// Generator that writes a marker directory and serves a fixed registry.
pub struct FakeGenerator {
    pub registry: DocRegistry,
    pub builds: AtomicUsize,
    pub loaded: Mutex<Vec<PathBuf>>,
}

impl FakeGenerator {
    pub fn new(registry: DocRegistry) -> Self {
        Self {
            registry,
            builds: AtomicUsize::new(0),
            loaded: Mutex::new(Vec::new()),
        }
    }

    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl DocGenerator for FakeGenerator {
    fn build_database(&self, source: &Path, output: &Path) -> Result<()> {
        if !source.exists() {
            return Err(GemdocsError::Generator {
                message: format!("no source at {}", source.display()),
            });
        }
        self.builds.fetch_add(1, Ordering::SeqCst);
        std::fs::create_dir_all(output)?;
        Ok(())
    }

    fn load(&self, database: &Path) -> Result<DocRegistry> {
        self.loaded.lock().unwrap().push(database.to_path_buf());
        Ok(self.registry.clone())
    }
}

#[derive(Default)]
pub struct FakeServerState {
    pub listening: bool,
    pub start_makes_listening: bool,
    pub start_error: Option<String>,
    pub pids: Vec<u32>,
    pub cwd: Option<PathBuf>,
    pub started_with: Vec<ServeMode>,
    pub started_in: Vec<PathBuf>,
    pub stopped: Vec<u32>,
}

/// Documentation daemon whose state lives in a mutex.
#[derive(Default)]
pub struct FakeDocServer {
    pub state: Mutex<FakeServerState>,
}

impl FakeDocServer {
    pub fn stopped() -> Self {
        Self {
            state: Mutex::new(FakeServerState {
                start_makes_listening: true,
                ..FakeServerState::default()
            }),
        }
    }

    pub fn running(pids: Vec<u32>, cwd: Option<PathBuf>) -> Self {
        Self {
            state: Mutex::new(FakeServerState {
                listening: true,
                start_makes_listening: true,
                pids,
                cwd,
                ..FakeServerState::default()
            }),
        }
    }
}

impl DocServer for FakeDocServer {
    fn is_listening(&self, _port: u16) -> bool {
        self.state.lock().unwrap().listening
    }

    fn start(&self, mode: ServeMode, _port: u16, working_dir: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = state.start_error.clone() {
            return Err(GemdocsError::DocServer { message });
        }
        state.started_with.push(mode);
        state.started_in.push(working_dir.to_path_buf());
        if state.start_makes_listening {
            state.listening = true;
            state.pids = vec![4242];
            state.cwd = Some(working_dir.to_path_buf());
        }
        Ok(())
    }

    fn stop(&self, pids: &[u32]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.stopped.extend_from_slice(pids);
        state.listening = false;
        state.pids.clear();
        Ok(())
    }

    fn owning_pids(&self, _port: u16) -> Vec<u32> {
        self.state.lock().unwrap().pids.clone()
    }

    fn working_directory(&self, _pid: u32) -> Option<PathBuf> {
        self.state.lock().unwrap().cwd.clone()
    }
}

/// Config with fast polling and no pre-generated doc directories.
pub fn test_config(doc_dirs: Vec<PathBuf>) -> GemdocsConfig {
    GemdocsConfig {
        startup_timeout_ms: 50,
        poll_interval_ms: 5,
        doc_dirs,
        ..GemdocsConfig::default()
    }
}

/// A small registry modelled on a gem with one root module and two classes.
pub fn sample_registry() -> DocRegistry {
    let mut widgets = ObjectFacts::new(ObjectKind::Module, "Widgets");
    widgets.docstring = Some("Widget toolkit.".to_string());

    let mut base = ObjectFacts::new(ObjectKind::Class, "Widgets::Base");
    base.docstring = Some("Base class for every widget.".to_string());
    base.superclass = Some("Object".to_string());
    base.includes = vec!["Comparable".to_string()];
    base.file = Some("lib/widgets/base.rb".to_string());
    base.line = Some(3);
    base.methods = vec![
        "Widgets::Base#render".to_string(),
        "Widgets::Base#name".to_string(),
        "Widgets::Base.build".to_string(),
        "Widgets::Base#layout".to_string(),
    ];
    base.attributes = vec![AttributeFacts {
        name: "name".to_string(),
        scope: Scope::Instance,
        read: Some("Widgets::Base#name".to_string()),
        write: None,
    }];
    base.tags = vec![TagFacts {
        tag_name: "example".to_string(),
        text: "Widgets::Base.build(:button)".to_string(),
        types: None,
        name: Some("Building".to_string()),
    }];

    let mut render = ObjectFacts::new(ObjectKind::Method, "Widgets::Base#render");
    render.signature = Some("def render(io, indent: 2)".to_string());
    render.parameters = vec![
        ("io".to_string(), None),
        ("indent:".to_string(), Some("2".to_string())),
    ];
    render.docstring = Some("Renders the widget.".to_string());
    render.tags = vec![TagFacts {
        tag_name: "return".to_string(),
        text: "the rendered markup".to_string(),
        types: Some(vec!["String".to_string()]),
        name: None,
    }];
    render.aliases = vec!["to_s".to_string()];

    let mut name = ObjectFacts::new(ObjectKind::Method, "Widgets::Base#name");
    name.docstring = Some("The widget's name.".to_string());

    let mut build = ObjectFacts::new(ObjectKind::Method, "Widgets::Base.build");
    build.scope = Scope::Class;
    build.parameters = vec![("kind".to_string(), None)];

    let mut layout = ObjectFacts::new(ObjectKind::Method, "Widgets::Base#layout");
    layout.visibility = Visibility::Private;
    layout.signature = Some("def layout".to_string());

    let mut button = ObjectFacts::new(ObjectKind::Class, "Widgets::Button");
    button.superclass = Some("Widgets::Base".to_string());

    let version = ObjectFacts::new(ObjectKind::Constant, "Widgets::VERSION");

    DocRegistry::from_objects(vec![
        widgets, base, render, name, build, layout, button, version,
    ])
}

/// Fully wired dispatcher over fakes, plus handles for inspecting them.
pub struct Harness {
    pub tools: GemdocsTools,
    pub generator: Arc<FakeGenerator>,
    pub server: Arc<FakeDocServer>,
    pub scratch: TempDir,
    pub working_dir: TempDir,
    pub gem_source: TempDir,
}

pub fn harness(server: FakeDocServer) -> Harness {
    build_harness(server, None)
}

/// Like [`harness`], with `packages` in place of the default fake gems.
pub fn harness_with_packages(
    server: FakeDocServer,
    packages: Arc<dyn PackageManager>,
) -> Harness {
    build_harness(server, Some(packages))
}

fn build_harness(server: FakeDocServer, packages: Option<Arc<dyn PackageManager>>) -> Harness {
    let scratch = TempDir::new().unwrap();
    let working_dir = TempDir::new().unwrap();
    let gem_source = TempDir::new().unwrap();

    let packages = packages.unwrap_or_else(|| {
        Arc::new(
            FakePackageManager::default()
                .with_gem("widgets", "1.2.0", Some(gem_source.path()))
                .with_gem("widget_extras", "0.3.1", None)
                .with_gem("rake", "13.0.6, 12.3.3", None),
        )
    });
    let generator = Arc::new(FakeGenerator::new(sample_registry()));
    let server = Arc::new(server);
    let config = test_config(Vec::new());

    let projector = RegistryProjector::new(packages.clone(), generator.clone(), &config)
        .with_scratch_dir(scratch.path());
    let yard = open_gemdocs::yard::YardServer::new(server.clone(), &config);
    let tools = GemdocsTools::new(packages, projector, yard, working_dir.path().to_path_buf());

    Harness {
        tools,
        generator,
        server,
        scratch,
        working_dir,
        gem_source,
    }
}
