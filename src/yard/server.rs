use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::GemdocsConfig;
use crate::errors::{GemdocsError, Result};

/// Which gems `yard server` should serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeMode {
    /// Gems pinned by the `Gemfile.lock` in the working directory (`--gemfile`).
    Gemfile,
    /// Every installed gem (`--gems`).
    Gems,
}

impl ServeMode {
    /// Picks `Gemfile` when `dir` contains a `Gemfile.lock`.
    pub fn detect(dir: &Path) -> Self {
        if dir.join("Gemfile.lock").exists() {
            ServeMode::Gemfile
        } else {
            ServeMode::Gems
        }
    }

    pub fn as_flag(&self) -> &'static str {
        match self {
            ServeMode::Gemfile => "--gemfile",
            ServeMode::Gems => "--gems",
        }
    }
}

/// Low-level control over the documentation daemon process.
pub trait DocServer: Send + Sync {
    fn is_listening(&self, port: u16) -> bool;

    /// Launches the daemon from `working_dir` in the background; returns once
    /// it has forked. `--gemfile` mode reads the `Gemfile.lock` found there.
    fn start(&self, mode: ServeMode, port: u16, working_dir: &Path) -> Result<()>;

    fn stop(&self, pids: &[u32]) -> Result<()>;

    /// PIDs of processes listening on `port`.
    fn owning_pids(&self, port: u16) -> Vec<u32>;

    fn working_directory(&self, pid: u32) -> Option<PathBuf>;
}

/// `DocServer` that drives `yard server --daemon` and inspects it with OS tools.
#[derive(Debug, Clone)]
pub struct YardProcess {
    yard_bin: String,
    host: String,
}

impl YardProcess {
    pub fn new(config: &GemdocsConfig) -> Self {
        Self {
            yard_bin: config.yard_bin.clone(),
            host: config.yard_host.clone(),
        }
    }
}

impl DocServer for YardProcess {
    /// True when any address `yard_host` resolves to accepts a connection.
    fn is_listening(&self, port: u16) -> bool {
        let addrs = match (self.host.as_str(), port).to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                debug!(host = %self.host, error = %e, "cannot resolve yard host");
                return false;
            }
        };
        addrs
            .into_iter()
            .any(|addr| TcpStream::connect_timeout(&addr, Duration::from_millis(250)).is_ok())
    }

    fn start(&self, mode: ServeMode, port: u16, working_dir: &Path) -> Result<()> {
        info!(port, mode = mode.as_flag(), dir = %working_dir.display(), "starting yard server");
        let output = Command::new(&self.yard_bin)
            .args(["server", "--daemon", "--port", &port.to_string(), mode.as_flag()])
            .current_dir(working_dir)
            .output()
            .map_err(|e| GemdocsError::DocServer {
                message: format!("failed to spawn {}: {}", self.yard_bin, e),
            })?;

        if !output.status.success() {
            return Err(GemdocsError::DocServer {
                message: format!(
                    "yard server exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(())
    }

    fn stop(&self, pids: &[u32]) -> Result<()> {
        if pids.is_empty() {
            return Ok(());
        }
        info!(?pids, "stopping yard server processes");
        let status = Command::new("kill")
            .args(pids.iter().map(|pid| pid.to_string()))
            .status()
            .map_err(|e| GemdocsError::DocServer {
                message: format!("failed to spawn kill: {}", e),
            })?;

        if !status.success() {
            return Err(GemdocsError::DocServer {
                message: format!("kill exited with {}", status),
            });
        }
        Ok(())
    }

    fn owning_pids(&self, port: u16) -> Vec<u32> {
        let output = Command::new("lsof")
            .args(["-t", &format!("-iTCP:{}", port), "-sTCP:LISTEN"])
            .output();

        match output {
            Ok(out) => parse_pid_list(&String::from_utf8_lossy(&out.stdout)),
            Err(e) => {
                debug!(error = %e, "lsof unavailable");
                Vec::new()
            }
        }
    }

    fn working_directory(&self, pid: u32) -> Option<PathBuf> {
        if let Ok(path) = std::fs::read_link(format!("/proc/{}/cwd", pid)) {
            return Some(path);
        }

        // No procfs (macOS): ask lsof for the cwd descriptor.
        let output = Command::new("lsof")
            .args(["-a", "-p", &pid.to_string(), "-d", "cwd", "-Fn"])
            .output()
            .ok()?;
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .find_map(|line| line.strip_prefix('n').map(PathBuf::from))
    }
}

/// Parses one PID per line, ignoring anything that is not a number.
pub fn parse_pid_list(output: &str) -> Vec<u32> {
    let mut pids: Vec<u32> = output
        .lines()
        .filter_map(|line| line.trim().parse().ok())
        .collect();
    pids.sort_unstable();
    pids.dedup();
    pids
}

/// Result of asking for the daemon to be running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// It was already listening; carries the directory it serves, if known.
    AlreadyRunning { serving_dir: Option<PathBuf> },
    /// We launched it and it began listening within the startup timeout.
    Started,
}

/// Snapshot of the daemon's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    pub running: bool,
    pub pids: Vec<u32>,
    pub serving_dir: Option<PathBuf>,
}

/// Lifecycle manager for the yard documentation daemon on its well-known port.
#[derive(Clone)]
pub struct YardServer {
    process: Arc<dyn DocServer>,
    port: u16,
    base_url: String,
    startup_timeout: Duration,
    poll_interval: Duration,
}

impl YardServer {
    pub fn new(process: Arc<dyn DocServer>, config: &GemdocsConfig) -> Self {
        Self {
            process,
            port: config.yard_port,
            base_url: config.yard_base_url(),
            startup_timeout: config.startup_timeout(),
            poll_interval: config.poll_interval(),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_running(&self) -> bool {
        self.process.is_listening(self.port)
    }

    /// Directory served by the first process owning the port.
    pub fn serving_directory(&self) -> Option<PathBuf> {
        self.process
            .owning_pids(self.port)
            .into_iter()
            .find_map(|pid| self.process.working_directory(pid))
    }

    pub fn status(&self) -> ServerStatus {
        if !self.is_running() {
            return ServerStatus {
                running: false,
                pids: Vec::new(),
                serving_dir: None,
            };
        }
        ServerStatus {
            running: true,
            pids: self.process.owning_pids(self.port),
            serving_dir: self.serving_directory(),
        }
    }

    /// Starts the daemon unless it is already listening.
    ///
    /// Never treats a running daemon as a conflict. Returns a `DocServer` error
    /// when the daemon is still not listening after the startup timeout.
    pub fn ensure_running(&self, working_dir: &Path) -> Result<StartOutcome> {
        if self.is_running() {
            return Ok(StartOutcome::AlreadyRunning {
                serving_dir: self.serving_directory(),
            });
        }

        self.process.start(ServeMode::detect(working_dir), self.port, working_dir)?;
        if self.wait_until_ready() {
            Ok(StartOutcome::Started)
        } else {
            warn!(port = self.port, timeout = ?self.startup_timeout, "yard server did not start listening");
            Err(GemdocsError::DocServer {
                message: format!(
                    "server not listening on port {} after {}ms",
                    self.port,
                    self.startup_timeout.as_millis()
                ),
            })
        }
    }

    /// Polls the port until it accepts connections or the timeout elapses.
    pub fn wait_until_ready(&self) -> bool {
        let deadline = Instant::now() + self.startup_timeout;
        loop {
            if self.is_running() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(self.poll_interval);
        }
    }

    /// Stops the daemon; returns the PIDs that were signalled (empty if none).
    pub fn stop(&self) -> Result<Vec<u32>> {
        let pids = self.process.owning_pids(self.port);
        if pids.is_empty() {
            debug!(port = self.port, "no yard server processes to stop");
            return Ok(pids);
        }
        self.process.stop(&pids)?;
        Ok(pids)
    }

    /// Documentation URL for a gem, optionally narrowed to `Class::Path`.
    pub fn docs_url(&self, gem_name: &str, object_path: Option<&str>) -> String {
        let mut url = format!("{}/docs/{}", self.base_url, gem_name);
        if let Some(path) = object_path.filter(|p| !p.is_empty()) {
            url.push('/');
            url.push_str(&path.replace("::", "/"));
        }
        url
    }
}
