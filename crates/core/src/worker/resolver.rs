//! Worker executable resolution.
//!
//! Strategies are tried in order and the first hit wins:
//!
//! 1. An explicit override path, if set and present on disk.
//! 2. The interpreter bundled in a local environment directory
//!    (`{env_dir}/bin/python`, or `{env_dir}\Scripts\python.exe` on Windows).
//! 3. A system interpreter that answers `--version` with exit status 0.
//!
//! Filesystem and process probing go through [`ExecutableProbe`] so the
//! resolver can be tested without touching the real system.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Argument used to check that a system interpreter is runnable.
pub const VERSION_ARG: &str = "--version";

/// Default local environment directory.
pub const DEFAULT_ENV_DIR: &str = ".venv";

/// Default system interpreters, probed in order.
pub const DEFAULT_SYSTEM_INTERPRETERS: &[&str] = &["python3", "python"];

/// Env var naming the explicit override, quoted in error messages.
pub const OVERRIDE_ENV_VAR: &str = "WORKER_EXECUTABLE";

/// How long a system interpreter gets to answer `--version`.
pub const VERSION_TIMEOUT: Duration = Duration::from_secs(5);

const VERSION_POLL: Duration = Duration::from_millis(25);

/// Where a resolved executable came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Override,
    Bundled,
    System,
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Override => "override",
            Self::Bundled => "bundled",
            Self::System => "system",
        })
    }
}

/// A usable worker executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedExecutable {
    pub path: PathBuf,
    pub source: ResolutionSource,
}

/// No strategy produced a usable executable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "No usable worker interpreter found (tried: {}). Create the environment with \
     `python3 -m venv {env_dir}` and install the worker requirements, or set \
     {} to an interpreter path",
    .tried.join(", "),
    OVERRIDE_ENV_VAR
)]
pub struct ResolutionError {
    pub env_dir: String,
    pub tried: Vec<String>,
}

/// Side-effect boundary for the resolver.
pub trait ExecutableProbe: Send + Sync {
    /// Whether `path` exists as a regular file.
    fn is_file(&self, path: &Path) -> bool;

    /// Whether running `program --version` exits with status 0.
    fn answers_version(&self, program: &str) -> bool;
}

/// Probe backed by the real filesystem and process table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl ExecutableProbe for SystemProbe {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn answers_version(&self, program: &str) -> bool {
        answers_version_within(program, VERSION_TIMEOUT)
    }
}

/// Run `program --version` and report whether it exited 0 within
/// `timeout`. A program still running at the deadline is killed.
pub fn answers_version_within(program: &str, timeout: Duration) -> bool {
    let mut child = match Command::new(program)
        .arg(VERSION_ARG)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => child,
        Err(_) => return false,
    };

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return status.success(),
            Ok(None) if Instant::now() < deadline => thread::sleep(VERSION_POLL),
            Ok(None) | Err(_) => {
                let _ = child.kill();
                let _ = child.wait();
                return false;
            }
        }
    }
}

/// Ordered-strategy executable lookup.
#[derive(Debug, Clone)]
pub struct ExecutableResolver {
    pub override_path: Option<PathBuf>,
    pub env_dir: PathBuf,
    pub system_interpreters: Vec<String>,
}

impl Default for ExecutableResolver {
    fn default() -> Self {
        Self {
            override_path: None,
            env_dir: PathBuf::from(DEFAULT_ENV_DIR),
            system_interpreters: DEFAULT_SYSTEM_INTERPRETERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ExecutableResolver {
    /// Path of the interpreter inside the local environment directory.
    pub fn bundled_interpreter(&self) -> PathBuf {
        if cfg!(windows) {
            self.env_dir.join("Scripts").join("python.exe")
        } else {
            self.env_dir.join("bin").join("python")
        }
    }

    /// Run the strategies in order and return the first usable executable.
    pub fn resolve(
        &self,
        probe: &dyn ExecutableProbe,
    ) -> Result<ResolvedExecutable, ResolutionError> {
        let mut tried = Vec::new();

        if let Some(path) = &self.override_path {
            if probe.is_file(path) {
                return Ok(ResolvedExecutable {
                    path: path.clone(),
                    source: ResolutionSource::Override,
                });
            }
            tried.push(format!("override {}", path.display()));
        }

        let bundled = self.bundled_interpreter();
        if probe.is_file(&bundled) {
            return Ok(ResolvedExecutable {
                path: bundled,
                source: ResolutionSource::Bundled,
            });
        }
        tried.push(format!("bundled {}", bundled.display()));

        for program in &self.system_interpreters {
            if probe.answers_version(program) {
                return Ok(ResolvedExecutable {
                    path: PathBuf::from(program),
                    source: ResolutionSource::System,
                });
            }
            tried.push(format!("system {program}"));
        }

        Err(ResolutionError {
            env_dir: self.env_dir.display().to_string(),
            tried,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
