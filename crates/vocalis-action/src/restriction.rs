//! Running-process checks for `restricted` bindings.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use vocalis_core::{RestrictedProcess, RestrictionPolicy};

/// Source of the executable paths of currently running processes.
///
/// Called on every restricted dispatch; implementations must not cache.
pub trait ProcessProbe: Send + Sync {
    fn running_executables(&self) -> io::Result<Vec<PathBuf>>;
}

/// Probe backed by the operating system's process table.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessProbe;

impl ProcessProbe for SystemProcessProbe {
    #[cfg(target_os = "linux")]
    fn running_executables(&self) -> io::Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir("/proc")?.flatten() {
            let file_name = entry.file_name();
            match file_name.to_str() {
                Some(name) if name.chars().all(|c| c.is_ascii_digit()) => {}
                _ => continue,
            }
            // Kernel threads and other users' processes have no readable exe.
            if let Ok(exe) = std::fs::read_link(entry.path().join("exe")) {
                paths.push(exe);
            }
        }
        Ok(paths)
    }

    #[cfg(all(unix, not(target_os = "linux")))]
    fn running_executables(&self) -> io::Result<Vec<PathBuf>> {
        let output = std::process::Command::new("ps").args(["-axo", "comm="]).output()?;
        Ok(lines_to_paths(&output.stdout))
    }

    #[cfg(windows)]
    fn running_executables(&self) -> io::Result<Vec<PathBuf>> {
        let output = std::process::Command::new("powershell")
            .args([
                "-NoProfile",
                "-Command",
                "Get-Process | Where-Object { $_.Path } | ForEach-Object { $_.Path }",
            ])
            .output()?;
        Ok(lines_to_paths(&output.stdout))
    }
}

#[cfg(not(target_os = "linux"))]
fn lines_to_paths(stdout: &[u8]) -> Vec<PathBuf> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Decides whether a restricting process is currently running.
#[derive(Clone)]
pub struct RestrictionChecker {
    policy: RestrictionPolicy,
    probe: Arc<dyn ProcessProbe>,
}

impl RestrictionChecker {
    pub fn new(policy: RestrictionPolicy, probe: Arc<dyn ProcessProbe>) -> Self {
        Self { policy, probe }
    }

    pub fn with_system_probe(policy: RestrictionPolicy) -> Self {
        Self::new(policy, Arc::new(SystemProcessProbe))
    }

    /// Same probe, different policy. Used when the command file reloads.
    pub fn with_policy(&self, policy: RestrictionPolicy) -> Self {
        Self {
            policy,
            probe: Arc::clone(&self.probe),
        }
    }

    pub fn policy(&self) -> &RestrictionPolicy {
        &self.policy
    }

    /// First configured process that is running, if any.
    ///
    /// Paths compare case-insensitively. An unresolvable entry always
    /// matches. If the process table cannot be read, nothing matches.
    pub fn blocking_process(&self) -> Option<String> {
        if self.policy.is_empty() {
            return None;
        }
        if self
            .policy
            .processes
            .iter()
            .any(|p| matches!(p, RestrictedProcess::Unresolvable))
        {
            return Some("<unresolvable process entry>".to_string());
        }

        let running = match self.probe.running_executables() {
            Ok(running) => running,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to list running processes");
                return None;
            }
        };
        let running: Vec<String> = running
            .iter()
            .map(|p| p.to_string_lossy().to_lowercase())
            .collect();

        self.policy.processes.iter().find_map(|process| match process {
            RestrictedProcess::Path(path) => {
                let wanted = path.to_lowercase();
                running.iter().any(|r| *r == wanted).then(|| path.clone())
            }
            RestrictedProcess::Unresolvable => None,
        })
    }
}
