// Runtime client discovery script for the scheduler's worker
//
// The fragment produced here is never executed by this process. It runs on the
// scheduler's worker as part of the event's shell script.

use crate::config::RuntimeConfig;
use crate::shell::{join, quote, quote_minimal};

/// Well-known locations of the docker client on the worker
pub const DEFAULT_FALLBACK_PATHS: &[&str] = &[
    "/qnap-bin/docker",
    "/usr/local/bin/docker",
    "/usr/bin/docker/docker",
];

/// Worker-local path the discovered client is copied to before use
pub const DEFAULT_SCRATCH_PATH: &str = "/tmp/docker";

/// Locates a container runtime client on the worker and stages a copy of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeLocator {
    preferred_path: String,
    fallback_paths: Vec<String>,
    scratch_path: String,
}

impl RuntimeLocator {
    pub fn new(
        preferred_path: impl Into<String>,
        fallback_paths: Vec<String>,
        scratch_path: impl Into<String>,
    ) -> Self {
        Self {
            preferred_path: preferred_path.into(),
            fallback_paths,
            scratch_path: scratch_path.into(),
        }
    }

    pub fn from_settings(settings: &RuntimeConfig) -> Self {
        Self::new(
            settings.binary_path.clone(),
            settings.fallback_paths.clone(),
            settings.scratch_path.clone(),
        )
    }

    /// Path of the staged client; the exec command must run this copy
    pub fn scratch_path(&self) -> &str {
        &self.scratch_path
    }

    /// Probe order: the preferred path as a file, the preferred path as a
    /// directory holding `docker`, then the fallbacks. First occurrence wins.
    pub fn candidates(&self) -> Vec<String> {
        let as_dir = format!("{}/docker", self.preferred_path.trim_end_matches('/'));
        let mut seen: Vec<String> = Vec::new();
        let all = std::iter::once(self.preferred_path.clone())
            .chain(std::iter::once(as_dir))
            .chain(self.fallback_paths.iter().cloned());
        for candidate in all {
            if candidate.is_empty() || seen.contains(&candidate) {
                continue;
            }
            seen.push(candidate);
        }
        seen
    }

    /// Shell fragment that finds the first candidate that is a regular file,
    /// then replaces whatever sits at the scratch path with an executable copy.
    ///
    /// Exits with status 1 and a diagnostic on stderr when nothing is found.
    pub fn build_fragment(&self) -> String {
        let candidates = self.candidates();
        let probe_list = join(&candidates);
        let not_found = quote(format!(
            "docker client not found (checked: {})",
            candidates.join(", ")
        ));
        let scratch = quote_minimal(&self.scratch_path);

        [
            "FOUND=\"\"".to_string(),
            format!(
                "for C in {}; do if [ -f \"$C\" ]; then FOUND=\"$C\"; break; fi; done",
                probe_list
            ),
            format!(
                "if [ -z \"$FOUND\" ]; then echo {} >&2; exit 1; fi",
                not_found
            ),
            // A stale directory at the scratch path (e.g. from a bad mount) is removed too
            format!("if [ -d {0} ]; then rm -rf {0}; fi", scratch),
            format!("rm -f {}", scratch),
            format!("cp -f \"$FOUND\" {0} && chmod +x {0}", scratch),
        ]
        .join("; ")
    }
}
