// Remote-exec command construction
//
// Turns a script selection into the single shell command the scheduler's
// worker runs: stage the runtime client, then exec into the target container.

use crate::config::RuntimeConfig;
use crate::locator::RuntimeLocator;
use crate::shell::{join, quote, quote_minimal};
use std::path::{Path, PathBuf};

/// A script run inside the target container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInvocation {
    /// Operator-configured interpreter command, emitted verbatim
    pub interpreter: String,
    /// Absolute path as seen inside the target container
    pub script_path: PathBuf,
    pub arguments: Vec<String>,
}

impl ScriptInvocation {
    pub fn new(
        interpreter: impl Into<String>,
        script_path: impl Into<PathBuf>,
        arguments: Vec<String>,
    ) -> Self {
        Self {
            interpreter: interpreter.into(),
            script_path: script_path.into(),
            arguments,
        }
    }

    /// `<interpreter> '<script>' '<arg>'...`
    pub fn inner_command(&self) -> String {
        let mut words = vec![self.script_path.display().to_string()];
        words.extend(self.arguments.iter().cloned());
        format!("{} {}", self.interpreter, join(&words))
    }
}

/// Everything needed to run an invocation inside another container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteExecSpec {
    pub target_container: String,
    pub locator: RuntimeLocator,
    pub invocation: ScriptInvocation,
}

impl RemoteExecSpec {
    /// `<prep fragment> && <scratch> exec -i '<container>' bash -lc '<inner>'`
    ///
    /// The inner command is quoted as a whole a second time so `bash -lc`
    /// receives it as one argument.
    pub fn build(&self) -> String {
        let exec = format!(
            "{} exec -i {} bash -lc {}",
            quote_minimal(self.locator.scratch_path()),
            quote(&self.target_container),
            quote(self.invocation.inner_command())
        );
        format!("{} && {}", self.locator.build_fragment(), exec)
    }
}

/// Builds commands for the configured container, interpreter and client paths
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    target_container: String,
    interpreter: String,
    locator: RuntimeLocator,
}

impl CommandBuilder {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            target_container: config.container.clone(),
            interpreter: config.interpreter.clone(),
            locator: RuntimeLocator::from_settings(config),
        }
    }

    pub fn spec(&self, script_path: &Path, arguments: &[String]) -> RemoteExecSpec {
        RemoteExecSpec {
            target_container: self.target_container.clone(),
            locator: self.locator.clone(),
            invocation: ScriptInvocation::new(
                self.interpreter.clone(),
                script_path,
                arguments.to_vec(),
            ),
        }
    }

    pub fn build(&self, script_path: &Path, arguments: &[String]) -> String {
        self.spec(script_path, arguments).build()
    }
}
