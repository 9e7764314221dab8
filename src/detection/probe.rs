//! Compiler version probe with 64-bit to 32-bit fallback.

use super::parser::parse_javac_banner;
use crate::host::{CommandOutput, Host};
use crate::Architecture;
use std::path::Path;

const PROBE_64BIT_ARGS: &[&str] = &["-J-d64", "-version"];
const PROBE_ARGS: &[&str] = &["-version"];

/// Outcome of a successful compiler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CompilerProbe {
    pub(crate) architecture: Architecture,
    pub(crate) output: CommandOutput,
}

impl CompilerProbe {
    /// Version and build from the banner.
    ///
    /// The compiler writes its banner to stderr; newer releases write it to
    /// stdout instead, which is consulted only when stderr has no match.
    pub(crate) fn version_and_build(&self) -> Option<(String, String)> {
        parse_javac_banner(&self.output.stderr).or_else(|| parse_javac_banner(&self.output.stdout))
    }
}

/// Run the compiler with `-version`, first requesting a 64-bit VM.
///
/// Any failure of the first invocation (spawn error or non-zero exit) is taken
/// to mean the 64-bit flag is unsupported, and the probe is retried once
/// without it, recording a 32-bit architecture.
///
/// # Returns
///
/// `None` if neither invocation succeeded.
pub(crate) async fn probe_compiler(host: &dyn Host, javac: &Path) -> Option<CompilerProbe> {
    match host.run(javac, PROBE_64BIT_ARGS).await {
        Ok(output) if output.success => {
            return Some(CompilerProbe {
                architecture: Architecture::Bits64,
                output,
            })
        }
        Ok(_) => {
            tracing::debug!(javac = %javac.display(), "64-bit probe exited non-zero, retrying")
        }
        Err(e) => {
            tracing::debug!(
                javac = %javac.display(),
                error = %e,
                "64-bit probe failed to spawn, retrying"
            )
        }
    }

    match host.run(javac, PROBE_ARGS).await {
        Ok(output) if output.success => Some(CompilerProbe {
            architecture: Architecture::Bits32,
            output,
        }),
        Ok(output) => {
            tracing::debug!(
                javac = %javac.display(),
                stderr = output.stderr.trim(),
                "compiler probe exited non-zero"
            );
            None
        }
        Err(e) => {
            tracing::debug!(javac = %javac.display(), error = %e, "compiler probe failed to spawn");
            None
        }
    }
}
