//! Builds archives by running an external program.
//!
//! The program is invoked as
//! `<program> [args...] --project <id> --language <code>` with the build
//! options passed as `TFX_BUILD_*` environment variables. On success it
//! prints the path of the archive it wrote as the last line of its standard
//! output (relative paths are taken relative to the archives folder). Any
//! non-zero exit is a failed build, with standard error as the reason.

use async_trait::async_trait;
use exn::ResultExt;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tfx_catalog::Project;
use tfx_packages::builder::{BuildErrorKind, BuildResult};
use tfx_packages::{BuildOptions, BuildOutcome, PackageBuilder};
use tokio::process::Command;
use tracing::instrument;

pub(crate) struct CommandBuilder {
    program: String,
    args: Vec<String>,
}
impl CommandBuilder {
    pub(crate) fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    /// Resolve the program through `PATH` (or as a path, if it contains a
    /// separator).
    fn resolve(&self) -> BuildResult<PathBuf> {
        which::which(&self.program).or_raise(|| BuildErrorKind::NotFound(self.program.clone()))
    }

    fn command(&self, program: &Path, project: &Project, language: &str, options: &BuildOptions) -> Command {
        let mut command = Command::new(program);
        command
            .args(&self.args)
            .arg("--project")
            .arg(project.id.to_string())
            .arg("--language")
            .arg(language)
            .env("TFX_BUILD_FILENAME", &project.filename)
            .env("TFX_BUILD_CACHE_DAYS", options.cache_days.to_string())
            .env("TFX_BUILD_TMP_PATH", &options.tmp_path)
            .env("TFX_BUILD_ARCHIVES_FOLDER", &options.archives_folder)
            .env("TFX_BUILD_INCLUDE_LANG_NAME", if options.include_lang_name { "1" } else { "0" })
            .stdin(Stdio::null())
            .kill_on_drop(true);
        for (key, value) in [
            ("TFX_BUILD_USERNAME", &options.username),
            ("TFX_BUILD_PASSWORD", &options.password),
            ("TFX_BUILD_URL", &options.url),
        ] {
            if let Some(value) = value {
                command.env(key, value);
            }
        }
        command
    }

    fn interpret(output: &Output, archives_folder: &Path) -> BuildOutcome {
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let reason = if stderr.is_empty() { format!("builder exited with {}", output.status) } else { stderr };
            return BuildOutcome::Failed(reason);
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        match stdout.lines().map(str::trim).rfind(|line| !line.is_empty()) {
            Some(line) => BuildOutcome::Built(archives_folder.join(line)),
            None => BuildOutcome::Failed("builder exited successfully without reporting an archive".to_string()),
        }
    }
}

#[async_trait]
impl PackageBuilder for CommandBuilder {
    #[instrument(skip_all, fields(program = %self.program, project_id = project.id, language = %language))]
    async fn build(&self, project: &Project, language: &str, options: &BuildOptions) -> BuildResult<BuildOutcome> {
        let program = self.resolve()?;
        tracing::debug!(path = %program.display(), "Running package builder");
        let output = self
            .command(&program, project, language, options)
            .output()
            .await
            .or_raise(|| BuildErrorKind::Spawn)?;
        Ok(Self::interpret(&output, &options.archives_folder))
    }
}
