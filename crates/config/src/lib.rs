//! Configuration loading for the package refresh job.
//!
//! Settings are merged from three layers, later layers winning:
//!
//! 1. built-in defaults ([`Settings::default`]),
//! 2. a configuration file (TOML, YAML or JSON, picked by extension), either
//!    given explicitly or found in the platform config directory
//!    (e.g. `~/.config/tfx/config.toml`),
//! 3. environment variables prefixed with `TFX_`, using `__` to reach nested
//!    keys (`TFX_CACHE_DAYS=14`, `TFX_BUILDER__PROGRAM=/usr/bin/tfx-build`).
//!
//! Values that usually come from a CMS parameter store are parsed leniently:
//! `cache_days = "abc"` becomes `0` (and is later coerced to the default TTL
//! by the cache policy), `include_lang_name = "1"` is `true`, and
//! `projects_ids` may be a list or a comma-separated string.

pub mod error;
mod lenient;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Toml, Yaml};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "TFX_";
/// Name of the quarantine folder, inside the archives folder.
pub const ERRORS_FOLDER: &str = "errors";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Application root that relative paths are resolved against.
    pub root: PathBuf,
    /// Where generated archives are kept. Relative to [`root`](Self::root)
    /// unless absolute.
    pub archives_folder: PathBuf,
    /// Scratch directory handed to the package builder.
    pub tmp_path: PathBuf,
    /// SQLite catalog database. Relative to [`root`](Self::root) unless absolute.
    pub database: PathBuf,
    /// Number of calendar days an archive (or quarantine marker) stays valid.
    /// Not validated here: zero, negative and garbage values are coerced to
    /// the default by the cache policy.
    #[serde(deserialize_with = "lenient::integer")]
    pub cache_days: i64,
    /// Credentials and endpoint of the remote translation API.
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_url: Option<String>,
    /// Embed the language's display name in archive file names.
    #[serde(deserialize_with = "lenient::boolean")]
    pub include_lang_name: bool,
    /// Restrict the job to these project IDs. Raw values; normalised by the job.
    #[serde(deserialize_with = "lenient::strings")]
    pub projects_ids: Vec<String>,
    /// Hold an exclusive lock on the archives folder for the duration of a run.
    #[serde(deserialize_with = "lenient::boolean")]
    pub lock: bool,
    pub builder: BuilderSettings,
}
impl Default for Settings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            archives_folder: PathBuf::from("tmp/archives"),
            tmp_path: std::env::temp_dir(),
            database: PathBuf::from("catalog.sqlite"),
            cache_days: 7,
            username: None,
            password: None,
            api_url: None,
            include_lang_name: true,
            projects_ids: Vec::new(),
            lock: false,
            builder: BuilderSettings::default(),
        }
    }
}

/// The external program that builds a single archive.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BuilderSettings {
    /// Program name (looked up on `PATH`) or path.
    pub program: String,
    /// Arguments passed before the project/language arguments.
    pub args: Vec<String>,
}
impl Default for BuilderSettings {
    fn default() -> Self {
        Self {
            program: "tfx-build".to_string(),
            args: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from defaults, a configuration file, and the environment.
    ///
    /// When `file` is `None` the platform default location is tried and
    /// silently skipped if it doesn't exist; an explicitly given file must
    /// exist.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = match file {
            Some(path) if !path.is_file() => {
                exn::bail!(ErrorKind::Invalid(format!("configuration file {} does not exist", path.display())))
            },
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_file().filter(|p| p.is_file()),
        };
        let mut figment = Figment::new();
        if let Some(path) = &file {
            tracing::debug!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_file(figment, path)?;
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::extract(figment)
    }

    /// Platform-specific default configuration file.
    pub fn default_file() -> Option<PathBuf> {
        ProjectDirs::from("", "", "tfx").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
        let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        Ok(match extension.as_deref() {
            Some("toml") => figment.merge(Toml::file_exact(path)),
            Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
            Some("json") => figment.merge(Json::file_exact(path)),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
        })
    }

    fn extract(figment: Figment) -> Result<Self> {
        figment.extract::<Settings>().or_raise(|| ErrorKind::Load)
    }

    /// Absolute path of the archives folder.
    pub fn archives_dir(&self) -> Result<PathBuf> {
        Self::absolute(self.root.join(&self.archives_folder))
    }

    /// Absolute path of the quarantine folder (`<archives>/errors`).
    pub fn errors_dir(&self) -> Result<PathBuf> {
        Ok(self.archives_dir()?.join(ERRORS_FOLDER))
    }

    /// Path of the catalog database.
    pub fn database_path(&self) -> Result<PathBuf> {
        Self::absolute(self.root.join(&self.database))
    }

    fn absolute(path: PathBuf) -> Result<PathBuf> {
        std::path::absolute(&path)
            .or_raise(|| ErrorKind::Invalid(format!("cannot resolve path {}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use figment::providers::Serialized;
    use rstest::rstest;

    fn from_toml(toml: &str) -> Settings {
        Settings::extract(Figment::new().merge(Toml::string(toml))).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = from_toml("");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.cache_days, 7);
        assert!(settings.include_lang_name);
        assert!(!settings.lock);
        assert_eq!(settings.archives_folder, Path::new("tmp/archives"));
    }

    #[rstest]
    #[case("cache_days = 14", 14)]
    #[case("cache_days = 0", 0)]
    #[case("cache_days = -3", -3)]
    #[case("cache_days = \"10\"", 10)]
    #[case("cache_days = \" 5 \"", 5)]
    #[case("cache_days = \"a week\"", 0)]
    #[case("cache_days = \"10abc\"", 10)]
    #[case("cache_days = 2.9", 2)]
    fn test_lenient_cache_days(#[case] toml: &str, #[case] expected: i64) {
        assert_eq!(from_toml(toml).cache_days, expected);
    }

    #[rstest]
    #[case("include_lang_name = false", false)]
    #[case("include_lang_name = 0", false)]
    #[case("include_lang_name = 1", true)]
    #[case("include_lang_name = \"0\"", false)]
    #[case("include_lang_name = \"\"", false)]
    #[case("include_lang_name = \"yes\"", true)]
    fn test_lenient_include_lang_name(#[case] toml: &str, #[case] expected: bool) {
        assert_eq!(from_toml(toml).include_lang_name, expected);
    }

    #[rstest]
    #[case("projects_ids = [1, 2, 2]", &["1", "2", "2"])]
    #[case("projects_ids = [\"3\", 4, \"x\"]", &["3", "4", "x"])]
    #[case("projects_ids = \"5, 6,\"", &["5", "6"])]
    #[case("projects_ids = 7", &["7"])]
    #[case("projects_ids = []", &[])]
    fn test_lenient_projects_ids(#[case] toml: &str, #[case] expected: &[&str]) {
        assert_eq!(from_toml(toml).projects_ids, expected);
    }

    #[test]
    fn test_nested_builder() {
        let settings = from_toml(
            r#"
                [builder]
                program = "/opt/tfx/build"
                args = ["--quiet"]
            "#,
        );
        assert_eq!(settings.builder.program, "/opt/tfx/build");
        assert_eq!(settings.builder.args, vec!["--quiet".to_string()]);
    }

    #[test]
    fn test_paths_are_resolved_against_root() {
        let settings = from_toml("root = \"/var/www\"");
        assert_eq!(settings.archives_dir().unwrap(), Path::new("/var/www/tmp/archives"));
        assert_eq!(settings.errors_dir().unwrap(), Path::new("/var/www/tmp/archives/errors"));
        assert_eq!(settings.database_path().unwrap(), Path::new("/var/www/catalog.sqlite"));

        let settings = from_toml("root = \"/var/www\"\narchives_folder = \"/srv/archives\"");
        assert_eq!(settings.archives_dir().unwrap(), Path::new("/srv/archives"));
    }

    #[test]
    fn test_relative_root_becomes_absolute() {
        let settings = Settings::default();
        assert!(settings.archives_dir().unwrap().is_absolute());
    }

    #[test]
    fn test_load_file_and_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "tfx.toml",
                r#"
                    cache_days = 3
                    api_url = "https://www.transifex.com/api/2"
                    [builder]
                    program = "from-file"
                "#,
            )?;
            jail.set_env("TFX_CACHE_DAYS", "21");
            jail.set_env("TFX_BUILDER__ARGS", "[\"--verbose\"]");
            jail.set_env("TFX_PROJECTS_IDS", "8,9");
            let settings = Settings::load(Some(Path::new("tfx.toml"))).unwrap();
            assert_eq!(settings.cache_days, 21);
            assert_eq!(settings.api_url.as_deref(), Some("https://www.transifex.com/api/2"));
            assert_eq!(settings.builder.program, "from-file");
            assert_eq!(settings.builder.args, vec!["--verbose".to_string()]);
            assert_eq!(settings.projects_ids, vec!["8".to_string(), "9".to_string()]);
            Ok(())
        });
    }

    #[test]
    fn test_load_yaml_and_json() {
        Jail::expect_with(|jail| {
            jail.create_file("tfx.yaml", "cache_days: 4\nlock: true\n")?;
            jail.create_file("tfx.json", r#"{"cache_days": 5, "username": "bot"}"#)?;
            let yaml = Settings::load(Some(Path::new("tfx.yaml"))).unwrap();
            assert_eq!(yaml.cache_days, 4);
            assert!(yaml.lock);
            let json = Settings::load(Some(Path::new("tfx.json"))).unwrap();
            assert_eq!(json.cache_days, 5);
            assert_eq!(json.username.as_deref(), Some("bot"));
            Ok(())
        });
    }

    #[test]
    fn test_load_missing_or_unsupported_file() {
        Jail::expect_with(|jail| {
            let err = Settings::load(Some(Path::new("missing.toml"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Invalid(_)));
            jail.create_file("tfx.ini", "cache_days=1")?;
            let err = Settings::load(Some(Path::new("tfx.ini"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
            Ok(())
        });
    }

    #[test]
    fn test_type_errors_are_load_errors() {
        let figment = Figment::new().merge(Serialized::default("builder", 12));
        let err = Settings::extract(figment).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load));
    }
}
