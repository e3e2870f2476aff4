//! Configuration for asmbuild.
//!
//! Read from `asmbuild.toml` in the workspace root, or from
//! `<config_dir>/asmbuild/config.toml` when the workspace has none. Every
//! section is optional; missing values take the defaults below.
//!
//! ```toml
//! [assembler]
//! command = "vasmm68k_mot"
//! options = ["-m68000", "-Fhunk", "-devpac"]
//!
//! [linker]
//! options = ["-bamigahunk", "-Bstatic"]
//! includes = ["**/*.s"]
//! exe_name = "a.out"
//!
//! [build]
//! dir = "build"
//!
//! [process]
//! kill_helper = "scripts/terminate-tree.sh"
//! ```
//!
//! `${VAR}` inside string values expands from the environment.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// File name looked up in the workspace root.
pub const WORKSPACE_CONFIG_FILE: &str = "asmbuild.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub assembler: AssemblerConfig,
    pub linker: LinkerConfig,
    pub build: BuildDirConfig,
    pub process: ProcessConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    pub enabled: bool,
    pub command: String,
    pub options: Vec<String>,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "vasmm68k_mot".to_string(),
            options: vec![
                "-m68000".to_string(),
                "-Fhunk".to_string(),
                "-devpac".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinkerConfig {
    pub enabled: bool,
    pub command: String,
    pub options: Vec<String>,
    /// Globs (relative to the workspace root) selecting sources to build.
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    /// Executable name, written inside the build directory.
    pub exe_name: String,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "vlink".to_string(),
            options: vec!["-bamigahunk".to_string(), "-Bstatic".to_string()],
            includes: vec!["**/*.s".to_string()],
            excludes: Vec::new(),
            exe_name: "a.out".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuildDirConfig {
    /// Output directory; relative paths are taken from the workspace root.
    pub dir: PathBuf,
}

impl Default for BuildDirConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("build"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Script invoked as `<script> <pid>` to kill a tool's process tree.
    /// The platform's native strategy is used when unset.
    pub kill_helper: Option<PathBuf>,
}

pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(end_rel) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &rest[start + 2..start + 2 + end_rel];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &rest[start + 2 + end_rel + 1..];
    }

    out.push_str(rest);
    out
}

fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(expand_env_vars(s)),
        None => path.to_path_buf(),
    }
}

fn expand_all(values: &mut [String]) {
    for value in values {
        *value = expand_env_vars(value);
    }
}

/// `<config_dir>/asmbuild/config.toml`, if the platform has a config dir.
#[must_use]
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("asmbuild").join("config.toml"))
}

impl BuildConfig {
    /// Load the configuration that applies to `root`.
    ///
    /// Returns the defaults when neither the workspace nor the global file
    /// exists.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let candidates = std::iter::once(root.join(WORKSPACE_CONFIG_FILE)).chain(global_config_path());
        for path in candidates {
            if path.exists() {
                return Self::load_file(&path);
            }
        }
        tracing::debug!(root = %root.display(), "No config file found; using defaults");
        Ok(Self::default())
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match Self::parse(&content) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "Loaded config");
                Ok(config)
            }
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    /// Parse TOML text and expand environment references.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(content)?;
        config.expand();
        Ok(config)
    }

    fn expand(&mut self) {
        self.assembler.command = expand_env_vars(&self.assembler.command);
        expand_all(&mut self.assembler.options);
        self.linker.command = expand_env_vars(&self.linker.command);
        expand_all(&mut self.linker.options);
        expand_all(&mut self.linker.includes);
        expand_all(&mut self.linker.excludes);
        self.linker.exe_name = expand_env_vars(&self.linker.exe_name);
        self.build.dir = expand_path(&self.build.dir);
        self.process.kill_helper = self.process.kill_helper.as_deref().map(expand_path);
    }

    /// Build directory for the workspace at `root`.
    #[must_use]
    pub fn build_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.build.dir)
    }

    /// Kill helper script resolved against `root`.
    #[must_use]
    pub fn kill_helper(&self, root: &Path) -> Option<PathBuf> {
        self.process.kill_helper.as_ref().map(|p| root.join(p))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use super::{BuildConfig, ConfigError, WORKSPACE_CONFIG_FILE, expand_env_vars};

    #[test]
    fn expand_env_vars_no_vars() {
        assert_eq!(expand_env_vars("hello world"), "hello world");
    }

    #[test]
    fn expand_env_vars_single_var() {
        unsafe {
            std::env::set_var("ASMBUILD_TEST_VAR", "replaced");
        }
        let result = expand_env_vars("prefix ${ASMBUILD_TEST_VAR} suffix");
        assert_eq!(result, "prefix replaced suffix");
        unsafe {
            std::env::remove_var("ASMBUILD_TEST_VAR");
        }
    }

    #[test]
    fn expand_env_vars_missing_var_becomes_empty() {
        unsafe {
            std::env::remove_var("ASMBUILD_MISSING_VAR");
        }
        assert_eq!(
            expand_env_vars("before ${ASMBUILD_MISSING_VAR} after"),
            "before  after"
        );
    }

    #[test]
    fn expand_env_vars_unclosed_is_literal() {
        assert_eq!(expand_env_vars("a ${OOPS b"), "a ${OOPS b");
        assert_eq!(expand_env_vars("${}x"), "x");
    }

    #[test]
    fn empty_document_gives_defaults() {
        let config = BuildConfig::parse("").unwrap();
        assert!(config.assembler.enabled);
        assert_eq!(config.assembler.command, "vasmm68k_mot");
        assert_eq!(config.linker.options, vec!["-bamigahunk", "-Bstatic"]);
        assert_eq!(config.linker.includes, vec!["**/*.s"]);
        assert_eq!(config.build.dir, PathBuf::from("build"));
        assert!(config.process.kill_helper.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = BuildConfig::parse(
            r#"
            [assembler]
            enabled = false

            [linker]
            exe_name = "demo"
            excludes = ["vendor/**"]
            "#,
        )
        .unwrap();
        assert!(!config.assembler.enabled);
        assert_eq!(config.assembler.command, "vasmm68k_mot");
        assert!(config.linker.enabled);
        assert_eq!(config.linker.exe_name, "demo");
        assert_eq!(config.linker.excludes, vec!["vendor/**"]);
    }

    #[test]
    fn string_values_expand_env() {
        unsafe {
            std::env::set_var("ASMBUILD_TEST_VASM", "/opt/vbcc/bin");
        }
        let config = BuildConfig::parse(
            r#"
            [assembler]
            command = "${ASMBUILD_TEST_VASM}/vasmm68k_mot"
            options = ["-I${ASMBUILD_TEST_VASM}/../include"]

            [process]
            kill_helper = "${ASMBUILD_TEST_VASM}/kill.sh"
            "#,
        )
        .unwrap();
        unsafe {
            std::env::remove_var("ASMBUILD_TEST_VASM");
        }
        assert_eq!(config.assembler.command, "/opt/vbcc/bin/vasmm68k_mot");
        assert_eq!(config.assembler.options, vec!["-I/opt/vbcc/bin/../include"]);
        assert_eq!(
            config.process.kill_helper,
            Some(PathBuf::from("/opt/vbcc/bin/kill.sh"))
        );
    }

    #[test]
    fn load_prefers_workspace_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(WORKSPACE_CONFIG_FILE),
            "[build]\ndir = \"out\"\n",
        )
        .unwrap();
        let config = BuildConfig::load(dir.path()).unwrap();
        assert_eq!(config.build_dir(dir.path()), dir.path().join("out"));
    }

    #[test]
    fn parse_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(WORKSPACE_CONFIG_FILE);
        fs::write(&path, "[linker\n").unwrap();
        let err = BuildConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.path(), path.as_path());
        assert!(err.to_string().contains(WORKSPACE_CONFIG_FILE));
    }

    #[test]
    fn kill_helper_resolves_against_root() {
        let config =
            BuildConfig::parse("[process]\nkill_helper = \"scripts/terminate-tree.sh\"\n").unwrap();
        assert_eq!(
            config.kill_helper(Path::new("/work")),
            Some(PathBuf::from("/work/scripts/terminate-tree.sh"))
        );
        assert_eq!(BuildConfig::default().kill_helper(Path::new("/work")), None);
    }
}
