use crate::builtin::get_builtin_lists;
use crate::chunking::{OversizePolicy, PackLimits};
use crate::error::{AppError, Result};
use crate::rules::RuleSet;
use log;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_DIR: &str = ".xtools/xflat";
pub const DEFAULT_CONFIG_FILENAME: &str = "xflat.toml";
pub const DEFAULT_OUTPUT_DIR: &str = ".xtools/xflat/output";

pub const DEFAULT_MAX_TOKEN_LIMIT: u64 = 50_000;
pub const DEFAULT_MAX_TOKENS_PER_FILE: u64 = 10_000;
pub const DEFAULT_CHARS_PER_TOKEN: u64 = 4;
pub const DEFAULT_MAX_CONCURRENT_FILES: usize = 4;
pub const DEFAULT_BUDGET_CHUNK_THRESHOLD: usize = 10;
pub const DEFAULT_FILTERED_TOKEN_BUDGET: u64 = 200_000;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub filters: FiltersConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    #[serde(default = "default_true")]
    pub use_gitignore: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FiltersConfig {
    /// Dotted extensions; empty admits every file.
    #[serde(default = "default_include_extensions")]
    pub include_extensions: Vec<String>,
    /// Directory names ignored at any depth.
    #[serde(default = "default_ignore_dirs")]
    pub ignore_dirs: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Overrides the rule document's `maxTokenLimit` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_token_limit: Option<u64>,
    #[serde(default = "default_max_tokens_per_file")]
    pub max_tokens_per_file: u64,
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: u64,
    #[serde(default = "default_max_concurrent_files")]
    pub max_concurrent_files: usize,
    #[serde(default = "default_budget_chunk_threshold")]
    pub budget_chunk_threshold: usize,
    #[serde(default = "default_filtered_token_budget")]
    pub filtered_token_budget: u64,
    #[serde(default)]
    pub oversized_files: OversizePolicy,
    #[serde(default = "default_false")]
    pub sort_by_importance: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_true")]
    pub add_to_gitignore: bool,
}

fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_include_extensions() -> Vec<String> {
    get_builtin_lists().default_include_extensions.clone()
}
fn default_ignore_dirs() -> Vec<String> {
    get_builtin_lists().default_ignore_dirs.clone()
}
fn default_max_tokens_per_file() -> u64 {
    DEFAULT_MAX_TOKENS_PER_FILE
}
fn default_chars_per_token() -> u64 {
    DEFAULT_CHARS_PER_TOKEN
}
fn default_max_concurrent_files() -> usize {
    DEFAULT_MAX_CONCURRENT_FILES
}
fn default_budget_chunk_threshold() -> usize {
    DEFAULT_BUDGET_CHUNK_THRESHOLD
}
fn default_filtered_token_budget() -> u64 {
    DEFAULT_FILTERED_TOKEN_BUDGET
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            use_gitignore: default_true(),
        }
    }
}
impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            include_extensions: default_include_extensions(),
            ignore_dirs: default_ignore_dirs(),
        }
    }
}
impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_token_limit: None,
            max_tokens_per_file: default_max_tokens_per_file(),
            chars_per_token: default_chars_per_token(),
            max_concurrent_files: default_max_concurrent_files(),
            budget_chunk_threshold: default_budget_chunk_threshold(),
            filtered_token_budget: default_filtered_token_budget(),
            oversized_files: OversizePolicy::default(),
            sort_by_importance: default_false(),
        }
    }
}
impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            add_to_gitignore: default_true(),
        }
    }
}

impl Config {
    pub fn determine_project_root(cli_project_root: Option<&PathBuf>) -> Result<PathBuf> {
        let path_str_opt = cli_project_root
            .map(|p| p.to_string_lossy().to_string())
            .or_else(|| env::var("PROJECT_ROOT").ok().filter(|s| !s.is_empty()));

        let path_to_resolve = match path_str_opt {
            Some(p_str) => PathBuf::from(shellexpand::tilde(&p_str).as_ref()),
            None => env::current_dir().map_err(AppError::Io)?,
        };

        path_to_resolve.canonicalize().map_err(|e| {
            AppError::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to canonicalize project root '{}': {}",
                    path_to_resolve.display(),
                    e
                ),
            ))
        })
    }

    pub fn resolve_config_path(
        project_root: &Path,
        cli_config_file: Option<&String>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }

        let Some(p_str) = cli_config_file else {
            let default_path = project_root
                .join(DEFAULT_CONFIG_DIR)
                .join(DEFAULT_CONFIG_FILENAME);
            if default_path.exists() {
                log::debug!("Using default config file path: {}", default_path.display());
                return Ok(Some(default_path));
            }
            log::debug!(
                "No config file specified and default not found at: {}",
                default_path.display()
            );
            return Ok(None);
        };

        let mut path = PathBuf::from(shellexpand::tilde(p_str).as_ref());
        let looks_like_path =
            path.is_absolute() || path.components().count() > 1 || p_str.contains(['/', '\\']);

        if looks_like_path {
            if !path.exists() && path.extension().is_none() {
                path.set_extension("toml");
            }
            if !path.exists() {
                return Err(AppError::Config(format!(
                    "Specified config file not found at path: {}",
                    path.display()
                )));
            }
            log::debug!("Using specified config file path: {}", path.display());
            return Ok(Some(path));
        }

        let filename = if path.extension().is_none_or(|e| e != "toml") {
            format!("{}.toml", path.to_string_lossy())
        } else {
            path.to_string_lossy().to_string()
        };
        let full_path = project_root.join(DEFAULT_CONFIG_DIR).join(filename);
        if !full_path.exists() {
            return Err(AppError::Config(format!(
                "Specified config file '{}' not found in default directory: {}",
                path.display(),
                project_root.join(DEFAULT_CONFIG_DIR).display()
            )));
        }
        log::debug!(
            "Using specified config filename in default directory: {}",
            full_path.display()
        );
        Ok(Some(full_path))
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        toml::from_str::<Config>(&toml_content).map_err(|e| {
            AppError::TomlParse(format!(
                "Error parsing config file '{}': {}. Check TOML syntax and structure.",
                config_path.display(),
                e
            ))
        })
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Output directory resolved against the project root.
    pub fn output_dir(&self, project_root: &Path) -> PathBuf {
        let expanded = expand_user_path(&self.output.output_dir);
        if expanded.is_absolute() {
            expanded
        } else {
            project_root.join(expanded)
        }
    }
}

/// Expands a leading `~` to the home directory.
pub fn expand_user_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}

/// Values given explicitly on the command line. They win over everything else.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenOverrides {
    pub max_token_limit: Option<u64>,
    pub max_tokens_per_file: Option<u64>,
    pub max_concurrent_files: Option<usize>,
    pub oversized_files: Option<OversizePolicy>,
    pub sort_by_importance: Option<bool>,
}

/// Immutable settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenOptions {
    pub project_root: PathBuf,
    pub include_extensions: Vec<String>,
    pub max_token_limit: u64,
    pub max_tokens_per_file: u64,
    pub chars_per_token: u64,
    pub max_concurrent_files: usize,
    pub budget_chunk_threshold: usize,
    pub filtered_token_budget: u64,
    pub oversized_files: OversizePolicy,
    pub sort_by_importance: bool,
}

impl FlattenOptions {
    /// Resolves each value from, in order: the command line, the host `max_token_limit`
    /// override, the rule document, the host config, the built-in default.
    pub fn resolve(
        project_root: &Path,
        config: &Config,
        rules: &RuleSet,
        overrides: &FlattenOverrides,
    ) -> Result<Self> {
        let doc = &rules.settings;
        let limits = &config.limits;

        let max_token_limit = overrides
            .max_token_limit
            .or(limits.max_token_limit)
            .or_else(|| doc.max_token_limit())
            .unwrap_or(DEFAULT_MAX_TOKEN_LIMIT);
        let max_tokens_per_file = overrides
            .max_tokens_per_file
            .or_else(|| doc.max_tokens_per_file())
            .unwrap_or(limits.max_tokens_per_file);
        let max_concurrent_files = overrides
            .max_concurrent_files
            .or_else(|| doc.max_concurrent_files())
            .unwrap_or(limits.max_concurrent_files);
        let oversized_files = overrides
            .oversized_files
            .or_else(|| doc.oversized_files())
            .unwrap_or(limits.oversized_files);
        let sort_by_importance = overrides
            .sort_by_importance
            .or_else(|| doc.sort_by_importance())
            .unwrap_or(limits.sort_by_importance);

        let options = Self {
            project_root: project_root.to_path_buf(),
            include_extensions: config.filters.include_extensions.clone(),
            max_token_limit,
            max_tokens_per_file,
            chars_per_token: limits.chars_per_token,
            max_concurrent_files,
            budget_chunk_threshold: limits.budget_chunk_threshold,
            filtered_token_budget: limits.filtered_token_budget,
            oversized_files,
            sort_by_importance,
        };
        options.validate()?;
        log::debug!("Resolved flatten options: {:?}", options);
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_token_limit == 0 {
            return Err(AppError::InvalidArgument(
                "maxTokenLimit must be greater than 0".to_string(),
            ));
        }
        if self.max_tokens_per_file == 0 {
            return Err(AppError::InvalidArgument(
                "maxTokensPerFile must be greater than 0".to_string(),
            ));
        }
        if self.chars_per_token == 0 {
            return Err(AppError::InvalidArgument(
                "chars_per_token must be greater than 0".to_string(),
            ));
        }
        if self.max_concurrent_files == 0 {
            return Err(AppError::InvalidArgument(
                "maxConcurrentFiles must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn max_chunk_size(&self) -> u64 {
        self.max_token_limit.saturating_mul(self.chars_per_token)
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_tokens_per_file.saturating_mul(self.chars_per_token)
    }

    pub fn filtered_budget_bytes(&self) -> u64 {
        self.filtered_token_budget.saturating_mul(self.chars_per_token)
    }

    pub fn pack_limits(&self) -> PackLimits {
        PackLimits {
            max_chunk_size: usize::try_from(self.max_chunk_size()).unwrap_or(usize::MAX),
            max_file_size: usize::try_from(self.max_file_size()).unwrap_or(usize::MAX),
            oversize: self.oversized_files,
        }
    }
}
