use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::path::Path;
use xflat_core::Config;
use xflat_core::config::{DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILENAME};

use crate::cli_args::ConfigArgs;
use crate::output::{confirm_overwrite, write_to_stdout};

pub fn handle_config_command(args: &ConfigArgs, project_root: &Path, quiet: bool) -> Result<()> {
    let content = Config::default()
        .to_toml_string()
        .context("Failed to serialize default config")?;

    if !args.save {
        return write_to_stdout(&content);
    }

    let dir = project_root.join(DEFAULT_CONFIG_DIR);
    let path = dir.join(DEFAULT_CONFIG_FILENAME);
    if !confirm_overwrite(&path, "Config file", quiet)? {
        return Ok(());
    }
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    fs::write(&path, content)
        .with_context(|| format!("Failed to write config file {}", path.display()))?;
    if !quiet {
        println!(
            "{} Default config saved to: {}",
            "✅".green(),
            path.display().to_string().blue()
        );
    }
    Ok(())
}
