use anyhow::{Context, Result};
use colored::*;
use std::fs;
use xflat_core::Config;
use xflat_core::rules::{DEFAULT_RULE_DOCUMENT, DEFAULT_RULES_FILENAME};

use crate::cli_args::InitArgs;
use crate::output::confirm_overwrite;

pub fn handle_init_command(args: &InitArgs, quiet: bool) -> Result<()> {
    let project_root = Config::determine_project_root(args.project_root.as_ref())
        .context("Failed to determine project root for init command")?;
    let path = project_root.join(DEFAULT_RULES_FILENAME);

    if !args.force && !confirm_overwrite(&path, "Rule document", quiet)? {
        return Ok(());
    }

    fs::write(&path, DEFAULT_RULE_DOCUMENT)
        .with_context(|| format!("Failed to write rule document {}", path.display()))?;
    if !quiet {
        println!(
            "{} Rule document written to: {}",
            "✅".green(),
            path.display().to_string().blue()
        );
    }
    Ok(())
}
