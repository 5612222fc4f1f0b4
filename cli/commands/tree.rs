use anyhow::{Context, Result};
use colored::*;
use xflat_core::{CancellationToken, NoopObserver, plan_flatten, render_tree};

use crate::cli_args::TreeArgs;
use crate::output::write_to_stdout;
use crate::prepare_run;

pub fn handle_tree_command(args: TreeArgs, quiet: bool) -> Result<()> {
    let prepared = prepare_run(&args.project_config, None, &args.ignore_toggles)?;
    let compiled = prepared.rules.compile().context("Failed to compile rules")?;
    let plan = plan_flatten(
        &prepared.options,
        &compiled,
        &CancellationToken::new(),
        &NoopObserver,
    )
    .context("Failed to collect files for tree")?;

    let paths: Vec<&str> = plan
        .candidates
        .iter()
        .map(|f| f.relative_path.as_str())
        .collect();

    if !quiet {
        println!(
            "{} ({} files)",
            prepared.project_root.display().to_string().bold(),
            paths.len().to_string().cyan()
        );
    }
    write_to_stdout(&render_tree(&paths))
}
