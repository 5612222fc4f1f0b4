use anyhow::{Context, Result};
use colored::*;
use log;
use std::path::{Path, PathBuf};
use xflat_core::config::expand_user_path;
use xflat_core::{
    AppError, CancellationToken, ChunkSink, Collaborators, DirectorySink, FlattenOutcome,
    MemorySink, ensure_gitignore_entry, run_flatten,
};

use crate::budget::policy_from_flag;
use crate::cli_args::FlattenArgs;
use crate::output::{print_flatten_summary, write_to_stdout};
use crate::prepare_run;
use crate::progress::TerminalProgress;

pub fn handle_flatten_command(args: FlattenArgs, quiet: bool) -> Result<()> {
    let prepared = prepare_run(
        &args.project_config,
        Some(&args.limits),
        &args.ignore_toggles,
    )?;
    let root = &prepared.project_root;

    let output_dir = match &args.output_dir {
        Some(dir) => absolutize(root, &expand_user_path(dir)),
        None => prepared.config.output_dir(root),
    };

    let mut memory = MemorySink::default();
    let mut directory = DirectorySink::new(&output_dir);
    let sink: &mut dyn ChunkSink = if args.stdout {
        &mut memory
    } else {
        &mut directory
    };

    let policy = policy_from_flag(&args.budget_policy, quiet);
    let progress = TerminalProgress::new(quiet || args.stdout);
    let cancel = CancellationToken::new();

    let outcome = {
        let mut collaborators = Collaborators {
            budget_policy: policy.as_ref(),
            observer: &progress,
            cancel: &cancel,
            sink,
        };
        run_flatten(&prepared.options, &prepared.rules, &mut collaborators)
    };
    progress.finish();
    let outcome = outcome.context("Flatten run failed")?;

    match outcome {
        FlattenOutcome::Completed(report) => {
            if args.stdout {
                for chunk in &memory.chunks {
                    write_to_stdout(chunk)?;
                }
            } else if prepared.config.output.add_to_gitignore {
                add_output_to_gitignore(root, &output_dir, quiet)?;
            }
            if !quiet {
                print_flatten_summary(&report, &progress.take_warnings(), args.stdout);
            }
        }
        FlattenOutcome::Aborted => {
            if !quiet {
                eprintln!("{} Flatten aborted; nothing written.", "ℹ️".blue());
            }
        }
        FlattenOutcome::Cancelled => {
            return Err(AppError::Cancelled).context("Flatten run cancelled");
        }
        FlattenOutcome::RulesUpdated { path, added } => {
            if !quiet {
                if added.is_empty() {
                    eprintln!(
                        "{} All patterns were already blacklisted in {}; nothing written.",
                        "ℹ️".blue(),
                        path.display()
                    );
                } else {
                    eprintln!(
                        "{} Added {} to the blacklist in {}. Re-run to flatten with the new rules.",
                        "✅".green(),
                        added.join(", ").cyan(),
                        path.display().to_string().blue()
                    );
                }
            }
        }
    }
    Ok(())
}

fn absolutize(root: &Path, dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(dir),
            Err(_) => root.join(dir),
        }
    }
}

fn add_output_to_gitignore(root: &Path, output_dir: &Path, quiet: bool) -> Result<()> {
    let Some(relative) = pathdiff::diff_paths(output_dir, root) else {
        return Ok(());
    };
    if relative.starts_with("..") || relative.as_os_str().is_empty() {
        log::debug!(
            "Output dir {} is outside the project; .gitignore left alone",
            output_dir.display()
        );
        return Ok(());
    }
    let entry = format!("{}/", relative.to_string_lossy().replace('\\', "/"));
    if ensure_gitignore_entry(root, &entry)? && !quiet {
        eprintln!("{} Added {} to .gitignore", "✅".green(), entry.cyan());
    }
    Ok(())
}
