mod budget;
mod cli_args;
mod commands;
mod output;
mod progress;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use log;
use std::path::{Path, PathBuf};
use std::process;

use cli_args::{Cli, Commands, IgnoreTogglesGroup, LimitOpts, ProjectConfigOpts};
use xflat_core::config::expand_user_path;
use xflat_core::{AppError, Config, FlattenOptions, FlattenOverrides, OversizePolicy, RuleSet};

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let exit_code = exit_code_for(&e);

            // Config and argument problems are always shown, even in quiet mode.
            if !quiet || exit_code == 1 || exit_code == 5 {
                eprintln!("{} {:#}\n", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }

            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn exit_code_for(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<AppError>() {
        Some(AppError::Config(_)) => 1,
        Some(AppError::TomlParse(_)) => 1,
        Some(AppError::TomlSerialize(_)) => 1,
        Some(AppError::Gitignore(_)) => 1,
        Some(AppError::Io(_)) => 2,
        Some(AppError::FileRead { .. }) => 2,
        Some(AppError::FileWrite { .. }) => 2,
        Some(AppError::DirCreation { .. }) => 2,
        Some(AppError::Glob(_)) => 2,
        Some(AppError::Chunking(_)) => 3,
        Some(AppError::InvalidArgument(_)) => 5,
        Some(AppError::NoCandidates(_)) => 7,
        Some(AppError::NoContent(_)) => 7,
        Some(AppError::NothingPacked(_)) => 7,
        Some(AppError::Tokenizer(_)) => 8,
        Some(AppError::Cancelled) => 130,
        Some(_) => 1,
        None if error.downcast_ref::<serde_json::Error>().is_some() => 6,
        None => 1,
    }
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool) -> Result<()> {
    match cli.command {
        None => {
            Cli::command().print_help()?;
        }
        Some(command) => match command {
            Commands::Flatten(args) => {
                log::debug!("Executing 'flatten' command...");
                commands::flatten::handle_flatten_command(args, quiet)?;
            }
            Commands::Estimate(args) => {
                log::debug!("Executing 'estimate' command...");
                commands::estimate::handle_estimate_command(args, quiet)?;
            }
            Commands::Tree(args) => {
                log::debug!("Executing 'tree' command...");
                commands::tree::handle_tree_command(args, quiet)?;
            }
            Commands::Init(args) => {
                log::debug!("Executing 'init' command...");
                commands::init::handle_init_command(&args, quiet)?;
            }
            Commands::Config(args) => {
                log::debug!("Executing 'config' command...");
                let project_root = Config::determine_project_root(args.project_root.as_ref())
                    .context("Failed to determine project root for config command")?;
                commands::config::handle_config_command(&args, &project_root, quiet)?;
            }
            Commands::Completion(args) => {
                log::debug!("Executing 'completion' command...");
                commands::completion::handle_completion_command(&args, quiet)?;
            }
        },
    }
    Ok(())
}

/// Everything a command needs before it touches the engine.
pub struct PreparedRun {
    pub project_root: PathBuf,
    pub config: Config,
    pub rules: RuleSet,
    pub options: FlattenOptions,
}

pub fn load_config_for_command(
    project_root: &Path,
    project_opts: &ProjectConfigOpts,
) -> Result<Config> {
    let config_path = Config::resolve_config_path(
        project_root,
        project_opts.config_file.as_ref(),
        project_opts.disable_config_file,
    )
    .context("Failed to resolve configuration path")?;

    let config = match &config_path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    log::trace!("Effective config: {:?}", config);
    Ok(config)
}

pub fn prepare_run(
    project_opts: &ProjectConfigOpts,
    limits: Option<&LimitOpts>,
    ignore_toggles: &IgnoreTogglesGroup,
) -> Result<PreparedRun> {
    let project_root = Config::determine_project_root(project_opts.project_root.as_ref())
        .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", project_root.display());

    let config = load_config_for_command(&project_root, project_opts)?;

    let rules_path = project_opts.rules_file.as_deref().map(expand_user_path);
    let mut rules = xflat_core::load_rule_set(
        &project_root,
        rules_path.as_deref(),
        ignore_toggles.use_gitignore(),
        config.general.use_gitignore,
    );
    rules.add_ignored_dir_names(&config.filters.ignore_dirs);

    let overrides = overrides_from(limits)?;
    let options = FlattenOptions::resolve(&project_root, &config, &rules, &overrides)
        .context("Failed to resolve flatten options")?;

    Ok(PreparedRun {
        project_root,
        config,
        rules,
        options,
    })
}

fn overrides_from(limits: Option<&LimitOpts>) -> Result<FlattenOverrides> {
    let Some(limits) = limits else {
        return Ok(FlattenOverrides::default());
    };
    let oversized_files = limits
        .oversized
        .as_deref()
        .map(|s| s.parse::<OversizePolicy>())
        .transpose()
        .map_err(AppError::InvalidArgument)?;
    Ok(FlattenOverrides {
        max_token_limit: limits.max_tokens,
        max_tokens_per_file: limits.max_tokens_per_file,
        max_concurrent_files: limits.concurrency,
        oversized_files,
        sort_by_importance: limits.sort_by_importance.then_some(true),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_exit_codes() {
        let code = |e: AppError| exit_code_for(&anyhow::Error::from(e));
        assert_eq!(code(AppError::Config("x".into())), 1);
        assert_eq!(code(AppError::Chunking("x".into())), 3);
        assert_eq!(code(AppError::InvalidArgument("x".into())), 5);
        assert_eq!(code(AppError::NoCandidates(PathBuf::from("/p"))), 7);
        assert_eq!(code(AppError::Tokenizer("x".into())), 8);
        assert_eq!(code(AppError::Cancelled), 130);

        let wrapped = anyhow::Error::from(AppError::NoContent(2)).context("Flatten run failed");
        assert_eq!(exit_code_for(&wrapped), 7);

        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(exit_code_for(&anyhow::Error::from(json)), 6);
    }
}
