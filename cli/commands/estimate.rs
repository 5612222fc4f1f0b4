use anyhow::{Context, Result};
use log;
use tiktoken_rs::cl100k_base;
use xflat_core::chunking::read_contents;
use xflat_core::estimate::exceeds_threshold;
use xflat_core::{AppError, CancellationToken, NoopObserver, plan_flatten};

use crate::cli_args::EstimateArgs;
use crate::output::{EstimateSummary, print_estimate_table, print_json};
use crate::prepare_run;

pub fn handle_estimate_command(args: EstimateArgs, quiet: bool) -> Result<()> {
    let prepared = prepare_run(
        &args.project_config,
        Some(&args.limits),
        &args.ignore_toggles,
    )?;
    let options = &prepared.options;
    let compiled = prepared.rules.compile().context("Failed to compile rules")?;
    let cancel = CancellationToken::new();

    let plan = plan_flatten(options, &compiled, &cancel, &NoopObserver)
        .context("Failed to collect files for estimate")?;

    let tokens = if args.tokens {
        log::debug!("Counting tokens for {} files", plan.candidates.len());
        let bpe = cl100k_base().map_err(|e| AppError::Tokenizer(e.to_string()))?;
        let read = read_contents(
            &plan.candidates,
            options.max_concurrent_files,
            &cancel,
            &NoopObserver,
        )?;
        Some(
            read.contents
                .iter()
                .map(|f| bpe.encode_ordinary(&f.content).len())
                .sum::<usize>(),
        )
    } else {
        None
    };

    let summary = EstimateSummary {
        project_root: prepared.project_root.display().to_string(),
        files: plan.candidates.len(),
        total_size: plan.estimate.total_size,
        estimated_chunk_count: plan.estimate.estimated_chunk_count,
        max_chunk_size: options.max_chunk_size(),
        threshold: options.budget_chunk_threshold,
        exceeds_threshold: exceeds_threshold(&plan.estimate, options.budget_chunk_threshold),
        tokens,
    };

    if args.json {
        print_json(&summary)
    } else {
        if !quiet {
            print_estimate_table(&summary);
        }
        Ok(())
    }
}
