use colored::*;
use log;
use std::io::{self, BufRead, Write};
use xflat_core::{BudgetContext, BudgetDecision, BudgetPolicy};

/// Builds the policy selected with `--budget-policy`.
pub fn policy_from_flag(flag: &str, quiet: bool) -> Box<dyn BudgetPolicy> {
    match flag {
        "proceed" => Box::new(BudgetDecision::Proceed),
        "smallest" => Box::new(BudgetDecision::FilterToSmallest),
        "abort" => Box::new(BudgetDecision::Abort),
        _ if quiet => {
            log::debug!("Quiet mode: budget prompt replaced by abort");
            Box::new(BudgetDecision::Abort)
        }
        _ => Box::new(PromptPolicy),
    }
}

/// Asks on stdin, with the menu on stderr so stdout stays clean for chunks. Any read failure
/// counts as an abort.
pub struct PromptPolicy;

impl BudgetPolicy for PromptPolicy {
    fn decide(&self, context: &BudgetContext<'_>) -> BudgetDecision {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        match prompt(context, &mut input) {
            Ok(decision) => decision,
            Err(e) => {
                log::warn!("Could not read budget decision: {}", e);
                BudgetDecision::Abort
            }
        }
    }
}

fn prompt(context: &BudgetContext<'_>, input: &mut impl BufRead) -> io::Result<BudgetDecision> {
    eprintln!(
        "{} Estimated {} chunks ({} files, {} bytes) exceeds the threshold of {}.",
        "⚠️".yellow(),
        context.estimate.estimated_chunk_count.to_string().cyan(),
        context.candidates.len(),
        context.estimate.total_size,
        context.threshold
    );
    eprintln!("  [{}]roceed with all files", "p".green());
    eprintln!("  [{}]mallest files only", "s".green());
    eprintln!("  [{}]xpand the token limit", "e".green());
    eprintln!("  [{}]lacklist patterns and stop", "b".green());
    eprintln!("  [{}]bort", "a".red());
    eprint!("Choice [p/s/e/b/{}]: ", "A".red());
    io::stderr().flush()?;

    let answer = read_answer(input)?;
    let decision = match answer.to_lowercase().as_str() {
        "p" | "proceed" => BudgetDecision::Proceed,
        "s" | "smallest" => BudgetDecision::FilterToSmallest,
        "e" | "expand" => {
            let suggested = context.max_token_limit.saturating_mul(2);
            eprint!("New token limit [{}]: ", suggested);
            io::stderr().flush()?;
            let raw = read_answer(input)?;
            let max_token_limit = if raw.is_empty() {
                suggested
            } else {
                match raw.parse::<u64>() {
                    Ok(n) if n > 0 => n,
                    _ => {
                        eprintln!("Not a positive number, aborting.");
                        return Ok(BudgetDecision::Abort);
                    }
                }
            };
            BudgetDecision::ExpandBudget { max_token_limit }
        }
        "b" | "blacklist" => {
            eprint!("Patterns to blacklist (comma separated): ");
            io::stderr().flush()?;
            let patterns: Vec<String> = read_answer(input)?
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
            if patterns.is_empty() {
                eprintln!("No patterns given, aborting.");
                BudgetDecision::Abort
            } else {
                BudgetDecision::AddBlacklist { patterns }
            }
        }
        _ => BudgetDecision::Abort,
    };
    Ok(decision)
}

fn read_answer(input: &mut impl BufRead) -> io::Result<String> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use xflat_core::SizeEstimate;

    fn decide(answers: &str) -> BudgetDecision {
        let estimate = SizeEstimate {
            estimated_chunk_count: 12,
            total_size: 2_000_000,
        };
        let context = BudgetContext {
            estimate: &estimate,
            threshold: 10,
            max_token_limit: 50_000,
            candidates: &[],
        };
        prompt(&context, &mut Cursor::new(answers.to_string())).unwrap()
    }

    #[test]
    fn menu_answers_map_to_decisions() {
        assert_eq!(decide("p\n"), BudgetDecision::Proceed);
        assert_eq!(decide("S\n"), BudgetDecision::FilterToSmallest);
        assert_eq!(decide("\n"), BudgetDecision::Abort);
        assert_eq!(decide("x\n"), BudgetDecision::Abort);
    }

    #[test]
    fn expand_defaults_to_double() {
        assert_eq!(
            decide("e\n\n"),
            BudgetDecision::ExpandBudget { max_token_limit: 100_000 }
        );
        assert_eq!(
            decide("e\n75000\n"),
            BudgetDecision::ExpandBudget { max_token_limit: 75_000 }
        );
        assert_eq!(decide("e\nlots\n"), BudgetDecision::Abort);
    }

    #[test]
    fn blacklist_collects_patterns() {
        assert_eq!(
            decide("b\n*.snap, fixtures/** ,\n"),
            BudgetDecision::AddBlacklist {
                patterns: vec!["*.snap".to_string(), "fixtures/**".to_string()],
            }
        );
        assert_eq!(decide("b\n\n"), BudgetDecision::Abort);
    }
}
