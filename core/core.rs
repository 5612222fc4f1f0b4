pub mod builtin;
pub mod chunking;
pub mod config;
pub mod error;
pub mod estimate;
pub mod gather;
pub mod glob;
pub mod pipeline;
pub mod progress;
pub mod rules;
pub mod scoring;
pub mod tree;
pub mod writer;

pub use chunking::{Chunk, FileContent, OversizePolicy, PackLimits, PackOutcome, pack_entries};
pub use config::{Config, FlattenOptions, FlattenOverrides};
pub use error::{AppError, Result};
pub use estimate::{BudgetContext, BudgetDecision, BudgetPolicy, SizeEstimate, estimate_chunks};
pub use gather::{CandidateFile, collect_candidates};
pub use pipeline::{
    Collaborators, FlattenOutcome, FlattenPlan, FlattenReport, plan_flatten, run_flatten,
};
pub use progress::{CancellationToken, NoopObserver, ProgressEvent, ProgressObserver};
pub use rules::{CompiledRules, RuleSet, load_rule_set, parse_rule_document};
pub use tree::render_tree;
pub use writer::{ChunkSink, DirectorySink, MemorySink, ensure_gitignore_entry};
