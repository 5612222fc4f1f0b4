use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ProjectConfigOpts {
    #[arg(
        long,
        help = "Specify the target project directory (default: current dir).",
        help_heading = "Project Setup",
        value_name = "PATH"
    )]
    pub project_root: Option<PathBuf>,

    #[arg(
        long,
        help = "Path of the rule document (default: <project>/.xflatignore).",
        value_name = "RULES_FILE",
        help_heading = "Project Setup"
    )]
    pub rules_file: Option<PathBuf>,

    #[arg(
        long,
        help = "Specify path/filename of the TOML config file (default: .xtools/xflat/xflat.toml).",
        value_name = "CONFIG_FILE",
        conflicts_with = "disable_config_file",
        help_heading = "Project Setup"
    )]
    pub config_file: Option<String>,

    #[arg(
        long,
        help = "Disable loading any TOML config file.",
        conflicts_with = "config_file",
        help_heading = "Project Setup"
    )]
    pub disable_config_file: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct LimitOpts {
    #[arg(
        long,
        value_name = "TOKENS",
        help = "Maximum tokens per output chunk (overrides config and rule document).",
        help_heading = "Limits"
    )]
    pub max_tokens: Option<u64>,

    #[arg(
        long,
        value_name = "TOKENS",
        help = "Maximum tokens for a single file entry.",
        help_heading = "Limits"
    )]
    pub max_tokens_per_file: Option<u64>,

    #[arg(
        long,
        value_name = "N",
        help = "Number of files read in parallel per batch.",
        help_heading = "Limits"
    )]
    pub concurrency: Option<usize>,

    #[arg(
        long,
        value_name = "POLICY",
        value_parser = ["skip", "truncate"],
        help = "What to do with files over the per-file limit [default: skip].",
        help_heading = "Limits"
    )]
    pub oversized: Option<String>,

    #[arg(
        long,
        help = "Pack files in descending importance instead of walk order.",
        help_heading = "Limits"
    )]
    pub sort_by_importance: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct IgnoreTogglesGroup {
    #[arg(
        long,
        help = "Fold .gitignore patterns into the global ignore list [default: enabled].",
        overrides_with = "disable_gitignore",
        help_heading = "Ignore Rules"
    )]
    pub enable_gitignore: bool,
    #[arg(
        long,
        help = "Do not read .gitignore.",
        overrides_with = "enable_gitignore",
        help_heading = "Ignore Rules"
    )]
    pub disable_gitignore: bool,
}

impl IgnoreTogglesGroup {
    pub fn use_gitignore(&self) -> Option<bool> {
        if self.enable_gitignore {
            Some(true)
        } else if self.disable_gitignore {
            Some(false)
        } else {
            None
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Flatten a repository into size-bounded text chunks.",
    long_about = "xflat walks a project, applies the global/whitelist/blacklist rules from \n.xflatignore, and packs the surviving files into text chunks sized for a \nlanguage model context window. Each chunk starts with a directory tree.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  xflat init\n  xflat estimate --max-tokens 100000\n  xflat flatten --budget-policy smallest\n  xflat tree",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(
        visible_alias = "f",
        about = "Flatten the project into chunk files."
    )]
    Flatten(FlattenArgs),

    #[command(
        visible_alias = "e",
        about = "Show how many chunks a flatten would produce."
    )]
    Estimate(EstimateArgs),

    #[command(
        visible_alias = "t",
        about = "Print the directory tree of the files that would be flattened."
    )]
    Tree(TreeArgs),

    #[command(about = "Write a default .xflatignore rule document.")]
    Init(InitArgs),

    #[command(about = "Show or save the default configuration file structure.")]
    Config(ConfigArgs),

    #[command(about = "Generate or save shell completion scripts.")]
    Completion(CompletionArgs),
}

#[derive(Args, Debug, Clone)]
pub struct FlattenArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub limits: LimitOpts,
    #[clap(flatten)]
    pub ignore_toggles: IgnoreTogglesGroup,

    #[arg(
        short = 'o',
        long,
        value_name = "DIR",
        help = "Directory for chunk files (default: .xtools/xflat/output).",
        help_heading = "Output Control",
        conflicts_with = "stdout"
    )]
    pub output_dir: Option<PathBuf>,

    #[arg(
        long,
        help = "Print chunks to standard output instead of writing files.",
        help_heading = "Output Control"
    )]
    pub stdout: bool,

    #[arg(
        long,
        value_name = "POLICY",
        default_value = "ask",
        value_parser = ["ask", "proceed", "smallest", "abort"],
        help = "Resolution when the estimate exceeds the chunk threshold.",
        help_heading = "Output Control"
    )]
    pub budget_policy: String,
}

#[derive(Args, Debug, Clone)]
pub struct EstimateArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub limits: LimitOpts,
    #[clap(flatten)]
    pub ignore_toggles: IgnoreTogglesGroup,

    #[arg(
        long,
        help = "Read every candidate and count cl100k tokens exactly.",
        help_heading = "Output Control"
    )]
    pub tokens: bool,

    #[arg(long, help = "Print the estimate as JSON.", help_heading = "Output Control")]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub ignore_toggles: IgnoreTogglesGroup,
}

#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    #[arg(
        long,
        help = "Specify the target project directory (default: current dir).",
        value_name = "PATH"
    )]
    pub project_root: Option<PathBuf>,
    #[arg(long, help = "Overwrite an existing rule document without asking.")]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    #[arg(
        long,
        value_name = "SHELL",
        help = "Shell to generate completions for (fish, bash, zsh) [default: fish]"
    )]
    pub shell: Option<String>,
    #[arg(
        long,
        help = "Save completion script to default location (prompts overwrite)."
    )]
    pub save: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        long,
        help = "Specify the target project directory (default: current dir).",
        value_name = "PATH"
    )]
    pub project_root: Option<PathBuf>,
    #[arg(
        long,
        help = "Save default config structure to default path (prompts overwrite)."
    )]
    pub save: bool,
}
