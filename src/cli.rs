use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "casepin",
    version,
    about = "Case-study pinning and result tracking for revision experiments"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Config(ConfigArgs),
    Generate(GenerateArgs),
    Extend(ExtendArgs),
    Status(StatusArgs),
    Table(TableArgs),
    Cleanup(CleanupArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    Create(ConfigNameArgs),
    List,
    Select(ConfigNameArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ConfigNameArgs {
    #[arg(long)]
    pub name: String,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    #[arg(long)]
    pub paper_config: Option<String>,

    #[arg(long)]
    pub project: String,

    #[arg(long)]
    pub index: Option<u32>,

    #[arg(long, value_enum)]
    pub distribution: Option<Distribution>,

    #[arg(long, default_value_t = 10)]
    pub num_revisions: usize,

    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    #[arg(long = "revision")]
    pub revisions: Vec<String>,

    #[arg(long = "config-id")]
    pub config_ids: Vec<u32>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Distribution {
    Uniform,
    HalfNormal,
    Normal,
    PerYear,
    Latest,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ExtendStrategy {
    SimpleAdd,
    DistributionAdd,
    PerYearAdd,
    ReleaseAdd,
}

impl ExtendStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SimpleAdd => "simple_add",
            Self::DistributionAdd => "distribution_add",
            Self::PerYearAdd => "per_year_add",
            Self::ReleaseAdd => "release_add",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Granularity {
    Major,
    Minor,
}

#[derive(Args, Debug, Clone)]
pub struct ExtendArgs {
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    #[arg(long)]
    pub paper_config: Option<String>,

    #[arg(long)]
    pub project: String,

    #[arg(long)]
    pub index: Option<u32>,

    #[arg(long, value_enum)]
    pub strategy: ExtendStrategy,

    #[arg(long, default_value_t = -1)]
    pub stage: i64,

    #[arg(long)]
    pub stage_name: Option<String>,

    #[arg(long, value_enum)]
    pub distribution: Option<Distribution>,

    #[arg(long, default_value_t = 10)]
    pub num_revisions: usize,

    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    #[arg(long = "revision")]
    pub revisions: Vec<String>,

    #[arg(long = "config-id")]
    pub config_ids: Vec<u32>,

    #[arg(long = "override", default_value_t = false)]
    pub override_stages: bool,

    #[arg(long, default_value_t = false)]
    pub year_stages: bool,

    #[arg(long, value_enum, default_value_t = Granularity::Minor)]
    pub granularity: Granularity,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    #[arg(long)]
    pub paper_config: Option<String>,

    #[arg(long)]
    pub report_kind: String,

    #[arg(long)]
    pub project: Option<String>,

    #[arg(long)]
    pub result_root: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub detail: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TableArgs {
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    #[arg(long)]
    pub paper_config: Option<String>,

    #[arg(long)]
    pub report_kind: String,

    #[arg(long)]
    pub project: String,

    #[arg(long)]
    pub index: Option<u32>,

    #[arg(long)]
    pub result_root: Option<PathBuf>,

    #[arg(long)]
    pub cache_root: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub refresh: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CleanupMode {
    Error,
    Old,
}

#[derive(Args, Debug, Clone)]
pub struct CleanupArgs {
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    #[arg(long)]
    pub paper_config: Option<String>,

    #[arg(long, value_enum)]
    pub mode: CleanupMode,

    #[arg(long)]
    pub report_kind: Option<String>,

    #[arg(long)]
    pub project: Option<String>,

    #[arg(long)]
    pub result_root: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}
