use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "schema-repair",
    version,
    about = "Fill empty-object placeholders in scraped API schema models from preserved markup"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Locate(LocateArgs),
    Resolve(ResolveArgs),
    Merge(MergeArgs),
    Repair(RepairArgs),
}

#[derive(Args, Debug, Clone)]
pub struct LocateArgs {
    #[arg(long, default_value = ".cache/schema-repair")]
    pub work_root: PathBuf,

    #[arg(long)]
    pub document_path: Option<PathBuf>,

    #[arg(long)]
    pub empty_objects_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    #[arg(long, default_value = ".cache/schema-repair")]
    pub work_root: PathBuf,

    #[arg(long)]
    pub empty_objects_path: Option<PathBuf>,

    /// Locate empty leaves directly from this document instead of reading
    /// the empty-objects artifact.
    #[arg(long)]
    pub from_document: Option<PathBuf>,

    #[arg(long)]
    pub models_dir: Option<PathBuf>,

    #[arg(long)]
    pub filled_objects_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct MergeArgs {
    #[arg(long, default_value = ".cache/schema-repair")]
    pub work_root: PathBuf,

    #[arg(long)]
    pub document_path: Option<PathBuf>,

    #[arg(long)]
    pub filled_objects_path: Option<PathBuf>,

    #[arg(long)]
    pub output_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RepairArgs {
    #[arg(long, default_value = ".cache/schema-repair")]
    pub work_root: PathBuf,

    #[arg(long)]
    pub document_path: Option<PathBuf>,

    #[arg(long)]
    pub models_dir: Option<PathBuf>,

    #[arg(long)]
    pub output_path: Option<PathBuf>,

    /// Also persist the intermediate filled-values map.
    #[arg(long)]
    pub filled_objects_path: Option<PathBuf>,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub no_report: bool,
}
