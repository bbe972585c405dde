use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ani-heatmap",
    version,
    about = "Composite ANI heatmaps from spreadsheet similarity matrices"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    Render(RenderArgs),
}

#[derive(Parser)]
pub struct RenderArgs {
    /// Matrix files (.xlsx, .csv, .tsv), one panel each, left to right
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    #[arg(long)]
    pub png: PathBuf,

    #[arg(long)]
    pub svg: PathBuf,

    #[arg(long)]
    pub pdf: Option<PathBuf>,

    /// 0, 90, 180 or 270
    #[arg(long, default_value_t = 90)]
    pub rotation: u32,

    /// Inches per matrix cell
    #[arg(long, default_value_t = 1.0)]
    pub box_size: f64,

    #[arg(long, default_value_t = 20.0)]
    pub annotation_fontsize: f64,

    #[arg(long, default_value_t = 20.0)]
    pub axis_fontsize: f64,

    #[arg(long, default_value_t = 20.0)]
    pub colorbar_fontsize: f64,
}
