use clap::{Args, Parser, Subcommand};

use peak_map::peak::PeakId;

#[derive(Parser)]
#[command(name = "peak-map", version, about = "Peak map client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Lists the peaks inside a bounding box.
    List(ListArgs),
    Create(PeakArgs),
    Update(UpdateArgs),
    Delete(DeleteArgs),
    /// Drives a headless map session from JSON lines on stdin.
    Watch,
    /// Serves an in-memory peak API.
    MockApi(MockApiArgs),
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(long, allow_hyphen_values = true)]
    pub north: f64,
    #[arg(long, allow_hyphen_values = true)]
    pub south: f64,
    #[arg(long, allow_hyphen_values = true)]
    pub east: f64,
    #[arg(long, allow_hyphen_values = true)]
    pub west: f64,
}

#[derive(Args)]
pub struct PeakArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long, allow_hyphen_values = true)]
    pub altitude: String,
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,
}

#[derive(Args)]
pub struct UpdateArgs {
    #[arg(long)]
    pub id: PeakId,
    #[command(flatten)]
    pub peak: PeakArgs,
}

#[derive(Args)]
pub struct DeleteArgs {
    #[arg(long)]
    pub id: PeakId,
}

#[derive(Args)]
pub struct MockApiArgs {
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub bind: String,
}
