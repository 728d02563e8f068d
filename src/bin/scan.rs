use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::path::PathBuf;

use umbra::treescan::{self, DepthLimit, ScanOptions};

#[derive(Parser)]
#[command(name = "umbra-scan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Annotate a directory tree with sniffed content types")]
struct Cli {
    /// Folder to scan
    folder: PathBuf,

    /// 'max' for unlimited depth, or an integer level limit
    #[arg(long, alias = "max_depth", default_value = "1")]
    max_depth: DepthLimit,

    /// Save the report to a .txt file instead of printing it
    #[arg(long)]
    output: Option<PathBuf>,

    /// Expand ZIP archives in place (office containers stay sealed)
    #[arg(long)]
    unzip: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let opts = ScanOptions {
        max_depth: cli.max_depth,
        expand_archives: cli.unzip,
    };

    let lines = treescan::scan_tree(&cli.folder, &opts)
        .with_context(|| format!("failed to scan {}", cli.folder.display()))?;

    match &cli.output {
        Some(path) => {
            let written = treescan::write_report(&lines, path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            if written {
                println!(
                    "Report written to {}",
                    style(path.display()).green().bold()
                );
            } else {
                println!(
                    "[!] {}",
                    style("Please use a .txt extension for the output file.").yellow()
                );
            }
        }
        None => println!("{}", lines.join("\n")),
    }

    Ok(())
}
