use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::PathBuf;

use umbra::keysearch::KeySearch;
use umbra::triage::{self, DEFAULT_MIN_RUN};

#[derive(Parser)]
#[command(name = "umbra-recover")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Brute-force two-byte XOR keys against an encrypted blob")]
struct Cli {
    /// Encrypted blob to attack
    blob: PathBuf,

    /// Directory for recovered plaintext candidates
    #[arg(short, long, default_value = "./recovered")]
    output: PathBuf,

    /// Image file to run triage diagnostics on before the key search
    #[arg(long)]
    image: Option<PathBuf>,

    /// Minimum printable run length for string extraction
    #[arg(long, default_value_t = DEFAULT_MIN_RUN)]
    min_run: usize,

    /// Sweep the full key space instead of only digit-bearing keys
    #[arg(long)]
    all_keys: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    println!("{}", style("Umbra - XOR Key Recovery").cyan().bold());

    if let Some(image) = &cli.image {
        run_triage(image, cli.min_run)?;
    }

    println!();
    println!(
        "{} {}",
        style("Brute-forcing XOR keys on:").cyan(),
        cli.blob.display()
    );

    let search = KeySearch::new(&cli.blob, &cli.output).with_digit_filter(!cli.all_keys);
    println!("Trying {} candidate keys", search.candidate_count());

    let pb = ProgressBar::new(256);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} key stripes")?
            .progress_chars("=>-"),
    );
    let progress = |done: usize, _total: usize| pb.set_position(done as u64);

    let found = search
        .run(Some(&progress))
        .context("key search failed")?;
    pb.finish_and_clear();

    for hit in &found {
        println!(
            "[+] Valid file: {} | Key: ({},{}) -> {}",
            hit.mime,
            hit.key.0,
            hit.key.1,
            hit.path.display()
        );
    }

    if found.is_empty() {
        println!("[-] No valid headers detected.");
    } else {
        println!(
            "{} potential files recovered.",
            style(found.len()).green().bold()
        );
    }

    Ok(())
}

/// Run the three diagnostic passes on a single file. Decode failures are
/// logged and skipped; an unreadable file is a fatal configuration error.
fn run_triage(path: &PathBuf, min_run: usize) -> Result<()> {
    println!();
    println!("{} {}", style("Analyzing image:").cyan(), path.display());
    match triage::inspect_image(path) {
        Ok(summary) => {
            let format = summary
                .format
                .map(|f| format!("{f:?}"))
                .unwrap_or_else(|| "unknown".to_string());
            println!(
                "[+] Format: {}, Size: {}x{}, Color: {:?}",
                format, summary.width, summary.height, summary.color
            );
        }
        Err(e) => println!("[!] Failed to open image: {e}"),
    }

    let data = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;

    println!();
    println!("{}", style("Extracting ASCII strings:").cyan());
    for run in triage::ascii_runs(&data, min_run) {
        println!("{:>8x}  {}", run.offset, run.text);
    }

    println!();
    println!("{}", style("Checking for BMP trailing data:").cyan());
    match triage::bmp_trailing(&data) {
        Ok(Some(trailing)) => {
            println!("[+] Extra {} bytes found after BMP data", trailing.extra());
            println!("[+] Sample (hex): {}", hex::encode(&trailing.preview));
        }
        Ok(None) => println!("[-] No extra data detected"),
        Err(e) => println!("[!] {e}"),
    }

    Ok(())
}
