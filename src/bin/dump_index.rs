use std::fs::File;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use genodex::cli;
use genodex::feature::FeatureType;
use genodex::store::radix_index::RadixIndex;
use genodex::store::window_index::WindowIndex;

#[derive(Parser)]
#[command(name = "dump_index", about = "Inspect a Genodex companion file")]
struct Cli {
    /// Path to a .gfb (window) or .rgfb (radix) companion file
    path: PathBuf,

    /// Decode and list the first N gene names (radix files only)
    #[arg(short = 'p', long = "peek", default_value_t = 0)]
    peek: usize,
}

fn main() -> Result<()> {
    let cli_args = Cli::parse();

    cli::banner("Dump Index");

    let file = File::open(&cli_args.path)
        .with_context(|| format!("failed to open {}", cli_args.path.display()))?;
    let extension = cli_args
        .path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    match extension {
        "gfb" => dump_window(file),
        "rgfb" => dump_radix(file, cli_args.peek),
        other => bail!("unrecognized companion file extension: '{other}'"),
    }
}

fn dump_window(file: File) -> Result<()> {
    cli::section("Window File");

    let mut index = WindowIndex::open(file)?;
    cli::kv("Window", &format!("{} bp", index.window_size()));
    cli::kv("Bins", &index.bin_count().to_string());

    let mut occupied = 0u32;
    let mut listings = 0usize;
    let mut unique = std::collections::HashSet::new();
    for bin in 0..index.bin_count() {
        let addresses = index.bin_addresses(bin)?;
        if !addresses.is_empty() {
            occupied += 1;
        }
        listings += addresses.len();
        unique.extend(addresses);
    }
    cli::kv("Occupied bins", &occupied.to_string());
    cli::kv("Genes", &unique.len().to_string());
    cli::kv("Bin listings", &listings.to_string());
    cli::success("header and bin table are valid");
    eprintln!();
    Ok(())
}

fn dump_radix(file: File, peek: usize) -> Result<()> {
    cli::section("Radix File");

    let mut index = RadixIndex::open(file)?;
    let addresses = index.all_addresses()?;
    cli::kv("Records", &addresses.len().to_string());

    for &address in addresses.iter().take(peek) {
        for gene in index.decode_at(address, FeatureType::Gene)? {
            let name = gene.property("gene_name").unwrap_or("(unnamed)");
            cli::kv(
                name,
                &format!("{}:{}-{} {}", gene.chromosome(), gene.start, gene.end, gene.strand),
            );
        }
    }
    cli::success("header and record list are valid");
    eprintln!();
    Ok(())
}
