use std::collections::BTreeMap;
use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

use genodex::cli;
use genodex::config::StoreConfig;
use genodex::feature::{FeatureType, GenomicFeature};
use genodex::store::radix_index::{RadixIndexWriter, DEFAULT_IDENTIFIER_KEYS};
use genodex::store::window_index::WindowIndexWriter;
use genodex::store::{radix_file_name, window_file_name};
use genodex::strand::Strand;

#[derive(Parser)]
#[command(name = "build_store", about = "Build Genodex companion files from a feature dump")]
struct Cli {
    /// Path to the JSON store configuration file
    #[arg(short = 'c', long = "config")]
    config: PathBuf,

    /// Path to the JSON feature dump (gene/transcript/exon trees)
    #[arg(short = 'i', long = "input")]
    input: PathBuf,
}

/// One record of the materialized feature dump.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeatureDump {
    #[serde(default)]
    id: u32,
    chromosome: Option<String>,
    start: i32,
    end: i32,
    strand: String,
    #[serde(default)]
    properties: BTreeMap<String, String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    transcripts: Vec<FeatureDump>,
    #[serde(default)]
    exons: Vec<FeatureDump>,
}

#[derive(Debug, Deserialize)]
struct StoreDump {
    genes: Vec<FeatureDump>,
}

impl FeatureDump {
    /// Convert one dump node, inheriting the chromosome from its parent.
    fn to_feature(&self, feature_type: FeatureType, chromosome: Option<&str>) -> Result<GenomicFeature> {
        let chromosome = self
            .chromosome
            .as_deref()
            .or(chromosome)
            .context("feature dump entry has no chromosome")?;
        let strand: Strand = self.strand.parse()?;

        let mut feature =
            GenomicFeature::new(feature_type, chromosome, self.start, self.end, strand)?;
        feature.id = self.id;
        for (key, value) in &self.properties {
            feature.set_property(key, value.clone());
        }
        for tag in &self.tags {
            feature.add_tag(tag.clone());
        }

        let children = match feature_type {
            FeatureType::Gene => (&self.transcripts, FeatureType::Transcript),
            FeatureType::Transcript => (&self.exons, FeatureType::Exon),
            _ => return Ok(feature),
        };
        for child in children.0 {
            feature.add_child(child.to_feature(children.1, Some(chromosome))?);
        }
        Ok(feature)
    }
}

fn main() -> Result<()> {
    let start = Instant::now();
    let cli_args = Cli::parse();

    cli::banner("Build Store");

    // ── Configuration ────────────────────────────────────
    cli::section("Configuration");

    let config = StoreConfig::from_file(&cli_args.config)?;
    cli::kv("Config", &cli_args.config.display().to_string());
    cli::kv("Assembly", &config.genome_assembly);
    cli::kv("Window", &format!("{} bp", config.window_size));
    cli::kv("Output", &config.data_dir.display().to_string());
    eprintln!();

    // ── Feature Dump ─────────────────────────────────────
    cli::section("Feature Dump");

    let dump_file = File::open(&cli_args.input)
        .with_context(|| format!("failed to open feature dump: {}", cli_args.input.display()))?;
    let dump: StoreDump = serde_json::from_reader(dump_file)
        .with_context(|| format!("failed to parse feature dump: {}", cli_args.input.display()))?;

    let mut genes = Vec::with_capacity(dump.genes.len());
    for entry in &dump.genes {
        genes.push(entry.to_feature(FeatureType::Gene, None)?);
    }
    let transcript_count: usize = genes.iter().map(|g| g.children().len()).sum();
    cli::kv("Genes", &genes.len().to_string());
    cli::kv("Transcripts", &transcript_count.to_string());
    eprintln!();

    // ── Window Files ─────────────────────────────────────
    cli::section("Window Files");

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("failed to create {}", config.data_dir.display()))?;

    let mut by_chromosome: BTreeMap<String, Vec<GenomicFeature>> = BTreeMap::new();
    for gene in &genes {
        by_chromosome
            .entry(gene.chromosome().to_string())
            .or_default()
            .push(gene.clone());
    }

    for (chromosome, chromosome_genes) in &by_chromosome {
        let name = window_file_name(&config.genome_assembly, chromosome, config.window_size);
        let path = config.data_dir.join(&name);
        let mut file = File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        WindowIndexWriter::write(&mut file, config.window_size, chromosome_genes)?;
        cli::success(&format!("{name} ({} genes)", chromosome_genes.len()));
    }
    if by_chromosome.is_empty() {
        cli::warning("no genes in dump; no window files written");
    }
    eprintln!();

    // ── Radix File ───────────────────────────────────────
    cli::section("Radix File");

    let name = radix_file_name(&config.genome_assembly);
    let path = config.data_dir.join(&name);
    let mut file =
        File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
    RadixIndexWriter::write(&mut file, &genes, DEFAULT_IDENTIFIER_KEYS)?;
    cli::success(&format!("{name} ({} records)", genes.len()));

    cli::print_summary(start);
    Ok(())
}
