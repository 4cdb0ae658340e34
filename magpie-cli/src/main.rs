//! Magpie CLI
//!
//! Compare two element reports, or generate selectors for a DOM snapshot,
//! from the command line.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use magpie_common::config::MagpieConfig;
use magpie_common::net;
use magpie_compare::{Comparator, ComparisonResult};
use magpie_diff::ComparisonMode;
use magpie_dom::DomTree;
use magpie_report::Report;
use magpie_selectors::SelectorGenerator;
use owo_colors::OwoColorize as _;

/// Magpie - visual-regression comparison for DOM element reports
#[derive(Parser, Debug)]
#[command(name = "magpie-cli")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # Compare two report files and print a colored summary
    magpie-cli compare baseline.json head.json

    # Dynamic mode, full JSON output to a file
    magpie-cli compare baseline.json head.json --mode dynamic --json -o diff.json

    # Fetch the baseline from a capture service
    magpie-cli compare https://captures.internal/run/41 head.json

    # Fail the build when high or critical differences appear
    magpie-cli compare baseline.json head.json --check

    # Generate selectors for every element of a DOM snapshot
    magpie-cli selectors snapshot.json --limit 20
"#)]
struct Cli {
    /// Path to a JSON config file overriding the defaults
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare two element reports
    Compare {
        /// Baseline report (file path or URL)
        baseline: String,
        /// Compare report (file path or URL)
        compare: String,
        /// Comparison mode
        #[arg(long, value_enum, default_value = "static")]
        mode: ModeArg,
        /// Print the full result as JSON instead of a summary
        #[arg(long)]
        json: bool,
        /// Write the full JSON result to a file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Exit with status 2 when high or critical differences exist
        #[arg(long)]
        check: bool,
    },
    /// Generate CSS selectors and XPaths for a DOM snapshot
    Selectors {
        /// DOM snapshot JSON (file path or URL)
        snapshot: String,
        /// Only print the first N elements
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },
}

/// Comparison mode flag.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Strict visual regression
    Static,
    /// Resilient to content churn
    Dynamic,
}

impl From<ModeArg> for ComparisonMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Static => Self::Static,
            ModeArg::Dynamic => Self::Dynamic,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => MagpieConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => MagpieConfig::default(),
    };

    match cli.command {
        Command::Compare { baseline, compare, mode, json, output, check } => {
            run_compare(&config, &baseline, &compare, mode.into(), json, output.as_deref(), check)
        }
        Command::Selectors { snapshot, limit } => run_selectors(&config, &snapshot, limit),
    }
}

/// Read a source argument as either a URL or a local file.
fn load_text(source: &str) -> Result<String> {
    if net::is_url(source) {
        net::fetch_text(source).with_context(|| format!("fetching {source}"))
    } else {
        fs::read_to_string(source).with_context(|| format!("reading {source}"))
    }
}

fn run_compare(
    config: &MagpieConfig,
    baseline_source: &str,
    compare_source: &str,
    mode: ComparisonMode,
    json: bool,
    output: Option<&Path>,
    check: bool,
) -> Result<()> {
    let baseline = Report::from_json_str(&load_text(baseline_source)?)
        .with_context(|| format!("parsing baseline report {baseline_source}"))?;
    let compare = Report::from_json_str(&load_text(compare_source)?)
        .with_context(|| format!("parsing compare report {compare_source}"))?;

    let comparator = Comparator::new(config.clone());
    let result = comparator.compare(&baseline, &compare, mode);

    if let Some(path) = output {
        fs::write(path, serde_json::to_string_pretty(&result)?)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Result written to {}", path.display());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }

    let recovered = comparator.diagnostics().total();
    if recovered > 0 {
        eprintln!("{}", format!("({recovered} values fell back to raw comparison)").dimmed());
    }

    if check {
        let counts = &result.comparison.summary.severity_counts;
        if counts.critical + counts.high > 0 {
            std::process::exit(2);
        }
    }
    Ok(())
}

/// Print the human-readable comparison summary.
fn print_summary(result: &ComparisonResult) {
    println!("{}", "=== Comparison ===".bold());
    println!("  baseline: {} ({})", result.baseline.url, result.baseline.id);
    println!("  compare:  {} ({})", result.compare.url, result.compare.id);
    println!("  mode: {}   duration: {}ms", result.mode, result.duration);

    println!("\n{}", "=== Matching ===".bold());
    println!(
        "  {} matched ({}%), {} removed, {} added",
        result.matching.total_matched,
        result.matching.match_rate,
        result.matching.unmatched_baseline,
        result.matching.unmatched_compare,
    );

    let summary = &result.comparison.summary;
    println!("\n{}", "=== Differences ===".bold());
    println!(
        "  {} elements compared: {} unchanged, {} modified",
        summary.total_elements, summary.unchanged_elements, summary.modified_elements
    );
    let counts = &summary.severity_counts;
    println!(
        "  {} total: {} {} {} {}",
        summary.total_differences,
        format!("{} critical", counts.critical).red(),
        format!("{} high", counts.high).yellow(),
        format!("{} medium", counts.medium).cyan(),
        format!("{} low", counts.low).dimmed(),
    );

    for element in result.comparison.results.iter().filter(|r| r.total_differences > 0) {
        println!("\n  {} <{}>", element.element_id.bold(), element.tag_name);
        for difference in &element.differences {
            println!(
                "    [{}] {} {}: {} -> {}",
                difference.severity,
                difference.category,
                difference.property,
                difference.base_value.as_deref().unwrap_or("(absent)"),
                difference.compare_value.as_deref().unwrap_or("(absent)"),
            );
        }
    }

    if !result.unmatched_elements.baseline.is_empty() {
        println!("\n{}", "=== Removed elements ===".bold());
        for element in &result.unmatched_elements.baseline {
            println!("  {} <{}> {}", element.id, element.tag_name, element.selector.dimmed());
        }
    }
    if !result.unmatched_elements.compare.is_empty() {
        println!("\n{}", "=== Added elements ===".bold());
        for element in &result.unmatched_elements.compare {
            println!("  {} <{}> {}", element.id, element.tag_name, element.selector.dimmed());
        }
    }
}

fn run_selectors(config: &MagpieConfig, snapshot_source: &str, limit: Option<usize>) -> Result<()> {
    let tree = DomTree::from_snapshot_json(&load_text(snapshot_source)?)
        .with_context(|| format!("parsing DOM snapshot {snapshot_source}"))?;
    let tree = Arc::new(tree);
    let generator = SelectorGenerator::new(&config.selectors);

    let elements: Vec<_> = tree.elements().collect();
    let shown = limit.unwrap_or(elements.len());
    for &element in elements.iter().take(shown) {
        let tag = tree.tag_name(element).unwrap_or("?");
        let selectors = generator.generate(&tree, element);
        println!("{}", format!("<{tag}>").bold());
        println!(
            "  css:   {}  ({}, {})",
            selectors.css.value,
            selectors.css.confidence,
            selectors.css.strategy.dimmed()
        );
        println!(
            "  xpath: {}  ({}, {})",
            selectors.xpath.value,
            selectors.xpath.confidence,
            selectors.xpath.strategy.dimmed()
        );
    }
    if shown < elements.len() {
        println!("... {} more elements", elements.len() - shown);
    }
    Ok(())
}
