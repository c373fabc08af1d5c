//! CLI binary for jats2myst.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig`, converts each input and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use jats2myst::{
    convert_to_file, inspect, ConversionConfig, ConversionStats, FrontmatterMode, JatsError,
};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert one article (writes article.myst.json + logs next to it)
  jats2myst article.xml

  # Convert every *.xml file in a folder, four at a time
  jats2myst -c 4 papers/

  # Store frontmatter in the page, or merge it into myst.yml
  jats2myst --frontmatter page article.xml
  jats2myst --frontmatter project article.xml

  # Write outputs somewhere else, without logs or bibliography
  jats2myst --dir build/ --no-log --no-bibtex article.xml

  # Cite everything through the bibliography instead of DOIs
  jats2myst --no-dois article.xml

  # Metadata only, as JSON
  jats2myst --inspect-only --json article.xml

OUTPUT FILES (in --dir, default: next to the input):
  <name>.myst.json   MyST tree (plus frontmatter with --frontmatter page)
  <name>.log.json    Conversion log: identifiers, reference and element counts
  <name>.log.yml     Same log as YAML
  main.bib           Synthesised bibliography (only if it does not exist yet)
  myst.yml           Project frontmatter (with --frontmatter project)

ENVIRONMENT VARIABLES:
  JATS_PMID_CACHE_DIR   Directory of the PMID -> DOI cache
                        (default: <dir>/_build/cache)
  RUST_LOG              Log filter, overrides -v / -q
"#;

/// Convert JATS XML articles to MyST.
#[derive(Parser, Debug)]
#[command(
    name = "jats2myst",
    version,
    about = "Convert JATS XML articles to MyST",
    long_about = "Convert JATS journal-article XML into a MyST document tree. Sections become \
headings, back-matter notes become footnotes, and citations are resolved to DOIs or \
bibliography entries and grouped.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// JATS XML files, or folders holding them.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Where to write the outputs (default: next to each input).
    #[arg(short, long, env = "JATS2MYST_DIR")]
    dir: Option<PathBuf>,

    /// What to do with the extracted frontmatter.
    #[arg(long, env = "JATS2MYST_FRONTMATTER", value_enum, default_value = "ignore")]
    frontmatter: FrontmatterArg,

    /// Cite through the bibliography even when a DOI is available.
    #[arg(long, env = "JATS2MYST_NO_DOIS")]
    no_dois: bool,

    /// Do not write the bibliography file.
    #[arg(long, env = "JATS2MYST_NO_BIBTEX")]
    no_bibtex: bool,

    /// Bibliography file name.
    #[arg(long, env = "JATS2MYST_BIBLIOGRAPHY", default_value = "main.bib")]
    bibliography: String,

    /// Do not write the .log.json / .log.yml files.
    #[arg(long, env = "JATS2MYST_NO_LOG")]
    no_log: bool,

    /// Number of articles converted at once.
    #[arg(short, long, env = "JATS2MYST_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Print per-article stats (or metadata) as JSON on stdout.
    #[arg(long, env = "JATS2MYST_JSON")]
    json: bool,

    /// Print article metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "JATS2MYST_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "JATS2MYST_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "JATS2MYST_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FrontmatterArg {
    Ignore,
    Page,
    Project,
}

impl From<FrontmatterArg> for FrontmatterMode {
    fn from(v: FrontmatterArg) -> Self {
        match v {
            FrontmatterArg::Ignore => FrontmatterMode::Ignore,
            FrontmatterArg::Page => FrontmatterMode::Page,
            FrontmatterArg::Project => FrontmatterMode::Project,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let inputs = collect_inputs(&cli.inputs)?;
    if inputs.is_empty() {
        anyhow::bail!("No .xml files found in the given inputs");
    }

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        for input in &inputs {
            let info = inspect(input)
                .await
                .with_context(|| format!("Failed to inspect {}", input.display()))?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&info).context("Failed to serialize metadata")?
                );
                continue;
            }
            let fm = &info.frontmatter;
            println!("File:         {}", input.display());
            if let Some(ref t) = fm.title {
                println!("Title:        {}", t);
            }
            if !fm.authors.is_empty() {
                let names: Vec<&str> = fm.authors.iter().map(|a| a.name.as_str()).collect();
                println!("Authors:      {}", names.join(", "));
            }
            if let Some(ref j) = info.metadata.journal {
                println!("Journal:      {}", j);
            }
            if let Some(ref d) = info.metadata.doi {
                println!("DOI:          {}", d);
            }
            if let Some(ref y) = info.metadata.year {
                println!("Year:         {}", y);
            }
            if let Some(ref l) = info.metadata.license {
                println!("License:      {}", l);
            }
            println!("References:   {}", info.reference_count);
        }
        return Ok(());
    }

    // ── Run conversions ──────────────────────────────────────────────────
    let config = build_config(&cli)?;
    let bar = if show_progress {
        let bar = ProgressBar::new(inputs.len() as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} articles  \
                 ⏱ {elapsed_precise}  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    } else {
        None
    };

    let mut results = stream::iter(inputs.iter().map(|input| {
        let config = &config;
        async move { (input, convert_to_file(input, config).await) }
    }))
    .buffer_unordered(cli.concurrency.max(1));

    let mut failed = 0usize;
    let mut all_stats: Vec<serde_json::Value> = Vec::new();
    while let Some((input, result)) = results.next().await {
        let line = match &result {
            Ok(stats) => format!(
                "  {} {}  {}",
                green("✓"),
                input.display(),
                dim(&summary(stats)),
            ),
            Err(e) => {
                failed += 1;
                format!("  {} {}  {}", red("✗"), input.display(), red(&e.to_string()))
            }
        };
        match &bar {
            Some(bar) => {
                bar.println(line);
                bar.inc(1);
            }
            None if !cli.quiet && !cli.json => eprintln!("{line}"),
            None => {}
        }
        if cli.json {
            all_stats.push(json_entry(input, &result)?);
        }
    }
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&all_stats).context("Failed to serialise stats")?
        );
    } else if !cli.quiet {
        let converted = inputs.len() - failed;
        eprintln!(
            "{} {}/{} articles converted",
            if failed == 0 { green("✔") } else { cyan("⚠") },
            bold(&converted.to_string()),
            inputs.len(),
        );
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} conversions failed", inputs.len());
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .frontmatter(cli.frontmatter.into())
        .dois(!cli.no_dois)
        .write_bibtex(!cli.no_bibtex)
        .bibliography_file(cli.bibliography.clone())
        .write_log(!cli.no_log);
    if let Some(ref dir) = cli.dir {
        builder = builder.dir(dir.clone());
    }
    builder.build().context("Invalid configuration")
}

/// Expand folders into the `.xml` files they contain, sorted by name.
fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            out.push(input.clone());
            continue;
        }
        let mut found: Vec<PathBuf> = std::fs::read_dir(input)
            .with_context(|| format!("Failed to read folder {}", input.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| is_xml(p))
            .collect();
        found.sort();
        out.extend(found);
    }
    Ok(out)
}

fn is_xml(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

fn summary(stats: &ConversionStats) -> String {
    let mut parts = vec![
        format!("{} refs", stats.references.total),
        format!("{} figs", stats.figures.myst),
        format!("{} tables", stats.tables.myst),
        format!("{}ms", stats.total_duration_ms),
    ];
    if !stats.unhandled.is_empty() {
        parts.push(format!("unhandled: {}", stats.unhandled.join(", ")));
    }
    parts.join("  ")
}

fn json_entry(
    input: &Path,
    result: &Result<ConversionStats, JatsError>,
) -> Result<serde_json::Value> {
    let input = input.display().to_string();
    Ok(match result {
        Ok(stats) => serde_json::json!({
            "input": input,
            "stats": serde_json::to_value(stats).context("Failed to serialise stats")?,
        }),
        Err(e) => serde_json::json!({ "input": input, "error": e.to_string() }),
    })
}
