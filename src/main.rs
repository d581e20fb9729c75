use clap::{Parser, Subcommand};
use colored::Colorize;
use link_advisor::store::PatternStore;
use link_advisor::suggestion::{find_latest_report, load_broken_links, ConfidenceTier};
use link_advisor::{report, AdvisorConfig, LinkAdvisor};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// link-advisor - Suggest fixes for broken links in a markdown knowledge base
#[derive(Parser)]
#[command(name = "link-advisor")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true, default_value = ".link-advisor.toml")]
    config: PathBuf,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log scan, learning and ranking progress
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Root of the markdown corpus
    #[arg(short, long, global = true, default_value = ".")]
    root: PathBuf,

    /// Pattern store path (overrides the config file)
    #[arg(long, global = true)]
    store: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the corpus and learn link patterns from its valid links
    Analyze,

    /// Suggest replacement targets for broken links
    Suggest {
        /// Broken link report (JSON or YAML); defaults to the newest report in --results-dir
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Directory searched for broken_links_*.json reports
        #[arg(long, default_value = "test-results")]
        results_dir: PathBuf,

        /// Markdown report to write
        #[arg(short, long, default_value = "ai-suggestions.md")]
        output: PathBuf,

        /// Print suggestions as JSON instead of writing the report
        #[arg(long)]
        json: bool,
    },

    /// List learned patterns, most used first
    Patterns {
        /// Only patterns used more than this many times
        #[arg(short, long, default_value = "0")]
        min_usage: u32,

        /// Maximum patterns to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = run(cli);

    if let Err(e) = result {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Analyze => cmd_analyze(&cli.root, config, cli.quiet),
        Commands::Suggest { input, results_dir, output, json } => {
            cmd_suggest(&cli.root, config, input.as_deref(), &results_dir, &output, json, cli.quiet)
        }
        Commands::Patterns { min_usage, limit, json } => {
            cmd_patterns(&config, min_usage, limit, json)
        }
    }
}

fn load_config(cli: &Cli) -> Result<AdvisorConfig, Box<dyn std::error::Error>> {
    let mut config = AdvisorConfig::load(&cli.config)?;
    if let Some(store) = &cli.store {
        config.store.path = store.clone();
    }
    Ok(config)
}

fn cmd_analyze(root: &Path, config: AdvisorConfig, quiet: bool) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let store_path = config.store.path.clone();

    if !quiet {
        println!("{} {}", "Analyzing".cyan().bold(), root.display());
    }

    let mut advisor = LinkAdvisor::open(root, config)?;
    let (snapshot, summary) = advisor.analyze_existing_links()?;
    let stored = advisor.store().pattern_count()?;

    if !quiet {
        println!();
        println!("{}", "Link Statistics".green().bold());
        println!("  Documents scanned:  {}", snapshot.document_count().to_string().cyan());
        println!("  Link occurrences:   {}", snapshot.occurrences().len().to_string().cyan());
        println!("  Distinct targets:   {}", snapshot.link_usage().len().to_string().cyan());
        println!("  Shared targets:     {}", summary.shared_targets.to_string().cyan());
        println!("  Patterns learned:   {}", summary.inserted.to_string().cyan());
        println!("  Patterns updated:   {}", summary.updated.to_string().cyan());
        println!("  Patterns stored:    {}", stored.to_string().cyan());
        println!("  Time elapsed:       {:.2?}", start.elapsed());
        println!();
        println!("{} {}", "Patterns stored in".green(), store_path.display().to_string().cyan());
    }

    Ok(())
}

fn cmd_suggest(
    root: &Path,
    config: AdvisorConfig,
    input: Option<&Path>,
    results_dir: &Path,
    output: &Path,
    json: bool,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let input = match input {
        Some(path) => path.to_path_buf(),
        None => find_latest_report(results_dir)?,
    };
    let broken_links = load_broken_links(&input)?;

    if broken_links.is_empty() {
        if json {
            println!("[]");
        } else if !quiet {
            println!("{}", "No broken links found".green());
        }
        return Ok(());
    }

    if !quiet && !json {
        println!(
            "{} {} broken links from {}",
            "Loaded".cyan().bold(),
            broken_links.len(),
            input.display()
        );
    }

    let mut advisor = LinkAdvisor::open(root, config)?;
    let snapshot = advisor.scan()?;
    let loaded = advisor.load_patterns()?;
    let suggestions = advisor.suggest_fixes(&snapshot, &broken_links);

    if json {
        println!("{}", serde_json::to_string_pretty(&suggestions)?);
        return Ok(());
    }

    report::write_report(output, &suggestions)?;

    if !quiet {
        let count = |tier: ConfidenceTier| suggestions.iter().filter(|s| s.tier() == tier).count();

        println!();
        println!("{}", "Suggestion Statistics".green().bold());
        println!("  Documents scanned:  {}", snapshot.document_count().to_string().cyan());
        println!("  Patterns loaded:    {}", loaded.to_string().cyan());
        println!("  Suggestions:        {}", suggestions.len().to_string().cyan());
        println!("    High:             {}", count(ConfidenceTier::High).to_string().green());
        println!("    Medium:           {}", count(ConfidenceTier::Medium).to_string().yellow());
        println!("    Low:              {}", count(ConfidenceTier::Low).to_string().dimmed());
        println!();
        println!("{} {}", "Report written to".green(), output.display().to_string().cyan());
    }

    Ok(())
}

fn cmd_patterns(
    config: &AdvisorConfig,
    min_usage: u32,
    limit: usize,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = PatternStore::open(&config.store.path)?;
    let mut patterns = store.query_candidates(min_usage)?;
    patterns.truncate(limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&patterns)?);
        return Ok(());
    }

    if patterns.is_empty() {
        println!("{}", "No learned patterns. Run `link-advisor analyze` first.".yellow());
        return Ok(());
    }

    println!("{}", format!("Top {} Patterns", patterns.len()).green().bold());
    println!();

    for pattern in &patterns {
        println!(
            "  {:>5} {:>6.1}%  {} -> {}",
            pattern.usage_count,
            pattern.success_rate() * 100.0,
            pattern.signature.to_string().dimmed(),
            pattern.target_template.cyan()
        );
    }

    Ok(())
}
