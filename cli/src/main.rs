//! ocrchunk CLI - OCR page cleaning and chunk quality tool
//!
//! Cleans JSONL page dumps into scored chunks, evaluates chunk files and
//! audits raw extractions.

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use ocrchunk::{
    audit_path, AuditResults, BatchRunner, CleaningProfile, CorpusReport, Domain, DomainConfig,
    PipelineOptions,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// OCR page cleaning, chunking and quality evaluation
#[derive(Parser)]
#[command(
    name = "ocrchunk",
    version,
    about = "Clean, chunk and quality-score OCR page text",
    long_about = "ocrchunk - OCR page cleaning and chunk quality tool.\n\n\
                  Reads JSONL page records ({text, metadata}) and writes bounded,\n\
                  quality-tagged chunks plus per-file and corpus reports.\n\n\
                  Usage:\n  \
                  ocrchunk clean <input> -o <out>   Clean a file or directory\n  \
                  ocrchunk eval <input> -o <out>    Evaluate chunked files\n  \
                  ocrchunk audit <input>            Check raw extractions"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean page files into chunk files
    Clean {
        /// Input file or directory of *.jsonl page files
        input: PathBuf,

        /// Output directory (default: <input>_cleaned)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Evaluate already chunked files
    #[command(visible_alias = "evaluate")]
    Eval {
        /// Input file or directory of chunked *.jsonl files
        input: PathBuf,

        /// Report directory (default: <input>_reports)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Check whether raw extraction files need cleaning
    Audit {
        /// Input file or directory of raw *.jsonl files
        input: PathBuf,

        /// Print reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the scoring profile of every domain
    Domains {
        /// Show strict-mode values
        #[arg(long)]
        strict: bool,
    },
}

/// Options shared by `clean` and `eval`.
#[derive(Args, Clone)]
struct RunArgs {
    /// Scoring domain (default: inferred from the file path)
    #[arg(long, env = "OCRCHUNK_DOMAIN")]
    domain: Option<DomainArg>,

    /// Tighten scoring thresholds
    #[arg(long, env = "OCRCHUNK_STRICT", value_parser = clap::builder::BoolishValueParser::new())]
    strict: bool,

    /// Run the scorer corruption self-test
    #[arg(long, env = "OCRCHUNK_SELFTEST", value_parser = clap::builder::BoolishValueParser::new())]
    self_test: bool,

    /// Self-test sample size
    #[arg(long, env = "OCRCHUNK_SAMPLE_N", default_value = "30")]
    sample_n: usize,

    /// Number of worst chunks to report
    #[arg(long, default_value = "20")]
    worst_n: usize,

    /// Minimum chunk length in chars
    #[arg(long, default_value = "400")]
    chunk_min: usize,

    /// Maximum chunk length in chars
    #[arg(long, default_value = "700")]
    chunk_max: usize,

    /// Cleaning threshold profile
    #[arg(long, default_value = "standard")]
    profile: ProfileArg,

    /// Keep Arabic diacritics
    #[arg(long)]
    keep_diacritics: bool,

    /// Process files one at a time
    #[arg(long)]
    sequential: bool,
}

/// Scoring domain
#[derive(Clone, Copy, ValueEnum)]
enum DomainArg {
    Math,
    Science,
    Textual,
}

impl From<DomainArg> for Domain {
    fn from(arg: DomainArg) -> Self {
        match arg {
            DomainArg::Math => Domain::Math,
            DomainArg::Science => Domain::Science,
            DomainArg::Textual => Domain::Textual,
        }
    }
}

/// Cleaning threshold profile
#[derive(Clone, Copy, ValueEnum)]
enum ProfileArg {
    /// Chunk arabic floor 0.40, overflow tolerance 150
    Standard,
    /// Chunk arabic floor 0.30, overflow tolerance 200
    Relaxed,
}

impl From<ProfileArg> for CleaningProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Standard => CleaningProfile::Standard,
            ProfileArg::Relaxed => CleaningProfile::Relaxed,
        }
    }
}

impl RunArgs {
    fn to_options(&self) -> PipelineOptions {
        let mut options = PipelineOptions::from_profile(self.profile.into())
            .with_chunk_window(self.chunk_min, self.chunk_max)
            .with_worst_n(self.worst_n);
        if let Some(domain) = self.domain {
            options = options.with_domain(domain.into());
        }
        if self.strict {
            options = options.strict();
        }
        if self.self_test {
            options = options.with_self_test(self.sample_n);
        }
        if self.keep_diacritics {
            options = options.keep_diacritics();
        }
        if self.sequential {
            options = options.sequential();
        }
        options
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter),
        )
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Clean { input, output, run } => {
            let out_dir = output.unwrap_or_else(|| sibling_dir(&input, "cleaned"));
            let options = run.to_options();
            tracing::debug!(?options, out_dir = %out_dir.display(), "clean");

            let pb = create_spinner("Cleaning pages...");
            let corpus = BatchRunner::new(&options, &out_dir)?.clean(&input)?;
            pb.finish_and_clear();

            print_corpus("Cleaning Complete", &corpus, &out_dir);
        }

        Commands::Eval { input, output, run } => {
            let out_dir = output.unwrap_or_else(|| sibling_dir(&input, "reports"));
            let options = run.to_options();
            tracing::debug!(?options, out_dir = %out_dir.display(), "eval");

            let pb = create_spinner("Evaluating chunks...");
            let corpus = BatchRunner::new(&options, &out_dir)?.evaluate(&input)?;
            pb.finish_and_clear();

            print_corpus("Evaluation Complete", &corpus, &out_dir);
        }

        Commands::Audit { input, json } => {
            let pb = create_spinner("Auditing files...");
            let results = audit_path(&input)?;
            pb.finish_and_clear();

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print_audit(&results);
            }
        }

        Commands::Domains { strict } => {
            print_domains(strict);
        }
    }

    Ok(())
}

/// `<input>_<suffix>` next to the input. Relative inputs such as `.` are
/// resolved first so the directory always gets a real name.
fn sibling_dir(input: &Path, suffix: &str) -> PathBuf {
    let input = input.canonicalize().unwrap_or_else(|_| input.to_path_buf());
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "ocrchunk".to_string());
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{}_{}", stem, suffix))
}

fn print_corpus(title: &str, corpus: &CorpusReport, out_dir: &Path) {
    println!("{}", title.green().bold());
    println!("{}", "─".repeat(40));
    println!("{}: {}", "Output".bold(), out_dir.display());

    for r in &corpus.results {
        let cleanliness = format!("{:.2}%", r.data_cleanliness_percent);
        let cleanliness = if r.data_cleanliness_percent >= 70.0 {
            cleanliness.green()
        } else {
            cleanliness.yellow()
        };
        println!(
            "  {} {} [{}] chunks={} cleanliness={} quality={:.2}",
            "✓".green(),
            r.file.display(),
            r.domain,
            r.total_chunks,
            cleanliness,
            r.quality_mean
        );
    }
    for f in &corpus.failures {
        println!("  {} {}: {}", "✗".red(), f.file.display(), f.error);
    }

    println!("\n{}", "Statistics".cyan().bold());
    println!("{}", "─".repeat(40));
    println!("{}: {}", "Files".bold(), corpus.results.len());
    println!("{}: {}", "Failures".bold(), corpus.failures.len());
    println!("{}: {}", "Chunks".bold(), corpus.total_chunks());
    let summary = &corpus.summary;
    println!("{}: {}", "Noisy chunks".bold(), summary.noisy_chunks);
    println!("{}: {:.2}%", "Cleanliness".bold(), summary.data_cleanliness_percent);
    println!("{}: {:.2}", "Quality mean".bold(), summary.quality_mean);
    println!(
        "{}: {} exact, {} near",
        "Duplicates".bold(),
        summary.exact_duplicates,
        summary.near_duplicates
    );
}

fn print_audit(results: &AuditResults) {
    for r in &results.reports {
        let verdict = if r.needs_cleaning {
            "needs cleaning".yellow().bold()
        } else {
            "clean".green().bold()
        };
        println!(
            "- {} [{}] {}",
            r.file.display(),
            r.subject.as_deref().unwrap_or("unknown"),
            verdict
        );
        println!(
            "  total={}, avg_len={:.1}, avg_ar={:.3}, avg_dr={:.3}, hiDigit={:.1}%, lowAr={:.1}%",
            r.total,
            r.avg_len,
            r.avg_arabic,
            r.avg_digit,
            r.high_digit_share * 100.0,
            r.low_arabic_share * 100.0
        );
        for reason in &r.reasons {
            println!("  {} {}", "!".yellow(), reason);
        }
    }
    for f in &results.failures {
        println!("- {} {}: {}", "✗".red(), f.file.display(), f.error);
    }
    println!(
        "\n{}: {} / {} files need cleaning, {} unreadable",
        "Summary".bold(),
        results.needs_cleaning(),
        results.reports.len(),
        results.failures.len()
    );
}

fn print_domains(strict: bool) {
    let mode = if strict { "strict" } else { "normal" };
    println!("{} ({})", "Domain Profiles".cyan().bold(), mode);
    println!("{}", "─".repeat(40));
    for domain in Domain::ALL {
        let c = DomainConfig::resolve(domain, strict);
        println!("{}", domain.to_string().bold());
        println!(
            "  low_arabic<{:.2} digit_heavy>{:.2} (ar<{:.2}) digit_baseline={:.2}",
            c.low_arabic_lt, c.digit_heavy_gt, c.digit_heavy_ar_lt, c.digit_baseline
        );
        println!(
            "  latin_noise>{:.2} punct_heavy>{:.2} min_chars={}",
            c.latin_noise_gt, c.punct_heavy_gt, c.min_chars
        );
        println!(
            "  weights: arabic={} digit(math)={} digit(no math)={} latin={} punct={} short={}",
            c.w_arabic, c.w_digit_with_math, c.w_digit_no_math, c.w_latin, c.w_punct, c.short_penalty
        );
    }
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner:.blue} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
