use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use simcheck::config::{
    DEFAULT_COSINE_WEIGHT, DEFAULT_HAMMING_WEIGHT, DEFAULT_HASHBITS, DEFAULT_MAX_DF,
    DEFAULT_MIN_DF, DEFAULT_WORKERS,
};
use simcheck::{CheckConfig, Checker, Document, Report};

#[derive(Parser, Debug)]
#[clap(
    name = "simcheck",
    about = "A program to rank documents by their text and code similarity to the rest of a corpus."
)]
struct Args {
    /// Directory of documents to be checked, one document per file.
    /// The file stem becomes the document name.
    #[clap(short = 'i', long)]
    document_dir: PathBuf,

    /// Directory of code files, matched to documents by file stem.
    /// A document without a matching code file has empty code.
    #[clap(short = 'c', long, conflicts_with = "split-cjk")]
    code_dir: Option<PathBuf>,

    /// Splits each document into text and code: lines containing CJK ideographs
    /// are text, the remaining lines are code.
    #[clap(long)]
    split_cjk: bool,

    /// Template document the submissions were written from. The longest run of
    /// more than 20 characters shared with it is removed from every document.
    #[clap(long)]
    template: Option<PathBuf>,

    /// Fingerprint width in bits.
    #[clap(short = 'b', long, default_value_t = DEFAULT_HASHBITS)]
    hashbits: usize,

    /// Multiplier of the average cosine similarity in text scores.
    #[clap(long, default_value_t = DEFAULT_COSINE_WEIGHT)]
    cosine_weight: f64,

    /// Multiplier of the normalized Hamming similarity in text scores.
    #[clap(long, default_value_t = DEFAULT_HAMMING_WEIGHT)]
    hamming_weight: f64,

    /// Number of worker threads.
    #[clap(short = 'w', long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Prunes features found in fewer than this fraction of documents.
    #[clap(long, default_value_t = DEFAULT_MIN_DF)]
    min_df: f64,

    /// Prunes features found in more than this fraction of documents.
    #[clap(long, default_value_t = DEFAULT_MAX_DF)]
    max_df: f64,

    /// Time budget in seconds of tokenizing one document.
    #[clap(short = 't', long)]
    task_timeout: Option<u64>,

    /// Logs progress to stderr. RUST_LOG overrides it.
    #[clap(short = 'v', long)]
    verbose: bool,
}

/// Coarse risk level of a ranked document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Band {
    High,
    Medium,
    Low,
}

impl Band {
    fn of(equivalent: f64) -> Self {
        if equivalent >= 80. {
            Self::High
        } else if equivalent >= 60. {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Ranked {
    name: String,
    text: f64,
    code: f64,
    average: f64,
    equivalent: f64,
    band: Band,
    flags: Vec<String>,
}

/// Sorts documents by the mean of both scores, highest first. The equivalent score
/// of the document at rank `r` (from 0) is `100 - 100 * r / N`.
fn rank(report: Report) -> Vec<Ranked> {
    let n = report.len() as f64;
    let mut scores = report.into_scores();
    scores.sort_by(|a, b| {
        let x = (a.text_score + a.code_score) / 2.;
        let y = (b.text_score + b.code_score) / 2.;
        y.total_cmp(&x)
    });
    scores
        .into_iter()
        .enumerate()
        .map(|(r, s)| {
            let equivalent = 100. - 100. * r as f64 / n;
            Ranked {
                average: (s.text_score + s.code_score) / 2.,
                band: Band::of(equivalent),
                flags: s
                    .failures
                    .iter()
                    .map(|f| format!("{}:{}", f.stage, f.kind))
                    .collect(),
                name: s.name,
                text: s.text_score,
                code: s.code_score,
                equivalent,
            }
        })
        .collect()
}

/// Runs shared with the template must be longer than this, in characters, to be removed.
const TEMPLATE_MIN_MATCH: usize = 20;

/// Removes the longest run of characters that `content` shares with `template`,
/// if it is longer than [`TEMPLATE_MIN_MATCH`]. Among equally long runs, the first
/// one in `content` is removed.
fn remove_template(content: &str, template: &str) -> String {
    let a: Vec<char> = content.chars().collect();
    let b: Vec<char> = template.chars().collect();
    // Lengths of the common runs ending at a[i - 1] and b[j - 1].
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    let (mut best_len, mut best_end) = (0, 0);
    for (i, &x) in a.iter().enumerate() {
        for (j, &y) in b.iter().enumerate() {
            let len = if x == y { prev[j] + 1 } else { 0 };
            curr[j + 1] = len;
            if len > best_len {
                best_len = len;
                best_end = i + 1;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    if best_len <= TEMPLATE_MIN_MATCH {
        return content.to_string();
    }
    a[..best_end - best_len].iter().chain(&a[best_end..]).collect()
}

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Separates lines containing CJK ideographs from the others.
fn split_cjk(content: &str) -> (String, String) {
    let mut text = vec![];
    let mut code = vec![];
    for line in content.lines() {
        if line.chars().any(is_cjk) {
            text.push(line);
        } else {
            code.push(line);
        }
    }
    (text.join("\n"), code.join("\n"))
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("invalid file name: {}", path.display()))
}

/// Lists the regular files in `dir`, sorted by path.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = vec![];
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn load_documents(args: &Args) -> Result<Vec<Document>> {
    let code_files = match &args.code_dir {
        Some(dir) => list_files(dir)?,
        None => vec![],
    };
    let template = match &args.template {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
        }
        None => String::new(),
    };
    let mut documents = vec![];
    for path in list_files(&args.document_dir)? {
        let name = file_stem(&path)?;
        let mut content =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        if !template.is_empty() && !content.is_empty() {
            let stripped = remove_template(&content, &template);
            tracing::debug!(
                document = %name,
                removed = content.chars().count() - stripped.chars().count(),
                "template removed"
            );
            content = stripped;
        }
        let (text, code) = if args.split_cjk {
            split_cjk(&content)
        } else {
            let code = match code_files
                .iter()
                .find(|p| file_stem(p).map_or(false, |s| s == name))
            {
                Some(p) => {
                    fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?
                }
                None => {
                    tracing::debug!(document = %name, "no code file");
                    String::new()
                }
            };
            (content, code)
        };
        documents.push(Document::new(name, text, code));
    }
    Ok(documents)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();

    let config = CheckConfig::new()
        .hashbits(args.hashbits)
        .weights(args.cosine_weight, args.hamming_weight)
        .workers(args.workers)
        .document_frequency(args.min_df, args.max_df)
        .task_timeout(args.task_timeout.map(Duration::from_secs));
    let checker = Checker::new(config)?;

    let start = Instant::now();
    let documents = load_documents(&args)?;
    tracing::info!(
        documents = documents.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "loaded"
    );

    let report = checker.check(&documents)?;

    println!("name,text,code,average,equivalent,band,flags");
    for r in rank(report) {
        println!(
            "{},{:.2},{:.2},{:.2},{:.2},{},{}",
            r.name,
            r.text,
            r.code,
            r.average,
            r.equivalent,
            r.band,
            r.flags.join(";")
        );
    }

    Ok(())
}
