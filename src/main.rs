/* ------------------------------------------------------------------ */
/* triggergen CLI: build a train/test pair and pull a few batches     */
/* ------------------------------------------------------------------ */
//
//   triggergen --meta data/meta.json --k 3 --batches 5
//   triggergen --text train.txt --save-meta meta.json --ood --no-repeat
//   triggergen --meta meta.json --config trainer.json -v
//
// Options given on the command line override the --config file, which in
// turn overrides the built-in defaults.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use env_logger::Env;
use log::{info, warn};
use ndarray::Array2;

use triggergen::{Batch, CorpusStats, Dataset, DatasetPair, TrainerArgs};

#[derive(Parser, Debug)]
#[command(author, version, about = "Synthetic bigram sequences with trigger tokens", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    /// Corpus statistics JSON (itos, stoi, vocab_size, unigrams, bigrams)
    #[arg(long, value_name = "PATH", conflicts_with = "text")]
    meta: Option<PathBuf>,

    /// Plain-text corpus to count char-level statistics from
    #[arg(long, value_name = "PATH")]
    text: Option<PathBuf>,

    /// Write the counted statistics to this path
    #[arg(long, value_name = "PATH", requires = "text")]
    save_meta: Option<PathBuf>,

    /// Trainer options JSON (data options, batch_size, seed, ood, bigram flags)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Number of trigger tokens
    #[arg(long)]
    k: Option<usize>,

    /// Sequence length L
    #[arg(long, value_name = "L")]
    seq_length: Option<usize>,

    #[arg(long, value_name = "B")]
    batch_size: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Batches to pull from each stream
    #[arg(long, default_value_t = 1)]
    batches: usize,

    /// Decoded sequences to print from the first train batch
    #[arg(long, default_value_t = 2)]
    samples: usize,

    /// Prefix sequences with their trigger ids
    #[arg(long)]
    show_latents: bool,

    /// Fix the triggers by marginal rank instead of drawing them per sequence
    #[arg(long)]
    fixed: bool,

    /// Most frequent tokens skipped by --fixed
    #[arg(long, value_name = "N")]
    offset: Option<usize>,

    /// Annotate triggered steps with 1 instead of an occurrence count
    #[arg(long)]
    no_counter: bool,

    /// Forbid a trigger from answering with itself
    #[arg(long)]
    no_repeat: bool,

    /// Split responses into disjoint train/test portions
    #[arg(long)]
    ood: bool,

    /// Weight train responses by the trigger's bigram row
    #[arg(long)]
    bigram_outs_train: bool,

    /// Weight test responses by the trigger's bigram row
    #[arg(long)]
    bigram_outs_test: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let stats = load_stats(&cli)?;
    let args = trainer_args(&cli)?;
    info!("options: {:?}", args);

    let pair = DatasetPair::new(&stats, &args).context("failed to build datasets")?;
    let (train, test) = pair.streams()?;

    println!("=== triggergen ===");
    println!("Vocabulary size: {}", pair.train.vocab_size());
    if let Some(ids) = pair.train.fixed_triggers() {
        let shown: Vec<String> = ids.iter()
            .map(|&id| format!("{:?}", pair.train.vocab().symbol(id).unwrap_or("?")))
            .collect();
        println!("Fixed triggers: {}", shown.join(" "));
    }
    println!();

    for (name, stream) in [("train", train), ("test", test)] {
        for (i, batch) in stream.take(cli.batches).enumerate() {
            let batch = batch.with_context(|| format!("{name} batch {i} failed"))?;
            report(name, i, &batch);
            if name == "train" && i == 0 {
                print_samples(&pair.train, &batch, cli.samples);
            }
        }
    }
    Ok(())
}

fn init_logging(verbose: u8, quiet: u8) {
    use log::LevelFilter;

    let level = if quiet > 0 {
        match quiet {
            1 => LevelFilter::Warn,
            _ => LevelFilter::Error,
        }
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    builder.filter_level(level);
    let _ = builder.try_init();
}

fn load_stats(cli: &Cli) -> Result<CorpusStats> {
    match (&cli.meta, &cli.text) {
        (Some(path), _) => CorpusStats::load(path)
            .with_context(|| format!("failed to load corpus statistics from {}", path.display())),
        (None, Some(path)) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let stats = CorpusStats::from_text(&text);
            info!("counted {} chars, vocab {}", text.chars().count(), stats.vocab_size);
            if let Some(out) = &cli.save_meta {
                stats.save(out)
                    .with_context(|| format!("failed to write {}", out.display()))?;
                info!("statistics written to {}", out.display());
            }
            Ok(stats)
        }
        (None, None) => bail!("either --meta or --text is required"),
    }
}

fn trainer_args(cli: &Cli) -> Result<TrainerArgs> {
    let mut args = match &cli.config {
        Some(path) => TrainerArgs::load(path)
            .with_context(|| format!("failed to load options from {}", path.display()))?,
        None => TrainerArgs::default(),
    };

    if let Some(k) = cli.k { args.data.k = k; }
    if let Some(l) = cli.seq_length { args.data.seq_length = l; }
    if let Some(b) = cli.batch_size { args.batch_size = b; }
    if let Some(s) = cli.seed { args.seed = s; }
    if let Some(o) = cli.offset { args.data.special_toks_offset = o; }
    if cli.show_latents { args.data.show_latents = true; }
    if cli.fixed { args.data.fixed_special_toks = true; }
    if cli.no_counter { args.data.output_counter = false; }
    if cli.no_repeat { args.data.no_repeat = true; }
    if cli.ood { args.ood = true; }
    if cli.bigram_outs_train { args.bigram_outs_train = true; }
    if cli.bigram_outs_test { args.bigram_outs_test = true; }

    if cli.offset.is_some() && !args.data.fixed_special_toks {
        warn!("--offset only applies to fixed triggers; pass --fixed to use it");
    }
    Ok(args)
}

// Share of positions produced by a trigger, and the largest repeat count seen.
fn trigger_summary(annotations: &Array2<i64>) -> (f64, i64) {
    let triggered = annotations.iter().filter(|&&a| a > 0).count();
    let max_count = annotations.iter().copied().max().unwrap_or(0);
    (triggered as f64 / annotations.len().max(1) as f64, max_count)
}

fn report(name: &str, index: usize, batch: &Batch) {
    let (rate, max_count) = trigger_summary(&batch.annotations);
    println!(
        "{name} batch {index:3} | shape {:?} | triggered {:5.2}% | max repeat {}",
        batch.inputs.dim(),
        rate * 100.0,
        max_count
    );
}

fn print_samples(dataset: &Dataset, batch: &Batch, n: usize) {
    for (row, ann) in batch.inputs.rows().into_iter()
        .zip(batch.annotations.rows())
        .take(n)
    {
        let ids = row.to_vec();
        let marks: String = ann.iter()
            .map(|&a| match a {
                a if a < 0 => '*',
                0 => '.',
                a if a < 10 => char::from_digit(a as u32, 10).unwrap_or('+'),
                _ => '+',
            })
            .collect();
        println!();
        println!("  text: {:?}", dataset.decode(&ids));
        println!("  mark: {}", marks);
    }
    println!();
}
