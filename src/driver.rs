use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::*;

use crate::*;

pub const DEFAULT_SEED: u64 = 12345;

/// Settings for one tokenizer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub input: PathBuf,
    pub output: PathBuf,
    pub seed: u64,
    /// Randomize atom order even when only one variant is written.
    pub randomize: bool,
    /// Randomized variants written per input molecule.
    pub augment: usize,
}

impl Config {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            seed: DEFAULT_SEED,
            randomize: false,
            augment: 1,
        }
    }

    /// Whether records go through the randomizer instead of being
    /// tokenized as written.
    pub fn wants_variants(&self) -> bool {
        self.randomize || self.augment > 1
    }
}

/// Seeds from a signed command line value. A seed and its negation give
/// the same stream.
pub fn seed_from_arg(seed: i64) -> u64 {
    seed.unsigned_abs()
}

/// Variant count from a signed command line value. Negative counts write
/// no variants.
pub fn augment_from_arg(count: i64) -> usize {
    usize::try_from(count).unwrap_or(0)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Expected a SMILES string and a name, found {0} fields")]
    FieldCount(usize),
}

/// One input line: a SMILES string and the molecule's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub smiles: &'a str,
    pub name: &'a str,
}

impl<'a> Record<'a> {
    pub fn parse(line: &'a str) -> Result<Self, RecordError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            &[smiles, name] => Ok(Self { smiles, name }),
            _ => Err(RecordError::FieldCount(fields.len())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub records: usize,
    pub lines_written: usize,
}

/// Tokenized output lines for one record, in the order they are written.
pub fn process_record<R: Rng + ?Sized>(
    record: &Record,
    config: &Config,
    rng: &mut R,
) -> Result<Vec<String>> {
    if !config.wants_variants() {
        return Ok(vec![tokenize_smiles(record.smiles)?]);
    }
    let molecule = parse_smiles(record.smiles)?;
    randomize(&molecule, config.augment, rng)?
        .iter()
        .map(|variant| {
            tokenize_smiles(variant).context(format!("Failed to tokenize variant {variant}"))
        })
        .collect()
}

/// Tokenizes every record read from `input`, writing one line per variant.
pub fn tokenize_stream<B, W, R>(
    input: B,
    output: &mut W,
    config: &Config,
    rng: &mut R,
) -> Result<RunSummary>
where
    B: BufRead,
    W: Write,
    R: Rng + ?Sized,
{
    let mut summary = RunSummary::default();
    for (index, line) in input.lines().enumerate() {
        let line_number = index + 1;
        let line = line.context(format!("Failed to read line {line_number}"))?;
        let record =
            Record::parse(&line).context(format!("Invalid record on line {line_number}"))?;
        debug!("Line {line_number}: {} ({})", record.smiles, record.name);
        let tokenized = process_record(&record, config, rng).context(format!(
            "Failed to tokenize {} on line {line_number}",
            record.smiles
        ))?;

        for tokens in &tokenized {
            writeln!(output, "{tokens}")?;
        }
        summary.records += 1;
        summary.lines_written += tokenized.len();
    }
    output.flush()?;
    Ok(summary)
}

/// Runs the tokenizer over the configured input file.
pub fn run(config: &Config) -> Result<RunSummary> {
    let start = Instant::now();
    info!(
        "Tokenizing {} into {} (seed {}, randomize {}, {} variants)",
        config.input.display(),
        config.output.display(),
        config.seed,
        config.randomize,
        config.augment
    );

    let input = File::open(&config.input)
        .context(format!("Failed to open input file {}", config.input.display()))?;
    let output = File::create(&config.output)
        .context(format!("Failed to create output file {}", config.output.display()))?;
    let mut writer = BufWriter::new(output);
    let mut rng = StdRng::seed_from_u64(config.seed);

    let summary = tokenize_stream(BufReader::new(input), &mut writer, config, &mut rng)?;
    info!(
        "Tokenized {} records into {} lines in {:.2?}",
        summary.records,
        summary.lines_written,
        start.elapsed()
    );
    Ok(summary)
}
