use std::path::PathBuf;
use std::process::exit;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use deepsmiles_tokenizer::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "DeepSMILES tokenizer", long_about = None)]
struct Cli {
    /// Molecules input file, one `SMILES name` pair per line
    #[arg(short = 'i', value_name = "input.smi")]
    input: PathBuf,

    /// Output file, one tokenized DeepSMILES string per line
    #[arg(short = 'o', value_name = "output.txt")]
    output: PathBuf,

    /// RNG seed
    #[arg(long, default_value_t = DEFAULT_SEED as i64, allow_negative_numbers = true)]
    seed: i64,

    /// Randomize atom order even with a single variant
    #[arg(long = "rand")]
    randomize: bool,

    /// Number of randomized SMILES written per input one
    #[arg(short = 'n', default_value_t = 1, allow_negative_numbers = true)]
    augment: i64,

    /// Log level: off, error, warn, info, debug or trace
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    if std::env::args_os().len() == 1 {
        eprintln!("{}", Cli::command().render_help());
        exit(1);
    }

    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let config = Config {
        input: cli.input,
        output: cli.output,
        seed: seed_from_arg(cli.seed),
        randomize: cli.randomize,
        augment: augment_from_arg(cli.augment),
    };
    run(&config)?;
    Ok(())
}
