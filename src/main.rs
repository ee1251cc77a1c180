//! epidoc-convert - Normalize TEI/EpiDoc editions in place

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use epidoc_convert::{ConvertOptions, Tables, convert_file_to};

#[derive(Parser)]
#[command(name = "epidoc-convert")]
#[command(version, about = "Normalize TEI/EpiDoc XML editions into CTS textpart structure", long_about = None)]
#[command(after_help = "EXAMPLES:
    epidoc-convert tlg0011.tlg007.perseus-grc2.xml           Convert in place
    epidoc-convert text.xml -o out.xml --skip-entities       Leave the input untouched
    epidoc-convert text.xml --tables corpus.json --strict    Custom tables, fail on missing refsDecl")]
struct Cli {
    /// TEI XML file to convert (overwritten unless --output is given)
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Write the converted document here instead of over FILE
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// JSON file with entity, language and URN table overrides
    #[arg(long, value_name = "JSON")]
    tables: Option<PathBuf>,

    /// Fail when the document declares no citation scheme
    #[arg(long)]
    strict: bool,

    /// Parse FILE as is, without expanding legacy entities
    #[arg(long)]
    skip_entities: bool,

    /// Log every rewrite
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG overrides; otherwise -v => debug, -q => warn, else info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose {
            "epidoc_convert=debug"
        } else if cli.quiet {
            "epidoc_convert=warn"
        } else {
            "epidoc_convert=info"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> epidoc_convert::Result<()> {
    let tables = match &cli.tables {
        Some(path) => Tables::load(path)?,
        None => Tables::default(),
    };
    let options = ConvertOptions { strict: cli.strict };
    let output = cli.output.as_deref().unwrap_or(cli.input.as_path());

    convert_file_to(&cli.input, output, &tables, options, !cli.skip_entities)
}
