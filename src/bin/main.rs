use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use multidecoder::error::MultidecoderResult;

/// Recursively decode obfuscated strings and extract indicators of compromise.
#[derive(Parser)]
#[command(name = "multidecoder")]
#[command(version)]
#[command(about = "Recursively decode obfuscated strings and extract indicators of compromise")]
struct Cli {
    /// File to scan. Reads stdin when omitted.
    file: Option<PathBuf>,

    /// Emit the result as a JSON tree instead of a string summary.
    #[arg(long, short, conflicts_with = "replace")]
    json: bool,

    /// Emit the flattened (deobfuscated) byte stream instead of a string summary.
    #[arg(long, short, conflicts_with = "json")]
    replace: bool,

    /// Directory of keyword files to add as decoders.
    #[arg(long, short)]
    keywords: Option<PathBuf>,

    /// Maximum recursion depth into newly decoded content.
    #[arg(long, default_value_t = multidecoder::DEFAULT_DEPTH)]
    depth: i32,
}

fn read_input(file: Option<&PathBuf>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    match file {
        Some(path) => {
            std::fs::File::open(path)?.read_to_end(&mut buf)?;
        }
        None => {
            std::io::stdin().read_to_end(&mut buf)?;
        }
    }
    Ok(buf)
}

fn run(cli: Cli) -> MultidecoderResult<()> {
    let data = read_input(cli.file.as_ref())?;
    let registry = multidecoder::build_registry(cli.keywords.as_deref())?;
    let tree = multidecoder::scan_with_depth(&data, &registry, cli.depth);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if cli.json {
        let text = multidecoder::to_json(&tree)?;
        writeln!(out, "{text}")?;
    } else if cli.replace {
        out.write_all(&multidecoder::flatten(&tree))?;
    } else {
        for line in multidecoder::string_summary(&tree) {
            writeln!(out, "{line}")?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_default_env().target(env_logger::Target::Stderr).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("multidecoder: {err}");
            ExitCode::FAILURE
        }
    }
}
