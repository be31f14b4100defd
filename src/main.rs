use std::io;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::error;

use spreadsheet_engine::commands::{handle_commands, load_file};
use spreadsheet_engine::spreadsheet::Spreadsheet;

/// Terminal spreadsheet with formulas, undo/redo and XML/JSON files.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Number of columns (1-18278)
    #[arg(long, default_value_t = 26, value_parser = clap::value_parser!(u64).range(1..=18278))]
    columns: u64,

    /// Number of rows (1-999)
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u64).range(1..=999))]
    rows: u64,

    /// Spreadsheet file to open at start-up (.json for JSON, otherwise XML)
    #[arg(long)]
    file: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let mut sheet = Spreadsheet::new(args.columns as usize, args.rows as usize);
    if let Some(path) = &args.file {
        if let Err(err) = load_file(&mut sheet, path) {
            error!("cannot open {}: {}", path.display(), err);
            process::exit(1);
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    if let Err(err) = handle_commands(&mut sheet, stdin.lock(), &mut stdout) {
        error!("{}", err);
        process::exit(1);
    }
}
