//! mdstyle - render lightweight markup as styled terminal text

mod terminal;

use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use mdstyle::{ParserBuilder, Result, Theme};
use terminal::Renderer;

/// Parsed command line
struct Args {
    theme: Option<PathBuf>,
    file: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let raw: Vec<String> = env::args().skip(1).collect();

    // Handle --help and --version
    if let Some(first) = raw.first() {
        match first.as_str() {
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            "--version" | "-V" => {
                print_version();
                return Ok(());
            }
            _ => {}
        }
    }

    let args = match parse_args(&raw) {
        Some(args) => args,
        None => {
            print_usage();
            process::exit(2);
        }
    };

    let theme = match &args.theme {
        Some(path) => Theme::load(path)?,
        None => Theme::load_default(),
    };

    let input = match &args.file {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut input = String::new();
            io::stdin().read_to_string(&mut input)?;
            input
        }
    };

    let parser = ParserBuilder::standard().theme(theme).build();
    let (styled, diagnostics) = parser.parse_with_diagnostics(&input);
    for diagnostic in &diagnostics {
        log::warn!("{}", diagnostic);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    Renderer::detect().render(&mut out, &styled)?;

    Ok(())
}

/// Parse `[--theme FILE] [FILE]`; `None` on a usage error
fn parse_args(raw: &[String]) -> Option<Args> {
    let mut args = Args {
        theme: None,
        file: None,
    };
    let mut iter = raw.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--theme" | "-t" => args.theme = Some(PathBuf::from(iter.next()?)),
            "-" => args.file = None,
            s if s.starts_with('-') => return None,
            s if args.file.is_none() => args.file = Some(PathBuf::from(s)),
            _ => return None,
        }
    }
    Some(args)
}

fn print_usage() {
    println!("mdstyle {} - styled terminal rendering of markup", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: mdstyle [OPTIONS] [FILE]");
    println!();
    println!("Reads FILE (or standard input) and prints it with terminal styling.");
    println!();
    println!("Options:");
    println!("  -t, --theme FILE  Use a TOML theme instead of ~/.mdstyle.toml");
    println!("  -h, --help        Show this help message");
    println!("  -V, --version     Show version information");
    println!();
    println!("Set RUST_LOG=warn to see rules that could not be applied.");
}

fn print_version() {
    println!("mdstyle {}", env!("CARGO_PKG_VERSION"));
}
