use std::{io::Read, str::FromStr};

use anyhow::{bail, Context};
use gbnf::{Grammar, ParseOptions};

const USAGE: &str = "Usage: dump [--flat | --raw] [--config <options.json>] [--root <name>] [grammar.gbnf]";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Output {
    Grammar,
    Flat,
    Raw,
}

struct Args {
    output: Output,
    config: Option<String>,
    root: Option<String>,
    path: Option<String>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        output: Output::Grammar,
        config: None,
        root: None,
        path: None,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--flat" => args.output = Output::Flat,
            "--raw" => args.output = Output::Raw,
            "--config" => args.config = Some(iter.next().context("Expected a path after --config")?),
            "--root" => args.root = Some(iter.next().context("Expected a name after --root")?),
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other if other.starts_with("--") => bail!("Unknown flag {other}\n{USAGE}"),
            _ if args.path.is_some() => bail!("Only one grammar file is accepted\n{USAGE}"),
            _ => args.path = Some(arg.clone()),
        }
    }

    Ok(args)
}

fn read_options(args: &Args) -> anyhow::Result<ParseOptions> {
    let mut options = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {path}"))?;
            serde_json::from_str::<ParseOptions>(&text)
                .with_context(|| format!("Invalid config {path}"))?
        }
        None => ParseOptions::default(),
    };
    if let Some(root) = &args.root {
        options.root = Some(root.clone());
    }
    Ok(options)
}

fn run() -> anyhow::Result<()> {
    let args = parse_args()?;
    let options = read_options(&args)?;

    let input = if let Some(path) = &args.path {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?
    } else {
        let mut input = String::new();
        std::io::stdin()
            .lock()
            .read_to_string(&mut input)
            .context("Failed to read stdin")?;
        input
    };

    let name = args.path.as_deref().unwrap_or("<stdin>");
    let grammar = Grammar::parse_with(&input, &options).with_context(|| name.to_owned())?;
    log::info!("{name}: {} rules", grammar.len());

    let mut buf = String::new();
    match args.output {
        Output::Grammar => grammar.print(&mut buf)?,
        Output::Flat => grammar.print_flat(&mut buf)?,
        Output::Raw => buf = serde_json::to_string_pretty(&grammar.to_raw())?,
    }
    println!("{}", buf.trim_end());

    Ok(())
}

fn main() {
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| "WARN".to_owned());
    let level = log::LevelFilter::from_str(&level).unwrap_or(log::LevelFilter::Warn);

    simplelog::TermLogger::init(
        level,
        simplelog::ConfigBuilder::new()
            .set_time_format_custom(&[])
            .build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Never,
    )
    .unwrap();

    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
