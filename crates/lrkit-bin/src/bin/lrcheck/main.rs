use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use log::{info, warn, LevelFilter};
use lrkit::parser::lr::{build_tables, LRAction};
use petgraph::dot::Dot;

mod input;

use input::Input;

/// Build ACTION/GOTO tables from a canonical LR collection and report conflicts
#[derive(Parser, Debug)]
#[command(name = "lrcheck", version)]
struct Cli {
    /// JSON description of the grammar and its item-set automaton
    input: PathBuf,

    /// Print the automaton as a graphviz digraph
    #[arg(long)]
    dot: bool,

    /// Exit with status 1 if the tables have conflicts
    #[arg(long)]
    deny_conflicts: bool,

    /// More logging, repeat for more detail
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Info);
        }
        2 => {
            builder.filter_level(LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(LevelFilter::Trace);
        }
    }
    builder.init();
}

fn run(cli: &Cli) -> Result<bool> {
    let text = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read {}", cli.input.display()))?;
    let (grammar, automaton) = Input::from_json(&text)?.into_parts()?;
    info!(
        "{} productions, {} states",
        grammar.productions().len(),
        automaton.len()
    );

    for state in automaton.unreachable_states() {
        warn!("state {} is unreachable from state 0", state);
    }

    if cli.dot {
        let graph = automaton.to_graph(&grammar);
        println!("{}", Dot::new(&graph));
    }

    let tables = build_tables(&automaton, &grammar)?;
    for conflict in tables.conflicts() {
        let describe = |action: LRAction| match action {
            LRAction::Reduce(p) => match grammar.production(p) {
                Some(production) => format!("reduce {}", grammar.display_production(production)),
                None => action.to_string(),
            },
            _ => action.to_string(),
        };
        println!(
            "{:?} conflict in state {} on {}: kept [{}], dropped [{}]",
            conflict.kind(),
            conflict.state,
            grammar.terminal_name(conflict.terminal),
            describe(conflict.kept),
            describe(conflict.rejected)
        );
    }

    println!(
        "{} actions, {} gotos, {} conflicts",
        tables.action.len(),
        tables.goto.len(),
        tables.conflicts().len()
    );
    Ok(tables.is_deterministic())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) if cli.deny_conflicts => ExitCode::FAILURE,
        Ok(false) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(2)
        }
    }
}
