use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use avivar::analysis::{analyze, check_upstream, resolve_targets};
use avivar::cli::{Cli, Command, RunArgs, WatchArgs};
use avivar::opcodes::OpcodeTable;
use avivar::records::{CodeUnitRegistry, TraceFile};
use avivar::watch;
use avivar::writers::{view, HtmlWriter, JsonWriter, Writer};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: RunArgs) -> Result<()> {
    let trace = TraceFile::load(&args.trace)
        .with_context(|| format!("loading trace {}", args.trace.display()))?;
    let registry = CodeUnitRegistry::from_trace(&trace);
    let table = OpcodeTable::new();

    let report = analyze(&registry, &args.targets, &table)?;

    let writer: Box<dyn Writer> = if args.json {
        Box::new(JsonWriter::new(args.indent))
    } else {
        Box::new(HtmlWriter::new(args.blue, args.dark))
    };
    view(&report, writer.as_ref(), args.output.as_deref())?;

    // Best-effort report first, then surface the traced program's failure.
    check_upstream(&trace)?;
    Ok(())
}

fn run_watch(args: WatchArgs) -> Result<()> {
    let trace = TraceFile::load(&args.trace)
        .with_context(|| format!("loading trace {}", args.trace.display()))?;
    let registry = Arc::new(CodeUnitRegistry::from_trace(&trace));
    let table = Arc::new(OpcodeTable::new());

    let targets = resolve_targets(&registry, &args.targets)?;
    let handle = watch::watch(registry, targets, table, args.port)?;
    println!("Running! Analysis socket at localhost:{}", handle.port());

    // The monitor and socket threads live for the life of the process;
    // interrupting the process tears the sockets down with it.
    loop {
        std::thread::sleep(Duration::from_secs(60));
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match cli.command {
        Command::Run(args) => run(args),
        Command::Watch(args) => run_watch(args),
    }
}
