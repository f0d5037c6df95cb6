use anyhow::Context;
use ccnshell::config::{self, Args, CliExit, InputMode, ShellConfig};
use ccnshell::editor::keycodes;
use ccnshell::input::{AsyncInput, LineSource, SyncInput};
use ccnshell::interpreter::LoopExit;
use ccnshell::Interpreter;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    let argv: Vec<String> = std::env::args().collect();
    let program = argv.first().map(String::as_str).unwrap_or("ccnshell");
    let flags: Vec<&str> = argv.iter().skip(1).map(String::as_str).collect();

    let args = match config::parse_args(program, &flags) {
        Ok(args) => args,
        Err(exit) => {
            match &exit {
                CliExit::Help(text) => print!("{text}"),
                CliExit::Usage(text) => eprintln!("{text}"),
            }
            std::process::exit(exit.status());
        }
    };

    init_logging();

    if let Err(e) = run(&args) {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn run(args: &Args) -> anyhow::Result<()> {
    if args.multiline {
        println!("Multi-line mode enabled.");
    }
    if args.keycodes {
        keycodes::run().context("key code mode failed")?;
        return Ok(());
    }

    let config = ShellConfig::from_args(args);
    info!(mode = ?config.mode, history = %config.history_path.display(), "starting");

    let mut source: Box<dyn LineSource> = match config.mode {
        InputMode::Sync => Box::new(SyncInput::new(&config.prompt).context("line editor")?),
        InputMode::Async => Box::new(AsyncInput::new(&config)),
    };

    let mut shell = Interpreter::new(config);
    if let Err(e) = shell.load_history() {
        warn!(error = %e, "starting with empty history");
    }

    match shell.repl(source.as_mut()).context("shell loop failed")? {
        LoopExit::EndOfInput => Ok(()),
        LoopExit::Terminated => std::process::exit(0),
    }
}
