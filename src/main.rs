// cppstep: steppable C++ subset interpreter

use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use cppstep::interpreter::{Debugger, Interpreter, RunOutcome};
use cppstep::parser::ast::Program;
use cppstep::parser::parse_source;
use cppstep::runtime::config::{BufferedConsole, Config, Console, OverflowPolicy, StdConsole};
use cppstep::runtime::Runtime;
use cppstep::ui::App;

#[derive(Parser)]
#[command(name = "cppstep", version, about = "Step through C++ programs node by node")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a program to completion; the exit status is the program's
    Run(RunArgs),
    /// Open the terminal debugger
    Debug(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Source file
    file: PathBuf,

    /// What happens when an arithmetic result leaves its type's range
    #[arg(long, value_enum, default_value_t = Overflow::Error)]
    overflow: Overflow,

    /// Wall-clock limit on execution, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Node boundaries executed per host tick
    #[arg(long, default_value_t = cppstep::runtime::config::DEFAULT_QUANTA_PER_TICK)]
    quantum: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum Overflow {
    Error,
    Wrap,
}

impl RunArgs {
    fn config(&self, console: Rc<dyn Console>) -> Config {
        let overflow = match self.overflow {
            Overflow::Error => OverflowPolicy::Error,
            Overflow::Wrap => OverflowPolicy::Wrap,
        };
        Config::default()
            .with_overflow(overflow)
            .with_timeout(self.timeout_ms.map(Duration::from_millis))
            .with_quanta_per_tick(self.quantum)
            .with_console(console)
    }

    fn load(&self) -> Result<(String, Program), ExitCode> {
        let source = fs::read_to_string(&self.file).map_err(|e| {
            eprintln!("Error: cannot read '{}': {}", self.file.display(), e);
            ExitCode::from(2)
        })?;
        let program = parse_source(&source).map_err(|e| {
            eprintln!("{}", e);
            ExitCode::from(2)
        })?;
        tracing::debug!(items = program.items.len(), "parsed {}", self.file.display());
        Ok((source, program))
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run(args) => run(args),
        Command::Debug(args) => debug(args),
    };
    result.unwrap_or_else(|code| code)
}

fn run(args: RunArgs) -> Result<ExitCode, ExitCode> {
    let (source, program) = args.load()?;
    let runtime = Runtime::new(args.config(Rc::new(StdConsole::default())));
    let mut interpreter = Interpreter::new(program, source, runtime);

    match interpreter.run(&|| false) {
        Ok(RunOutcome::Finished(code)) => Ok(ExitCode::from(code as u8)),
        Ok(RunOutcome::TimedOut) => {
            eprintln!("Error: execution timed out");
            Err(ExitCode::FAILURE)
        }
        Ok(outcome) => {
            eprintln!("Error: execution stopped ({:?})", outcome);
            Err(ExitCode::FAILURE)
        }
        Err(error) => {
            eprintln!("Runtime error: {}", error);
            Err(ExitCode::FAILURE)
        }
    }
}

fn debug(args: RunArgs) -> Result<ExitCode, ExitCode> {
    let (source, program) = args.load()?;
    let console = Rc::new(BufferedConsole::new());
    let runtime = Runtime::new(args.config(console.clone()));
    let debugger = Debugger::new(Interpreter::new(program, source, runtime));

    tui(App::new(debugger, console)).map_err(|e| {
        eprintln!("Error: {}", e);
        ExitCode::FAILURE
    })?;
    Ok(ExitCode::SUCCESS)
}

fn tui(mut app: App) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    res
}
