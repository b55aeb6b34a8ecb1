use bf_engine::cli_util::print_error;
use bf_engine::config::{self, Overrides};
use bf_engine::{run_program, BoundaryPolicy, EngineError, Error};
use clap::Parser;
use std::env;
use std::fs;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const EXIT_FAILURE: i32 = 1;
const EXIT_OUT_OF_BOUNDS: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "bf", version, about = "Run a Brainfuck program from a file")]
struct Cli {
    /// Tape length in cells (fallback BF_TAPE_SIZE; default 30000)
    #[arg(long = "tape", value_name = "N")]
    tape: Option<NonZeroUsize>,

    /// Wrap the pointer to the other end of the tape instead of failing (fallback BF_BOUNDARY)
    #[arg(long = "wrap", conflicts_with = "strict")]
    wrap: bool,

    /// Fail when the pointer moves off the tape (the default)
    #[arg(long = "strict")]
    strict: bool,

    /// Path to the program source
    #[arg(value_name = "PROGRAM")]
    path: PathBuf,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        let boundary = if self.wrap {
            Some(BoundaryPolicy::Wrapping)
        } else if self.strict {
            Some(BoundaryPolicy::Strict)
        } else {
            None
        };
        Overrides {
            tape_size: self.tape,
            boundary,
        }
    }
}

/// Logs go to stderr so stdout carries nothing but program output.
/// `RUST_LOG` overrides the default `warn` filter.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr)
        .init();
}

fn run(program: &str, cli: Cli) -> i32 {
    let code = match fs::read(&cli.path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("{program}: failed to read {}: {e}", cli.path.display());
            return EXIT_FAILURE;
        }
    };
    if code.is_empty() {
        eprintln!("{program}: program is empty: {}", cli.path.display());
        return EXIT_FAILURE;
    }

    let config = config::resolve(cli.overrides());
    tracing::debug!(
        path = %cli.path.display(),
        bytes = code.len(),
        tape_size = config.tape_size.get(),
        boundary = ?config.boundary,
        "starting run"
    );

    let mut stdin = io::stdin().lock();
    let mut stdout = BufWriter::new(io::stdout().lock());
    let result = run_program(&code, config, &mut stdin, &mut stdout);

    // Output produced before a failure still belongs to the user.
    if let Err(e) = stdout.flush() {
        tracing::warn!("failed to flush stdout: {e}");
    }

    match result {
        Ok(engine) => {
            tracing::debug!(pointer = engine.pointer(), "run finished");
            0
        }
        Err(err) => {
            tracing::debug!("run failed: {err}");
            print_error(program, &code, &err);
            match err {
                Error::Engine(EngineError::PointerOutOfBounds { .. }) => EXIT_OUT_OF_BOUNDS,
                _ => EXIT_FAILURE,
            }
        }
    }
}

fn main() {
    // Name used to prefix diagnostics, e.g. "bf: ..."
    let program = env::args()
        .next()
        .as_deref()
        .and_then(|arg0| Path::new(arg0).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("bf"));

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(EXIT_FAILURE);
        }
    };

    init_logging();

    let code = run(&program, cli);
    std::process::exit(code);
}
