//=====================================================
// File: main.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: BanglaCode CLI entry point
// Objective: Run .bang scripts, dump tokens or the AST, or start the REPL
//            when no script is given
//=====================================================

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use banglacode::devtools::Repl;
use banglacode::interpreter::ScriptError;
use banglacode::parser::parse_source;
use banglacode::runtime::{self, Runtime, RuntimeOptions};
use banglacode::tokenizer::Tokenizer;
use clap::Parser;

/// Deep recursion in scripts recurses in the evaluator too.
const MAIN_STACK_SIZE: usize = 256 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "banglacode", version, about = "BanglaCode interpreter")]
pub struct Args {
    /// Script to run. Starts the REPL when omitted.
    pub file: Option<PathBuf>,

    /// Print the token stream as JSON and exit.
    #[arg(long)]
    pub tokens: bool,

    /// Print the parsed AST as JSON and exit.
    #[arg(long)]
    pub ast: bool,

    /// Bound on every `opekha`, in milliseconds.
    #[arg(long = "await-timeout-ms", value_name = "MS")]
    pub await_timeout_ms: Option<u64>,

    /// Maximum function call depth.
    #[arg(long = "max-depth", value_name = "N")]
    pub max_depth: Option<usize>,

    /// Enable debug logging on stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    runtime::init_logging(args.verbose);

    let worker = std::thread::Builder::new()
        .name("banglacode".into())
        .stack_size(MAIN_STACK_SIZE)
        .spawn(move || run(args))
        .context("spawning interpreter thread")?;
    let code = worker
        .join()
        .map_err(|_| anyhow!("interpreter thread panicked"))??;
    std::process::exit(code);
}

fn run(args: Args) -> Result<i32> {
    let Some(path) = args.file.as_deref() else {
        let options = build_options(&args, None)?;
        let mut repl = Repl::new(options)?;
        return repl.run().context("REPL I/O failed");
    };

    if args.tokens {
        return dump_tokens(path);
    }
    if args.ast {
        return dump_ast(path);
    }

    let options = build_options(&args, path.parent())?;
    let runtime = Runtime::new(options)?;
    match runtime.run_file(path) {
        Ok(outcome) => Ok(outcome.exit_code),
        Err(err) => {
            eprintln!("{}", err);
            Ok(1)
        }
    }
}

/// Config file and environment first, then CLI flags.
fn build_options(args: &Args, script_dir: Option<&Path>) -> Result<RuntimeOptions> {
    let mut options =
        RuntimeOptions::discover(script_dir).context("loading runtime configuration")?;
    if let Some(ms) = args.await_timeout_ms {
        options = options.with_await_timeout(Duration::from_millis(ms));
    }
    if let Some(depth) = args.max_depth {
        options = options.with_max_call_depth(depth);
    }
    Ok(options)
}

fn read_script(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn dump_tokens(path: &Path) -> Result<i32> {
    let source = read_script(path)?;
    match Tokenizer::new(&source).tokenize() {
        Ok(tokens) => {
            println!("{}", serde_json::to_string_pretty(&tokens)?);
            Ok(0)
        }
        Err(err) => {
            eprintln!("{}", ScriptError::from(err).with_file(path));
            Ok(1)
        }
    }
}

fn dump_ast(path: &Path) -> Result<i32> {
    let source = read_script(path)?;
    match parse_source(&source) {
        Ok(program) => {
            println!("{}", serde_json::to_string_pretty(&program)?);
            Ok(0)
        }
        Err(err) => {
            eprintln!("{}", ScriptError::from(err).with_file(path));
            Ok(1)
        }
    }
}

//=====================================================
// End of file
//=====================================================
