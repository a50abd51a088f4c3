//==============================================
// File: tests/util/mod.rs
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Shared helpers for BanglaCode integration tests
// Objective: Run scripts on a fresh runtime with captured output
//==============================================
#![allow(dead_code)]

use banglacode::interpreter::ScriptError;
use banglacode::runtime::{OutputSink, RunOutcome, Runtime, RuntimeOptions};
use std::path::Path;

/// Runs `source` and returns the script result alongside everything printed.
pub fn run_bang_with(
    source: &str,
    options: RuntimeOptions,
) -> (Result<RunOutcome, ScriptError>, String) {
    let (sink, buffer) = OutputSink::capture();
    let runtime = Runtime::new(options.with_output(sink)).expect("runtime");
    let result = runtime.run_source(source, None);
    drop(runtime);
    let output = buffer.lock().clone();
    (result, output)
}

/// Runs `source`, panicking on failure, and returns the printed output.
pub fn run_bang(source: &str) -> String {
    let (result, output) = run_bang_with(source, RuntimeOptions::default());
    if let Err(err) = result {
        panic!("script failed: {err}\noutput: {output}");
    }
    output
}

/// Runs `source` expecting an uncaught error.
pub fn run_bang_err(source: &str) -> ScriptError {
    let (result, output) = run_bang_with(source, RuntimeOptions::default());
    match result {
        Ok(outcome) => panic!("expected failure, got {:?}\noutput: {output}", outcome),
        Err(err) => err,
    }
}

pub fn run_bang_file(path: &Path) -> (Result<RunOutcome, ScriptError>, String) {
    let (sink, buffer) = OutputSink::capture();
    let runtime = Runtime::new(RuntimeOptions::default().with_output(sink)).expect("runtime");
    let result = runtime.run_file(path);
    drop(runtime);
    let output = buffer.lock().clone();
    (result, output)
}

pub fn lines(output: &str) -> Vec<&str> {
    output.lines().collect()
}

//==============================================
// End of file
//==============================================
