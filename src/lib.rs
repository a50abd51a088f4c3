//=====================================================
// File: lib.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: BanglaCode library main interface
// Objective: Export the tokenizer, parser, AST, interpreter, built-ins,
//            module loader and runtime driver
//=====================================================

pub mod ast;
pub mod builtins;
pub mod devtools;
pub mod interpreter;
pub mod modules;
pub mod parser;
pub mod runtime;
pub mod tokenizer;

pub use interpreter::{Interpreter, ScriptError, Value};
pub use runtime::{RunOutcome, Runtime, RuntimeOptions, run_file, run_source};

//=====================================================
// End of file
//=====================================================
