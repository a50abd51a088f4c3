//=====================================================
// File: devtools/repl.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Interactive BanglaCode prompt
// Objective: Read entries line by line, keep reading while brackets are
//            open, and evaluate each entry in one persistent session scope
//=====================================================

use crate::interpreter::{ScriptError, Value};
use crate::runtime::{Runtime, RuntimeOptions};
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::debug;

const PROMPT: &str = ">> ";
const CONTINUATION: &str = ".. ";
const HISTORY_FILE: &str = ".banglacode_history";

//=============================================
//            Section 1: Line Sources
//=============================================

/// What one prompt produced.
pub enum ReadOutcome {
    Line(String),
    /// Ctrl-C: drop the pending entry.
    Interrupted,
    Eof,
}

/// Where REPL input comes from. The terminal uses a line editor; tests feed
/// scripted lines.
pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadOutcome>;

    fn add_history(&mut self, _entry: &str) {}
}

/// Terminal input with line editing and persistent history.
pub struct EditorSource {
    editor: Editor<(), DefaultHistory>,
    history: Option<PathBuf>,
}

impl EditorSource {
    pub fn new() -> io::Result<Self> {
        let mut editor = Editor::<(), DefaultHistory>::new().map_err(readline_io)?;
        let history = dirs::home_dir().map(|home| home.join(HISTORY_FILE));
        if let Some(path) = &history {
            if let Err(err) = editor.load_history(path) {
                debug!(path = %path.display(), %err, "no REPL history loaded");
            }
        }
        Ok(Self { editor, history })
    }

    pub fn save_history(&mut self) {
        if let Some(path) = &self.history {
            if let Err(err) = self.editor.save_history(path) {
                debug!(path = %path.display(), %err, "REPL history not saved");
            }
        }
    }
}

impl LineSource for EditorSource {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadOutcome> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(ReadOutcome::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(err) => Err(readline_io(err)),
        }
    }

    fn add_history(&mut self, entry: &str) {
        let _ = self.editor.add_history_entry(entry);
    }
}

fn readline_io(err: ReadlineError) -> io::Error {
    match err {
        ReadlineError::Io(err) => err,
        other => io::Error::other(other.to_string()),
    }
}

//=============================================
//            Section 2: REPL Loop
//=============================================

/// Interactive REPL bound to a [`Runtime`].
pub struct Repl {
    runtime: Runtime,
}

impl Repl {
    pub fn new(options: RuntimeOptions) -> Result<Self, ScriptError> {
        Ok(Self {
            runtime: Runtime::new(options)?,
        })
    }

    /// Runs on the terminal. Returns the process exit code.
    pub fn run(&mut self) -> io::Result<i32> {
        let mut source = EditorSource::new()?;
        let mut writer = io::stdout();
        let code = self.run_with(&mut source, &mut writer);
        source.save_history();
        code
    }

    //Function: run_with
    //Purpose: Drive the REPL over any line source and writer
    //Inputs: source: &mut impl LineSource, writer: &mut impl Write
    //Returns: io::Result<i32> - exit code from `bahir`, else 0
    pub fn run_with<S: LineSource, W: Write>(&mut self, source: &mut S, writer: &mut W) -> io::Result<i32> {
        writeln!(
            writer,
            "BanglaCode {} REPL. Type .help for commands.",
            env!("CARGO_PKG_VERSION")
        )?;
        let mut entry = String::new();
        loop {
            let prompt = if entry.is_empty() { PROMPT } else { CONTINUATION };
            let line = match source.read_line(prompt)? {
                ReadOutcome::Line(line) => line,
                ReadOutcome::Interrupted => {
                    entry.clear();
                    continue;
                }
                ReadOutcome::Eof => return Ok(0),
            };

            if entry.is_empty() {
                match line.trim() {
                    "" => continue,
                    ".exit" => return Ok(0),
                    ".help" => {
                        writeln!(writer, "  .help   Show this help message")?;
                        writeln!(writer, "  .exit   Leave the REPL")?;
                        writeln!(writer, "  Unclosed brackets continue the entry on the next line.")?;
                        writeln!(writer, "  Ctrl-C drops the current entry, Ctrl-D leaves.")?;
                        continue;
                    }
                    _ => {}
                }
            }

            source.add_history(&line);
            entry.push_str(&line);
            entry.push('\n');
            if open_brackets(&entry) > 0 {
                continue;
            }
            let submitted = std::mem::take(&mut entry);
            match self.runtime.eval_session(&submitted) {
                Ok(outcome) => {
                    if !matches!(outcome.value, Value::Null) {
                        writeln!(writer, "{}", outcome.value.repr())?;
                    }
                    if let Some(code) = self.runtime.interpreter().exit_code() {
                        return Ok(code);
                    }
                }
                Err(err) => writeln!(writer, "{}", err)?,
            }
        }
    }
}

/// Net count of unclosed `{`, `(` and `[`, ignoring string contents and
/// line comments.
fn open_brackets(source: &str) -> i64 {
    let mut depth = 0i64;
    let mut quote: Option<char> = None;
    let mut chars = source.chars().peekable();
    while let Some(ch) = chars.next() {
        match quote {
            Some(q) => match ch {
                '\\' => {
                    chars.next();
                }
                c if c == q => quote = None,
                _ => {}
            },
            None => match ch {
                '"' | '\'' | '`' => quote = Some(ch),
                '/' if chars.peek() == Some(&'/') => {
                    for skipped in chars.by_ref() {
                        if skipped == '\n' {
                            break;
                        }
                    }
                }
                '{' | '(' | '[' => depth += 1,
                '}' | ')' | ']' => depth -= 1,
                _ => {}
            },
        }
    }
    depth
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::OutputSink;
    use std::collections::VecDeque;

    /// Feeds fixed lines and records every prompt shown.
    struct Scripted {
        lines: VecDeque<ReadOutcome>,
        prompts: Vec<String>,
        history: Vec<String>,
    }

    impl Scripted {
        fn new(input: &str) -> Self {
            Self {
                lines: input.lines().map(|line| ReadOutcome::Line(line.to_string())).collect(),
                prompts: Vec::new(),
                history: Vec::new(),
            }
        }
    }

    impl LineSource for Scripted {
        fn read_line(&mut self, prompt: &str) -> io::Result<ReadOutcome> {
            self.prompts.push(prompt.to_string());
            Ok(self.lines.pop_front().unwrap_or(ReadOutcome::Eof))
        }

        fn add_history(&mut self, entry: &str) {
            self.history.push(entry.to_string());
        }
    }

    #[test]
    fn bracket_counting_skips_strings_and_comments() {
        assert_eq!(open_brackets("kaj f() {"), 1);
        assert_eq!(open_brackets("dekho(\"{\")"), 0);
        assert_eq!(open_brackets("dhoro a = [1, // ]\n"), 1);
        assert_eq!(open_brackets("}"), -1);
    }

    #[test]
    fn session_keeps_bindings_and_joins_lines() {
        let (sink, printed) = OutputSink::capture();
        let mut repl = Repl::new(RuntimeOptions::default().with_output(sink)).unwrap();
        let mut input = Scripted::new("dhoro x = 4\nkaj dbl(n) {\n  ferao n * 2\n}\ndbl(x)\ndekho(\"hi\")\n.exit\n");
        let mut output = Vec::new();
        let code = repl.run_with(&mut input, &mut output).unwrap();
        assert_eq!(code, 0);
        assert!(input.prompts.iter().any(|prompt| prompt == CONTINUATION));
        assert_eq!(input.history.len(), 6);
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.lines().any(|line| line == "8"));
        assert_eq!(printed.lock().as_str(), "hi\n");
    }

    #[test]
    fn errors_do_not_end_the_session() {
        let (sink, _printed) = OutputSink::capture();
        let mut repl = Repl::new(RuntimeOptions::default().with_output(sink)).unwrap();
        let mut input = Scripted::new("nai_emon\n1 + 1\n");
        let mut output = Vec::new();
        repl.run_with(&mut input, &mut output).unwrap();
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("nai_emon"));
        assert!(shown.lines().any(|line| line == "2"));
    }

    #[test]
    fn interrupt_drops_the_pending_entry() {
        let (sink, _printed) = OutputSink::capture();
        let mut repl = Repl::new(RuntimeOptions::default().with_output(sink)).unwrap();
        let mut input = Scripted::new("kaj f() {");
        input.lines.push_back(ReadOutcome::Interrupted);
        input.lines.push_back(ReadOutcome::Line("3 * 3".into()));
        let mut output = Vec::new();
        repl.run_with(&mut input, &mut output).unwrap();
        assert_eq!(input.prompts, [PROMPT, CONTINUATION, PROMPT, PROMPT]);
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.lines().any(|line| line == "9"), "shown: {shown}");
    }

    #[test]
    fn bahir_ends_the_session_with_its_code() {
        let (sink, _printed) = OutputSink::capture();
        let mut repl = Repl::new(RuntimeOptions::default().with_output(sink)).unwrap();
        let mut input = Scripted::new("bahir(4)\ndekho(1)\n");
        let mut output = Vec::new();
        assert_eq!(repl.run_with(&mut input, &mut output).unwrap(), 4);
    }
}

//=====================================================
// End of file
//=====================================================
