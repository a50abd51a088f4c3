// BanglaCode error handling tests
// Covers: try/catch/finally ordering, thrown values, diagnostics and exit codes

mod util;

use banglacode::parser::parse_source;
use banglacode::runtime::RuntimeOptions;
use banglacode::interpreter::ScriptError;
use util::{lines, run_bang, run_bang_err, run_bang_with};

#[test]
fn catch_runs_before_finally_once() {
    let src = r#"
chesta {
    dekho("try")
    felo "oops"
    dekho("unreached")
} dhoro_bhul (e) {
    dekho("catch " + e)
} shesh {
    dekho("finally")
}
"#;
    let output = run_bang(src);
    assert_eq!(lines(&output), ["try", "catch oops", "finally"]);
}

#[test]
fn runtime_errors_arrive_as_messages() {
    let src = r#"
chesta { dhoro x = 1 / 0 } dhoro_bhul (e) { dekho(e) }
chesta { nai_emon() } dhoro_bhul (e) { dekho(e) }
chesta { [1, 2][5] } dhoro_bhul (e) { dekho(e) }
"#;
    let output = run_bang(src);
    assert_eq!(
        lines(&output),
        [
            "division by zero",
            "undefined variable 'nai_emon'",
            "index 5 out of range for length 2",
        ]
    );
}

#[test]
fn thrown_maps_keep_their_shape() {
    let src = r#"
chesta { felo {code: 4, kotha: "bhul"} } dhoro_bhul (e) { dekho(e.code, e.kotha) }
"#;
    assert_eq!(run_bang(src), "4 bhul\n");
}

#[test]
fn finally_return_overrides_try_return() {
    let src = r#"
kaj f() {
    chesta { ferao 1 } shesh { ferao 2 }
}
dekho(f())
"#;
    assert_eq!(run_bang(src), "2\n");
}

#[test]
fn finally_runs_when_an_error_escapes() {
    let src = r#"
kaj f() {
    chesta { felo "bhitore" } shesh { dekho("shesh 1") }
}
chesta { f() } dhoro_bhul (e) { dekho("bahire " + e) }
chesta {
    chesta { felo "prothom" } dhoro_bhul (e) { felo e + " abar" } shesh { dekho("shesh 2") }
} dhoro_bhul (e) {
    dekho(e)
}
"#;
    let output = run_bang(src);
    assert_eq!(
        lines(&output),
        ["shesh 1", "bahire bhitore", "shesh 2", "prothom abar"]
    );

    let (result, output) = run_bang_with(
        "chesta { felo \"x\" } shesh { dekho(\"y\") }",
        RuntimeOptions::default(),
    );
    assert_eq!(output, "y\n");
    assert_eq!(result.unwrap_err().message, "uncaught x");
}

#[test]
fn throw_in_finally_replaces_the_original() {
    let src = r#"
chesta {
    chesta { felo "asol" } shesh { felo "notun" }
} dhoro_bhul (e) {
    dekho(e)
}
chesta {
    chesta { felo "asol" } dhoro_bhul (e) { felo "dhora" } shesh { felo "shesh theke" }
} dhoro_bhul (e) {
    dekho(e)
}
"#;
    assert_eq!(lines(&run_bang(src)), ["notun", "shesh theke"]);
}

#[test]
fn uncaught_throw_reports_location() {
    let err = run_bang_err("dhoro a = 1\nfelo \"boom\"\n");
    assert_eq!(err.code_str(), "E005");
    assert_eq!(err.message, "uncaught boom");
    assert_eq!(err.position.map(|pos| pos.line), Some(2));
}

#[test]
fn runtime_error_codes() {
    assert_eq!(run_bang_err("dekho(nai)").code_str(), "E004");
    assert_eq!(run_bang_err("sthir a = 1\na = 2").code_str(), "E004");
    assert_eq!(run_bang_err("5()").code_str(), "E003");
    assert_eq!(run_bang_err("chotoHater(5)").code_str(), "E003");
}

#[test]
fn syntax_errors_are_e001() {
    let err: ScriptError = parse_source("dhoro = ;").unwrap_err().into();
    assert_eq!(err.code_str(), "E001");
    let err = run_bang_err("kaj (");
    assert_eq!(err.code_str(), "E001");
}

#[test]
fn recursion_depth_is_bounded() {
    let options = RuntimeOptions::default().with_max_call_depth(64);
    let (result, _) = run_bang_with("kaj f(n) { ferao f(n + 1) }\nf(0)", options);
    let err = result.unwrap_err();
    assert!(err.message.contains("maximum call depth of 64"), "message: {}", err.message);
}

#[test]
fn bahir_stops_with_code() {
    let (result, output) = run_bang_with(
        "dekho(\"age\")\nbahir(3)\ndekho(\"pore\")",
        RuntimeOptions::default(),
    );
    assert_eq!(result.unwrap().exit_code, 3);
    assert_eq!(output, "age\n");
}

#[test]
fn bahir_inside_function_unwinds_everything() {
    let src = r#"
kaj stop() {
    chesta { bahir(7) } shesh { dekho("cleanup") }
}
stop()
dekho("unreached")
"#;
    let (result, output) = run_bang_with(src, RuntimeOptions::default());
    assert_eq!(result.unwrap().exit_code, 7);
    assert_eq!(output, "cleanup\n");
}
