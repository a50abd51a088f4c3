// BanglaCode module loader tests
// Covers: ano/pathao forms, JSON modules, cycles, failures and retries

mod util;

use std::fs;
use std::path::Path;
use util::{lines, run_bang_file};

fn write(dir: &Path, name: &str, source: &str) {
    fs::write(dir.join(name), source).expect("write module");
}

#[test]
fn import_forms_bind_exports() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(
        dir.path(),
        "math.bang",
        r#"
pathao kaj jog(a, b) { ferao a + b }
pathao sthir PI = 3.14
kaj gopon() { ferao "hidden" }
dhoro gun = 2
pathao { gun }
"#,
    );
    write(dir.path(), "config.json", r#"{"port": 8080, "hosts": ["a", "b"]}"#);
    write(
        dir.path(),
        "main.bang",
        r#"
ano "./math.bang"
ano "math" hisabe m
ano "./config.json" hisabe config
dekho(jog(2, 3), m.PI, config.port)
{
    ano {gun} "./math.bang"
    dekho(gun, dorghyo(config.hosts))
}
dekho(chabi(m))
"#,
    );

    let (result, output) = run_bang_file(&dir.path().join("main.bang"));
    assert!(result.is_ok(), "{result:?}\noutput: {output}");
    assert_eq!(
        lines(&output),
        ["5 3.14 8080", "2 2", "[\"jog\", \"PI\", \"gun\"]"],
        "output: {output}"
    );
}

#[test]
fn cyclic_imports_see_partial_exports() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(
        dir.path(),
        "a.bang",
        r#"
pathao dhoro naam = "a"
ano "./b.bang" hisabe b
pathao kaj bNaam() { ferao b.naam }
"#,
    );
    write(
        dir.path(),
        "b.bang",
        r#"
ano "./a.bang" hisabe a
pathao dhoro naam = "b"
pathao kaj aNaam() { ferao a.naam }
dekho("b sees", chabi(a))
"#,
    );
    write(
        dir.path(),
        "main.bang",
        r#"
ano "./a.bang" hisabe a
ano "./b.bang" hisabe b
dekho(a.bNaam(), b.aNaam())
"#,
    );

    let (result, output) = run_bang_file(&dir.path().join("main.bang"));
    assert!(result.is_ok(), "{result:?}\noutput: {output}");
    assert_eq!(lines(&output), ["b sees [\"naam\"]", "b a"], "output: {output}");
}

#[test]
fn modules_run_once() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(dir.path(), "once.bang", "dekho(\"loading\")\npathao dhoro x = 1\n");
    write(
        dir.path(),
        "main.bang",
        "ano \"./once.bang\" hisabe p\nano \"./once.bang\" hisabe q\ndekho(p.x + q.x)\n",
    );
    let (result, output) = run_bang_file(&dir.path().join("main.bang"));
    assert!(result.is_ok(), "output: {output}");
    assert_eq!(lines(&output), ["loading", "2"]);
}

#[test]
fn missing_module_is_e002() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(dir.path(), "main.bang", "ano \"./nai.bang\"\n");
    let (result, _) = run_bang_file(&dir.path().join("main.bang"));
    let err = result.unwrap_err();
    assert_eq!(err.code_str(), "E002");
    assert!(err.message.contains("nai.bang"), "message: {}", err.message);
}

#[test]
fn missing_named_export_is_reported() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(dir.path(), "lib.bang", "pathao dhoro a = 1\n");
    write(dir.path(), "main.bang", "ano {b} \"./lib.bang\"\n");
    let (result, _) = run_bang_file(&dir.path().join("main.bang"));
    let err = result.unwrap_err();
    assert_eq!(err.code_str(), "E002");
    assert!(err.message.contains("no export named 'b'"), "message: {}", err.message);
}

#[test]
fn failed_module_is_retried() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(
        dir.path(),
        "flaky.bang",
        r#"
jodi (env_get("BANGLACODE_TEST_FLAKY_MODULE") == khali) {
    env_set("BANGLACODE_TEST_FLAKY_MODULE", "1")
    dekho("first")
    felo "not yet"
}
dekho("second")
pathao dhoro x = 1
"#,
    );
    write(
        dir.path(),
        "main.bang",
        r#"
chesta {
    ano "./flaky.bang"
} dhoro_bhul (e) {
    dekho("failed", e)
}
ano "./flaky.bang" hisabe f
dekho(f.x)
"#,
    );
    let (result, output) = run_bang_file(&dir.path().join("main.bang"));
    assert!(result.is_ok(), "{result:?}\noutput: {output}");
    assert_eq!(
        lines(&output),
        ["first", "failed not yet", "second", "1"],
        "output: {output}"
    );
}

#[test]
fn module_syntax_errors_name_the_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(dir.path(), "broken.bang", "dhoro = ;\n");
    write(dir.path(), "main.bang", "ano \"./broken.bang\"\n");
    let (result, _) = run_bang_file(&dir.path().join("main.bang"));
    let err = result.unwrap_err();
    assert_eq!(err.code_str(), "E002");
    assert!(err.message.contains("broken.bang"), "message: {}", err.message);
}
