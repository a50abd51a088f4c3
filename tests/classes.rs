// BanglaCode class and object tests
// Covers: constructors, chaining, accessors, instanceof, map methods, delete/in

mod util;

use banglacode::interpreter::Value;
use banglacode::runtime::{Runtime, RuntimeOptions};
use std::rc::Rc;
use util::{lines, run_bang, run_bang_err};

const COUNTER: &str = r#"
sreni Counter {
    shuru(start) {
        ei.count = start
    }
    increment() {
        ei.count = ei.count + 1
        ferao ei
    }
    getValue() {
        ferao ei.count
    }
}
"#;

#[test]
fn counter_chaining_scenario() {
    let src = format!(
        "{COUNTER}\ndekho(notun Counter(0).increment().increment().increment().getValue())"
    );
    assert_eq!(run_bang(&src), "3\n");
}

#[test]
fn instances_do_not_share_fields() {
    let src = format!(
        "{COUNTER}\ndhoro a = notun Counter(1)\ndhoro b = notun Counter(10)\na.increment()\ndekho(a.getValue(), b.getValue(), a instanceof Counter)"
    );
    assert_eq!(run_bang(&src), "2 10 sotti\n");
}

#[test]
fn getters_and_setters_intercept_members() {
    let src = r#"
sreni Temp {
    shuru(c) { ei._c = c }
    pao f() { ferao ei._c * 9 / 5 + 32 }
    set f(v) { ei._c = (v - 32) * 5 / 9 }
}
dhoro t = notun Temp(100)
dekho(t.f)
t.f = 32
dekho(t._c)
dekho("_c" in t, "f" in t)
"#;
    let output = run_bang(src);
    assert_eq!(lines(&output), ["212", "0", "sotti mittha"]);
}

#[test]
fn methods_stay_bound_when_detached() {
    let src = format!(
        "{COUNTER}\ndhoro c = notun Counter(5)\ndhoro get = c.getValue\ndekho(get())"
    );
    assert_eq!(run_bang(&src), "5\n");
}

#[test]
fn map_functions_see_the_map_as_ei() {
    let src = r#"
dhoro obj = {naam: "Rahim", hello: kaj() { ferao "ami " + ei.naam }}
dekho(obj.hello())
dekho(delete obj.naam, "naam" in obj, delete obj.naam)
"#;
    let output = run_bang(src);
    assert_eq!(lines(&output), ["ami Rahim", "sotti mittha mittha"]);
}

#[test]
fn constructor_arity_is_checked() {
    let err = run_bang_err(&format!("{COUNTER}\nnotun Counter()"));
    assert_eq!(err.code_str(), "E003");
    assert!(err.message.contains("expects"), "message: {}", err.message);
}

#[test]
fn notun_requires_a_class() {
    let err = run_bang_err("kaj f() {}\nnotun f()");
    assert!(err.message.contains("not a class"), "message: {}", err.message);
}

#[test]
fn printing_instances_shows_fields() {
    let src = format!("{COUNTER}\ndekho(notun Counter(7))");
    assert_eq!(run_bang(&src), "Counter {count: 7}\n");
}

#[test]
fn self_referencing_instances_are_released_with_the_runtime() {
    let src = r#"
sreni Node {
    shuru() {
        ei.me = ei
        ei.cb = ei.naam
    }
    naam() { ferao "node" }
}
notun Node()
"#;
    let runtime = Runtime::new(RuntimeOptions::default()).expect("runtime");
    let outcome = runtime.run_source(src, None).expect("script runs");
    let Value::Instance(instance) = &outcome.value else {
        panic!("expected an instance, got {:?}", outcome.value.repr());
    };
    let weak = Rc::downgrade(instance);
    drop(outcome);
    assert!(weak.upgrade().is_some());
    drop(runtime);
    assert!(weak.upgrade().is_none(), "instance outlived its runtime");
}

