// BanglaCode smoke tests for the tokenizer, parser and interpreter
// Covers: arithmetic, functions, truthiness, closures, loops, switch, arrays

mod util;

use util::{lines, run_bang};

#[test]
fn precedence_scenario() {
    let output = run_bang("dhoro x = 2 + 3 * 4; dekho(x);");
    assert_eq!(output, "14\n");
}

#[test]
fn recursive_factorial() {
    let output = run_bang(
        "kaj factorial(n){ jodi(n<=1){ferao 1;} ferao n*factorial(n-1); } dekho(factorial(5));",
    );
    assert_eq!(output, "120\n");
}

#[test]
fn integer_and_float_arithmetic() {
    let output = run_bang("dekho(10 % 3, 2 ** 10, 15 / 4, 8 / 2, 0.5 + 0.25, 7 - 10)");
    assert_eq!(output, "1 1024 3.75 4 0.75 -3\n");
}

#[test]
fn string_concatenation_uses_lipi() {
    let output = run_bang(r#"dekho("n=" + 5, 1 + "a", "x" + sotti + khali)"#);
    assert_eq!(output, "n=5 1a xsottikhali\n");
}

#[test]
fn truthiness_table() {
    let src = r#"
jodi (mittha) { dekho("mittha") }
jodi (khali) { dekho("khali") }
jodi (0) { dekho("zero") }
jodi (sotti) { dekho("sotti") }
jodi (1) { dekho("ek") }
jodi ("x") { dekho("x") }
jodi ("") { dekho("empty string") }
jodi ([]) { dekho("array") }
jodi ({}) { dekho("map") }
"#;
    let output = run_bang(src);
    assert_eq!(lines(&output), ["sotti", "ek", "x", "empty string", "array", "map"]);
}

#[test]
fn closures_keep_separate_state() {
    let src = r#"
kaj makeCounter() {
    dhoro count = 0
    ferao kaj() {
        count = count + 1
        ferao count
    }
}
dhoro a = makeCounter()
dhoro b = makeCounter()
dekho(a())
dekho(a())
dekho(a())
dekho(b())
"#;
    let output = run_bang(src);
    assert_eq!(lines(&output), ["1", "2", "3", "1"]);
}

#[test]
fn switch_falls_through_until_break() {
    let src = r#"
kaj naam(x) {
    bikolpo (x) {
        khetre 1:
            dekho("ek")
        khetre 2:
            dekho("dui")
        khetre 3:
            dekho("tin")
            thamo
        khetre 4:
            dekho("char")
        manchito:
            dekho("onno")
    }
}
naam(2)
naam(9)
"#;
    let output = run_bang(src);
    assert_eq!(lines(&output), ["dui", "tin", "onno"]);
}

#[test]
fn loops_break_and_continue() {
    let src = r#"
dhoro total = 0
ghuriye (dhoro i = 0; i < 10; i = i + 1) {
    jodi (i % 2 == 0) { chharo }
    jodi (i > 7) { thamo }
    total = total + i
}
dekho(total)
dhoro n = 3
jotokkhon (n > 0) { n = n - 1 }
dekho(n)
do { n = n + 5 } jotokkhon (n < 3)
dekho(n)
"#;
    let output = run_bang(src);
    assert_eq!(lines(&output), ["16", "0", "5"]);
}

#[test]
fn for_of_and_for_in() {
    let src = r#"
ghuriye (dhoro x of [1, 2]) { dekho(x) }
ghuriye (dhoro c of "ab") { dekho(c) }
ghuriye (dhoro k in {p: 1, q: 2}) { dekho(k) }
ghuriye (dhoro pair of {r: 3}) { dekho(pair) }
"#;
    let output = run_bang(src);
    assert_eq!(lines(&output), ["1", "2", "a", "b", "p", "q", "[\"r\", 3]"]);
}

#[test]
fn array_builtins_respect_mutation_contract() {
    let src = r#"
dhoro arr = [3, 1, 2]
dhoro sorted = saja(arr)
dhoro rev = ulto(arr)
dhoro part = kato(arr, 0, 2)
dekho(arr, sorted, rev, part)
dhokao(arr, 4)
arr[0] = 9
dekho(arr, berKoro(arr), arr)
"#;
    let output = run_bang(src);
    assert_eq!(
        lines(&output),
        ["[3, 1, 2] [1, 2, 3] [2, 1, 3] [3, 1]", "[9, 1, 2] 4 [9, 1, 2]"]
    );
}

#[test]
fn destructuring_declarations() {
    let src = r#"
dhoro [a, , c] = [1, 2, 3]
dhoro {naam, boyosh} = {naam: "Rina", boyosh: 30}
dekho(a, c, naam, boyosh)
"#;
    assert_eq!(run_bang(src), "1 3 Rina 30\n");
}

#[test]
fn generators_yield_lazily() {
    let src = r#"
kaj* gonona(n) {
    ghuriye (dhoro i = 0; i < n; i = i + 1) {
        utpadan i
    }
}
ghuriye (dhoro v of gonona(3)) { dekho(v) }
dhoro g = gonona(2)
dekho(g.next().value, g.next().value, g.next().done)
"#;
    let output = run_bang(src);
    assert_eq!(lines(&output), ["0", "1", "2", "0 1 sotti"]);
}

#[test]
fn arrow_functions_and_higher_order_builtins() {
    let src = r#"
dhoro nums = [1, 2, 3, 4]
dhoro doubled = roopantor(nums, (x) => x * 2)
dhoro evens = chhanno(nums, kaj(x) { ferao x % 2 == 0 })
dhoro sum = sonkkhep(nums, (acc, x) => acc + x, 0)
dekho(doubled, evens, sum)
proti(["a", "b"], (item, i) => dekho(i, item))
"#;
    let output = run_bang(src);
    assert_eq!(lines(&output), ["[2, 4, 6, 8] [2, 4] 10", "0 a", "1 b"]);
}
