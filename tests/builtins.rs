// BanglaCode built-in library tests
// Covers: string, array, map, json, conversion, math, fs, env and path families

mod util;

use util::{lines, run_bang, run_bang_err};

#[test]
fn string_family() {
    let src = r#"
dekho(boroHater("abc"), chotoHater("XyZ"))
dekho(angsho("BanglaCode", 0, 6), angsho("BanglaCode", -4))
dekho(khojo("hello", "ll"), khojo("hello", "z"))
dekho(bodlo("a-b-c", "-", "+"), chhanto("  ok  "))
dekho(bhag("a,b,c", ","), dorghyo(bhag("abc", "")))
dekho(shuruHoy("bangla", "ban"), sheshHoy("bangla", "x"))
dekho(dorghyo("বাংলা"))
"#;
    assert_eq!(
        lines(&run_bang(src)),
        [
            "ABC xyz",
            "Bangla Code",
            "2 -1",
            "a+b+c ok",
            "[\"a\", \"b\", \"c\"] 3",
            "sotti mittha",
            "5",
        ]
    );
}

#[test]
fn array_family() {
    let src = r#"
dhoro a = [3, 1, 2]
dekho(dhokao(a, 4, 5), a)
dekho(berKoro(a), a)
dekho(kato(a, 1, 3), kato(a, -1))
dekho(ulto(a), a)
dekho(saja(a), saja(a, (x, y) => y - x))
dekho(ache(a, 2), ache(a, 9), khojo(a, 2))
dekho(joro(a), joro(a, " | "))
dekho(roopantor(a, (x, i) => x * 10 + i))
dekho(chhanno(a, x => x > 1))
dekho(sonkkhep(a, (acc, x) => acc + x, 0), sonkkhep(["a", "b"], (acc, x) => acc + x))
dhoro seen = []
proti(a, kaj(x) { dhokao(seen, x) })
dekho(seen)
"#;
    assert_eq!(
        lines(&run_bang(src)),
        [
            "5 [3, 1, 2, 4, 5]",
            "5 [3, 1, 2, 4]",
            "[1, 2] [4]",
            "[4, 2, 1, 3] [3, 1, 2, 4]",
            "[1, 2, 3, 4] [4, 3, 2, 1]",
            "sotti mittha 2",
            "3,1,2,4 3 | 1 | 2 | 4",
            "[30, 11, 22, 43]",
            "[3, 2, 4]",
            "10 ab",
            "[3, 1, 2, 4]",
        ]
    );
}

#[test]
fn sorting_mixed_types_is_an_error() {
    let err = run_bang_err("saja([1, \"a\"])");
    assert_eq!(err.code_str(), "E003");
}

#[test]
fn sorting_large_arrays_with_nan_keeps_going() {
    let src = r#"
dhoro n = (-8) ** 0.5
dhoro a = []
dhoro i = 0
jotokkhon (i < 60) {
    dhokao(a, (i * 37) % 60)
    jodi (i % 20 == 0) { dhokao(a, n) }
    i = i + 1
}
dhoro s = saja(a)
dekho(dorghyo(s))
dekho(saja([3, 1.5, 2, -0.5]))
"#;
    let output = run_bang(src);
    assert_eq!(lines(&output), ["63", "[-0.5, 1.5, 2, 3]"], "output: {output}");
}

#[test]
fn map_family() {
    let src = r#"
dhoro m = {b: 2, a: 1}
dekho(chabi(m), maan(m))
dekho(jora(m))
dhoro n = mishao(m, {a: 10, c: 3})
dekho(n, m)
dekho(dorghyo(n))
"#;
    assert_eq!(
        lines(&run_bang(src)),
        [
            "[\"b\", \"a\"] [2, 1]",
            "[[\"b\", 2], [\"a\", 1]]",
            "{b: 2, a: 10, c: 3} {b: 2, a: 1}",
            "3",
        ]
    );
}

#[test]
fn json_family() {
    let src = r#"
dhoro text = json_banao({naam: "Rina", boyosh: 30, tags: ["x"], ok: sotti, nai: khali})
dekho(text)
dhoro back = json_poro(text)
dekho(back.naam, back.tags[0], back.nai == khali)
dekho(json_poro("[1, 2.5]"))
"#;
    assert_eq!(
        lines(&run_bang(src)),
        [
            "{\"naam\":\"Rina\",\"boyosh\":30,\"tags\":[\"x\"],\"ok\":true,\"nai\":null}",
            "Rina x sotti",
            "[1, 2.5]",
        ]
    );
    assert_eq!(run_bang_err("json_poro(\"{bad\")").code_str(), "E003");
}

#[test]
fn conversion_family() {
    let src = r#"
dekho(sonkha("42") + 1, sonkha("2.5"), purno(3.9), purno("-7.2"))
dekho(lipi(12) + "3", dhoron(1), dhoron("x"), dhoron([]), dhoron({}), dhoron(khali))
dekho(dhoron(kaj() {}), dorghyo([1, 2]))
"#;
    assert_eq!(
        lines(&run_bang(src)),
        [
            "43 2.5 3 -7",
            "123 number string array map null",
            "function 2",
        ]
    );
    assert_eq!(run_bang_err("sonkha(\"abc\")").code_str(), "E003");
}

#[test]
fn math_family() {
    let src = r#"
dekho(borgomul(16), ghat(2, 10), niche(2.7), upore(2.1), kache(2.5))
dekho(porom(-3), choto(4, 2, 8), boro([4, 2, 8]))
dhoro r = lotto(5)
dekho(r >= 0 ebong r <= 5, lotto(3, 3))
"#;
    assert_eq!(
        lines(&run_bang(src)),
        ["4 1024 2 3 3", "3 2 8", "sotti 3"]
    );
}

#[test]
fn filesystem_family() {
    let dir = tempfile::tempdir().expect("temp dir");
    let root = dir.path().to_string_lossy().to_string();
    let src = format!(
        r#"
dhoro root = "{root}"
dhoro folder = path_joro(root, "data")
folder_banao(folder)
dhoro file = path_joro(folder, "notes.txt")
lekho(file, "ek")
jog_koro(file, 2)
dekho(poro(file), file_ache(file))
lekho(path_joro(folder, "b.txt"), "")
dekho(folder_talika(folder))
muchhe_felo(folder)
dekho(file_ache(folder))
chesta {{ poro(file) }} dhoro_bhul (e) {{ dekho("missing") }}
"#
    );
    assert_eq!(
        lines(&run_bang(&src)),
        ["ek2 sotti", "[\"b.txt\", \"notes.txt\"]", "mittha", "missing"]
    );
}

#[test]
fn env_family() {
    let dir = tempfile::tempdir().expect("temp dir");
    let dotenv = dir.path().join("test.env");
    std::fs::write(
        &dotenv,
        "# comment\nexport APP_NAME=\"Bangla App\"\nAPP_PORT=8080 # inline\n",
    )
    .expect("write env file");
    let src = format!(
        r#"
dekho(env_load("{}"))
dekho(env_get("APP_NAME"), sonkha(env_get("APP_PORT")) + 1)
dekho(env_get("BANGLACODE_TEST_UNSET_VAR"), env_get_default("BANGLACODE_TEST_UNSET_VAR", "fallback"))
env_set("BANGLACODE_TEST_SET_VAR", 5)
dekho(env_get("BANGLACODE_TEST_SET_VAR"), env_all()["BANGLACODE_TEST_SET_VAR"])
env_clear()
dekho(env_get("APP_NAME"))
"#,
        dotenv.display()
    );
    assert_eq!(
        lines(&run_bang(&src)),
        ["sotti", "Bangla App 8081", "khali fallback", "5 5", "khali"]
    );
}

#[test]
fn path_family() {
    let src = r#"
dhoro p = path_joro("ghor", "kaj", "file.bang")
dekho(p)
dekho(path_naam(p), path_folder(p), path_ext(p), path_ext("README"))
dekho(path_folder("single"))
dhoro full = path_purno("ghor/../onno/./x.bang")
dekho(sheshHoy(full, path_joro("onno", "x.bang")), shuruHoy(full, "/"))
"#;
    assert_eq!(
        lines(&run_bang(src)),
        [
            "ghor/kaj/file.bang",
            "file.bang ghor/kaj .bang ",
            ".",
            "sotti sotti",
        ]
    );
}
