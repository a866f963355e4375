//! `#include` handling: expansion relative to the including file, and
//! include-chain error reporting.

use std::{fs, path::PathBuf};

use quill::{Pool, compile_file, evaluate, new_default_environment};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("quill-include-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn includes_expand_in_place() {
    let dir = scratch_dir("basic");
    fs::write(
        dir.join("lib.qs"),
        "number five() { return 5; }\n",
    )
    .unwrap();
    fs::write(
        dir.join("main.qs"),
        "#include \"lib.qs\"\nreturn five() + 1;\n",
    )
    .unwrap();

    let pool = Pool::new();
    let environment = new_default_environment(&pool);
    let program = compile_file(&dir.join("main.qs"), &pool, environment.clone()).unwrap();
    let result = evaluate(&program, &pool, environment, None).unwrap();
    assert_eq!(result.value().as_number().unwrap().to_i64(), Ok(6));
}

#[test]
fn quoted_includes_resolve_relative_to_the_including_file() {
    let dir = scratch_dir("relative");
    fs::create_dir_all(dir.join("sub")).unwrap();
    fs::write(dir.join("sub/inner.qs"), "number x = 7;\n").unwrap();
    fs::write(dir.join("sub/outer.qs"), "#include \"inner.qs\"\n").unwrap();
    fs::write(
        dir.join("main.qs"),
        "#include \"sub/outer.qs\"\nreturn x;\n",
    )
    .unwrap();

    let pool = Pool::new();
    let environment = new_default_environment(&pool);
    let program = compile_file(&dir.join("main.qs"), &pool, environment.clone()).unwrap();
    let result = evaluate(&program, &pool, environment, None).unwrap();
    assert_eq!(result.value().as_number().unwrap().to_i64(), Ok(7));
}

#[test]
fn errors_inside_includes_report_the_chain() {
    let dir = scratch_dir("chain");
    fs::write(dir.join("broken.qs"), "return nope;\n").unwrap();
    fs::write(
        dir.join("main.qs"),
        "#include \"broken.qs\"\n",
    )
    .unwrap();

    let pool = Pool::new();
    let environment = new_default_environment(&pool);
    let errors = compile_file(&dir.join("main.qs"), &pool, environment).unwrap_err();
    let message = errors.0[0].0.clone();
    assert!(message.contains("broken.qs"), "{message}");
    assert!(message.contains("included from"), "{message}");
    assert!(message.contains("main.qs"), "{message}");
}

#[test]
fn missing_include_reports_open_failure() {
    let dir = scratch_dir("missing");
    fs::write(dir.join("main.qs"), "#include \"absent.qs\"\n").unwrap();

    let pool = Pool::new();
    let environment = new_default_environment(&pool);
    let errors = compile_file(&dir.join("main.qs"), &pool, environment).unwrap_err();
    assert!(errors.0[0].0.contains("open failed"), "{}", errors.0[0].0);
}

#[test]
fn cyclic_includes_are_refused() {
    let dir = scratch_dir("cycle");
    fs::write(dir.join("a.qs"), "#include \"b.qs\"\n").unwrap();
    fs::write(dir.join("b.qs"), "#include \"a.qs\"\n").unwrap();

    let pool = Pool::new();
    let environment = new_default_environment(&pool);
    let errors = compile_file(&dir.join("a.qs"), &pool, environment).unwrap_err();
    assert!(
        errors.0[0].0.contains("nesting too deep"),
        "{}",
        errors.0[0].0
    );
}
