//! Number behaviour observable from scripts: exact rational arithmetic,
//! precision rendering, conversion failures.

use pretty_assertions::assert_eq;
use quill::{
    Pool, Root, RunError, Value, compile_string, evaluate, new_default_environment,
};

fn run(code: &str) -> Result<Root<Value>, RunError> {
    let pool = Pool::new();
    let environment = new_default_environment(&pool);
    let program = match compile_string(code, &pool, environment.clone()) {
        Ok(program) => program,
        Err(errors) => panic!("compilation failed:\n{errors}"),
    };
    evaluate(&program, &pool, environment, None)
}

fn run_string(code: &str) -> String {
    run(code)
        .unwrap()
        .value()
        .as_str()
        .expect("expected a string")
        .to_owned()
}

fn run_bool(code: &str) -> bool {
    run(code).unwrap().value().as_bool().expect("expected a bool")
}

#[test]
fn arithmetic_is_exact() {
    // A tenth has no double representation, but rationals are exact.
    assert!(run_bool("return 0.1 + 0.2 == 0.3;"));
    assert!(run_bool("return 1 / 3 * 3 == 1;"));
}

#[test]
fn fraction_rendering() {
    assert_eq!(run_string("return (1 / 3).tostring(5);"), "0.33333");
    assert_eq!(run_string("return (2 / 3).tostring(5);"), "0.66667");
    assert_eq!(run_string("return (-1 / 2).tostring(2);"), "-0.5");
}

#[test]
fn integers_round_trip_through_tostring_and_toint() {
    for value in ["0", "1", "42", "-42", "123456789"] {
        let code = format!("return ({value}).tostring().toint() == {value};");
        assert!(run_bool(&code), "round trip failed for {value}");
    }
}

#[test]
fn toint_of_fraction_is_rejected_by_strings() {
    // tostring(5) of 1/3 renders a decimal; toint of that string fails.
    let error = run("return (1 / 3).tostring(5).toint();").unwrap_err();
    assert!(matches!(error, RunError::Native(_)), "got: {error}");
}

#[test]
fn comparisons_are_exact_on_long_chains() {
    let code = "
        number x = 0;
        for (number i = 0; i < 100; ++i) x = x + 1 / 7;
        return x == 100 / 7;
    ";
    assert!(run_bool(code));
}

#[test]
fn division_by_computed_zero() {
    let error = run("number z = 5 - 5; return 1 / z;").unwrap_err();
    assert!(matches!(error, RunError::DivisionByZero), "got: {error}");
}

#[test]
fn negative_literals_via_unary_minus() {
    assert!(run_bool("return -0.5 * -2 == 1;"));
    assert_eq!(run_string("return (-1.5).tostring(1);"), "-1.5");
}
