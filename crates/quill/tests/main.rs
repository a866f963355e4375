//! End-to-end language tests: compile a source string against the default
//! environment and evaluate it to completion.

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

fn run_number(code: &str) -> i64 {
    run(code)
        .expect("evaluation should succeed")
        .value()
        .as_number()
        .expect("expected a number result")
        .to_i64()
        .expect("expected an integer result")
}

fn run_string(code: &str) -> String {
    run(code)
        .expect("evaluation should succeed")
        .value()
        .as_str()
        .expect("expected a string result")
        .to_owned()
}

fn run_bool(code: &str) -> bool {
    run(code)
        .expect("evaluation should succeed")
        .value()
        .as_bool()
        .expect("expected a bool result")
}

#[test]
fn addition() {
    assert_eq!(run_number("return 40 + 2;"), 42);
}

#[test]
fn string_concat_and_substr() {
    assert_eq!(
        run_string("string s = \"ab\"; s = s + \"cd\"; return s.substr(1, 2);"),
        "bc"
    );
}

#[test]
fn recursive_factorial() {
    let code = "
        number fact(number n) {
          if (n <= 1) return 1;
          return n * fact(n - 1);
        }
        return fact(5);
    ";
    assert_eq!(run_number(code), 120);
}

#[test]
fn for_loop_sum() {
    assert_eq!(
        run_number("number x = 0; for (number i = 1; i <= 4; ++i) x = x + i; return x;"),
        10
    );
}

#[test]
fn class_fields() {
    let code = "
        class Pair {
          number a;
          number b;
        }
        Pair p = Pair();
        p.set_a(3);
        p.set_b(4);
        return p.a() + p.b();
    ";
    assert_eq!(run_number(code), 7);
}

#[test]
fn division_by_zero() {
    let error = run("return 1 / 0;").unwrap_err();
    assert!(matches!(error, RunError::DivisionByZero), "got: {error}");
}

#[test]
fn while_loop() {
    assert_eq!(
        run_number("number x = 1; while (x < 100) x = x * 2; return x;"),
        128
    );
}

#[test]
fn ternary_operator() {
    assert_eq!(run_string("return 1 < 2 ? \"yes\" : \"no\";"), "yes");
    assert_eq!(run_number("number a = 5; return a > 3 ? a : -a;"), 5);
}

#[test]
fn logical_operators_short_circuit() {
    assert!(run_bool("return true && true;"));
    assert!(!run_bool("return true && false;"));
    assert!(run_bool("return false || true;"));
    // The right side would fail at evaluation; short-circuiting skips it.
    assert!(run_bool(
        "number x = 0; return true || (1 / x) == 1; return false;"
    ));
}

#[test]
fn unary_negation() {
    assert_eq!(run_number("return -(40 + 2) * -1;"), 42);
    assert!(run_bool("return !(1 > 2);"));
}

#[test]
fn string_repetition_and_comparison() {
    assert_eq!(run_string("return \"ab\" * 3;"), "ababab");
    assert!(run_bool("return \"abc\" < \"abd\";"));
    assert!(run_bool("return \"a\" == \"a\";"));
    assert!(run_bool("return \"a\" != \"b\";"));
}

#[test]
fn compound_assignment_and_increments() {
    assert_eq!(
        run_number("number x = 1; x *= 5; x += 2; ++x; x--; return x;"),
        7
    );
}

#[test]
fn auto_type_deduction() {
    assert_eq!(run_number("auto x = 40; auto y = x + 2; return y;"), 42);
    assert_eq!(run_string("auto s = \"hi\"; return s;"), "hi");
}

#[test]
fn dangling_else_binds_to_nearest_if() {
    let code = "
        number f(number n) {
          if (n < 10)
            if (n < 5) return 1;
            else return 2;
          return 3;
        }
        return f(7);
    ";
    assert_eq!(run_number(code), 2);
}

#[test]
fn closures_capture_their_environment() {
    let code = "
        number counter = 0;
        auto inc = [](number delta) -> number {
          counter = counter + delta;
          return counter;
        };
        inc(5);
        return inc(37);
    ";
    assert_eq!(run_number(code), 42);
}

#[test]
fn lambda_calls_as_statements() {
    let code = "
        number hits = 0;
        auto bump = [](number n) -> number { hits = hits + n; return hits; };
        bump(3);
        return hits;
    ";
    assert_eq!(run_number(code), 3);
}

#[test]
fn namespaces() {
    let code = "
        namespace lib {
          number four() { return 4; }
          number ten = 10;
        }
        return lib::four() + lib::ten;
    ";
    assert_eq!(run_number(code), 14);
}

#[test]
fn nested_namespaces() {
    let code = "
        namespace outer {
          namespace inner {
            number value = 9;
          }
        }
        return outer::inner::value;
    ";
    assert_eq!(run_number(code), 9);
}

#[test]
fn object_identity_equality() {
    let code = "
        class Box { number v; }
        Box a = Box();
        Box b = a;
        return a == b;
    ";
    assert!(run_bool(code));
    let code = "
        class Box { number v; }
        Box a = Box();
        Box b = Box();
        return a == b;
    ";
    assert!(!run_bool(code));
}

#[test]
fn setters_chain() {
    let code = "
        class Pair {
          number a;
          number b;
        }
        Pair p = Pair();
        return p.set_a(1).set_b(2).a() + p.b();
    ";
    assert_eq!(run_number(code), 3);
}

#[test]
fn class_members_with_initializers() {
    let code = "
        class Point {
          number x = 3;
          number y = 4;
        }
        Point p = Point();
        return p.x() * p.x() + p.y() * p.y();
    ";
    assert_eq!(run_number(code), 25);
}

#[test]
fn stored_function_members_are_callable() {
    let code = "
        class Greeter {
          auto greet = [](string name) -> string { return \"hi \" + name; };
        }
        Greeter g = Greeter();
        return (g.greet())(\"quill\");
    ";
    assert_eq!(run_string(code), "hi quill");
}

#[test]
fn reading_uninitialized_variable_fails_at_evaluation() {
    let error = run("number x; return x;").unwrap_err();
    assert!(matches!(error, RunError::Internal(_)), "got: {error}");
}

#[test]
fn explicit_error_value() {
    let error = run("Error(\"boom\"); return 1;").unwrap_err();
    match error {
        RunError::Script(message) => assert_eq!(message, "boom"),
        other => panic!("expected script error, got: {other}"),
    }
}

#[test]
fn c_style_function_parameters_are_rejected() {
    let code = "
        number apply(number f(number n), number v) { return f(v); }
        return 0;
    ";
    // Function-typed parameters use the lambda syntax instead; this form is
    // not part of the grammar, so it must fail to parse.
    let pool = Pool::new();
    let environment = new_default_environment(&pool);
    assert!(compile_string(code, &pool, environment).is_err());
}

#[test]
fn lambdas_as_arguments() {
    let code = "
        auto twice = [](number x) -> number { return x * 2; };
        number apply_to_ten = twice(10);
        return apply_to_ten + twice(1);
    ";
    assert_eq!(run_number(code), 22);
}

#[test]
fn top_level_return_stops_evaluation() {
    assert_eq!(run_number("return 1; return 2;"), 1);
}

#[test]
fn program_value_is_last_statement() {
    let result = run("number x = 1; x + 1;").unwrap();
    // The program's value is the last statement's value.
    assert_eq!(result.value().as_number().unwrap().to_i64(), Ok(2));
}

#[test]
fn number_tostring_overloads() {
    assert_eq!(run_string("number x = 5; return x.tostring();"), "5");
    assert_eq!(run_string("return (1 / 3).tostring(5);"), "0.33333");
    assert_eq!(run_string("return (1 / 2).tostring(1);"), "0.5");
}

#[test]
fn bool_tostring() {
    assert_eq!(run_string("return (1 < 2).tostring();"), "true");
    assert_eq!(run_string("return false.tostring();"), "false");
}

#[test]
fn scientific_literals() {
    assert_eq!(run_number("return 15e2 / 100;"), 15);
    assert_eq!(run_string("return (15e-1).tostring(1);"), "1.5");
}

#[test]
fn int_and_double_alias_number() {
    assert_eq!(run_number("int x = 40; double y = 2; return x + y;"), 42);
}
