//! Compile-error reporting: messages, aggregation, and location prefixes.

use quill::{CompileErrors, Pool, compile_string, new_default_environment};

fn compile_errors(code: &str) -> CompileErrors {
    let pool = Pool::new();
    let environment = new_default_environment(&pool);
    match compile_string(code, &pool, environment) {
        Ok(_) => panic!("expected compilation to fail"),
        Err(errors) => errors,
    }
}

fn first_error(code: &str) -> String {
    compile_errors(code).0[0].0.clone()
}

#[test]
fn unknown_variable() {
    assert!(first_error("return nope;").contains("Unknown variable: `nope`"));
}

#[test]
fn unknown_variable_suggests_near_miss() {
    let message = first_error("number value = 1; return Value;");
    assert!(message.contains("Unknown variable: `Value`"), "{message}");
    assert!(message.contains("did you mean `value`?"), "{message}");
}

#[test]
fn unknown_type() {
    let message = first_error("Widget w = 1;");
    assert!(message.contains("Unknown type: `Widget`"), "{message}");
}

#[test]
fn unknown_return_type() {
    let message = first_error("Widget f() { return 1; }");
    assert!(message.contains("Unknown return type: \"Widget\""), "{message}");
}

#[test]
fn define_type_mismatch() {
    let message = first_error("number x = \"nope\";");
    assert!(
        message.contains("Unable to assign a value to a variable of type \"number\""),
        "{message}"
    );
}

#[test]
fn assignment_to_undefined_variable() {
    let message = first_error("x = 1;");
    assert!(message.contains("Variable not found: \"x\""), "{message}");
}

#[test]
fn condition_must_be_bool() {
    let message = first_error("if (1) return 2; return 3;");
    assert!(
        message.contains("Expected bool value for condition of \"if\" expression"),
        "{message}"
    );
    let message = first_error("while (\"x\") return 2; return 3;");
    assert!(
        message.contains("Expected bool value for condition of \"while\" loop"),
        "{message}"
    );
}

#[test]
fn ternary_branches_must_match() {
    let message = first_error("return true ? 1 : \"one\";");
    assert!(
        message.contains("Type mismatch between branches of conditional expression"),
        "{message}"
    );
}

#[test]
fn auto_requires_initializer_type() {
    let message = first_error("auto x;");
    assert!(message.contains("Unable to deduce type."), "{message}");
}

#[test]
fn operator_type_mismatch() {
    let message = first_error("return 1 + \"x\";");
    assert!(message.contains("Unable to apply operator `+`"), "{message}");
    let message = first_error("return \"x\" - \"y\";");
    assert!(message.contains("Unable to apply operator `-`"), "{message}");
}

#[test]
fn unknown_method_with_suggestion() {
    let message = first_error("string s = \"x\"; return s.Size();");
    assert!(message.contains("Unknown method: \"string::Size\""), "{message}");
    assert!(message.contains("did you mean \"size\"?"), "{message}");
}

#[test]
fn unknown_method_without_suggestion() {
    let message = first_error("string s = \"x\"; return s.frobnicate();");
    assert!(
        message.contains("Unknown method: \"string::frobnicate\""),
        "{message}"
    );
    assert!(!message.contains("did you mean"), "{message}");
}

#[test]
fn call_arity_mismatch() {
    let message = first_error("number f(number a) { return a; } return f(1, 2);");
    assert!(
        message.contains("Invalid number of arguments: Expected 1 but found 2"),
        "{message}"
    );
}

#[test]
fn call_argument_type_mismatch() {
    let message = first_error("number f(number a) { return a; } return f(\"x\");");
    assert!(message.contains("Type mismatch in argument 0"), "{message}");
}

#[test]
fn function_body_return_type_mismatch() {
    let message = first_error("number f() { return \"x\"; } return f();");
    assert!(
        message.contains("Expected a return type of \"number\" but found \"string\"."),
        "{message}"
    );
}

#[test]
fn errors_aggregate_across_statements() {
    let errors = compile_errors("return nope; return alsonope;");
    assert_eq!(errors.0.len(), 2, "{errors}");
}

#[test]
fn unterminated_string_literal() {
    let message = first_error("return \"abc;");
    assert!(message.contains("Missing terminating \" character."), "{message}");
}

#[test]
fn oversized_exponent() {
    let message = first_error("return 1e20000;");
    assert!(message.contains("very large exponent"), "{message}");
}

#[test]
fn syntax_error_reports_token() {
    let message = first_error("return 1 + ;");
    assert!(message.contains("Syntax error"), "{message}");
}

#[test]
fn errors_carry_location_prefix() {
    let message = first_error("number x = 1;\nreturn nope;");
    assert!(message.starts_with("<input>:2:"), "{message}");
}

#[test]
fn invalid_preprocessor_directive() {
    let message = first_error("#define X 1\nreturn 1;");
    assert!(
        message.contains("Invalid preprocessing directive #define"),
        "{message}"
    );
}

#[test]
fn missing_include_file() {
    let message = first_error("#include \"does_not_exist.qs\"\nreturn 1;");
    assert!(message.contains("open failed"), "{message}");
}
