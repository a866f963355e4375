//! The recursion-depth guard: runaway recursion must surface as a resource
//! error instead of exhausting the host stack.

use quill::{
    Pool, ResourceError, ResourceLimits, RunError, RunProgress, Session, compile_string,
    new_default_environment,
};

#[test]
fn unbounded_recursion_hits_the_depth_guard() {
    let pool = Pool::new();
    let environment = new_default_environment(&pool);
    let program = compile_string(
        "number f(number n) { return f(n + 1); } return f(0);",
        &pool,
        environment.clone(),
    )
    .unwrap();
    let session = Session::new(program, &pool, environment).with_limits(ResourceLimits {
        max_steps: None,
        max_duration: None,
        max_recursion_depth: 100,
    });
    let error = session.start().unwrap_err();
    assert!(
        matches!(
            error,
            RunError::Resource(ResourceError::Recursion { limit: 100, .. })
        ),
        "got: {error}"
    );
}

#[test]
fn step_limit_stops_infinite_loops() {
    let pool = Pool::new();
    let environment = new_default_environment(&pool);
    let program = compile_string(
        "number x = 0; while (true) x = x + 1; return x;",
        &pool,
        environment.clone(),
    )
    .unwrap();
    let session = Session::new(program, &pool, environment).with_limits(ResourceLimits {
        max_steps: Some(10_000),
        max_duration: None,
        max_recursion_depth: 100,
    });
    let error = session.start().unwrap_err();
    assert!(
        matches!(error, RunError::Resource(ResourceError::Step { .. })),
        "got: {error}"
    );
}

#[test]
fn bounded_recursion_fits_in_default_limits() {
    let pool = Pool::new();
    let environment = new_default_environment(&pool);
    let program = compile_string(
        "number f(number n) { if (n <= 0) return 0; return n + f(n - 1); } return f(20);",
        &pool,
        environment.clone(),
    )
    .unwrap();
    let progress = Session::new(program, &pool, environment).start().unwrap();
    let RunProgress::Complete(result) = progress else {
        panic!("expected completion");
    };
    assert_eq!(result.value().as_number().unwrap().to_i64(), Ok(210));
}
