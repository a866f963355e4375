//! Iterative execution: suspension at external function calls, resumption
//! with host-supplied results, and the yield hook.

use std::{cell::Cell, rc::Rc};

use quill::{
    Identifier, Number, Pool, RunError, RunProgress, Session, Type, Value, compile_string,
    evaluate, new_default_environment, new_external_function,
};

fn environment_with_external(pool: &Pool, name: &str) -> quill::Root<quill::Environment> {
    let environment = new_default_environment(pool);
    environment.value().define(
        Identifier::new(name),
        &new_external_function(
            pool,
            Identifier::new(name),
            Type::Number,
            vec![Type::Number, Type::Number],
        ),
    );
    environment
}

#[test]
fn external_calls_suspend_and_resume() {
    let pool = Pool::new();
    let environment = environment_with_external(&pool, "add");
    let program = compile_string(
        "return add(1, 2) + add(3, 4);",
        &pool,
        environment.clone(),
    )
    .unwrap();

    let session = Session::new(program, &pool, environment);
    let progress = session.start().unwrap();
    let RunProgress::ExternalCall {
        name,
        args,
        call_id,
        state,
    } = progress
    else {
        panic!("expected an external call");
    };
    assert_eq!(name.as_str(), "add");
    assert_eq!(call_id, 0);
    assert_eq!(args.len(), 2);
    assert_eq!(args[0].value().as_number().unwrap().to_i64(), Ok(1));
    assert_eq!(args[1].value().as_number().unwrap().to_i64(), Ok(2));

    let progress = state
        .resume(Value::new_number(&pool, Number::from_i64(3)))
        .unwrap();
    let RunProgress::ExternalCall {
        name,
        args,
        call_id,
        state,
    } = progress
    else {
        panic!("expected a second external call");
    };
    assert_eq!(name.as_str(), "add");
    assert_eq!(call_id, 1);
    assert_eq!(args[0].value().as_number().unwrap().to_i64(), Ok(3));
    assert_eq!(args[1].value().as_number().unwrap().to_i64(), Ok(4));

    let progress = state
        .resume(Value::new_number(&pool, Number::from_i64(7)))
        .unwrap();
    let RunProgress::Complete(result) = progress else {
        panic!("expected completion");
    };
    assert_eq!(result.value().as_number().unwrap().to_i64(), Ok(10));
}

#[test]
fn external_results_are_never_requested_twice() {
    // The external call feeds an accumulator defined before it; replaying
    // the program after resumption must reuse the cached result.
    let pool = Pool::new();
    let environment = environment_with_external(&pool, "fetch");
    let program = compile_string(
        "number total = fetch(1, 1); total = total + fetch(2, 2); return total;",
        &pool,
        environment.clone(),
    )
    .unwrap();

    let mut progress = Session::new(program, &pool, environment).start().unwrap();
    let mut served = 0;
    loop {
        match progress {
            RunProgress::Complete(result) => {
                assert_eq!(result.value().as_number().unwrap().to_i64(), Ok(30));
                break;
            }
            RunProgress::ExternalCall { call_id, state, .. } => {
                assert_eq!(call_id, served, "each call is issued exactly once");
                served += 1;
                progress = state
                    .resume(Value::new_number(&pool, Number::from_i64((10 * served).into())))
                    .unwrap();
            }
        }
    }
    assert_eq!(served, 2);
}

#[test]
fn plain_evaluate_rejects_external_calls() {
    let pool = Pool::new();
    let environment = environment_with_external(&pool, "add");
    let program = compile_string("return add(1, 2);", &pool, environment.clone()).unwrap();
    let error = evaluate(&program, &pool, environment, None).unwrap_err();
    assert!(matches!(error, RunError::Internal(_)), "got: {error}");
}

#[test]
fn yield_hook_fires_during_long_evaluation() {
    let pool = Pool::new();
    let environment = new_default_environment(&pool);
    let program = compile_string(
        "number x = 0; for (number i = 0; i < 2000; ++i) x = x + i; return x;",
        &pool,
        environment.clone(),
    )
    .unwrap();
    let fired = Rc::new(Cell::new(0usize));
    let fired_for_hook = fired.clone();
    let result = evaluate(
        &program,
        &pool,
        environment,
        Some(Box::new(move || {
            fired_for_hook.set(fired_for_hook.get() + 1);
        })),
    )
    .unwrap();
    assert_eq!(
        result.value().as_number().unwrap().to_i64(),
        Ok(2000 * 1999 / 2)
    );
    assert!(fired.get() > 0, "yield hook never fired");
}
