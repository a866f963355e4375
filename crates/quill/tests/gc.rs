//! Collector behaviour against real programs: reachability through
//! environments and closures, cycle collection, weak pointers.

use quill::{
    Pool, Root, Value, compile_string, evaluate, new_default_environment,
};

fn run_in(pool: &Pool, code: &str) -> (Root<quill::Environment>, Root<Value>) {
    let environment = new_default_environment(pool);
    let program = compile_string(code, pool, environment.clone()).unwrap();
    let result = evaluate(&program, pool, environment.clone(), None).unwrap();
    drop(program);
    (environment, result)
}

#[test]
fn collection_preserves_reachable_state() {
    let pool = Pool::new();
    let code = "
        number counter = 3;
        auto bump = [](number d) -> number { counter = counter + d; return counter; };
        bump(4);
        return bump(0);
    ";
    let (environment, result) = run_in(&pool, code);
    assert_eq!(result.value().as_number().unwrap().to_i64(), Ok(7));
    pool.full_collect();
    // Everything reachable from the environment root must still be alive:
    // re-running against the same environment reads the preserved state.
    let program = compile_string("return counter;", &pool, environment.clone()).unwrap();
    let value = evaluate(&program, &pool, environment, None).unwrap();
    assert_eq!(value.value().as_number().unwrap().to_i64(), Ok(7));
}

#[test]
fn cyclic_closures_are_collected() {
    // The closure captures the environment that also stores it: a cycle
    // that reference counting alone would leak.
    let pool = Pool::new();
    let code = "
        auto f = [](number x) -> number { return x; };
        return f(1);
    ";
    let (environment, result) = run_in(&pool, code);
    drop(result);
    let before = pool.full_collect();
    assert!(before.end_total > 0);
    drop(environment);
    let after = pool.full_collect();
    assert_eq!(after.end_total, 0, "unreachable cycle survived: {after}");
}

#[test]
fn class_instances_are_collected_with_their_scopes() {
    let pool = Pool::new();
    let code = "
        class Node { number value; }
        Node n = Node();
        n.set_value(5);
        return n.value();
    ";
    let (environment, result) = run_in(&pool, code);
    assert_eq!(result.value().as_number().unwrap().to_i64(), Ok(5));
    drop(result);
    drop(environment);
    let stats = pool.full_collect();
    assert_eq!(stats.end_total, 0, "instance scope survived: {stats}");
}

#[test]
fn weak_pointers_observe_collection() {
    let pool = Pool::new();
    let (environment, result) = run_in(&pool, "return \"kept\";");
    let weak = result.ptr().to_weak();
    assert!(weak.lock().is_some());
    drop(result);
    drop(environment);
    pool.full_collect();
    assert!(weak.lock().is_none(), "value survived unrooted");
}

#[test]
fn count_objects_tracks_liveness() {
    let pool = Pool::new();
    assert_eq!(pool.count_objects(), 0);
    let (environment, result) = run_in(&pool, "return 1 + 1;");
    assert!(pool.count_objects() > 0);
    drop(result);
    drop(environment);
    pool.full_collect();
    assert_eq!(pool.count_objects(), 0);
}
