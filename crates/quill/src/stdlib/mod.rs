//! The standard library: the default environment and its registrations.

pub mod containers;
pub mod numbers;
pub mod optional;
pub mod string;
pub mod time;

use crate::{
    bindings::new_callback,
    environment::Environment,
    error::{RunError, RunResult},
    gc::{Pool, Root},
    number::Number,
    types::{Identifier, ObjectType, PurityType, Type},
};

/// Builds an environment with the full standard library registered:
/// `string`, `number` and `bool` methods, `Time`/`Duration`, `Error`, the
/// container types (`VectorString`, `SetString`, `VectorNumber`,
/// `SetNumber`) and the optionals (`OptionalString`, `OptionalNumber`).
pub fn new_default_environment(pool: &Pool) -> Root<Environment> {
    let environment = Environment::new(pool);
    string::register_string_type(pool, &environment);
    numbers::register_number_functions(pool, &environment);
    time::register_time_type(pool, &environment);

    let bool_type = ObjectType::new(pool, Type::Bool);
    bool_type.value().add_field(
        Identifier::new("tostring"),
        new_callback(pool, PurityType::PURE, |value: bool| {
            if value { "true" } else { "false" }.to_owned()
        })
        .ptr(),
    );
    environment.value().define_type(bool_type.ptr());

    let number_type = ObjectType::new(pool, Type::Number);
    number_type.value().add_field(
        Identifier::new("tostring"),
        new_callback(pool, PurityType::PURE, |value: Number| {
            value.to_string_with_precision(5)
        })
        .ptr(),
    );
    number_type.value().add_field(
        Identifier::new("tostring"),
        new_callback(pool, PurityType::PURE, |value: Number, precision: usize| {
            value.to_string_with_precision(precision)
        })
        .ptr(),
    );
    environment.value().define_type(number_type.ptr());

    environment.value().define(
        Identifier::new("Error"),
        &new_callback(
            pool,
            PurityType::PURE,
            |description: String| -> RunResult<()> { Err(RunError::Script(description)) },
        ),
    );

    containers::export_vector::<String>(pool, &environment, "VectorString");
    containers::export_set::<String>(pool, &environment, "SetString");
    containers::export_vector::<Number>(pool, &environment, "VectorNumber");
    containers::export_set::<Number>(pool, &environment, "SetNumber");
    optional::export_optional::<String>(pool, &environment, "OptionalString");
    optional::export_optional::<Number>(pool, &environment, "OptionalNumber");

    environment
}
