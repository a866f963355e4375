//! Free numeric functions. These go through doubles, trading exactness for
//! the usual transcendental repertoire.

use crate::{
    bindings::new_callback,
    environment::Environment,
    gc::{Pool, Root},
    types::{Identifier, PurityType},
};

pub fn register_number_functions(pool: &Pool, environment: &Root<Environment>) {
    let mut add = |name: &str, callback: fn(f64) -> f64| {
        environment.value().define(
            Identifier::new(name),
            &new_callback(pool, PurityType::PURE, move |input: f64| callback(input)),
        );
    };
    add("log", f64::ln);
    add("log2", f64::log2);
    add("log10", f64::log10);
    add("exp", f64::exp);
    add("exp2", f64::exp2);
    environment.value().define(
        Identifier::new("pow"),
        &new_callback(pool, PurityType::PURE, |base: f64, exponent: f64| {
            base.powf(exponent)
        }),
    );
}
