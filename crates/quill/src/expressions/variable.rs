//! Symbol references, resolved polymorphically at compile time and narrowed
//! by the expected type at evaluation time.

use crate::{
    compile::Compilation,
    error::{RunError, RunResult},
    expressions::{EvaluationOutput, Expression, ReturnTypes},
    trampoline::Trampoline,
    types::{Identifier, Namespace, PurityType, Type},
};

#[derive(Debug)]
pub struct VariableLookup {
    symbol_namespace: Namespace,
    symbol: Identifier,
    types: Vec<Type>,
}

/// Builds a lookup for `a::b::name` (`symbols` holds the full path). Fails
/// compilation when no definition is visible.
pub fn new_variable_lookup(
    compilation: &mut Compilation,
    mut symbols: Vec<Identifier>,
) -> Option<Expression> {
    let symbol = symbols.pop().expect("name paths are non-empty");
    let symbol_namespace = Namespace(symbols);

    // During compilation the active environment is already the right one, so
    // no namespace switching is needed here.
    let environment = compilation.environment.clone();
    let candidates = environment.value().poly_lookup(&symbol_namespace, &symbol);
    if candidates.is_empty() {
        let mut message = format!("Unknown variable: `{symbol}`");
        let near_misses = environment
            .value()
            .case_insensitive_lookup(&symbol_namespace, &symbol);
        if let Some(near) = near_misses.iter().find(|name| **name != symbol) {
            message.push_str(&format!(" (did you mean `{near}`?)"));
        }
        compilation.add_error(message);
        return None;
    }
    let mut types = Vec::new();
    for candidate in candidates {
        if !types.contains(&candidate.vm_type) {
            types.push(candidate.vm_type);
        }
    }
    Some(Expression::Variable(VariableLookup {
        symbol_namespace,
        symbol,
        types,
    }))
}

impl VariableLookup {
    pub fn types(&self) -> Vec<Type> {
        self.types.clone()
    }

    pub fn return_types(&self) -> ReturnTypes {
        ReturnTypes::new()
    }

    pub fn purity(&self) -> PurityType {
        PurityType::PURE
    }

    pub fn evaluate(
        &self,
        trampoline: &mut Trampoline,
        expected_type: &Type,
    ) -> RunResult<EvaluationOutput> {
        let environment = trampoline.environment().clone();
        let value = environment.value().lookup(
            trampoline.pool(),
            &self.symbol_namespace,
            &self.symbol,
            expected_type,
        );
        match value {
            Some(value) => Ok(EvaluationOutput::Continue(value)),
            None => Err(RunError::Internal(format!(
                "variable value is null: {}",
                self.symbol
            ))),
        }
    }
}
