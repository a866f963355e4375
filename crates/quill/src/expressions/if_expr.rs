//! Conditional evaluation. The two branches must agree exactly on their
//! types (no cross-promotion between branches).

use std::rc::Rc;

use crate::{
    compile::Compilation,
    error::RunResult,
    expressions::{
        EvaluationOutput, Expression, ReturnTypes, combine_return_types,
    },
    trampoline::Trampoline,
    types::{PurityType, Type, combine_purity, types_to_string},
};

#[derive(Debug)]
pub struct IfExpression {
    condition: Rc<Expression>,
    true_case: Rc<Expression>,
    false_case: Rc<Expression>,
    return_types: ReturnTypes,
}

pub fn new_if_expression(
    compilation: &mut Compilation,
    condition: Rc<Expression>,
    true_case: Rc<Expression>,
    false_case: Rc<Expression>,
) -> Option<Expression> {
    if !condition.is_bool() {
        compilation.add_error(format!(
            "Expected bool value for condition of \"if\" expression but found {}.",
            types_to_string(&condition.types())
        ));
        return None;
    }
    if true_case.types() != false_case.types() {
        compilation.add_error(format!(
            "Type mismatch between branches of conditional expression: {} and {}.",
            types_to_string(&true_case.types()),
            types_to_string(&false_case.types())
        ));
        return None;
    }
    let return_types = compilation.register_errors(combine_return_types(
        true_case.return_types(),
        false_case.return_types(),
    ))?;
    Some(Expression::If(IfExpression {
        condition,
        true_case,
        false_case,
        return_types,
    }))
}

impl IfExpression {
    pub fn types(&self) -> Vec<Type> {
        self.true_case.types()
    }

    pub fn return_types(&self) -> ReturnTypes {
        self.return_types.clone()
    }

    pub fn purity(&self) -> PurityType {
        combine_purity([
            self.condition.purity(),
            self.true_case.purity(),
            self.false_case.purity(),
        ])
    }

    pub fn evaluate(
        &self,
        trampoline: &mut Trampoline,
        expected_type: &Type,
    ) -> RunResult<EvaluationOutput> {
        let output = trampoline.bounce(&self.condition, &Type::Bool)?;
        let condition = match output {
            EvaluationOutput::Return(_) => return Ok(output),
            EvaluationOutput::Continue(value) => value,
        };
        let branch = if condition.value().as_bool()? {
            &self.true_case
        } else {
            &self.false_case
        };
        trampoline.bounce(branch, expected_type)
    }
}
