//! Literal and pre-computed values.

use crate::{
    error::{RunError, RunResult},
    expressions::{EvaluationOutput, Expression, ReturnTypes},
    gc::{Pool, Root},
    trampoline::Trampoline,
    types::{PurityType, Type, promote},
    value::Value,
};

#[derive(Debug)]
pub struct ConstantExpression {
    value: Root<Value>,
}

pub fn new_constant_expression(value: Root<Value>) -> Expression {
    Expression::Constant(ConstantExpression { value })
}

pub fn new_void_expression(pool: &Pool) -> Expression {
    new_constant_expression(Value::new_void(pool))
}

impl ConstantExpression {
    pub fn types(&self) -> Vec<Type> {
        vec![self.value.value().vm_type().clone()]
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
        let vm_type = self.value.value().vm_type().clone();
        let promotion = promote(&vm_type, expected_type).ok_or_else(|| {
            RunError::Internal(format!(
                "constant of type {vm_type} evaluated as {expected_type}"
            ))
        })?;
        Ok(EvaluationOutput::Continue(promotion(
            trampoline.pool(),
            self.value.clone(),
        )))
    }
}
