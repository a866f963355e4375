//! `return expr;` — flags the evaluation output so enclosing expressions
//! propagate it untouched until a function boundary (or the top level)
//! unwraps it.

use std::rc::Rc;

use crate::{
    error::RunResult,
    expressions::{EvaluationOutput, Expression, ReturnTypes},
    trampoline::Trampoline,
    types::{PurityType, Type},
};

#[derive(Debug)]
pub struct ReturnExpression {
    expr: Rc<Expression>,
}

pub fn new_return_expression(expr: Rc<Expression>) -> Expression {
    Expression::Return(ReturnExpression { expr })
}

impl ReturnExpression {
    pub fn types(&self) -> Vec<Type> {
        self.expr.types()
    }

    pub fn return_types(&self) -> ReturnTypes {
        self.expr.types().into_iter().collect()
    }

    pub fn purity(&self) -> PurityType {
        self.expr.purity()
    }

    pub fn evaluate(
        &self,
        trampoline: &mut Trampoline,
        _expected_type: &Type,
    ) -> RunResult<EvaluationOutput> {
        let output = trampoline.bounce(&self.expr, &self.expr.types()[0])?;
        Ok(EvaluationOutput::Return(output.value()))
    }
}
