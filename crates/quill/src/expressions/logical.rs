//! Short-circuiting `&&` and `||`.

use std::rc::Rc;

use crate::{
    compile::Compilation,
    error::RunResult,
    expressions::{EvaluationOutput, Expression, ReturnTypes},
    trampoline::Trampoline,
    types::{PurityType, Type, types_to_string},
};

#[derive(Debug)]
pub struct LogicalExpression {
    /// The value of the left side that lets evaluation continue to the
    /// right side: `true` for `&&`, `false` for `||`.
    identity: bool,
    expr_a: Rc<Expression>,
    expr_b: Rc<Expression>,
}

pub fn new_logical_expression(
    compilation: &mut Compilation,
    identity: bool,
    a: Rc<Expression>,
    b: Rc<Expression>,
) -> Option<Expression> {
    for side in [&a, &b] {
        if !side.is_bool() {
            compilation.add_error(format!(
                "Expected `bool` value but found: {}",
                types_to_string(&side.types())
            ));
            return None;
        }
    }
    Some(Expression::Logical(LogicalExpression {
        identity,
        expr_a: a,
        expr_b: b,
    }))
}

impl LogicalExpression {
    pub fn types(&self) -> Vec<Type> {
        vec![Type::Bool]
    }

    pub fn return_types(&self) -> ReturnTypes {
        ReturnTypes::new()
    }

    pub fn purity(&self) -> PurityType {
        if self.expr_a.purity() == PurityType::PURE && self.expr_b.purity() == PurityType::PURE {
            PurityType::PURE
        } else {
            PurityType::UNKNOWN
        }
    }

    pub fn evaluate(
        &self,
        trampoline: &mut Trampoline,
        _expected_type: &Type,
    ) -> RunResult<EvaluationOutput> {
        let output = trampoline.bounce(&self.expr_a, &Type::Bool)?;
        let value = match output {
            EvaluationOutput::Return(_) => return Ok(output),
            EvaluationOutput::Continue(value) => value,
        };
        if value.value().as_bool()? == self.identity {
            trampoline.bounce(&self.expr_b, &Type::Bool)
        } else {
            Ok(EvaluationOutput::Continue(value))
        }
    }
}
