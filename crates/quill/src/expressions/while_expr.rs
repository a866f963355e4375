//! `while` loops, and `for` loops desugared onto them:
//! `for (init; cond; step) body` is `{ init; while (cond) { body; step; } }`.

use std::rc::Rc;

use crate::{
    compile::Compilation,
    error::RunResult,
    expressions::{
        EvaluationOutput, Expression, ReturnTypes, append::new_append_expression,
    },
    trampoline::Trampoline,
    types::{PurityType, Type, types_to_string},
    value::Value,
};

#[derive(Debug)]
pub struct WhileExpression {
    condition: Rc<Expression>,
    body: Rc<Expression>,
}

pub fn new_while_expression(
    compilation: &mut Compilation,
    condition: Rc<Expression>,
    body: Rc<Expression>,
) -> Option<Expression> {
    if !condition.is_bool() {
        compilation.add_error(format!(
            "Expected bool value for condition of \"while\" loop but found: {}.",
            types_to_string(&condition.types())
        ));
        return None;
    }
    Some(Expression::While(WhileExpression { condition, body }))
}

pub fn new_for_expression(
    compilation: &mut Compilation,
    init: Rc<Expression>,
    condition: Rc<Expression>,
    step: Rc<Expression>,
    body: Rc<Expression>,
) -> Option<Expression> {
    let body_with_step = Rc::new(new_append_expression(compilation, body, step)?);
    let while_loop = Rc::new(new_while_expression(compilation, condition, body_with_step)?);
    new_append_expression(compilation, init, while_loop)
}

impl WhileExpression {
    pub fn types(&self) -> Vec<Type> {
        vec![Type::Void]
    }

    pub fn return_types(&self) -> ReturnTypes {
        self.body.return_types()
    }

    pub fn purity(&self) -> PurityType {
        if self.condition.purity() == PurityType::PURE && self.body.purity() == PurityType::PURE {
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
        loop {
            let output = trampoline.bounce(&self.condition, &Type::Bool)?;
            let condition = match output {
                EvaluationOutput::Return(_) => return Ok(output),
                EvaluationOutput::Continue(value) => value,
            };
            if !condition.value().as_bool()? {
                return Ok(EvaluationOutput::Continue(Value::new_void(
                    trampoline.pool(),
                )));
            }
            let body_output = trampoline.bounce(&self.body, &self.body.types()[0])?;
            if let EvaluationOutput::Return(_) = body_output {
                return Ok(body_output);
            }
        }
    }
}
