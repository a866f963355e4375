//! Unary `!` on bools and `-` on numbers.

use std::rc::Rc;

use crate::{
    compile::Compilation,
    error::RunResult,
    expressions::{EvaluationOutput, Expression, ReturnTypes},
    trampoline::Trampoline,
    types::{PurityType, Type, types_to_string},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegateKind {
    Bool,
    Number,
}

impl NegateKind {
    fn vm_type(self) -> Type {
        match self {
            Self::Bool => Type::Bool,
            Self::Number => Type::Number,
        }
    }
}

#[derive(Debug)]
pub struct NegateExpression {
    kind: NegateKind,
    expr: Rc<Expression>,
}

fn new_negate_expression(
    compilation: &mut Compilation,
    kind: NegateKind,
    expr: Rc<Expression>,
) -> Option<Expression> {
    if !expr.supports_type(&kind.vm_type()) {
        compilation.add_error(format!(
            "Can't negate an expression of type: {}",
            types_to_string(&expr.types())
        ));
        return None;
    }
    Some(Expression::Negate(NegateExpression { kind, expr }))
}

pub fn new_negate_expression_bool(
    compilation: &mut Compilation,
    expr: Rc<Expression>,
) -> Option<Expression> {
    new_negate_expression(compilation, NegateKind::Bool, expr)
}

pub fn new_negate_expression_number(
    compilation: &mut Compilation,
    expr: Rc<Expression>,
) -> Option<Expression> {
    new_negate_expression(compilation, NegateKind::Number, expr)
}

impl NegateExpression {
    pub fn types(&self) -> Vec<Type> {
        vec![self.kind.vm_type()]
    }

    pub fn return_types(&self) -> ReturnTypes {
        self.expr.return_types()
    }

    pub fn purity(&self) -> PurityType {
        self.expr.purity()
    }

    pub fn evaluate(
        &self,
        trampoline: &mut Trampoline,
        _expected_type: &Type,
    ) -> RunResult<EvaluationOutput> {
        let output = trampoline.bounce(&self.expr, &self.kind.vm_type())?;
        let value = match output {
            EvaluationOutput::Return(_) => return Ok(output),
            EvaluationOutput::Continue(value) => value,
        };
        let negated = match self.kind {
            NegateKind::Bool => Value::new_bool(trampoline.pool(), !value.value().as_bool()?),
            NegateKind::Number => {
                Value::new_number(trampoline.pool(), -&value.value().as_number()?.clone())
            }
        };
        Ok(EvaluationOutput::Continue(negated))
    }
}
