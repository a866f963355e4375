//! Statement sequencing: evaluate the first, then the second, yielding the
//! second's value. An early `return` in the first skips the second.

use std::rc::Rc;

use crate::{
    compile::Compilation,
    error::RunResult,
    expressions::{
        EvaluationOutput, Expression, ReturnTypes, combine_return_types,
    },
    trampoline::Trampoline,
    types::{PurityType, Type, combine_purity},
};

#[derive(Debug)]
pub struct AppendExpression {
    e0: Rc<Expression>,
    e1: Rc<Expression>,
    return_types: ReturnTypes,
}

pub fn new_append_expression(
    compilation: &mut Compilation,
    e0: Rc<Expression>,
    e1: Rc<Expression>,
) -> Option<Expression> {
    let return_types = compilation
        .register_errors(combine_return_types(e0.return_types(), e1.return_types()))?;
    Some(Expression::Append(AppendExpression {
        e0,
        e1,
        return_types,
    }))
}

impl AppendExpression {
    pub fn types(&self) -> Vec<Type> {
        self.e1.types()
    }

    pub fn return_types(&self) -> ReturnTypes {
        self.return_types.clone()
    }

    pub fn purity(&self) -> PurityType {
        combine_purity([self.e0.purity(), self.e1.purity()])
    }

    /// Walks the whole chain iteratively: statement sequences compile to
    /// right-leaning append chains, and evaluating them must not consume
    /// stack proportional to the program's length.
    pub fn evaluate(
        &self,
        trampoline: &mut Trampoline,
        _expected_type: &Type,
    ) -> RunResult<EvaluationOutput> {
        let mut current = self;
        loop {
            let output = trampoline.bounce(&current.e0, &current.e0.types()[0])?;
            if let EvaluationOutput::Return(_) = output {
                return Ok(output);
            }
            match &*current.e1 {
                Expression::Append(next) => current = next,
                _ => return trampoline.bounce(&current.e1, &current.e1.types()[0]),
            }
        }
    }
}
