//! `namespace N { ... }` bodies: evaluation runs against the namespace's
//! environment and restores the previous environment afterwards, on both
//! success and failure.

use std::rc::Rc;

use crate::{
    compile::Compilation,
    environment::Environment,
    error::{RunError, RunResult},
    expressions::{EvaluationOutput, Expression, ReturnTypes},
    trampoline::Trampoline,
    types::{Identifier, Namespace, PurityType, Type},
};

#[derive(Debug)]
pub struct NamespaceExpression {
    namespace: Namespace,
    body: Rc<Expression>,
}

/// Enters a namespace declaration: pushes the name onto the compilation's
/// namespace stack and switches the compilation environment to the (created
/// or reopened) namespace environment.
pub fn start_namespace_declaration(compilation: &mut Compilation, name: Identifier) {
    compilation.current_namespace.0.push(name.clone());
    compilation.environment = Environment::new_namespace(&compilation.environment, name);
}

/// Closes a namespace declaration and builds the body expression.
pub fn new_namespace_expression(
    compilation: &mut Compilation,
    body: Option<Rc<Expression>>,
) -> Option<Expression> {
    let namespace = compilation.current_namespace.clone();
    compilation.current_namespace.0.pop();
    let parent = compilation
        .environment
        .value()
        .parent()
        .expect("namespace environments always have a parent");
    compilation.environment = parent.to_root();
    Some(Expression::Namespace(NamespaceExpression {
        namespace,
        body: body?,
    }))
}

impl NamespaceExpression {
    pub fn types(&self) -> Vec<Type> {
        self.body.types()
    }

    pub fn return_types(&self) -> ReturnTypes {
        self.body.return_types()
    }

    pub fn purity(&self) -> PurityType {
        self.body.purity()
    }

    pub fn evaluate(
        &self,
        trampoline: &mut Trampoline,
        expected_type: &Type,
    ) -> RunResult<EvaluationOutput> {
        let original_environment = trampoline.environment().clone();
        let namespace_environment =
            Environment::lookup_namespace(&original_environment, &self.namespace).ok_or_else(
                || {
                    RunError::Internal(format!(
                        "namespace environment missing: {}",
                        self.namespace
                    ))
                },
            )?;
        trampoline.set_environment(namespace_environment);
        let result = trampoline.bounce(&self.body, expected_type);
        trampoline.set_environment(original_environment);
        result
    }
}
