//! Lambdas and script function bodies.
//!
//! A lambda expression captures the parent environment pointer at
//! evaluation time; invoking the resulting function value opens a child
//! environment, binds the parameters, evaluates the body, and promotes the
//! result to the declared output type. An early `return` from the body is
//! absorbed here: the function boundary is where the flagged output turns
//! back into a plain value.

use std::{fmt, rc::Rc};

use crate::{
    environment::Environment,
    error::{RunError, RunResult},
    expressions::{EvaluationOutput, Expression, ReturnTypes},
    gc::{Pool, Root},
    trampoline::Trampoline,
    types::{FunctionType, Identifier, PromotionFn, PurityType, Type, promote, types_to_string},
    value::Value,
};

pub struct LambdaExpression {
    function_type: FunctionType,
    argument_names: Rc<Vec<Identifier>>,
    body: Rc<Expression>,
    /// Adapts the body's deduced return type to the declared output type.
    result_promotion: PromotionFn,
}

impl fmt::Debug for LambdaExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LambdaExpression")
            .field("function_type", &self.function_type)
            .field("argument_names", &self.argument_names)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

impl LambdaExpression {
    /// Validates the body against the declared signature. The signature's
    /// purity is replaced by the body's actual purity.
    pub fn new(
        mut function_type: FunctionType,
        argument_names: Rc<Vec<Identifier>>,
        body: Rc<Expression>,
    ) -> Result<Self, String> {
        function_type.purity = body.purity();
        let mut deduced: ReturnTypes = body.return_types();
        if deduced.is_empty() {
            deduced.insert(Type::Void);
        }
        if deduced.len() > 1 {
            return Err(format!(
                "Found multiple return types: {}",
                types_to_string(deduced.iter())
            ));
        }
        let deduced = deduced.into_iter().next().expect("checked non-empty");
        let result_promotion = promote(&deduced, &function_type.output).ok_or_else(|| {
            format!(
                "Expected a return type of \"{}\" but found \"{deduced}\".",
                function_type.output
            )
        })?;
        Ok(Self {
            function_type,
            argument_names,
            body,
            result_promotion,
        })
    }

    pub fn types(&self) -> Vec<Type> {
        vec![Type::Function(self.function_type.clone())]
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
        let own_type = Type::Function(self.function_type.clone());
        let promotion = promote(&own_type, expected_type).ok_or_else(|| {
            RunError::Internal(format!(
                "lambda of type {own_type} evaluated as {expected_type}"
            ))
        })?;
        let environment = trampoline.environment().clone();
        let value = self.build_value(trampoline.pool(), &environment);
        Ok(EvaluationOutput::Continue(promotion(
            trampoline.pool(),
            value,
        )))
    }

    /// Builds the function value, capturing `parent_environment`.
    pub fn build_value(&self, pool: &Pool, parent_environment: &Root<Environment>) -> Root<Value> {
        let parent = parent_environment.ptr();
        let parent_for_expand = parent.clone();
        let argument_names = self.argument_names.clone();
        let body = self.body.clone();
        let result_promotion = self.result_promotion.clone();
        Value::new_function_with_expand(
            pool,
            self.function_type.purity,
            (*self.function_type.output).clone(),
            self.function_type.inputs.clone(),
            move |args, trampoline: &mut Trampoline| {
                assert_eq!(
                    args.len(),
                    argument_names.len(),
                    "invalid number of arguments for function"
                );
                let environment = Environment::new_child(parent.clone());
                for (name, arg) in argument_names.iter().zip(&args) {
                    environment.value().define(name.clone(), arg);
                }
                let original_environment = trampoline.environment().clone();
                trampoline.set_environment(environment);
                let result = trampoline.bounce(&body, &body.types()[0]);
                trampoline.set_environment(original_environment);
                let output = result?;
                Ok(result_promotion(trampoline.pool(), output.value()))
            },
            move || vec![parent_for_expand.object_metadata()],
        )
    }
}
