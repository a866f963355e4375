//! Method access `obj.name`.
//!
//! Compiles to a bound expression: evaluating it evaluates the receiver and
//! yields a fresh callable whose signature drops the receiver from each
//! candidate's inputs; the candidate is chosen at evaluation time by the
//! function type the call site expects.

use std::rc::Rc;

use crate::{
    compile::Compilation,
    error::{RunError, RunResult},
    expressions::{EvaluationOutput, Expression, ReturnTypes},
    gc::Root,
    trampoline::Trampoline,
    types::{Identifier, PurityType, Type, promote},
    value::Value,
};

#[derive(Debug)]
pub struct BindMethod {
    object: Rc<Expression>,
    delegates: Vec<Root<Value>>,
    /// The types this expression can deliver: each delegate's type with the
    /// receiver dropped from the inputs.
    external_types: Vec<Type>,
}

/// Keeps only candidates that match `name` up to case.
fn filter_similar_names(name: &Identifier, candidates: Vec<Identifier>) -> Vec<Identifier> {
    candidates
        .into_iter()
        .filter(|candidate| candidate.as_str().eq_ignore_ascii_case(name.as_str()))
        .collect()
}

fn remove_receiver(vm_type: &Type) -> Type {
    let function_type = vm_type
        .as_function()
        .expect("object fields hold function values");
    let mut function_type = function_type.clone();
    function_type.inputs.remove(0);
    Type::Function(function_type)
}

pub fn new_method_lookup(
    compilation: &mut Compilation,
    object: Rc<Expression>,
    method_name: Identifier,
) -> Option<Expression> {
    let environment = compilation.environment.clone();
    let mut errors = Vec::new();
    for vm_type in object.types() {
        let object_type_name = vm_type.object_name();
        let Some(object_type) = environment.value().lookup_object_type(&object_type_name) else {
            errors.push(format!("Unknown type: \"{vm_type}\""));
            continue;
        };
        let fields = object_type.lookup_field(&method_name);
        if fields.is_empty() {
            let mut alternatives = Vec::new();
            object_type.for_each_field(|name, _| alternatives.push(name.clone()));
            let close = filter_similar_names(&method_name, alternatives);
            let suggestion = close
                .first()
                .map(|name| format!(" (did you mean \"{name}\"?)"))
                .unwrap_or_default();
            errors.push(format!(
                "Unknown method: \"{object_type_name}::{method_name}\"{suggestion}"
            ));
            continue;
        }
        let delegates: Vec<Root<Value>> = fields.iter().map(|field| field.to_root()).collect();
        let external_types = delegates
            .iter()
            .map(|delegate| remove_receiver(delegate.value().vm_type()))
            .collect();
        return Some(Expression::BindMethod(BindMethod {
            object,
            delegates,
            external_types,
        }));
    }
    compilation.add_error(errors.join(", "));
    None
}

impl BindMethod {
    pub fn types(&self) -> Vec<Type> {
        self.external_types.clone()
    }

    pub fn return_types(&self) -> ReturnTypes {
        ReturnTypes::new()
    }

    pub fn purity(&self) -> PurityType {
        let mut output = self.object.purity();
        for external in &self.external_types {
            if let Some(function_type) = external.as_function() {
                output = output.combine(function_type.purity);
            }
        }
        output
    }

    pub fn evaluate(
        &self,
        trampoline: &mut Trampoline,
        expected_type: &Type,
    ) -> RunResult<EvaluationOutput> {
        let output = trampoline.bounce(&self.object, &self.object.types()[0])?;
        let receiver = match output {
            EvaluationOutput::Return(_) => return Ok(output),
            EvaluationOutput::Continue(value) => value,
        };
        for (delegate, external) in self.delegates.iter().zip(&self.external_types) {
            if promote(external, expected_type).is_none() {
                continue;
            }
            // Bind the receiver: a callable with the call site's expected
            // shape that inserts the receiver as the first argument.
            let target = if expected_type.as_function().is_some() {
                expected_type
            } else {
                external
            };
            let function_type = target.as_function().expect("delegate types are functions").clone();
            let callback = delegate
                .value()
                .lock_callback()
                .expect("object fields hold function values");
            let receiver_for_call = receiver.clone();
            let receiver_ptr = receiver.ptr();
            let delegate_ptr = delegate.ptr();
            let bound = Value::new_function_with_expand(
                trampoline.pool(),
                function_type.purity,
                (*function_type.output).clone(),
                function_type.inputs,
                move |mut args, trampoline: &mut Trampoline| {
                    args.insert(0, receiver_for_call.clone());
                    callback(args, trampoline)
                },
                move || {
                    vec![
                        receiver_ptr.object_metadata(),
                        delegate_ptr.object_metadata(),
                    ]
                },
            );
            return Ok(EvaluationOutput::Continue(bound));
        }
        Err(RunError::Internal(format!(
            "unable to find method delegate for expected type {expected_type}"
        )))
    }
}
