//! Function calls.
//!
//! The callee is evaluated against the function type implied by the call
//! site (expected output, the arguments' primary types, the combined
//! purity), which is what selects among overloads; arguments are then
//! evaluated strictly left-to-right and the callable invoked.

use std::rc::Rc;

use crate::{
    compile::Compilation,
    error::{RunError, RunResult},
    expressions::{EvaluationOutput, Expression, ReturnTypes},
    trampoline::Trampoline,
    types::{PurityType, Type, combine_purity, types_to_string},
};

#[derive(Debug)]
pub struct FunctionCall {
    func: Rc<Expression>,
    args: Vec<Rc<Expression>>,
    types: Vec<Type>,
}

fn check_function_arguments(vm_type: &Type, args: &[Rc<Expression>]) -> Result<(), String> {
    let Some(function_type) = vm_type.as_function() else {
        return Err(format!("Expected function but found: `{vm_type}`."));
    };
    if function_type.inputs.len() != args.len() {
        return Err(format!(
            "Invalid number of arguments: Expected {} but found {}",
            function_type.inputs.len(),
            args.len()
        ));
    }
    for (index, (input, arg)) in function_type.inputs.iter().zip(args).enumerate() {
        if !arg.supports_type(input) {
            return Err(format!(
                "Type mismatch in argument {index}: Expected {} but found {}",
                types_to_string([input]),
                types_to_string(&arg.types())
            ));
        }
    }
    Ok(())
}

fn deduce_types(func: &Expression, args: &[Rc<Expression>]) -> Vec<Type> {
    let mut output = Vec::new();
    for vm_type in func.types() {
        if check_function_arguments(&vm_type, args).is_ok() {
            let function_type = vm_type.as_function().expect("checked above");
            if !output.contains(&*function_type.output) {
                output.push((*function_type.output).clone());
            }
        }
    }
    output
}

pub fn new_function_call(
    compilation: &mut Compilation,
    func: Rc<Expression>,
    args: Vec<Rc<Expression>>,
) -> Option<Expression> {
    let mut errors = Vec::new();
    for vm_type in func.types() {
        match check_function_arguments(&vm_type, &args) {
            Ok(()) => {
                let types = deduce_types(&func, &args);
                return Some(Expression::Call(FunctionCall { func, args, types }));
            }
            Err(error) => errors.push(error),
        }
    }
    compilation.add_error(errors.join(", "));
    None
}

impl FunctionCall {
    pub fn types(&self) -> Vec<Type> {
        self.types.clone()
    }

    pub fn return_types(&self) -> ReturnTypes {
        ReturnTypes::new()
    }

    pub fn purity(&self) -> PurityType {
        let mut output = self.func.purity();
        for arg in &self.args {
            output = output.combine(arg.purity());
        }
        for vm_type in self.func.types() {
            if let Some(function_type) = vm_type.as_function() {
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
        // Evaluate the callee against the call-site function type; this is
        // where the overload is chosen, so argument evaluation below already
        // sees the selected definition's input types.
        let type_inputs: Vec<Type> = self.args.iter().map(|arg| arg.types()[0].clone()).collect();
        let callee_type = Type::function(expected_type.clone(), type_inputs, self.purity());
        let output = trampoline.bounce(&self.func, &callee_type)?;
        let callee = match output {
            EvaluationOutput::Return(_) => return Ok(output),
            EvaluationOutput::Continue(value) => value,
        };
        let callback = callee.value().lock_callback().ok_or_else(|| {
            RunError::Internal(format!(
                "call target is not a function: {}",
                callee.value().vm_type()
            ))
        })?;

        let mut values = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            let arg_output = trampoline.bounce(arg, &arg.types()[0])?;
            match arg_output {
                EvaluationOutput::Return(_) => return Ok(arg_output),
                EvaluationOutput::Continue(value) => values.push(value),
            }
        }
        trampoline.trace_call(None);
        let result = callback(values, trampoline)?;
        Ok(EvaluationOutput::Continue(result))
    }
}
