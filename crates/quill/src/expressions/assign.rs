//! Definitions and assignments.
//!
//! `TYPE name = expr;` defines in the current scope; `name = expr` assigns
//! in the defining scope, walking parents. `TYPE name;` declares a typed
//! slot with no value yet (reads before the first assignment fail at
//! evaluation). `auto` infers the declared type from the initialiser.

use std::rc::Rc;

use crate::{
    compile::Compilation,
    environment::VariableScope,
    error::RunResult,
    expressions::{EvaluationOutput, Expression, ReturnTypes},
    trampoline::Trampoline,
    types::{Identifier, PurityType, Type, combine_purity, types_to_string},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentType {
    Define,
    Assign,
}

#[derive(Debug)]
pub struct AssignExpression {
    assignment_type: AssignmentType,
    symbol: Identifier,
    purity: PurityType,
    /// The declared (or matched) type of the target slot; the value is
    /// evaluated against it so the right overload and promotion apply.
    target_type: Type,
    value: Rc<Expression>,
}

impl AssignExpression {
    pub fn types(&self) -> Vec<Type> {
        self.value.types()
    }

    pub fn return_types(&self) -> ReturnTypes {
        self.value.return_types()
    }

    pub fn purity(&self) -> PurityType {
        self.purity
    }

    pub fn evaluate(
        &self,
        trampoline: &mut Trampoline,
        _expected_type: &Type,
    ) -> RunResult<EvaluationOutput> {
        let output = trampoline.bounce(&self.value, &self.target_type)?;
        match output {
            EvaluationOutput::Return(_) => Ok(output),
            EvaluationOutput::Continue(value) => {
                let environment = trampoline.environment().clone();
                match self.assignment_type {
                    AssignmentType::Define => {
                        environment.value().define(self.symbol.clone(), &value);
                    }
                    AssignmentType::Assign => {
                        environment.value().assign(&self.symbol, &value);
                    }
                }
                Ok(EvaluationOutput::Continue(value))
            }
        }
    }
}

/// A bare `TYPE name;` declaration: creates an empty typed slot in the
/// current scope at evaluation time (class bodies rely on this so that the
/// synthesised setters find the member's slot in the instance scope).
#[derive(Debug)]
pub struct DeclareExpression {
    symbol: Identifier,
    vm_type: Type,
}

impl DeclareExpression {
    pub fn types(&self) -> Vec<Type> {
        vec![Type::Void]
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
        _expected_type: &Type,
    ) -> RunResult<EvaluationOutput> {
        let environment = trampoline.environment().clone();
        environment
            .value()
            .define_uninitialized(self.symbol.clone(), self.vm_type.clone());
        Ok(EvaluationOutput::Continue(Value::new_void(trampoline.pool())))
    }
}

/// Resolves the declared type of a definition (following `auto` to
/// `default_type`) and records the placeholder in the compilation
/// environment so later code sees the symbol.
pub fn new_define_type(
    compilation: &mut Compilation,
    type_name: &Identifier,
    symbol: &Identifier,
    default_type: Option<Type>,
) -> Option<Type> {
    let vm_type = if type_name.as_str() == "auto" {
        match default_type {
            Some(vm_type) => vm_type,
            None => {
                compilation.add_error("Unable to deduce type.");
                return None;
            }
        }
    } else {
        match compilation.environment.value().lookup_type(type_name) {
            Some(vm_type) => vm_type,
            None => {
                compilation.add_error(format!(
                    "Unknown type: `{type_name}` for symbol `{symbol}`."
                ));
                return None;
            }
        }
    };
    compilation
        .environment
        .value()
        .define_uninitialized(symbol.clone(), vm_type.clone());
    Some(vm_type)
}

pub fn new_define_expression(
    compilation: &mut Compilation,
    type_name: &Identifier,
    symbol: Identifier,
    value: Rc<Expression>,
) -> Option<Expression> {
    let default_type = if type_name.as_str() == "auto" {
        let types = value.types();
        if types.len() != 1 {
            compilation.add_error(format!("Unable to deduce type for symbol: `{symbol}`."));
            return None;
        }
        Some(types[0].clone())
    } else {
        None
    };
    let vm_type = new_define_type(compilation, type_name, &symbol, default_type)?;
    if !value.supports_type(&vm_type) {
        compilation.add_error(format!(
            "Unable to assign a value to a variable of type \"{vm_type}\". Value types: {}",
            types_to_string(&value.types())
        ));
        return None;
    }
    let purity = value.purity();
    Some(Expression::Assign(AssignExpression {
        assignment_type: AssignmentType::Define,
        symbol,
        purity,
        target_type: vm_type,
        value,
    }))
}

pub fn new_declare_expression(
    compilation: &mut Compilation,
    type_name: &Identifier,
    symbol: Identifier,
) -> Option<Expression> {
    let vm_type = new_define_type(compilation, type_name, &symbol, None)?;
    Some(Expression::Declare(DeclareExpression { symbol, vm_type }))
}

/// Binds a compiled function definition to its name. The declared type is
/// the lambda's own type, so no further checking is needed here.
pub fn define_function_binding(symbol: Identifier, value: Rc<Expression>) -> Expression {
    let target_type = value.types()[0].clone();
    Expression::Assign(AssignExpression {
        assignment_type: AssignmentType::Define,
        symbol,
        purity: value.purity(),
        target_type,
        value,
    })
}

pub fn new_assign_expression(
    compilation: &mut Compilation,
    symbol: Identifier,
    value: Rc<Expression>,
) -> Option<Expression> {
    let environment = compilation.environment.clone();
    let candidates = environment
        .value()
        .poly_lookup(&crate::types::Namespace::empty(), &symbol);
    if candidates.is_empty() {
        compilation.add_error(format!("Variable not found: \"{symbol}\""));
        return None;
    }
    let matched = candidates
        .iter()
        .find(|candidate| value.supports_type(&candidate.vm_type));
    match matched {
        Some(candidate) => {
            let scope_purity = match candidate.scope {
                VariableScope::Local => PurityType::PURE,
                VariableScope::Global => PurityType {
                    reads_external_inputs: false,
                    writes_external_outputs: true,
                },
            };
            Some(Expression::Assign(AssignExpression {
                assignment_type: AssignmentType::Assign,
                symbol,
                purity: combine_purity([scope_purity, value.purity()]),
                target_type: candidate.vm_type.clone(),
                value,
            }))
        }
        None => {
            compilation.add_error(format!(
                "Unable to assign a value to a variable supporting types: {}. Value types: {}",
                types_to_string(candidates.iter().map(|c| &c.vm_type)),
                types_to_string(&value.types())
            ));
            None
        }
    }
}
