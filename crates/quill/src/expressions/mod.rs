//! The typed expression tree and its evaluation contract.
//!
//! Expressions form a tagged enum with one module per syntactic form. Each
//! variant answers: `types()` (the set of result types it can produce —
//! more than one when it denotes an overloaded symbol), `return_types()`
//! (the types an inner `return` may surface), `purity()`, and
//! `evaluate(trampoline, expected_type)`, where `expected_type` is the
//! contextual narrowing chosen by the parent expression.

pub mod append;
pub mod assign;
pub mod binary;
pub mod call;
pub mod class_expr;
pub mod constant;
pub mod if_expr;
pub mod lambda;
pub mod logical;
pub mod method;
pub mod namespace_expr;
pub mod negate;
pub mod return_expr;
pub mod variable;
pub mod while_expr;

use ahash::AHashSet;

use crate::{
    error::RunResult,
    gc::Root,
    trampoline::Trampoline,
    types::{PurityType, Type, promote, types_to_string},
    value::Value,
};

/// The set of types an inner `return` may surface. A set (rather than a
/// single type) because an expression can ambiguously denote an overloaded
/// function, one definition of which is selected later by context.
pub type ReturnTypes = AHashSet<Type>;

/// The result of evaluating one expression: either a value to continue
/// with, or a value surfaced by an early `return` that propagates until a
/// function boundary (or the top level) unwraps it.
#[derive(Debug)]
pub enum EvaluationOutput {
    Continue(Root<Value>),
    Return(Root<Value>),
}

impl EvaluationOutput {
    /// Unwraps the carried value, used at boundaries that absorb `return`.
    pub fn value(self) -> Root<Value> {
        match self {
            Self::Continue(value) | Self::Return(value) => value,
        }
    }
}

/// Combines the return types of two sub-expressions: if either side is
/// empty, the other wins; otherwise the sets must agree.
pub fn combine_return_types(a: ReturnTypes, b: ReturnTypes) -> Result<ReturnTypes, String> {
    if a.is_empty() {
        return Ok(b);
    }
    if b.is_empty() {
        return Ok(a);
    }
    if a != b {
        return Err(format!(
            "Incompatible return types found: {} and {}",
            types_to_string(a.iter()),
            types_to_string(b.iter()),
        ));
    }
    Ok(a)
}

/// A compiled expression.
#[derive(Debug)]
pub enum Expression {
    Constant(constant::ConstantExpression),
    Variable(variable::VariableLookup),
    Assign(assign::AssignExpression),
    Declare(assign::DeclareExpression),
    Append(append::AppendExpression),
    Binary(binary::BinaryOperator),
    Negate(negate::NegateExpression),
    Logical(logical::LogicalExpression),
    If(if_expr::IfExpression),
    While(while_expr::WhileExpression),
    Call(call::FunctionCall),
    BindMethod(method::BindMethod),
    Lambda(lambda::LambdaExpression),
    Namespace(namespace_expr::NamespaceExpression),
    Return(return_expr::ReturnExpression),
}

impl Expression {
    /// The result types this expression supports. Non-empty for any
    /// successfully compiled expression.
    pub fn types(&self) -> Vec<Type> {
        match self {
            Self::Constant(e) => e.types(),
            Self::Variable(e) => e.types(),
            Self::Assign(e) => e.types(),
            Self::Declare(e) => e.types(),
            Self::Append(e) => e.types(),
            Self::Binary(e) => e.types(),
            Self::Negate(e) => e.types(),
            Self::Logical(e) => e.types(),
            Self::If(e) => e.types(),
            Self::While(e) => e.types(),
            Self::Call(e) => e.types(),
            Self::BindMethod(e) => e.types(),
            Self::Lambda(e) => e.types(),
            Self::Namespace(e) => e.types(),
            Self::Return(e) => e.types(),
        }
    }

    pub fn return_types(&self) -> ReturnTypes {
        match self {
            Self::Constant(e) => e.return_types(),
            Self::Variable(e) => e.return_types(),
            Self::Assign(e) => e.return_types(),
            Self::Declare(e) => e.return_types(),
            Self::Append(e) => e.return_types(),
            Self::Binary(e) => e.return_types(),
            Self::Negate(e) => e.return_types(),
            Self::Logical(e) => e.return_types(),
            Self::If(e) => e.return_types(),
            Self::While(e) => e.return_types(),
            Self::Call(e) => e.return_types(),
            Self::BindMethod(e) => e.return_types(),
            Self::Lambda(e) => e.return_types(),
            Self::Namespace(e) => e.return_types(),
            Self::Return(e) => e.return_types(),
        }
    }

    pub fn purity(&self) -> PurityType {
        match self {
            Self::Constant(e) => e.purity(),
            Self::Variable(e) => e.purity(),
            Self::Assign(e) => e.purity(),
            Self::Declare(e) => e.purity(),
            Self::Append(e) => e.purity(),
            Self::Binary(e) => e.purity(),
            Self::Negate(e) => e.purity(),
            Self::Logical(e) => e.purity(),
            Self::If(e) => e.purity(),
            Self::While(e) => e.purity(),
            Self::Call(e) => e.purity(),
            Self::BindMethod(e) => e.purity(),
            Self::Lambda(e) => e.purity(),
            Self::Namespace(e) => e.purity(),
            Self::Return(e) => e.purity(),
        }
    }

    /// Whether this expression can yield `expected`, possibly through a
    /// promotion.
    pub fn supports_type(&self, expected: &Type) -> bool {
        self.types()
            .iter()
            .any(|t| promote(t, expected).is_some())
    }

    pub fn is_bool(&self) -> bool {
        self.supports_type(&Type::Bool)
    }

    pub fn is_number(&self) -> bool {
        self.supports_type(&Type::Number)
    }

    pub fn is_string(&self) -> bool {
        self.supports_type(&Type::String)
    }

    /// Evaluates this expression. Must only be called through
    /// [`Trampoline::bounce`], which provides the resource and suspension
    /// discipline.
    pub(crate) fn evaluate(
        &self,
        trampoline: &mut Trampoline,
        expected_type: &Type,
    ) -> RunResult<EvaluationOutput> {
        match self {
            Self::Constant(e) => e.evaluate(trampoline, expected_type),
            Self::Variable(e) => e.evaluate(trampoline, expected_type),
            Self::Assign(e) => e.evaluate(trampoline, expected_type),
            Self::Declare(e) => e.evaluate(trampoline, expected_type),
            Self::Append(e) => e.evaluate(trampoline, expected_type),
            Self::Binary(e) => e.evaluate(trampoline, expected_type),
            Self::Negate(e) => e.evaluate(trampoline, expected_type),
            Self::Logical(e) => e.evaluate(trampoline, expected_type),
            Self::If(e) => e.evaluate(trampoline, expected_type),
            Self::While(e) => e.evaluate(trampoline, expected_type),
            Self::Call(e) => e.evaluate(trampoline, expected_type),
            Self::BindMethod(e) => e.evaluate(trampoline, expected_type),
            Self::Lambda(e) => e.evaluate(trampoline, expected_type),
            Self::Namespace(e) => e.evaluate(trampoline, expected_type),
            Self::Return(e) => e.evaluate(trampoline, expected_type),
        }
    }
}
