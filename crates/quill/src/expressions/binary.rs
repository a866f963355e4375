//! Binary operators: arithmetic on numbers, `+` concatenation and `*`
//! repetition on strings, comparisons on numbers and strings, equality on
//! bools, numbers, strings and objects (identity).

use std::{cmp::Ordering, fmt, rc::Rc};

use crate::{
    compile::Compilation,
    error::RunResult,
    expressions::{
        EvaluationOutput, Expression, ReturnTypes, combine_return_types,
    },
    gc::{Pool, Root},
    trampoline::Trampoline,
    types::{PurityType, Type, combine_purity, types_to_string},
    value::Value,
};

type OperatorFn = Box<dyn Fn(&Pool, &Value, &Value) -> RunResult<Root<Value>>>;

pub struct BinaryOperator {
    a: Rc<Expression>,
    b: Rc<Expression>,
    vm_type: Type,
    return_types: ReturnTypes,
    operator: OperatorFn,
}

impl fmt::Debug for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryOperator")
            .field("a", &self.a)
            .field("b", &self.b)
            .field("vm_type", &self.vm_type)
            .field("return_types", &self.return_types)
            .finish_non_exhaustive()
    }
}

impl BinaryOperator {
    fn new(
        compilation: &mut Compilation,
        a: Rc<Expression>,
        b: Rc<Expression>,
        vm_type: Type,
        operator: OperatorFn,
    ) -> Option<Expression> {
        let return_types = compilation
            .register_errors(combine_return_types(a.return_types(), b.return_types()))?;
        Some(Expression::Binary(Self {
            a,
            b,
            vm_type,
            return_types,
            operator,
        }))
    }

    pub fn types(&self) -> Vec<Type> {
        vec![self.vm_type.clone()]
    }

    pub fn return_types(&self) -> ReturnTypes {
        self.return_types.clone()
    }

    pub fn purity(&self) -> PurityType {
        combine_purity([self.a.purity(), self.b.purity()])
    }

    pub fn evaluate(
        &self,
        trampoline: &mut Trampoline,
        _expected_type: &Type,
    ) -> RunResult<EvaluationOutput> {
        let a_output = trampoline.bounce(&self.a, &self.a.types()[0])?;
        let a_value = match a_output {
            EvaluationOutput::Return(_) => return Ok(a_output),
            EvaluationOutput::Continue(value) => value,
        };
        let b_output = trampoline.bounce(&self.b, &self.b.types()[0])?;
        let b_value = match b_output {
            EvaluationOutput::Return(_) => return Ok(b_output),
            EvaluationOutput::Continue(value) => value,
        };
        let result = (self.operator)(trampoline.pool(), &a_value.value(), &b_value.value())?;
        Ok(EvaluationOutput::Continue(result))
    }
}

fn unable_to_apply(
    compilation: &mut Compilation,
    symbol: &str,
    a: &Expression,
    b: &Expression,
) -> Option<Expression> {
    compilation.add_error(format!(
        "Unable to apply operator `{symbol}` to types: {} and {}",
        types_to_string(&a.types()),
        types_to_string(&b.types())
    ));
    None
}

pub fn new_addition(
    compilation: &mut Compilation,
    a: Rc<Expression>,
    b: Rc<Expression>,
) -> Option<Expression> {
    if a.is_string() && b.is_string() {
        return BinaryOperator::new(
            compilation,
            a,
            b,
            Type::String,
            Box::new(|pool, a, b| {
                Ok(Value::new_string(
                    pool,
                    format!("{}{}", a.as_str()?, b.as_str()?),
                ))
            }),
        );
    }
    if a.is_number() && b.is_number() {
        return BinaryOperator::new(
            compilation,
            a,
            b,
            Type::Number,
            Box::new(|pool, a, b| {
                Ok(Value::new_number(pool, a.as_number()? + b.as_number()?))
            }),
        );
    }
    unable_to_apply(compilation, "+", &a, &b)
}

pub fn new_subtraction(
    compilation: &mut Compilation,
    a: Rc<Expression>,
    b: Rc<Expression>,
) -> Option<Expression> {
    if a.is_number() && b.is_number() {
        return BinaryOperator::new(
            compilation,
            a,
            b,
            Type::Number,
            Box::new(|pool, a, b| {
                Ok(Value::new_number(pool, a.as_number()? - b.as_number()?))
            }),
        );
    }
    unable_to_apply(compilation, "-", &a, &b)
}

pub fn new_multiplication(
    compilation: &mut Compilation,
    a: Rc<Expression>,
    b: Rc<Expression>,
) -> Option<Expression> {
    if a.is_number() && b.is_number() {
        return BinaryOperator::new(
            compilation,
            a,
            b,
            Type::Number,
            Box::new(|pool, a, b| {
                Ok(Value::new_number(pool, a.as_number()? * b.as_number()?))
            }),
        );
    }
    // String-by-integer repetition.
    if a.is_string() && b.is_number() {
        return BinaryOperator::new(
            compilation,
            a,
            b,
            Type::String,
            Box::new(|pool, a, b| {
                let count = b.as_number()?.to_usize()?;
                Ok(Value::new_string(pool, a.as_str()?.repeat(count)))
            }),
        );
    }
    unable_to_apply(compilation, "*", &a, &b)
}

pub fn new_division(
    compilation: &mut Compilation,
    a: Rc<Expression>,
    b: Rc<Expression>,
) -> Option<Expression> {
    if a.is_number() && b.is_number() {
        return BinaryOperator::new(
            compilation,
            a,
            b,
            Type::Number,
            Box::new(|pool, a, b| {
                let value = a.as_number()?.checked_div(b.as_number()?)?;
                Ok(Value::new_number(pool, value))
            }),
        );
    }
    unable_to_apply(compilation, "/", &a, &b)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonKind {
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
}

impl ComparisonKind {
    fn admits(self, ordering: Ordering) -> bool {
        match self {
            Self::LessThan => ordering == Ordering::Less,
            Self::LessOrEqual => ordering != Ordering::Greater,
            Self::GreaterThan => ordering == Ordering::Greater,
            Self::GreaterOrEqual => ordering != Ordering::Less,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::LessThan => "<",
            Self::LessOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterOrEqual => ">=",
        }
    }
}

/// Decimal digits honoured when comparing numbers; bounds canonicalisation.
const COMPARISON_PRECISION: usize = 128;

pub fn new_comparison(
    compilation: &mut Compilation,
    kind: ComparisonKind,
    a: Rc<Expression>,
    b: Rc<Expression>,
) -> Option<Expression> {
    if a.is_number() && b.is_number() {
        return BinaryOperator::new(
            compilation,
            a,
            b,
            Type::Bool,
            Box::new(move |pool, a, b| {
                let ordering = a
                    .as_number()?
                    .cmp_with_precision(b.as_number()?, COMPARISON_PRECISION);
                Ok(Value::new_bool(pool, kind.admits(ordering)))
            }),
        );
    }
    if a.is_string() && b.is_string() {
        return BinaryOperator::new(
            compilation,
            a,
            b,
            Type::Bool,
            Box::new(move |pool, a, b| {
                let ordering = a.as_str()?.cmp(b.as_str()?);
                Ok(Value::new_bool(pool, kind.admits(ordering)))
            }),
        );
    }
    unable_to_apply(compilation, kind.symbol(), &a, &b)
}

pub fn new_equality(
    compilation: &mut Compilation,
    negated: bool,
    a: Rc<Expression>,
    b: Rc<Expression>,
) -> Option<Expression> {
    let operator: Option<OperatorFn> = if a.is_bool() && b.is_bool() {
        Some(Box::new(move |pool, a, b| {
            Ok(Value::new_bool(pool, (a.as_bool()? == b.as_bool()?) != negated))
        }))
    } else if a.is_number() && b.is_number() {
        Some(Box::new(move |pool, a, b| {
            let equal = a
                .as_number()?
                .cmp_with_precision(b.as_number()?, COMPARISON_PRECISION)
                == Ordering::Equal;
            Ok(Value::new_bool(pool, equal != negated))
        }))
    } else if a.is_string() && b.is_string() {
        Some(Box::new(move |pool, a, b| {
            Ok(Value::new_bool(pool, (a.as_str()? == b.as_str()?) != negated))
        }))
    } else if object_types_match(&a, &b) {
        Some(Box::new(move |pool, a, b| {
            Ok(Value::new_bool(pool, a.object_is(b) != negated))
        }))
    } else {
        None
    };
    match operator {
        Some(operator) => BinaryOperator::new(compilation, a, b, Type::Bool, operator),
        None => unable_to_apply(compilation, if negated { "!=" } else { "==" }, &a, &b),
    }
}

fn object_types_match(a: &Expression, b: &Expression) -> bool {
    a.types().iter().any(|t| {
        matches!(t, Type::Object(_)) && b.types().iter().any(|u| u == t)
    })
}
