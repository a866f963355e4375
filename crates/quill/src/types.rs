//! Identifiers, types, purity, implicit promotions and object types.

use std::{cell::RefCell, fmt, rc::Rc};

use crate::{
    gc::{Expand, ObjectMetadata, Pool, Ptr, Root},
    value::Value,
};

/// A single VM identifier (e.g. `Buffer` or `lib`): a non-empty run of
/// alphanumeric characters and underscores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        debug_assert!(
            !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_'),
            "invalid identifier: {name:?}"
        );
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A namespace: the (possibly empty) sequence of identifiers prefixing a
/// symbol reference. `lib::zk::Today` is the symbol `Today` in the namespace
/// `lib::zk`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Namespace(pub Vec<Identifier>);

impl Namespace {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Identifier> {
        self.0.iter()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, part) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("::")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

/// The name of a user-defined or host-registered object type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectName(String);

impl ObjectName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&Identifier> for ObjectName {
    fn from(identifier: &Identifier) -> Self {
        Self(identifier.as_str().to_owned())
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether an expression reads or writes state outside the evaluation.
///
/// Purity is attached to expressions and function values and propagates
/// bottom-up through [`combine_purity`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PurityType {
    pub reads_external_inputs: bool,
    pub writes_external_outputs: bool,
}

impl PurityType {
    /// Neither reads nor writes external state.
    pub const PURE: Self = Self {
        reads_external_inputs: false,
        writes_external_outputs: false,
    };
    /// Reads external state but does not write it.
    pub const READER: Self = Self {
        reads_external_inputs: true,
        writes_external_outputs: false,
    };
    /// May read and write external state.
    pub const UNKNOWN: Self = Self {
        reads_external_inputs: true,
        writes_external_outputs: true,
    };

    /// Pointwise OR.
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        Self {
            reads_external_inputs: self.reads_external_inputs || other.reads_external_inputs,
            writes_external_outputs: self.writes_external_outputs || other.writes_external_outputs,
        }
    }

    /// Whether `self` performs no effect that `other` does not allow.
    #[must_use]
    pub fn subsumed_by(self, other: Self) -> bool {
        (!self.reads_external_inputs || other.reads_external_inputs)
            && (!self.writes_external_outputs || other.writes_external_outputs)
    }
}

impl fmt::Display for PurityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.reads_external_inputs, self.writes_external_outputs) {
            (false, false) => f.write_str("pure"),
            (true, false) => f.write_str("reader"),
            _ => f.write_str("unknown"),
        }
    }
}

/// Purity of an expression that depends on all of `purities`.
pub fn combine_purity(purities: impl IntoIterator<Item = PurityType>) -> PurityType {
    purities
        .into_iter()
        .fold(PurityType::PURE, PurityType::combine)
}

/// The signature of a function type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub output: Box<Type>,
    pub inputs: Vec<Type>,
    pub purity: PurityType,
}

/// A VM type. Equality is structural; every value carries exactly one type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Bool,
    Number,
    String,
    Symbol,
    Object(ObjectName),
    Function(FunctionType),
}

impl Type {
    pub fn function(output: Type, inputs: Vec<Type>, purity: PurityType) -> Self {
        Self::Function(FunctionType {
            output: Box::new(output),
            inputs,
            purity,
        })
    }

    pub fn as_function(&self) -> Option<&FunctionType> {
        match self {
            Self::Function(function_type) => Some(function_type),
            _ => None,
        }
    }

    /// The object-type-registry name for this type; primitive types register
    /// their methods under their keyword name.
    pub fn object_name(&self) -> ObjectName {
        match self {
            Self::Void => ObjectName::new("void"),
            Self::Bool => ObjectName::new("bool"),
            Self::Number => ObjectName::new("number"),
            Self::String => ObjectName::new("string"),
            Self::Symbol => ObjectName::new("symbol"),
            Self::Object(name) => name.clone(),
            Self::Function(_) => ObjectName::new("function"),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Bool => f.write_str("bool"),
            Self::Number => f.write_str("number"),
            Self::String => f.write_str("string"),
            Self::Symbol => f.write_str("symbol"),
            Self::Object(name) => write!(f, "{name}"),
            Self::Function(function_type) => {
                write!(f, "function<{}(", function_type.output)?;
                for (index, input) in function_type.inputs.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{input}")?;
                }
                f.write_str(")>")
            }
        }
    }
}

/// Quoted, comma-separated rendering of a type list, for diagnostics.
pub fn types_to_string<'a>(types: impl IntoIterator<Item = &'a Type>) -> String {
    let mut output = String::new();
    for (index, t) in types.into_iter().enumerate() {
        if index > 0 {
            output.push_str(", ");
        }
        output.push('"');
        output.push_str(&t.to_string());
        output.push('"');
    }
    output
}

/// A compile-time-selected value transformation applied to adapt a value of
/// a source type to an expected type.
pub type PromotionFn = Rc<dyn Fn(&Pool, Root<Value>) -> Root<Value>>;

/// Returns the implicit promotion from `source` to `target`, if one exists.
///
/// Promotions are: the identity on every type, and function-to-function
/// promotion when arities match, each target input promotes to the
/// corresponding source input (contravariant), the source output promotes to
/// the target output, and the source's purity performs no effect the target
/// disallows. The function promoter wraps the callable so that input and
/// output promotions apply lazily at call time.
pub fn promote(source: &Type, target: &Type) -> Option<PromotionFn> {
    if source == target {
        return Some(Rc::new(|_pool, value| value));
    }
    let (Type::Function(source_fn), Type::Function(target_fn)) = (source, target) else {
        return None;
    };
    if source_fn.inputs.len() != target_fn.inputs.len() {
        return None;
    }
    if !source_fn.purity.subsumed_by(target_fn.purity) {
        return None;
    }
    let input_promotions: Vec<PromotionFn> = target_fn
        .inputs
        .iter()
        .zip(&source_fn.inputs)
        .map(|(target_input, source_input)| promote(target_input, source_input))
        .collect::<Option<_>>()?;
    let output_promotion = promote(&source_fn.output, &target_fn.output)?;
    let target_fn = target_fn.clone();
    Some(Rc::new(move |pool, value| {
        let callback = value
            .value()
            .lock_callback()
            .expect("promoted a non-function value");
        let input_promotions = input_promotions.clone();
        let output_promotion = output_promotion.clone();
        Value::new_function_with_expand(
            pool,
            target_fn.purity,
            (*target_fn.output).clone(),
            target_fn.inputs.clone(),
            {
                let output_promotion = output_promotion.clone();
                move |args: Vec<Root<Value>>, trampoline: &mut crate::trampoline::Trampoline| {
                    let args = args
                        .into_iter()
                        .zip(&input_promotions)
                        .map(|(arg, promotion)| promotion(trampoline.pool(), arg))
                        .collect();
                    let result = callback(args, trampoline)?;
                    Ok(output_promotion(trampoline.pool(), result))
                }
            },
            {
                let inner = value.ptr();
                move || vec![inner.object_metadata()]
            },
        )
    }))
}

/// The description of an object type: its type plus a multimap from field
/// name to field functions. Field functions take the instance as their first
/// positional input; several fields may share a name with distinct types.
pub struct ObjectType {
    vm_type: Type,
    fields: RefCell<Vec<(Identifier, Ptr<Value>)>>,
}

impl ObjectType {
    pub fn new(pool: &Pool, vm_type: Type) -> Root<Self> {
        pool.new_root(Self {
            vm_type,
            fields: RefCell::new(Vec::new()),
        })
    }

    pub fn vm_type(&self) -> &Type {
        &self.vm_type
    }

    pub fn add_field(&self, name: Identifier, field: Ptr<Value>) {
        field.protect();
        self.fields.borrow_mut().push((name, field));
    }

    /// All field functions registered under `name`, in registration order.
    pub fn lookup_field(&self, name: &Identifier) -> Vec<Ptr<Value>> {
        self.fields
            .borrow()
            .iter()
            .filter(|(field_name, _)| field_name == name)
            .map(|(_, field)| field.clone())
            .collect()
    }

    pub fn for_each_field(&self, mut callback: impl FnMut(&Identifier, &Value)) {
        for (name, field) in self.fields.borrow().iter() {
            callback(name, &field.value());
        }
    }
}

impl fmt::Debug for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectType")
            .field("type", &self.vm_type)
            .finish()
    }
}

impl Expand for ObjectType {
    fn expand(&self) -> Vec<Rc<ObjectMetadata>> {
        self.fields
            .borrow()
            .iter()
            .map(|(_, field)| field.object_metadata())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purity_combine_is_pointwise_or() {
        assert_eq!(
            combine_purity([PurityType::PURE, PurityType::READER]),
            PurityType::READER
        );
        assert_eq!(
            combine_purity([PurityType::READER, PurityType::UNKNOWN]),
            PurityType::UNKNOWN
        );
        assert_eq!(combine_purity([]), PurityType::PURE);
    }

    #[test]
    fn promotion_identity_exists_for_all_types() {
        for t in [
            Type::Void,
            Type::Bool,
            Type::Number,
            Type::String,
            Type::Symbol,
            Type::Object(ObjectName::new("Buffer")),
        ] {
            assert!(promote(&t, &t).is_some(), "missing identity for {t}");
        }
    }

    #[test]
    fn no_promotion_between_distinct_primitives() {
        assert!(promote(&Type::String, &Type::Number).is_none());
        assert!(promote(&Type::Number, &Type::Bool).is_none());
    }

    #[test]
    fn function_promotion_requires_matching_output() {
        let inputs = vec![Type::String, Type::Bool];
        let source = Type::function(Type::Number, inputs.clone(), PurityType::PURE);
        let target = Type::function(Type::String, inputs, PurityType::PURE);
        assert!(promote(&source, &target).is_none());
    }

    #[test]
    fn function_promotion_never_gains_effects() {
        let pure_fn = Type::function(Type::Void, vec![], PurityType::PURE);
        let unknown_fn = Type::function(Type::Void, vec![], PurityType::UNKNOWN);
        assert!(promote(&pure_fn, &unknown_fn).is_some());
        assert!(promote(&unknown_fn, &pure_fn).is_none());
    }

    #[test]
    fn promotions_compose() {
        // Whenever a->b and b->c exist, a->c must exist too.
        let a = Type::function(Type::Number, vec![Type::String], PurityType::PURE);
        let b = Type::function(Type::Number, vec![Type::String], PurityType::READER);
        let c = Type::function(Type::Number, vec![Type::String], PurityType::UNKNOWN);
        assert!(promote(&a, &b).is_some());
        assert!(promote(&b, &c).is_some());
        assert!(promote(&a, &c).is_some());
    }
}
