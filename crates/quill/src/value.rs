//! The tagged runtime container for all VM values.

use std::{any::Any, fmt, rc::Rc};

use crate::{
    error::{RunError, RunResult},
    gc::{Expand, ObjectMetadata, Pool, Root},
    number::Number,
    trampoline::Trampoline,
    types::{Identifier, ObjectName, PurityType, Type},
};

/// The body of a callable value. Receives the argument vector (already
/// promoted to the callable's input types) and the trampoline.
pub type Callback = Rc<dyn Fn(Vec<Root<Value>>, &mut Trampoline) -> RunResult<Root<Value>>>;

/// Per-value callback returning the GC-visible references the value retains
/// (a closure's captured environment, an object's instance state).
pub type ExpandCallback = Box<dyn Fn() -> Vec<Rc<ObjectMetadata>>>;

enum Repr {
    Void,
    Bool(bool),
    Number(Number),
    Str(String),
    Symbol(Identifier),
    Object(Rc<dyn Any>),
    Callable(Callback),
}

/// A runtime value. Values are immutable once constructed and always live
/// in the GC pool; host code holds them through [`Root`] handles.
pub struct Value {
    vm_type: Type,
    repr: Repr,
    expand_callback: Option<ExpandCallback>,
}


impl Value {
    pub fn new_void(pool: &Pool) -> Root<Self> {
        pool.new_root(Self {
            vm_type: Type::Void,
            repr: Repr::Void,
            expand_callback: None,
        })
    }

    pub fn new_bool(pool: &Pool, value: bool) -> Root<Self> {
        pool.new_root(Self {
            vm_type: Type::Bool,
            repr: Repr::Bool(value),
            expand_callback: None,
        })
    }

    pub fn new_number(pool: &Pool, value: Number) -> Root<Self> {
        pool.new_root(Self {
            vm_type: Type::Number,
            repr: Repr::Number(value),
            expand_callback: None,
        })
    }

    pub fn new_string(pool: &Pool, value: impl Into<String>) -> Root<Self> {
        pool.new_root(Self {
            vm_type: Type::String,
            repr: Repr::Str(value.into()),
            expand_callback: None,
        })
    }

    pub fn new_symbol(pool: &Pool, value: Identifier) -> Root<Self> {
        pool.new_root(Self {
            vm_type: Type::Symbol,
            repr: Repr::Symbol(value),
            expand_callback: None,
        })
    }

    /// Wraps host data in an object value of the named type. Types whose
    /// data retains GC references must use [`Value::new_object_with_expand`].
    pub fn new_object(pool: &Pool, name: ObjectName, data: Rc<dyn Any>) -> Root<Self> {
        pool.new_root(Self {
            vm_type: Type::Object(name),
            repr: Repr::Object(data),
            expand_callback: None,
        })
    }

    pub fn new_object_with_expand(
        pool: &Pool,
        name: ObjectName,
        data: Rc<dyn Any>,
        expand_callback: impl Fn() -> Vec<Rc<ObjectMetadata>> + 'static,
    ) -> Root<Self> {
        pool.new_root(Self {
            vm_type: Type::Object(name),
            repr: Repr::Object(data),
            expand_callback: Some(Box::new(expand_callback)),
        })
    }

    pub fn new_function(
        pool: &Pool,
        purity: PurityType,
        output: Type,
        inputs: Vec<Type>,
        callback: impl Fn(Vec<Root<Self>>, &mut Trampoline) -> RunResult<Root<Self>> + 'static,
    ) -> Root<Self> {
        pool.new_root(Self {
            vm_type: Type::function(output, inputs, purity),
            repr: Repr::Callable(Rc::new(callback)),
            expand_callback: None,
        })
    }

    /// Like [`Value::new_function`] for callables that retain GC references
    /// (closures capturing an environment, bound methods holding their
    /// receiver).
    pub fn new_function_with_expand(
        pool: &Pool,
        purity: PurityType,
        output: Type,
        inputs: Vec<Type>,
        callback: impl Fn(Vec<Root<Self>>, &mut Trampoline) -> RunResult<Root<Self>> + 'static,
        expand_callback: impl Fn() -> Vec<Rc<ObjectMetadata>> + 'static,
    ) -> Root<Self> {
        pool.new_root(Self {
            vm_type: Type::function(output, inputs, purity),
            repr: Repr::Callable(Rc::new(callback)),
            expand_callback: Some(Box::new(expand_callback)),
        })
    }

    pub fn vm_type(&self) -> &Type {
        &self.vm_type
    }

    pub fn is_void(&self) -> bool {
        matches!(self.repr, Repr::Void)
    }

    pub fn is_function(&self) -> bool {
        matches!(self.repr, Repr::Callable(_))
    }

    pub fn as_bool(&self) -> RunResult<bool> {
        match &self.repr {
            Repr::Bool(value) => Ok(*value),
            _ => Err(RunError::Native(format!(
                "expected bool, found {}",
                self.vm_type
            ))),
        }
    }

    pub fn as_number(&self) -> RunResult<&Number> {
        match &self.repr {
            Repr::Number(value) => Ok(value),
            _ => Err(RunError::Native(format!(
                "expected number, found {}",
                self.vm_type
            ))),
        }
    }

    pub fn as_str(&self) -> RunResult<&str> {
        match &self.repr {
            Repr::Str(value) => Ok(value),
            _ => Err(RunError::Native(format!(
                "expected string, found {}",
                self.vm_type
            ))),
        }
    }

    pub fn as_symbol(&self) -> RunResult<&Identifier> {
        match &self.repr {
            Repr::Symbol(value) => Ok(value),
            _ => Err(RunError::Native(format!(
                "expected symbol, found {}",
                self.vm_type
            ))),
        }
    }

    /// Extracts the host data of an object value.
    ///
    /// # Panics
    /// Panics when the value is not an object of the expected type; after a
    /// successful compilation the type system guarantees it is.
    pub fn get_user_value<T: 'static>(&self, expected: &ObjectName) -> Rc<T> {
        assert_eq!(
            self.vm_type.object_name(),
            *expected,
            "user value type mismatch"
        );
        match &self.repr {
            Repr::Object(data) => data
                .clone()
                .downcast::<T>()
                .expect("user value host type mismatch"),
            _ => panic!("get_user_value on non-object value of type {}", self.vm_type),
        }
    }

    /// Returns the invokable body of a function value.
    pub fn lock_callback(&self) -> Option<Callback> {
        match &self.repr {
            Repr::Callable(callback) => Some(callback.clone()),
            _ => None,
        }
    }

    /// Identity comparison for object values.
    pub fn object_is(&self, other: &Self) -> bool {
        match (&self.repr, &other.repr) {
            (Repr::Object(a), Repr::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Expand for Value {
    fn expand(&self) -> Vec<Rc<ObjectMetadata>> {
        self.expand_callback
            .as_ref()
            .map(|callback| callback())
            .unwrap_or_default()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Void => f.write_str("void"),
            Repr::Bool(value) => write!(f, "{value}"),
            Repr::Number(value) => write!(f, "{value}"),
            Repr::Str(value) => write!(f, "{value:?}"),
            Repr::Symbol(value) => write!(f, "{value}"),
            Repr::Object(_) | Repr::Callable(_) => write!(f, "<{}>", self.vm_type),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({self})")
    }
}
