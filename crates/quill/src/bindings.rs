//! The native binding protocol: exposing host functions and types to
//! scripts.
//!
//! A [`VmType`] implementation per mappable Rust type declares the VM-side
//! type and the value conversions in both directions. [`new_callback`]
//! adapts a host `Fn` of arity 0..=4 into a function value: on invocation
//! each argument is mapped (the first failure surfaces as an evaluation
//! error), the host function runs, and the result is mapped back. Fallible
//! hosts return `RunResult<R>`.
//!
//! To expose a host object type, register an [`crate::types::ObjectType`]
//! and `add_field` callables whose first input is the object type; types
//! whose shared state retains GC references must construct their values
//! with [`Value::new_object_with_expand`] so the collector can traverse
//! them.

use crate::{
    error::{RunError, RunResult},
    gc::{Pool, Root},
    number::Number,
    trampoline::Trampoline,
    types::{Identifier, PurityType, Type},
    value::Value,
};

/// A Rust type that maps to and from VM values.
pub trait VmType: Sized + 'static {
    fn vm_type() -> Type;
    fn from_value(value: &Value) -> RunResult<Self>;
    fn into_value(self, pool: &Pool) -> Root<Value>;
}

impl VmType for bool {
    fn vm_type() -> Type {
        Type::Bool
    }

    fn from_value(value: &Value) -> RunResult<Self> {
        value.as_bool()
    }

    fn into_value(self, pool: &Pool) -> Root<Value> {
        Value::new_bool(pool, self)
    }
}

impl VmType for Number {
    fn vm_type() -> Type {
        Type::Number
    }

    fn from_value(value: &Value) -> RunResult<Self> {
        value.as_number().cloned()
    }

    fn into_value(self, pool: &Pool) -> Root<Value> {
        Value::new_number(pool, self)
    }
}

impl VmType for String {
    fn vm_type() -> Type {
        Type::String
    }

    fn from_value(value: &Value) -> RunResult<Self> {
        value.as_str().map(str::to_owned)
    }

    fn into_value(self, pool: &Pool) -> Root<Value> {
        Value::new_string(pool, self)
    }
}

impl VmType for Identifier {
    fn vm_type() -> Type {
        Type::Symbol
    }

    fn from_value(value: &Value) -> RunResult<Self> {
        value.as_symbol().cloned()
    }

    fn into_value(self, pool: &Pool) -> Root<Value> {
        Value::new_symbol(pool, self)
    }
}

impl VmType for i64 {
    fn vm_type() -> Type {
        Type::Number
    }

    fn from_value(value: &Value) -> RunResult<Self> {
        Ok(value.as_number()?.to_i64()?)
    }

    fn into_value(self, pool: &Pool) -> Root<Value> {
        Value::new_number(pool, Number::from_i64(self))
    }
}

impl VmType for i32 {
    fn vm_type() -> Type {
        Type::Number
    }

    fn from_value(value: &Value) -> RunResult<Self> {
        Ok(value.as_number()?.to_i32()?)
    }

    fn into_value(self, pool: &Pool) -> Root<Value> {
        Value::new_number(pool, Number::from_i64(i64::from(self)))
    }
}

impl VmType for usize {
    fn vm_type() -> Type {
        Type::Number
    }

    fn from_value(value: &Value) -> RunResult<Self> {
        Ok(value.as_number()?.to_usize()?)
    }

    fn into_value(self, pool: &Pool) -> Root<Value> {
        Value::new_number(pool, Number::from_usize(self))
    }
}

impl VmType for f64 {
    fn vm_type() -> Type {
        Type::Number
    }

    fn from_value(value: &Value) -> RunResult<Self> {
        Ok(value.as_number()?.to_f64())
    }

    fn into_value(self, pool: &Pool) -> Root<Value> {
        match Number::from_f64(self) {
            Ok(number) => Value::new_number(pool, number),
            // Scripts never observe non-finite values; clamp to zero like
            // an underflowed literal rather than panicking inside a
            // callback adapter.
            Err(_) => Value::new_number(pool, Number::from_i64(0)),
        }
    }
}

impl VmType for () {
    fn vm_type() -> Type {
        Type::Void
    }

    fn from_value(_value: &Value) -> RunResult<Self> {
        Ok(())
    }

    fn into_value(self, pool: &Pool) -> Root<Value> {
        Value::new_void(pool)
    }
}

/// The result position of a native callback: a mappable value, or a
/// fallible computation of one.
pub trait VmResult: 'static {
    fn result_type() -> Type;
    fn into_result(self, pool: &Pool) -> RunResult<Root<Value>>;
}

impl<T: VmType> VmResult for T {
    fn result_type() -> Type {
        T::vm_type()
    }

    fn into_result(self, pool: &Pool) -> RunResult<Root<Value>> {
        Ok(self.into_value(pool))
    }
}

impl<T: VmType> VmResult for RunResult<T> {
    fn result_type() -> Type {
        T::vm_type()
    }

    fn into_result(self, pool: &Pool) -> RunResult<Root<Value>> {
        Ok(self?.into_value(pool))
    }
}

/// A host function adaptable into a VM callable. Implemented for `Fn`s of
/// arity 0..=4 over [`VmType`] arguments.
pub trait NativeFn<Args>: 'static {
    fn signature() -> (Type, Vec<Type>);
    fn invoke(&self, args: Vec<Root<Value>>, trampoline: &mut Trampoline)
    -> RunResult<Root<Value>>;
}

macro_rules! impl_native_fn {
    ($($arg:ident),*) => {
        impl<F, R, $($arg,)*> NativeFn<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> R + 'static,
            R: VmResult,
            $($arg: VmType,)*
        {
            fn signature() -> (Type, Vec<Type>) {
                (R::result_type(), vec![$($arg::vm_type()),*])
            }

            #[allow(unused_variables, unused_mut, non_snake_case)]
            fn invoke(
                &self,
                args: Vec<Root<Value>>,
                trampoline: &mut Trampoline,
            ) -> RunResult<Root<Value>> {
                let mut iter = args.into_iter();
                $(
                    let next = iter.next().ok_or_else(|| {
                        RunError::Internal("native callback arity mismatch".to_owned())
                    })?;
                    let $arg = $arg::from_value(&next.value())?;
                )*
                self($($arg),*).into_result(trampoline.pool())
            }
        }
    };
}

impl_native_fn!();
impl_native_fn!(A1);
impl_native_fn!(A1, A2);
impl_native_fn!(A1, A2, A3);
impl_native_fn!(A1, A2, A3, A4);

/// Wraps a host function into a function value with the given purity.
pub fn new_callback<Args: 'static, F: NativeFn<Args>>(
    pool: &Pool,
    purity: PurityType,
    callback: F,
) -> Root<Value> {
    let (output, inputs) = F::signature();
    Value::new_function(pool, purity, output, inputs, move |args, trampoline| {
        callback.invoke(args, trampoline)
    })
}
