//! Generic optional object types (`OptionalString`, `OptionalNumber`, and
//! any host instantiation).

use std::{cell::RefCell, rc::Rc};

use crate::{
    bindings::VmType,
    environment::Environment,
    error::RunError,
    gc::{Pool, Root},
    trampoline::Trampoline,
    types::{Identifier, ObjectName, ObjectType, PurityType, Type},
    value::Value,
};

struct OptionalData<T> {
    value: RefCell<Option<T>>,
}

fn get_optional<T: 'static>(name: &ObjectName, receiver: &Value) -> Rc<OptionalData<T>> {
    receiver.get_user_value::<OptionalData<T>>(name)
}

/// Registers the optional type `name` wrapping element type `T`. The
/// constructor builds an empty optional.
pub fn export_optional<T: VmType + Clone>(
    pool: &Pool,
    environment: &Root<Environment>,
    name: &str,
) {
    let object_name = ObjectName::new(name);
    let vm_type = Type::Object(object_name.clone());
    let object_type = ObjectType::new(pool, vm_type.clone());

    let constructor_name = object_name.clone();
    environment.value().define(
        Identifier::new(name),
        &Value::new_function(
            pool,
            PurityType::PURE,
            vm_type.clone(),
            vec![],
            move |_args, trampoline: &mut Trampoline| {
                Ok(Value::new_object(
                    trampoline.pool(),
                    constructor_name.clone(),
                    Rc::new(OptionalData::<T> {
                        value: RefCell::new(None),
                    }),
                ))
            },
        ),
    );

    let add_field = |method: &str, value: Root<Value>| {
        object_type
            .value()
            .add_field(Identifier::new(method), value.ptr());
    };

    let self_name = object_name.clone();
    add_field(
        "has_value",
        Value::new_function(
            pool,
            PurityType::PURE,
            Type::Bool,
            vec![vm_type.clone()],
            move |args, trampoline: &mut Trampoline| {
                let data = get_optional::<T>(&self_name, &args[0].value());
                let has_value = data.value.borrow().is_some();
                Ok(Value::new_bool(trampoline.pool(), has_value))
            },
        ),
    );
    let self_name = object_name.clone();
    add_field(
        "value",
        Value::new_function(
            pool,
            PurityType::PURE,
            T::vm_type(),
            vec![vm_type.clone()],
            move |args, trampoline: &mut Trampoline| {
                let data = get_optional::<T>(&self_name, &args[0].value());
                let value = data.value.borrow().clone().ok_or(RunError::EmptyOptional)?;
                Ok(value.into_value(trampoline.pool()))
            },
        ),
    );
    let self_name = object_name.clone();
    add_field(
        "set",
        Value::new_function(
            pool,
            PurityType::UNKNOWN,
            Type::Void,
            vec![vm_type.clone(), T::vm_type()],
            move |args, trampoline: &mut Trampoline| {
                let data = get_optional::<T>(&self_name, &args[0].value());
                let value = T::from_value(&args[1].value())?;
                *data.value.borrow_mut() = Some(value);
                Ok(Value::new_void(trampoline.pool()))
            },
        ),
    );
    let self_name = object_name;
    add_field(
        "reset",
        Value::new_function(
            pool,
            PurityType::UNKNOWN,
            Type::Void,
            vec![vm_type],
            move |args, trampoline: &mut Trampoline| {
                let data = get_optional::<T>(&self_name, &args[0].value());
                *data.value.borrow_mut() = None;
                Ok(Value::new_void(trampoline.pool()))
            },
        ),
    );

    environment.value().define_type(object_type.ptr());
}
