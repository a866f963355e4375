//! Generic vector and set object types.
//!
//! `export_vector::<T>` / `export_set::<T>` register an object type (e.g.
//! `VectorString`) with a zero-argument constructor plus the container
//! methods, for any element type that maps to VM values. Containers are
//! host-owned; element types whose values retain GC references report them
//! through [`ContainerElement::expand`], so nested references stay visible
//! to the collector.

use std::{cell::RefCell, collections::BTreeSet, rc::Rc};

use crate::{
    bindings::VmType,
    environment::Environment,
    error::{RunError, RunResult},
    gc::{ObjectMetadata, Pool, Root},
    trampoline::Trampoline,
    types::{Identifier, ObjectName, ObjectType, PurityType, Type},
    value::Value,
};

/// An element type storable in the exported containers.
pub trait ContainerElement: VmType + Clone {
    /// GC references retained by one element; empty for plain data.
    fn expand(&self) -> Vec<Rc<ObjectMetadata>> {
        Vec::new()
    }
}

impl ContainerElement for String {}
impl ContainerElement for crate::number::Number {}

struct VectorData<T> {
    items: RefCell<Vec<T>>,
}

struct SetData<T> {
    items: RefCell<BTreeSet<T>>,
}

fn get_vector<T: 'static>(name: &ObjectName, receiver: &Value) -> Rc<VectorData<T>> {
    receiver.get_user_value::<VectorData<T>>(name)
}

fn get_set<T: 'static>(name: &ObjectName, receiver: &Value) -> Rc<SetData<T>> {
    receiver.get_user_value::<SetData<T>>(name)
}

fn new_vector_value<T: ContainerElement>(
    pool: &Pool,
    name: &ObjectName,
    items: Vec<T>,
) -> Root<Value> {
    let data = Rc::new(VectorData {
        items: RefCell::new(items),
    });
    let data_for_expand = data.clone();
    Value::new_object_with_expand(pool, name.clone(), data, move || {
        data_for_expand
            .items
            .borrow()
            .iter()
            .flat_map(ContainerElement::expand)
            .collect()
    })
}

fn new_set_value<T: ContainerElement + Ord>(
    pool: &Pool,
    name: &ObjectName,
    items: BTreeSet<T>,
) -> Root<Value> {
    let data = Rc::new(SetData {
        items: RefCell::new(items),
    });
    let data_for_expand = data.clone();
    Value::new_object_with_expand(pool, name.clone(), data, move || {
        data_for_expand
            .items
            .borrow()
            .iter()
            .flat_map(ContainerElement::expand)
            .collect()
    })
}

fn out_of_range(name: &ObjectName, index: i64, size: usize) -> RunError {
    RunError::OutOfRange {
        index,
        size,
        what: name.as_str().to_owned(),
    }
}

fn checked_index(name: &ObjectName, index: &Value, size: usize) -> RunResult<usize> {
    let index = index.as_number()?.to_i64()?;
    usize::try_from(index)
        .ok()
        .filter(|&index| index < size)
        .ok_or_else(|| out_of_range(name, index, size))
}

/// Calls `predicate` (a `function<bool(T)>` value) on one element.
fn call_predicate<T: ContainerElement>(
    trampoline: &mut Trampoline,
    predicate: &Root<Value>,
    element: T,
) -> RunResult<bool> {
    let argument = element.into_value(trampoline.pool());
    let result = trampoline.call_function(&predicate.value(), vec![argument])?;
    let result = result.value().as_bool()?;
    Ok(result)
}

/// Registers the vector type `name` with element type `T`.
pub fn export_vector<T: ContainerElement + PartialEq>(
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
                Ok(new_vector_value::<T>(
                    trampoline.pool(),
                    &constructor_name,
                    Vec::new(),
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
        "empty",
        Value::new_function(
            pool,
            PurityType::PURE,
            Type::Bool,
            vec![vm_type.clone()],
            move |args, trampoline: &mut Trampoline| {
                let data = get_vector::<T>(&self_name, &args[0].value());
                let empty = data.items.borrow().is_empty();
                Ok(Value::new_bool(trampoline.pool(), empty))
            },
        ),
    );
    let self_name = object_name.clone();
    add_field(
        "size",
        Value::new_function(
            pool,
            PurityType::PURE,
            Type::Number,
            vec![vm_type.clone()],
            move |args, trampoline: &mut Trampoline| {
                let data = get_vector::<T>(&self_name, &args[0].value());
                let size = data.items.borrow().len();
                Ok(size.into_value(trampoline.pool()))
            },
        ),
    );
    let self_name = object_name.clone();
    add_field(
        "get",
        Value::new_function(
            pool,
            PurityType::PURE,
            T::vm_type(),
            vec![vm_type.clone(), Type::Number],
            move |args, trampoline: &mut Trampoline| {
                let data = get_vector::<T>(&self_name, &args[0].value());
                let items = data.items.borrow();
                let index = checked_index(&self_name, &args[1].value(), items.len())?;
                Ok(items[index].clone().into_value(trampoline.pool()))
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
            vec![vm_type.clone(), Type::Number, T::vm_type()],
            move |args, trampoline: &mut Trampoline| {
                let data = get_vector::<T>(&self_name, &args[0].value());
                let element = T::from_value(&args[2].value())?;
                let mut items = data.items.borrow_mut();
                let index = checked_index(&self_name, &args[1].value(), items.len())?;
                items[index] = element;
                Ok(Value::new_void(trampoline.pool()))
            },
        ),
    );
    let self_name = object_name.clone();
    add_field(
        "push_back",
        Value::new_function(
            pool,
            PurityType::UNKNOWN,
            Type::Void,
            vec![vm_type.clone(), T::vm_type()],
            move |args, trampoline: &mut Trampoline| {
                let data = get_vector::<T>(&self_name, &args[0].value());
                let element = T::from_value(&args[1].value())?;
                data.items.borrow_mut().push(element);
                Ok(Value::new_void(trampoline.pool()))
            },
        ),
    );
    let self_name = object_name.clone();
    add_field(
        "erase",
        Value::new_function(
            pool,
            PurityType::UNKNOWN,
            Type::Void,
            vec![vm_type.clone(), Type::Number],
            move |args, trampoline: &mut Trampoline| {
                let data = get_vector::<T>(&self_name, &args[0].value());
                let mut items = data.items.borrow_mut();
                let index = checked_index(&self_name, &args[1].value(), items.len())?;
                items.remove(index);
                Ok(Value::new_void(trampoline.pool()))
            },
        ),
    );
    let self_name = object_name.clone();
    add_field(
        "filter",
        Value::new_function(
            pool,
            PurityType::UNKNOWN,
            vm_type.clone(),
            vec![
                vm_type.clone(),
                Type::function(Type::Bool, vec![T::vm_type()], PurityType::UNKNOWN),
            ],
            move |args, trampoline: &mut Trampoline| {
                let data = get_vector::<T>(&self_name, &args[0].value());
                let snapshot: Vec<T> = data.items.borrow().clone();
                let mut kept = Vec::new();
                for element in snapshot {
                    if call_predicate(trampoline, &args[1], element.clone())? {
                        kept.push(element);
                    }
                }
                Ok(new_vector_value(trampoline.pool(), &self_name, kept))
            },
        ),
    );
    let self_name = object_name.clone();
    add_field(
        "ForEach",
        Value::new_function(
            pool,
            PurityType::UNKNOWN,
            Type::Void,
            vec![
                vm_type,
                Type::function(Type::Void, vec![T::vm_type()], PurityType::UNKNOWN),
            ],
            move |args, trampoline: &mut Trampoline| {
                let data = get_vector::<T>(&self_name, &args[0].value());
                let snapshot: Vec<T> = data.items.borrow().clone();
                for element in snapshot {
                    let argument = element.into_value(trampoline.pool());
                    trampoline.call_function(&args[1].value(), vec![argument])?;
                }
                Ok(Value::new_void(trampoline.pool()))
            },
        ),
    );

    environment.value().define_type(object_type.ptr());
}

/// Registers the set type `name` with element type `T`.
pub fn export_set<T: ContainerElement + Ord>(
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
                Ok(new_set_value::<T>(
                    trampoline.pool(),
                    &constructor_name,
                    BTreeSet::new(),
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
        "empty",
        Value::new_function(
            pool,
            PurityType::PURE,
            Type::Bool,
            vec![vm_type.clone()],
            move |args, trampoline: &mut Trampoline| {
                let data = get_set::<T>(&self_name, &args[0].value());
                let empty = data.items.borrow().is_empty();
                Ok(Value::new_bool(trampoline.pool(), empty))
            },
        ),
    );
    let self_name = object_name.clone();
    add_field(
        "size",
        Value::new_function(
            pool,
            PurityType::PURE,
            Type::Number,
            vec![vm_type.clone()],
            move |args, trampoline: &mut Trampoline| {
                let data = get_set::<T>(&self_name, &args[0].value());
                let size = data.items.borrow().len();
                Ok(size.into_value(trampoline.pool()))
            },
        ),
    );
    let self_name = object_name.clone();
    add_field(
        "get",
        Value::new_function(
            pool,
            PurityType::PURE,
            T::vm_type(),
            vec![vm_type.clone(), Type::Number],
            move |args, trampoline: &mut Trampoline| {
                let data = get_set::<T>(&self_name, &args[0].value());
                let items = data.items.borrow();
                let index = checked_index(&self_name, &args[1].value(), items.len())?;
                let element = items.iter().nth(index).expect("index checked").clone();
                Ok(element.into_value(trampoline.pool()))
            },
        ),
    );
    let self_name = object_name.clone();
    add_field(
        "insert",
        Value::new_function(
            pool,
            PurityType::UNKNOWN,
            Type::Void,
            vec![vm_type.clone(), T::vm_type()],
            move |args, trampoline: &mut Trampoline| {
                let data = get_set::<T>(&self_name, &args[0].value());
                let element = T::from_value(&args[1].value())?;
                data.items.borrow_mut().insert(element);
                Ok(Value::new_void(trampoline.pool()))
            },
        ),
    );
    let self_name = object_name.clone();
    add_field(
        "erase",
        Value::new_function(
            pool,
            PurityType::UNKNOWN,
            Type::Void,
            vec![vm_type.clone(), T::vm_type()],
            move |args, trampoline: &mut Trampoline| {
                let data = get_set::<T>(&self_name, &args[0].value());
                let element = T::from_value(&args[1].value())?;
                data.items.borrow_mut().remove(&element);
                Ok(Value::new_void(trampoline.pool()))
            },
        ),
    );
    let self_name = object_name.clone();
    add_field(
        "contains",
        Value::new_function(
            pool,
            PurityType::PURE,
            Type::Bool,
            vec![vm_type.clone(), T::vm_type()],
            move |args, trampoline: &mut Trampoline| {
                let data = get_set::<T>(&self_name, &args[0].value());
                let element = T::from_value(&args[1].value())?;
                let contains = data.items.borrow().contains(&element);
                Ok(Value::new_bool(trampoline.pool(), contains))
            },
        ),
    );
    let self_name = object_name.clone();
    add_field(
        "filter",
        Value::new_function(
            pool,
            PurityType::UNKNOWN,
            vm_type.clone(),
            vec![
                vm_type.clone(),
                Type::function(Type::Bool, vec![T::vm_type()], PurityType::UNKNOWN),
            ],
            move |args, trampoline: &mut Trampoline| {
                let data = get_set::<T>(&self_name, &args[0].value());
                let snapshot: Vec<T> = data.items.borrow().iter().cloned().collect();
                let mut kept = BTreeSet::new();
                for element in snapshot {
                    if call_predicate(trampoline, &args[1], element.clone())? {
                        kept.insert(element);
                    }
                }
                Ok(new_set_value(trampoline.pool(), &self_name, kept))
            },
        ),
    );
    let self_name = object_name.clone();
    add_field(
        "ForEach",
        Value::new_function(
            pool,
            PurityType::UNKNOWN,
            Type::Void,
            vec![
                vm_type,
                Type::function(Type::Void, vec![T::vm_type()], PurityType::UNKNOWN),
            ],
            move |args, trampoline: &mut Trampoline| {
                let data = get_set::<T>(&self_name, &args[0].value());
                let snapshot: Vec<T> = data.items.borrow().iter().cloned().collect();
                for element in snapshot {
                    let argument = element.into_value(trampoline.pool());
                    trampoline.call_function(&args[1].value(), vec![argument])?;
                }
                Ok(Value::new_void(trampoline.pool()))
            },
        ),
    );

    environment.value().define_type(object_type.ptr());
}
