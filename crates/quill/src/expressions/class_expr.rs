//! `class C { ... }` declarations.
//!
//! The class body compiles against a child environment. Closing the
//! declaration builds the `ObjectType` — synthesising, for every symbol the
//! body defined, a getter and a `set_` setter whose first input is the
//! instance — and defines a zero-argument constructor in the enclosing
//! environment. The constructor builds a fresh instance environment (a
//! child of the environment enclosing the class declaration), evaluates the
//! class body against it, and wraps it in an object value.

use std::rc::Rc;

use crate::{
    compile::Compilation,
    environment::Environment,
    error::{RunError, RunResult},
    expressions::{
        EvaluationOutput, Expression, append::new_append_expression,
        constant::new_void_expression,
    },
    gc::{Pool, Ptr, Root},
    trampoline::Trampoline,
    types::{Identifier, Namespace, ObjectName, ObjectType, PurityType, Type},
    value::Value,
};

/// The private state of a class instance: its environment.
struct Instance {
    environment: Ptr<Environment>,
}

fn instance_environment(class_type: &Type, receiver: &Value) -> Root<Environment> {
    let instance: Rc<Instance> = receiver.get_user_value(&class_type.object_name());
    instance.environment.to_root()
}

/// Enters a class declaration: pushes the class type and opens the child
/// environment the body compiles against.
pub fn start_class_declaration(compilation: &mut Compilation, name: &Identifier) {
    compilation
        .current_class
        .push(Type::Object(ObjectName::from(name)));
    compilation.environment = Environment::new_child(compilation.environment.ptr());
}

fn build_getter(
    pool: &Pool,
    class_type: Type,
    field_type: Type,
    field_name: Identifier,
) -> Root<Value> {
    Value::new_function(
        pool,
        PurityType::PURE,
        field_type.clone(),
        vec![class_type.clone()],
        move |args, trampoline: &mut Trampoline| {
            let environment = instance_environment(&class_type, &args[0].value());
            environment
                .value()
                .lookup(
                    trampoline.pool(),
                    &Namespace::empty(),
                    &field_name,
                    &field_type,
                )
                .ok_or_else(|| {
                    RunError::Internal(format!("variable value is null: {field_name}"))
                })
        },
    )
}

fn build_setter(
    pool: &Pool,
    class_type: Type,
    field_type: Type,
    field_name: Identifier,
) -> Root<Value> {
    Value::new_function(
        pool,
        PurityType::UNKNOWN,
        class_type.clone(),
        vec![class_type.clone(), field_type],
        move |mut args, _trampoline: &mut Trampoline| {
            let value = args.pop().expect("setter arity is two");
            let receiver = args.pop().expect("setter arity is two");
            let environment = instance_environment(&class_type, &receiver.value());
            environment.value().assign(&field_name, &value);
            Ok(receiver)
        },
    )
}

/// Closes a class declaration: registers the object type and its
/// constructor in the enclosing environment. The class declaration itself
/// contributes no runtime expression.
pub fn finish_class_declaration(compilation: &mut Compilation, body: Option<Rc<Expression>>) {
    let Some(body) = body else {
        // Body failed to compile; unwind the declaration state.
        compilation.current_class.pop();
        if let Some(parent) = compilation.environment.value().parent() {
            compilation.environment = parent.to_root();
        }
        return;
    };
    let pool = compilation.pool.clone();
    // The constructor evaluates the body for its definitions and discards
    // the trailing value.
    let Some(constructor_body) = new_append_expression(
        compilation,
        body,
        Rc::new(new_void_expression(&pool)),
    ) else {
        compilation.current_class.pop();
        if let Some(parent) = compilation.environment.value().parent() {
            compilation.environment = parent.to_root();
        }
        return;
    };
    let constructor_body = Rc::new(constructor_body);

    let class_type = compilation
        .current_class
        .pop()
        .expect("start_class_declaration pushed");
    let class_environment = compilation.environment.clone();
    let parent = class_environment
        .value()
        .parent()
        .expect("start_class_declaration created a child environment");
    compilation.environment = parent.to_root();

    let object_type = ObjectType::new(&pool, class_type.clone());
    class_environment.value().for_each_local(|name, field_type| {
        object_type.value().add_field(
            name.clone(),
            build_getter(&pool, class_type.clone(), field_type.clone(), name.clone()).ptr(),
        );
        object_type.value().add_field(
            Identifier::new(format!("set_{name}")),
            build_setter(&pool, class_type.clone(), field_type.clone(), name.clone()).ptr(),
        );
    });
    compilation.environment.value().define_type(object_type.ptr());

    let object_name = class_type.object_name();
    let constructor_parent = compilation.environment.ptr();
    let constructor_parent_expand = constructor_parent.clone();
    let purity = constructor_body.purity();
    let ctor_class_type = class_type.clone();
    let constructor = Value::new_function_with_expand(
        &pool,
        purity,
        class_type,
        vec![],
        move |_args, trampoline: &mut Trampoline| {
            let instance_environment = Environment::new_child(constructor_parent.clone());
            let original_environment = trampoline.environment().clone();
            trampoline.set_environment(instance_environment.clone());
            let result = trampoline.bounce(&constructor_body, &Type::Void);
            trampoline.set_environment(original_environment);
            match result? {
                EvaluationOutput::Return(_) => Err(RunError::Internal(
                    "return (inside class declaration).".to_owned(),
                )),
                EvaluationOutput::Continue(_) => {
                    let instance_ptr = instance_environment.ptr();
                    let instance_for_expand = instance_ptr.clone();
                    Ok(Value::new_object_with_expand(
                        trampoline.pool(),
                        ctor_class_type.object_name(),
                        Rc::new(Instance {
                            environment: instance_ptr,
                        }),
                        move || vec![instance_for_expand.object_metadata()],
                    ))
                }
            }
        },
        move || vec![constructor_parent_expand.object_metadata()],
    );
    compilation
        .environment
        .value()
        .define(Identifier::new(object_name.as_str()), &constructor);
}
