//! quill: a sandboxed, embeddable scripting virtual machine.
//!
//! The VM implements a strongly-typed, C-like expression language with
//! lexical scoping, first-class functions, namespaces, user-defined object
//! types, implicit promotions, errors-as-values, cooperative suspension,
//! and a tracing garbage collector that tolerates cyclic object graphs.
//!
//! A minimal embedding:
//!
//! ```
//! use quill::{Pool, compile_string, evaluate, new_default_environment};
//!
//! let pool = Pool::new();
//! let environment = new_default_environment(&pool);
//! let program = compile_string("return 40 + 2;", &pool, environment.clone()).unwrap();
//! let result = evaluate(&program, &pool, environment, None).unwrap();
//! assert_eq!(result.value().as_number().unwrap().to_i64(), Ok(42));
//! ```

mod ast;
mod bindings;
mod compile;
mod environment;
mod error;
mod expressions;
pub mod gc;
mod lexer;
mod number;
mod resource;
mod run;
mod stdlib;
mod tracer;
mod trampoline;
mod types;
mod value;

lalrpop_util::lalrpop_mod!(grammar);

pub use crate::{
    bindings::{NativeFn, VmResult, VmType, new_callback},
    compile::{Compilation, CompileError, CompileErrors, compile_file, compile_string},
    environment::{Environment, LookupResult, VariableScope},
    error::{PendingCall, RunError, RunResult},
    expressions::{EvaluationOutput, Expression},
    gc::{CollectOutput, Expand, FullCollectStats, LightCollectStats, Pool, Ptr, Root, WeakPtr},
    lexer::{LexError, Position, SourceMap},
    number::{Number, NumberError},
    resource::{
        DEFAULT_MAX_RECURSION_DEPTH, LimitedTracker, NoLimitTracker, ResourceError,
        ResourceLimits, ResourceTracker,
    },
    run::{RunProgress, Session, evaluate, new_external_function},
    stdlib::{
        containers::{ContainerElement, export_set, export_vector},
        new_default_environment,
        optional::export_optional,
        time::{TimeSpan, Timestamp},
    },
    tracer::{CountingTracer, NoopTracer, StderrTracer, VmTracer},
    trampoline::{Trampoline, YieldHook},
    types::{
        FunctionType, Identifier, Namespace, ObjectName, ObjectType, PromotionFn, PurityType,
        Type, combine_purity, promote, types_to_string,
    },
    value::{Callback, ExpandCallback, Value},
};
