//! Top-level evaluation and resumable sessions.
//!
//! [`evaluate`] runs a compiled program to completion. [`Session`] supports
//! iterative execution: evaluation pauses when the program calls an
//! external function (a callable registered through
//! [`new_external_function`]), handing the host the call's name and
//! arguments together with the state needed to resume. Resuming re-runs the
//! program with every completed external result served from a cache in call
//! order, so external calls are never issued twice. Cancellation is
//! implicit: drop the session.

use std::rc::Rc;

use crate::{
    environment::Environment,
    error::{RunError, RunResult},
    expressions::Expression,
    gc::{Pool, Root},
    resource::{LimitedTracker, NoLimitTracker, ResourceLimits, ResourceTracker},
    tracer::{NoopTracer, VmTracer},
    trampoline::{Options, Trampoline, YieldHook},
    types::{Identifier, PurityType, Type},
    value::Value,
};

/// Evaluates `expression` to completion and returns the resulting value.
/// A top-level `return` terminates evaluation with the returned value.
///
/// External function calls are not resumable through this entry point; use
/// a [`Session`] for that.
pub fn evaluate(
    expression: &Rc<Expression>,
    pool: &Pool,
    environment: Root<Environment>,
    yield_hook: Option<YieldHook>,
) -> RunResult<Root<Value>> {
    let mut session = Session::new(expression.clone(), pool, environment);
    session.yield_hook = yield_hook;
    match session.start()? {
        RunProgress::Complete(value) => Ok(value),
        RunProgress::ExternalCall { name, .. } => Err(RunError::Internal(format!(
            "external function `{name}` called outside a resumable session"
        ))),
    }
}

/// Progress of a session: done, or paused at an external function call.
pub enum RunProgress {
    Complete(Root<Value>),
    /// The program called an external function. Compute the result and call
    /// `state.resume(value)` to continue.
    ExternalCall {
        name: Identifier,
        args: Vec<Root<Value>>,
        call_id: u32,
        state: Session,
    },
}

/// A resumable evaluation of one compiled program.
pub struct Session {
    expression: Rc<Expression>,
    pool: Pool,
    environment: Root<Environment>,
    yield_hook: Option<YieldHook>,
    tracer: Box<dyn VmTracer>,
    limits: Option<ResourceLimits>,
    external_results: Vec<Root<Value>>,
}

impl Session {
    /// A session guarded by the default resource limits (recursion depth
    /// only); use [`Session::with_limits`] or [`Session::with_no_limits`] to
    /// change that.
    pub fn new(expression: Rc<Expression>, pool: &Pool, environment: Root<Environment>) -> Self {
        Self {
            expression,
            pool: pool.clone(),
            environment,
            yield_hook: None,
            tracer: Box::new(NoopTracer),
            limits: Some(ResourceLimits::default()),
            external_results: Vec::new(),
        }
    }

    /// Removes all resource limits, including the recursion-depth guard;
    /// deep scripts may then exhaust the host stack.
    #[must_use]
    pub fn with_no_limits(mut self) -> Self {
        self.limits = None;
        self
    }

    #[must_use]
    pub fn with_yield_hook(mut self, hook: YieldHook) -> Self {
        self.yield_hook = Some(hook);
        self
    }

    #[must_use]
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    #[must_use]
    pub fn with_tracer(mut self, tracer: Box<dyn VmTracer>) -> Self {
        self.tracer = tracer;
        self
    }

    fn tracker(&self) -> Box<dyn ResourceTracker> {
        match self.limits {
            Some(limits) => Box::new(LimitedTracker::new(limits)),
            None => Box::new(NoLimitTracker),
        }
    }

    /// Runs until completion or the next unresolved external call.
    pub fn start(mut self) -> RunResult<RunProgress> {
        let tracker = self.tracker();
        let mut trampoline = Trampoline::new(Options {
            pool: self.pool.clone(),
            environment: self.environment.clone(),
            yield_hook: self.yield_hook.take(),
            tracker,
            tracer: std::mem::replace(&mut self.tracer, Box::new(NoopTracer)),
        })
        .with_external_results(std::mem::take(&mut self.external_results));

        let expression = self.expression.clone();
        let expected = expression.types()[0].clone();
        let result = trampoline.bounce(&expression, &expected);
        let (yield_hook, tracer, external_results) = trampoline.into_session_parts();
        self.yield_hook = yield_hook;
        self.tracer = tracer;
        self.external_results = external_results;

        match result {
            // A top-level `return` unwraps to a plain value.
            Ok(output) => Ok(RunProgress::Complete(output.value())),
            Err(RunError::ExternalCall(call)) => Ok(RunProgress::ExternalCall {
                name: call.name,
                args: call.args,
                call_id: call.call_id,
                state: self,
            }),
            Err(error) => Err(error),
        }
    }

    /// Supplies the result of the pending external call and continues.
    pub fn resume(mut self, value: Root<Value>) -> RunResult<RunProgress> {
        self.external_results.push(value);
        self.start()
    }
}

/// Defines a function value that suspends evaluation when called, surfacing
/// the call to the host through [`RunProgress::ExternalCall`]. External
/// functions read and write the world beyond the VM, so their purity is
/// unknown.
pub fn new_external_function(
    pool: &Pool,
    name: Identifier,
    output: Type,
    inputs: Vec<Type>,
) -> Root<Value> {
    Value::new_function(
        pool,
        PurityType::UNKNOWN,
        output,
        inputs,
        move |args, trampoline: &mut Trampoline| {
            trampoline.take_external_result(&name, args)
        },
    )
}
