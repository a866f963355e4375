//! The suspension-aware evaluator driver.
//!
//! Every recursive evaluation step is mediated by [`Trampoline::bounce`]
//! rather than by direct recursion between expression modules. The bounce
//! charges the resource tracker, enforces the recursion-depth guard, and
//! periodically invokes the yield hook so the host can interleave its own
//! work with a long-running evaluation. Evaluation itself is synchronous;
//! suspension happens only at external function calls, which unwind with a
//! [`RunError::ExternalCall`] interrupt that the session layer turns into a
//! resumable progress value.

use crate::{
    error::{PendingCall, RunError, RunResult},
    environment::Environment,
    expressions::{EvaluationOutput, Expression},
    gc::{Pool, Root},
    resource::{NoLimitTracker, ResourceTracker},
    tracer::{NoopTracer, VmTracer},
    types::{Identifier, Type},
    value::Value,
};

/// Bounces between invocations of the yield hook.
pub const YIELD_INTERVAL: usize = 1024;

/// Bounces between incremental collection slices of the pool.
const GC_INTERVAL: usize = 4096;

/// Host callback invoked every [`YIELD_INTERVAL`] bounces.
pub type YieldHook = Box<dyn FnMut()>;

/// Construction options for [`Trampoline`].
pub struct Options {
    pub pool: Pool,
    pub environment: Root<Environment>,
    pub yield_hook: Option<YieldHook>,
    pub tracker: Box<dyn ResourceTracker>,
    pub tracer: Box<dyn VmTracer>,
}

impl Options {
    /// Options with no limits, no tracing and no yield hook.
    pub fn new(pool: Pool, environment: Root<Environment>) -> Self {
        Self {
            pool,
            environment,
            yield_hook: None,
            tracker: Box::new(NoLimitTracker),
            tracer: Box::new(NoopTracer),
        }
    }
}

pub struct Trampoline {
    pool: Pool,
    environment: Root<Environment>,
    yield_hook: Option<YieldHook>,
    tracker: Box<dyn ResourceTracker>,
    tracer: Box<dyn VmTracer>,
    bounces: usize,
    depth: usize,
    /// Results of external calls completed in earlier attempts of this
    /// evaluation, served back in call order on replay.
    external_results: Vec<Root<Value>>,
    next_external_result: usize,
}

impl Trampoline {
    pub fn new(options: Options) -> Self {
        Self {
            pool: options.pool,
            environment: options.environment,
            yield_hook: options.yield_hook,
            tracker: options.tracker,
            tracer: options.tracer,
            bounces: 0,
            depth: 0,
            external_results: Vec::new(),
            next_external_result: 0,
        }
    }

    pub(crate) fn with_external_results(mut self, results: Vec<Root<Value>>) -> Self {
        self.external_results = results;
        self
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn environment(&self) -> &Root<Environment> {
        &self.environment
    }

    pub fn set_environment(&mut self, environment: Root<Environment>) {
        self.tracer.on_environment_switch();
        self.environment = environment;
    }

    /// Evaluates `expression` against `expected_type`. The single entry
    /// point for all recursive evaluation.
    pub fn bounce(
        &mut self,
        expression: &Expression,
        expected_type: &Type,
    ) -> RunResult<EvaluationOutput> {
        self.tracker.on_step()?;
        self.bounces += 1;
        self.tracer.on_bounce(self.depth);
        if self.bounces % YIELD_INTERVAL == 0
            && let Some(hook) = &mut self.yield_hook
        {
            self.tracer.on_yield(self.bounces);
            hook();
        }
        if self.bounces % GC_INTERVAL == 0 {
            self.pool.collect();
        }
        self.tracker.check_recursion_depth(self.depth)?;
        self.depth += 1;
        let result = expression.evaluate(self, expected_type);
        self.depth -= 1;
        result
    }

    /// Invokes a function value with already-evaluated arguments. Used by
    /// native code that receives callables (container combinators, the host
    /// `Call` helper).
    pub fn call_function(
        &mut self,
        function: &Value,
        args: Vec<Root<Value>>,
    ) -> RunResult<Root<Value>> {
        let callback = function.lock_callback().ok_or_else(|| {
            RunError::Native(format!("expected function, found {}", function.vm_type()))
        })?;
        self.tracer.on_call(None, self.depth);
        callback(args, self)
    }

    pub(crate) fn trace_call(&mut self, name: Option<&str>) {
        self.tracer.on_call(name, self.depth);
    }

    /// Serves the next cached external-call result, or suspends evaluation
    /// by surfacing the call to the host.
    pub(crate) fn take_external_result(
        &mut self,
        name: &Identifier,
        args: Vec<Root<Value>>,
    ) -> RunResult<Root<Value>> {
        if let Some(result) = self.external_results.get(self.next_external_result) {
            self.next_external_result += 1;
            return Ok(result.clone());
        }
        Err(RunError::ExternalCall(PendingCall {
            name: name.clone(),
            args,
            call_id: u32::try_from(self.external_results.len()).unwrap_or(u32::MAX),
        }))
    }

    /// Dismantles the trampoline after an attempt, handing back the pieces a
    /// resumable session needs to try again.
    pub(crate) fn into_session_parts(
        self,
    ) -> (Option<YieldHook>, Box<dyn VmTracer>, Vec<Root<Value>>) {
        (self.yield_hook, self.tracer, self.external_results)
    }
}
