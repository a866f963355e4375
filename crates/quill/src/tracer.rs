//! Evaluation tracing infrastructure.
//!
//! A trait-based tracing system for the evaluator. All methods have default
//! no-op implementations, so [`NoopTracer`] requires zero lines of code and
//! the hooks disappear behind a branch on a null-object. Implementations
//! override only the hooks they care about:
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopTracer`] | No-op (production default) |
//! | [`StderrTracer`] | Human-readable evaluation log to stderr |
//! | [`CountingTracer`] | Step/call counters, useful in tests |

use std::fmt;

/// Trait for evaluation tracing. Object safe: the trampoline holds the
/// tracer as `Box<dyn VmTracer>`.
pub trait VmTracer: fmt::Debug {
    /// Called on every trampoline bounce. The hottest hook; implementations
    /// should be as lightweight as possible.
    fn on_bounce(&mut self, _depth: usize) {}

    /// Called when a callable is invoked.
    fn on_call(&mut self, _name: Option<&str>, _depth: usize) {}

    /// Called when the yield hook is about to run.
    fn on_yield(&mut self, _bounces: usize) {}

    /// Called when evaluation switches into a different environment
    /// (function bodies, namespace bodies, class instantiation).
    fn on_environment_switch(&mut self) {}
}

/// Zero-cost no-op tracer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl VmTracer for NoopTracer {}

/// Logs evaluation events to stderr. Debugging aid; very verbose.
#[derive(Debug, Default)]
pub struct StderrTracer {
    bounces: usize,
}

impl VmTracer for StderrTracer {
    fn on_bounce(&mut self, depth: usize) {
        self.bounces += 1;
        if self.bounces % 1024 == 0 {
            eprintln!("trace: {} bounces (depth {depth})", self.bounces);
        }
    }

    fn on_call(&mut self, name: Option<&str>, depth: usize) {
        eprintln!("trace: call {} (depth {depth})", name.unwrap_or("<anonymous>"));
    }

    fn on_yield(&mut self, bounces: usize) {
        eprintln!("trace: yield after {bounces} bounces");
    }
}

/// Counts events; used by tests to assert hook wiring.
#[derive(Debug, Default, Clone, Copy)]
pub struct CountingTracer {
    pub bounces: usize,
    pub calls: usize,
    pub yields: usize,
}

impl VmTracer for CountingTracer {
    fn on_bounce(&mut self, _depth: usize) {
        self.bounces += 1;
    }

    fn on_call(&mut self, _name: Option<&str>, _depth: usize) {
        self.calls += 1;
    }

    fn on_yield(&mut self, _bounces: usize) {
        self.yields += 1;
    }
}
