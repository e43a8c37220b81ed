//! Host compiler integration.

use rustc_hash::FxHashMap;
use tracing::trace;
use xcheck_ir::{
    CallHandle, CheckCall, CheckSite, HashRoutine, RecordDecl, RecordKind, RoutineHandle,
    Signature, TranslationUnit,
};

use crate::error::Diagnostic;

/// What the engine needs from the compiler hosting it.
///
/// Name resolution and type queries go through [`xcheck_ir::Scope`],
/// which the engine builds from the unit's declarations.
pub trait Host {
    /// Complete declaration of a record, if the unit has one.
    fn record(&self, kind: RecordKind, name: &str) -> Option<&RecordDecl>;

    /// Declare (or find) a user function called by a check.
    fn lookup_or_declare_routine(&mut self, name: &str, sig: &Signature) -> RoutineHandle;

    /// Splice a check call at `site`.
    fn emit_call(&mut self, site: &CheckSite, call: CheckCall) -> CallHandle;

    /// Queue a finalized hash routine for insertion.
    fn register_new_routine(&mut self, routine: HashRoutine);

    /// Insert every queued routine into the unit.
    fn flush_routines(&mut self);

    fn report(&mut self, diagnostic: Diagnostic);
}

/// Host that keeps everything it is given, in order.
///
/// Used to inspect instrumentation results and to feed the reference
/// evaluator.
#[derive(Debug)]
pub struct CollectingHost<'u> {
    unit: &'u TranslationUnit,
    declared: FxHashMap<String, Signature>,
    calls: Vec<(CheckSite, CheckCall)>,
    queued: Vec<HashRoutine>,
    routines: Vec<HashRoutine>,
    diagnostics: Vec<Diagnostic>,
}

impl<'u> CollectingHost<'u> {
    #[must_use]
    pub fn new(unit: &'u TranslationUnit) -> Self {
        Self {
            unit,
            declared: FxHashMap::default(),
            calls: Vec::new(),
            queued: Vec::new(),
            routines: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    #[must_use]
    pub fn calls(&self) -> &[(CheckSite, CheckCall)] {
        &self.calls
    }

    /// Calls emitted for `function`, in emission order.
    pub fn calls_for<'a>(&'a self, function: &'a str) -> impl Iterator<Item = &'a CheckCall> {
        self.calls
            .iter()
            .filter(move |(site, _)| site.function == function)
            .map(|(_, call)| call)
    }

    /// Flushed routines, in registration order.
    #[must_use]
    pub fn routines(&self) -> &[HashRoutine] {
        &self.routines
    }

    /// Routines still waiting for a flush.
    #[must_use]
    pub fn queued(&self) -> &[HashRoutine] {
        &self.queued
    }

    #[must_use]
    pub fn routine(&self, name: &str) -> Option<&HashRoutine> {
        self.routines.iter().find(|r| r.full_name() == name)
    }

    #[must_use]
    pub fn declared(&self, name: &str) -> Option<&Signature> {
        self.declared.get(name)
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl Host for CollectingHost<'_> {
    fn record(&self, kind: RecordKind, name: &str) -> Option<&RecordDecl> {
        self.unit.record(kind, name)
    }

    fn lookup_or_declare_routine(&mut self, name: &str, sig: &Signature) -> RoutineHandle {
        self.declared
            .entry(name.to_string())
            .or_insert_with(|| sig.clone());
        RoutineHandle {
            name: name.to_string(),
        }
    }

    fn emit_call(&mut self, site: &CheckSite, call: CheckCall) -> CallHandle {
        self.calls.push((site.clone(), call));
        CallHandle(self.calls.len() - 1)
    }

    fn register_new_routine(&mut self, routine: HashRoutine) {
        trace!(routine = %routine.full_name(), "queued routine");
        self.queued.push(routine);
    }

    fn flush_routines(&mut self) {
        self.routines.append(&mut self.queued);
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}
