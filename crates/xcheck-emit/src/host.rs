//! Host collecting one C translation unit's instrumentation.

use rustc_hash::FxHashMap;
use tracing::{trace, warn};
use xcheck_ir::{
    CallHandle, CheckCall, CheckSite, FunctionDecl, HashRoutine, RecordDecl, RecordKind,
    RoutineHandle, Signature, TranslationUnit,
};
use xcheck_synth::{Diagnostic, Host};

use crate::header::gen_header;

pub struct CHost<'u> {
    unit: &'u TranslationUnit,
    externs: Vec<(String, Signature)>,
    extern_index: FxHashMap<String, usize>,
    calls: FxHashMap<CheckSite, Vec<CheckCall>>,
    num_calls: usize,
    queued: Vec<HashRoutine>,
    routines: Vec<HashRoutine>,
    diagnostics: Vec<Diagnostic>,
}

impl<'u> CHost<'u> {
    #[must_use]
    pub fn new(unit: &'u TranslationUnit) -> Self {
        Self {
            unit,
            externs: Vec::new(),
            extern_index: FxHashMap::default(),
            calls: FxHashMap::default(),
            num_calls: 0,
            queued: Vec::new(),
            routines: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    #[must_use]
    pub const fn unit(&self) -> &'u TranslationUnit {
        self.unit
    }

    /// Functions that receive check macros.
    pub fn functions(&self) -> impl Iterator<Item = &'u FunctionDecl> {
        self.unit.functions.iter().filter(|f| f.has_body)
    }

    /// External routines called by checks, in first-use order.
    #[must_use]
    pub fn externs(&self) -> &[(String, Signature)] {
        &self.externs
    }

    /// Calls spliced at `site`, in emission order.
    #[must_use]
    pub fn calls_at(&self, site: &CheckSite) -> &[CheckCall] {
        self.calls.get(site).map(Vec::as_slice).unwrap_or_default()
    }

    /// Flushed routines, in registration order.
    #[must_use]
    pub fn routines(&self) -> &[HashRoutine] {
        &self.routines
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The instrumentation header for this unit.
    #[must_use]
    pub fn render(&self) -> String {
        gen_header(self)
    }
}

impl Host for CHost<'_> {
    fn record(&self, kind: RecordKind, name: &str) -> Option<&RecordDecl> {
        self.unit.record(kind, name)
    }

    fn lookup_or_declare_routine(&mut self, name: &str, sig: &Signature) -> RoutineHandle {
        match self.extern_index.get(name) {
            Some(&idx) => {
                if self.externs[idx].1 != *sig {
                    warn!(
                        function = %name,
                        "conflicting uses of external routine, keeping the first prototype"
                    );
                }
            }
            None => {
                trace!(function = %name, "declaring external routine");
                self.extern_index.insert(name.to_string(), self.externs.len());
                self.externs.push((name.to_string(), sig.clone()));
            }
        }
        RoutineHandle {
            name: name.to_string(),
        }
    }

    fn emit_call(&mut self, site: &CheckSite, call: CheckCall) -> CallHandle {
        self.calls.entry(site.clone()).or_default().push(call);
        self.num_calls += 1;
        CallHandle(self.num_calls - 1)
    }

    fn register_new_routine(&mut self, routine: HashRoutine) {
        self.queued.push(routine);
    }

    fn flush_routines(&mut self) {
        trace!(routines = self.queued.len(), "flushing routines");
        self.routines.append(&mut self.queued);
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}
