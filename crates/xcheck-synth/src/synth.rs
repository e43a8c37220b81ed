//! Type-directed hash routine synthesis.
//!
//! Routines are built on first use and addressed by their composed name.
//! A routine whose body is still being built is "pending"; requests for
//! it during that time get its descriptor without re-entering synthesis,
//! which is what terminates self-referential records. Runtime recursion is
//! bounded separately by the depth budget every routine receives.

use metrics::counter;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};
use xcheck_config::{StructConfig, XCheck};
use xcheck_hash::{HasherPair, djb2_u64};
use xcheck_ir::{
    FieldHash, HashFunction, HashFunctionName, HashRoutine, ParamType, RecordDecl, RoutineBody,
    Scope, Signature, Type, VarDecl,
};

use crate::custom::CustomSpec;
use crate::error::{CheckError, Diagnostic};
use crate::host::Host;
use crate::metrics::{DIAGNOSTICS, ROUTINES_SYNTHESIZED};
use crate::resolver::{CheckSpecResolver, hasher_pair};

/// Inputs that shape a routine besides its type.
#[derive(Clone, Copy, Debug)]
pub struct SynthContext<'a> {
    pub resolver: &'a CheckSpecResolver<'a>,
    pub file: &'a str,
    /// Pair inherited from the enclosing function or record.
    pub hashers: HasherPair,
}

/// Per-unit synthesis state.
#[derive(Debug, Default)]
pub struct SynthSession {
    cache: FxHashMap<String, HashFunction>,
    pending: FxHashSet<String>,
    synthesized: usize,
    diagnostics: usize,
}

impl SynthSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Routines built since the session started.
    #[must_use]
    pub const fn synthesized(&self) -> usize {
        self.synthesized
    }

    /// Diagnostics reported while building routines.
    #[must_use]
    pub const fn diagnostics(&self) -> usize {
        self.diagnostics
    }

    #[must_use]
    pub fn is_cached(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    /// Descriptor of the routine hashing `ty`, building it (and everything
    /// it calls) unless it is cached, pending, or `build_if_absent` is
    /// false.
    ///
    /// `candidate` names an anonymous record.
    pub fn routine_for<H: Host>(
        &mut self,
        cx: &SynthContext<'_>,
        host: &mut H,
        ty: &Type,
        candidate: Option<&str>,
        build_if_absent: bool,
    ) -> HashFunction {
        let pair = if matches!(ty, Type::Scalar(_)) {
            HasherPair::BUILTIN
        } else {
            cx.hashers
        };
        let func = HashFunction::new(
            HashFunctionName::new(pair, ty.name_elements(candidate)),
            ty.clone(),
        );
        let key = func.full_name();
        if !build_if_absent || self.cache.contains_key(&key) || self.pending.contains(&key) {
            return func;
        }

        self.pending.insert(key.clone());
        let body = self.build_body(cx, host, ty, candidate);
        self.pending.remove(&key);

        trace!(routine = %key, "synthesized hash routine");
        counter!(ROUTINES_SYNTHESIZED).increment(1);
        self.synthesized += 1;
        self.cache.insert(key, func.clone());
        host.register_new_routine(HashRoutine {
            func: func.clone(),
            body,
        });
        func
    }

    /// Hand every queued routine to the host and forget the unit.
    pub fn finish<H: Host>(&mut self, host: &mut H) {
        debug!(routines = self.cache.len(), "flushing hash routines");
        host.flush_routines();
        self.cache.clear();
        self.pending.clear();
    }

    fn report<H: Host>(&mut self, host: &mut H, diagnostic: Diagnostic) {
        debug!(%diagnostic, "synthesis diagnostic");
        counter!(DIAGNOSTICS).increment(1);
        self.diagnostics += 1;
        host.report(diagnostic);
    }

    fn build_body<H: Host>(
        &mut self,
        cx: &SynthContext<'_>,
        host: &mut H,
        ty: &Type,
        candidate: Option<&str>,
    ) -> RoutineBody {
        match ty {
            Type::Scalar(kind) => RoutineBody::Scalar(*kind),
            Type::Pointer(inner) => {
                if ty.is_opaque_pointer() {
                    RoutineBody::OpaquePointer
                } else {
                    RoutineBody::Pointer {
                        pointee: self.routine_for(cx, host, inner, candidate, true),
                    }
                }
            }
            Type::Array { elem, len } => RoutineBody::Array {
                element: self.routine_for(cx, host, elem, candidate, true),
                len: *len,
                aggregate: cx.hashers.aggregate,
            },
            Type::Record { kind, name } => {
                let decl = host.record(*kind, name).filter(|d| d.complete).cloned();
                match decl {
                    Some(decl) => self.record_body(cx, host, &decl),
                    None => {
                        let site = ty.to_string();
                        let err = CheckError::UnknownRecord(site.clone());
                        self.report(host, Diagnostic::warning(site, err));
                        RoutineBody::Opaque
                    }
                }
            }
            Type::Opaque(_) => RoutineBody::OpaquePointer,
        }
    }

    fn record_body<H: Host>(
        &mut self,
        cx: &SynthContext<'_>,
        host: &mut H,
        decl: &RecordDecl,
    ) -> RoutineBody {
        let site = decl.ty().to_string();
        let (config, problem) = cx.resolver.effective_struct_config(cx.file, decl);
        if let Some(err) = problem {
            self.report(host, Diagnostic::error(&site, err));
        }

        if let Some(function) = &config.custom_hash {
            let sig = Signature::new(vec![
                ParamType::Value(Type::pointer_to(decl.ty())),
                ParamType::Depth,
            ]);
            host.lookup_or_declare_routine(function, &sig);
            return RoutineBody::CustomRecord {
                function: function.clone(),
            };
        }

        let hashers = hasher_pair(
            config.ahasher.as_deref(),
            config.shasher.as_deref(),
            cx.hashers,
        )
        .unwrap_or_else(|err| {
            self.report(host, Diagnostic::warning(&site, err));
            HasherPair::BUILTIN
        });
        let inner = SynthContext { hashers, ..*cx };
        let scope = Scope::for_record(decl);

        let mut fields = Vec::with_capacity(decl.fields.len());
        for field in &decl.fields {
            let field_site = format!("{site}.{}", field.name);
            let check = match cx.resolver.resolve_field(&config, field) {
                Ok(check) => check,
                Err(err) => {
                    self.report(host, Diagnostic::error(field_site, err));
                    continue;
                }
            };
            match self.field_hash(&inner, host, &config, &scope, field, &check) {
                Ok(Some(hash)) => fields.push(hash),
                Ok(None) => {}
                Err(err) => self.report(host, Diagnostic::error(field_site, err)),
            }
        }
        RoutineBody::Record { hashers, fields }
    }

    fn field_hash<H: Host>(
        &mut self,
        cx: &SynthContext<'_>,
        host: &mut H,
        config: &StructConfig,
        scope: &Scope,
        field: &VarDecl,
        check: &XCheck,
    ) -> Result<Option<FieldHash>, CheckError> {
        let name = field.name.clone();
        let hash = match check {
            XCheck::Disabled => return Ok(None),
            XCheck::Fixed(value) => FieldHash::Const {
                field: name,
                value: *value,
            },
            XCheck::Djb2(s) => FieldHash::Const {
                field: name,
                value: djb2_u64(s),
            },
            XCheck::Default => match &config.field_hasher {
                Some(function) => {
                    let sig = Signature::new(vec![ParamType::Opaque, ParamType::Depth]);
                    host.lookup_or_declare_routine(function, &sig);
                    FieldHash::FieldHasher {
                        field: name,
                        function: function.clone(),
                    }
                }
                None => FieldHash::Routine {
                    routine: self.routine_for(cx, host, &field.ty, Some(&field.name), true),
                    field: name,
                },
            },
            XCheck::Custom(text) => {
                let spec: CustomSpec = text.parse()?;
                let call = spec.resolve(scope, scope.lookup(&field.name))?;
                host.lookup_or_declare_routine(&call.function, &call.signature);
                FieldHash::Custom {
                    field: name,
                    function: call.function,
                    args: call.args,
                }
            }
        };
        Ok(Some(hash))
    }
}
