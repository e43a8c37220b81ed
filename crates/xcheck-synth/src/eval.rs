//! Reference evaluator.
//!
//! Runs synthesized routines and check calls over modelled runtime values,
//! producing the fingerprints the instrumented program would report.
//! Memory is a [`Heap`] of cells; pointers are [`Place`]s into it, so
//! cyclic structures are plain data.

use rustc_hash::FxHashMap;
use thiserror::Error;
use xcheck_hash::{
    FingerprintHasher, Fingerprint, LEAF_POINTER_HASH, LEAF_RECORD_HASH, NULL_POINTER_HASH,
    POINTER_HASH, ScalarValue, SimpleHasher, hash_scalar,
};
use xcheck_ir::{
    ArgPassing, CheckCall, CheckValue, FieldHash, HashFunction, HashRoutine, RECORD_PARAM,
    RoutineBody, ValueRef,
};

/// Evaluation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("no routine named `{0}`")]
    UnknownRoutine(String),
    #[error("no implementation for function `{0}`")]
    UnknownFunction(String),
    #[error("unbound name `{0}`")]
    UnboundName(String),
    #[error("`{0}` is not addressable")]
    NotAddressable(String),
    #[error("dangling pointer to cell {0}")]
    DanglingPointer(usize),
    #[error("null dereference of `{0}`")]
    NullDereference(String),
    #[error("`{routine}` cannot hash a {found} value")]
    TypeMismatch { routine: String, found: &'static str },
}

pub type Result<T> = std::result::Result<T, EvalError>;

/// One step from a cell to a sub-object.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Step {
    Field(String),
    Index(u64),
}

/// Address of an object: a heap cell and a path inside it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Place {
    pub cell: usize,
    pub path: Vec<Step>,
}

impl Place {
    #[must_use]
    pub fn field(&self, name: &str) -> Self {
        let mut path = self.path.clone();
        path.push(Step::Field(name.to_string()));
        Self {
            cell: self.cell,
            path,
        }
    }

    #[must_use]
    pub fn index(&self, i: u64) -> Self {
        let mut path = self.path.clone();
        path.push(Step::Index(i));
        Self {
            cell: self.cell,
            path,
        }
    }
}

/// A modelled runtime value.
#[derive(Clone, Debug, PartialEq)]
pub enum RtValue {
    Scalar(ScalarValue),
    /// `None` is the null pointer.
    Pointer(Option<Place>),
    Array(Vec<RtValue>),
    /// Fields in declaration order.
    Record(Vec<(String, RtValue)>),
}

impl RtValue {
    pub fn record<'a>(fields: impl IntoIterator<Item = (&'a str, Self)>) -> Self {
        Self::Record(
            fields
                .into_iter()
                .map(|(name, v)| (name.to_string(), v))
                .collect(),
        )
    }

    #[must_use]
    pub const fn null() -> Self {
        Self::Pointer(None)
    }

    #[must_use]
    pub const fn to(place: Place) -> Self {
        Self::Pointer(Some(place))
    }

    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Pointer(_) => "pointer",
            Self::Array(_) => "array",
            Self::Record(_) => "record",
        }
    }
}

impl From<ScalarValue> for RtValue {
    fn from(v: ScalarValue) -> Self {
        Self::Scalar(v)
    }
}

fn walk<'v>(mut value: &'v RtValue, path: &[Step]) -> Option<&'v RtValue> {
    for step in path {
        value = match (step, value) {
            (Step::Field(name), RtValue::Record(fields)) => {
                fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)?
            }
            (Step::Index(i), RtValue::Array(items)) => items.get(usize::try_from(*i).ok()?)?,
            _ => return None,
        };
    }
    Some(value)
}

fn walk_mut<'v>(mut value: &'v mut RtValue, path: &[Step]) -> Option<&'v mut RtValue> {
    for step in path {
        value = match (step, value) {
            (Step::Field(name), RtValue::Record(fields)) => {
                fields.iter_mut().find(|(n, _)| n == name).map(|(_, v)| v)?
            }
            (Step::Index(i), RtValue::Array(items)) => {
                items.get_mut(usize::try_from(*i).ok()?)?
            }
            _ => return None,
        };
    }
    Some(value)
}

/// Modelled memory.
#[derive(Clone, Debug, Default)]
pub struct Heap {
    cells: Vec<RtValue>,
}

impl Heap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` in a fresh cell.
    pub fn alloc(&mut self, value: RtValue) -> Place {
        self.cells.push(value);
        Place {
            cell: self.cells.len() - 1,
            path: Vec::new(),
        }
    }

    pub fn load(&self, place: &Place) -> Result<&RtValue> {
        self.cells
            .get(place.cell)
            .and_then(|cell| walk(cell, &place.path))
            .ok_or(EvalError::DanglingPointer(place.cell))
    }

    pub fn store(&mut self, place: &Place, value: RtValue) -> Result<()> {
        let slot = self
            .cells
            .get_mut(place.cell)
            .and_then(|cell| walk_mut(cell, &place.path))
            .ok_or(EvalError::DanglingPointer(place.cell))?;
        *slot = value;
        Ok(())
    }
}

#[derive(Clone, Debug)]
enum Binding {
    Place(Place),
    Value(RtValue),
}

/// Names visible to a check call: variables live on the heap, and the
/// return value (in exit checks) too.
#[derive(Clone, Debug, Default)]
pub struct Frame {
    vars: FxHashMap<String, Binding>,
    ret: Option<Place>,
}

impl Frame {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_var(mut self, name: impl Into<String>, place: Place) -> Self {
        self.vars.insert(name.into(), Binding::Place(place));
        self
    }

    #[must_use]
    pub fn with_return(mut self, place: Place) -> Self {
        self.ret = Some(place);
        self
    }

    fn with_value(mut self, name: impl Into<String>, value: RtValue) -> Self {
        self.vars.insert(name.into(), Binding::Value(value));
        self
    }
}

/// Implementation of a user check function.
pub type CustomFn = Box<dyn Fn(&Heap, &[RtValue]) -> u64>;

fn depth_value(depth: usize) -> RtValue {
    RtValue::Scalar(ScalarValue::U64(u64::try_from(depth).unwrap_or(u64::MAX)))
}

/// Evaluates routines and check calls against a heap.
pub struct Evaluator<'a> {
    routines: FxHashMap<String, &'a HashRoutine>,
    heap: &'a Heap,
    functions: FxHashMap<String, CustomFn>,
    derefs: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(routines: impl IntoIterator<Item = &'a HashRoutine>, heap: &'a Heap) -> Self {
        Self {
            routines: routines.into_iter().map(|r| (r.full_name(), r)).collect(),
            heap,
            functions: FxHashMap::default(),
            derefs: 0,
        }
    }

    /// Provide a user function (custom check, field hasher or custom record
    /// hash).
    #[must_use]
    pub fn with_function(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&Heap, &[RtValue]) -> u64 + 'static,
    ) -> Self {
        self.functions.insert(name.into(), Box::new(f));
        self
    }

    /// Pointers followed by pointer routines so far.
    #[must_use]
    pub const fn derefs(&self) -> usize {
        self.derefs
    }

    pub fn reset_derefs(&mut self) {
        self.derefs = 0;
    }

    /// Run the routine `func` on its argument with a depth budget.
    ///
    /// Records and arrays are passed as pointers to their place, exactly
    /// as the emitted code passes them.
    pub fn hash(&mut self, func: &HashFunction, arg: &RtValue, depth: usize) -> Result<u64> {
        let name = func.full_name();
        let routine = *self
            .routines
            .get(&name)
            .ok_or_else(|| EvalError::UnknownRoutine(name.clone()))?;
        let mismatch = |found: &RtValue| EvalError::TypeMismatch {
            routine: name.clone(),
            found: found.kind_name(),
        };

        match &routine.body {
            RoutineBody::Scalar(kind) => match arg {
                RtValue::Scalar(v) if v.kind() == *kind => Ok(hash_scalar(*v)),
                other => Err(mismatch(other)),
            },
            RoutineBody::Pointer { pointee } => match arg {
                RtValue::Pointer(None) => Ok(NULL_POINTER_HASH),
                RtValue::Pointer(Some(_)) if depth == 0 => Ok(LEAF_POINTER_HASH),
                RtValue::Pointer(Some(place)) => {
                    self.derefs += 1;
                    let inner = self.argument_at(pointee, place)?;
                    let inner = self.hash(pointee, &inner, depth - 1)?;
                    let mut h = SimpleHasher::default();
                    h.write_u64(POINTER_HASH);
                    h.write_u64(inner);
                    Ok(h.finish())
                }
                other => Err(mismatch(other)),
            },
            RoutineBody::OpaquePointer => match arg {
                RtValue::Pointer(None) => Ok(NULL_POINTER_HASH),
                RtValue::Pointer(Some(_)) => Ok(LEAF_POINTER_HASH),
                other => Err(mismatch(other)),
            },
            RoutineBody::Array {
                element,
                len,
                aggregate,
            } => {
                let RtValue::Pointer(Some(place)) = arg else {
                    return Err(mismatch(arg));
                };
                let mut h = aggregate.start();
                for i in 0..*len {
                    let elem = self.argument_at(element, &place.index(i))?;
                    h.write_u64(self.hash(element, &elem, depth)?);
                }
                Ok(h.finish())
            }
            RoutineBody::Record { hashers, fields } => {
                let RtValue::Pointer(Some(place)) = arg else {
                    return Err(mismatch(arg));
                };
                if depth == 0 {
                    return Ok(LEAF_RECORD_HASH);
                }
                let mut values = Vec::with_capacity(fields.len());
                for field in fields {
                    values.push(self.field_value(field, place, depth - 1)?);
                }
                Ok(hashers.fold_fields(values))
            }
            RoutineBody::CustomRecord { function } => {
                self.call(function, &[arg.clone(), depth_value(depth)])
            }
            RoutineBody::Opaque => Ok(LEAF_RECORD_HASH),
        }
    }

    /// Fingerprint reported by `call` in `frame`.
    pub fn eval_check(&mut self, call: &CheckCall, frame: &Frame) -> Result<Fingerprint> {
        let value = match &call.value {
            CheckValue::Const(k) => *k,
            CheckValue::Hash {
                routine,
                arg,
                depth,
            } => {
                let arg = match routine.passing() {
                    ArgPassing::Decay => RtValue::to(self.place_of(arg, frame)?),
                    ArgPassing::Value | ArgPassing::Address => self.value_of(arg, frame)?,
                };
                self.hash(routine, &arg, *depth)?
            }
            CheckValue::Custom { function, args } => {
                let args = args
                    .iter()
                    .map(|a| self.value_of(a, frame))
                    .collect::<Result<Vec<_>>>()?;
                self.call(function, &args)?
            }
        };
        Ok(Fingerprint::new(call.tag, value))
    }

    /// Evaluate `calls` in order.
    pub fn eval_calls<'c>(
        &mut self,
        calls: impl IntoIterator<Item = &'c CheckCall>,
        frame: &Frame,
    ) -> Result<Vec<Fingerprint>> {
        calls
            .into_iter()
            .map(|call| self.eval_check(call, frame))
            .collect()
    }

    fn call(&self, function: &str, args: &[RtValue]) -> Result<u64> {
        let f = self
            .functions
            .get(function)
            .ok_or_else(|| EvalError::UnknownFunction(function.to_string()))?;
        Ok(f(self.heap, args))
    }

    /// Argument passed to `func` for the object at `place`.
    fn argument_at(&self, func: &HashFunction, place: &Place) -> Result<RtValue> {
        match func.passing() {
            ArgPassing::Value => self.heap.load(place).cloned(),
            ArgPassing::Address | ArgPassing::Decay => Ok(RtValue::to(place.clone())),
        }
    }

    fn field_value(&mut self, field: &FieldHash, record: &Place, depth: usize) -> Result<u64> {
        match field {
            FieldHash::Routine { field, routine } => {
                let arg = self.argument_at(routine, &record.field(field))?;
                self.hash(routine, &arg, depth)
            }
            FieldHash::FieldHasher { field, function } => {
                self.call(function, &[RtValue::to(record.field(field)), depth_value(depth)])
            }
            FieldHash::Const { value, .. } => Ok(*value),
            FieldHash::Custom { function, args, .. } => {
                let frame = Frame::new().with_value(RECORD_PARAM, RtValue::to(record.clone()));
                let args = args
                    .iter()
                    .map(|a| self.value_of(a, &frame))
                    .collect::<Result<Vec<_>>>()?;
                self.call(function, &args)
            }
        }
    }

    fn deref(value: RtValue, what: &ValueRef) -> Result<Place> {
        match value {
            RtValue::Pointer(Some(place)) => Ok(place),
            RtValue::Pointer(None) => Err(EvalError::NullDereference(what.to_string())),
            _ => Err(EvalError::NotAddressable(what.to_string())),
        }
    }

    fn place_of(&self, value: &ValueRef, frame: &Frame) -> Result<Place> {
        match value {
            ValueRef::Var(name) => match frame.vars.get(name) {
                Some(Binding::Place(place)) => Ok(place.clone()),
                Some(Binding::Value(_)) => Err(EvalError::NotAddressable(name.clone())),
                None => Err(EvalError::UnboundName(name.clone())),
            },
            ValueRef::ReturnValue => frame
                .ret
                .clone()
                .ok_or_else(|| EvalError::UnboundName(value.to_string())),
            ValueRef::Field {
                base,
                field,
                through_pointer,
            } => {
                let base_place = if *through_pointer {
                    Self::deref(self.value_of(base, frame)?, base)?
                } else {
                    self.place_of(base, frame)?
                };
                Ok(base_place.field(field))
            }
            ValueRef::Deref(inner) => Self::deref(self.value_of(inner, frame)?, inner),
            ValueRef::AddrOf(_) => Err(EvalError::NotAddressable(value.to_string())),
        }
    }

    fn value_of(&self, value: &ValueRef, frame: &Frame) -> Result<RtValue> {
        match value {
            ValueRef::Var(name) => match frame.vars.get(name) {
                Some(Binding::Place(place)) => self.heap.load(place).cloned(),
                Some(Binding::Value(v)) => Ok(v.clone()),
                None => Err(EvalError::UnboundName(name.clone())),
            },
            ValueRef::AddrOf(inner) => Ok(RtValue::to(self.place_of(inner, frame)?)),
            ValueRef::ReturnValue | ValueRef::Field { .. } | ValueRef::Deref(_) => {
                let place = self.place_of(value, frame)?;
                self.heap.load(&place).cloned()
            }
        }
    }
}
