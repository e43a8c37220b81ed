//! Custom check specifications: `name`, `name()` or `name(a, &b, *c)`.

use std::fmt;
use std::str::FromStr;

use xcheck_ir::{ParamType, Scope, ScopedValue, Signature, Type, ValueRef};

use crate::error::CheckError;

/// How an identifier is passed to a custom function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgMode {
    Value,
    AddrOf,
    Deref,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomArg {
    pub mode: ArgMode,
    pub name: String,
}

impl fmt::Display for CustomArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            ArgMode::Value => f.write_str(&self.name),
            ArgMode::AddrOf => write!(f, "&{}", self.name),
            ArgMode::Deref => write!(f, "*{}", self.name),
        }
    }
}

/// Parsed custom check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomSpec {
    pub function: String,
    /// `None` for a bare name without parentheses.
    pub args: Option<Vec<CustomArg>>,
}

/// Resolved call of a custom function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomCall {
    pub function: String,
    pub args: Vec<ValueRef>,
    pub signature: Signature,
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl FromStr for CustomSpec {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| CheckError::MalformedCustom {
            spec: s.to_string(),
            reason: reason.to_string(),
        };
        let text = s.trim();
        let (function, rest) = match text.find('(') {
            Some(idx) => (text[..idx].trim(), Some(&text[idx + 1..])),
            None => (text, None),
        };
        if !is_ident(function) {
            return Err(malformed("expected a function name"));
        }
        let args = match rest {
            None => None,
            Some(rest) => {
                let inner = rest
                    .trim_end()
                    .strip_suffix(')')
                    .ok_or_else(|| malformed("missing `)`"))?;
                if inner.trim().is_empty() {
                    Some(Vec::new())
                } else {
                    let args = inner
                        .split(',')
                        .map(|arg| {
                            let arg = arg.trim();
                            let (mode, name) = if let Some(n) = arg.strip_prefix('&') {
                                (ArgMode::AddrOf, n.trim_start())
                            } else if let Some(n) = arg.strip_prefix('*') {
                                (ArgMode::Deref, n.trim_start())
                            } else {
                                (ArgMode::Value, arg)
                            };
                            if is_ident(name) {
                                Ok(CustomArg {
                                    mode,
                                    name: name.to_string(),
                                })
                            } else {
                                Err(malformed("expected an identifier argument"))
                            }
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    Some(args)
                }
            }
        };
        Ok(Self {
            function: function.to_string(),
            args,
        })
    }
}

impl fmt::Display for CustomSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.function)?;
        if let Some(args) = &self.args {
            f.write_str("(")?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{arg}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl CustomSpec {
    /// Resolve the argument list against `scope`.
    ///
    /// A bare name passes `checked` when there is one and nothing
    /// otherwise.
    pub fn resolve(
        &self,
        scope: &Scope,
        checked: Option<&ScopedValue>,
    ) -> Result<CustomCall, CheckError> {
        let Some(args) = &self.args else {
            let (args, params) = checked.map_or_else(
                || (Vec::new(), Vec::new()),
                |v| (vec![v.value.clone()], vec![ParamType::Value(v.ty.clone())]),
            );
            return Ok(CustomCall {
                function: self.function.clone(),
                args,
                signature: Signature::new(params),
            });
        };

        let mut values = Vec::with_capacity(args.len());
        let mut params = Vec::with_capacity(args.len());
        for arg in args {
            let bound = scope
                .lookup(&arg.name)
                .ok_or_else(|| CheckError::UnresolvedParameter {
                    name: arg.name.clone(),
                    spec: self.to_string(),
                })?;
            let (value, ty) = match arg.mode {
                ArgMode::Value => (bound.value.clone(), bound.ty.clone()),
                ArgMode::AddrOf => (
                    bound.value.clone().addr_of(),
                    Type::pointer_to(bound.ty.clone()),
                ),
                ArgMode::Deref => {
                    let pointee = bound
                        .ty
                        .pointee()
                        .filter(|t| !matches!(t, Type::Opaque(_)))
                        .ok_or_else(|| CheckError::MalformedCustom {
                            spec: self.to_string(),
                            reason: format!("`{}` is not a dereferenceable pointer", arg.name),
                        })?;
                    (bound.value.clone().deref(), pointee.clone())
                }
            };
            values.push(value);
            params.push(ParamType::Value(ty));
        }
        Ok(CustomCall {
            function: self.function.clone(),
            args: values,
            signature: Signature::new(params),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use xcheck_ir::ScalarKind;

    fn scope() -> Scope {
        let mut scope = Scope::new();
        scope.bind("len", ValueRef::var("len"), ScalarKind::U64.into());
        scope.bind(
            "buf",
            ValueRef::var("buf"),
            Type::pointer_to(ScalarKind::U8.into()),
        );
        scope
    }

    #[test]
    fn test_parse_forms() {
        let bare: CustomSpec = "check_len".parse().unwrap();
        assert_eq!(bare.args, None);

        let empty: CustomSpec = "check_len()".parse().unwrap();
        assert_eq!(empty.args, Some(Vec::new()));

        let full: CustomSpec = " hash_buf( buf , &len, *buf ) ".parse().unwrap();
        assert_eq!(full.function, "hash_buf");
        let modes: Vec<_> = full.args.unwrap().iter().map(|a| a.mode).collect();
        assert_eq!(modes, [ArgMode::Value, ArgMode::AddrOf, ArgMode::Deref]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<CustomSpec>().is_err());
        assert!("f(a".parse::<CustomSpec>().is_err());
        assert!("f(a b)".parse::<CustomSpec>().is_err());
        assert!("1f".parse::<CustomSpec>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        let spec: CustomSpec = "f(a,&b,*c)".parse().unwrap();
        assert_eq!(spec.to_string(), "f(a, &b, *c)");
    }

    #[test]
    fn test_resolve_modes() {
        let spec: CustomSpec = "hash_buf(*buf, &len)".parse().unwrap();
        let call = spec.resolve(&scope(), None).unwrap();
        assert_eq!(
            call.args,
            [ValueRef::var("buf").deref(), ValueRef::var("len").addr_of()]
        );
        assert_eq!(
            call.signature.params,
            [
                ParamType::Value(ScalarKind::U8.into()),
                ParamType::Value(Type::pointer_to(ScalarKind::U64.into())),
            ]
        );
    }

    #[test]
    fn test_bare_name_passes_checked_value() {
        let spec: CustomSpec = "check_len".parse().unwrap();
        let scope = scope();
        let checked = scope.lookup("len").unwrap();
        let call = spec.resolve(&scope, Some(checked)).unwrap();
        assert_eq!(call.args, [ValueRef::var("len")]);

        let call = spec.resolve(&scope, None).unwrap();
        assert!(call.args.is_empty());
    }

    #[test]
    fn test_unresolved_parameter() {
        let spec: CustomSpec = "f(len, missing)".parse().unwrap();
        let err = spec.resolve(&scope(), None).unwrap_err();
        assert_eq!(
            err,
            CheckError::UnresolvedParameter {
                name: "missing".to_string(),
                spec: "f(len, missing)".to_string(),
            }
        );
    }

    #[test]
    fn test_deref_of_non_pointer() {
        let mut scope = scope();
        scope.bind("ctx", ValueRef::var("ctx"), "void *".parse().unwrap());
        for text in ["f(*len)", "f(*ctx)"] {
            let spec: CustomSpec = text.parse().unwrap();
            assert!(
                matches!(
                    spec.resolve(&scope, None),
                    Err(CheckError::MalformedCustom { .. })
                ),
                "{text}"
            );
        }
        let spec: CustomSpec = "f(ctx)".parse().unwrap();
        assert!(spec.resolve(&scope, None).is_ok());
    }
}
