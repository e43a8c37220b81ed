//! Resolve command.

use std::path::{Path, PathBuf};

use tracing::error;
use xcheck::{CheckPoint, EngineOptions, Fingerprint, XCheck, XCheckTag, djb2_u64};

use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS};

fn tag_of(point: &CheckPoint) -> XCheckTag {
    match point {
        CheckPoint::Entry => XCheckTag::Entry,
        CheckPoint::Exit => XCheckTag::Exit,
        CheckPoint::Return => XCheckTag::Return,
        CheckPoint::Argument(_) => XCheckTag::Argument,
    }
}

/// Handle the `resolve` command.
pub fn cmd_resolve(
    configs: &[PathBuf],
    file: &str,
    function: &str,
    unit: Option<&Path>,
    point: &CheckPoint,
    options: &EngineOptions,
) -> i32 {
    let result = xcheck::load_config(configs).and_then(|store| {
        let unit = unit.map(xcheck::load_unit).transpose()?;
        let decl = xcheck::function_decl(unit.as_ref(), function)?;
        let check = xcheck::resolve(&store, options, file, &decl, point)?;
        let text = check.to_toml()?;
        Ok((check, text))
    });
    let (check, text) = match result {
        Ok(resolved) => resolved,
        Err(e) => {
            error!(error = %e, "resolution failed");
            return EXIT_FAILURE;
        }
    };

    println!("{function} {point}: {text}");
    // constant checks are known without running the program
    let constant = match &check {
        XCheck::Fixed(k) => Some(*k),
        XCheck::Djb2(s) => Some(djb2_u64(s)),
        XCheck::Default => match point {
            CheckPoint::Entry | CheckPoint::Exit => Some(djb2_u64(function)),
            _ => None,
        },
        XCheck::Disabled | XCheck::Custom(_) => None,
    };
    if let Some(value) = constant {
        println!("{}", Fingerprint::new(tag_of(point), value));
    }
    EXIT_SUCCESS
}
