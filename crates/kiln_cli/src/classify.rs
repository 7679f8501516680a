//! `kiln classify` — show how a virtual path classifies.

use std::path::Path;

use kiln_build::classify;
use kiln_common::VirtualPath;
use kiln_config::resolve_scope;

use crate::{Cli, ClassifyArgs};

/// Runs the `kiln classify` command.
///
/// Prints the path's build kind and, where one is configured, the provider
/// kind that would build it. Returns exit code 0 on success.
pub fn run(args: &ClassifyArgs, global: &Cli) -> Result<i32, Box<dyn std::error::Error>> {
    let line = describe(Path::new(&global.root), &args.path)?;
    println!("{line}");
    Ok(0)
}

fn describe(root: &Path, path: &str) -> Result<String, Box<dyn std::error::Error>> {
    let config = kiln_config::load_config(root)?;
    let path = VirtualPath::new(path)?;
    let kind = classify(&path);
    let scope = resolve_scope(&config, &path);

    let provider = path
        .extension()
        .and_then(|ext| scope.provider_for(ext))
        .map(|kind| format!(" provider={kind}"))
        .unwrap_or_default();
    let scope_note = scope
        .scope
        .as_deref()
        .map(|s| format!(" scope={s}"))
        .unwrap_or_default();

    Ok(format!("{} kind={}{provider}{scope_note}", path, kind.as_str()))
}
