//! `kiln plan` — dry-run the batch plan for a virtual path.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use kiln_build::{
    BackendError, BackendRegistry, BuildManager, CompileBackend, CompileBatch, CompiledModule,
    PlanReport, ProviderRegistry, TEMPLATE_BACKEND,
};
use kiln_common::ModuleRef;
use kiln_vfs::DiskFs;

use crate::{Cli, PlanArgs, ReportFormat};

/// Backend standing in for the real compiler during a dry run.
///
/// `kiln plan` never compiles the target, but `#require` directives still
/// trigger nested builds, so the plan needs a backend that can mint module
/// handles for those.
struct PlanBackend {
    seq: AtomicUsize,
}

impl CompileBackend for PlanBackend {
    fn compile(
        &self,
        batch: &CompileBatch,
        _referenced: &[ModuleRef],
    ) -> Result<Option<CompiledModule>, BackendError> {
        if batch.units.iter().all(|u| u.is_declarative()) {
            return Ok(None);
        }
        let n = self.seq.fetch_add(1, Ordering::SeqCst);
        Ok(Some(CompiledModule {
            reference: ModuleRef::new(format!("{}+{n}", batch.base_name)),
            types: batch
                .units
                .iter()
                .flat_map(|u| u.types.iter().map(|t| t.name.clone()))
                .collect(),
        }))
    }
}

/// Runs the `kiln plan` command.
///
/// Returns exit code 0 on success, 1 on error.
pub fn run(args: &PlanArgs, global: &Cli) -> Result<i32, Box<dyn std::error::Error>> {
    let report = plan_report(Path::new(&global.root), &args.path)?;

    match args.format {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        ReportFormat::Text => render_text(&report, global.quiet),
    }

    Ok(0)
}

/// Builds a manager over the site root and plans the target's build pass.
fn plan_report(root: &Path, path: &str) -> Result<PlanReport, Box<dyn std::error::Error>> {
    let config = kiln_config::load_config(root)?;
    let backends = BackendRegistry::new().with(
        TEMPLATE_BACKEND,
        Arc::new(PlanBackend {
            seq: AtomicUsize::new(0),
        }),
    );
    let manager = BuildManager::new(
        Arc::new(DiskFs::new(root)),
        config,
        ProviderRegistry::with_stock(),
        backends,
    )?;
    Ok(manager.plan(path)?)
}

fn render_text(report: &PlanReport, quiet: bool) {
    if !quiet {
        eprintln!("  Planning {} ({})", report.target, report.kind.as_str());
    }
    if report.slots.is_empty() {
        println!("nothing to compile");
        return;
    }
    for slot in &report.slots {
        println!(
            "module {} [backend {}] ({} unit{})",
            slot.base_name,
            slot.backend_kind,
            slot.members.len(),
            if slot.members.len() == 1 { "" } else { "s" }
        );
        for member in &slot.members {
            println!("    {member}");
        }
    }
}
