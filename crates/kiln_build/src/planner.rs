//! The batch planner: assigning candidate units to compiled-module slots.
//!
//! Candidates are grouped by required backend kind (different backends never
//! share a module), then packed greedily: each candidate goes into the first
//! open slot, in creation order, that can accept it, and a new slot opens when
//! none can. A slot refuses a candidate that produces partial-type fragments
//! when it is already at the batch size limit or when any fragment conflicts
//! with a same-named fragment it already holds. Code without partial types
//! has no cross-unit interaction and is accepted unconditionally.

use crate::error::BuildError;
use crate::provider::BuildProvider;
use crate::unit::{CodeUnit, Member, TypeDecl};
use kiln_common::VirtualPath;
use std::collections::HashMap;

/// An in-flight candidate for one build pass: a source path, its resolved
/// provider, and (once generated) its code unit and slot assignment.
pub(crate) struct BuildItem {
    pub path: VirtualPath,
    pub provider: Box<dyn BuildProvider>,
    pub backend_kind: String,
    pub unit: Option<CodeUnit>,
    pub slot: Option<usize>,
}

impl BuildItem {
    pub fn new(path: VirtualPath, provider: Box<dyn BuildProvider>) -> Self {
        let backend_kind = provider.backend_kind().to_string();
        Self {
            path,
            provider,
            backend_kind,
            unit: None,
            slot: None,
        }
    }
}

/// An accumulating compilation unit for one backend kind.
///
/// Holds the accepted candidates (as indices into the pass's item list) plus
/// an index of the partial-type fragments they declare, used for conflict
/// detection. Slots exist only during one build pass.
pub(crate) struct ModuleSlot {
    backend_kind: String,
    base_name: String,
    members: Vec<usize>,
    partial_index: HashMap<String, Vec<TypeDecl>>,
}

impl ModuleSlot {
    fn new(backend_kind: String, base_name: String) -> Self {
        Self {
            backend_kind,
            base_name,
            members: Vec::new(),
            partial_index: HashMap::new(),
        }
    }

    pub fn backend_kind(&self) -> &str {
        &self.backend_kind
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Item indices accepted into this slot, in acceptance order.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Whether `unit` may join this slot under the batch size limit.
    ///
    /// The size limit applies only to candidates producing partial-type
    /// fragments; non-partial code has no cross-unit interaction.
    fn can_accept(&self, unit: &CodeUnit, max_batch_size: usize) -> bool {
        let fragments: Vec<&TypeDecl> = unit.partial_types().collect();
        if fragments.is_empty() {
            return true;
        }
        if self.members.len() >= max_batch_size {
            return false;
        }
        for fragment in fragments {
            if let Some(existing) = self.partial_index.get(&fragment.name) {
                if existing.iter().any(|e| fragments_conflict(e, fragment)) {
                    return false;
                }
            }
        }
        true
    }

    fn accept(&mut self, item_index: usize, unit: &CodeUnit) {
        for fragment in unit.partial_types() {
            self.partial_index
                .entry(fragment.name.clone())
                .or_default()
                .push(fragment.clone());
        }
        self.members.push(item_index);
    }
}

/// The planner's output: every opened slot, in creation order.
pub(crate) struct BatchPlan {
    slots: Vec<ModuleSlot>,
}

impl BatchPlan {
    pub fn slots(&self) -> &[ModuleSlot] {
        &self.slots
    }
}

/// Assigns each candidate to a module slot, generating code on first need.
///
/// `skip` drops a candidate from the pass entirely (used to re-filter
/// component candidates against the cache under the scope lock); `generate`
/// produces the candidate's code unit and is only called when it is still
/// missing.
pub(crate) fn plan_batches(
    items: &mut [BuildItem],
    max_batch_size: usize,
    base_name: Option<&str>,
    mut skip: impl FnMut(&BuildItem) -> bool,
    mut generate: impl FnMut(&mut BuildItem) -> Result<CodeUnit, BuildError>,
) -> Result<BatchPlan, BuildError> {
    let mut plan = BatchPlan { slots: Vec::new() };

    for index in 0..items.len() {
        if items[index].slot.is_some() || skip(&items[index]) {
            continue;
        }
        if items[index].unit.is_none() {
            let unit = generate(&mut items[index])?;
            items[index].unit = Some(unit);
        }

        let item = &items[index];
        let Some(unit) = item.unit.as_ref() else {
            continue;
        };

        let existing = plan.slots.iter().position(|slot| {
            slot.backend_kind == item.backend_kind && slot.can_accept(unit, max_batch_size)
        });
        let slot_index = match existing {
            Some(slot_index) => slot_index,
            None => {
                let ordinal = plan
                    .slots
                    .iter()
                    .filter(|s| s.backend_kind == item.backend_kind)
                    .count();
                let name = format!("{}_{ordinal}", base_name.unwrap_or(&item.backend_kind));
                plan.slots
                    .push(ModuleSlot::new(item.backend_kind.clone(), name));
                plan.slots.len() - 1
            }
        };

        plan.slots[slot_index].accept(index, unit);
        items[index].slot = Some(slot_index);
    }

    Ok(plan)
}

/// Whether two same-named partial fragments cannot be merged into one type.
///
/// A member pair with the same name conflicts unless it is a tolerated
/// duplicate: two fields of identical type (the backend collapses them) or
/// two methods with identical parameter lists (an identical overload).
pub(crate) fn fragments_conflict(a: &TypeDecl, b: &TypeDecl) -> bool {
    for mb in &b.members {
        for ma in &a.members {
            if ma.name() == mb.name() && !tolerated_duplicate(ma, mb) {
                return true;
            }
        }
    }
    false
}

fn tolerated_duplicate(a: &Member, b: &Member) -> bool {
    match (a, b) {
        (Member::Field { ty: ta, .. }, Member::Field { ty: tb, .. }) => ta == tb,
        (Member::Method { params: pa, .. }, Member::Method { params: pb, .. }) => pa == pb,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stock::DirectiveProvider;

    fn vp(s: &str) -> VirtualPath {
        VirtualPath::new(s).unwrap()
    }

    fn method(name: &str, params: &[&str]) -> Member {
        Member::Method {
            name: name.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn field(name: &str, ty: &str) -> Member {
        Member::Field {
            name: name.to_string(),
            ty: ty.to_string(),
        }
    }

    fn partial(name: &str, members: Vec<Member>) -> TypeDecl {
        TypeDecl {
            name: name.to_string(),
            is_partial: true,
            members,
        }
    }

    fn item(path: &str, backend: &str, types: Vec<TypeDecl>) -> BuildItem {
        let path = vp(path);
        let mut item = BuildItem::new(path.clone(), Box::new(DirectiveProvider::new(path.clone())));
        item.backend_kind = backend.to_string();
        item.unit = Some(CodeUnit { source: path, types });
        item
    }

    fn plan(items: &mut [BuildItem], max: usize) -> BatchPlan {
        plan_batches(items, max, None, |_| false, |_| {
            panic!("units are pre-generated in planner tests")
        })
        .unwrap()
    }

    #[test]
    fn compatible_siblings_share_one_slot() {
        let mut items = vec![
            item("/s/a.page", "template", vec![partial("APage", vec![])]),
            item("/s/b.page", "template", vec![partial("BPage", vec![])]),
            item("/s/c.page", "template", vec![partial("CPage", vec![])]),
        ];
        let plan = plan(&mut items, 10);
        assert_eq!(plan.slots().len(), 1);
        assert_eq!(plan.slots()[0].members(), &[0, 1, 2]);
        assert_eq!(plan.slots()[0].base_name(), "template_0");
    }

    #[test]
    fn different_backends_never_share() {
        let mut items = vec![
            item("/s/a.page", "template", vec![partial("APage", vec![])]),
            item("/s/b.page", "native", vec![partial("BPage", vec![])]),
        ];
        let plan = plan(&mut items, 10);
        assert_eq!(plan.slots().len(), 2);
        assert_eq!(plan.slots()[0].backend_kind(), "template");
        assert_eq!(plan.slots()[1].backend_kind(), "native");
    }

    #[test]
    fn batch_size_bound_splits_slots() {
        let mut items: Vec<BuildItem> = (0..5)
            .map(|i| {
                item(
                    &format!("/s/p{i}.page"),
                    "template",
                    vec![partial(&format!("P{i}"), vec![])],
                )
            })
            .collect();
        let plan = plan(&mut items, 2);
        assert_eq!(plan.slots().len(), 3);
        for slot in plan.slots() {
            assert!(slot.members().len() <= 2);
        }
    }

    #[test]
    fn size_limit_ignores_non_partial_units() {
        let mut items = vec![
            item("/s/a.svc", "template", vec![]),
            item("/s/b.svc", "template", vec![]),
            item("/s/c.svc", "template", vec![]),
        ];
        let plan = plan(&mut items, 1);
        // Declarative stubs have no partial fragments, so the limit never bites.
        assert_eq!(plan.slots().len(), 1);
        assert_eq!(plan.slots()[0].members().len(), 3);
    }

    #[test]
    fn conflicting_overloads_split_slots() {
        let mut items = vec![
            item("/s/a.page", "template", vec![partial("APage", vec![])]),
            item(
                "/s/b.page",
                "template",
                vec![
                    partial("BPage", vec![]),
                    partial("T", vec![method("M", &["int"])]),
                ],
            ),
            item(
                "/s/c.page",
                "template",
                vec![
                    partial("CPage", vec![]),
                    partial("T", vec![method("M", &["string"])]),
                ],
            ),
        ];
        let plan = plan(&mut items, 10);
        assert_eq!(plan.slots().len(), 2);
        assert_eq!(plan.slots()[0].members(), &[0, 1]);
        assert_eq!(plan.slots()[1].members(), &[2]);
    }

    #[test]
    fn identical_overloads_are_tolerated() {
        let mut items = vec![
            item(
                "/s/a.page",
                "template",
                vec![partial("T", vec![method("M", &["int", "string"])])],
            ),
            item(
                "/s/b.page",
                "template",
                vec![partial("T", vec![method("M", &["int", "string"])])],
            ),
        ];
        let plan = plan(&mut items, 10);
        assert_eq!(plan.slots().len(), 1);
    }

    #[test]
    fn same_name_different_arity_conflicts() {
        let a = partial("T", vec![method("M", &["int"])]);
        let b = partial("T", vec![method("M", &["int", "int"])]);
        assert!(fragments_conflict(&a, &b));
    }

    #[test]
    fn identical_fields_are_tolerated() {
        let a = partial("T", vec![field("title", "string")]);
        let b = partial("T", vec![field("title", "string")]);
        assert!(!fragments_conflict(&a, &b));
    }

    #[test]
    fn differently_typed_fields_conflict() {
        let a = partial("T", vec![field("title", "string")]);
        let b = partial("T", vec![field("title", "int")]);
        assert!(fragments_conflict(&a, &b));
    }

    #[test]
    fn cross_category_name_clash_conflicts() {
        let a = partial("T", vec![field("Render", "string")]);
        let b = partial("T", vec![method("Render", &["int"])]);
        assert!(fragments_conflict(&a, &b));
        let c = partial("T", vec![Member::Other {
            name: "Render".to_string(),
        }]);
        assert!(fragments_conflict(&a, &c));
    }

    #[test]
    fn different_type_names_never_conflict() {
        let a = partial("T", vec![method("M", &["int"])]);
        let b = partial("U", vec![method("M", &["string"])]);
        assert!(!fragments_conflict(&a, &b));
        // And the planner keeps them together.
        let mut items = vec![
            item("/s/a.page", "template", vec![a]),
            item("/s/b.page", "template", vec![b]),
        ];
        let plan = plan(&mut items, 10);
        assert_eq!(plan.slots().len(), 1);
    }

    #[test]
    fn skipped_items_get_no_slot() {
        let mut items = vec![
            item("/s/a.frag", "template", vec![partial("A", vec![])]),
            item("/s/b.frag", "template", vec![partial("B", vec![])]),
        ];
        let plan = plan_batches(&mut items, 10, None, |it| it.path == vp("/s/a.frag"), |_| {
            panic!("units are pre-generated")
        })
        .unwrap();
        assert_eq!(plan.slots().len(), 1);
        assert_eq!(plan.slots()[0].members(), &[1]);
        assert!(items[0].slot.is_none());
    }

    #[test]
    fn generation_runs_once_per_item() {
        let path = vp("/s/a.svc");
        let mut items = vec![BuildItem::new(
            path.clone(),
            Box::new(DirectiveProvider::new(path.clone())),
        )];
        let mut calls = 0;
        let plan = plan_batches(&mut items, 10, None, |_| false, |it| {
            calls += 1;
            Ok(CodeUnit::declarative(it.path.clone()))
        })
        .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(plan.slots().len(), 1);
        assert_eq!(items[0].slot, Some(0));
    }

    #[test]
    fn custom_base_name() {
        let mut items = vec![item("/themes/dark", "template", vec![])];
        let plan = plan_batches(&mut items, 10, Some("theme"), |_| false, |_| {
            panic!("units are pre-generated")
        })
        .unwrap();
        assert_eq!(plan.slots()[0].base_name(), "theme_0");
    }
}
