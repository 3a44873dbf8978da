//! Remapper: the per-group variant state machine.
//!
//! States are `Unselected` plus one per declared variant. A discriminant
//! change tears down the materialized variant subtree and builds the new one
//! fresh, seeded only with the fields both variants declare.

use generational_arena::Index;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::domain::arena::{FormArena, VariantState};
use crate::domain::builder;
use crate::domain::error::FormResult;
use crate::domain::mapper::Representation;
use crate::domain::shape::{Shape, Variant, VariantSpec};
use crate::domain::sync::{self, Pass};

fn current_state(arena: &FormArena, group: Index) -> VariantState {
    arena
        .node(group)
        .as_group()
        .map(|g| g.state.clone())
        .unwrap_or(VariantState::Unselected)
}

fn discriminant_value(arena: &FormArena, group: Index, spec: &VariantSpec) -> Value {
    arena
        .node(group)
        .as_group()
        .and_then(|g| g.child(spec.discriminant()))
        .map(|leaf| arena.node(leaf).value.clone())
        .unwrap_or(Value::Null)
}

/// Index of the group whose discriminant is the leaf at `leaf`, if any.
pub(crate) fn owning_variant_group(arena: &FormArena, leaf: Index) -> Option<Index> {
    let parent = arena.node(leaf).parent?;
    let group = arena.node(parent).as_group()?;
    let spec = group.variants.as_ref()?;
    (group.child(spec.discriminant()) == Some(leaf)).then_some(parent)
}

/// Destroys the active variant subtree and returns the group to `Unselected`.
fn tear_down(arena: &mut FormArena, group: Index, pass: &mut Pass) {
    let VariantState::Active { field, .. } = current_state(arena, group) else {
        return;
    };
    let Some(child) = arena.node(group).as_group().and_then(|g| g.child(&field)) else {
        return;
    };
    if let Some(g) = arena.node_mut(group).as_group_mut() {
        g.children.retain(|(name, _)| *name != field);
        g.state = VariantState::Unselected;
    }
    let removed = arena.remove_subtree(child);
    pass.mark_removed(removed);
    debug!(variant = %field, "tore down variant subtree");
}

fn materialize(
    arena: &mut FormArena,
    group: Index,
    variant: &Variant,
    seed: Materialize<'_>,
    pass: &mut Pass,
) -> FormResult<()> {
    let path = arena.path_of(group).field(variant.field());
    let factory = arena.node(group).as_group().and_then(|g| g.factory.clone());
    let child = match (seed, variant.shape()) {
        (Materialize::Carried(rep), Shape::Group(shape)) => {
            builder::build_group(arena, shape, rep, Some(group), &path)?
        }
        (Materialize::Carried(_), shape) => {
            builder::build_node(arena, shape, None, Some(group), &path, factory.as_ref())?
        }
        (Materialize::Domain(value), shape) => {
            builder::build_node(arena, shape, Some(value), Some(group), &path, factory.as_ref())?
        }
    };
    builder::push_child(arena, group, variant.field(), child);
    if let Some(g) = arena.node_mut(group).as_group_mut() {
        g.state = VariantState::Active {
            tag: variant.tag().clone(),
            field: variant.field().to_string(),
        };
    }
    pass.structural = true;
    Ok(())
}

enum Materialize<'a> {
    /// Representation of the new variant built from carried fields
    Carried(&'a Representation),
    /// Full domain value of the variant, from an external write
    Domain(&'a Value),
}

/// Fields of `old` that the new variant also declares.
fn shared_fields(old: &Value, variant: &Variant) -> Representation {
    let mut carried = Representation::new();
    let (Value::Object(old), Shape::Group(shape)) = (old, variant.shape()) else {
        return carried;
    };
    for name in shape.child_names() {
        if let Some(value) = old.get(name) {
            carried.insert(name.to_string(), value.clone());
        }
    }
    carried
}

/// User-driven transition after the discriminant leaf of `group` changed.
#[instrument(level = "debug", skip(arena, pass))]
pub(crate) fn transition(arena: &mut FormArena, group: Index, pass: &mut Pass) -> FormResult<()> {
    let Some(spec) = arena.node(group).as_group().and_then(|g| g.variants.clone()) else {
        return Ok(());
    };
    let tag = discriminant_value(arena, group, &spec);
    let state = current_state(arena, group);
    if let VariantState::Active { tag: active, .. } = &state {
        if *active == tag {
            return Ok(());
        }
    }
    if tag.is_null() {
        tear_down(arena, group, pass);
        return Ok(());
    }
    let variant = spec
        .find(&tag)
        .ok_or_else(|| builder::unknown_variant(&arena.path_of(group), spec.discriminant(), &tag))?
        .clone();

    // The old variant's children values, read before teardown.
    let old = match &state {
        VariantState::Active { field, .. } => arena
            .node(group)
            .as_group()
            .and_then(|g| g.child(field))
            .map(|child| sync::group_representation(arena, child))
            .map(Value::Object)
            .unwrap_or(Value::Null),
        VariantState::Unselected => Value::Null,
    };
    let carried = shared_fields(&old, &variant);
    tear_down(arena, group, pass);
    materialize(arena, group, &variant, Materialize::Carried(&carried), pass)?;
    debug!(
        path = %arena.path_of(group),
        variant = %variant.field(),
        carried = carried.len(),
        "remapped variant"
    );
    if sync::recompute(arena, group)? {
        pass.mark_changed(group);
    }
    Ok(())
}

/// Variant handling for a programmatic write: the discriminant child has
/// already been written; `rep` is the group's full representation.
pub(crate) fn apply_written(
    arena: &mut FormArena,
    group: Index,
    spec: &VariantSpec,
    rep: &Representation,
    pass: &mut Pass,
) -> FormResult<()> {
    let tag = discriminant_value(arena, group, spec);
    if tag.is_null() {
        tear_down(arena, group, pass);
        return Ok(());
    }
    let variant = spec
        .find(&tag)
        .ok_or_else(|| builder::unknown_variant(&arena.path_of(group), spec.discriminant(), &tag))?;
    let seed = rep.get(variant.field()).cloned().unwrap_or(Value::Null);

    match current_state(arena, group) {
        VariantState::Active { tag: active, field } if active == tag => {
            let child = arena.node(group).as_group().and_then(|g| g.child(&field));
            if let Some(child) = child {
                sync::write_down(arena, child, &seed, pass)?;
            }
            Ok(())
        }
        _ => {
            tear_down(arena, group, pass);
            materialize(arena, group, variant, Materialize::Domain(&seed), pass)?;
            debug!(path = %arena.path_of(group), variant = %variant.field(), "variant replaced by write");
            Ok(())
        }
    }
}

