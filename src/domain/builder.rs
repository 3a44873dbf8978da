//! Node construction: materializes shapes into the arena.
//!
//! Every builder either returns a fully settled subtree or removes whatever it
//! inserted before returning the error.

use generational_arena::Index;
use serde_json::Value;
use tracing::{instrument, trace};

use crate::domain::arena::{CollectionNode, FormArena, FormNode, GroupNode, NodeKind, VariantState};
use crate::domain::error::{FormError, FormResult};
use crate::domain::mapper::Representation;
use crate::domain::path::FieldPath;
use crate::domain::shape::{CollectionFactory, CollectionShape, GroupShape, LeafShape, Shape};
use crate::domain::sync;

/// Builds `shape` under `parent`. A missing `seed` means "use defaults".
///
/// `factory` is the owning group's collection factory; only collections use it.
pub(crate) fn build_node(
    arena: &mut FormArena,
    shape: &Shape,
    seed: Option<&Value>,
    parent: Option<Index>,
    path: &FieldPath,
    factory: Option<&CollectionFactory>,
) -> FormResult<Index> {
    match shape {
        Shape::Leaf(leaf) => Ok(build_leaf(arena, leaf, seed, parent)),
        Shape::Group(group) => {
            let domain = seed.cloned().unwrap_or(Value::Null);
            let rep = group
                .mapper
                .to_representation(&domain)
                .map_err(|e| e.at(path))?;
            build_group(arena, group, &rep, parent, path)
        }
        Shape::Collection(collection) => {
            build_collection(arena, collection, seed, parent, path, factory)
        }
    }
}

fn build_leaf(
    arena: &mut FormArena,
    shape: &LeafShape,
    seed: Option<&Value>,
    parent: Option<Index>,
) -> Index {
    let mut node = FormNode::new(
        NodeKind::Leaf {
            default: shape.default.clone(),
        },
        parent,
        shape.validators.clone(),
    );
    node.value = seed.cloned().unwrap_or_else(|| shape.default.clone());
    node.errors = node.validators.run(&node.value);
    arena.insert_node(node)
}

/// Builds a group straight from its representation.
#[instrument(level = "trace", skip(arena, shape, rep), fields(path = %path))]
pub(crate) fn build_group(
    arena: &mut FormArena,
    shape: &GroupShape,
    rep: &Representation,
    parent: Option<Index>,
    path: &FieldPath,
) -> FormResult<Index> {
    check_group_shape(shape, path)?;
    check_representation(shape, rep, path)?;

    let node = FormNode::new(
        NodeKind::Group(GroupNode {
            children: Vec::new(),
            mapper: shape.mapper.clone(),
            factory: shape.factory.clone(),
            variants: shape.variants.clone(),
            state: VariantState::Unselected,
        }),
        parent,
        shape.validators.clone(),
    );
    let idx = arena.insert_node(node);

    match populate_group(arena, idx, shape, rep, path) {
        Ok(()) => Ok(idx),
        Err(e) => {
            arena.remove_subtree(idx);
            Err(e)
        }
    }
}

fn populate_group(
    arena: &mut FormArena,
    idx: Index,
    shape: &GroupShape,
    rep: &Representation,
    path: &FieldPath,
) -> FormResult<()> {
    for (name, child_shape) in &shape.children {
        let child = build_node(
            arena,
            child_shape,
            rep.get(name),
            Some(idx),
            &path.field(name),
            shape.factory.as_ref(),
        )?;
        push_child(arena, idx, name, child);
    }

    if let Some(spec) = &shape.variants {
        let tag = arena
            .node(idx)
            .as_group()
            .and_then(|g| g.child(&spec.discriminant))
            .map(|disc| arena.node(disc).value.clone())
            .unwrap_or(Value::Null);
        if !tag.is_null() {
            let variant = spec
                .find(&tag)
                .ok_or_else(|| unknown_variant(path, &spec.discriminant, &tag))?;
            trace!(path = %path, variant = %variant.field, "materializing initial variant");
            let child = build_node(
                arena,
                &variant.shape,
                rep.get(&variant.field),
                Some(idx),
                &path.field(&variant.field),
                shape.factory.as_ref(),
            )?;
            push_child(arena, idx, &variant.field, child);
            if let Some(group) = arena.node_mut(idx).as_group_mut() {
                group.state = VariantState::Active {
                    tag,
                    field: variant.field.clone(),
                };
            }
        }
    }

    sync::recompute(arena, idx)?;
    Ok(())
}

fn build_collection(
    arena: &mut FormArena,
    shape: &CollectionShape,
    seed: Option<&Value>,
    parent: Option<Index>,
    path: &FieldPath,
    factory: Option<&CollectionFactory>,
) -> FormResult<Index> {
    let values = collection_values(seed.unwrap_or(&Value::Null), path)?;
    let key = path.last().map(|s| s.to_string()).unwrap_or_default();
    let node = FormNode::new(
        NodeKind::Collection(CollectionNode {
            items: Vec::new(),
            element: (*shape.element).clone(),
            key,
            factory: factory.cloned(),
        }),
        parent,
        shape.validators.clone(),
    );
    let idx = arena.insert_node(node);

    let result = values.iter().enumerate().try_for_each(|(i, value)| {
        let element = arena
            .node(idx)
            .as_collection()
            .map(|c| c.element_shape(value))
            .unwrap_or_else(|| (*shape.element).clone());
        let item = build_node(arena, &element, Some(value), Some(idx), &path.index(i), None)?;
        if let Some(collection) = arena.node_mut(idx).as_collection_mut() {
            collection.items.push(item);
        }
        Ok(())
    });
    match result.and_then(|()| sync::recompute(arena, idx)) {
        Ok(_) => Ok(idx),
        Err(e) => {
            arena.remove_subtree(idx);
            Err(e)
        }
    }
}

/// Element values of a collection seed; `null` is the empty collection.
pub(crate) fn collection_values(value: &Value, path: &FieldPath) -> FormResult<Vec<Value>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items.clone()),
        other => Err(FormError::ValueMismatch {
            path: path.clone(),
            expected: "array",
            found: describe_value(other),
        }),
    }
}

pub(crate) fn push_child(arena: &mut FormArena, group: Index, name: &str, child: Index) {
    if let Some(group) = arena.node_mut(group).as_group_mut() {
        group.children.push((name.to_string(), child));
    }
}

pub(crate) fn unknown_variant(path: &FieldPath, discriminant: &str, tag: &Value) -> FormError {
    FormError::UnknownVariant {
        path: path.clone(),
        discriminant: discriminant.to_string(),
        value: tag.to_string(),
    }
}

fn describe_value(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() > 40 {
        format!("{}...", text.chars().take(40).collect::<String>())
    } else {
        text
    }
}

/// Declaration-level checks: the discriminant must be a declared leaf and
/// variant fields must not shadow children.
fn check_group_shape(shape: &GroupShape, path: &FieldPath) -> FormResult<()> {
    let Some(spec) = &shape.variants else {
        return Ok(());
    };
    match shape.child_shape(&spec.discriminant) {
        Some(Shape::Leaf(_)) => {}
        Some(_) => {
            return Err(FormError::InvalidShape {
                path: path.clone(),
                reason: format!("discriminant `{}` must be a leaf", spec.discriminant),
            })
        }
        None => {
            return Err(FormError::InvalidShape {
                path: path.clone(),
                reason: format!("discriminant `{}` is not a declared child", spec.discriminant),
            })
        }
    }
    if let Some(clash) = spec
        .variants
        .iter()
        .find(|v| shape.child_shape(&v.field).is_some())
    {
        return Err(FormError::InvalidShape {
            path: path.clone(),
            reason: format!("variant field `{}` collides with a declared child", clash.field),
        });
    }
    Ok(())
}

/// Every field the mapper produced must have somewhere to go.
pub(crate) fn check_representation(
    shape: &GroupShape,
    rep: &Representation,
    path: &FieldPath,
) -> FormResult<()> {
    for key in rep.keys() {
        let declared = shape.child_shape(key).is_some()
            || shape
                .variants
                .as_ref()
                .is_some_and(|spec| spec.is_variant_field(key));
        if !declared {
            return Err(FormError::ShapeMismatch {
                path: path.clone(),
                field: key.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mapper::Mapper;
    use crate::domain::shape::VariantSpec;
    use crate::domain::validator::Required;
    use serde_json::json;

    fn person() -> GroupShape {
        GroupShape::new(Mapper::identity())
            .child("name", LeafShape::new().validator(Required))
            .child("age", LeafShape::new().default_value(0))
    }

    #[test]
    fn given_missing_field_when_building_then_leaf_default_used() {
        let mut arena = FormArena::new();
        let root = build_node(
            &mut arena,
            &person().into(),
            Some(&json!({ "name": "Leia" })),
            None,
            &FieldPath::root(),
            None,
        )
        .unwrap();
        assert_eq!(arena.node(root).value, json!({ "name": "Leia", "age": 0 }));
    }

    #[test]
    fn given_undeclared_field_when_building_then_shape_mismatch_and_nothing_left() {
        let mut arena = FormArena::new();
        let err = build_node(
            &mut arena,
            &person().into(),
            Some(&json!({ "name": "Leia", "planet": "Alderaan" })),
            None,
            &FieldPath::root(),
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            FormError::ShapeMismatch {
                path: FieldPath::root(),
                field: "planet".into()
            }
        );
        assert!(arena.is_empty());
    }

    #[test]
    fn given_non_array_seed_when_building_collection_then_value_mismatch() {
        let mut arena = FormArena::new();
        let shape: Shape = CollectionShape::new(LeafShape::new()).into();
        let err = build_node(&mut arena, &shape, Some(&json!("x")), None, &FieldPath::root(), None)
            .unwrap_err();
        assert!(matches!(err, FormError::ValueMismatch { expected: "array", .. }));
        assert!(arena.is_empty());
    }

    #[test]
    fn given_discriminant_not_a_leaf_when_building_then_invalid_shape() {
        let shape = GroupShape::new(Mapper::identity())
            .child("kind", GroupShape::new(Mapper::identity()))
            .variants(VariantSpec::on("kind"));
        let mut arena = FormArena::new();
        let err = build_group(&mut arena, &shape, &Representation::new(), None, &FieldPath::root())
            .unwrap_err();
        assert!(matches!(err, FormError::InvalidShape { .. }));
    }
}
