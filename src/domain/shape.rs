//! Node-shape definitions: the construction input of a form.
//!
//! A shape says what kind of node to build and how to validate it. Shapes are
//! plain values, built once and then bound to a form by [`crate::domain::Form::create`].

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::domain::mapper::Mapper;
use crate::domain::validator::{Validator, ValidatorSet};

#[derive(Clone, Debug)]
pub enum Shape {
    Leaf(LeafShape),
    Group(GroupShape),
    Collection(CollectionShape),
}

impl Shape {
    pub fn kind(&self) -> NodeKindName {
        match self {
            Shape::Leaf(_) => NodeKindName::Leaf,
            Shape::Group(_) => NodeKindName::Group,
            Shape::Collection(_) => NodeKindName::Collection,
        }
    }

    pub fn validators(&self) -> &ValidatorSet {
        match self {
            Shape::Leaf(s) => &s.validators,
            Shape::Group(s) => &s.validators,
            Shape::Collection(s) => &s.validators,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKindName {
    Leaf,
    Group,
    Collection,
}

impl fmt::Display for NodeKindName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKindName::Leaf => "leaf",
            NodeKindName::Group => "group",
            NodeKindName::Collection => "collection",
        };
        write!(f, "{}", name)
    }
}

/// Scalar (or opaque) value holder.
#[derive(Clone, Debug, Default)]
pub struct LeafShape {
    pub(crate) validators: ValidatorSet,
    pub(crate) default: Value,
}

impl LeafShape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn validators(mut self, validators: ValidatorSet) -> Self {
        self.validators = validators;
        self
    }

    /// Value used when the representation does not mention this field.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = value.into();
        self
    }
}

impl From<LeafShape> for Shape {
    fn from(shape: LeafShape) -> Self {
        Shape::Leaf(shape)
    }
}

/// Builds the node for a newly appended collection element, given the
/// collection's field key and the element's initial value.
#[derive(Clone)]
pub struct CollectionFactory(Rc<dyn Fn(&str, &Value) -> Shape>);

impl CollectionFactory {
    pub fn new(factory: impl Fn(&str, &Value) -> Shape + 'static) -> Self {
        Self(Rc::new(factory))
    }

    pub fn create(&self, key: &str, value: &Value) -> Shape {
        (self.0)(key, value)
    }
}

impl fmt::Debug for CollectionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionFactory").finish_non_exhaustive()
    }
}

/// One materializable alternative of a variant-bearing group.
#[derive(Clone, Debug)]
pub struct Variant {
    pub(crate) tag: Value,
    pub(crate) field: String,
    pub(crate) shape: Shape,
}

impl Variant {
    pub fn tag(&self) -> &Value {
        &self.tag
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }
}

/// Declares which child leaf selects the active variant subtree.
#[derive(Clone, Debug)]
pub struct VariantSpec {
    pub(crate) discriminant: String,
    pub(crate) variants: Vec<Variant>,
}

impl VariantSpec {
    pub fn on(discriminant: impl Into<String>) -> Self {
        Self {
            discriminant: discriminant.into(),
            variants: Vec::new(),
        }
    }

    /// When the discriminant equals `tag`, `shape` is materialized under `field`.
    pub fn variant(
        mut self,
        tag: impl Into<Value>,
        field: impl Into<String>,
        shape: impl Into<Shape>,
    ) -> Self {
        self.variants.push(Variant {
            tag: tag.into(),
            field: field.into(),
            shape: shape.into(),
        });
        self
    }

    pub fn discriminant(&self) -> &str {
        &self.discriminant
    }

    pub fn find(&self, tag: &Value) -> Option<&Variant> {
        self.variants.iter().find(|v| &v.tag == tag)
    }

    pub fn is_variant_field(&self, field: &str) -> bool {
        self.variants.iter().any(|v| v.field == field)
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }
}

/// Named children plus the mapper between the domain value and them.
#[derive(Clone, Debug, Default)]
pub struct GroupShape {
    pub(crate) children: Vec<(String, Shape)>,
    pub(crate) mapper: Mapper,
    pub(crate) validators: ValidatorSet,
    pub(crate) factory: Option<CollectionFactory>,
    pub(crate) variants: Option<VariantSpec>,
}

impl GroupShape {
    pub fn new(mapper: Mapper) -> Self {
        Self {
            mapper,
            ..Self::default()
        }
    }

    /// Declares a child; re-declaring a name replaces the earlier shape.
    pub fn child(mut self, name: impl Into<String>, shape: impl Into<Shape>) -> Self {
        let name = name.into();
        let shape = shape.into();
        match self.children.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = shape,
            None => self.children.push((name, shape)),
        }
        self
    }

    /// Cross-field validator, run against the group's domain value.
    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn collection_factory(mut self, factory: impl Fn(&str, &Value) -> Shape + 'static) -> Self {
        self.factory = Some(CollectionFactory::new(factory));
        self
    }

    pub fn variants(mut self, spec: VariantSpec) -> Self {
        self.variants = Some(spec);
        self
    }

    pub fn child_names(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|(n, _)| n.as_str())
    }

    pub fn child_shape(&self, name: &str) -> Option<&Shape> {
        self.children.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn variant_spec(&self) -> Option<&VariantSpec> {
        self.variants.as_ref()
    }
}

impl From<GroupShape> for Shape {
    fn from(shape: GroupShape) -> Self {
        Shape::Group(shape)
    }
}

/// Ordered sequence of structurally identical elements.
#[derive(Clone, Debug)]
pub struct CollectionShape {
    pub(crate) element: Box<Shape>,
    pub(crate) validators: ValidatorSet,
}

impl CollectionShape {
    pub fn new(element: impl Into<Shape>) -> Self {
        Self {
            element: Box::new(element.into()),
            validators: ValidatorSet::new(),
        }
    }

    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn element(&self) -> &Shape {
        &self.element
    }
}

impl From<CollectionShape> for Shape {
    fn from(shape: CollectionShape) -> Self {
        Shape::Collection(shape)
    }
}
