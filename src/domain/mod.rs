//! Domain layer: the form composition engine
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod aggregate;
pub mod arena;
mod builder;
pub mod display;
pub mod error;
pub mod form;
pub mod mapper;
pub mod observer;
pub mod path;
mod remap;
pub mod shape;
mod sync;
pub mod validator;

pub use aggregate::{ErrorEntry, ErrorTree};
pub use arena::{FormArena, FormNode, NodeKind, VariantState};
pub use display::TreeNodeConvert;
pub use error::{FormError, FormResult};
pub use form::{Form, Snapshot};
pub use mapper::{Mapper, Representation};
pub use observer::Subscription;
pub use path::{FieldPath, IntoFieldPath, PathSegment};
pub use shape::{
    CollectionFactory, CollectionShape, GroupShape, LeafShape, NodeKindName, Shape, Variant,
    VariantSpec,
};
pub use validator::{
    Email, FnValidator, Max, MaxLength, Min, MinLength, Pattern, Required, RequiredTrue,
    ValidationErrors, Validator, ValidatorSet,
};
