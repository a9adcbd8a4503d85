//! Structured document operations.
//!
//! Repositories never build raw store queries. They describe what to match
//! and what to change with the types in this module, and a [`DocumentStore`]
//! adapter translates them into whatever its backend supports. Nested
//! element updates are addressed as "item I of container C of root R";
//! a MongoDB adapter would render those as positional array filters, the
//! in-memory adapter walks the document directly.

pub mod memory;
pub mod store;

pub use memory::InMemoryDocumentStore;
pub use store::DocumentStore;

use ordelo_core::{ContainerKind, EntityId, FieldPatch, ID_FIELD, ITEMS_FIELD, ITEM_ID_FIELD};
use serde_json::{Map, Value};
use std::fmt;

// ============================================================================
// FILTERS
// ============================================================================

/// Selects root documents within one collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Every document.
    All,
    /// The root with this identifier.
    Id(EntityId),
    /// Documents whose top-level `field` equals `value`.
    Field { field: String, value: Value },
    /// The root `root`, provided its `kind` array holds element `element`.
    Element {
        root: EntityId,
        kind: ContainerKind,
        element: EntityId,
    },
}

impl Filter {
    pub fn id(id: EntityId) -> Self {
        Filter::Id(id)
    }

    pub fn email(email: &str) -> Self {
        Filter::Field {
            field: "email".to_string(),
            value: Value::String(email.to_string()),
        }
    }

    pub fn element(root: EntityId, kind: ContainerKind, element: EntityId) -> Self {
        Filter::Element {
            root,
            kind,
            element,
        }
    }
}

// ============================================================================
// PATHS
// ============================================================================

/// An array inside a root document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayPath {
    /// The root's array of `kind` containers.
    Containers(ContainerKind),
    /// The item array of one container.
    Items {
        kind: ContainerKind,
        container: EntityId,
    },
}

impl ArrayPath {
    pub fn kind(&self) -> ContainerKind {
        match self {
            ArrayPath::Containers(kind) | ArrayPath::Items { kind, .. } => *kind,
        }
    }

    /// Key field of the elements held by this array.
    pub fn element_id_field(&self) -> &'static str {
        match self {
            ArrayPath::Containers(kind) => kind.id_field(),
            ArrayPath::Items { .. } => ITEM_ID_FIELD,
        }
    }
}

impl fmt::Display for ArrayPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayPath::Containers(kind) => write!(f, "{}", kind.array_field()),
            ArrayPath::Items { kind, .. } => {
                write!(f, "{}.$[c].{}", kind.array_field(), ITEMS_FIELD)
            }
        }
    }
}

/// One element inside a root document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementPath {
    Container {
        kind: ContainerKind,
        container: EntityId,
    },
    Item {
        kind: ContainerKind,
        container: EntityId,
        item: EntityId,
    },
}

impl ElementPath {
    pub fn kind(&self) -> ContainerKind {
        match self {
            ElementPath::Container { kind, .. } | ElementPath::Item { kind, .. } => *kind,
        }
    }

    pub fn container(&self) -> EntityId {
        match self {
            ElementPath::Container { container, .. } | ElementPath::Item { container, .. } => {
                *container
            }
        }
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementPath::Container { kind, .. } => write!(f, "{}.$[c]", kind.array_field()),
            ElementPath::Item { kind, .. } => {
                write!(f, "{}.$[c].{}.$[i]", kind.array_field(), ITEMS_FIELD)
            }
        }
    }
}

// ============================================================================
// UPDATES
// ============================================================================

/// A change applied atomically to one matched root document.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Set top-level scalar fields.
    Set(FieldPatch),
    /// Append elements to an array.
    Push { path: ArrayPath, values: Vec<Value> },
    /// Set scalar fields on one nested element.
    Patch { path: ElementPath, patch: FieldPatch },
    /// Remove every element whose key is in `ids`.
    Pull { path: ArrayPath, ids: Vec<EntityId> },
}

impl Update {
    /// Short operation name for logs.
    pub fn op_name(&self) -> &'static str {
        match self {
            Update::Set(_) => "$set",
            Update::Push { .. } => "$push",
            Update::Patch { .. } => "$set",
            Update::Pull { .. } => "$pull",
        }
    }

    /// Container kind addressed by a nested update, `None` for top-level sets.
    pub fn container_kind(&self) -> Option<ContainerKind> {
        match self {
            Update::Set(_) => None,
            Update::Push { path, .. } | Update::Pull { path, .. } => Some(path.kind()),
            Update::Patch { path, .. } => Some(path.kind()),
        }
    }
}

/// One update-one operation inside a bulk write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteModel {
    pub filter: Filter,
    pub update: Update,
}

impl WriteModel {
    pub fn update_one(filter: Filter, update: Update) -> Self {
        Self { filter, update }
    }
}

// ============================================================================
// PROJECTIONS AND RESULTS
// ============================================================================

/// Top-level fields to return from a find. The key field is always kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<String>,
}

impl Projection {
    pub fn fields(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Only the container array of `kind`.
    pub fn containers(kind: ContainerKind) -> Self {
        Self::fields(&[kind.array_field()])
    }

    pub fn includes(&self, field: &str) -> bool {
        field == ID_FIELD || self.fields.iter().any(|f| f == field)
    }

    /// Reduce a full document to the projected fields.
    pub fn apply(&self, document: &Value) -> Value {
        match document {
            Value::Object(map) => Value::Object(
                map.iter()
                    .filter(|(key, _)| self.includes(key))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect::<Map<String, Value>>(),
            ),
            other => other.clone(),
        }
    }
}

/// Outcome of a write, mirroring what a document store reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub deleted_count: u64,
    pub inserted_id: Option<EntityId>,
}

impl WriteResult {
    /// An acknowledged result with no effect yet.
    pub fn acknowledged() -> Self {
        Self {
            acknowledged: true,
            ..Default::default()
        }
    }

    /// Fold another sub-result into this one, as a bulk write does.
    pub fn absorb(&mut self, other: &WriteResult) {
        self.acknowledged = self.acknowledged && other.acknowledged;
        self.matched_count += other.matched_count;
        self.modified_count += other.modified_count;
        self.deleted_count += other.deleted_count;
    }
}
