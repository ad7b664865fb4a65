//! Declared-type descriptors.
//!
//! A [`TypeInfo`] is the registration-time stand-in for a Rust type: it tells
//! the classifier whether a parameter is a scalar, an array or an object, and
//! it is the input of JSON Schema generation. Types describe themselves
//! through the [`Describe`] trait, which `#[derive(Describe)]` implements for
//! records.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;

use crate::constraints::Constraints;

/// The structural shape of a declared type, as seen by the style deserializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// A single value.
    Scalar,
    /// A sequence or set.
    Array,
    /// A mapping or record.
    Object,
}

/// Kind of a declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// UTF-8 string.
    String,
    /// Integer.
    Integer,
    /// Floating point number.
    Number,
    /// Boolean.
    Boolean,
    /// Any JSON value.
    Any,
    /// Homogeneous sequence; `unique` marks set semantics.
    Array {
        /// Item type.
        items: Box<TypeInfo>,
        /// Whether items must be unique.
        unique: bool,
    },
    /// String-keyed map.
    Map {
        /// Value type.
        values: Box<TypeInfo>,
    },
    /// Named record with declared fields.
    Model(Arc<ModelInfo>),
}

/// Descriptor for a declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeInfo {
    /// The type kind.
    pub kind: TypeKind,
    /// Whether `null` is accepted (`Option<T>`).
    pub nullable: bool,
}

impl TypeInfo {
    const fn of(kind: TypeKind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    /// A string.
    pub const fn string() -> Self {
        Self::of(TypeKind::String)
    }

    /// An integer.
    pub const fn integer() -> Self {
        Self::of(TypeKind::Integer)
    }

    /// A floating point number.
    pub const fn number() -> Self {
        Self::of(TypeKind::Number)
    }

    /// A boolean.
    pub const fn boolean() -> Self {
        Self::of(TypeKind::Boolean)
    }

    /// Any JSON value.
    pub const fn any() -> Self {
        Self::of(TypeKind::Any)
    }

    /// A list of `items`.
    pub fn array(items: TypeInfo) -> Self {
        Self::of(TypeKind::Array {
            items: Box::new(items),
            unique: false,
        })
    }

    /// A set of `items`.
    pub fn set(items: TypeInfo) -> Self {
        Self::of(TypeKind::Array {
            items: Box::new(items),
            unique: true,
        })
    }

    /// A string-keyed map of `values`.
    pub fn map(values: TypeInfo) -> Self {
        Self::of(TypeKind::Map {
            values: Box::new(values),
        })
    }

    /// A record.
    pub fn model(model: ModelInfo) -> Self {
        Self::of(TypeKind::Model(Arc::new(model)))
    }

    /// Marks the type as accepting `null`.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Returns the structural shape.
    pub fn shape(&self) -> Shape {
        match self.kind {
            TypeKind::Array { .. } => Shape::Array,
            TypeKind::Map { .. } | TypeKind::Model(_) => Shape::Object,
            _ => Shape::Scalar,
        }
    }

    /// Returns the record descriptor if this is a model.
    pub fn as_model(&self) -> Option<&ModelInfo> {
        match &self.kind {
            TypeKind::Model(model) => Some(model),
            _ => None,
        }
    }

    /// True for records.
    pub fn is_model(&self) -> bool {
        self.as_model().is_some()
    }

    /// The JSON Schema `type` keyword for this kind, if it has one.
    pub fn json_type(&self) -> Option<&'static str> {
        match self.kind {
            TypeKind::String => Some("string"),
            TypeKind::Integer => Some("integer"),
            TypeKind::Number => Some("number"),
            TypeKind::Boolean => Some("boolean"),
            TypeKind::Array { .. } => Some("array"),
            TypeKind::Map { .. } | TypeKind::Model(_) => Some("object"),
            TypeKind::Any => None,
        }
    }
}

/// Descriptor for a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    /// Component name, used to deduplicate schemas in documentation.
    pub name: String,
    /// Documentation of the record.
    pub description: Option<String>,
    /// Declared fields in declaration order.
    pub fields: Vec<FieldInfo>,
    /// Whether unknown keys are rejected.
    pub closed: bool,
}

impl ModelInfo {
    /// Creates an empty record descriptor.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: Vec::new(),
            closed: false,
        }
    }

    /// Sets the record documentation.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Appends a field.
    #[must_use]
    pub fn field(mut self, field: FieldInfo) -> Self {
        self.fields.push(field);
        self
    }

    /// Rejects unknown keys.
    #[must_use]
    pub fn closed(mut self) -> Self {
        self.closed = true;
        self
    }
}

/// Descriptor for one record field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    /// Rust field name.
    pub name: String,
    /// Wire name override.
    pub alias: Option<String>,
    /// Field type.
    pub type_info: TypeInfo,
    /// Default value documented for the field.
    pub default: Option<Value>,
    /// Whether the key must be present.
    pub required: bool,
    /// Field constraints.
    pub constraints: Constraints,
}

impl FieldInfo {
    /// Creates a field; nullable types are optional.
    pub fn new(name: impl Into<String>, type_info: TypeInfo) -> Self {
        let required = !type_info.nullable;
        Self {
            name: name.into(),
            alias: None,
            type_info,
            default: None,
            required,
            constraints: Constraints::default(),
        }
    }

    /// Sets the wire name.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Sets a default value, making the field optional.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.required = false;
        self
    }

    /// Marks the field optional without a documented default.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Replaces the field constraints.
    #[must_use]
    pub fn constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Name used on the wire.
    pub fn wire_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Types that can describe themselves for binding and documentation.
pub trait Describe {
    /// Returns the type descriptor.
    fn describe() -> TypeInfo;
}

macro_rules! describe_as {
    ($ctor:ident: $($ty:ty),* $(,)?) => {
        $(
            impl Describe for $ty {
                fn describe() -> TypeInfo {
                    TypeInfo::$ctor()
                }
            }
        )*
    };
}

describe_as!(string: String, &str, char);
describe_as!(integer: i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
describe_as!(number: f32, f64);
describe_as!(boolean: bool);
describe_as!(any: Value);

impl<T: Describe> Describe for Option<T> {
    fn describe() -> TypeInfo {
        T::describe().nullable()
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn describe() -> TypeInfo {
        TypeInfo::array(T::describe())
    }
}

impl<T: Describe, S> Describe for HashSet<T, S> {
    fn describe() -> TypeInfo {
        TypeInfo::set(T::describe())
    }
}

impl<T: Describe> Describe for BTreeSet<T> {
    fn describe() -> TypeInfo {
        TypeInfo::set(T::describe())
    }
}

impl<T: Describe, S> Describe for HashMap<String, T, S> {
    fn describe() -> TypeInfo {
        TypeInfo::map(T::describe())
    }
}

impl<T: Describe> Describe for BTreeMap<String, T> {
    fn describe() -> TypeInfo {
        TypeInfo::map(T::describe())
    }
}

impl<T: Describe> Describe for Box<T> {
    fn describe() -> TypeInfo {
        T::describe()
    }
}
