//! Type-directed injection of parameter values into fields.
//!
//! A parameter source hands the injector the raw values it found for one
//! binding: `None` when the parameter is absent, or the ordered list of values
//! otherwise. [`FieldType`] then recurses on the field's declared type:
//!
//! | Declared type | Absent | Present |
//! |---------------|--------|---------|
//! | `Option<T>` | `None` | `Some(T::inject(values))` |
//! | scalar | zero value | first value wins; an empty list gives the zero value |
//! | `Vec<T>` | empty | one `T` per value, in order |

use std::fmt;

use crate::coerce::{CoerceError, ScalarKind, ScalarValue};

/// Structural shape of a field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// A plain scalar
    Scalar(ScalarKind),
    /// `Option<T>`
    Optional(Box<Shape>),
    /// `Vec<T>`
    Repeated(Box<Shape>),
}

impl Shape {
    /// Returns true if a `Vec` appears anywhere in this shape.
    #[must_use]
    pub fn is_repeated(&self) -> bool {
        match self {
            Self::Scalar(_) => false,
            Self::Optional(inner) => inner.is_repeated(),
            Self::Repeated(_) => true,
        }
    }

    /// Returns the scalar kind at the bottom of this shape.
    #[must_use]
    pub fn scalar_kind(&self) -> ScalarKind {
        match self {
            Self::Scalar(kind) => *kind,
            Self::Optional(inner) | Self::Repeated(inner) => inner.scalar_kind(),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(kind) => write!(f, "{kind}"),
            Self::Optional(inner) => write!(f, "Option<{inner}>"),
            Self::Repeated(inner) => write!(f, "Vec<{inner}>"),
        }
    }
}

/// A field type that parameter values can be injected into.
///
/// Implemented for every [`ScalarValue`], and recursively for `Option<T>` and
/// `Vec<T>`. Fields of any other type can only be bound to the body.
pub trait FieldType: Sized {
    /// Returns the structural shape of this type.
    fn shape() -> Shape;

    /// Builds a value from the raw parameter values.
    ///
    /// # Errors
    ///
    /// Returns the first [`CoerceError`] hit while coercing a value.
    fn inject(values: Option<&[&str]>) -> Result<Self, CoerceError>;
}

impl<T: ScalarValue> FieldType for T {
    fn shape() -> Shape {
        Shape::Scalar(T::KIND)
    }

    fn inject(values: Option<&[&str]>) -> Result<Self, CoerceError> {
        match values.and_then(|values| values.first()) {
            Some(first) => T::from_text(first),
            None => Ok(T::default()),
        }
    }
}

impl<T: FieldType> FieldType for Option<T> {
    fn shape() -> Shape {
        Shape::Optional(Box::new(T::shape()))
    }

    fn inject(values: Option<&[&str]>) -> Result<Self, CoerceError> {
        match values {
            Some(values) => T::inject(Some(values)).map(Some),
            None => Ok(None),
        }
    }
}

impl<T: FieldType> FieldType for Vec<T> {
    fn shape() -> Shape {
        Shape::Repeated(Box::new(T::shape()))
    }

    fn inject(values: Option<&[&str]>) -> Result<Self, CoerceError> {
        values
            .unwrap_or_default()
            .iter()
            .map(|value| T::inject(Some(std::slice::from_ref(value))))
            .collect()
    }
}
