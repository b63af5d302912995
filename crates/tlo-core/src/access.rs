//! Reading and writing interval boundaries on caller-defined events.
//!
//! An event is anything the caller owns. The core touches it only through an
//! [`Extractor`] (read a boundary) and a [`Setter`] (write one back). Both are
//! resolved once when a configuration is built, so scanning a timeline never
//! re-inspects how a field is reached.
//!
//! Named fields work on every type implementing [`FieldAccess`]:
//!
//! - key-value shapes: `serde_json::Value`, `serde_json::Map`, and
//!   `HashMap`/`BTreeMap` from `String` to [`RawValue`]
//! - structs, through [`impl_field_access!`](crate::impl_field_access)
//!
//! Callables work on any type but carry no write-back path of their own.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::BuildHasher;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::error::{Boundary, Result, TimelineError};
use crate::time::{RawValue, TimePoint};

/// Named-field access on an event representation.
pub trait FieldAccess {
    /// Reads a field, or `None` if the event has no such field.
    fn get_field(&self, name: &str) -> Option<RawValue>;

    /// Writes a field.
    fn set_field(&mut self, name: &str, value: TimePoint) -> Result<()>;
}

impl FieldAccess for Map<String, Value> {
    fn get_field(&self, name: &str) -> Option<RawValue> {
        self.get(name).map(RawValue::from)
    }

    fn set_field(&mut self, name: &str, value: TimePoint) -> Result<()> {
        self.insert(name.to_owned(), Value::String(value.to_string()));
        Ok(())
    }
}

impl FieldAccess for Value {
    fn get_field(&self, name: &str) -> Option<RawValue> {
        self.as_object()?.get_field(name)
    }

    fn set_field(&mut self, name: &str, value: TimePoint) -> Result<()> {
        match self.as_object_mut() {
            Some(object) => object.set_field(name, value),
            None => Err(TimelineError::InvalidEvent {
                field: name.to_owned(),
            }),
        }
    }
}

impl<S: BuildHasher> FieldAccess for HashMap<String, RawValue, S> {
    fn get_field(&self, name: &str) -> Option<RawValue> {
        self.get(name).cloned()
    }

    fn set_field(&mut self, name: &str, value: TimePoint) -> Result<()> {
        self.insert(name.to_owned(), value.into());
        Ok(())
    }
}

impl FieldAccess for BTreeMap<String, RawValue> {
    fn get_field(&self, name: &str) -> Option<RawValue> {
        self.get(name).cloned()
    }

    fn set_field(&mut self, name: &str, value: TimePoint) -> Result<()> {
        self.insert(name.to_owned(), value.into());
        Ok(())
    }
}

impl From<&Value> for RawValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text.clone()),
            Value::Number(number) => number
                .as_i64()
                .map(Self::Int)
                .or_else(|| number.as_f64().map(Self::Float))
                .unwrap_or(Self::Unsupported("number")),
            Value::Null => Self::Unsupported("null"),
            Value::Bool(_) => Self::Unsupported("boolean"),
            Value::Array(_) => Self::Unsupported("array"),
            Value::Object(_) => Self::Unsupported("object"),
        }
    }
}

/// A struct field type that can hold an interval boundary.
///
/// Used by [`impl_field_access!`](crate::impl_field_access).
pub trait FieldValue: Sized {
    /// The stored value, or `None` when it is absent.
    fn to_raw(&self) -> Option<RawValue>;

    /// Converts a resolved boundary into the field's type.
    fn from_time_point(value: TimePoint) -> Result<Self>;
}

impl FieldValue for TimePoint {
    fn to_raw(&self) -> Option<RawValue> {
        Some((*self).into())
    }

    fn from_time_point(value: TimePoint) -> Result<Self> {
        Ok(value)
    }
}

impl FieldValue for RawValue {
    fn to_raw(&self) -> Option<RawValue> {
        Some(self.clone())
    }

    fn from_time_point(value: TimePoint) -> Result<Self> {
        Ok(value.into())
    }
}

impl FieldValue for DateTime<FixedOffset> {
    fn to_raw(&self) -> Option<RawValue> {
        Some(RawValue::Aware(*self))
    }

    fn from_time_point(value: TimePoint) -> Result<Self> {
        value.as_aware().ok_or_else(naive_into_aware)
    }
}

impl FieldValue for DateTime<Utc> {
    fn to_raw(&self) -> Option<RawValue> {
        Some((*self).into())
    }

    fn from_time_point(value: TimePoint) -> Result<Self> {
        value
            .as_aware()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(naive_into_aware)
    }
}

impl FieldValue for NaiveDateTime {
    fn to_raw(&self) -> Option<RawValue> {
        Some(RawValue::Naive(*self))
    }

    fn from_time_point(value: TimePoint) -> Result<Self> {
        value.as_naive().ok_or_else(|| TimelineError::TypeMismatch {
            found: "timezone-aware point for a naive field".to_owned(),
        })
    }
}

/// Whole epoch seconds. Sub-second parts are floored on write; use `f64` to
/// keep them.
impl FieldValue for i64 {
    fn to_raw(&self) -> Option<RawValue> {
        Some(RawValue::Int(*self))
    }

    fn from_time_point(value: TimePoint) -> Result<Self> {
        value
            .as_aware()
            .map(|dt| dt.timestamp())
            .ok_or_else(naive_into_aware)
    }
}

impl FieldValue for f64 {
    fn to_raw(&self) -> Option<RawValue> {
        Some(RawValue::Float(*self))
    }

    #[allow(clippy::cast_precision_loss)]
    fn from_time_point(value: TimePoint) -> Result<Self> {
        value
            .as_aware()
            .map(|dt| dt.timestamp_micros() as f64 / 1e6)
            .ok_or_else(naive_into_aware)
    }
}

impl FieldValue for String {
    fn to_raw(&self) -> Option<RawValue> {
        Some(RawValue::Text(self.clone()))
    }

    fn from_time_point(value: TimePoint) -> Result<Self> {
        Ok(value.to_string())
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn to_raw(&self) -> Option<RawValue> {
        self.as_ref().and_then(FieldValue::to_raw)
    }

    fn from_time_point(value: TimePoint) -> Result<Self> {
        T::from_time_point(value).map(Some)
    }
}

fn naive_into_aware() -> TimelineError {
    TimelineError::TypeMismatch {
        found: "timezone-naive point for an aware field".to_owned(),
    }
}

/// Implements [`FieldAccess`] for a struct by listing its boundary fields.
///
/// Every listed field must implement [`FieldValue`].
///
/// ```
/// use chrono::{DateTime, Utc};
/// use tlo_core::{FieldAccess, impl_field_access};
///
/// struct Shift {
///     begin: DateTime<Utc>,
///     end: Option<DateTime<Utc>>,
/// }
///
/// impl_field_access!(Shift { begin, end });
///
/// let shift = Shift { begin: Utc::now(), end: None };
/// assert!(shift.get_field("begin").is_some());
/// assert!(shift.get_field("end").is_none());
/// ```
#[macro_export]
macro_rules! impl_field_access {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl $crate::FieldAccess for $ty {
            fn get_field(&self, name: &str) -> ::core::option::Option<$crate::RawValue> {
                match name {
                    $(stringify!($field) => $crate::FieldValue::to_raw(&self.$field),)+
                    _ => ::core::option::Option::None,
                }
            }

            fn set_field(
                &mut self,
                name: &str,
                value: $crate::TimePoint,
            ) -> $crate::Result<()> {
                match name {
                    $(stringify!($field) => {
                        self.$field = $crate::FieldValue::from_time_point(value)?;
                        ::core::result::Result::Ok(())
                    })+
                    _ => ::core::result::Result::Err($crate::TimelineError::InvalidEvent {
                        field: ::std::borrow::ToOwned::to_owned(name),
                    }),
                }
            }
        }
    };
}

type ReadFn<E> = dyn Fn(&E) -> Result<RawValue> + Send + Sync;
type WriteFn<E> = dyn Fn(&mut E, TimePoint) -> Result<()> + Send + Sync;

/// How to read one boundary from an event.
pub struct Extractor<E> {
    name: Option<Arc<str>>,
    read: Arc<ReadFn<E>>,
    write: Option<Arc<WriteFn<E>>>,
}

impl<E: FieldAccess + 'static> Extractor<E> {
    /// Reads the named field. The same name is the default write-back path.
    pub fn field(name: impl Into<Arc<str>>) -> Self {
        let name: Arc<str> = name.into();
        let read_name = Arc::clone(&name);
        let write_name = Arc::clone(&name);
        Self {
            name: Some(name),
            read: Arc::new(move |event: &E| {
                event
                    .get_field(&read_name)
                    .ok_or_else(|| TimelineError::InvalidEvent {
                        field: read_name.to_string(),
                    })
            }),
            write: Some(Arc::new(move |event: &mut E, value| {
                event.set_field(&write_name, value)
            })),
        }
    }
}

impl<E> Extractor<E> {
    /// Reads through a callable. There is no write-back path.
    pub fn with<F>(read: F) -> Self
    where
        F: Fn(&E) -> Result<RawValue> + Send + Sync + 'static,
    {
        Self {
            name: None,
            read: Arc::new(read),
            write: None,
        }
    }

    pub fn extract(&self, event: &E) -> Result<RawValue> {
        (self.read)(event)
    }

    /// The field name, if the extractor reads a named field.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub const fn is_callable(&self) -> bool {
        self.name.is_none()
    }
}

impl<E: FieldAccess + 'static> From<&str> for Extractor<E> {
    fn from(name: &str) -> Self {
        Self::field(name)
    }
}

impl<E: FieldAccess + 'static> From<String> for Extractor<E> {
    fn from(name: String) -> Self {
        Self::field(name)
    }
}

impl<E> Clone for Extractor<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            read: Arc::clone(&self.read),
            write: self.write.clone(),
        }
    }
}

impl<E> fmt::Debug for Extractor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => f.debug_tuple("Extractor::field").field(name).finish(),
            None => f.write_str("Extractor::with(<callable>)"),
        }
    }
}

/// When a missing write-back path is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritebackPolicy {
    /// Fail while building the configuration.
    Eager,
    /// Build anyway; fail only if a write is attempted.
    #[default]
    Deferred,
}

enum SetterKind<E> {
    Write(Arc<WriteFn<E>>),
    Unavailable(Boundary),
}

/// How to write one boundary back onto an event.
pub struct Setter<E> {
    kind: SetterKind<E>,
}

impl<E: FieldAccess + 'static> Setter<E> {
    /// Writes the named field.
    pub fn field(name: impl Into<Arc<str>>) -> Self {
        let name: Arc<str> = name.into();
        Self::with(move |event: &mut E, value| event.set_field(&name, value))
    }
}

impl<E> Setter<E> {
    /// Writes through a callable.
    pub fn with<F>(write: F) -> Self
    where
        F: Fn(&mut E, TimePoint) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            kind: SetterKind::Write(Arc::new(write)),
        }
    }

    /// Picks the setter for `boundary`: the explicit one if given, else the
    /// extractor's own field, else one that always fails.
    pub(crate) fn resolve(
        explicit: Option<Self>,
        extractor: &Extractor<E>,
        boundary: Boundary,
    ) -> Self {
        if let Some(setter) = explicit {
            return setter;
        }
        let kind = match &extractor.write {
            Some(write) => SetterKind::Write(Arc::clone(write)),
            None => SetterKind::Unavailable(boundary),
        };
        Self { kind }
    }

    pub fn assign(&self, event: &mut E, value: TimePoint) -> Result<()> {
        match &self.kind {
            SetterKind::Write(write) => write(event, value),
            SetterKind::Unavailable(boundary) => Err(TimelineError::NoWritebackPath {
                boundary: *boundary,
            }),
        }
    }

    pub const fn is_available(&self) -> bool {
        matches!(self.kind, SetterKind::Write(_))
    }
}

impl<E: FieldAccess + 'static> From<&str> for Setter<E> {
    fn from(name: &str) -> Self {
        Self::field(name)
    }
}

impl<E> Clone for Setter<E> {
    fn clone(&self) -> Self {
        let kind = match &self.kind {
            SetterKind::Write(write) => SetterKind::Write(Arc::clone(write)),
            SetterKind::Unavailable(boundary) => SetterKind::Unavailable(*boundary),
        };
        Self { kind }
    }
}

impl<E> fmt::Debug for Setter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SetterKind::Write(_) => f.write_str("Setter(<write>)"),
            SetterKind::Unavailable(boundary) => {
                f.debug_tuple("Setter::Unavailable").field(boundary).finish()
            }
        }
    }
}
