//! SQL values and conversions between host types and bound parameters.
//!
//! Every value that reaches a statement travels as a [`SqlValue`], so clause
//! fragments never splice user data into SQL text.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// A SQL value that can be used as a parameter or read back from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary blob value.
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Returns whether this is `NULL`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the value's variant, used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
        }
    }
}

/// Errors raised when a [`SqlValue`] cannot be turned back into a host value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The stored value has a different type than the field.
    #[error("cannot convert {found} value into {expected}")]
    TypeMismatch {
        /// Field type the value was decoded into.
        expected: &'static str,
        /// Variant that was found.
        found: &'static str,
    },

    /// An integer does not fit into the target type.
    #[error("integer {value} out of range for {target}")]
    OutOfRange {
        /// The stored integer.
        value: i64,
        /// Target type name.
        target: &'static str,
    },

    /// Text could not be parsed into the target type.
    #[error("cannot parse {input:?} as {target}: {message}")]
    Parse {
        /// Text that failed to parse.
        input: String,
        /// Target type name.
        target: &'static str,
        /// Parser message.
        message: String,
    },

    /// The record has no field mapped to this column.
    #[error("no field mapped to column {0}")]
    UnknownColumn(String),
}

/// The static type of a record field, as seen by a [`Dialect`](crate::dialect::Dialect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// `bool`.
    Bool,
    /// Integers of 32 bits or less.
    Int,
    /// 64-bit integers.
    BigInt,
    /// `f32` / `f64`.
    Float,
    /// `String`.
    Text,
    /// `Vec<u8>`.
    Blob,
    /// `chrono::DateTime<Utc>`.
    DateTime,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::BigInt => "bigint",
            Self::Float => "float",
            Self::Text => "text",
            Self::Blob => "blob",
            Self::DateTime => "datetime",
        };
        f.write_str(name)
    }
}

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

/// Trait for types that can be rebuilt from SQL values.
///
/// `NULL` decodes into the zero value of non-optional types, matching the
/// zero-valued record a row is scanned into.
pub trait FromSqlValue: Sized {
    /// Converts a `SqlValue` back into the host type.
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError>;
}

/// Host types that can back a mapped column.
pub trait SqlField: ToSqlValue + FromSqlValue {
    /// Kind handed to the dialect when deriving the column type.
    const KIND: FieldKind;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl FromSqlValue for SqlValue {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        Ok(value)
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bool(self)
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Null => Ok(false),
            SqlValue::Bool(b) => Ok(b),
            SqlValue::Int(i) => Ok(i != 0),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl SqlField for bool {
    const KIND: FieldKind = FieldKind::Bool;
}

macro_rules! impl_integer {
    ($($ty:ty => $kind:ident),+ $(,)?) => {
        $(
            impl ToSqlValue for $ty {
                fn to_sql_value(self) -> SqlValue {
                    SqlValue::Int(i64::from(self))
                }
            }

            impl FromSqlValue for $ty {
                fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
                    match value {
                        SqlValue::Null => Ok(0),
                        SqlValue::Bool(b) => Ok(<$ty>::from(b)),
                        SqlValue::Int(i) => <$ty>::try_from(i).map_err(|_| ValueError::OutOfRange {
                            value: i,
                            target: stringify!($ty),
                        }),
                        other => Err(mismatch(stringify!($ty), &other)),
                    }
                }
            }

            impl SqlField for $ty {
                const KIND: FieldKind = FieldKind::$kind;
            }
        )+
    };
}

impl_integer!(
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => BigInt,
    u8 => Int,
    u16 => Int,
    u32 => Int,
);

// u64 does not fit into i64 losslessly, so it is stored as the two's
// complement bit pattern.
impl ToSqlValue for u64 {
    #[allow(clippy::cast_possible_wrap)]
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(self as i64)
    }
}

impl FromSqlValue for u64 {
    #[allow(clippy::cast_sign_loss)]
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Null => Ok(0),
            SqlValue::Bool(b) => Ok(Self::from(b)),
            SqlValue::Int(i) => Ok(i as Self),
            other => Err(mismatch("u64", &other)),
        }
    }
}

impl SqlField for u64 {
    const KIND: FieldKind = FieldKind::BigInt;
}

impl ToSqlValue for f64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(self)
    }
}

impl FromSqlValue for f64 {
    #[allow(clippy::cast_precision_loss)]
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Null => Ok(0.0),
            SqlValue::Float(f) => Ok(f),
            SqlValue::Int(i) => Ok(i as Self),
            other => Err(mismatch("f64", &other)),
        }
    }
}

impl SqlField for f64 {
    const KIND: FieldKind = FieldKind::Float;
}

impl ToSqlValue for f32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(f64::from(self))
    }
}

impl FromSqlValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        f64::from_sql_value(value).map(|f| f as Self)
    }
}

impl SqlField for f32 {
    const KIND: FieldKind = FieldKind::Float;
}

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self)
    }
}

impl FromSqlValue for String {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Null => Ok(Self::new()),
            SqlValue::Text(s) => Ok(s),
            SqlValue::Blob(b) => Self::from_utf8(b).map_err(|e| ValueError::Parse {
                input: String::from("<blob>"),
                target: "String",
                message: e.to_string(),
            }),
            other => Err(mismatch("String", &other)),
        }
    }
}

impl SqlField for String {
    const KIND: FieldKind = FieldKind::Text;
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl ToSqlValue for Vec<u8> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self)
    }
}

impl FromSqlValue for Vec<u8> {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Null => Ok(Self::new()),
            SqlValue::Blob(b) => Ok(b),
            SqlValue::Text(s) => Ok(s.into_bytes()),
            other => Err(mismatch("Vec<u8>", &other)),
        }
    }
}

impl SqlField for Vec<u8> {
    const KIND: FieldKind = FieldKind::Blob;
}

impl ToSqlValue for &[u8] {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self.to_vec())
    }
}

impl ToSqlValue for DateTime<Utc> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self.to_rfc3339())
    }
}

impl FromSqlValue for DateTime<Utc> {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Null => Ok(Self::default()),
            SqlValue::Text(s) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| ValueError::Parse {
                    input: s,
                    target: "DateTime<Utc>",
                    message: e.to_string(),
                }),
            other => Err(mismatch("DateTime<Utc>", &other)),
        }
    }
}

impl SqlField for DateTime<Utc> {
    const KIND: FieldKind = FieldKind::DateTime;
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_sql_value(other).map(Some),
        }
    }
}

impl<T: SqlField> SqlField for Option<T> {
    const KIND: FieldKind = T::KIND;
}

fn mismatch(expected: &'static str, found: &SqlValue) -> ValueError {
    ValueError::TypeMismatch {
        expected,
        found: found.type_name(),
    }
}
