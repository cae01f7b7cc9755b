/// Value Module
///
/// Binary value types, the dynamically typed [`Value`] cell and the two
/// conversion traits that connect Rust types to the engine:
/// [`Bind`] for parameters and [`Column`] for result columns. Types without an
/// implementation are rejected at compile time.

use std::fmt;

use crate::core::db::ffi;
use crate::core::db::statement::Statement;
use crate::core::{Error, ErrorKind, Result};

/// Owned binary data. The bytes are copied on construction and the size
/// never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Blob {
    data: Vec<u8>,
}

impl Blob {
    /// Creates a blob holding a copy of `data`.
    pub fn new(data: &[u8]) -> Self {
        Blob {
            data: data.to_vec(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Read-write access to the bytes; the length stays fixed.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for Blob {
    fn from(data: Vec<u8>) -> Self {
        Blob { data }
    }
}

impl From<&[u8]> for Blob {
    fn from(data: &[u8]) -> Self {
        Blob::new(data)
    }
}

/// Borrowed binary data used for binding.
///
/// The borrow must outlive every use of the bytes; the compiler enforces this.
///
/// Binding a `NoBlob` through [`Statement::bind`], [`Statement::bind_all`] or
/// any tuple or slice of parameters always copies the bytes. Only
/// [`Statement::bind_zero_copy`] hands the engine the pointer itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoBlob<'a> {
    data: &'a [u8],
}

impl<'a> NoBlob<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        NoBlob { data }
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Fundamental storage class of a column cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Null,
    Integer,
    Real,
    Text,
    Blob,
}

impl ColumnType {
    pub(crate) fn from_code(code: i32) -> Self {
        match code {
            ffi::SQLITE_INTEGER => ColumnType::Integer,
            ffi::SQLITE_FLOAT => ColumnType::Real,
            ffi::SQLITE_TEXT => ColumnType::Text,
            ffi::SQLITE_BLOB => ColumnType::Blob,
            _ => ColumnType::Null,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Null => "null",
            ColumnType::Integer => "integer",
            ColumnType::Real => "real",
            ColumnType::Text => "text",
            ColumnType::Blob => "blob",
        };
        f.write_str(name)
    }
}

/// A dynamically typed cell, as stored by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Blob),
}

impl Value {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Null => ColumnType::Null,
            Value::Integer(_) => ColumnType::Integer,
            Value::Real(_) => ColumnType::Real,
            Value::Text(_) => ColumnType::Text,
            Value::Blob(_) => ColumnType::Blob,
        }
    }

    fn invalid(&self, expected: &str) -> Error {
        Error::new(
            ErrorKind::Usage,
            format!(
                "invalid column data type: expected {}, found {}",
                expected,
                self.column_type()
            ),
        )
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Real(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Blob> for Value {
    fn from(v: Blob) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl TryFrom<Value> for i64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Integer(v) => Ok(v),
            other => Err(other.invalid("integer")),
        }
    }
}

fn narrow_i32(v: i64) -> Result<i32> {
    i32::try_from(v).map_err(|_| {
        Error::new(
            ErrorKind::Conversion,
            format!("integer {} does not fit in 32 bits", v),
        )
    })
}

impl TryFrom<Value> for i32 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Integer(v) => narrow_i32(v),
            other => Err(other.invalid("integer")),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Real(v) => Ok(v),
            Value::Integer(v) => Ok(v as f64),
            other => Err(other.invalid("real")),
        }
    }
}

impl TryFrom<Value> for f32 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        f64::try_from(value).map(|v| v as f32)
    }
}

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Text(v) => Ok(v),
            other => Err(other.invalid("text")),
        }
    }
}

impl TryFrom<Value> for Blob {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Blob(v) => Ok(v),
            other => Err(other.invalid("blob")),
        }
    }
}

/// A value that can be bound to a 1-based statement parameter.
pub trait Bind {
    fn bind_to(&self, statement: &mut Statement<'_>, position: usize) -> Result<()>;
}

impl Bind for i32 {
    fn bind_to(&self, statement: &mut Statement<'_>, position: usize) -> Result<()> {
        statement.raw.bind_int(position, *self)
    }
}

impl Bind for i64 {
    fn bind_to(&self, statement: &mut Statement<'_>, position: usize) -> Result<()> {
        statement.raw.bind_int64(position, *self)
    }
}

/// Stored as a double.
impl Bind for f32 {
    fn bind_to(&self, statement: &mut Statement<'_>, position: usize) -> Result<()> {
        statement.raw.bind_double(position, f64::from(*self))
    }
}

impl Bind for f64 {
    fn bind_to(&self, statement: &mut Statement<'_>, position: usize) -> Result<()> {
        statement.raw.bind_double(position, *self)
    }
}

impl Bind for str {
    fn bind_to(&self, statement: &mut Statement<'_>, position: usize) -> Result<()> {
        statement.raw.bind_text(position, self)
    }
}

impl Bind for String {
    fn bind_to(&self, statement: &mut Statement<'_>, position: usize) -> Result<()> {
        statement.raw.bind_text(position, self)
    }
}

impl Bind for Blob {
    fn bind_to(&self, statement: &mut Statement<'_>, position: usize) -> Result<()> {
        statement.raw.bind_blob(position, &self.data)
    }
}

impl Bind for NoBlob<'_> {
    fn bind_to(&self, statement: &mut Statement<'_>, position: usize) -> Result<()> {
        statement.raw.bind_blob(position, self.data)
    }
}

impl<T: Bind> Bind for Option<T> {
    fn bind_to(&self, statement: &mut Statement<'_>, position: usize) -> Result<()> {
        match self {
            Some(value) => value.bind_to(statement, position),
            None => statement.raw.bind_null(position),
        }
    }
}

impl Bind for Value {
    fn bind_to(&self, statement: &mut Statement<'_>, position: usize) -> Result<()> {
        match self {
            Value::Null => statement.raw.bind_null(position),
            Value::Integer(v) => statement.raw.bind_int64(position, *v),
            Value::Real(v) => statement.raw.bind_double(position, *v),
            Value::Text(v) => statement.raw.bind_text(position, v),
            Value::Blob(v) => statement.raw.bind_blob(position, v.data()),
        }
    }
}

impl<T: Bind + ?Sized> Bind for &T {
    fn bind_to(&self, statement: &mut Statement<'_>, position: usize) -> Result<()> {
        (**self).bind_to(statement, position)
    }
}

/// An ordered list of parameters bound from position 1.
pub trait Params {
    fn bind_params(self, statement: &mut Statement<'_>) -> Result<()>;
}

impl Params for () {
    fn bind_params(self, _statement: &mut Statement<'_>) -> Result<()> {
        Ok(())
    }
}

impl Params for &[&dyn Bind] {
    fn bind_params(self, statement: &mut Statement<'_>) -> Result<()> {
        for (i, value) in self.iter().enumerate() {
            value.bind_to(statement, i + 1)?;
        }
        Ok(())
    }
}

impl<const N: usize> Params for &[&dyn Bind; N] {
    fn bind_params(self, statement: &mut Statement<'_>) -> Result<()> {
        self.as_slice().bind_params(statement)
    }
}

impl Params for &[Value] {
    fn bind_params(self, statement: &mut Statement<'_>) -> Result<()> {
        for (i, value) in self.iter().enumerate() {
            value.bind_to(statement, i + 1)?;
        }
        Ok(())
    }
}

impl Params for Vec<Value> {
    fn bind_params(self, statement: &mut Statement<'_>) -> Result<()> {
        self.as_slice().bind_params(statement)
    }
}

macro_rules! impl_params_for_tuple {
    ($($field:tt $ty:ident),+) => {
        impl<$($ty: Bind),+> Params for ($($ty,)+) {
            fn bind_params(self, statement: &mut Statement<'_>) -> Result<()> {
                $( self.$field.bind_to(statement, $field + 1)?; )+
                Ok(())
            }
        }
    };
}

impl_params_for_tuple!(0 A);
impl_params_for_tuple!(0 A, 1 B);
impl_params_for_tuple!(0 A, 1 B, 2 C);
impl_params_for_tuple!(0 A, 1 B, 2 C, 3 D);
impl_params_for_tuple!(0 A, 1 B, 2 C, 3 D, 4 E);
impl_params_for_tuple!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F);
impl_params_for_tuple!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G);
impl_params_for_tuple!(0 A, 1 B, 2 C, 3 D, 4 E, 5 F, 6 G, 7 H);

/// A Rust type that can be read from a column of the current row.
///
/// Scalar reads follow the engine's coercion rules (NULL reads as zero,
/// text is parsed as a number). Use `Option<T>` to observe NULL.
pub trait Column: Sized {
    fn read(statement: &Statement<'_>, index: usize) -> Result<Self>;
}

/// Fails with `ErrorKind::Conversion` when the stored integer needs 64 bits.
impl Column for i32 {
    fn read(statement: &Statement<'_>, index: usize) -> Result<Self> {
        narrow_i32(statement.raw.column_int64(index))
    }
}

impl Column for i64 {
    fn read(statement: &Statement<'_>, index: usize) -> Result<Self> {
        Ok(statement.raw.column_int64(index))
    }
}

/// Narrowed from the stored double.
impl Column for f32 {
    fn read(statement: &Statement<'_>, index: usize) -> Result<Self> {
        Ok(statement.raw.column_double(index) as f32)
    }
}

impl Column for f64 {
    fn read(statement: &Statement<'_>, index: usize) -> Result<Self> {
        Ok(statement.raw.column_double(index))
    }
}

impl Column for String {
    fn read(statement: &Statement<'_>, index: usize) -> Result<Self> {
        let bytes = statement.raw.column_text(index);
        String::from_utf8(bytes.to_vec()).map_err(|e| {
            Error::new(
                ErrorKind::Conversion,
                format!("column {} is not valid UTF-8: {}", index, e),
            )
        })
    }
}

impl Column for Blob {
    fn read(statement: &Statement<'_>, index: usize) -> Result<Self> {
        Ok(Blob::new(statement.raw.column_blob(index)))
    }
}

impl Column for Vec<u8> {
    fn read(statement: &Statement<'_>, index: usize) -> Result<Self> {
        Ok(statement.raw.column_blob(index).to_vec())
    }
}

impl<T: Column> Column for Option<T> {
    fn read(statement: &Statement<'_>, index: usize) -> Result<Self> {
        if statement.raw.column_type(index) == ffi::SQLITE_NULL {
            Ok(None)
        } else {
            T::read(statement, index).map(Some)
        }
    }
}

impl Column for Value {
    fn read(statement: &Statement<'_>, index: usize) -> Result<Self> {
        let value = match ColumnType::from_code(statement.raw.column_type(index)) {
            ColumnType::Null => Value::Null,
            ColumnType::Integer => Value::Integer(statement.raw.column_int64(index)),
            ColumnType::Real => Value::Real(statement.raw.column_double(index)),
            ColumnType::Text => Value::Text(String::read(statement, index)?),
            ColumnType::Blob => Value::Blob(Blob::read(statement, index)?),
        };
        Ok(value)
    }
}
