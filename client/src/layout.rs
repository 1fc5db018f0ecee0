//! Fixed binary layouts for instruction payloads.
//!
//! A payload is `[variant: u8][field_1]...[field_n]`. Integers are little
//! endian, `bool` is one byte, strings carry a `u32` length prefix followed by
//! UTF-8 bytes. There is no self-describing schema: the receiving program reads
//! the fields back in exactly this order.

use std::fmt;
use std::io::{Cursor, ErrorKind as IoErrorKind};

use borsh::{BorshDeserialize, BorshSerialize};

use crate::{
    constants::SCRATCH_BUFFER_LEN,
    error::{Result, VaultClientError},
    pda::truncate_name,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U8,
    U16,
    U32,
    U64,
    Bool,
    Str,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::U8 => "u8",
            FieldKind::U16 => "u16",
            FieldKind::U32 => "u32",
            FieldKind::U64 => "u64",
            FieldKind::Bool => "bool",
            FieldKind::Str => "str",
        }
    }

    /// Bit width of integer kinds.
    pub fn width(&self) -> Option<u32> {
        match self {
            FieldKind::U8 => Some(8),
            FieldKind::U16 => Some(16),
            FieldKind::U32 => Some(32),
            FieldKind::U64 => Some(64),
            FieldKind::Bool | FieldKind::Str => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Bool(bool),
    Str(String),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::U8(_) => FieldKind::U8,
            FieldValue::U16(_) => FieldKind::U16,
            FieldValue::U32(_) => FieldKind::U32,
            FieldValue::U64(_) => FieldKind::U64,
            FieldValue::Bool(_) => FieldKind::Bool,
            FieldValue::Str(_) => FieldKind::Str,
        }
    }

    /// Range-checked integer for a field of `kind`.
    pub fn from_int(field: &'static str, kind: FieldKind, value: u128) -> Result<Self> {
        let out_of_range = |width| VaultClientError::ValueOutOfRange { field, width, value };
        Ok(match kind {
            FieldKind::U8 => FieldValue::U8(u8::try_from(value).map_err(|_| out_of_range(8))?),
            FieldKind::U16 => FieldValue::U16(u16::try_from(value).map_err(|_| out_of_range(16))?),
            FieldKind::U32 => FieldValue::U32(u32::try_from(value).map_err(|_| out_of_range(32))?),
            FieldKind::U64 => FieldValue::U64(u64::try_from(value).map_err(|_| out_of_range(64))?),
            FieldKind::Bool | FieldKind::Str => {
                return Err(VaultClientError::FieldTypeMismatch {
                    field,
                    expected: kind.name(),
                    found: "integer",
                })
            }
        })
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            FieldValue::U8(v) => Some(v.into()),
            FieldValue::U16(v) => Some(v.into()),
            FieldValue::U32(v) => Some(v.into()),
            FieldValue::U64(v) => Some(v),
            FieldValue::Bool(_) | FieldValue::Str(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            FieldValue::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(v) => Some(v),
            _ => None,
        }
    }

    fn write(&self, cursor: &mut Cursor<&mut [u8]>) -> std::io::Result<()> {
        match self {
            FieldValue::U8(v) => v.serialize(cursor),
            FieldValue::U16(v) => v.serialize(cursor),
            FieldValue::U32(v) => v.serialize(cursor),
            FieldValue::U64(v) => v.serialize(cursor),
            FieldValue::Bool(v) => v.serialize(cursor),
            FieldValue::Str(v) => v.serialize(cursor),
        }
    }

    fn read(kind: FieldKind, data: &mut &[u8]) -> std::io::Result<Self> {
        Ok(match kind {
            FieldKind::U8 => FieldValue::U8(u8::deserialize(data)?),
            FieldKind::U16 => FieldValue::U16(u16::deserialize(data)?),
            FieldKind::U32 => FieldValue::U32(u32::deserialize(data)?),
            FieldKind::U64 => FieldValue::U64(u64::deserialize(data)?),
            FieldKind::Bool => FieldValue::Bool(bool::deserialize(data)?),
            FieldKind::Str => FieldValue::Str(String::deserialize(data)?),
        })
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::U8(v) => write!(f, "{v}"),
            FieldValue::U16(v) => write!(f, "{v}"),
            FieldValue::U32(v) => write!(f, "{v}"),
            FieldValue::U64(v) => write!(f, "{v}"),
            FieldValue::Bool(v) => write!(f, "{v}"),
            FieldValue::Str(v) => write!(f, "{v:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    /// String doubles as a derivation seed and is cut to the seed budget.
    pub seed: bool,
}

impl Field {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, seed: false }
    }

    pub const fn seed(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Str,
            seed: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub name: &'static str,
    pub fields: &'static [Field],
}

impl Layout {
    pub fn field(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// Encode `values` under `layout`, prefixed by `variant`.
///
/// Fields are written into a [`SCRATCH_BUFFER_LEN`] byte buffer that is then
/// cut to the exact encoded span.
pub fn encode(layout: &Layout, variant: u8, values: &[FieldValue]) -> Result<Vec<u8>> {
    if values.len() != layout.fields.len() {
        return Err(VaultClientError::FieldCountMismatch {
            expected: layout.fields.len(),
            found: values.len(),
        });
    }

    let mut buffer = vec![0u8; SCRATCH_BUFFER_LEN];
    let span = {
        let mut cursor = Cursor::new(&mut buffer[..]);
        variant.serialize(&mut cursor).map_err(write_error)?;

        for (field, value) in layout.fields.iter().zip(values) {
            if field.kind != value.kind() {
                return Err(VaultClientError::FieldTypeMismatch {
                    field: field.name,
                    expected: field.kind.name(),
                    found: value.kind().name(),
                });
            }
            match value {
                FieldValue::Str(s) if field.seed => {
                    FieldValue::Str(truncate_name(s).to_string()).write(&mut cursor)
                }
                _ => value.write(&mut cursor),
            }
            .map_err(write_error)?;
        }

        cursor.position() as usize
    };

    buffer.truncate(span);
    Ok(buffer)
}

/// Decode bytes produced by [`encode`] under the same `layout`.
///
/// Any shortfall, malformed value or trailing byte is an error.
pub fn decode(layout: &Layout, bytes: &[u8]) -> Result<(u8, Vec<FieldValue>)> {
    let mut data = bytes;
    let variant = u8::deserialize(&mut data)
        .map_err(|_| VaultClientError::Decode("missing variant byte".to_string()))?;

    let mut values = Vec::with_capacity(layout.fields.len());
    for field in layout.fields {
        let value = FieldValue::read(field.kind, &mut data).map_err(|e| {
            VaultClientError::Decode(format!("{}.{}: {}", layout.name, field.name, e))
        })?;
        values.push(value);
    }

    if !data.is_empty() {
        return Err(VaultClientError::Decode(format!(
            "{}: {} trailing bytes",
            layout.name,
            data.len()
        )));
    }

    Ok((variant, values))
}

fn write_error(e: std::io::Error) -> VaultClientError {
    match e.kind() {
        IoErrorKind::WriteZero => VaultClientError::BufferOverflow(SCRATCH_BUFFER_LEN),
        _ => VaultClientError::Decode(e.to_string()),
    }
}
