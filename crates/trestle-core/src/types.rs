//! SQL data type resolution.
//!
//! Maps `(attribute, external hint, on-disk metadata)` to a concrete SQL
//! Server data type, in strict priority order: identifier coercion, on-disk
//! evidence, external hint, logical-token mapping.

use std::fmt;

use crate::model::Attribute;

/// Length of a variable-size type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlLength {
    Fixed(u32),
    Max,
}

impl fmt::Display for SqlLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "{n}"),
            Self::Max => f.write_str("MAX"),
        }
    }
}

/// A resolved SQL Server data type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlType {
    Int,
    BigInt,
    SmallInt,
    TinyInt,
    Bit,
    Date,
    DateTime,
    DateTime2(Option<u8>),
    SmallDateTime,
    Time(Option<u8>),
    NVarChar(SqlLength),
    VarChar(SqlLength),
    NChar(u32),
    Char(u32),
    VarBinary(SqlLength),
    Binary(u32),
    Decimal { precision: u8, scale: u8 },
    Float,
    Real,
    Money,
    UniqueIdentifier,
    /// A type the resolver does not model; carried verbatim (uppercased).
    Other(String),
}

impl SqlType {
    /// Returns `true` for BIT (drives default-value normalization).
    pub fn is_bit(&self) -> bool {
        matches!(self, Self::Bit)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => f.write_str("INT"),
            Self::BigInt => f.write_str("BIGINT"),
            Self::SmallInt => f.write_str("SMALLINT"),
            Self::TinyInt => f.write_str("TINYINT"),
            Self::Bit => f.write_str("BIT"),
            Self::Date => f.write_str("DATE"),
            Self::DateTime => f.write_str("DATETIME"),
            Self::DateTime2(None) => f.write_str("DATETIME2"),
            Self::DateTime2(Some(s)) => write!(f, "DATETIME2({s})"),
            Self::SmallDateTime => f.write_str("SMALLDATETIME"),
            Self::Time(None) => f.write_str("TIME"),
            Self::Time(Some(s)) => write!(f, "TIME({s})"),
            Self::NVarChar(len) => write!(f, "NVARCHAR({len})"),
            Self::VarChar(len) => write!(f, "VARCHAR({len})"),
            Self::NChar(n) => write!(f, "NCHAR({n})"),
            Self::Char(n) => write!(f, "CHAR({n})"),
            Self::VarBinary(len) => write!(f, "VARBINARY({len})"),
            Self::Binary(n) => write!(f, "BINARY({n})"),
            Self::Decimal { precision, scale } => write!(f, "DECIMAL({precision},{scale})"),
            Self::Float => f.write_str("FLOAT"),
            Self::Real => f.write_str("REAL"),
            Self::Money => f.write_str("MONEY"),
            Self::UniqueIdentifier => f.write_str("UNIQUEIDENTIFIER"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// Parses a SQL type string such as `nvarchar`, `NVARCHAR(128)`, or
/// `decimal(18,2)`.
///
/// Arguments embedded in the string win over the separately captured
/// metadata fields. Length `-1` on any variable type means MAX.
pub fn parse_type_string(
    raw: &str,
    max_length: Option<i64>,
    precision: Option<u8>,
    scale: Option<u8>,
) -> SqlType {
    let raw = raw.trim();
    let (name, args) = match raw.split_once('(') {
        Some((name, rest)) => {
            let inner = rest.trim_end_matches(')');
            let parsed: Vec<i64> = inner
                .split(',')
                .filter_map(|p| {
                    let p = p.trim();
                    if p.eq_ignore_ascii_case("max") {
                        Some(-1)
                    } else {
                        p.parse().ok()
                    }
                })
                .collect();
            (name.trim(), parsed)
        }
        None => (raw, Vec::new()),
    };

    let length = args.first().copied().or(max_length);
    let precision = args
        .first()
        .copied()
        .map(|p| p.clamp(0, u8::MAX as i64) as u8)
        .or(precision);
    let scale = args
        .get(1)
        .copied()
        .map(|s| s.clamp(0, u8::MAX as i64) as u8)
        .or(scale);

    match name.to_ascii_lowercase().as_str() {
        "int" | "integer" => SqlType::Int,
        "bigint" => SqlType::BigInt,
        "smallint" => SqlType::SmallInt,
        "tinyint" => SqlType::TinyInt,
        "bit" => SqlType::Bit,
        "date" => SqlType::Date,
        "datetime" => SqlType::DateTime,
        "datetime2" => SqlType::DateTime2(scale),
        "smalldatetime" => SqlType::SmallDateTime,
        "time" => SqlType::Time(scale),
        "nvarchar" => SqlType::NVarChar(variable_length(length)),
        "varchar" => SqlType::VarChar(variable_length(length)),
        "nchar" => SqlType::NChar(fixed_length(length)),
        "char" => SqlType::Char(fixed_length(length)),
        "varbinary" => SqlType::VarBinary(variable_length(length)),
        "binary" => SqlType::Binary(fixed_length(length)),
        "decimal" | "numeric" => SqlType::Decimal {
            precision: precision.unwrap_or(18),
            scale: scale.unwrap_or(0),
        },
        "float" => SqlType::Float,
        "real" => SqlType::Real,
        "money" => SqlType::Money,
        "uniqueidentifier" => SqlType::UniqueIdentifier,
        _ => SqlType::Other(name.to_ascii_uppercase()),
    }
}

fn variable_length(length: Option<i64>) -> SqlLength {
    match length {
        Some(-1) => SqlLength::Max,
        Some(n) if n > 0 => SqlLength::Fixed(n as u32),
        _ => SqlLength::Max,
    }
}

fn fixed_length(length: Option<i64>) -> u32 {
    match length {
        Some(n) if n > 0 => n as u32,
        _ => 1,
    }
}

/// Resolves an attribute's emitted data type.
///
/// Priority order:
/// 1. Identifiers and references to identifiers are always `BIGINT`.
/// 2. On-disk SQL type, when captured.
/// 3. External platform type hint.
/// 4. Logical data-type token mapping.
pub fn resolve_attribute_type(attr: &Attribute, default_text_length: u32) -> SqlType {
    if attr.is_identifier || attr.reference.is_some() {
        return SqlType::BigInt;
    }

    if let Some(disk) = &attr.on_disk {
        if let Some(sql_type) = &disk.sql_type {
            return parse_type_string(sql_type, disk.max_length, disk.precision, disk.scale);
        }
    }

    if let Some(hint) = &attr.external_type_hint {
        return parse_type_string(hint, attr.length, attr.precision, attr.scale);
    }

    map_logical_token(attr, default_text_length)
}

fn map_logical_token(attr: &Attribute, default_text_length: u32) -> SqlType {
    match attr.data_type.to_ascii_lowercase().as_str() {
        "integer" | "int" => SqlType::Int,
        "long" | "long integer" | "longinteger" => SqlType::BigInt,
        "boolean" | "bool" => SqlType::Bit,
        "date" => SqlType::Date,
        "datetime" | "date time" => SqlType::DateTime,
        "time" => SqlType::Time(None),
        "text" | "string" => SqlType::NVarChar(text_length(attr.length, default_text_length)),
        "email" => SqlType::VarChar(SqlLength::Fixed(250)),
        "phone" | "phone number" | "phonenumber" => SqlType::VarChar(SqlLength::Fixed(20)),
        "currency" => SqlType::Decimal {
            precision: 37,
            scale: 8,
        },
        "decimal" | "number" => SqlType::Decimal {
            precision: attr.precision.unwrap_or(37),
            scale: attr.scale.unwrap_or(8),
        },
        "binary" | "binary data" | "binarydata" => SqlType::VarBinary(SqlLength::Max),
        "identifier" => SqlType::BigInt,
        other => SqlType::Other(other.to_ascii_uppercase()),
    }
}

/// Text columns longer than this many characters become NVARCHAR(MAX).
const TEXT_MAX_THRESHOLD: i64 = 2000;

fn text_length(declared: Option<i64>, default_text_length: u32) -> SqlLength {
    match declared {
        Some(-1) => SqlLength::Max,
        Some(n) if n > TEXT_MAX_THRESHOLD => SqlLength::Max,
        Some(n) if n > 0 => SqlLength::Fixed(n as u32),
        _ => SqlLength::Fixed(default_text_length),
    }
}

/// Normalizes a declared default value for emission.
///
/// The literal words `true`/`false` become `(1)`/`(0)` for BIT columns;
/// anything else is wrapped in a single pair of parentheses unless already
/// parenthesized.
pub fn normalize_default(raw: &str, data_type: &SqlType) -> String {
    let trimmed = raw.trim();
    if data_type.is_bit() {
        if trimmed.eq_ignore_ascii_case("true") {
            return "(1)".to_owned();
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return "(0)".to_owned();
        }
    }
    if trimmed.starts_with('(') && trimmed.ends_with(')') {
        trimmed.to_owned()
    } else {
        format!("({trimmed})")
    }
}
