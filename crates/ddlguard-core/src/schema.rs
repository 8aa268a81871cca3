//! Schema types and the MySQL-compatible column type system

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage type of a column
///
/// Mirrors the storage engine's type tags; display widths and aliases are
/// normalised away by [`ColumnType::from_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    TinyInt,
    SmallInt,
    MediumInt,
    Int,
    BigInt,
    Decimal,
    Float,
    Double,
    Bit,
    Year,
    Date,
    Time,
    Datetime,
    Timestamp,
    Char,
    Varchar,
    TinyText,
    Text,
    MediumText,
    LongText,
    Binary,
    Varbinary,
    TinyBlob,
    Blob,
    MediumBlob,
    LongBlob,
    Enum,
    Set,
    Json,
}

/// Groups of kinds that share a storage representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFamily {
    Integer,
    Decimal,
    Float,
    Double,
    Bit,
    Year,
    Date,
    Time,
    Datetime,
    Timestamp,
    /// Character strings (CHAR, VARCHAR, TEXT variants)
    Text,
    /// Byte strings (BINARY, VARBINARY, BLOB variants)
    Binary,
    Enum,
    Set,
    Json,
}

impl TypeKind {
    /// Canonical SQL keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TinyInt => "TINYINT",
            Self::SmallInt => "SMALLINT",
            Self::MediumInt => "MEDIUMINT",
            Self::Int => "INT",
            Self::BigInt => "BIGINT",
            Self::Decimal => "DECIMAL",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Bit => "BIT",
            Self::Year => "YEAR",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Datetime => "DATETIME",
            Self::Timestamp => "TIMESTAMP",
            Self::Char => "CHAR",
            Self::Varchar => "VARCHAR",
            Self::TinyText => "TINYTEXT",
            Self::Text => "TEXT",
            Self::MediumText => "MEDIUMTEXT",
            Self::LongText => "LONGTEXT",
            Self::Binary => "BINARY",
            Self::Varbinary => "VARBINARY",
            Self::TinyBlob => "TINYBLOB",
            Self::Blob => "BLOB",
            Self::MediumBlob => "MEDIUMBLOB",
            Self::LongBlob => "LONGBLOB",
            Self::Enum => "ENUM",
            Self::Set => "SET",
            Self::Json => "JSON",
        }
    }

    pub fn family(&self) -> TypeFamily {
        match self {
            Self::TinyInt | Self::SmallInt | Self::MediumInt | Self::Int | Self::BigInt => {
                TypeFamily::Integer
            }
            Self::Decimal => TypeFamily::Decimal,
            Self::Float => TypeFamily::Float,
            Self::Double => TypeFamily::Double,
            Self::Bit => TypeFamily::Bit,
            Self::Year => TypeFamily::Year,
            Self::Date => TypeFamily::Date,
            Self::Time => TypeFamily::Time,
            Self::Datetime => TypeFamily::Datetime,
            Self::Timestamp => TypeFamily::Timestamp,
            Self::Char
            | Self::Varchar
            | Self::TinyText
            | Self::Text
            | Self::MediumText
            | Self::LongText => TypeFamily::Text,
            Self::Binary
            | Self::Varbinary
            | Self::TinyBlob
            | Self::Blob
            | Self::MediumBlob
            | Self::LongBlob => TypeFamily::Binary,
            Self::Enum => TypeFamily::Enum,
            Self::Set => TypeFamily::Set,
            Self::Json => TypeFamily::Json,
        }
    }

    /// Whether values of this kind carry a character set and collation
    pub fn has_charset(&self) -> bool {
        matches!(
            self.family(),
            TypeFamily::Text | TypeFamily::Enum | TypeFamily::Set
        )
    }

    /// Default display length, used when a definition omits one
    ///
    /// For integers this is the width the engine assumes for the signed
    /// type, which also orders the integer kinds by storage size.
    pub fn default_length(&self) -> Option<u64> {
        match self {
            Self::TinyInt => Some(4),
            Self::SmallInt => Some(6),
            Self::MediumInt => Some(9),
            Self::Int => Some(11),
            Self::BigInt => Some(20),
            Self::Decimal => Some(10),
            Self::Bit => Some(1),
            Self::Year => Some(4),
            Self::Char | Self::Binary => Some(1),
            Self::TinyText | Self::TinyBlob => Some(255),
            Self::Text | Self::Blob => Some(65_535),
            Self::MediumText | Self::MediumBlob => Some(16_777_215),
            Self::LongText | Self::LongBlob => Some(4_294_967_295),
            _ => None,
        }
    }

    /// Whether the definition must spell out a length
    fn requires_length(&self) -> bool {
        matches!(self, Self::Varchar | Self::Varbinary)
    }

    /// Whether the single type argument is a fractional-seconds precision
    fn is_temporal_with_fsp(&self) -> bool {
        matches!(self, Self::Time | Self::Datetime | Self::Timestamp)
    }

    fn from_keyword(keyword: &str) -> Option<(Self, Option<u64>)> {
        let kind = match keyword {
            "TINYINT" | "INT1" => Self::TinyInt,
            "BOOL" | "BOOLEAN" => return Some((Self::TinyInt, Some(1))),
            "SMALLINT" | "INT2" => Self::SmallInt,
            "MEDIUMINT" | "INT3" | "MIDDLEINT" => Self::MediumInt,
            "INT" | "INTEGER" | "INT4" => Self::Int,
            "BIGINT" | "INT8" => Self::BigInt,
            "DECIMAL" | "DEC" | "NUMERIC" | "FIXED" => Self::Decimal,
            "FLOAT" | "FLOAT4" => Self::Float,
            "DOUBLE" | "REAL" | "FLOAT8" | "DOUBLE PRECISION" => Self::Double,
            "BIT" => Self::Bit,
            "YEAR" => Self::Year,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "DATETIME" => Self::Datetime,
            "TIMESTAMP" => Self::Timestamp,
            "CHAR" | "CHARACTER" | "NCHAR" | "NATIONAL CHAR" => Self::Char,
            "VARCHAR" | "CHARACTER VARYING" | "NVARCHAR" | "NATIONAL VARCHAR" => Self::Varchar,
            "TINYTEXT" => Self::TinyText,
            "TEXT" => Self::Text,
            "MEDIUMTEXT" | "LONG" | "LONG VARCHAR" => Self::MediumText,
            "LONGTEXT" => Self::LongText,
            "BINARY" => Self::Binary,
            "VARBINARY" => Self::Varbinary,
            "TINYBLOB" => Self::TinyBlob,
            "BLOB" => Self::Blob,
            "MEDIUMBLOB" | "LONG VARBINARY" => Self::MediumBlob,
            "LONGBLOB" => Self::LongBlob,
            "ENUM" => Self::Enum,
            "SET" => Self::Set,
            "JSON" => Self::Json,
            _ => return None,
        };
        Some((kind, None))
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column type: kind plus its length, scale, sign and members
///
/// `scale` is the number of fractional digits for DECIMAL/FLOAT/DOUBLE and
/// the fractional-seconds precision for TIME/DATETIME/TIMESTAMP.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColumnType {
    pub kind: TypeKind,
    pub length: Option<u64>,
    pub scale: Option<u32>,
    pub unsigned: bool,
    /// ENUM / SET members in declaration order
    pub members: Vec<String>,
}

impl ColumnType {
    /// A type with no explicit length, scale or members
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            length: None,
            scale: None,
            unsigned: false,
            members: Vec::new(),
        }
    }

    pub fn with_length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    pub fn with_members(mut self, members: Vec<String>) -> Self {
        self.members = members;
        self
    }

    pub fn varchar(length: u64) -> Self {
        Self::new(TypeKind::Varchar).with_length(length)
    }

    pub fn char(length: u64) -> Self {
        Self::new(TypeKind::Char).with_length(length)
    }

    pub fn decimal(precision: u64, scale: u32) -> Self {
        Self::new(TypeKind::Decimal).with_length(precision).with_scale(scale)
    }

    pub fn family(&self) -> TypeFamily {
        self.kind.family()
    }

    /// Length with the kind's default applied
    pub fn effective_length(&self) -> Option<u64> {
        self.length.or_else(|| self.kind.default_length())
    }

    /// Scale with the implicit zero applied
    pub fn effective_scale(&self) -> u32 {
        self.scale.unwrap_or(0)
    }

    /// Upper bound on stored digits; `None` is unbounded
    ///
    /// FLOAT and DOUBLE without an explicit `(M,D)` store full machine
    /// precision, so only the two-argument form bounds them.
    pub fn precision_bound(&self) -> Option<u64> {
        match self.family() {
            TypeFamily::Float | TypeFamily::Double => self.scale.and(self.length),
            _ => self.effective_length(),
        }
    }

    /// Upper bound on fractional digits; `None` is unbounded
    pub fn scale_bound(&self) -> Option<u32> {
        match self.family() {
            TypeFamily::Float | TypeFamily::Double => self.scale,
            _ => Some(self.effective_scale()),
        }
    }

    /// Whether the type carries a character set
    pub fn is_string(&self) -> bool {
        self.kind.has_charset()
    }

    fn parse_arguments(&mut self, args: &str) -> Result<(), TypeParseError> {
        if matches!(self.kind, TypeKind::Enum | TypeKind::Set) {
            self.members = parse_members(args)?;
            return Ok(());
        }

        let numbers = args
            .split(',')
            .map(|part| {
                let part = part.trim();
                part.parse::<u64>()
                    .map_err(|_| TypeParseError::InvalidArgument(part.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        match (self.kind, numbers.as_slice()) {
            (kind, [fsp]) if kind.is_temporal_with_fsp() => {
                self.scale = Some(to_scale(*fsp)?);
            }
            (TypeKind::Decimal | TypeKind::Float | TypeKind::Double, [length, scale]) => {
                self.length = Some(*length);
                self.scale = Some(to_scale(*scale)?);
            }
            (_, [length]) => self.length = Some(*length),
            _ => return Err(TypeParseError::InvalidArgument(args.to_string())),
        }

        Ok(())
    }
}

fn to_scale(value: u64) -> Result<u32, TypeParseError> {
    u32::try_from(value).map_err(|_| TypeParseError::InvalidArgument(value.to_string()))
}

/// Parse `'a', 'b''s', "c"` into member strings
fn parse_members(args: &str) -> Result<Vec<String>, TypeParseError> {
    let mut members = Vec::new();
    let mut chars = args.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let Some(quote) = chars.next() else { break };
        if quote != '\'' && quote != '"' {
            return Err(TypeParseError::InvalidArgument(args.to_string()));
        }

        let mut member = String::new();
        loop {
            match chars.next() {
                Some(c) if c == quote => {
                    // A doubled quote is an escaped quote
                    if chars.peek() == Some(&quote) {
                        chars.next();
                        member.push(quote);
                    } else {
                        break;
                    }
                }
                Some('\\') => {
                    if let Some(escaped) = chars.next() {
                        member.push(escaped);
                    }
                }
                Some(c) => member.push(c),
                None => return Err(TypeParseError::UnterminatedString(args.to_string())),
            }
        }
        members.push(member);

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            Some(',') => continue,
            None => break,
            Some(_) => return Err(TypeParseError::InvalidArgument(args.to_string())),
        }
    }

    Ok(members)
}

impl FromStr for ColumnType {
    type Err = TypeParseError;

    /// Parse a MySQL type spelling such as `VARCHAR(20)`, `INT(11) UNSIGNED`,
    /// `DECIMAL(10,2)` or `ENUM('a','b')`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TypeParseError::Empty);
        }

        let (head, args, tail) = match s.find('(') {
            Some(open) => {
                let close = s
                    .rfind(')')
                    .filter(|close| *close > open)
                    .ok_or_else(|| TypeParseError::InvalidArgument(s.to_string()))?;
                (&s[..open], Some(&s[open + 1..close]), &s[close + 1..])
            }
            None => (s, None, ""),
        };

        let mut words: Vec<String> = head
            .split_whitespace()
            .chain(tail.split_whitespace())
            .map(|w| w.to_ascii_uppercase())
            .collect();
        if words.is_empty() {
            return Err(TypeParseError::Empty);
        }

        // Multi-word keywords come first; modifiers follow them
        let (kind, implied_length, consumed) = [2usize, 1]
            .iter()
            .filter(|n| **n <= words.len() && (args.is_none() || **n <= head.split_whitespace().count()))
            .find_map(|n| {
                TypeKind::from_keyword(&words[..*n].join(" "))
                    .map(|(kind, implied)| (kind, implied, *n))
            })
            .ok_or_else(|| TypeParseError::UnknownType(words[0].clone()))?;
        words.drain(..consumed);

        let mut ty = ColumnType::new(kind);
        ty.length = implied_length;

        if let Some(args) = args {
            ty.parse_arguments(args)?;
        }

        for word in words {
            match word.as_str() {
                "UNSIGNED" | "ZEROFILL" => ty.unsigned = true,
                "SIGNED" => {}
                other => return Err(TypeParseError::UnexpectedToken(other.to_string())),
            }
        }

        if kind.requires_length() && ty.length.is_none() {
            return Err(TypeParseError::MissingLength(kind));
        }
        if matches!(kind, TypeKind::Enum | TypeKind::Set) && ty.members.is_empty() {
            return Err(TypeParseError::MissingMembers(kind));
        }

        Ok(ty)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if matches!(self.kind, TypeKind::Enum | TypeKind::Set) {
            let members: Vec<String> = self
                .members
                .iter()
                .map(|m| format!("'{}'", m.replace('\'', "''")))
                .collect();
            write!(f, "({})", members.join(","))?;
        } else if self.kind.is_temporal_with_fsp() {
            if let Some(fsp) = self.scale {
                write!(f, "({})", fsp)?;
            }
        } else {
            match (self.length, self.scale) {
                (Some(length), Some(scale)) => write!(f, "({},{})", length, scale)?,
                (Some(length), None) => write!(f, "({})", length)?,
                _ => {}
            }
        }

        if self.unsigned {
            write!(f, " UNSIGNED")?;
        }
        Ok(())
    }
}

impl TryFrom<String> for ColumnType {
    type Error = TypeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        value.to_string()
    }
}

/// Errors raised while parsing a type spelling
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeParseError {
    #[error("Empty type definition")]
    Empty,

    #[error("Unknown column type: {0}")]
    UnknownType(String),

    #[error("Invalid type argument: {0}")]
    InvalidArgument(String),

    #[error("Unterminated string in member list: {0}")]
    UnterminatedString(String),

    #[error("Unexpected token in type definition: {0}")]
    UnexpectedToken(String),

    #[error("{0} requires a length")]
    MissingLength(TypeKind),

    #[error("{0} requires at least one member")]
    MissingMembers(TypeKind),
}

fn default_true() -> bool {
    true
}

/// A column in a table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    /// Column name as declared
    pub name: String,

    /// Column type
    #[serde(rename = "type")]
    pub column_type: ColumnType,

    /// Whether NULL is accepted
    #[serde(default = "default_true")]
    pub nullable: bool,

    /// Default value expression, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Character set (string types only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,

    /// Collation (string types only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
}

impl Column {
    /// Create a nullable column without default or explicit charset
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            default: None,
            charset: None,
            collation: None,
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn not_null(self) -> Self {
        self.with_nullable(false)
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn with_collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    /// Whether the column has a default that can fill existing rows
    ///
    /// `DEFAULT NULL` does not count.
    pub fn has_default(&self) -> bool {
        self.default
            .as_deref()
            .is_some_and(|d| !d.trim().eq_ignore_ascii_case("null"))
    }
}

/// An index over an ordered list of columns
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Index {
    /// Index name (`PRIMARY` for the primary key)
    pub name: String,

    /// Referenced column names in key order
    pub columns: Vec<String>,

    /// Whether the index enforces uniqueness
    pub unique: bool,

    /// Whether this is the primary key
    #[serde(default)]
    pub primary: bool,
}

impl Index {
    pub const PRIMARY_NAME: &'static str = "PRIMARY";

    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            unique: false,
            primary: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn primary(columns: Vec<String>) -> Self {
        Self {
            name: Self::PRIMARY_NAME.to_string(),
            columns,
            unique: true,
            primary: true,
        }
    }
}

/// A snapshot of a table definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Owning database
    pub database: String,

    /// Table name
    pub name: String,

    /// Columns in declaration order
    pub columns: Vec<Column>,

    /// Indexes in creation order
    pub indexes: Vec<Index>,

    /// Table default character set
    pub charset: String,

    /// Table default collation
    pub collation: String,
}

impl TableSchema {
    /// Qualified `database.table` name
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.database, self.name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}
