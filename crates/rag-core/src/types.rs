//! Core domain types for the RAG table system.

use std::cmp::Ordering;
use std::collections::{btree_map, BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Default table engine passed to the store on create.
pub const DEFAULT_ENGINE: &str = "MergeTree";

/// Default ordering key, which also names the identifier column.
pub const DEFAULT_ORDER_BY: &str = "id";

/// A single cell value.
///
/// Serialized untagged, so a record maps onto a flat JSON object and vectors
/// are plain numeric arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Vector(Vec<f32>),
}

impl Value {
    /// Check if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[f32]> {
        match self {
            Self::Vector(v) => Some(v),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Vector(_) => "vector",
        }
    }

    /// Total order used for deterministic tie-breaking.
    ///
    /// Nulls sort first, then booleans, numbers, text and vectors. Integers and
    /// floats compare numerically with each other.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Integer(_) | Value::Float(_) => 2,
                Value::Text(_) => 3,
                Value::Vector(_) => 4,
            }
        }

        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Integer(a), Self::Float(b)) => (*a as f64).total_cmp(b),
            (Self::Float(a), Self::Integer(b)) => a.total_cmp(&(*b as f64)),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Vector(a), Self::Vector(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.total_cmp(y) {
                        Ordering::Equal => continue,
                        other => return other,
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => write!(f, "{}", s),
            Self::Vector(v) => write!(f, "vector[{}]", v.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<f32>> for Value {
    fn from(v: Vec<f32>) -> Self {
        Self::Vector(v)
    }
}

/// A row as a mapping of column name to value.
///
/// Keys are kept sorted so serialization is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(column.into(), value.into())
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.0.remove(column)
    }

    pub fn contains_key(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keep only the given columns. An empty selection keeps everything.
    pub fn project(mut self, columns: &[&str]) -> Self {
        if !columns.is_empty() {
            self.0.retain(|k, _| columns.contains(&k.as_str()));
        }
        self
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Column type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    Bool,
    /// Array of floats; `dimension` is set for fixed-length vectors.
    ///
    /// Components are always `f32`. `Array(Float64)` is accepted as a tag
    /// but stored and returned with `f32` precision.
    Vector { dimension: Option<usize> },
}

impl ColumnType {
    pub fn is_vector(&self) -> bool {
        matches!(self, Self::Vector { .. })
    }

    /// Fixed vector length, if declared.
    pub fn dimension(&self) -> Option<usize> {
        match self {
            Self::Vector { dimension } => *dimension,
            _ => None,
        }
    }

    /// Check and convert a value written into a column of this type.
    pub fn coerce(&self, column: &str, value: Value) -> Result<Value> {
        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),
            (Self::Integer, v @ Value::Integer(_)) => Ok(v),
            (Self::Float, v @ Value::Float(_)) => Ok(v),
            (Self::Float, Value::Integer(i)) => Ok(Value::Float(i as f64)),
            (Self::Text, v @ Value::Text(_)) => Ok(v),
            (Self::Bool, v @ Value::Bool(_)) => Ok(v),
            (Self::Bool, Value::Integer(i)) if i == 0 || i == 1 => Ok(Value::Bool(i == 1)),
            (Self::Vector { dimension }, Value::Vector(v)) => match dimension {
                Some(d) if v.len() != *d => Err(RagError::schema_mismatch(format!(
                    "column '{}' expects {} floats, got {}",
                    column,
                    d,
                    v.len()
                ))),
                _ => Ok(Value::Vector(v)),
            },
            (ty, other) => Err(RagError::schema_mismatch(format!(
                "column '{}' expects {}, got {}",
                column,
                ty,
                other.type_name()
            ))),
        }
    }

    /// Convert a value read back from a store into this type where the
    /// representation allows it. Never fails; incompatible values pass through.
    pub fn normalize(&self, value: Value) -> Value {
        match (self, value) {
            (Self::Float, Value::Integer(i)) => Value::Float(i as f64),
            (Self::Bool, Value::Integer(i)) if i == 0 || i == 1 => Value::Bool(i == 1),
            (_, v) => v,
        }
    }

    /// Parse a command-line literal into a value of this type.
    pub fn parse_literal(&self, literal: &str) -> Result<Value> {
        let invalid = || {
            RagError::invalid_argument(format!("'{}' is not a valid {} literal", literal, self))
        };
        match self {
            Self::Integer => literal.trim().parse::<i64>().map(Value::Integer).map_err(|_| invalid()),
            Self::Float => literal.trim().parse::<f64>().map(Value::Float).map_err(|_| invalid()),
            Self::Text => Ok(Value::Text(literal.to_string())),
            Self::Bool => match literal.trim() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(invalid()),
            },
            Self::Vector { .. } => serde_json::from_str::<Vec<f32>>(literal)
                .map(Value::Vector)
                .map_err(|_| invalid()),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "Int64"),
            Self::Float => write!(f, "Float64"),
            Self::Text => write!(f, "String"),
            Self::Bool => write!(f, "Bool"),
            Self::Vector { dimension: None } => write!(f, "Array(Float32)"),
            Self::Vector { dimension: Some(d) } => write!(f, "Vector({})", d),
        }
    }
}

impl FromStr for ColumnType {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        let tag = s.trim();
        let lower = tag.to_ascii_lowercase();

        if let Some(inner) = lower
            .strip_prefix("nullable(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return inner.parse();
        }

        if let Some(inner) = lower
            .strip_prefix("vector(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let dimension: usize = inner
                .trim()
                .parse()
                .map_err(|_| RagError::schema(format!("invalid vector dimension in '{}'", tag)))?;
            if dimension == 0 {
                return Err(RagError::schema(format!("vector dimension must be positive in '{}'", tag)));
            }
            return Ok(Self::Vector {
                dimension: Some(dimension),
            });
        }

        match lower.replace(' ', "").as_str() {
            "int8" | "int16" | "int32" | "int64" | "uint8" | "uint16" | "uint32" | "uint64"
            | "int" | "integer" => Ok(Self::Integer),
            "float32" | "float64" | "float" | "double" | "real" => Ok(Self::Float),
            "string" | "text" => Ok(Self::Text),
            "bool" | "boolean" => Ok(Self::Bool),
            "array(float32)" | "array(float64)" => Ok(Self::Vector { dimension: None }),
            _ => Err(RagError::schema(format!("unsupported column type '{}'", tag))),
        }
    }
}

impl TryFrom<String> for ColumnType {
    type Error = RagError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ColumnType> for String {
    fn from(ty: ColumnType) -> Self {
        ty.to_string()
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,

    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Ordered column layout of a table.
///
/// Designates at most one vector column and, optionally, the column whose
/// value is handed to vectorizers.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Vec<Column>,
    vector_column: Option<String>,
    vectorize_from: Option<String>,
}

impl Schema {
    /// Create a schema from ordered columns.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if columns.is_empty() {
            return Err(RagError::schema("schema must declare at least one column"));
        }

        let mut seen = HashSet::new();
        for column in &columns {
            if column.name.trim().is_empty() {
                return Err(RagError::schema("column names must not be empty"));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(RagError::schema(format!("duplicate column '{}'", column.name)));
            }
        }

        Ok(Self {
            columns,
            vector_column: None,
            vectorize_from: None,
        })
    }

    /// Create a schema from `(name, type tag)` pairs, e.g. `("vector", "Array(Float32)")`.
    pub fn parse<N, T>(pairs: impl IntoIterator<Item = (N, T)>) -> Result<Self>
    where
        N: Into<String>,
        T: AsRef<str>,
    {
        let columns = pairs
            .into_iter()
            .map(|(name, tag)| -> Result<Column> {
                let column_type: ColumnType = tag.as_ref().parse()?;
                Ok(Column::new(name, column_type))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(columns)
    }

    /// Designate the vector column explicitly.
    pub fn with_vector_column(mut self, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        match self.column(&name) {
            Some(c) if c.column_type.is_vector() => {}
            Some(c) => {
                return Err(RagError::schema(format!(
                    "vector column '{}' has non-vector type {}",
                    name, c.column_type
                )))
            }
            None => return Err(RagError::schema(format!("unknown vector column '{}'", name))),
        }
        self.vector_column = Some(name);
        Ok(self)
    }

    /// Designate the column whose value vectorizers consume.
    pub fn with_vectorize_from(mut self, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if !self.contains(&name) {
            return Err(RagError::schema(format!("unknown vectorize-from column '{}'", name)));
        }
        self.vectorize_from = Some(name);
        Ok(self)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// The vector column: the designated one, else the only vector-typed column.
    pub fn vector_column(&self) -> Result<Option<&Column>> {
        if let Some(name) = &self.vector_column {
            return Ok(self.column(name));
        }

        let mut vectors = self.columns.iter().filter(|c| c.column_type.is_vector());
        match (vectors.next(), vectors.next()) {
            (None, _) => Ok(None),
            (Some(only), None) => Ok(Some(only)),
            (Some(_), Some(_)) => Err(RagError::schema(
                "several vector columns declared; designate one as the vector column",
            )),
        }
    }

    /// The column vectorizers consume, if designated.
    pub fn vectorize_from(&self) -> Option<&Column> {
        self.vectorize_from.as_deref().and_then(|name| self.column(name))
    }

    /// Validate a record for writing: rejects unknown columns and coerces
    /// values to the column types.
    pub fn validate_record(&self, record: Record) -> Result<Record> {
        record
            .into_iter()
            .map(|(name, value)| match self.column(&name) {
                Some(column) => {
                    let value = column.column_type.coerce(&name, value)?;
                    Ok((name, value))
                }
                None => Err(RagError::schema_mismatch(format!("unknown column '{}'", name))),
            })
            .collect()
    }

    /// Normalize a record read back from the store. Columns outside the
    /// schema are left untouched.
    pub fn normalize_record(&self, record: Record) -> Record {
        record
            .into_iter()
            .map(|(name, value)| match self.column(&name) {
                Some(column) => {
                    let value = column.column_type.normalize(value);
                    (name, value)
                }
                None => (name, value),
            })
            .collect()
    }
}

/// Logical binding of a table name to its schema and store options.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    pub name: String,
    pub schema: Schema,
    pub engine: String,
    pub order_by: String,
}

impl TableDef {
    /// Create a table definition with the default engine and ordering key.
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            engine: DEFAULT_ENGINE.to_string(),
            order_by: DEFAULT_ORDER_BY.to_string(),
        }
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = order_by.into();
        self
    }

    /// Ordering key columns, e.g. `(id, created_at)` -> `["id", "created_at"]`.
    pub fn order_by_keys(&self) -> Vec<&str> {
        let mut keys = self.order_by.trim();
        if let Some(rest) = keys.strip_prefix("tuple") {
            keys = rest.trim_start();
        }
        keys.trim_start_matches('(')
            .trim_end_matches(')')
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect()
    }

    /// The identifier column: the first ordering key naming a schema column.
    pub fn identifier(&self) -> Result<&Column> {
        self.order_by_keys()
            .into_iter()
            .find_map(|key| self.schema.column(key))
            .ok_or_else(|| {
                RagError::schema(format!(
                    "no identifier column resolvable from order_by '{}'",
                    self.order_by
                ))
            })
    }

    /// Check the definition is usable.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(RagError::schema("table name must not be empty"));
        }
        if self.engine.trim().is_empty() {
            return Err(RagError::schema("table engine must not be empty"));
        }

        let identifier = self.identifier()?;
        if identifier.column_type.is_vector() {
            return Err(RagError::schema(format!(
                "identifier column '{}' cannot be a vector",
                identifier.name
            )));
        }

        self.schema.vector_column()?;
        Ok(())
    }
}

/// Tabular result of a store statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Column names, in row order.
    pub columns: Vec<String>,

    /// Row values, each aligned with `columns`.
    pub rows: Vec<Vec<Value>>,

    /// Rows affected by a write statement.
    pub affected: usize,
}

impl QueryResult {
    /// A result for a write statement.
    pub fn affected(affected: usize) -> Self {
        Self {
            affected,
            ..Default::default()
        }
    }

    /// First cell of the first row.
    pub fn scalar(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }

    /// Zip each row with the column names.
    pub fn into_records(self) -> Vec<Record> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|row| columns.iter().cloned().zip(row).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::parse([
            ("id", "String"),
            ("title", "String"),
            ("views", "UInt32"),
            ("score", "Float32"),
            ("published", "Bool"),
            ("vector", "Vector(3)"),
        ])
        .unwrap()
    }

    #[test]
    fn test_column_type_parse() {
        assert_eq!("String".parse::<ColumnType>().unwrap(), ColumnType::Text);
        assert_eq!("UInt64".parse::<ColumnType>().unwrap(), ColumnType::Integer);
        assert_eq!("Float32".parse::<ColumnType>().unwrap(), ColumnType::Float);
        assert_eq!(
            "Array(Float32)".parse::<ColumnType>().unwrap(),
            ColumnType::Vector { dimension: None }
        );
        assert_eq!(
            "Vector(384)".parse::<ColumnType>().unwrap(),
            ColumnType::Vector {
                dimension: Some(384)
            }
        );
        assert_eq!(
            "Nullable(String)".parse::<ColumnType>().unwrap(),
            ColumnType::Text
        );
        assert!("Map(String, String)".parse::<ColumnType>().is_err());
        assert!("Vector(0)".parse::<ColumnType>().is_err());
    }

    #[test]
    fn test_float64_arrays_are_f32_vectors() {
        let ty = "Array(Float64)".parse::<ColumnType>().unwrap();
        assert_eq!(ty, ColumnType::Vector { dimension: None });
        assert_eq!(ty.to_string(), "Array(Float32)");
    }

    #[test]
    fn test_column_type_display_parses_back() {
        for ty in [
            ColumnType::Integer,
            ColumnType::Float,
            ColumnType::Text,
            ColumnType::Bool,
            ColumnType::Vector { dimension: None },
            ColumnType::Vector { dimension: Some(8) },
        ] {
            assert_eq!(ty.to_string().parse::<ColumnType>().unwrap(), ty);
        }
    }

    #[test]
    fn test_value_json_shape() {
        let record = Record::new()
            .with("id", "a")
            .with("n", 3i64)
            .with("x", 1.5)
            .with("ok", true)
            .with("vector", vec![0.25f32, -1.0]);

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"id":"a","n":3,"ok":true,"vector":[0.25,-1.0],"x":1.5}"#
        );

        let parsed: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_value_json_null_and_float() {
        let parsed: Record = serde_json::from_str(r#"{"a":null,"b":2.0,"c":[]}"#).unwrap();
        assert_eq!(parsed.get("a"), Some(&Value::Null));
        assert_eq!(parsed.get("b"), Some(&Value::Float(2.0)));
        assert_eq!(parsed.get("c"), Some(&Value::Vector(vec![])));
    }

    #[test]
    fn test_value_total_cmp() {
        assert_eq!(Value::from(1i64).total_cmp(&Value::from(2i64)), Ordering::Less);
        assert_eq!(Value::from(2i64).total_cmp(&Value::from(1.5)), Ordering::Greater);
        assert_eq!(Value::from("a").total_cmp(&Value::from("b")), Ordering::Less);
        assert_eq!(Value::Null.total_cmp(&Value::from("a")), Ordering::Less);
    }

    #[test]
    fn test_validate_record_coerces() {
        let record = Record::new()
            .with("id", "1")
            .with("score", 2i64)
            .with("published", 1i64);

        let validated = schema().validate_record(record).unwrap();
        assert_eq!(validated.get("score"), Some(&Value::Float(2.0)));
        assert_eq!(validated.get("published"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_validate_record_rejects_unknown_column() {
        let record = Record::new().with("id", "1").with("body", "text");
        let err = schema().validate_record(record).unwrap_err();
        assert!(matches!(err, RagError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_validate_record_rejects_wrong_type_and_length() {
        let err = schema()
            .validate_record(Record::new().with("views", "many"))
            .unwrap_err();
        assert!(matches!(err, RagError::SchemaMismatch { .. }));

        let err = schema()
            .validate_record(Record::new().with("vector", vec![1.0f32, 2.0]))
            .unwrap_err();
        assert!(matches!(err, RagError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_schema_rejects_duplicates() {
        let err = Schema::parse([("id", "String"), ("id", "Int64")]).unwrap_err();
        assert!(matches!(err, RagError::Schema { .. }));
    }

    #[test]
    fn test_vector_column_resolution() {
        assert_eq!(schema().vector_column().unwrap().unwrap().name, "vector");

        let two = Schema::parse([("id", "String"), ("a", "Array(Float32)"), ("b", "Array(Float32)")])
            .unwrap();
        assert!(two.vector_column().is_err());

        let designated = two.with_vector_column("b").unwrap();
        assert_eq!(designated.vector_column().unwrap().unwrap().name, "b");

        let none = Schema::parse([("id", "String")]).unwrap();
        assert!(none.vector_column().unwrap().is_none());
    }

    #[test]
    fn test_identifier_from_order_by() {
        let table = TableDef::new("docs", schema());
        assert_eq!(table.identifier().unwrap().name, "id");

        let table = TableDef::new("docs", schema()).with_order_by("(title, id)");
        assert_eq!(table.identifier().unwrap().name, "title");

        let table = TableDef::new("docs", schema()).with_order_by("tuple(created_at, id)");
        assert_eq!(table.order_by_keys(), vec!["created_at", "id"]);
        assert_eq!(table.identifier().unwrap().name, "id");

        let table = TableDef::new("docs", schema()).with_order_by("created_at");
        assert!(matches!(table.validate(), Err(RagError::Schema { .. })));
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(ColumnType::Integer.parse_literal("42").unwrap(), Value::Integer(42));
        assert_eq!(ColumnType::Text.parse_literal("42").unwrap(), Value::from("42"));
        assert_eq!(
            ColumnType::Vector { dimension: None }
                .parse_literal("[1, 0.5]")
                .unwrap(),
            Value::Vector(vec![1.0, 0.5])
        );
        assert!(ColumnType::Integer.parse_literal("x").is_err());
    }

    #[test]
    fn test_query_result_into_records() {
        let result = QueryResult {
            columns: vec!["id".to_string(), "title".to_string()],
            rows: vec![vec![Value::from("1"), Value::from("hello")]],
            affected: 0,
        };
        let records = result.into_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("title"), Some(&Value::from("hello")));
    }
}
