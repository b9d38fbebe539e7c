use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Backend-independent column type of an identifier column.
///
/// Parsed from and rendered to the short form used in plan files, e.g.
/// `bigint`, `varchar(36)` or `numeric(19,2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    SmallInt,
    Integer,
    BigInt,
    Numeric { precision: u8, scale: u8 },
    Varchar(u32),
    Char(u32),
    Uuid,
    Date,
    Timestamp,
}

impl ColumnType {
    /// Compact token used when deriving staging table names.
    pub fn name_token(&self) -> String {
        match self {
            ColumnType::SmallInt => "smallint".to_string(),
            ColumnType::Integer => "integer".to_string(),
            ColumnType::BigInt => "bigint".to_string(),
            ColumnType::Numeric { precision, scale } => format!("numeric{}_{}", precision, scale),
            ColumnType::Varchar(len) => format!("varchar{}", len),
            ColumnType::Char(len) => format!("char{}", len),
            ColumnType::Uuid => "uuid".to_string(),
            ColumnType::Date => "date".to_string(),
            ColumnType::Timestamp => "timestamp".to_string(),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::SmallInt => write!(f, "smallint"),
            ColumnType::Integer => write!(f, "integer"),
            ColumnType::BigInt => write!(f, "bigint"),
            ColumnType::Numeric { precision, scale } => write!(f, "numeric({},{})", precision, scale),
            ColumnType::Varchar(len) => write!(f, "varchar({})", len),
            ColumnType::Char(len) => write!(f, "char({})", len),
            ColumnType::Uuid => write!(f, "uuid"),
            ColumnType::Date => write!(f, "date"),
            ColumnType::Timestamp => write!(f, "timestamp"),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("Unknown column type: {0}")]
pub struct ParseColumnTypeError(String);

fn parse_args(raw: &str, args: &str) -> Result<Vec<u32>, ParseColumnTypeError> {
    args.split(',')
        .map(|a| a.trim().parse::<u32>().map_err(|_| ParseColumnTypeError(raw.to_string())))
        .collect()
}

impl FromStr for ColumnType {
    type Err = ParseColumnTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().to_ascii_lowercase();
        let (base, args) = match raw.find('(') {
            Some(open) if raw.ends_with(')') => {
                (raw[..open].trim(), Some(parse_args(s, &raw[open + 1..raw.len() - 1])?))
            }
            Some(_) => return Err(ParseColumnTypeError(s.to_string())),
            None => (raw.as_str(), None),
        };

        let column_type = match (base, args.as_deref()) {
            ("smallint", None) => ColumnType::SmallInt,
            ("integer" | "int", None) => ColumnType::Integer,
            ("bigint", None) => ColumnType::BigInt,
            ("numeric" | "decimal", Some([precision, scale])) => ColumnType::Numeric {
                precision: u8::try_from(*precision).map_err(|_| ParseColumnTypeError(s.to_string()))?,
                scale: u8::try_from(*scale).map_err(|_| ParseColumnTypeError(s.to_string()))?,
            },
            ("varchar", Some([len])) => ColumnType::Varchar(*len),
            ("char", Some([len])) => ColumnType::Char(*len),
            ("uuid", None) => ColumnType::Uuid,
            ("date", None) => ColumnType::Date,
            ("timestamp", None) => ColumnType::Timestamp,
            _ => return Err(ParseColumnTypeError(s.to_string())),
        };

        Ok(column_type)
    }
}

impl TryFrom<String> for ColumnType {
    type Error = ParseColumnTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentifierColumn {
    pub name: String,

    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl IdentifierColumn {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        IdentifierColumn { name: name.into(), column_type }
    }
}

/// Ordered primary-key shape of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentifierColumnSet(Vec<IdentifierColumn>);

impl IdentifierColumnSet {
    pub fn new(columns: Vec<IdentifierColumn>) -> Self {
        IdentifierColumnSet(columns)
    }

    pub fn single(name: impl Into<String>, column_type: ColumnType) -> Self {
        IdentifierColumnSet(vec![IdentifierColumn::new(name, column_type)])
    }

    pub fn iter(&self) -> impl Iterator<Item = &IdentifierColumn> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|c| c.name.as_str()).collect()
    }

    /// Stable textual key of the shape, `name:type` pairs in order.
    pub fn shape_key(&self) -> String {
        self.0
            .iter()
            .map(|c| format!("{}:{}", c.name, c.column_type))
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_column_types() {
        assert_eq!("bigint".parse::<ColumnType>().unwrap(), ColumnType::BigInt);
        assert_eq!("INT".parse::<ColumnType>().unwrap(), ColumnType::Integer);
        assert_eq!("varchar(36)".parse::<ColumnType>().unwrap(), ColumnType::Varchar(36));
        assert_eq!(
            "numeric(19, 2)".parse::<ColumnType>().unwrap(),
            ColumnType::Numeric { precision: 19, scale: 2 }
        );
        assert!("varchar".parse::<ColumnType>().is_err());
        assert!("blob".parse::<ColumnType>().is_err());
        assert!("numeric(400,2)".parse::<ColumnType>().is_err());
    }

    #[test]
    fn test_column_type_display_parses_back() {
        let ty = ColumnType::Numeric { precision: 10, scale: 0 };
        assert_eq!(ty.to_string().parse::<ColumnType>().unwrap(), ty);
    }

    #[test]
    fn test_identifier_columns_from_yaml() {
        let yaml = r#"
          - name: order_id
            type: bigint
          - name: line_no
            type: integer
        "#;

        let set: IdentifierColumnSet = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.names(), vec!["order_id", "line_no"]);
        assert_eq!(set.shape_key(), "order_id:bigint,line_no:integer");
    }
}
