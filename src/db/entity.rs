//! Entity descriptors
//!
//! A descriptor is the static schema handle the generic repository and the
//! list service work from: table name, primary key, declared columns and the
//! deletion capability of the table. Every resource declares exactly one.

/// Storage type of a declared column.
///
/// `BigInt` marks 64-bit identifier columns whose values are not safe to emit
/// as JSON numbers; `Integer` marks counters and small numbers that are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    BigInt,
    Integer,
    Float,
    Text,
    Bool,
    Timestamp,
}

/// A declared column: SQL name, JSON field name and storage kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub field: &'static str,
    pub kind: ColumnKind,
}

impl ColumnDef {
    pub const fn new(name: &'static str, field: &'static str, kind: ColumnKind) -> Self {
        Self { name, field, kind }
    }
}

/// Deletion capability of a table, fixed when the descriptor is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    /// Rows are hidden by stamping `deleted_at_column`; reads exclude them
    /// unless the caller opts in.
    SoftDeletable { deleted_at_column: &'static str },
    /// Rows are physically removed.
    HardDeleteOnly,
}

/// How new primary keys are assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdStrategy {
    /// The database assigns the key (AUTOINCREMENT / AUTO_INCREMENT).
    AutoIncrement,
    /// The application assigns a snowflake identifier before insert.
    Snowflake,
}

/// Static description of one storage table
#[derive(Debug, Clone, Copy)]
pub struct EntityDescriptor {
    pub table: &'static str,
    pub primary_key: &'static str,
    pub columns: &'static [ColumnDef],
    pub deletion: Deletion,
    pub id_strategy: IdStrategy,
    /// Optimistic-lock counter, compared and incremented on update
    pub version_column: Option<&'static str>,
}

impl EntityDescriptor {
    /// Soft-delete column, if the table has one
    pub fn deleted_at_column(&self) -> Option<&'static str> {
        match self.deletion {
            Deletion::SoftDeletable { deleted_at_column } => Some(deleted_at_column),
            Deletion::HardDeleteOnly => None,
        }
    }

    pub fn is_soft_deletable(&self) -> bool {
        self.deleted_at_column().is_some()
    }

    /// Look up a declared column by SQL name
    pub fn column(&self, name: &str) -> Option<&'static ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Comma-separated select list in declaration order
    pub fn select_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Sort direction; descending unless the client asks for ascending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// `asc` (any case) selects ascending; anything else is descending.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(s) if s.trim().eq_ignore_ascii_case("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Closed set of columns a resource may be sorted by.
///
/// Implemented by a per-resource enum, so only declared columns can ever
/// reach an ORDER BY clause.
pub trait SortColumn: Copy + Send + Sync + 'static {
    /// SQL column name
    fn column(self) -> &'static str;

    /// Resolve a client-supplied JSON field name
    fn from_field(field: &str) -> Option<Self>;
}

/// A storage-backed resource
pub trait Entity: Send + Sync + 'static {
    type Sort: SortColumn;

    fn descriptor() -> &'static EntityDescriptor;
}

/// Declare a sortable-column enum mapping JSON field names to SQL columns.
#[macro_export]
macro_rules! sort_columns {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident => ($field:literal, $column:literal)),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis enum $name {
            $($variant),+
        }

        impl $crate::db::entity::SortColumn for $name {
            fn column(self) -> &'static str {
                match self {
                    $($name::$variant => $column),+
                }
            }

            fn from_field(field: &str) -> Option<Self> {
                match field {
                    $($field => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}
