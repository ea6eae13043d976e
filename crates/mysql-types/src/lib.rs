//! MySQL conversions for sync-core rows.
//!
//! # Structure
//!
//! - `forward`: Convert `FieldValue` → `MySQLValue` (bound INSERT parameters)
//! - `literal`: Identifier quoting and string-literal escaping
//! - `statement`: Single-row `InsertStatement` in parameterized and literal form
//!
//! # Example
//!
//! ```rust
//! use mysql_types::{InsertStatement, WriteMode};
//! use sync_core::{FieldValue, ProjectedRow};
//!
//! let mut row = ProjectedRow::new("scrapy_xywy");
//! row.push("title", FieldValue::Text("it's".into()));
//!
//! let stmt = InsertStatement::new(row, WriteMode::Insert);
//! assert_eq!(stmt.sql(), "INSERT INTO `scrapy_xywy` (`title`) VALUES (?)");
//! assert_eq!(
//!     stmt.to_literal_sql(),
//!     r"INSERT INTO `scrapy_xywy` (`title`) VALUES ('it\'s')"
//! );
//! ```

pub mod forward;
pub mod literal;
pub mod statement;

pub use forward::MySQLValue;
pub use literal::{escape_string, quote_identifier, quote_string, to_literal};
pub use statement::{InsertStatement, WriteMode};
