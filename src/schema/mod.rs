//! Destination schema: identifier safety and table (re)creation.

pub mod ddl;
pub mod identifier;

pub use ddl::{column_definitions, create_table, create_table_sql, drop_table_sql, validate_schema};
pub use identifier::{sanitize_header, split_file_name, table_name_from_file, validate_identifier};
