use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

/// Column holding the reference-table row a vector belongs to.
pub const ROW_COLUMN: &str = "row";
pub const KEY_COLUMN: &str = "ticket_key";
pub const TEXT_COLUMN: &str = "text";
pub const VECTOR_COLUMN: &str = "vector";
/// Distance column LanceDB adds to vector search results.
pub const DISTANCE_COLUMN: &str = "_distance";

pub fn ticket_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(ROW_COLUMN, DataType::Int64, false),
        Field::new(KEY_COLUMN, DataType::Utf8, false),
        Field::new(TEXT_COLUMN, DataType::Utf8, false),
        Field::new(VECTOR_COLUMN, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
    ]))
}
