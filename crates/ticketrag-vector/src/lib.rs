//! LanceDB-backed similarity index over the reference ticket table.

pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use search::LanceTicketIndex;
pub use writer::{build_index, IndexBuildReport, TicketIndexWriter};
