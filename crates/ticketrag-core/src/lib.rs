#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod categories;
pub mod config;
pub mod context;
pub mod data_processor;
pub mod error;
pub mod insight_log;
pub mod normalize;
pub mod prompt;
pub mod retrieval;
pub mod table;
pub mod traits;
pub mod types;

pub use context::{AssemblyConfig, Candidate, ContextAssembler};
pub use normalize::normalize;
pub use prompt::{build_prompt, build_question_prompt};
pub use table::ReferenceTable;
