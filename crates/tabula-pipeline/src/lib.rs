//! # Tabula Pipeline
//!
//! Priority-ordered row transformation pipelines.
//!
//! Modules cooperate on the table's rows without referencing each other: each
//! registers a handler with a numeric priority in the *data* pipeline (raw
//! rows to active rows) or the *display* pipeline (active rows to display
//! rows). A run is a synchronous left fold in ascending priority; equal
//! priorities keep registration order.
//!
//! ```rust
//! use serde_json::json;
//! use tabula_pipeline::{RowData, RowManager};
//!
//! let mut manager = RowManager::new();
//! manager.register_data_handler("limit", 10, |rows, _| Ok(rows.into_iter().take(1).collect()));
//!
//! let mut row = RowData::new();
//! row.insert("name".to_string(), json!("Ada"));
//! manager.set_data(vec![row.clone(), row]).unwrap();
//!
//! assert_eq!(manager.rows().len(), 2);
//! assert_eq!(manager.active_rows().len(), 1);
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod manager;
pub mod pipeline;
pub mod render;
pub mod row;

pub use error::{HandlerError, PipelineError, PipelineResult};
pub use manager::{RefreshTarget, RowManager};
pub use pipeline::{HandlerId, Pipeline, PipelineHandler, PipelineKind, PipelineStage, StageContext};
pub use render::{NullRenderer, RowRenderer};
pub use row::{Row, RowData, RowId};
