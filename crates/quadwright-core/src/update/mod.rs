//! # Update Engine
//!
//! Turns an ordered sequence of `UpdateOperation`s into effects on a
//! `QuadStore`.
//!
//! ## Components
//!
//! - `UpdatePlanCompiler`: dispatches each operation, then commits
//! - `GraphOperationExecutor`: CREATE, ADD, COPY, MOVE, CLEAR, DROP
//! - `LiteralDataExecutor`: INSERT DATA, DELETE DATA
//! - `DeleteInsertEvaluator`: DELETE or INSERT driven by a WHERE pattern
//! - `DataLoader` (in `loader`): LOAD
//!
//! ## Error Policy
//!
//! Each operation carries an `ErrorPolicy`. The compiler consults it once,
//! after the executor returns: a SILENT operation turns `GraphExists` and
//! `LoadFailed` into a logged no-op. Every other failure propagates.

mod compiler;
mod context;
mod data;
mod delete_insert;
mod graph_ops;
mod operation;

pub use compiler::UpdatePlanCompiler;
pub use context::UpdateExecutionContext;
pub use data::LiteralDataExecutor;
pub use delete_insert::DeleteInsertEvaluator;
pub use graph_ops::GraphOperationExecutor;
pub use operation::{
    CreateGraph, DeleteInsert, DropGraph, ErrorPolicy, GraphData, GraphRef, GraphScope,
    GraphTransfer, LoadGraph, UpdateKind, UpdateOperation,
};
