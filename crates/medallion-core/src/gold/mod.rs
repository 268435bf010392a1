//! Gold layer: dimensional marts built from Silver tables
//!
//! - `catalog`: the fixed set of marts, their dependencies and build order
//! - `plan`: optional allow-list of marts to build
//! - `schemas`: required columns per Silver input
//! - `builders`: the join/aggregate logic per mart

pub mod builders;
pub mod catalog;
pub mod plan;
pub mod schemas;

pub use builders::{build_mart, output_columns, BuildInputs};
pub use catalog::{build_order, Dependency, MartCategory, MartKind, Upstream};
pub use plan::MartPlan;
