//! Query composition: field registry, filters, sorting, includes and plans

mod fields;
mod filter;
mod include;
mod plan;
mod sort;

pub use fields::{FieldAccessor, FieldRegistry, FieldRegistryBuilder, FieldValue};
pub use filter::{FilterCondition, FilterOperator, FilterValue, Predicate};
pub use include::ResolvedInclude;
pub use plan::QueryPlan;
pub use sort::{OrderBy, SortOrder, SortRequest};
