//! Read-only operations over batches of JSON records.
//!
//! - `path`: dot-path field access and value coercions
//! - `filter`: AND-combined predicates, processed in chunks with progress
//! - `aggregate`: group-by with count/sum/avg/min/max/unique reductions
//! - `sample`: systematic, random and stratified down-sampling
//! - `search_results`: sampling, projection and summary of search hits
//!
//! Inputs are borrowed and never mutated; every operation returns new values.

pub mod aggregate;
pub mod filter;
pub mod path;
pub mod sample;
pub mod search_results;

pub use aggregate::{
    aggregate_metrics, AggregateOperation, AggregateResult, GroupSummary, MetricSpec, MetricValue,
};
pub use filter::{filter_records, FilterOperator, FilterOptions, FilterOutcome, FilterPredicate};
pub use path::get_path;
pub use sample::{sample_records, SamplingStrategy};
pub use search_results::{
    process_search_results, BasicStats, ProcessedMemory, SearchResultsSummary,
    SearchShapingOptions,
};
