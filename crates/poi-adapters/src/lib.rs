//! Source-side contracts: query construction, the geodata source client and the
//! per-category record normalizers.

mod client;
pub mod normalize;
mod query;

pub use client::{parse_elements, FixtureSource, GeoSource, OverpassClient, SourceError};
pub use normalize::{
    normalize, normalize_batch, synthesize, DiscardReason, NormalizeContext, NormalizeOutcome,
    NormalizedBatch,
};
pub use query::{build_query, InvalidArea, QueryArea, TagFilter, QUERY_TIMEOUT_SECS};
