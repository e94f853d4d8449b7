//! Resolver Module
//!
//! Typeahead option-list resolution for relation fields, debounced and
//! memoized through the cache.

mod related;

// Re-export public types
pub use related::{RelatedDataResolver, RelatedOption, RelatedQuery};
