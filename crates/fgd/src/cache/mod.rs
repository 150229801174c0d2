//! On-disk cache of parsed FGDs, stored as binary packs beside a JSON manifest.

mod manifest;
mod pipeline;

pub use pipeline::{build_or_load_fgd, CacheError, CacheRequest};
