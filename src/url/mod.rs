//! URI handling module for Walker
//!
//! URIs are opaque strings throughout the crawler. The only rewrite applied is
//! scheme defaulting right before a network operation; equality everywhere
//! else is exact string match.

mod normalize;

pub use normalize::{ensure_scheme, SCHEME_SEPARATOR};
