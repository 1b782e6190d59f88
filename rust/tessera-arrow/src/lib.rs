//! Arrow C-Data-Interface ingestion: a borrowed view over the standard
//! `ArrowSchema`/`ArrowArray` pair, a precomputed null-mask tree, and a
//! recursive format-string-driven converter into column vectors.
//!
//! Conversion is synchronous and reentrant; no state is shared across
//! calls, so disjoint destination vectors may be filled concurrently.

pub mod ffi;
pub mod null_mask;
pub mod scan;

pub use ffi::{ArrayView, ArrowArray, ArrowSchema};
pub use null_mask::NullMaskTree;
pub use scan::from_arrow_array;
