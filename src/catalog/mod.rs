//! Catalog items and the attributes the matcher reads from them.
//!
//! Ingestion itself (spreadsheets, column mapping) happens elsewhere; this module
//! starts from [`CatalogRecord`] rows and derives normalized name, brand and spec
//! signature once per item.

pub mod attributes;
mod item;


pub use attributes::{bigram_similarity, spec_similarity};
pub use item::{CatalogItem, CatalogRecord, ItemId, Side, build_items};
