//! Library catalog module
//!
//! Book records and categories the reading view is opened from.

mod catalog;

pub use catalog::{category_slug, BookRecord, Catalog, CatalogError, Category, ALL_CATEGORY};
