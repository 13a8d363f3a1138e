//! Book catalog
//!
//! Loads the books manifest (a JSON array of records), normalizes missing
//! fields and answers category/search queries.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Pseudo-category that disables category filtering
pub const ALL_CATEGORY: &str = "all";

const UNKNOWN_TITLE_AR: &str = "عنوان غير معروف";
const UNKNOWN_AUTHOR_AR: &str = "مؤلف غير معروف";
const DEFAULT_COVER_TEXT: &str = "كتاب";
const DEFAULT_CATEGORY: &str = "Miscellaneous";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Raw record as found in the manifest; every field may be missing.
#[derive(Debug, Default, Deserialize)]
struct RawBookRecord {
    title_ar: Option<String>,
    author_ar: Option<String>,
    title_en: Option<String>,
    author_en: Option<String>,
    filename: Option<String>,
    #[serde(rename = "coverText")]
    cover_text: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    source: Option<String>,
    category: Option<String>,
    id: Option<Value>,
    featured: Option<bool>,
}

/// Normalized catalog record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: u64,
    pub title_ar: String,
    pub author_ar: String,
    pub title_en: String,
    pub author_en: String,
    pub filename: String,
    #[serde(rename = "coverText")]
    pub cover_text: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub source: String,
    pub category: String,
    pub featured: bool,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl BookRecord {
    fn normalize(raw: RawBookRecord, position: usize) -> Self {
        let title_ar = non_empty(raw.title_ar);
        let author_ar = non_empty(raw.author_ar);

        // Numeric or numeric-string ids are kept, anything else takes the position.
        let id = match raw.id {
            Some(Value::Number(n)) => n.as_u64().filter(|n| *n > 0),
            Some(Value::String(s)) => s.trim().parse::<u64>().ok().filter(|n| *n > 0),
            _ => None,
        }
        .unwrap_or(position as u64 + 1);

        Self {
            id,
            title_en: non_empty(raw.title_en)
                .or_else(|| title_ar.clone())
                .unwrap_or_else(|| "Unknown Title".to_string()),
            author_en: non_empty(raw.author_en)
                .or_else(|| author_ar.clone())
                .unwrap_or_else(|| "Unknown Author".to_string()),
            title_ar: title_ar.unwrap_or_else(|| UNKNOWN_TITLE_AR.to_string()),
            author_ar: author_ar.unwrap_or_else(|| UNKNOWN_AUTHOR_AR.to_string()),
            filename: raw.filename.unwrap_or_default(),
            cover_text: non_empty(raw.cover_text).unwrap_or_else(|| DEFAULT_COVER_TEXT.to_string()),
            kind: non_empty(raw.kind).unwrap_or_else(|| "epub".to_string()),
            source: non_empty(raw.source).unwrap_or_else(|| "local".to_string()),
            category: non_empty(raw.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            featured: raw.featured.unwrap_or(false),
        }
    }

    fn matches_query(&self, query: &str) -> bool {
        [
            &self.title_ar,
            &self.author_ar,
            &self.title_en,
            &self.author_en,
            &self.category,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(query))
    }
}

/// Sidebar category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

impl Category {
    pub fn all() -> Self {
        Self {
            id: ALL_CATEGORY.to_string(),
            name: "All Books".to_string(),
        }
    }

    pub fn named(name: &str) -> Self {
        Self {
            id: category_slug(name),
            name: name.to_string(),
        }
    }
}

/// Lower-case the name and replace anything outside `[a-z0-9]` and the
/// Arabic block with `-`.
pub fn category_slug(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '\u{0600}'..='\u{06FF}' => c,
            _ => '-',
        })
        .collect()
}

/// In-memory catalog
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    books: Vec<BookRecord>,
    categories: Vec<Category>,
}

impl Catalog {
    /// Build a catalog from manifest JSON and an optional list of category names.
    pub fn from_json(books_json: &str, category_names: Option<&[String]>) -> Result<Self, CatalogError> {
        let raw: Vec<RawBookRecord> = serde_json::from_str(books_json)?;
        let mut books: Vec<BookRecord> = raw
            .into_iter()
            .enumerate()
            .map(|(i, record)| BookRecord::normalize(record, i))
            .collect();

        books.sort_by(|a, b| {
            b.featured
                .cmp(&a.featured)
                .then_with(|| a.title_ar.cmp(&b.title_ar))
        });

        let names: Vec<String> = match category_names {
            Some(names) => names.to_vec(),
            None => {
                let mut names: Vec<String> = books.iter().map(|b| b.category.clone()).collect();
                names.sort();
                names.dedup();
                names
            }
        };

        let categories = std::iter::once(Category::all())
            .chain(names.iter().map(|name| Category::named(name)))
            .collect();

        Ok(Self { books, categories })
    }

    /// Load the catalog from disk. A missing or malformed categories file
    /// falls back to categories derived from the books.
    pub async fn load(
        books_path: impl AsRef<Path>,
        categories_path: Option<&Path>,
    ) -> Result<Self, CatalogError> {
        let books_json = tokio::fs::read_to_string(books_path.as_ref()).await?;

        let category_names = match categories_path {
            Some(path) => match tokio::fs::read_to_string(path).await {
                Ok(json) => match serde_json::from_str::<Vec<String>>(&json) {
                    Ok(names) => Some(names),
                    Err(e) => {
                        tracing::warn!("Failed to parse categories {}: {}", path.display(), e);
                        None
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to load categories {}: {}", path.display(), e);
                    None
                }
            },
            None => None,
        };

        let catalog = Self::from_json(&books_json, category_names.as_deref())?;
        tracing::info!(
            "Loaded {} books in {} categories",
            catalog.books.len(),
            catalog.categories.len() - 1
        );
        Ok(catalog)
    }

    pub fn books(&self) -> &[BookRecord] {
        &self.books
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&BookRecord> {
        self.books.iter().find(|book| book.id == id)
    }

    /// Books in `category_id` (or all) whose fields contain `query`.
    pub fn filter(&self, category_id: Option<&str>, query: Option<&str>) -> Vec<&BookRecord> {
        let category_name = category_id
            .filter(|id| !id.is_empty() && *id != ALL_CATEGORY)
            .map(|id| {
                self.categories
                    .iter()
                    .find(|c| c.id == id)
                    .map(|c| c.name.as_str())
                    .unwrap_or(id)
            });

        let query = query
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());

        self.books
            .iter()
            .filter(|book| category_name.map_or(true, |name| book.category == name))
            .filter(|book| query.as_deref().map_or(true, |q| book.matches_query(q)))
            .collect()
    }

    /// Categories whose name contains `query`, case-insensitively
    pub fn search_categories(&self, query: &str) -> Vec<&Category> {
        let query = query.to_lowercase();
        self.categories
            .iter()
            .filter(|category| category.name.to_lowercase().contains(&query))
            .collect()
    }
}
