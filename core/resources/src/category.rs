//! Read-only ticket categories.
//!
//! There is no per-category endpoint, so a category is found by scanning
//! the full list for its `NameWithSection`, e.g. `MIME \ Image Machine`.

use serde_json::{Map, Value};
use tracing::debug;

use deskbridge_common::{as_integer, Error, Result};
use deskbridge_transport::{ApiRequest, SharedTransport, Transport};

const LIST_PATH: &str = "/api/categories";
const KEY_FIELD: &str = "NameWithSection";

/// A category located by its section-qualified name.
pub struct Category {
    transport: SharedTransport,
    name_with_section: String,
    details: Map<String, Value>,
    category_id: u64,
}

impl Category {
    /// Look up a category by `Section \ Name` (or plain name when unsectioned).
    ///
    /// # Errors
    /// - `Error::CategoryNotFound` if no category matches exactly
    /// - `Error::InvalidResponse` if the match has no integer `CategoryID`
    pub async fn find(transport: SharedTransport, name_with_section: &str) -> Result<Self> {
        let mut category = Self {
            transport,
            name_with_section: name_with_section.to_string(),
            details: Map::new(),
            category_id: 0,
        };
        category.refresh().await?;
        Ok(category)
    }

    /// All categories, as returned by the server.
    ///
    /// A body that is not a list yields an empty vector.
    pub async fn list<T>(transport: &T) -> Result<Vec<Value>>
    where
        T: Transport + ?Sized,
    {
        match transport.send(ApiRequest::get(LIST_PATH)).await? {
            Value::Array(categories) => Ok(categories),
            _ => Ok(Vec::new()),
        }
    }

    /// Fetch the list again and re-select this category.
    ///
    /// On failure the previous details are kept.
    pub async fn refresh(&mut self) -> Result<()> {
        debug!("Refreshing category {}", self.name_with_section);
        let categories = Self::list(self.transport.as_ref()).await?;

        let record = categories
            .into_iter()
            .find_map(|c| match c {
                Value::Object(map)
                    if map.get(KEY_FIELD).and_then(Value::as_str)
                        == Some(self.name_with_section.as_str()) =>
                {
                    Some(map)
                }
                _ => None,
            })
            .ok_or_else(|| Error::CategoryNotFound(self.name_with_section.clone()))?;

        let category_id = record
            .get("CategoryID")
            .and_then(as_integer)
            .and_then(|id| u64::try_from(id).ok())
            .ok_or_else(|| {
                Error::InvalidResponse(format!(
                    "category {} has no integer CategoryID",
                    self.name_with_section
                ))
            })?;

        self.category_id = category_id;
        self.details = record;
        Ok(())
    }

    pub fn category_id(&self) -> u64 {
        self.category_id
    }

    pub fn name_with_section(&self) -> &str {
        &self.name_with_section
    }

    pub fn name(&self) -> Option<&str> {
        self.field("Name").and_then(Value::as_str)
    }

    pub fn section(&self) -> Option<&str> {
        self.field("Section").and_then(Value::as_str)
    }

    /// Any field of the category; `None` when absent or null.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.details.get(name).filter(|v| !v.is_null())
    }

    pub fn details(&self) -> &Map<String, Value> {
        &self.details
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskbridge_transport::{MemoryTransport, Method};
    use serde_json::json;
    use std::sync::Arc;

    fn categories() -> Value {
        json!([
            {
                "CategoryID": 1,
                "Name": "General Issues",
                "Section": null,
                "NameWithSection": "General Issues"
            },
            {
                "CategoryID": 12,
                "Name": "Image Machine",
                "Section": "MIME",
                "NameWithSection": "MIME \\ Image Machine"
            },
            {
                "CategoryID": 13,
                "Name": "Printers",
                "Section": "MIME",
                "NameWithSection": "MIME \\ Printers"
            }
        ])
    }

    #[tokio::test]
    async fn test_find_sectioned_category() {
        let memory = MemoryTransport::new();
        memory.set_response(Method::Get, "/api/categories", categories());

        let category = Category::find(Arc::new(memory), "MIME \\ Image Machine")
            .await
            .unwrap();
        assert_eq!(category.category_id(), 12);
        assert_eq!(category.name(), Some("Image Machine"));
        assert_eq!(category.section(), Some("MIME"));
    }

    #[tokio::test]
    async fn test_find_requires_exact_match() {
        let memory = MemoryTransport::new();
        memory.set_response(Method::Get, "/api/categories", categories());

        let err = Category::find(Arc::new(memory), "Image Machine")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::CategoryNotFound(name) if name == "Image Machine"));
    }

    #[tokio::test]
    async fn test_non_list_body_is_not_found() {
        let memory = MemoryTransport::new();
        memory.push_response(Method::Get, "/api/categories", json!({"Errors": null}));

        let err = Category::find(Arc::new(memory), "General Issues")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::CategoryNotFound(_)));
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_details() {
        let memory = MemoryTransport::new();
        memory.push_response(Method::Get, "/api/categories", categories());
        memory.push_response(Method::Get, "/api/categories", json!([]));

        let mut category = Category::find(Arc::new(memory.clone()), "General Issues")
            .await
            .unwrap();
        assert!(category.section().is_none());

        let err = category.refresh().await.unwrap_err();
        assert!(matches!(err, Error::CategoryNotFound(_)));
        assert_eq!(category.category_id(), 1);
        assert_eq!(category.name(), Some("General Issues"));
        assert_eq!(memory.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_category_id() {
        let memory = MemoryTransport::new();
        memory.push_response(
            Method::Get,
            "/api/categories",
            json!([{"NameWithSection": "Orphan"}]),
        );

        let err = Category::find(Arc::new(memory), "Orphan").await.err().unwrap();
        assert!(matches!(err, Error::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_list_returns_raw_entries() {
        let memory = MemoryTransport::new();
        memory.push_response(Method::Get, "/api/categories", categories());

        let all = Category::list(&memory).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2]["CategoryID"], json!(13));
    }
}
