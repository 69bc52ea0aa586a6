use std::collections::BTreeMap;

use super::error::{ProviderError, ProviderResult};

/// Display metadata for one search result, as returned by the daemon.
///
/// The record is passed through to the shell unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultMeta {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    /// Serialized icon name
    pub gicon: Option<String>,
    /// Any further string-valued keys
    pub extra: BTreeMap<String, String>,
}

impl ResultMeta {
    /// Build a record from a `key -> value` dictionary. `id` is required.
    pub fn from_fields<I>(fields: I) -> ProviderResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut meta = ResultMeta::default();
        let mut has_id = false;

        for (key, value) in fields {
            match key.as_str() {
                "id" => {
                    meta.id = value;
                    has_id = true;
                }
                "name" => meta.name = Some(value),
                "description" => meta.description = Some(value),
                "gicon" => meta.gicon = Some(value),
                _ => {
                    meta.extra.insert(key, value);
                }
            }
        }

        if !has_id {
            return Err(ProviderError::Backend(
                "result metadata is missing an id".to_string(),
            ));
        }

        Ok(meta)
    }

    /// Flatten the record back into a `key -> value` dictionary.
    pub fn into_fields(self) -> BTreeMap<String, String> {
        let mut fields = self.extra;
        fields.insert("id".to_string(), self.id);
        if let Some(name) = self.name {
            fields.insert("name".to_string(), name);
        }
        if let Some(description) = self.description {
            fields.insert("description".to_string(), description);
        }
        if let Some(gicon) = self.gicon {
            fields.insert("gicon".to_string(), gicon);
        }
        fields
    }
}
