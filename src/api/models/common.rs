use crate::api::extract::parse_page;
use crate::core::error::Result;
use crate::db::models::Page;
use serde::{Deserialize, Deserializer};

/// `?page=&limit=` query. Kept as strings so bad numbers surface as a 400
/// with our own message instead of axum's query rejection.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageQuery {
    pub fn to_page(&self) -> Result<Page> {
        parse_page(self.page.as_deref(), self.limit.as_deref())
    }
}

/// Distinguish a missing field (`None`) from an explicit `null`
/// (`Some(None)`). Use together with `#[serde(default)]`.
pub fn deserialize_explicit_null<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
