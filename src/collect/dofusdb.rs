use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use super::{CollectedPage, Collector, Filters, Page, PageMeta, RawRecord};
use crate::entity::EntityKind;

pub const SOURCE: &str = "dofusdb";
pub const DEFAULT_BASE_URL: &str = "https://api.dofusdb.fr";

/// DofusDB endpoint serving a kind
pub fn endpoint(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Monster => "monsters",
        EntityKind::Class => "breeds",
        EntityKind::Npc => "npcs",
        EntityKind::Item | EntityKind::Consumable | EntityKind::Resource => "items",
        EntityKind::Panoply => "item-sets",
        EntityKind::Spell => "spells",
    }
}

/// List response envelope
#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    total: usize,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    skip: Option<usize>,
    #[serde(default)]
    data: Vec<Value>,
}

pub struct DofusDbClient {
    client: Client,
    base_url: String,
}

impl DofusDbClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("krosmoz-import/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn check_source(source: &str) -> Result<()> {
        if source != SOURCE {
            bail!("Unsupported source {:?}, only {:?} is known", source, SOURCE);
        }
        Ok(())
    }

    fn get_list(&self, path: &str, query: &[(String, String)]) -> Result<ListResponse> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .with_context(|| format!("Failed to fetch {}", url))?;
        let response = ok_or_error(response, &url)?;
        response
            .json::<ListResponse>()
            .with_context(|| format!("Failed to parse response from {}", url))
    }
}

fn ok_or_error(response: Response, url: &str) -> Result<Response> {
    response
        .error_for_status()
        .with_context(|| format!("Request to {} failed", url))
}

impl Collector for DofusDbClient {
    fn fetch_one(&self, source: &str, kind: EntityKind, external_id: &str) -> Result<Option<RawRecord>> {
        Self::check_source(source)?;
        let url = format!("{}/{}/{}", self.base_url, endpoint(kind), external_id);
        tracing::debug!(%url, "fetching record");

        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("Failed to fetch {}", url))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let record: Value = ok_or_error(response, &url)?
            .json()
            .with_context(|| format!("Failed to parse record from {}", url))?;
        Ok(Some(record).filter(|record| !record.is_null()))
    }

    fn fetch_many(&self, source: &str, kind: EntityKind, filters: &Filters, page: Page) -> Result<CollectedPage> {
        Self::check_source(source)?;
        let mut query = vec![
            ("$limit".to_string(), page.limit.to_string()),
            ("$skip".to_string(), page.offset.to_string()),
        ];
        query.extend(filters.iter().map(|(k, v)| (k.clone(), v.clone())));

        let list = self.get_list(endpoint(kind), &query)?;
        tracing::info!(%kind, total = list.total, collected = list.data.len(), "page collected");

        Ok(CollectedPage {
            meta: PageMeta {
                total: list.total,
                collected: list.data.len(),
                offset: list.skip.unwrap_or(page.offset),
                limit: list.limit.unwrap_or(page.limit),
            },
            items: list.data,
        })
    }

    fn fetch_secondary(&self, source: &str, external_id: &str) -> Result<Option<RawRecord>> {
        Self::check_source(source)?;
        let query = [("resultId".to_string(), external_id.to_string())];
        let list = self.get_list("recipes", &query)?;
        Ok(list.data.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        assert_eq!(endpoint(EntityKind::Class), "breeds");
        assert_eq!(endpoint(EntityKind::Resource), "items");
        assert_eq!(endpoint(EntityKind::Panoply), "item-sets");
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client = DofusDbClient::new("https://api.dofusdb.fr/").unwrap();
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_unknown_source_is_rejected() {
        let client = DofusDbClient::new(DEFAULT_BASE_URL).unwrap();
        assert!(client.fetch_one("wakfu", EntityKind::Monster, "1").is_err());
    }
}
