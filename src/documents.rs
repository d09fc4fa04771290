use std::collections::HashSet;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{error, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DOCUMENTS_API_URL: &str =
    "https://api.github.com/repos/ulirdz/egis-test.ia/contents/documents";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl DocumentDescriptor {
    fn fallback(name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: format!("documents/{}", name),
            url: None,
            size: None,
        }
    }
}

/// Source of the report list shown to the model in the system prompt.
#[async_trait]
pub trait DocumentCatalog: Send + Sync {
    /// Never fails: implementations degrade to [`fallback_documents`].
    async fn documents(&self) -> Vec<DocumentDescriptor>;
}

const FALLBACK_NAMES: &[&str] = &[
    "RPT_SafetyMeasures_Anthochoriou_v1.2.pdf",
    "RPT_SafetyMeasures_Dyo Korifes_v1.2.pdf",
    "RPT_SafetyMeasures_Kalamion_v1.2.pdf",
    "RPT_SafetyMeasures_Neochoriou_v1.2.pdf",
    "RPT_SafetyMeasures_S10_Vermiou_v1.2.pdf",
    "RPT_SafetyMeasures_S12_v1.2.pdf",
    "RPT_SafetyMeasures_S13_Polymylou_v1.2.pdf",
    "RPT_SafetyMeasures_S1N_Ag.Nikolaos_v1.2.pdf",
    "RPT_SafetyMeasures_S1-Panagias_v1.2.pdf",
    "RPT_SafetyMeasures_S1-Seliani_v1.2.pdf",
    "RPT_SafetyMeasures_S2-Agnaderou_v1.2.pdf",
    "RPT_SafetyMeasures_S2-Paramythias_v1.2.pdf",
    "RPT_SafetyMeasures_S3-Grika_v1.2.pdf",
    "RPT_SafetyMeasures_Symvolou_v1.2.pdf",
    "RPT_SafetyMeasures_T8-Dematiou_v1.2.pdf",
];

/// Built-in report list used when the repository listing is unavailable.
pub fn fallback_documents() -> Vec<DocumentDescriptor> {
    dedup_by_path(FALLBACK_NAMES.iter().map(|name| DocumentDescriptor::fallback(name)).collect())
}

/// Keeps the first descriptor for each path, preserving order.
pub fn dedup_by_path(documents: Vec<DocumentDescriptor>) -> Vec<DocumentDescriptor> {
    let mut seen = HashSet::new();
    documents
        .into_iter()
        .filter(|doc| seen.insert(doc.path.clone()))
        .collect()
}

/// Catalog that always answers with the built-in list.
pub struct StaticCatalog;

#[async_trait]
impl DocumentCatalog for StaticCatalog {
    async fn documents(&self) -> Vec<DocumentDescriptor> {
        fallback_documents()
    }
}

// Entry of the GitHub contents API listing.
#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    path: String,
    download_url: Option<String>,
    size: Option<u64>,
}

/// Lists the PDF reports of a GitHub repository directory through the
/// contents API.
pub struct GithubCatalog {
    api_url: String,
    client: Client,
}

impl GithubCatalog {
    /// `timeout` bounds the whole listing request, so a stalled connection
    /// ends in the fallback list instead of holding up start-up.
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_url: api_url.into(),
            client,
        })
    }

    async fn fetch(&self) -> Result<Vec<DocumentDescriptor>> {
        let response = self
            .client
            .get(&self.api_url)
            // GitHub rejects requests without a user agent
            .header("User-Agent", concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("document listing failed: {}", response.status()));
        }

        let entries: Vec<ContentEntry> = response.json().await?;
        Ok(entries
            .into_iter()
            .filter(|entry| entry.name.to_lowercase().ends_with(".pdf"))
            .map(|entry| DocumentDescriptor {
                name: entry.name,
                path: entry.path,
                url: entry.download_url,
                size: entry.size,
            })
            .collect())
    }
}

#[async_trait]
impl DocumentCatalog for GithubCatalog {
    async fn documents(&self) -> Vec<DocumentDescriptor> {
        info!("Loading document list from {}", self.api_url);
        match self.fetch().await {
            Ok(documents) => {
                let documents = dedup_by_path(documents);
                info!("Loaded {} documents from repository", documents.len());
                documents
            }
            Err(e) => {
                error!("Failed to load document list: {}", e);
                let documents = fallback_documents();
                warn!("Using built-in fallback list: {} documents", documents.len());
                documents
            }
        }
    }
}
