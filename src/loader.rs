use crate::models::{Config, DataSourceMode};
use crate::table::{Row, Table};
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const COLLEGE_FILE: &str = "college.csv";
pub const PLACEMENT_FILE: &str = "placement.csv";
pub const REVIEWS_FILE: &str = "reviews.csv";

pub fn rank_file(year: u16) -> String {
    format!("rank_{}.csv", year)
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },
    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("unexpected payload from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },
    #[error("no base_url configured, cannot fetch {0}")]
    NoBaseUrl(String),
}

/// Every source the pages read, one slot per file.
#[derive(Debug, Clone, Default)]
pub struct Datasets {
    pub colleges: Table,
    pub placements: Table,
    pub reviews: Table,
    pub ranks: Vec<(u16, Table)>,
}

impl Datasets {
    pub fn rank_years(&self) -> impl Iterator<Item = u16> + '_ {
        self.ranks.iter().map(|(year, _)| *year)
    }

    pub fn rank_rows(&self) -> impl Iterator<Item = (u16, &Row)> + '_ {
        self.ranks
            .iter()
            .flat_map(|(year, table)| table.iter().map(move |row| (*year, row)))
    }
}

/// Reads CSV sources from disk or over HTTP and talks to the JSON endpoints.
pub struct DataLoader {
    client: reqwest::Client,
    mode: DataSourceMode,
    data_directory: PathBuf,
    base_url: Option<String>,
    timeout: Duration,
}

impl DataLoader {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            mode: config.data_source_mode,
            data_directory: PathBuf::from(config.data_directory.as_deref().unwrap_or("csv")),
            base_url: config.base_url().map(str::to_string),
            timeout: Duration::from_secs(config.request_timeout_secs.unwrap_or(30)),
        }
    }

    pub fn mode(&self) -> DataSourceMode {
        self.mode
    }

    fn endpoint(&self, path: &str) -> Result<String, LoadError> {
        let base = self
            .base_url
            .as_deref()
            .ok_or_else(|| LoadError::NoBaseUrl(path.to_string()))?;
        Ok(format!("{}/{}", base, path.trim_start_matches('/')))
    }

    pub async fn read_file(&self, path: &Path) -> Result<Table, LoadError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| LoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Table::parse_csv(&content))
    }

    pub async fn fetch_csv(&self, url: &str) -> Result<Table, LoadError> {
        debug!(url, "fetching csv");
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| LoadError::Request {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(LoadError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let content = response.text().await.map_err(|source| LoadError::Request {
            url: url.to_string(),
            source,
        })?;
        Ok(Table::parse_csv(&content))
    }

    /// Loads one CSV source according to the configured mode.
    pub async fn load_csv(&self, file: &str) -> Result<Table, LoadError> {
        match self.mode {
            DataSourceMode::Local => self.read_file(&self.data_directory.join(file)).await,
            DataSourceMode::Internet => {
                let url = self.endpoint(&format!("csv/{}", file))?;
                self.fetch_csv(&url).await
            }
            DataSourceMode::Both => match self.read_file(&self.data_directory.join(file)).await {
                Ok(table) => Ok(table),
                Err(local_err) => {
                    let Ok(url) = self.endpoint(&format!("csv/{}", file)) else {
                        return Err(local_err);
                    };
                    debug!(file, error = %local_err, "local read failed, trying remote");
                    self.fetch_csv(&url).await
                }
            },
        }
    }

    /// Like [`DataLoader::load_csv`], but a failed source becomes an empty table.
    pub async fn load_or_empty(&self, file: &str) -> Table {
        match self.load_csv(file).await {
            Ok(table) => {
                info!(file, rows = table.len(), "loaded");
                table
            }
            Err(err) => {
                warn!(file, error = %err, "source unavailable, continuing without it");
                Table::default()
            }
        }
    }

    /// Loads every dataset concurrently and returns once all have settled.
    pub async fn load_datasets(&self, rank_years: &[u16]) -> Datasets {
        let ranks = join_all(
            rank_years
                .iter()
                .map(|&year| async move { (year, self.load_or_empty(&rank_file(year)).await) }),
        );

        let (colleges, placements, reviews, ranks) = tokio::join!(
            self.load_or_empty(COLLEGE_FILE),
            self.load_or_empty(PLACEMENT_FILE),
            self.load_or_empty(REVIEWS_FILE),
            ranks,
        );

        Datasets {
            colleges,
            placements,
            reviews,
            ranks,
        }
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, LoadError> {
        let url = self.endpoint(path)?;
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(&url)
            .query(query)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| LoadError::Request {
                url: url.clone(),
                source,
            })?;
        Self::decode(url, response, false).await
    }

    /// Posts a JSON body; error statuses still decode when the server sent a JSON reply.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, LoadError> {
        let url = self.endpoint(path)?;
        debug!(url = %url, "POST");
        let response = self
            .client
            .post(&url)
            .json(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| LoadError::Request {
                url: url.clone(),
                source,
            })?;
        Self::decode(url, response, true).await
    }

    async fn decode<T: DeserializeOwned>(
        url: String,
        response: reqwest::Response,
        accept_error_body: bool,
    ) -> Result<T, LoadError> {
        let status = response.status();
        if !status.is_success() && !accept_error_body {
            return Err(LoadError::Status { url, status });
        }

        let body = response.text().await.map_err(|source| LoadError::Request {
            url: url.clone(),
            source,
        })?;

        match serde_json::from_str(&body) {
            Ok(value) => Ok(value),
            Err(_) if !status.is_success() => Err(LoadError::Status { url, status }),
            Err(source) => Err(LoadError::Decode { url, source }),
        }
    }
}

/// Owns the loaded datasets; consumers borrow them and a reload replaces them wholesale.
pub struct Catalog {
    loader: DataLoader,
    rank_years: Vec<u16>,
    datasets: Datasets,
}

impl Catalog {
    pub async fn load(loader: DataLoader, rank_years: Vec<u16>) -> Self {
        let datasets = loader.load_datasets(&rank_years).await;
        Self {
            loader,
            rank_years,
            datasets,
        }
    }

    pub async fn reload(&mut self) {
        self.datasets = self.loader.load_datasets(&self.rank_years).await;
    }

    pub fn datasets(&self) -> &Datasets {
        &self.datasets
    }

    pub fn loader(&self) -> &DataLoader {
        &self.loader
    }
}
