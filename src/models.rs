use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Data source configuration
    pub data_source_mode: DataSourceMode,
    pub data_directory: Option<String>,
    pub base_url: Option<String>,
    pub rank_years: Vec<u16>,
    pub output_directory: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSourceMode {
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "internet")]
    Internet,
    #[serde(rename = "both")]
    Both,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_source_mode: DataSourceMode::Local,
            data_directory: Some("csv".to_string()),
            base_url: Some("http://127.0.0.1:5000".to_string()),
            rank_years: (2021..=2025).collect(),
            output_directory: Some("output".to_string()),
            request_timeout_secs: Some(30),
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
    }
}

/// Card shown in the "top colleges" scroller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopCollege {
    pub rank: Option<u32>,
    #[serde(rename = "Institute")]
    pub institute: String,
    #[serde(rename = "Website", default)]
    pub website: String,
    #[serde(rename = "Picture", default)]
    pub picture: String,
    #[serde(rename = "District", default)]
    pub district: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementSummary {
    pub avg_ctc: Option<f64>,
    pub median_ctc: Option<f64>,
    pub highest_ctc: Option<f64>,
    pub placed_count: Option<u64>,
    pub placement_rating: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementLists {
    pub programs: Vec<String>,
    pub top_recruiters: Vec<String>,
    pub job_profiles: Vec<String>,
}

/// Aggregated placement figures plus the program, recruiter and job lists
/// for one college; the JSON form is a single flat object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementReport {
    #[serde(flatten)]
    pub summary: PlacementSummary,
    #[serde(default)]
    pub num_programs: usize,
    #[serde(flatten)]
    pub lists: PlacementLists,
}

impl PlacementReport {
    pub fn new(summary: PlacementSummary, lists: PlacementLists) -> Self {
        Self {
            num_programs: lists.programs.len(),
            summary,
            lists,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewEntry {
    pub source: String,
    pub date: String,
    pub rating: String,
    pub review_text: String,
}

/// Averaged review aspects, keyed by the review column they came from.
pub type ReviewScores = Vec<(&'static str, Option<f64>)>;

#[derive(Debug, Clone, PartialEq)]
pub struct CollegeDetails {
    pub institute_name: String,
    pub district: String,
    pub website: String,
    pub logo_image: String,
    pub picture: String,
    pub rank: String,
    pub coordinates: Option<(f64, f64)>,
    pub placement_lists: PlacementLists,
    pub placement_summary: PlacementSummary,
    pub review_scores: ReviewScores,
    pub review_count: usize,
}

/// Values offered by the select menus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub programs: Vec<String>,
    #[serde(default)]
    pub streams: Vec<String>,
    #[serde(default)]
    pub quotas: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub sort_options: Vec<SortOption>,
}

/// A recommendation ordering offered next to the filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortOption {
    pub value: String,
    pub label: String,
}

impl SortOption {
    /// Orderings the recommender understands.
    pub fn defaults() -> Vec<SortOption> {
        [
            ("Predicted Closing Rank", "Predicted Closing Rank (asc)"),
            ("Max Average CTC", "Max Average CTC (desc)"),
            ("placement_score", "Placement Score (desc)"),
            ("overall_aspect_score", "Overall Score (desc)"),
            ("professor_score", "Professor Score (desc)"),
            ("mess_score", "Mess Score (desc)"),
        ]
        .into_iter()
        .map(|(value, label)| SortOption {
            value: value.to_string(),
            label: label.to_string(),
        })
        .collect()
    }
}

/// One point of a closing-rank chart; `rank` is `None` for years without data.
#[derive(Debug, Clone, PartialEq)]
pub struct RankPoint {
    pub year: u16,
    pub rank: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankSeries {
    pub label: String,
    pub points: Vec<RankPoint>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RecommendRequest {
    pub rank: u32,
    pub program: String,
    pub stream: String,
    pub quota: String,
    pub category: String,
    pub location: String,
    pub min_ctc: f64,
    pub min_placements_score: f64,
    pub target_year: u16,
    pub top_n: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Vec<crate::table::Row>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(label)
    }
}

/// Inline message shown to the user after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub severity: Severity,
    pub message: String,
}

impl Banner {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    pub fn icon(&self) -> &'static str {
        match self.severity {
            Severity::Info => "✅",
            Severity::Warning => "⚠️ ",
            Severity::Error => "❌",
        }
    }
}

impl fmt::Display for Banner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.icon(), self.severity, self.message)
    }
}
