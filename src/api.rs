//! Client for the site's JSON endpoints, used when data is served remotely.

use crate::analyzer::REVIEW_SCORE_KEYS;
use crate::loader::{DataLoader, LoadError};
use crate::models::{
    Banner, CollegeDetails, Metadata, PlacementLists, PlacementReport, PlacementSummary,
    RecommendRequest, RecommendResponse, ReviewEntry, Severity, TopCollege,
};
use crate::table::Row;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct CollegeList {
    #[serde(default)]
    colleges: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ReviewList {
    #[serde(default)]
    reviews: Vec<ReviewEntry>,
}

/// Detail payload served by `/explore/api/college`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RemoteCollege {
    pub institute_name: String,
    pub district: String,
    pub website: String,
    pub logo_image: String,
    pub picture: String,
    pub rank: serde_json::Value,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub programs: Vec<String>,
    pub top_recruiters: Vec<String>,
    pub key_profiles: Vec<String>,
    pub placement_summary: PlacementSummary,
    pub sample_review_count: usize,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl From<RemoteCollege> for CollegeDetails {
    fn from(remote: RemoteCollege) -> Self {
        let rank = match &remote.rank {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        };
        let review_scores = REVIEW_SCORE_KEYS
            .iter()
            .map(|&key| (key, remote.extra.get(key).and_then(serde_json::Value::as_f64)))
            .collect();

        CollegeDetails {
            institute_name: remote.institute_name,
            district: remote.district,
            website: remote.website,
            logo_image: remote.logo_image,
            picture: remote.picture,
            rank,
            coordinates: remote.latitude.zip(remote.longitude),
            placement_lists: PlacementLists {
                programs: remote.programs,
                top_recruiters: remote.top_recruiters,
                job_profiles: remote.key_profiles,
            },
            placement_summary: remote.placement_summary,
            review_scores,
            review_count: remote.sample_review_count,
        }
    }
}

pub struct ExploreApi<'a> {
    loader: &'a DataLoader,
}

impl<'a> ExploreApi<'a> {
    pub fn new(loader: &'a DataLoader) -> Self {
        Self { loader }
    }

    pub async fn metadata(&self) -> Result<Metadata, LoadError> {
        self.loader.get_json("/metadata", &[]).await
    }

    pub async fn colleges(&self) -> Result<Vec<String>, LoadError> {
        let list: CollegeList = self.loader.get_json("/explore/api/colleges", &[]).await?;
        Ok(list.colleges)
    }

    pub async fn college(&self, name: &str) -> Result<CollegeDetails, LoadError> {
        let remote: RemoteCollege = self
            .loader
            .get_json("/explore/api/college", &[("name", name)])
            .await?;
        Ok(remote.into())
    }

    pub async fn reviews(&self, name: &str) -> Result<Vec<ReviewEntry>, LoadError> {
        let list: ReviewList = self
            .loader
            .get_json("/explore/api/reviews", &[("name", name)])
            .await?;
        Ok(list.reviews)
    }

    pub async fn placement(&self, name: &str) -> Result<PlacementReport, LoadError> {
        self.loader
            .get_json("/explore/api/placement", &[("name", name)])
            .await
    }

    pub async fn top(&self) -> Result<Vec<TopCollege>, LoadError> {
        self.loader.get_json("/top/data", &[]).await
    }

    /// Asks the recommender; failures come back as an error banner with no rows.
    pub async fn recommend(&self, request: &RecommendRequest) -> (Banner, Vec<Row>) {
        if request.program.trim().is_empty() {
            return (
                Banner::new(Severity::Warning, "Required fields: rank and program."),
                Vec::new(),
            );
        }

        match self
            .loader
            .post_json::<_, RecommendResponse>("/recommend_colleges", request)
            .await
        {
            Ok(response) => recommendation_banner(response),
            Err(err) => (
                Banner::new(Severity::Error, format!("Recommendation failed: {}", err)),
                Vec::new(),
            ),
        }
    }
}

fn recommendation_banner(response: RecommendResponse) -> (Banner, Vec<Row>) {
    let ok = response.status.eq_ignore_ascii_case("success");
    let severity = if !ok {
        Severity::Error
    } else if response.data.is_empty() {
        Severity::Warning
    } else {
        Severity::Info
    };
    let message = if response.message.is_empty() {
        if ok {
            "No recommendations returned.".to_string()
        } else {
            "Recommendation failed.".to_string()
        }
    } else {
        response.message
    };
    (Banner::new(severity, message), response.data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::tests::{local_config, serve_once};
    use tempfile::tempdir;

    async fn api_for(status: &'static str, body: &str) -> (DataLoader, tokio::task::JoinHandle<String>) {
        let tmp = tempdir().unwrap();
        let (base, server) = serve_once(status, body.to_string()).await;
        let mut config = local_config(tmp.path());
        config.base_url = Some(base);
        (DataLoader::new(&config), server)
    }

    #[test]
    fn remote_college_maps_to_details() {
        let json = r#"{
            "institute_name": "Alpha", "district": "North", "rank": 4,
            "latitude": 12.9, "longitude": 77.6,
            "programs": ["CSE"], "top_recruiters": ["Acme"], "key_profiles": ["SDE"],
            "placement_summary": {"avg_ctc": 9.5, "placed_count": 120},
            "mess_score": 3.25, "professor_score": "",
            "sample_review_count": 7
        }"#;
        let remote: RemoteCollege = serde_json::from_str(json).unwrap();
        let details = CollegeDetails::from(remote);

        assert_eq!(details.rank, "4");
        assert_eq!(details.coordinates, Some((12.9, 77.6)));
        assert_eq!(details.placement_lists.job_profiles, vec!["SDE"]);
        assert_eq!(details.placement_summary.avg_ctc, Some(9.5));
        assert_eq!(details.placement_summary.median_ctc, None);
        assert_eq!(details.review_count, 7);

        let scores: HashMap<_, _> = details.review_scores.into_iter().collect();
        assert_eq!(scores["mess_score"], Some(3.25));
        assert_eq!(scores["professor_score"], None);
    }

    #[test]
    fn recommendation_status_sets_severity() {
        let (banner, rows) = recommendation_banner(RecommendResponse {
            status: "error".to_string(),
            message: "Invalid value for user_rank.".to_string(),
            data: Vec::new(),
        });
        assert_eq!(banner.severity, Severity::Error);
        assert!(rows.is_empty());

        let (banner, _) = recommendation_banner(RecommendResponse {
            status: "success".to_string(),
            message: String::new(),
            data: Vec::new(),
        });
        assert_eq!(banner.severity, Severity::Warning);
    }

    #[tokio::test]
    async fn fetches_college_list() {
        let (loader, server) = api_for("200 OK", r#"{"colleges": ["Alpha", "Beta"]}"#).await;
        let names = ExploreApi::new(&loader).colleges().await.unwrap();
        assert_eq!(names, vec!["Alpha", "Beta"]);
        assert!(server.await.unwrap().starts_with("GET /explore/api/colleges"));
    }

    #[tokio::test]
    async fn top_data_error_payload_is_an_error() {
        let (loader, server) = api_for("500 Internal Server Error", r#"{"error": "missing csv"}"#).await;
        let err = ExploreApi::new(&loader).top().await.unwrap_err();
        assert!(matches!(err, LoadError::Status { .. }));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn placement_lists_decode_as_lists() {
        let (loader, server) = api_for(
            "200 OK",
            r#"{"avg_ctc": 9.5, "placed_count": 120, "num_programs": 2, "programs": ["CSE", "ECE"], "top_recruiters": []}"#,
        )
        .await;

        let report = ExploreApi::new(&loader).placement("Alpha").await.unwrap();
        assert_eq!(report.summary.avg_ctc, Some(9.5));
        assert_eq!(report.summary.placed_count, Some(120));
        assert_eq!(report.num_programs, 2);
        assert_eq!(report.lists.programs, vec!["CSE", "ECE"]);
        assert!(report.lists.top_recruiters.is_empty());
        assert!(report.lists.job_profiles.is_empty());

        assert!(server.await.unwrap().starts_with("GET /explore/api/placement?name=Alpha"));
    }

    #[tokio::test]
    async fn empty_placement_payload_is_an_empty_report() {
        let (loader, server) = api_for("200 OK", "{}").await;
        let report = ExploreApi::new(&loader).placement("Nowhere").await.unwrap();
        assert_eq!(report, PlacementReport::default());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn recommend_returns_rows() {
        let (loader, server) = api_for(
            "200 OK",
            r#"{"status": "success", "message": "Top picks", "data": [{"Institute": "Alpha", "Predicted Closing Rank": 1520.5}]}"#,
        )
        .await;

        let request = RecommendRequest {
            rank: 1500,
            program: "CSE".to_string(),
            target_year: 2026,
            top_n: 10,
            ..Default::default()
        };
        let (banner, rows) = ExploreApi::new(&loader).recommend(&request).await;

        assert_eq!(banner, Banner::new(Severity::Info, "Top picks"));
        assert_eq!(rows[0].field(&["predicted closing rank"]), "1520.5");

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /recommend_colleges"));
        assert!(raw.contains(r#""program":"CSE""#));
    }
}
