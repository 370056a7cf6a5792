use crate::loader::Datasets;
use crate::models::{
    CollegeDetails, Metadata, PlacementLists, PlacementReport, PlacementSummary, RankPoint,
    RankSeries, ReviewEntry, ReviewScores, SortOption, TopCollege,
};
use crate::table::{normalize_name, Row};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::OnceLock;

// Candidate headers; the CSVs come from different sources and disagree on naming.
const INSTITUTE_KEYS: &[&str] = &[
    "Institute",
    "College_Name",
    "College",
    "institute_name",
    "college_name",
    "Name",
];
const DISTRICT_KEYS: &[&str] = &["District"];
const WEBSITE_KEYS: &[&str] = &["Website", "Website_url", "URL", "Site"];
const PICTURE_KEYS: &[&str] = &["Picture", "Image", "Photo"];
const LOGO_KEYS: &[&str] = &["logo_image", "Logo", "Logo_URL"];
const COORDINATE_KEYS: &[&str] = &["Latitude", "lat", "Location", "Coordinates"];
const PROGRAM_KEYS: &[&str] = &["Program", "Program Name", "program_name", "course"];
const RECRUITER_KEYS: &[&str] = &[
    "top_recruiters",
    "top_recruiter",
    "top recruiter",
    "top_recruiter_name",
    "recruiters",
    "recruiter",
];
const JOB_KEYS: &[&str] = &[
    "job_titles",
    "job_title",
    "job_profiles",
    "job_profile",
    "job",
];
const CLOSING_RANK_KEYS: &[&str] = &["Closing Rank", "closing_rank", "ClosingRank"];

const AVG_CTC_KEYS: &[&str] = &[
    "avg_ctc",
    "average_ctc",
    "avg_ctc_in_lpa",
    "avg_ctc_lpa",
    "avg_ctc_in_inr",
];
const MEDIAN_CTC_KEYS: &[&str] = &["median_ctc", "median"];
const HIGHEST_CTC_KEYS: &[&str] = &["highest_ctc", "highest"];
const PLACED_KEYS: &[&str] = &["placed_count", "placed", "num_placed"];
const PLACEMENT_RATING_KEYS: &[&str] = &["placement_rating", "placement_score", "rating"];

pub const REVIEW_SCORE_KEYS: &[&str] = &[
    "sentiment_score",
    "mess_score",
    "professor_score",
    "campus_score",
    "placement_score",
    "infrastructure_score",
    "overall_aspect_score",
];

pub const TOP_LIMIT: usize = 10;

/// Institute name of a row, whichever header the file used for it.
pub fn institute_name(row: &Row) -> &str {
    let name = row.field(INSTITUTE_KEYS);
    if !name.is_empty() {
        return name;
    }
    let name = row.field_containing("institute");
    if !name.is_empty() {
        return name;
    }
    row.field_containing("college")
}

fn numeric_noise() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\d.\-]").expect("valid regex"))
}

fn decimal_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-+]?\d{1,3}\.\d+").expect("valid regex"))
}

fn batch_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)batch[\s_-]*\d{2,4}").expect("valid regex"))
}

/// Parses a cell like "₹ 12.5 LPA" by dropping everything but digits, dots and minus signs.
pub fn parse_number(value: &str) -> Option<f64> {
    let cleaned = numeric_noise().replace_all(value, "");
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(round2(values.iter().sum::<f64>() / values.len() as f64))
    }
}

/// First candidate column holding a parseable number.
fn first_number(row: &Row, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .map(|key| row.field(&[*key]))
        .filter(|value| !value.is_empty())
        .find_map(parse_number)
}

/// Extracts `(lat, lon)` from "12.3,77.5", "12.3;77.5", "12.3|77.5", "12.3 77.5"
/// or any text holding two decimal numbers.
pub fn parse_coordinates(value: &str) -> Option<(f64, f64)> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    for separator in [',', ';', '|', ' '] {
        if !value.contains(separator) {
            continue;
        }
        let parts: Vec<&str> = value
            .split(separator)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() >= 2 {
            if let (Ok(lat), Ok(lon)) = (parts[0].parse::<f64>(), parts[1].parse::<f64>()) {
                return Some((lat, lon));
            }
        }
    }

    let numbers: Vec<f64> = decimal_number()
        .find_iter(value)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect();
    match numbers.as_slice() {
        [lat, lon, ..] => Some((*lat, *lon)),
        _ => None,
    }
}

fn row_coordinates(row: &Row) -> Option<(f64, f64)> {
    for key in COORDINATE_KEYS {
        if let Some(coords) = parse_coordinates(row.field(&[*key])) {
            return Some(coords);
        }
    }

    let lat = row.field(&["latitude"]).parse::<f64>().ok()?;
    let lon = row.field(&["longitude"]).parse::<f64>().ok()?;
    Some((lat, lon))
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(|c: char| matches!(c, ';' | ',' | '|' | '/'))
        .map(str::trim)
        .filter(|part| !part.is_empty())
}

/// Programs, recruiters and job profiles mentioned across a college's placement rows.
pub fn placement_lists(rows: &[&Row]) -> PlacementLists {
    let mut programs = BTreeSet::new();
    let mut recruiters = BTreeSet::new();
    let mut profiles = BTreeSet::new();

    for row in rows {
        programs.extend(split_list(row.field(PROGRAM_KEYS)).map(str::to_string));

        for key in RECRUITER_KEYS {
            recruiters.extend(
                split_list(row.field(&[*key]))
                    .filter(|part| !batch_token().is_match(part))
                    .map(str::to_string),
            );
        }

        for key in JOB_KEYS {
            profiles.extend(split_list(row.field(&[*key])).map(str::to_string));
        }
    }

    PlacementLists {
        programs: programs.into_iter().collect(),
        top_recruiters: recruiters.into_iter().collect(),
        job_profiles: profiles.into_iter().collect(),
    }
}

/// Averages, maxima and totals over a college's placement rows.
pub fn placement_summary(rows: &[&Row]) -> PlacementSummary {
    let mut avg = Vec::new();
    let mut median = Vec::new();
    let mut highest = Vec::new();
    let mut placed: Vec<u64> = Vec::new();
    let mut ratings = Vec::new();

    for row in rows {
        avg.extend(first_number(row, AVG_CTC_KEYS));
        median.extend(first_number(row, MEDIAN_CTC_KEYS));
        highest.extend(first_number(row, HIGHEST_CTC_KEYS));
        ratings.extend(first_number(row, PLACEMENT_RATING_KEYS));

        let count = PLACED_KEYS
            .iter()
            .map(|key| row.field(&[*key]))
            .filter(|value| !value.is_empty())
            .find_map(|value| {
                value
                    .chars()
                    .filter(char::is_ascii_digit)
                    .collect::<String>()
                    .parse::<u64>()
                    .ok()
            });
        placed.extend(count);
    }

    PlacementSummary {
        avg_ctc: mean(&avg),
        median_ctc: mean(&median),
        highest_ctc: highest.into_iter().reduce(f64::max),
        placed_count: if placed.is_empty() {
            None
        } else {
            Some(placed.iter().sum())
        },
        placement_rating: mean(&ratings),
    }
}

/// Mean of every review aspect score over a college's review rows.
pub fn review_scores(rows: &[&Row]) -> ReviewScores {
    REVIEW_SCORE_KEYS
        .iter()
        .map(|&key| {
            let spaced = key.replace('_', " ");
            let squashed = key.replace('_', "");
            let candidates = [key, spaced.as_str(), squashed.as_str()];

            let values: Vec<f64> = rows
                .iter()
                .filter_map(|row| {
                    let value = row.field(&candidates);
                    let value = if value.is_empty() {
                        row.field_containing(key)
                    } else {
                        value
                    };
                    parse_number(value)
                })
                .collect();

            (key, mean(&values))
        })
        .collect()
}

fn review_entry(row: &Row) -> ReviewEntry {
    ReviewEntry {
        source: row.field(&["source", "reviewed_by"]).to_string(),
        date: row.field(&["date"]).to_string(),
        rating: row.field(&["rating"]).to_string(),
        review_text: row.field(&["review_text", "review", "text"]).to_string(),
    }
}

/// Sorted select-menu values; spellings differing only in case or spacing
/// collapse to the first one seen.
fn menu_values<'r>(values: impl Iterator<Item = &'r str>) -> Vec<String> {
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    for value in values.filter(|v| !v.is_empty()) {
        seen.entry(normalize_name(value))
            .or_insert_with(|| value.to_string());
    }
    seen.into_values().collect()
}

fn sorted_unique<'r>(values: impl Iterator<Item = &'r str>) -> Vec<String> {
    values
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// One column of the comparison panel.
#[derive(Debug, Clone)]
pub struct ComparisonPanel {
    pub query: String,
    pub details: Option<CollegeDetails>,
    pub series: RankSeries,
}

#[derive(Debug, Clone)]
pub struct Comparison {
    pub program: Option<String>,
    pub panels: Vec<ComparisonPanel>,
}

pub struct CollegeAnalyzer<'a> {
    pub datasets: &'a Datasets,
}

impl<'a> CollegeAnalyzer<'a> {
    pub fn new(datasets: &'a Datasets) -> Self {
        Self { datasets }
    }

    /// Select-menu values derived from the loaded rank and college tables.
    pub fn metadata(&self) -> Metadata {
        let rank_rows: Vec<&Row> = self.datasets.rank_rows().map(|(_, row)| row).collect();

        Metadata {
            programs: menu_values(rank_rows.iter().map(|r| r.field(&["Program"]))),
            streams: menu_values(rank_rows.iter().map(|r| r.field(&["Stream"]))),
            quotas: menu_values(rank_rows.iter().map(|r| r.field(&["Quota"]))),
            categories: menu_values(rank_rows.iter().map(|r| r.field(&["Category"]))),
            locations: menu_values(self.datasets.colleges.iter().map(|r| r.field(DISTRICT_KEYS))),
            sort_options: SortOption::defaults(),
        }
    }

    /// Alphabetical, de-duplicated institute names from the college list.
    pub fn college_names(&self) -> Vec<String> {
        sorted_unique(self.datasets.colleges.iter().map(institute_name))
    }

    /// Exact (normalized) name match first, then the first name containing the query.
    pub fn find_college(&self, query: &str) -> Option<&'a Row> {
        let wanted = normalize_name(query);
        if wanted.is_empty() {
            return None;
        }

        let colleges = self.datasets.colleges.rows();
        colleges
            .iter()
            .find(|row| normalize_name(institute_name(row)) == wanted)
            .or_else(|| {
                colleges
                    .iter()
                    .find(|row| normalize_name(institute_name(row)).contains(&wanted))
            })
    }

    fn rows_for<'t>(rows: &'t [Row], name: &str) -> Vec<&'t Row> {
        let key = normalize_name(name);
        rows.iter()
            .filter(|row| normalize_name(institute_name(row)) == key)
            .collect()
    }

    pub fn placement_rows(&self, name: &str) -> Vec<&'a Row> {
        Self::rows_for(self.datasets.placements.rows(), name)
    }

    pub fn review_rows(&self, name: &str) -> Vec<&'a Row> {
        Self::rows_for(self.datasets.reviews.rows(), name)
    }

    pub fn reviews(&self, name: &str) -> Vec<ReviewEntry> {
        self.review_rows(name).into_iter().map(review_entry).collect()
    }

    /// Placement summary and lists over every placement row for `name`.
    pub fn placement(&self, name: &str) -> PlacementReport {
        let rows = self.placement_rows(name);
        PlacementReport::new(placement_summary(&rows), placement_lists(&rows))
    }

    /// Everything the detail panel shows for one college.
    pub fn college_details(&self, query: &str) -> Option<CollegeDetails> {
        let row = self.find_college(query)?;
        let name = institute_name(row);
        let placements = self.placement_rows(name);
        let reviews = self.review_rows(name);

        Some(CollegeDetails {
            institute_name: name.to_string(),
            district: row.field(DISTRICT_KEYS).to_string(),
            website: row.field(WEBSITE_KEYS).to_string(),
            logo_image: row.field(LOGO_KEYS).to_string(),
            picture: row.field(PICTURE_KEYS).to_string(),
            rank: row.field(&["rank"]).to_string(),
            coordinates: row_coordinates(row),
            placement_lists: placement_lists(&placements),
            placement_summary: placement_summary(&placements),
            review_scores: review_scores(&reviews),
            review_count: reviews.len(),
        })
    }

    /// Best-ranked institutes from the placement table, joined with the college list.
    pub fn top_colleges(&self, limit: usize) -> Vec<TopCollege> {
        let mut college_index: HashMap<String, &Row> = HashMap::new();
        for row in self.datasets.colleges.iter() {
            college_index
                .entry(normalize_name(institute_name(row)))
                .or_insert(row);
        }

        let mut ranked: Vec<(f64, &Row)> = self
            .datasets
            .placements
            .iter()
            .filter_map(|row| {
                let rank = row.field(&["inst_rank"]);
                let rank = if rank.is_empty() {
                    row.field_containing("rank")
                } else {
                    rank
                };
                rank.parse::<f64>().ok().filter(|r| r.is_finite()).map(|r| (r, row))
            })
            .collect();
        ranked.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut seen = HashSet::new();
        let mut cards = Vec::new();
        for (rank, row) in ranked {
            if cards.len() >= limit {
                break;
            }
            let key = normalize_name(institute_name(row));
            if !seen.insert(key.clone()) {
                continue;
            }

            let college = college_index.get(&key).copied();
            let pick = |keys: &[&str]| -> String {
                let own = row.field(keys);
                if !own.is_empty() {
                    return own.to_string();
                }
                college.map(|c| c.field(keys).to_string()).unwrap_or_default()
            };

            let mut institute = institute_name(row).to_string();
            if institute.is_empty() {
                institute = college.map(institute_name).unwrap_or_default().to_string();
            }

            cards.push(TopCollege {
                rank: Some(rank as u32),
                institute,
                website: pick(WEBSITE_KEYS),
                picture: pick(PICTURE_KEYS),
                district: pick(DISTRICT_KEYS),
            });
        }

        cards
    }

    /// Colleges whose name or district contains the query, in list order.
    pub fn search(&self, query: &str) -> Vec<&'a Row> {
        let wanted = normalize_name(query);
        if wanted.is_empty() {
            return Vec::new();
        }

        self.datasets
            .colleges
            .rows()
            .iter()
            .filter(|row| {
                normalize_name(institute_name(row)).contains(&wanted)
                    || normalize_name(row.field(DISTRICT_KEYS)).contains(&wanted)
            })
            .collect()
    }

    /// Lowest closing rank per loaded year for an institute, optionally for one program.
    pub fn rank_history(&self, institute: &str, program: Option<&str>) -> RankSeries {
        let key = normalize_name(institute);
        let program = program.map(normalize_name).filter(|p| !p.is_empty());

        let points = self
            .datasets
            .ranks
            .iter()
            .map(|(year, table)| {
                let rank = table
                    .iter()
                    .filter(|row| normalize_name(institute_name(row)) == key)
                    .filter(|row| match &program {
                        Some(p) => normalize_name(row.field(PROGRAM_KEYS)) == *p,
                        None => true,
                    })
                    .filter_map(|row| parse_number(row.field(CLOSING_RANK_KEYS)))
                    .filter(|rank| *rank >= 0.0)
                    .map(|rank| rank.round() as u32)
                    .min();
                RankPoint { year: *year, rank }
            })
            .collect();

        RankSeries {
            label: institute.to_string(),
            points,
        }
    }

    /// Side-by-side panels for the selected institutes.
    pub fn compare(&self, queries: &[String], program: Option<&str>) -> Comparison {
        let panels = queries
            .iter()
            .map(|query| {
                let details = self.college_details(query);
                let label = details
                    .as_ref()
                    .map(|d| d.institute_name.clone())
                    .unwrap_or_else(|| query.clone());
                let series = self.rank_history(&label, program);
                ComparisonPanel {
                    query: query.clone(),
                    details,
                    series,
                }
            })
            .collect();

        Comparison {
            program: program.map(str::to_string),
            panels,
        }
    }
}
