use crate::analyzer::{institute_name, Comparison};
use crate::models::{
    CollegeDetails, Metadata, PlacementLists, PlacementReport, PlacementSummary, RankSeries,
    ReviewEntry, TopCollege,
};
use crate::table::{or_placeholder, Row, Table, PLACEHOLDER};
use anyhow::{Context, Result};
use csv::Writer;
use std::fs;
use std::path::Path;

const CHART_WIDTH: usize = 30;
const MAPS_EMBED: &str = "https://maps.google.com/maps";

fn number(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn list(values: &[String]) -> String {
    if values.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        values.join(", ")
    }
}

/// Embed URL for the map panel: exact coordinates when known, else a name search.
pub fn map_embed_url(name: &str, district: &str, coordinates: Option<(f64, f64)>) -> String {
    let query = match coordinates {
        Some((lat, lon)) => format!("{},{}", lat, lon),
        None if district.is_empty() => name.to_string(),
        None => format!("{}, {}", name, district),
    };
    reqwest::Url::parse_with_params(
        MAPS_EMBED,
        &[("q", query.as_str()), ("z", "15"), ("output", "embed")],
    )
    .map(|url| url.to_string())
    .unwrap_or_default()
}

pub fn render_metadata(metadata: &Metadata) -> String {
    let mut content = String::new();
    for (label, values) in [
        ("Programs", &metadata.programs),
        ("Streams", &metadata.streams),
        ("Quotas", &metadata.quotas),
        ("Categories", &metadata.categories),
        ("Locations", &metadata.locations),
    ] {
        content.push_str(&format!("{} ({}):\n", label, values.len()));
        if values.is_empty() {
            content.push_str(&format!("   {}\n", PLACEHOLDER));
        }
        for value in values {
            content.push_str(&format!("   - {}\n", value));
        }
    }

    if !metadata.sort_options.is_empty() {
        content.push_str("Sort by:\n");
        for option in &metadata.sort_options {
            content.push_str(&format!("   - {} [{}]\n", option.label, option.value));
        }
    }
    content
}

pub fn render_top_cards(cards: &[TopCollege]) -> String {
    let mut content = String::new();
    content.push_str("Top Colleges\n");
    content.push_str("============\n\n");

    for card in cards {
        let rank = card
            .rank
            .map(|r| format!("#{}", r))
            .unwrap_or_else(|| PLACEHOLDER.to_string());
        content.push_str(&format!("{:>4}  {}\n", rank, or_placeholder(&card.institute)));
        content.push_str(&format!("      District: {}\n", or_placeholder(&card.district)));
        content.push_str(&format!("      Website:  {}\n", or_placeholder(&card.website)));
        content.push_str(&format!("      Picture:  {}\n\n", or_placeholder(&card.picture)));
    }
    content
}

pub fn render_search_cards(rows: &[&Row]) -> String {
    let mut content = String::new();
    for row in rows {
        content.push_str(&format!("🏫 {}\n", or_placeholder(institute_name(row))));
        content.push_str(&format!("   District: {}\n", row.display(&["District"])));
        content.push_str(&format!("   Website:  {}\n", row.display(&["Website"])));
    }
    content
}

fn placement_section(summary: &PlacementSummary, lists: &PlacementLists) -> String {
    let placed = summary
        .placed_count
        .map(|c| c.to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string());

    let mut content = String::new();
    content.push_str(&format!("   Programs ({}): {}\n", lists.programs.len(), list(&lists.programs)));
    content.push_str(&format!("   Top recruiters: {}\n", list(&lists.top_recruiters)));
    content.push_str(&format!("   Job profiles:   {}\n", list(&lists.job_profiles)));
    content.push_str(&format!("   Average CTC:    {}\n", number(summary.avg_ctc)));
    content.push_str(&format!("   Median CTC:     {}\n", number(summary.median_ctc)));
    content.push_str(&format!("   Highest CTC:    {}\n", number(summary.highest_ctc)));
    content.push_str(&format!("   Placed:         {}\n", placed));
    content.push_str(&format!("   Rating:         {}\n", number(summary.placement_rating)));
    content
}

pub fn render_details(details: &CollegeDetails) -> String {
    let mut content = String::new();

    content.push_str(&format!("{}\n", or_placeholder(&details.institute_name)));
    content.push_str(&format!("{}\n", "=".repeat(details.institute_name.chars().count().max(1))));
    content.push_str(&format!("District:        {}\n", or_placeholder(&details.district)));
    content.push_str(&format!("Website:         {}\n", or_placeholder(&details.website)));
    content.push_str(&format!("Logo:            {}\n", or_placeholder(&details.logo_image)));
    content.push_str(&format!("Picture:         {}\n", or_placeholder(&details.picture)));
    content.push_str(&format!("Rank:            {}\n", or_placeholder(&details.rank)));
    content.push_str(&format!(
        "Map:             {}\n",
        map_embed_url(&details.institute_name, &details.district, details.coordinates)
    ));

    content.push_str("\nPlacements\n");
    content.push_str(&placement_section(&details.placement_summary, &details.placement_lists));

    content.push_str(&format!("\nReviews ({})\n", details.review_count));
    for (key, score) in &details.review_scores {
        content.push_str(&format!("   {:<22} {}\n", key, number(*score)));
    }
    content
}

/// Placement panel for one college, identical whichever source produced it.
pub fn render_placement(name: &str, report: &PlacementReport) -> String {
    let mut content = String::new();
    content.push_str(&format!("Placements: {}\n", or_placeholder(name)));
    content.push_str(&placement_section(&report.summary, &report.lists));
    content
}

pub fn render_reviews(reviews: &[ReviewEntry]) -> String {
    if reviews.is_empty() {
        return "No reviews yet.\n".to_string();
    }

    let mut content = String::new();
    for review in reviews {
        content.push_str(&format!(
            "⭐ {} | {} | {}\n",
            or_placeholder(&review.rating),
            or_placeholder(&review.source),
            or_placeholder(&review.date)
        ));
        for line in review.review_text.lines() {
            content.push_str(&format!("   {}\n", line));
        }
        content.push('\n');
    }
    content
}

/// Horizontal bar chart of closing ranks, one block per series.
pub fn render_rank_chart(series: &[RankSeries]) -> String {
    let max_rank = series
        .iter()
        .flat_map(|s| s.points.iter().filter_map(|p| p.rank))
        .max()
        .unwrap_or(0);

    let mut content = String::new();
    for s in series {
        content.push_str(&format!("{}\n", s.label));
        for point in &s.points {
            match point.rank {
                Some(rank) if max_rank > 0 => {
                    let width = ((rank as f64 / max_rank as f64) * CHART_WIDTH as f64).ceil() as usize;
                    content.push_str(&format!(
                        "   {} | {} {}\n",
                        point.year,
                        "█".repeat(width.max(1)),
                        rank
                    ));
                }
                _ => content.push_str(&format!("   {} | {}\n", point.year, PLACEHOLDER)),
            }
        }
    }
    content
}

pub fn render_comparison(comparison: &Comparison) -> String {
    let mut content = String::new();
    content.push_str("College Comparison\n");
    content.push_str("==================\n");
    content.push_str(&format!(
        "Program: {}\n\n",
        comparison.program.as_deref().unwrap_or("all programs")
    ));

    for panel in &comparison.panels {
        match &panel.details {
            Some(details) => content.push_str(&render_details(details)),
            None => content.push_str(&format!(
                "{}\n   ⚠️  not found in the college list\n",
                panel.query
            )),
        }
        content.push('\n');
    }

    content.push_str("Closing rank by year (lower is better)\n");
    content.push_str("--------------------------------------\n");
    let series: Vec<RankSeries> = comparison.panels.iter().map(|p| p.series.clone()).collect();
    content.push_str(&render_rank_chart(&series));
    content
}

/// Renders an arbitrary table, such as recommendation results, one block per row.
pub fn render_table(table: &Table) -> String {
    let mut content = String::new();
    if table.is_empty() {
        return content;
    }
    content.push_str(&format!("Columns: {}\n\n", table.headers().join(", ")));
    for (i, row) in table.iter().filter(|row| !row.is_empty()).enumerate() {
        content.push_str(&format!("{}.\n", i + 1));
        for (key, value) in row.iter() {
            content.push_str(&format!("   {}: {}\n", key, or_placeholder(value)));
        }
    }
    content
}

pub fn write_report(output_dir: &str, file_name: &str, content: &str) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir))?;
    let path = Path::new(output_dir).join(file_name);
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn generate_comparison_csv(comparison: &Comparison, output_dir: &str) -> Result<()> {
    fs::create_dir_all(output_dir)?;
    let csv_path = Path::new(output_dir).join("comparison.csv");
    let mut writer = Writer::from_path(&csv_path)
        .with_context(|| format!("Failed to create {}", csv_path.display()))?;

    let years: Vec<u16> = comparison
        .panels
        .first()
        .map(|p| p.series.points.iter().map(|pt| pt.year).collect())
        .unwrap_or_default();

    let mut header = vec![
        "Institute".to_string(),
        "District".to_string(),
        "Website".to_string(),
        "Average CTC".to_string(),
        "Highest CTC".to_string(),
        "Placed".to_string(),
        "Reviews".to_string(),
    ];
    header.extend(years.iter().map(|y| format!("Closing Rank {}", y)));
    writer.write_record(&header)?;

    for panel in &comparison.panels {
        let mut record = match &panel.details {
            Some(d) => vec![
                d.institute_name.clone(),
                d.district.clone(),
                d.website.clone(),
                d.placement_summary.avg_ctc.map(|v| v.to_string()).unwrap_or_default(),
                d.placement_summary.highest_ctc.map(|v| v.to_string()).unwrap_or_default(),
                d.placement_summary.placed_count.map(|v| v.to_string()).unwrap_or_default(),
                d.review_count.to_string(),
            ],
            None => {
                let mut empty = vec![String::new(); 7];
                empty[0] = panel.query.clone();
                empty
            }
        };
        record.extend(
            panel
                .series
                .points
                .iter()
                .map(|p| p.rank.map(|r| r.to_string()).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn generate_top_csv(cards: &[TopCollege], output_dir: &str) -> Result<()> {
    fs::create_dir_all(output_dir)?;
    let csv_path = Path::new(output_dir).join("top_colleges.csv");
    let mut writer = Writer::from_path(&csv_path)
        .with_context(|| format!("Failed to create {}", csv_path.display()))?;

    writer.write_record(["rank", "Institute", "Website", "Picture", "District"])?;
    for card in cards {
        writer.write_record([
            card.rank.map(|r| r.to_string()).unwrap_or_default().as_str(),
            card.institute.as_str(),
            card.website.as_str(),
            card.picture.as_str(),
            card.district.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::tests::sample_datasets;
    use crate::analyzer::CollegeAnalyzer;
    use crate::models::RankPoint;
    use tempfile::tempdir;

    #[test]
    fn map_url_prefers_coordinates() {
        let url = map_embed_url("Alpha", "North", Some((12.5, 77.25)));
        assert_eq!(url, "https://maps.google.com/maps?q=12.5%2C77.25&z=15&output=embed");

        let url = map_embed_url("Beta College", "", None);
        assert!(url.contains("q=Beta+College"));
    }

    #[test]
    fn details_render_placeholders_for_missing_values() {
        let datasets = sample_datasets();
        let details = CollegeAnalyzer::new(&datasets).college_details("Beta College").unwrap();
        let text = render_details(&details);

        assert!(text.contains("Picture:         —"));
        assert!(text.contains("Top recruiters: —"));
        assert!(text.contains("Average CTC:    5.00"));
        assert!(text.contains("sentiment_score        —"));
    }

    #[test]
    fn metadata_lists_sort_options() {
        let datasets = sample_datasets();
        let text = render_metadata(&CollegeAnalyzer::new(&datasets).metadata());

        assert!(text.contains("Programs (2):\n   - CSE\n   - ECE\n"));
        assert!(text.contains("Sort by:\n   - Predicted Closing Rank (asc) [Predicted Closing Rank]\n"));
    }

    #[test]
    fn chart_marks_missing_years() {
        let series = vec![RankSeries {
            label: "Alpha".to_string(),
            points: vec![
                RankPoint { year: 2023, rank: Some(300) },
                RankPoint { year: 2024, rank: None },
                RankPoint { year: 2025, rank: Some(150) },
            ],
        }];
        let chart = render_rank_chart(&series);
        let lines: Vec<&str> = chart.lines().collect();

        assert_eq!(lines[0], "Alpha");
        assert_eq!(lines[1], format!("   2023 | {} 300", "█".repeat(CHART_WIDTH)));
        assert_eq!(lines[2], "   2024 | —");
        assert_eq!(lines[3], format!("   2025 | {} 150", "█".repeat(CHART_WIDTH / 2)));
    }

    #[test]
    fn search_cards_use_tolerant_fields() {
        let table = Table::parse_csv("college_name,district\nAlpha,North\n");
        let rows: Vec<&Row> = table.iter().collect();
        let text = render_search_cards(&rows);

        assert!(text.contains("🏫 Alpha"));
        assert!(text.contains("District: North"));
        assert!(text.contains("Website:  —"));
    }

    #[test]
    fn writes_comparison_and_top_csv() {
        let tmp = tempdir().unwrap();
        let out = tmp.path().to_str().unwrap();
        let datasets = sample_datasets();
        let analyzer = CollegeAnalyzer::new(&datasets);

        let comparison = analyzer.compare(&["alpha".to_string(), "nowhere".to_string()], None);
        generate_comparison_csv(&comparison, out).unwrap();
        generate_top_csv(&analyzer.top_colleges(10), out).unwrap();

        let written = Table::parse_csv(&fs::read_to_string(tmp.path().join("comparison.csv")).unwrap());
        assert_eq!(written.len(), 2);
        assert_eq!(written.rows()[0].get("Closing Rank 2023"), Some("150"));
        assert_eq!(written.rows()[0].get("Closing Rank 2024"), Some(""));
        assert_eq!(written.rows()[1].get("Institute"), Some("nowhere"));

        let top = Table::parse_csv(&fs::read_to_string(tmp.path().join("top_colleges.csv")).unwrap());
        assert_eq!(top.rows()[0].get("Institute"), Some("Gamma University"));
        assert_eq!(top.rows()[0].get("rank"), Some("1"));
    }

    #[test]
    fn comparison_report_lists_missing_colleges() {
        let datasets = sample_datasets();
        let comparison = CollegeAnalyzer::new(&datasets).compare(&["nowhere".to_string()], Some("CSE"));
        let text = render_comparison(&comparison);

        assert!(text.contains("Program: CSE"));
        assert!(text.contains("nowhere\n   ⚠️  not found in the college list"));
    }

    #[test]
    fn table_render_lists_columns_and_placeholders() {
        let table = Table::from_rows(vec![
            Row::from_pairs([("Institute", "Alpha"), ("Predicted Closing Rank", "")]),
            Row::from_pairs(Vec::<(&str, &str)>::new()),
        ]);
        let text = render_table(&table);

        assert!(text.starts_with("Columns: Institute, Predicted Closing Rank\n"));
        assert!(text.contains("1.\n   Institute: Alpha\n   Predicted Closing Rank: —\n"));
        assert!(!text.contains("2."));
        assert!(render_table(&Table::from_rows(Vec::new())).is_empty());
    }
}
