//! Header-keyed rows parsed from CSV text or JSON payloads, and the tolerant
//! lookups used to reconcile column names across independently produced files.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tracing::debug;

/// Rendered in place of any value a dataset does not provide.
pub const PLACEHOLDER: &str = "—";

/// One record keyed by the header text of its source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: Vec<(String, String)>,
}

impl Row {
    /// Builds a row from `(column, value)` pairs, trimming both sides.
    ///
    /// A repeated column keeps its first position and takes the last value,
    /// so lookups and the serialized object always agree.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut fields: Vec<(String, String)> = Vec::new();
        for (k, v) in pairs {
            let key = k.as_ref().trim();
            let value = v.as_ref().trim().to_string();
            match fields.iter_mut().find(|(existing, _)| existing.as_str() == key) {
                Some(slot) => slot.1 = value,
                None => fields.push((key.to_string(), value)),
            }
        }
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Exact key lookup.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the value of the first candidate present in the row.
    ///
    /// All candidates are tried as exact keys first, then again ignoring case
    /// and surrounding whitespace. Yields `""` when nothing matches.
    pub fn field(&self, candidates: &[&str]) -> &str {
        for candidate in candidates {
            if let Some(value) = self.get(candidate) {
                return value;
            }
        }

        for candidate in candidates {
            let wanted = candidate.trim().to_lowercase();
            if let Some((_, value)) = self
                .fields
                .iter()
                .find(|(k, _)| k.trim().to_lowercase() == wanted)
            {
                return value;
            }
        }

        ""
    }

    /// Value of the first column whose lowercased name contains `needle`.
    pub fn field_containing(&self, needle: &str) -> &str {
        let needle = needle.to_lowercase();
        self.fields
            .iter()
            .find(|(k, _)| k.to_lowercase().contains(&needle))
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    /// Like [`Row::field`], but renders missing or empty values as [`PLACEHOLDER`].
    pub fn display(&self, candidates: &[&str]) -> &str {
        or_placeholder(self.field(candidates))
    }
}

pub fn or_placeholder(value: &str) -> &str {
    if value.trim().is_empty() {
        PLACEHOLDER
    } else {
        value
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = Row;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object of column values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Row, A::Error> {
                let mut pairs: Vec<(String, String)> = Vec::new();
                while let Some((key, value)) = access.next_entry::<String, serde_json::Value>()? {
                    pairs.push((key, json_cell(&value)));
                }
                Ok(Row::from_pairs(pairs))
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

fn json_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Ordered rows from one source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Parses CSV text whose first line is the header.
    ///
    /// Quoted fields may span lines: physical lines are joined until the
    /// buffered record holds an even number of `"` characters. `""` is not
    /// unescaped. Records whose field count differs from the header's are
    /// dropped.
    pub fn parse_csv(text: &str) -> Self {
        let mut lines = text.lines();
        let header_line = match lines.next() {
            Some(line) => line.trim_start_matches('\u{feff}'),
            None => return Self::default(),
        };

        let headers = split_fields(header_line);
        if headers.iter().all(|h| h.is_empty()) {
            return Self::default();
        }

        let mut rows = Vec::new();
        let mut buffer = String::new();
        let mut quotes = 0usize;
        let mut dropped = 0usize;

        for line in lines {
            if buffer.is_empty() && line.trim().is_empty() {
                continue;
            }
            if !buffer.is_empty() {
                buffer.push('\n');
            }
            buffer.push_str(line);
            quotes += line.matches('"').count();
            if quotes % 2 != 0 {
                continue;
            }

            let values = split_fields(&buffer);
            if values.len() == headers.len() {
                rows.push(Row::from_pairs(headers.iter().zip(values.iter())));
            } else {
                dropped += 1;
            }
            buffer.clear();
            quotes = 0;
        }

        if !buffer.is_empty() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, columns = headers.len(), "discarded malformed csv records");
        }

        Self { headers, rows }
    }

    /// Wraps rows decoded from a JSON payload; headers come from the first row.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let headers = rows
            .first()
            .map(|row| row.keys().map(str::to_string).collect())
            .unwrap_or_default();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Splits one logical record on commas outside double quotes, stripping the
/// quotes and trimming every field.
pub fn split_fields(record: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in record.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());

    fields
}

/// Trimmed, single-spaced, lowercased form used to compare names across datasets.
pub fn normalize_name(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_row_csv() {
        let table = Table::parse_csv("Institute,Program\nA,X\nB,Y");

        assert_eq!(table.headers(), &["Institute".to_string(), "Program".to_string()]);
        assert_eq!(
            table.rows(),
            &[
                Row::from_pairs([("Institute", "A"), ("Program", "X")]),
                Row::from_pairs([("Institute", "B"), ("Program", "Y")]),
            ]
        );
    }

    #[test]
    fn trims_headers_and_values() {
        let table = Table::parse_csv(" Institute , District \n  Alpha College ,  North \nBeta,South\n");

        assert_eq!(table.len(), 2);
        let first = &table.rows()[0];
        assert_eq!(first.get("Institute"), Some("Alpha College"));
        assert_eq!(first.get("District"), Some("North"));
    }

    #[test]
    fn quoted_field_with_newline_stays_one_row() {
        let text = "Institute,review_text,rating\nAlpha,\"great labs\nbad mess\",4\nBeta,ok,3\n";
        let table = Table::parse_csv(text);

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].get("review_text"), Some("great labs\nbad mess"));
        assert_eq!(table.rows()[0].get("rating"), Some("4"));
        assert_eq!(table.rows()[1].get("Institute"), Some("Beta"));
    }

    #[test]
    fn quoted_commas_do_not_split() {
        let table = Table::parse_csv("Institute,top_recruiters\nAlpha,\"Acme, Globex\"\n");
        assert_eq!(table.rows()[0].get("top_recruiters"), Some("Acme, Globex"));
    }

    #[test]
    fn ragged_records_are_dropped() {
        let table = Table::parse_csv("Institute,Program\nA,X\nB\nC,Z,extra\nD,W\n");

        let names: Vec<_> = table.iter().map(|r| r.field(&["Institute"])).collect();
        assert_eq!(names, vec!["A", "D"]);
        assert!(table.iter().all(|r| r.len() == 2));
    }

    #[test]
    fn repeated_columns_resolve_to_the_last_value() {
        let table = Table::parse_csv("Institute,rating,rating\nAlpha,3,5\n");
        let row = &table.rows()[0];

        assert_eq!(row.len(), 2);
        assert_eq!(row.get("rating"), Some("5"));
        assert_eq!(
            serde_json::to_string(row).unwrap(),
            r#"{"Institute":"Alpha","rating":"5"}"#
        );
    }

    #[test]
    fn doubled_quotes_are_not_unescaped() {
        let table = Table::parse_csv("Institute,Motto\nA,\"say \"\"hi\"\"\"\n");
        assert_eq!(table.rows()[0].get("Motto"), Some("say hi"));
    }

    #[test]
    fn unterminated_quote_at_end_is_dropped() {
        let table = Table::parse_csv("Institute,Program\nA,X\nB,\"open\n");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn handles_bom_crlf_and_blank_lines() {
        let table = Table::parse_csv("\u{feff}Institute,Program\r\nA,X\r\n\r\nB,Y\r\n");
        assert_eq!(table.headers()[0], "Institute");
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1].get("Program"), Some("Y"));
    }

    #[test]
    fn empty_input_is_empty_table() {
        assert!(Table::parse_csv("").is_empty());
        assert!(Table::parse_csv("\n\n").headers().is_empty());
    }

    #[test]
    fn field_ignores_case_and_surrounding_whitespace() {
        let row = Row::from_pairs([("INSTITUTE ", "Alpha"), ("district", "North")]);

        assert_eq!(row.field(&["Institute"]), "Alpha");
        assert_eq!(row.field(&["  institute"]), "Alpha");
        assert_eq!(row.field(&["District"]), row.field(&["DISTRICT"]));
        assert_eq!(row.field(&["Website"]), "");
    }

    #[test]
    fn field_prefers_exact_match_over_case_insensitive() {
        let row = Row::from_pairs([("rank", "9"), ("Rank", "1")]);
        assert_eq!(row.field(&["Rank"]), "1");
        assert_eq!(row.field(&["RANK"]), "9");
    }

    #[test]
    fn institute_and_college_name_headers_resolve_alike() {
        let colleges = Table::parse_csv("Institute,District\nAlpha Institute,North\n");
        let placements = Table::parse_csv("College_Name,avg_ctc\n alpha  institute ,12\n");
        let keys = ["Institute", "College_Name"];

        let a = normalize_name(colleges.rows()[0].field(&keys));
        let b = normalize_name(placements.rows()[0].field(&keys));
        assert_eq!(a, b);
    }

    #[test]
    fn field_containing_matches_substring() {
        let row = Row::from_pairs([("Name of Institute", "Alpha"), ("inst_rank", "4")]);
        assert_eq!(row.field_containing("institute"), "Alpha");
        assert_eq!(row.field_containing("RANK"), "4");
        assert_eq!(row.field_containing("website"), "");
    }

    #[test]
    fn display_uses_placeholder_for_missing_values() {
        let row = Row::from_pairs([("Website", "")]);
        assert_eq!(row.display(&["Website"]), PLACEHOLDER);
        assert_eq!(row.display(&["Picture"]), PLACEHOLDER);
    }

    #[test]
    fn normalize_name_collapses_spacing_and_case() {
        assert_eq!(normalize_name("  Alpha   Institute\tof  Tech "), "alpha institute of tech");
    }

    #[test]
    fn rows_decode_from_json_objects() {
        let rows: Vec<Row> =
            serde_json::from_str(r#"[{"Institute": " Alpha ", "rank": 2, "lat": null}]"#).unwrap();
        let table = Table::from_rows(rows);

        assert_eq!(table.headers().len(), 3);
        let row = &table.rows()[0];
        assert_eq!(row.get("Institute"), Some("Alpha"));
        assert_eq!(row.get("rank"), Some("2"));
        assert_eq!(row.get("lat"), Some(""));
    }

    #[test]
    fn rows_serialize_as_ordered_objects() {
        let row = Row::from_pairs([("b", "1"), ("a", "2")]);
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"{"b":"1","a":"2"}"#);
    }
}
