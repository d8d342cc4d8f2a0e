//! Prometheus text-exposition parser.
//!
//! Turns a raw scrape body into `HELP`/`TYPE` metadata keyed by metric name
//! plus an ordered list of samples. Malformed lines are counted and skipped,
//! never fatal to the batch.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::warn;

// HELP comment: "# HELP <name> <free text>"
static HELP_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#\s+HELP\s+(\w+)\s+(.*)$").unwrap());

// TYPE comment: "# TYPE <name> <word>"
static TYPE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#\s+TYPE\s+(\w+)\s+(\w+)$").unwrap());

/// Declared metadata for one metric name, within one scrape body.
///
/// Either field stays empty when the corresponding comment is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricMetadata {
    /// Free text from the `HELP` comment.
    pub help: String,
    /// Word from the `TYPE` comment (e.g. "gauge", "counter").
    pub metric_type: String,
}

/// One exposed value. The value text is carried verbatim; downstream
/// consumers treat payloads as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Raw metric name (pre-sanitization), label block excluded.
    pub metric: String,
    /// Value text, exactly as it appeared after the last space.
    pub value: String,
}

/// Per-scrape line accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineStats {
    /// Blank lines and `#` comment lines.
    pub comments_or_blank: usize,
    /// Non-comment lines that could not be parsed as a sample.
    pub malformed: usize,
}

/// Result of parsing one scrape body.
#[derive(Debug, Clone, Default)]
pub struct Scrape {
    /// Metadata keyed by raw metric name.
    pub metadata: HashMap<String, MetricMetadata>,
    /// Samples in source line order.
    pub samples: Vec<Sample>,
    /// Skipped-line counters.
    pub stats: LineStats,
}

/// Parse a raw exposition body.
pub fn parse(body: &str) -> Scrape {
    let mut scrape = Scrape::default();

    for raw_line in body.lines() {
        let line = raw_line.trim();

        if line.is_empty() {
            scrape.stats.comments_or_blank += 1;
            continue;
        }

        if line.starts_with('#') {
            scrape.stats.comments_or_blank += 1;
            if let Some(caps) = HELP_REGEX.captures(line) {
                let entry = scrape.metadata.entry(caps[1].to_string()).or_default();
                entry.help = caps[2].to_string();
            } else if let Some(caps) = TYPE_REGEX.captures(line) {
                let entry = scrape.metadata.entry(caps[1].to_string()).or_default();
                entry.metric_type = caps[2].to_string();
            }
            continue;
        }

        match parse_sample_line(line) {
            Some(sample) => scrape.samples.push(sample),
            None => {
                scrape.stats.malformed += 1;
                warn!("Skipping malformed metric line: {}", line);
            }
        }
    }

    scrape
}

/// Extract (name, value) from one sample line.
///
/// The name runs up to the first `{` when a label block starts before the
/// first space, otherwise up to the first space; the label block itself is
/// discarded. The value is everything after the last space, which keeps the
/// extraction stable when label values contain spaces. A line without any
/// space has no value and is malformed.
fn parse_sample_line(line: &str) -> Option<Sample> {
    let last_space = line.rfind(' ')?;
    let value = &line[last_space + 1..];

    let first_space = line.find(' ')?;
    let name = match line.find('{') {
        Some(brace) if brace < first_space => &line[..brace],
        _ => &line[..first_space],
    };

    Some(Sample {
        metric: name.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_and_sample() {
        let body = "# HELP wingbits_gps_fix GPS fix status\n\
                    # TYPE wingbits_gps_fix gauge\n\
                    wingbits_gps_fix 1\n";

        let scrape = parse(body);

        let meta = scrape.metadata.get("wingbits_gps_fix").unwrap();
        assert_eq!(meta.help, "GPS fix status");
        assert_eq!(meta.metric_type, "gauge");

        assert_eq!(scrape.samples.len(), 1);
        assert_eq!(scrape.samples[0].metric, "wingbits_gps_fix");
        assert_eq!(scrape.samples[0].value, "1");
        assert_eq!(scrape.stats.comments_or_blank, 2);
        assert_eq!(scrape.stats.malformed, 0);
    }

    #[test]
    fn test_label_block_is_discarded() {
        // The trailing timestamp is the last space-delimited token, so it
        // wins over the sample value. Faithful to the extraction contract.
        let scrape = parse(r#"http_requests_total{method="GET"} 1027 1609459200"#);

        assert_eq!(scrape.samples.len(), 1);
        assert_eq!(scrape.samples[0].metric, "http_requests_total");
        assert_eq!(scrape.samples[0].value, "1609459200");
    }

    #[test]
    fn test_label_value_containing_spaces() {
        let scrape = parse(r#"fs_usage{mount="/media/usb drive"} 0.82"#);

        assert_eq!(scrape.samples.len(), 1);
        assert_eq!(scrape.samples[0].metric, "fs_usage");
        assert_eq!(scrape.samples[0].value, "0.82");
    }

    #[test]
    fn test_line_without_space_is_malformed() {
        let scrape = parse("malformed_line_no_space");

        assert!(scrape.samples.is_empty());
        assert_eq!(scrape.stats.malformed, 1);
        assert_eq!(scrape.stats.comments_or_blank, 0);
    }

    #[test]
    fn test_line_accounting() {
        let body = "\n\
                    # HELP a help text\n\
                    # TYPE a gauge\n\
                    a 1\n\
                    broken\n\
                    \n\
                    b{x=\"y\"} 2\n";

        let scrape = parse(body);
        let total_lines = body.lines().count();

        assert_eq!(scrape.samples.len(), 2);
        assert_eq!(scrape.stats.comments_or_blank, 4);
        assert_eq!(scrape.stats.malformed, 1);
        assert_eq!(
            scrape.samples.len() + scrape.stats.comments_or_blank + scrape.stats.malformed,
            total_lines
        );
    }

    #[test]
    fn test_sample_order_preserved() {
        let scrape = parse("b 2\na 1\nc 3\n");
        let names: Vec<&str> = scrape.samples.iter().map(|s| s.metric.as_str()).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn test_sample_without_metadata() {
        let scrape = parse("orphan_metric 42\n");

        assert_eq!(scrape.samples.len(), 1);
        assert!(scrape.metadata.is_empty());
    }

    #[test]
    fn test_metadata_after_sample_still_collected() {
        let body = "a 1\n# HELP a late help\n";
        let scrape = parse(body);

        assert_eq!(scrape.metadata.get("a").unwrap().help, "late help");
        assert_eq!(scrape.samples.len(), 1);
    }

    #[test]
    fn test_dotted_metric_name_gets_no_metadata() {
        // The \w+ capture does not span '.' or '-', so metrics with such
        // names sample fine but never acquire metadata.
        let body = "# HELP wingbits.altitude-ft altitude\nwingbits.altitude-ft 3500\n";
        let scrape = parse(body);

        assert!(scrape.metadata.is_empty());
        assert_eq!(scrape.samples.len(), 1);
        assert_eq!(scrape.samples[0].metric, "wingbits.altitude-ft");
    }

    #[test]
    fn test_comment_that_is_not_metadata() {
        let scrape = parse("# EOF\n# just a note\n");

        assert!(scrape.metadata.is_empty());
        assert_eq!(scrape.stats.comments_or_blank, 2);
    }
}
