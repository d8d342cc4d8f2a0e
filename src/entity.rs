//! Entity identifier derivation and display naming.
//!
//! Maps raw metric names and source labels onto identifiers that are safe
//! as MQTT topic segments and unique ids, and derives the human-facing
//! names and icons used in discovery payloads.

/// Replace every `.` and `-` with `_`.
///
/// No other character classes are normalized; inputs containing other
/// special characters are not guaranteed safe topic segments.
pub fn sanitize(name: &str) -> String {
    name.replace(['.', '-'], "_")
}

/// Canonical identifier for a (source, metric) pair, used as both topic
/// segment and unique-id component.
pub fn entity_id(source_label: &str, metric: &str) -> String {
    sanitize(&format!("{}_{}", source_label, sanitize(metric)))
}

/// Derive a display name from a raw metric name: strip the configured
/// prefix, turn `_` into spaces, and title-case each word. Falls back to
/// the sanitized metric name when stripping leaves nothing.
pub fn friendly_name(metric: &str, strip_prefix: Option<&str>) -> String {
    let stripped = match strip_prefix {
        Some(prefix) => metric.strip_prefix(prefix).unwrap_or(metric),
        None => metric,
    };

    let name = title_case(&stripped.replace('_', " "));
    if name.is_empty() {
        sanitize(metric)
    } else {
        name
    }
}

/// Title-case each whitespace-separated word.
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Pick an icon from simple keyword and type rules.
pub fn icon_for(metric: &str, metric_type: &str) -> &'static str {
    if metric.contains("connection") {
        "mdi:connection"
    } else if metric.contains("total") || metric_type == "counter" {
        "mdi:counter"
    } else if metric.contains("version") {
        "mdi:tag"
    } else {
        "mdi:gauge"
    }
}
