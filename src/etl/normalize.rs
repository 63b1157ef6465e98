//! Field normalisation shared by the snapshot writers

use chrono::NaiveDate;
use quick_xml::escape::resolve_html5_entity;
use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)?)").expect("valid age regex"));

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#([0-9]{1,7})|#[xX]([0-9a-fA-F]{1,6})|([A-Za-z][A-Za-z0-9]{1,31}));")
        .expect("valid entity regex")
});

/// Decode named and numeric entities one by one; anything that is not a
/// known entity, such as a bare `R&D`, is left as written
pub fn unescape_html(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let decoded = if let Some(dec) = caps.get(1) {
                dec.as_str().parse::<u32>().ok().and_then(char::from_u32).map(String::from)
            } else if let Some(hex) = caps.get(2) {
                u32::from_str_radix(hex.as_str(), 16)
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
            } else {
                caps.get(3)
                    .and_then(|name| resolve_html5_entity(name.as_str()))
                    .map(str::to_string)
            };
            decoded.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Unescape HTML entities, NFKC-normalise and trim
pub fn clean_text(text: &str) -> String {
    unescape_html(text).nfkc().collect::<String>().trim().to_string()
}

/// `NOT_YET_RECRUITING` -> `Not Yet Recruiting`, `PHASE2` -> `Phase2`
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for ch in text.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}

/// Convert an eligibility age such as `2 Years` or `6 Weeks` to months.
/// Unknown units and missing numbers give 0.
pub fn age_to_months(age: &str) -> f64 {
    let age = age.trim().to_lowercase();
    let Some(quantity) = LEADING_NUMBER
        .captures(&age)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
    else {
        return 0.0;
    };

    if age.contains("year") {
        quantity * 12.0
    } else if age.contains("month") {
        quantity
    } else if age.contains("week") {
        quantity / 4.0
    } else if age.contains("day") {
        quantity / 30.0
    } else {
        0.0
    }
}

/// Render a float the way the history files have always stored them:
/// whole numbers keep a trailing `.0`
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Parse `YYYY`, `YYYY-MM` or `YYYY-MM-DD`
pub fn parse_partial_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    match value.split('-').count() {
        1 if value.len() == 4 => NaiveDate::parse_from_str(&format!("{value}-01-01"), "%Y-%m-%d").ok(),
        2 => NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d").ok(),
        3 => NaiveDate::parse_from_str(value, "%Y-%m-%d").ok(),
        _ => None,
    }
}

/// Standardise an API date to `YYYY-MM-DD`; unparseable dates become empty
pub fn standardize_date(value: &str) -> String {
    parse_partial_date(value)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// `BriefTitle` -> `Brief Title`
pub fn humanize_field(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if i > 0 && ch.is_ascii_uppercase() {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

pub fn join<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_unescapes_and_normalises() {
        assert_eq!(clean_text("  Heart &amp; Lung  "), "Heart & Lung");
        assert_eq!(clean_text("caf&eacute; &#39;x&#39;"), "café 'x'");
        // NFKC folds the ligature and the full-width digit
        assert_eq!(clean_text("ﬁbrosis １"), "fibrosis 1");
        assert_eq!(clean_text("R&D without semicolon"), "R&D without semicolon");
        assert_eq!(clean_text("Heart &amp; Lung R&D"), "Heart & Lung R&D");
        assert_eq!(clean_text("A &bogus; &lt;b&gt; &#x2014; R&D;"), "A &bogus; <b> \u{2014} R&D;");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("NOT_YET_RECRUITING"), "Not Yet Recruiting");
        assert_eq!(title_case("PHASE2"), "Phase2");
        assert_eq!(title_case("EARLY_PHASE1"), "Early Phase1");
        assert_eq!(title_case("phase2a"), "Phase2A");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_age_to_months() {
        assert_eq!(age_to_months("2 Years"), 24.0);
        assert_eq!(age_to_months("3 Months"), 3.0);
        assert_eq!(age_to_months("1 Week"), 0.25);
        assert_eq!(age_to_months("15 Days"), 0.5);
        assert_eq!(age_to_months("1.5 years"), 18.0);
        assert_eq!(age_to_months("N/A"), 0.0);
        assert_eq!(age_to_months("12 Fortnights"), 0.0);
        assert_eq!(age_to_months(""), 0.0);
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(216.0), "216.0");
        assert_eq!(format_float(0.25), "0.25");
    }

    #[test]
    fn test_standardize_date() {
        assert_eq!(standardize_date("2023-05"), "2023-05-01");
        assert_eq!(standardize_date("2023-05-17"), "2023-05-17");
        assert_eq!(standardize_date("2023"), "2023-01-01");
        assert_eq!(standardize_date("2023-13"), "");
        assert_eq!(standardize_date("soon"), "");
        assert_eq!(standardize_date(""), "");
    }

    #[test]
    fn test_humanize_field() {
        assert_eq!(humanize_field("BriefTitle"), "Brief Title");
        assert_eq!(humanize_field("MinimumAgeMonths"), "Minimum Age Months");
        assert_eq!(humanize_field("Phase"), "Phase");
    }

    #[test]
    fn test_join() {
        assert_eq!(join(["a", "b"]), "a, b");
        assert_eq!(join(Vec::<String>::new()), "");
    }
}
