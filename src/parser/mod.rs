pub mod venues;

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::FOUNDING_YEAR;
use venues::venue_for_code;

/// Confidence at or above which callers may trust an identification without
/// further corroboration. Context boosts are additive and uncapped, so
/// scores above 1.0 are possible; only relative ordering is meaningful.
pub const HIGH_CONFIDENCE: f32 = 0.7;

/// A structured, confidence-scored identification extracted from one label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    pub date: Option<NaiveDate>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub venue_name: Option<String>,
    /// Event description for non-ordinary shows ("Secret Set", "Millennium Show").
    pub event_type: Option<String>,
    /// Explicit "night N" marker from the label itself. Run detection against
    /// the catalog happens later and wins on disagreement.
    pub day_number: Option<u32>,
    pub is_special_event: bool,
    pub confidence: f32,
}

impl Candidate {
    fn with_confidence(confidence: f32) -> Self {
        Self {
            confidence,
            ..Self::default()
        }
    }

    fn has_location(&self) -> bool {
        self.venue_name.is_some() || self.city.is_some()
    }
}

/// Expand a 2-digit year to 4 digits. The tracked band formed in 1983, so
/// 83-99 → 19xx and 00-82 → 20xx.
fn expand_year(year: u32) -> u32 {
    if year >= 100 {
        year
    } else if year >= (FOUNDING_YEAR % 100) as u32 {
        1900 + year
    } else {
        2000 + year
    }
}

/// Validate a date the way a rule must: real calendar date, not before the
/// band existed. Returns None for anything implausible.
fn plausible_date(year: u32, month: u32, day: u32) -> Option<NaiveDate> {
    let year = expand_year(year);
    if (year as i32) < FOUNDING_YEAR {
        return None;
    }
    NaiveDate::from_ymd_opt(year as i32, month, day)
}

fn cap_num(caps: &regex::Captures<'_>, name: &str) -> Option<u32> {
    caps.name(name)?.as_str().parse().ok()
}

// Rule 1: compact prefixed date — ph2024-08-30, ph97-11-22
static COMPACT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        ^[a-z]{1,6}
        (?P<year>\d{2,4})-(?P<month>\d{1,2})-(?P<day>\d{1,2})
        (?P<rest>.*)$",
    )
    .unwrap()
});

// Rule 2: fully qualified date + city + state — "1997-11-22 Hampton, VA"
static DATE_CITY_STATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})
        [\s._-]+
        (?P<city>[A-Za-z][A-Za-z\s.']*?)
        \s*,\s*
        (?P<state>[A-Z]{2})\b",
    )
    .unwrap()
});

// Rule 3: descriptive free text with embedded date and trailing description
// "Phish 1999-12-31 Big Cypress Millennium Show"
static DATE_DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?P<year>\d{4})[-._](?P<month>\d{2})[-._](?P<day>\d{2})
        [\s._-]+
        (?P<desc>[A-Za-z][A-Za-z0-9.'&-]*(?:\s+[A-Za-z0-9.'&-]+)+)$",
    )
    .unwrap()
});

// Rule 4: explicit secret/special set marker alongside a date
static SECRET_SET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bsecret\s*set\b").unwrap());

// Rule 5: historical free-text US-format date — "10/31/94", "8-9-1998"
static US_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\d])(?P<month>\d{1,2})[/-](?P<day>\d{1,2})[/-](?P<year>\d{2,4})(?:[^\d]|$)")
        .unwrap()
});

// Rule 8: bare ISO-ish date anywhere in the label
static BARE_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<year>\d{4})[-._](?P<month>\d{1,2})[-._](?P<day>\d{1,2})").unwrap()
});

// Explicit "night N" / "day N" / "N3" marker
static DAY_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:night|day)[\s._]*(?P<n>\d)\b|\bn(?P<n2>\d)\b").unwrap()
});

// 4-digit year inside a folder name (context boost)
static CONTEXT_YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:19[89]\d|20\d{2})\b").unwrap());

/// Named recurring broadcast/festival formats with a fixed venue. These are
/// assigned by rule, not parsed from the text.
const NAMED_FORMATS: &[(&str, &str, &str, &str, Option<&str>)] = &[
    ("bakers dozen", "Madison Square Garden", "New York", "NY", None),
    ("baker's dozen", "Madison Square Garden", "New York", "NY", None),
    ("new years run", "Madison Square Garden", "New York", "NY", None),
    ("new year's run", "Madison Square Garden", "New York", "NY", None),
    (
        "big cypress",
        "Big Cypress Seminole Indian Reservation",
        "Big Cypress",
        "FL",
        Some("Millennium Show"),
    ),
    ("clifford ball", "Plattsburgh Air Force Base", "Plattsburgh", "NY", None),
];

/// Special-event keywords that identify a show type even without a date.
const SPECIAL_KEYWORDS: &[(&str, &str)] = &[
    ("secret set", "Secret Set"),
    ("millennium", "Millennium Show"),
    ("soundcheck", "Soundcheck"),
    ("halloween", "Halloween Show"),
    ("festival", "Festival Set"),
];

// Base confidences, one per rule category. Specific formats outrank generic
// ones; overlapping matches are resolved by score, ties by declaration order.
const CONF_COMPACT: f32 = 0.85;
const CONF_DATE_CITY_STATE: f32 = 0.9;
const CONF_DATE_DESCRIPTION: f32 = 0.8;
const CONF_SECRET_SET: f32 = 0.75;
const CONF_US_DATE: f32 = 0.7;
const CONF_NAMED_FORMAT: f32 = 0.6;
const CONF_SPECIAL_KEYWORD: f32 = 0.4;
const CONF_BARE_DATE: f32 = 0.3;

const BOOST_CONTEXT_VENUE: f32 = 0.1;
const BOOST_CONTEXT_YEAR: f32 = 0.05;

type Rule = fn(&str) -> Option<Candidate>;

/// Ordered rule table. Every rule is evaluated; the highest-confidence
/// candidate wins, earliest declared wins ties.
const RULES: &[(&str, Rule)] = &[
    ("compact-prefix", rule_compact_prefix),
    ("date-city-state", rule_date_city_state),
    ("date-description", rule_date_description),
    ("secret-set", rule_secret_set),
    ("us-date", rule_us_date),
    ("named-format", rule_named_format),
    ("special-keyword", rule_special_keyword),
    ("bare-date", rule_bare_date),
];

fn rule_compact_prefix(label: &str) -> Option<Candidate> {
    let caps = COMPACT_RE.captures(label)?;
    let date = plausible_date(
        cap_num(&caps, "year")?,
        cap_num(&caps, "month")?,
        cap_num(&caps, "day")?,
    )?;

    let mut c = Candidate::with_confidence(CONF_COMPACT);
    c.date = Some(date);

    // Remainder tokens often carry a venue short code: ph2024-08-30.dicks
    if let Some(rest) = caps.name("rest") {
        for token in rest.as_str().split(['.', '_', '-', ' ']) {
            if let Some(v) = venue_for_code(token) {
                c.venue_name = Some(v.name.to_string());
                c.city = Some(v.city.to_string());
                c.state = Some(v.state.to_string());
                break;
            }
        }
    }
    Some(c)
}

fn rule_date_city_state(label: &str) -> Option<Candidate> {
    let caps = DATE_CITY_STATE_RE.captures(label)?;
    let date = plausible_date(
        cap_num(&caps, "year")?,
        cap_num(&caps, "month")?,
        cap_num(&caps, "day")?,
    )?;

    let mut c = Candidate::with_confidence(CONF_DATE_CITY_STATE);
    c.date = Some(date);
    c.city = Some(caps.name("city").unwrap().as_str().trim().to_string());
    c.state = Some(caps.name("state").unwrap().as_str().to_string());
    Some(c)
}

fn rule_date_description(label: &str) -> Option<Candidate> {
    let caps = DATE_DESCRIPTION_RE.captures(label)?;
    let date = plausible_date(
        cap_num(&caps, "year")?,
        cap_num(&caps, "month")?,
        cap_num(&caps, "day")?,
    )?;

    let desc = caps.name("desc").unwrap().as_str().trim();
    let mut c = Candidate::with_confidence(CONF_DATE_DESCRIPTION);
    c.date = Some(date);

    let lower = desc.to_lowercase();
    if let Some((_, event)) = SPECIAL_KEYWORDS.iter().find(|(k, _)| lower.contains(k)) {
        c.event_type = Some((*event).to_string());
        c.is_special_event = true;
    } else {
        // Trailing text is a venue/location description, not an event type
        c.venue_name = Some(desc.to_string());
    }
    Some(c)
}

fn rule_secret_set(label: &str) -> Option<Candidate> {
    if !SECRET_SET_RE.is_match(label) {
        return None;
    }
    let caps = BARE_DATE_RE.captures(label)?;
    let date = plausible_date(
        cap_num(&caps, "year")?,
        cap_num(&caps, "month")?,
        cap_num(&caps, "day")?,
    )?;

    let mut c = Candidate::with_confidence(CONF_SECRET_SET);
    c.date = Some(date);
    c.event_type = Some("Secret Set".to_string());
    c.is_special_event = true;
    Some(c)
}

fn rule_us_date(label: &str) -> Option<Candidate> {
    for caps in US_DATE_RE.captures_iter(label) {
        let date = plausible_date(
            cap_num(&caps, "year")?,
            cap_num(&caps, "month")?,
            cap_num(&caps, "day")?,
        );
        if let Some(date) = date {
            let mut c = Candidate::with_confidence(CONF_US_DATE);
            c.date = Some(date);
            return Some(c);
        }
    }
    None
}

fn rule_named_format(label: &str) -> Option<Candidate> {
    let lower = label.to_lowercase();
    let (_, venue, city, state, event) = NAMED_FORMATS
        .iter()
        .find(|(name, ..)| lower.contains(name))?;

    let mut c = Candidate::with_confidence(CONF_NAMED_FORMAT);
    c.venue_name = Some((*venue).to_string());
    c.city = Some((*city).to_string());
    c.state = Some((*state).to_string());
    if let Some(event) = event {
        c.event_type = Some((*event).to_string());
        c.is_special_event = true;
    }
    // A date in the label still attaches when present
    if let Some(caps) = BARE_DATE_RE.captures(label) {
        c.date = plausible_date(
            cap_num(&caps, "year")?,
            cap_num(&caps, "month")?,
            cap_num(&caps, "day")?,
        );
    }
    Some(c)
}

fn rule_special_keyword(label: &str) -> Option<Candidate> {
    let lower = label.to_lowercase();
    let (_, event) = SPECIAL_KEYWORDS.iter().find(|(k, _)| lower.contains(k))?;

    let mut c = Candidate::with_confidence(CONF_SPECIAL_KEYWORD);
    c.event_type = Some((*event).to_string());
    c.is_special_event = true;
    Some(c)
}

fn rule_bare_date(label: &str) -> Option<Candidate> {
    for caps in BARE_DATE_RE.captures_iter(label) {
        let date = plausible_date(
            cap_num(&caps, "year")?,
            cap_num(&caps, "month")?,
            cap_num(&caps, "day")?,
        );
        if let Some(date) = date {
            let mut c = Candidate::with_confidence(CONF_BARE_DATE);
            c.date = Some(date);
            return Some(c);
        }
    }
    None
}

/// Parse a raw label into the best candidate identification.
///
/// Every rule in the table is evaluated; all successful extractions are
/// collected and the highest-confidence one wins (first declared wins ties).
/// A blank label yields the zero-confidence empty candidate. Never panics.
pub fn parse(label: &str, context_path: Option<&str>) -> Candidate {
    let label = label.trim();
    if label.is_empty() {
        return Candidate::default();
    }

    let mut best: Option<Candidate> = None;
    for (name, rule) in RULES {
        if let Some(candidate) = rule(label) {
            log::debug!(
                "rule {name} matched '{label}' with confidence {:.2}",
                candidate.confidence
            );
            // Strictly-greater keeps the earliest declared rule on ties
            match &best {
                Some(b) if candidate.confidence <= b.confidence => {}
                _ => best = Some(candidate),
            }
        }
    }

    let mut result = match best {
        Some(c) => c,
        None => {
            log::debug!("no rule matched '{label}'");
            return Candidate::default();
        }
    };

    // Explicit "night N" marker anywhere in the label
    if let Some(caps) = DAY_NUMBER_RE.captures(label) {
        result.day_number = caps
            .name("n")
            .or_else(|| caps.name("n2"))
            .and_then(|m| m.as_str().parse().ok());
    }

    // Context-path enrichment: known venue codes and a folder year add
    // additive boosts. Not clamped; callers treat >= HIGH_CONFIDENCE as high.
    if let Some(folder) = context_path {
        if !result.has_location() {
            for token in folder.split(['/', '\\', '.', '_', '-', ' ']) {
                if let Some(v) = venue_for_code(token) {
                    result.venue_name = Some(v.name.to_string());
                    result.city = Some(v.city.to_string());
                    result.state = Some(v.state.to_string());
                    result.confidence += BOOST_CONTEXT_VENUE;
                    break;
                }
            }
        }
        if CONTEXT_YEAR_RE.is_match(folder) {
            result.confidence += BOOST_CONTEXT_YEAR;
        }
    }

    // Invariant: zero confidence means total parse failure, so a candidate
    // that somehow scored 0 must not carry a date.
    debug_assert!(result.confidence > 0.0 || result.date.is_none());
    result
}

/// The year a candidate refers to, preferring the parsed date over any
/// 4-digit year found in the context folder.
pub fn candidate_year(candidate: &Candidate, context_path: Option<&str>) -> Option<i32> {
    if let Some(date) = candidate.date {
        return Some(date.year());
    }
    context_path
        .and_then(|f| CONTEXT_YEAR_RE.find(f))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    // === Compact prefixed dates ===

    #[test]
    fn test_compact_basic() {
        let c = parse("ph1997-11-22", None);
        assert_eq!(c.date, Some(d(1997, 11, 22)));
        assert!(c.confidence >= 0.8);
    }

    #[test]
    fn test_compact_with_venue_code() {
        let c = parse("ph2024-08-30.dicks", None);
        assert_eq!(c.date, Some(d(2024, 8, 30)));
        assert_eq!(c.venue_name.as_deref(), Some("Dick's Sporting Goods Park"));
        assert_eq!(c.city.as_deref(), Some("Commerce City"));
        assert_eq!(c.state.as_deref(), Some("CO"));
        assert!(c.confidence >= 0.8);
    }

    #[test]
    fn test_compact_two_digit_year() {
        let c = parse("ph97-11-22d1t04", None);
        assert_eq!(c.date, Some(d(1997, 11, 22)));
    }

    #[test]
    fn test_compact_beats_bare_date() {
        // Both the compact rule and the bare-date fallback match; the
        // compact rule's higher confidence must win.
        let c = parse("ph2023-12-31", None);
        assert!(c.confidence >= CONF_COMPACT);
    }

    // === Qualified date + city + state ===

    #[test]
    fn test_date_city_state() {
        let c = parse("Phish 1997-11-22 Hampton, VA", None);
        assert_eq!(c.date, Some(d(1997, 11, 22)));
        assert_eq!(c.city.as_deref(), Some("Hampton"));
        assert_eq!(c.state.as_deref(), Some("VA"));
        assert!((c.confidence - CONF_DATE_CITY_STATE).abs() < 1e-6);
    }

    #[test]
    fn test_date_city_state_outranks_compact() {
        // City/state present makes this the most specific match
        let c = parse("ph1997-11-22 Hampton, VA", None);
        assert_eq!(c.state.as_deref(), Some("VA"));
    }

    // === Descriptive date + trailing text ===

    #[test]
    fn test_date_with_description() {
        let c = parse("1999-12-31 Big Cypress Millennium Show", None);
        assert_eq!(c.date, Some(d(1999, 12, 31)));
        assert!(c.is_special_event);
        assert_eq!(c.event_type.as_deref(), Some("Millennium Show"));
    }

    #[test]
    fn test_date_with_venue_description() {
        let c = parse("1998-07-29 Riverport Amphitheatre", None);
        assert_eq!(c.date, Some(d(1998, 7, 29)));
        assert_eq!(c.venue_name.as_deref(), Some("Riverport Amphitheatre"));
        assert!(!c.is_special_event);
    }

    // === Secret sets ===

    #[test]
    fn test_secret_set_with_date() {
        let c = parse("Secret Set 2018-08-31", None);
        assert_eq!(c.date, Some(d(2018, 8, 31)));
        assert_eq!(c.event_type.as_deref(), Some("Secret Set"));
        assert!(c.is_special_event);
        assert!(c.confidence >= CONF_SECRET_SET);
    }

    #[test]
    fn test_secret_set_without_date() {
        // Falls to the keyword rule: special event, no date, low confidence
        let c = parse("The Secret Set soundboard", None);
        assert!(c.is_special_event);
        assert!(c.date.is_none());
        assert!((c.confidence - CONF_SPECIAL_KEYWORD).abs() < 1e-6);
    }

    // === Historical US-format dates ===

    #[test]
    fn test_us_format_date() {
        let c = parse("Glens Falls Civic Center 10/31/94", None);
        assert_eq!(c.date, Some(d(1994, 10, 31)));
        assert!((c.confidence - CONF_US_DATE).abs() < 1e-6);
    }

    // === Named formats ===

    #[test]
    fn test_named_format_fixed_venue() {
        let c = parse("Bakers Dozen Night 3", None);
        assert_eq!(c.venue_name.as_deref(), Some("Madison Square Garden"));
        assert_eq!(c.city.as_deref(), Some("New York"));
        assert_eq!(c.day_number, Some(3));
    }

    #[test]
    fn test_named_format_with_event_type() {
        let c = parse("Big Cypress 1999-12-31", None);
        assert_eq!(c.date, Some(d(1999, 12, 31)));
        assert!(c.is_special_event);
        assert_eq!(c.event_type.as_deref(), Some("Millennium Show"));
    }

    // === Bare date fallback ===

    #[test]
    fn test_bare_date_low_confidence() {
        let c = parse("recording_2021-07-30_final", None);
        assert_eq!(c.date, Some(d(2021, 7, 30)));
        assert!(c.confidence < 0.5);
    }

    #[test]
    fn test_bare_date_dot_separated() {
        let c = parse("show 2013.12.31 audio", None);
        assert_eq!(c.date, Some(d(2013, 12, 31)));
    }

    // === Failure modes ===

    #[test]
    fn test_empty_label() {
        let c = parse("", None);
        assert_eq!(c.confidence, 0.0);
        assert!(c.date.is_none());
    }

    #[test]
    fn test_whitespace_label() {
        let c = parse("   ", None);
        assert_eq!(c.confidence, 0.0);
        assert!(c.date.is_none());
    }

    #[test]
    fn test_impossible_month_rejected() {
        let c = parse("ph1997-13-05", None);
        assert!(c.date.is_none());
        assert!(c.confidence < 0.3);
    }

    #[test]
    fn test_impossible_day_rejected() {
        // February 30 does not exist; no rule may emit it
        let c = parse("show 2020-02-30 matrix", None);
        assert!(c.date.is_none());
        assert!(c.confidence < 0.3);
    }

    #[test]
    fn test_pre_founding_year_rejected() {
        let c = parse("ph1977-05-08", None);
        assert!(c.date.is_none());
    }

    #[test]
    fn test_no_date_no_keywords() {
        let c = parse("random nonsense file", None);
        assert_eq!(c.confidence, 0.0);
        assert!(c.date.is_none());
    }

    // === Context boosts ===

    #[test]
    fn test_context_venue_boost() {
        let bare = parse("2021-09-03", None);
        let boosted = parse("2021-09-03", Some("Phish/dicks 2021"));
        assert_eq!(boosted.venue_name.as_deref(), Some("Dick's Sporting Goods Park"));
        // venue boost plus year boost
        assert!(boosted.confidence > bare.confidence + 0.14);
    }

    #[test]
    fn test_context_year_boost_only() {
        let bare = parse("2021-09-03", None);
        let boosted = parse("2021-09-03", Some("Phish 2021 tour"));
        assert!((boosted.confidence - bare.confidence - BOOST_CONTEXT_YEAR).abs() < 1e-6);
    }

    #[test]
    fn test_context_does_not_override_parsed_venue() {
        let c = parse("ph2024-08-30.dicks", Some("msg shows"));
        assert_eq!(c.venue_name.as_deref(), Some("Dick's Sporting Goods Park"));
    }

    #[test]
    fn test_boost_can_exceed_one() {
        // 0.9 base + 0.1 + 0.05 — the scale is intentionally uncapped
        let c = parse("1997-11-22 Hampton, VA", Some("hampton 1997"));
        assert!((c.confidence - 0.95).abs() < 1e-6 || c.confidence > 0.9);
    }

    // === Day numbers ===

    #[test]
    fn test_day_number_n_notation() {
        let c = parse("ph2021-08-08 n3", None);
        assert_eq!(c.day_number, Some(3));
    }

    #[test]
    fn test_day_number_word() {
        let c = parse("2022-09-02 Dicks Night 2", None);
        assert_eq!(c.day_number, Some(2));
    }

    // === Helpers ===

    #[test]
    fn test_expand_year() {
        assert_eq!(expand_year(97), 1997);
        assert_eq!(expand_year(83), 1983);
        assert_eq!(expand_year(24), 2024);
        assert_eq!(expand_year(0), 2000);
        assert_eq!(expand_year(1997), 1997);
    }

    #[test]
    fn test_candidate_year() {
        let c = parse("ph1997-11-22", None);
        assert_eq!(candidate_year(&c, None), Some(1997));

        let none = parse("no date here at all", None);
        assert_eq!(candidate_year(&none, Some("Phish 2021")), Some(2021));
        assert_eq!(candidate_year(&none, None), None);
    }
}
