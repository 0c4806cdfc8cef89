use crate::BAND;
use crate::catalog::models::ShowRecord;
use crate::catalog::{CancelToken, CatalogClient};
use crate::parser::{self, Candidate};
use crate::run::{self, RunInfo};
use crate::setlist::{Setlist, parse_setlist};

/// The full result of identifying one label: the parsed candidate, whatever
/// the catalog resolved, and human-readable text that is never empty.
#[derive(Debug)]
pub struct Identification {
    pub candidate: Candidate,
    pub show: Option<ShowRecord>,
    pub setlist: Option<Setlist>,
    pub run: Option<RunInfo>,
    pub display_name: String,
    pub overview: String,
}

/// Identify a label end to end: parse, resolve against the catalog when a
/// client is available, enrich with run position and setlist.
///
/// Degrades rather than guesses: with no client or no catalog data the
/// result is built from the candidate alone, and below the confidence
/// threshold it is an explicit placeholder telling the user how to fix the
/// label. Transport failures and cancellation propagate; "catalog says no
/// data" never does.
pub fn identify(
    client: Option<&CatalogClient>,
    label: &str,
    context_path: Option<&str>,
    confidence_threshold: f32,
    cancel: &CancelToken,
) -> crate::catalog::Result<Identification> {
    let candidate = parser::parse(label, context_path);

    let identifiable = candidate.confidence >= confidence_threshold
        && (candidate.date.is_some() || candidate.is_special_event);
    if !identifiable {
        log::info!(
            "confidence {:.2} below threshold {confidence_threshold:.2} for '{label}'",
            candidate.confidence
        );
        return Ok(placeholder(label, candidate));
    }

    let mut show = None;
    let mut setlist = None;
    let mut run_info = None;

    if let (Some(client), Some(date)) = (client, candidate.date) {
        let shows = client.get_shows(date, cancel)?;
        show = pick_show(shows, &candidate);
        if let Some(resolved) = &show {
            run_info = Some(run::detect_run(client, resolved, date, cancel)?);
            setlist = client
                .get_setlist(date, cancel)?
                .map(|record| parse_setlist(&record.body));
        } else {
            log::info!("catalog has no show on {date}, using parsed metadata only");
        }
    }

    let display_name = build_display_name(&candidate, show.as_ref(), run_info.as_ref());
    let overview = build_overview(&candidate, show.as_ref(), setlist.as_ref());

    Ok(Identification {
        candidate,
        show,
        setlist,
        run: run_info,
        display_name,
        overview,
    })
}

/// When one date has several shows, prefer the one matching the parsed
/// venue or city; otherwise the first record stands.
fn pick_show(shows: Vec<ShowRecord>, candidate: &Candidate) -> Option<ShowRecord> {
    if shows.len() > 1 {
        let wanted_venue = candidate.venue_name.as_deref().map(str::to_lowercase);
        let wanted_city = candidate.city.as_deref().map(str::to_lowercase);
        let matched = shows.iter().position(|s| {
            let venue_hit = match (&wanted_venue, &s.venue_name) {
                (Some(w), Some(v)) => v.to_lowercase().contains(w.as_str()),
                _ => false,
            };
            let city_hit = match (&wanted_city, &s.city) {
                (Some(w), Some(c)) => c.to_lowercase() == *w,
                _ => false,
            };
            venue_hit || city_hit
        });
        if let Some(i) = matched {
            return shows.into_iter().nth(i);
        }
    }
    shows.into_iter().next()
}

fn build_display_name(
    candidate: &Candidate,
    show: Option<&ShowRecord>,
    run: Option<&RunInfo>,
) -> String {
    let mut parts: Vec<String> = vec![BAND.to_string()];

    let date = show.map(|s| s.date).or(candidate.date);
    if let Some(date) = date {
        parts.push(date.to_string());
    }

    let venue = show
        .and_then(|s| s.venue_name.clone())
        .or_else(|| candidate.venue_name.clone());
    if let Some(venue) = venue {
        parts.push(venue);
    }

    if let Some(event) = &candidate.event_type {
        parts.push(event.clone());
    }

    let mut name = parts.join(" - ");

    // Catalog-derived run position wins over a day number parsed from the
    // label; disagreement is logged, not trusted
    match run {
        Some(r) if r.is_part_of_run => {
            if let Some(parsed) = candidate.day_number {
                if parsed as usize != r.position {
                    log::info!(
                        "label says night {parsed} but catalog says night {} of {}",
                        r.position,
                        r.total_nights
                    );
                }
            }
            name.push_str(&format!(" (Night {} of {})", r.position, r.total_nights));
        }
        None if candidate.day_number.is_some() => {
            name.push_str(&format!(" (Night {})", candidate.day_number.unwrap()));
        }
        _ => {}
    }
    name
}

fn build_overview(
    candidate: &Candidate,
    show: Option<&ShowRecord>,
    setlist: Option<&Setlist>,
) -> String {
    let city = show.and_then(|s| s.city.clone()).or_else(|| candidate.city.clone());
    let state = show.and_then(|s| s.state.clone()).or_else(|| candidate.state.clone());
    let venue = show
        .and_then(|s| s.venue_name.clone())
        .or_else(|| candidate.venue_name.clone());
    let date = show.map(|s| s.date).or(candidate.date);

    let mut location = String::new();
    for piece in [venue, city, state].into_iter().flatten() {
        if !location.is_empty() {
            location.push_str(", ");
        }
        location.push_str(&piece);
    }

    let mut overview = match (date, location.is_empty()) {
        (Some(date), false) => format!("{BAND} live at {location} on {date}."),
        (Some(date), true) => format!("{BAND} live on {date}."),
        (None, false) => format!("{BAND} live at {location}."),
        (None, true) => format!("{BAND} live performance."),
    };

    if let Some(event) = &candidate.event_type {
        overview.push_str(&format!(" {event}."));
    }
    if let Some(notes) = show.and_then(|s| s.notes.as_deref()) {
        if !notes.trim().is_empty() {
            overview.push(' ');
            overview.push_str(notes.trim());
        }
    }
    if let Some(setlist) = setlist {
        if !setlist.sets.is_empty() {
            overview.push_str("\n\n");
            overview.push_str(&setlist.to_string());
        }
    }
    overview
}

/// The explicit, actionable low-confidence result. Wrong metadata is never
/// produced silently; the user is told how to fix the label instead.
fn placeholder(label: &str, candidate: Candidate) -> Identification {
    let display_name = if label.trim().is_empty() {
        format!("Unidentified {BAND} recording")
    } else {
        label.trim().to_string()
    };
    let overview = format!(
        "Could not confidently identify this recording from its file name. \
         Rename it to include the show date, for example 'ph1997-11-22' or \
         '1997-11-22 Hampton, VA', so it can be matched against the {BAND} catalog."
    );
    Identification {
        candidate,
        show: None,
        setlist: None,
        run: None,
        display_name,
        overview,
    }
}
