use chrono::{Duration, NaiveDate};

use crate::catalog::models::ShowRecord;
use crate::catalog::{CancelToken, CatalogClient, CatalogError};

/// How far around the show date to look for run siblings, in days.
pub const RUN_WINDOW_DAYS: i64 = 7;

/// Where a show sits within a consecutive-night run at one venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInfo {
    pub is_part_of_run: bool,
    /// 1-based night number within the run.
    pub position: usize,
    pub total_nights: usize,
    pub dates: Vec<NaiveDate>,
}

impl RunInfo {
    /// A standalone show. Not an error state.
    pub fn single(date: NaiveDate) -> Self {
        Self {
            is_part_of_run: false,
            position: 1,
            total_nights: 1,
            dates: vec![date],
        }
    }
}

/// Partition dates into maximal runs of strictly-consecutive calendar days.
/// Input order doesn't matter; duplicates collapse. A gap of more than one
/// day starts a new run, so runs never overlap.
pub fn partition_runs(dates: &[NaiveDate]) -> Vec<Vec<NaiveDate>> {
    let mut sorted = dates.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut runs: Vec<Vec<NaiveDate>> = Vec::new();
    let mut current: Vec<NaiveDate> = Vec::new();

    for date in sorted {
        match current.last() {
            Some(&prev) if (date - prev).num_days() == 1 => current.push(date),
            Some(_) => {
                runs.push(std::mem::take(&mut current));
                current.push(date);
            }
            None => current.push(date),
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Determine whether `show` on `date` is part of a multi-night run at its
/// venue, and which night it is.
///
/// Best-effort enrichment: every data failure is downgraded to "no run"
/// rather than surfaced, so callers never lose primary metadata to a flaky
/// lookup. Cancellation is the one error that propagates.
pub fn detect_run(
    client: &CatalogClient,
    show: &ShowRecord,
    date: NaiveDate,
    cancel: &CancelToken,
) -> Result<RunInfo, CatalogError> {
    // Shows without a venue id never group
    let Some(venue_id) = show.venue_id else {
        return Ok(RunInfo::single(date));
    };

    let start = date - Duration::days(RUN_WINDOW_DAYS);
    let end = date + Duration::days(RUN_WINDOW_DAYS);
    let nearby = match client.get_shows_range(start, end, cancel) {
        Ok(shows) => shows,
        Err(CatalogError::Cancelled) => return Err(CatalogError::Cancelled),
        Err(e) => {
            log::warn!("run detection for {date} degraded to no-run: {e}");
            return Ok(RunInfo::single(date));
        }
    };

    let mut dates: Vec<NaiveDate> = nearby
        .iter()
        .filter(|s| s.venue_id == Some(venue_id))
        .map(|s| s.date)
        .collect();
    // The subject date counts even when the window query missed it
    dates.push(date);

    let run = partition_runs(&dates)
        .into_iter()
        .find(|r| r.contains(&date))
        .unwrap_or_else(|| vec![date]);

    let position = run.iter().position(|&d| d == date).map_or(1, |i| i + 1);
    Ok(RunInfo {
        is_part_of_run: run.len() > 1,
        position,
        total_nights: run.len(),
        dates: run,
    })
}
