//! Standard marcada reconciliation.
//!
//! A person's attendance for a reference day is inferred from two calendar
//! days of raw scans: the last scan of the prior day from 10:00 on is taken as
//! the exit, and the first scan of the reference day before 10:00 as the entry.
//! Shifts never start after 10:00 nor end before it.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::marcada::{AttendanceRecord, AttendanceStatus, ClockEvent};

/// Hour splitting exit scans (prior day, at or after) from entry scans
/// (reference day, strictly before).
pub const SHIFT_BOUNDARY_HOUR: u32 = 10;

/// Parses a `DD/MM/YYYY HH:MM` scan timestamp as a naive local date-time.
///
/// A missing time component means midnight. Empty or malformed input yields
/// `None`, which never qualifies as an entry or exit.
pub fn parse_marcada(raw: &str) -> Option<NaiveDateTime> {
    let mut parts = raw.trim().splitn(3, '/');
    let day: u32 = parts.next()?.trim().parse().ok()?;
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let rest = parts.next()?;

    let (year, time) = match rest.split_once(' ') {
        Some((year, time)) => (year, Some(time.trim())),
        None => (rest, None),
    };
    let year: i32 = year.trim().parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let time = match time {
        Some(t) if !t.is_empty() => {
            let (h, m) = t.split_once(':')?;
            NaiveTime::from_hms_opt(h.parse().ok()?, m.parse().ok()?, 0)?
        }
        _ => NaiveTime::MIN,
    };

    Some(date.and_time(time))
}

/// Day whose late scans count as exits for `reference`.
///
/// A Sunday reference rolls back three days; every other day, Saturday
/// included, rolls back one.
pub fn prior_day(reference: NaiveDate) -> NaiveDate {
    if reference.weekday() == Weekday::Sun {
        reference - Duration::days(3)
    } else {
        reference - Duration::days(1)
    }
}

fn group_by_person(events: &[ClockEvent]) -> BTreeMap<i64, Vec<&ClockEvent>> {
    let mut grouped: BTreeMap<i64, Vec<&ClockEvent>> = BTreeMap::new();
    for event in events {
        grouped.entry(event.personal.uid).or_default().push(event);
    }
    grouped
}

/// Picks the extremal qualifying scan. `prefer(candidate, current)` returning
/// true replaces the current pick, so ties keep the first occurrence.
fn pick_scan<'a>(
    events: &[&'a ClockEvent],
    qualifies: impl Fn(&NaiveDateTime) -> bool,
    prefer: impl Fn(&NaiveDateTime, &NaiveDateTime) -> bool,
) -> Option<(&'a ClockEvent, &'a str)> {
    let mut best: Option<(&ClockEvent, &str, NaiveDateTime)> = None;

    for &event in events {
        let Some(raw) = event.marcada.as_deref().filter(|s| !s.is_empty()) else {
            continue;
        };
        let Some(at) = parse_marcada(raw).filter(|at| qualifies(at)) else {
            continue;
        };
        let replace = match &best {
            Some((_, _, current)) => prefer(&at, current),
            None => true,
        };
        if replace {
            best = Some((event, raw, at));
        }
    }

    best.map(|(event, raw, _)| (event, raw))
}

/// Reconciles two days of scans into one record per person.
///
/// Emits exactly one record for every person id present in either list,
/// ordered by person id.
pub fn reconcile(prior: &[ClockEvent], today: &[ClockEvent]) -> Vec<AttendanceRecord> {
    let prior_by_person = group_by_person(prior);
    let today_by_person = group_by_person(today);

    let uids: BTreeSet<i64> = prior_by_person
        .keys()
        .chain(today_by_person.keys())
        .copied()
        .collect();

    let mut records = Vec::with_capacity(uids.len());

    for uid in uids {
        let prior_events = prior_by_person.get(&uid).map(Vec::as_slice).unwrap_or(&[]);
        let today_events = today_by_person.get(&uid).map(Vec::as_slice).unwrap_or(&[]);

        let exit = pick_scan(
            prior_events,
            |at| at.hour() >= SHIFT_BOUNDARY_HOUR,
            |candidate, current| candidate > current,
        );
        let entry = pick_scan(
            today_events,
            |at| at.hour() < SHIFT_BOUNDARY_HOUR,
            |candidate, current| candidate < current,
        );

        let salida = exit.map(|(_, raw)| raw.to_string());

        let record = match (entry, exit) {
            (Some((base, entrada)), _) => AttendanceRecord {
                lid: base.lid,
                personal: base.personal.clone(),
                entrada: Some(entrada.to_string()),
                estado: if salida.is_some() {
                    AttendanceStatus::Presente
                } else {
                    AttendanceStatus::FaltaSalida
                },
                salida,
            },
            (None, Some((base, _))) => AttendanceRecord {
                lid: base.lid,
                personal: base.personal.clone(),
                entrada: None,
                salida,
                estado: AttendanceStatus::FaltaEntrada,
            },
            (None, None) => {
                // uid came from one of the maps, so a base always exists
                let Some(base) = prior_events.first().or_else(|| today_events.first()) else {
                    continue;
                };
                AttendanceRecord {
                    lid: base.lid,
                    personal: base.personal.clone(),
                    entrada: None,
                    salida: None,
                    estado: AttendanceStatus::Ausente,
                }
            }
        };

        records.push(record);
    }

    records
}
