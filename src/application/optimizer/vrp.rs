//! Greedy insertion planner for routes with time windows or priorities
//!
//! Walks the route one stop at a time, scoring every unvisited candidate
//! from the current position and picking the cheapest. Waiting ahead of a
//! window is cheap, lateness is expensive, priority and urgent windows pull
//! stops forward.

use chrono::{DateTime, Duration, Utc};

use super::plan::OptimizerStop;
use super::provider::TravelMatrix;

const WAIT_WEIGHT: f64 = 0.5;
const LATENESS_WEIGHT: f64 = 10.0;
const PRIORITY_WEIGHT: f64 = 20.0;
const URGENCY_BONUS: f64 = 20.0;
const URGENCY_HORIZON_MIN: f64 = 60.0;
const EARLY_SLOT_PRIORITY_WEIGHT: f64 = 15.0;
const EARLY_SLOT_COUNT: usize = 3;

/// One scheduled visit, by stop index into the input slice.
#[derive(Debug, Clone)]
pub struct ScheduledVisit {
    pub stop_index: usize,
    pub arrival: DateTime<Utc>,
    pub departure: DateTime<Utc>,
    pub wait_minutes: f64,
    pub late_by_minutes: f64,
    pub travel_minutes: f64,
    pub distance_meters: f64,
}

#[derive(Debug, Clone)]
pub struct VrpOutcome {
    pub visits: Vec<ScheduledVisit>,
    pub unserviceable: Vec<usize>,
    pub warnings: Vec<String>,
}

fn minutes_f64(d: Duration) -> f64 {
    d.num_milliseconds() as f64 / 60_000.0
}

fn duration_from_minutes(minutes: f64) -> Duration {
    Duration::milliseconds((minutes * 60_000.0).round() as i64)
}

/// Matrix index convention: 0 is the origin, stop `i` is at `i + 1`.
///
/// `pinned_first` is served before any scoring happens; `pinned_last` is
/// held back until it is the only stop left.
pub fn solve_time_windows(
    stops: &[OptimizerStop],
    matrix: &TravelMatrix,
    shift_start: DateTime<Utc>,
    shift_end: Option<DateTime<Utc>>,
    pinned_first: Option<usize>,
    pinned_last: Option<usize>,
) -> VrpOutcome {
    let mut unvisited: Vec<usize> = (0..stops.len()).collect();
    let mut visits: Vec<ScheduledVisit> = Vec::with_capacity(stops.len());
    let mut warnings = Vec::new();

    let mut current_position = 0usize; // matrix index of the origin
    let mut current_time = shift_start;

    while !unvisited.is_empty() {
        // A pinned first stop skips scoring entirely.
        if visits.is_empty() {
            if let Some(first) = pinned_first {
                if unvisited.contains(&first) {
                    let (visit, departure) =
                        schedule_visit(first, &stops[first], matrix, current_position, current_time);
                    if visit.late_by_minutes > 0.0 {
                        warnings.push(format!(
                            "Stop {} is scheduled {:.0} min past its time window",
                            stops[first].id, visit.late_by_minutes
                        ));
                    }
                    current_position = first + 1;
                    current_time = departure;
                    visits.push(visit);
                    unvisited.retain(|&idx| idx != first);
                    continue;
                }
            }
        }

        let hold_last = pinned_last.filter(|_| unvisited.len() > 1);
        let mut best: Option<(usize, f64, &OptimizerStop)> = None;

        for &candidate in &unvisited {
            if Some(candidate) == hold_last {
                continue;
            }
            let stop = &stops[candidate];
            let travel = matrix.minutes[current_position][candidate + 1];
            if !travel.is_finite() {
                continue;
            }

            let arrival = current_time + duration_from_minutes(travel);

            let wait = match stop.time_window_start {
                Some(start) if start > arrival => minutes_f64(start - arrival),
                _ => 0.0,
            };
            let service_start = arrival + duration_from_minutes(wait);

            let late_by = match stop.time_window_end {
                Some(end) if service_start > end => minutes_f64(service_start - end),
                _ => 0.0,
            };

            // A candidate whose service could not even begin inside the
            // driver shift is not reachable on this route.
            if let Some(end_of_shift) = shift_end {
                if service_start > end_of_shift {
                    continue;
                }
            }

            let mut score = travel + WAIT_WEIGHT * wait + LATENESS_WEIGHT * late_by
                - PRIORITY_WEIGHT * f64::from(stop.priority);

            if let Some(window_end) = stop.time_window_end {
                if minutes_f64(window_end - current_time) < URGENCY_HORIZON_MIN {
                    score -= URGENCY_BONUS;
                }
            }

            if visits.len() < EARLY_SLOT_COUNT {
                score -= EARLY_SLOT_PRIORITY_WEIGHT * f64::from(stop.priority);
            }

            let better = match &best {
                None => true,
                Some((best_idx, best_score, best_stop)) => {
                    if (score - best_score).abs() > 1e-9 {
                        score < *best_score
                    } else {
                        // Tie-break: earlier window end, then lower id.
                        let candidate_end = stop.time_window_end;
                        let best_end = best_stop.time_window_end;
                        match (candidate_end, best_end) {
                            (Some(c), Some(b)) if c != b => c < b,
                            (Some(_), None) => true,
                            (None, Some(_)) => false,
                            _ => stop.id < stops[*best_idx].id,
                        }
                    }
                }
            };

            if better {
                best = Some((candidate, score, stop));
            }
        }

        let Some((chosen, _, stop)) = best else {
            // Nothing reachable from here: everything left is unserviceable.
            warnings.push(format!(
                "{} stop(s) could not be scheduled inside the driver shift",
                unvisited.len()
            ));
            return VrpOutcome {
                visits,
                unserviceable: unvisited,
                warnings,
            };
        };

        let (visit, departure) =
            schedule_visit(chosen, stop, matrix, current_position, current_time);

        if visit.late_by_minutes > 0.0 {
            warnings.push(format!(
                "Stop {} is scheduled {:.0} min past its time window",
                stop.id, visit.late_by_minutes
            ));
        }

        visits.push(visit);
        unvisited.retain(|&idx| idx != chosen);
        current_position = chosen + 1;
        current_time = departure;
    }

    VrpOutcome {
        visits,
        unserviceable: Vec::new(),
        warnings,
    }
}

/// Compute the scheduled visit for one stop from the current position.
fn schedule_visit(
    index: usize,
    stop: &OptimizerStop,
    matrix: &TravelMatrix,
    current_position: usize,
    current_time: DateTime<Utc>,
) -> (ScheduledVisit, DateTime<Utc>) {
    let travel = matrix.minutes[current_position][index + 1];
    let distance = matrix.meters[current_position][index + 1];
    let arrival = current_time + duration_from_minutes(travel);
    let wait = match stop.time_window_start {
        Some(start) if start > arrival => minutes_f64(start - arrival),
        _ => 0.0,
    };
    let service_start = arrival + duration_from_minutes(wait);
    let late_by = match stop.time_window_end {
        Some(end) if service_start > end => minutes_f64(service_start - end),
        _ => 0.0,
    };
    let departure = service_start + Duration::minutes(i64::from(stop.service_minutes));

    (
        ScheduledVisit {
            stop_index: index,
            arrival,
            departure,
            wait_minutes: wait,
            late_by_minutes: late_by,
            travel_minutes: travel,
            distance_meters: distance,
        },
        departure,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::geo::Point;
    use chrono::TimeZone;

    fn matrix(n: usize, minutes: f64) -> TravelMatrix {
        let mut m = vec![vec![minutes; n]; n];
        for (i, row) in m.iter_mut().enumerate() {
            row[i] = 0.0;
        }
        TravelMatrix {
            meters: m.iter().map(|r| r.iter().map(|v| v * 500.0).collect()).collect(),
            minutes: m,
        }
    }

    fn stop(id: &str, priority: i32) -> OptimizerStop {
        OptimizerStop {
            id: id.to_string(),
            position: Point::new(-33.45, -70.66),
            service_minutes: 5,
            time_window_start: None,
            time_window_end: None,
            priority,
        }
    }

    #[test]
    fn priority_pulls_a_stop_forward() {
        let stops = vec![stop("a", 0), stop("b", 2)];
        let m = matrix(3, 10.0);
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let outcome = solve_time_windows(&stops, &m, start, None, None, None);
        assert_eq!(outcome.visits[0].stop_index, 1, "priority stop goes first");
        assert!(outcome.unserviceable.is_empty());
    }

    #[test]
    fn waiting_for_a_window_is_recorded() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let mut s = stop("a", 0);
        s.time_window_start = Some(start + Duration::minutes(30));
        let stops = vec![s];
        let m = matrix(2, 10.0);
        let outcome = solve_time_windows(&stops, &m, start, None, None, None);
        let visit = &outcome.visits[0];
        assert!((visit.wait_minutes - 20.0).abs() < 1e-6);
        assert_eq!(visit.departure, start + Duration::minutes(35));
    }

    #[test]
    fn lateness_is_scored_and_warned() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let mut a = stop("a", 0);
        a.time_window_end = Some(start + Duration::minutes(5));
        let stops = vec![a];
        let m = matrix(2, 10.0);
        let outcome = solve_time_windows(&stops, &m, start, None, None, None);
        assert!((outcome.visits[0].late_by_minutes - 5.0).abs() < 1e-6);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn unreachable_stops_are_reported() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let stops = vec![stop("a", 0), stop("b", 0)];
        let m = matrix(3, 45.0);
        // Shift ends before even the first candidate can be served.
        let outcome = solve_time_windows(&stops, &m, start, Some(start + Duration::minutes(30)), None, None);
        assert!(outcome.visits.is_empty());
        assert_eq!(outcome.unserviceable.len(), 2);
        assert!(!outcome.warnings.is_empty());
    }

    #[test]
    fn pinned_stops_bracket_the_tour() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let stops = vec![stop("a", 0), stop("b", 5), stop("c", 0)];
        let m = matrix(4, 10.0);
        // "b" has overwhelming priority but is pinned last; "c" is pinned
        // first despite no priority at all.
        let outcome = solve_time_windows(&stops, &m, start, None, Some(2), Some(1));
        let order: Vec<usize> = outcome.visits.iter().map(|v| v.stop_index).collect();
        assert_eq!(order, vec![2, 0, 1]);
    }

    #[test]
    fn tie_break_prefers_earlier_window_end() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let mut a = stop("a", 0);
        a.time_window_end = Some(start + Duration::minutes(240));
        let mut b = stop("b", 0);
        b.time_window_end = Some(start + Duration::minutes(180));
        let m = matrix(3, 10.0);
        let outcome = solve_time_windows(&[a, b], &m, start, None, None, None);
        assert_eq!(outcome.visits[0].stop_index, 1);
    }
}
