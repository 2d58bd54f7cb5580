//! Optimization idempotence fingerprint
//!
//! A stable scalar over `(stopId : lat : lng : timeWindowStart :
//! timeWindowEnd)` concatenated in current sequence order. Equal
//! fingerprints mean optimization is a no-op.

use sha2::{Digest, Sha256};

use super::plan::OptimizerStop;

pub fn optimization_fingerprint(stops: &[OptimizerStop]) -> String {
    let mut hasher = Sha256::new();
    for stop in stops {
        hasher.update(stop.id.as_bytes());
        hasher.update(b":");
        hasher.update(format!("{:.6}", stop.position.lat).as_bytes());
        hasher.update(b":");
        hasher.update(format!("{:.6}", stop.position.lng).as_bytes());
        hasher.update(b":");
        if let Some(start) = stop.time_window_start {
            hasher.update(start.to_rfc3339().as_bytes());
        }
        hasher.update(b":");
        if let Some(end) = stop.time_window_end {
            hasher.update(end.to_rfc3339().as_bytes());
        }
        hasher.update(b"|");
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::geo::Point;
    use chrono::{TimeZone, Utc};

    fn stop(id: &str, lat: f64, lng: f64) -> OptimizerStop {
        OptimizerStop {
            id: id.to_string(),
            position: Point::new(lat, lng),
            service_minutes: 10,
            time_window_start: None,
            time_window_end: None,
            priority: 0,
        }
    }

    #[test]
    fn identical_inputs_yield_identical_fingerprints() {
        let a = vec![stop("s1", -33.45, -70.66), stop("s2", -33.46, -70.65)];
        let b = vec![stop("s1", -33.45, -70.66), stop("s2", -33.46, -70.65)];
        assert_eq!(optimization_fingerprint(&a), optimization_fingerprint(&b));
    }

    #[test]
    fn order_and_coordinates_change_the_fingerprint() {
        let a = vec![stop("s1", -33.45, -70.66), stop("s2", -33.46, -70.65)];
        let reordered = vec![stop("s2", -33.46, -70.65), stop("s1", -33.45, -70.66)];
        assert_ne!(
            optimization_fingerprint(&a),
            optimization_fingerprint(&reordered)
        );

        let moved = vec![stop("s1", -33.451, -70.66), stop("s2", -33.46, -70.65)];
        assert_ne!(optimization_fingerprint(&a), optimization_fingerprint(&moved));
    }

    #[test]
    fn time_windows_participate() {
        let mut a = vec![stop("s1", -33.45, -70.66)];
        let plain = optimization_fingerprint(&a);
        a[0].time_window_end = Some(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap());
        assert_ne!(plain, optimization_fingerprint(&a));
    }
}
