//! Tour construction: nearest neighbor, simulated annealing, 2-opt polish
//!
//! Works on matrix indices. The tour vector contains only the movable stop
//! indices; the fixed start and fixed end are supplied separately and never
//! move.

use rand::Rng;

const INITIAL_TEMPERATURE: f64 = 10_000.0;
const COOLING_RATE: f64 = 0.995;
const MIN_TEMPERATURE: f64 = 0.1;
const ITERATIONS_PER_TEMPERATURE_PER_STOP: usize = 50;
const MAX_TWO_OPT_PASSES: usize = 1000;

/// Total metre cost of `start -> tour[0] -> ... -> tour[n-1] -> end`.
pub fn tour_cost(tour: &[usize], start: usize, end: usize, meters: &[Vec<f64>]) -> f64 {
    let mut cost = 0.0;
    let mut previous = start;
    for &idx in tour {
        cost += meters[previous][idx];
        previous = idx;
    }
    cost + meters[previous][end]
}

/// Greedy nearest-neighbor construction over `candidates`, starting from
/// `start`.
pub fn nearest_neighbor(candidates: &[usize], start: usize, meters: &[Vec<f64>]) -> Vec<usize> {
    let mut remaining: Vec<usize> = candidates.to_vec();
    let mut tour = Vec::with_capacity(remaining.len());
    let mut current = start;

    while !remaining.is_empty() {
        let (pos, _) = remaining
            .iter()
            .enumerate()
            .map(|(pos, &idx)| (pos, meters[current][idx]))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap();
        current = remaining.swap_remove(pos);
        tour.push(current);
    }

    tour
}

/// Simulated annealing refinement.
///
/// Neighbor moves: equal-probability random swap or random segment reversal.
/// Acceptance: always if the move does not worsen the tour, otherwise with
/// probability `exp(-delta / T)`.
pub fn simulated_annealing<R: Rng>(
    mut tour: Vec<usize>,
    start: usize,
    end: usize,
    meters: &[Vec<f64>],
    rng: &mut R,
) -> Vec<usize> {
    let n = tour.len();
    if n < 2 {
        return tour;
    }

    let iterations = ITERATIONS_PER_TEMPERATURE_PER_STOP * n;
    let mut current_cost = tour_cost(&tour, start, end, meters);
    let mut best = tour.clone();
    let mut best_cost = current_cost;
    let mut temperature = INITIAL_TEMPERATURE;

    while temperature > MIN_TEMPERATURE {
        for _ in 0..iterations {
            let i = rng.gen_range(0..n);
            let j = rng.gen_range(0..n);
            if i == j {
                continue;
            }
            let (lo, hi) = if i < j { (i, j) } else { (j, i) };

            let mut candidate = tour.clone();
            if rng.gen_bool(0.5) {
                candidate.swap(lo, hi);
            } else {
                candidate[lo..=hi].reverse();
            }

            let candidate_cost = tour_cost(&candidate, start, end, meters);
            let delta = candidate_cost - current_cost;

            if delta <= 0.0 || rng.gen_bool((-delta / temperature).exp().clamp(0.0, 1.0)) {
                tour = candidate;
                current_cost = candidate_cost;
                if current_cost < best_cost {
                    best = tour.clone();
                    best_cost = current_cost;
                }
            }
        }
        temperature *= COOLING_RATE;
    }

    best
}

/// Deterministic 2-opt polish: while any segment reversal strictly lowers
/// the total distance, apply the first improving move. Outer passes are
/// bounded.
pub fn two_opt(mut tour: Vec<usize>, start: usize, end: usize, meters: &[Vec<f64>]) -> Vec<usize> {
    let n = tour.len();
    if n < 2 {
        return tour;
    }

    for _ in 0..MAX_TWO_OPT_PASSES {
        let mut improved = false;
        let current_cost = tour_cost(&tour, start, end, meters);

        'scan: for i in 0..n - 1 {
            for j in i + 1..n {
                let mut candidate = tour.clone();
                candidate[i..=j].reverse();
                if tour_cost(&candidate, start, end, meters) + 1e-9 < current_cost {
                    tour = candidate;
                    improved = true;
                    break 'scan;
                }
            }
        }

        if !improved {
            break;
        }
    }

    tour
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Four points on a line: 0 (start) - 1 - 2 - 3. The optimal visit
    /// order from 0 and back is 1, 2, 3.
    fn line_matrix() -> Vec<Vec<f64>> {
        let coords: [f64; 4] = [0.0, 1.0, 2.0, 3.0];
        coords
            .iter()
            .map(|a| {
                coords
                    .iter()
                    .map(|b| (a - b).abs() * 1000.0)
                    .collect::<Vec<f64>>()
            })
            .collect()
    }

    #[test]
    fn nearest_neighbor_walks_the_line() {
        let meters = line_matrix();
        let tour = nearest_neighbor(&[1, 2, 3], 0, &meters);
        assert_eq!(tour, vec![1, 2, 3]);
    }

    #[test]
    fn two_opt_untangles_a_crossed_tour() {
        let meters = line_matrix();
        let tour = two_opt(vec![2, 1, 3], 0, 0, &meters);
        assert_eq!(tour_cost(&tour, 0, 0, &meters), 6000.0);
    }

    #[test]
    fn annealing_never_worsens_the_best_tour() {
        let meters = line_matrix();
        let mut rng = StdRng::seed_from_u64(7);
        let initial = vec![3, 1, 2];
        let initial_cost = tour_cost(&initial, 0, 0, &meters);
        let tour = simulated_annealing(initial, 0, 0, &meters, &mut rng);
        assert!(tour_cost(&tour, 0, 0, &meters) <= initial_cost);
    }
}
