//! Pareto ranking over loss vectors (lower is better on every objective).

/// `a` dominates `b` iff it is no worse on every objective and strictly
/// better on at least one.
pub fn dominates(a: &[f64], b: &[f64]) -> bool {
    let mut strictly_better = false;
    for (x, y) in a.iter().zip(b) {
        if x > y {
            return false;
        }
        if x < y {
            strictly_better = true;
        }
    }
    strictly_better
}

/// Partition indices of `losses` into non-dominated fronts.
///
/// Front 0 holds the members nobody dominates. Within a front, indices
/// keep their input order.
pub fn non_dominated_sort(losses: &[Vec<f64>]) -> Vec<Vec<usize>> {
    let n = losses.len();
    let mut domination_count = vec![0usize; n];
    let mut dominated_solutions = vec![Vec::new(); n];

    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            if dominates(&losses[i], &losses[j]) {
                dominated_solutions[i].push(j);
            } else if dominates(&losses[j], &losses[i]) {
                domination_count[i] += 1;
            }
        }
    }

    let mut fronts = Vec::new();
    let mut current: Vec<usize> = (0..n).filter(|&i| domination_count[i] == 0).collect();
    while !current.is_empty() {
        let mut next = Vec::new();
        for &i in &current {
            for &j in &dominated_solutions[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    next.push(j);
                }
            }
        }
        next.sort_unstable();
        fronts.push(current);
        current = next;
    }
    fronts
}

/// Crowding distance of each member of `front`, aligned with `front`.
///
/// Members at either end of any objective's ordering get infinity, as do
/// all members of fronts with at most two entries.
pub fn crowding_distance(front: &[usize], losses: &[Vec<f64>]) -> Vec<f64> {
    let size = front.len();
    if size <= 2 {
        return vec![f64::INFINITY; size];
    }
    let objectives = losses[front[0]].len();
    let mut distance = vec![0.0; size];

    for m in 0..objectives {
        let mut order: Vec<usize> = (0..size).collect();
        order.sort_by(|&a, &b| losses[front[a]][m].total_cmp(&losses[front[b]][m]));

        let min = losses[front[order[0]]][m];
        let max = losses[front[order[size - 1]]][m];
        distance[order[0]] = f64::INFINITY;
        distance[order[size - 1]] = f64::INFINITY;

        let range = max - min;
        if range <= 0.0 {
            continue;
        }
        for k in 1..size - 1 {
            let prev = losses[front[order[k - 1]]][m];
            let next = losses[front[order[k + 1]]][m];
            distance[order[k]] += (next - prev) / range;
        }
    }
    distance
}

/// Pick `count` survivors: whole fronts in rank order, the last admitted
/// front cut by descending crowding distance. Equal distances keep
/// first-seen order.
pub fn nsga2_survivors(losses: &[Vec<f64>], count: usize) -> Vec<usize> {
    fill_by_fronts(non_dominated_sort(losses), losses, count)
}

/// Admit whole fronts in order until `count` is reached, cutting the
/// overflowing front by descending crowding distance.
pub(crate) fn fill_by_fronts(
    fronts: Vec<Vec<usize>>,
    losses: &[Vec<f64>],
    count: usize,
) -> Vec<usize> {
    let mut survivors = Vec::with_capacity(count);
    for front in fronts {
        let room = count - survivors.len();
        if room == 0 {
            break;
        }
        if front.len() <= room {
            survivors.extend(front);
            continue;
        }
        let distance = crowding_distance(&front, losses);
        let mut order: Vec<usize> = (0..front.len()).collect();
        order.sort_by(|&a, &b| distance[b].total_cmp(&distance[a]));
        survivors.extend(order.into_iter().take(room).map(|k| front[k]));
        break;
    }
    survivors
}
