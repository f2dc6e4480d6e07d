use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::hash_function::Md5HashFunction;
use super::hashable::Hashable;
use crate::delivery_service::Dispersion;

/// Ring distance used as a map key, ordered with `f64::total_cmp`.
#[derive(Debug, Clone, Copy)]
struct HashKey(f64);

impl PartialEq for HashKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HashKey {}

impl PartialOrd for HashKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HashKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy)]
enum Nudge {
    Up,
    Down,
}

impl Nudge {
    fn step(self, value: f64) -> Option<f64> {
        match self {
            Nudge::Up => next_up(value),
            Nudge::Down => next_up(-value).map(|v| -v),
        }
    }
}

/// Next representable value towards +inf; `None` once the next step would
/// leave the finite range.
fn next_up(value: f64) -> Option<f64> {
    if value.is_nan() || value.is_infinite() {
        return None;
    }
    if value == 0.0 {
        return Some(f64::from_bits(1));
    }
    let bits = value.to_bits();
    let next = if value > 0.0 {
        f64::from_bits(bits + 1)
    } else {
        f64::from_bits(bits - 1)
    };
    next.is_finite().then_some(next)
}

type Ranking<'a, T> = BTreeMap<HashKey, Vec<&'a T>>;

/// Places `item` at `key`, stepping one ulp at a time in `direction` past
/// occupied keys. If stepping runs out of range the item shares the bucket at
/// `key`, so a candidate is never lost.
fn insert_nudged<'a, T>(ranking: &mut Ranking<'a, T>, key: f64, item: &'a T, direction: Nudge) {
    let mut candidate = key;
    loop {
        if !ranking.contains_key(&HashKey(candidate)) {
            ranking.insert(HashKey(candidate), vec![item]);
            return;
        }
        match direction.step(candidate) {
            Some(next) => candidate = next,
            None => break,
        }
    }
    ranking.entry(HashKey(key)).or_default().push(item);
}

fn rank<'a, T: Hashable>(candidates: &'a [T], request_key: &str) -> Ranking<'a, T> {
    let hash = Md5HashFunction::hash(request_key);
    let mut ranking: Ranking<'a, T> = BTreeMap::new();
    let mut unhashed: Vec<&'a T> = Vec::new();

    for candidate in candidates {
        match candidate.closest_hash(hash) {
            Some(closest) => insert_nudged(&mut ranking, (hash - closest).abs(), candidate, Nudge::Up),
            None => unhashed.push(candidate),
        }
    }

    unhashed.sort_by_key(|c| c.order());
    let split = unhashed.partition_point(|c| c.order() < 0);
    let (negative, non_negative) = unhashed.split_at(split);

    // Walked from the highest negative order down so the lowest ends up first.
    for candidate in negative.iter().rev() {
        let key = match ranking.first_key_value() {
            Some((min, _)) => Nudge::Down.step(min.0).unwrap_or(min.0),
            None => 0.0,
        };
        insert_nudged(&mut ranking, key, *candidate, Nudge::Down);
    }
    for candidate in non_negative {
        let key = match ranking.last_key_value() {
            Some((max, _)) => Nudge::Up.step(max.0).unwrap_or(max.0),
            None => 0.0,
        };
        insert_nudged(&mut ranking, key, *candidate, Nudge::Up);
    }

    ranking
}

/// Orders `candidates` by ring distance to `request_key` and returns at most
/// `dispersion.limit` of them (all of them without a dispersion).
pub fn select_hashables<'a, T: Hashable>(
    candidates: &'a [T],
    dispersion: Option<&Dispersion>,
    request_key: &str,
) -> Vec<&'a T> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let ordered = rank(candidates, request_key).into_values().flatten();

    match dispersion {
        None => ordered.collect(),
        Some(dispersion) => {
            let mut selected: Vec<&'a T> = ordered.take(dispersion.limit()).collect();
            if dispersion.is_shuffled() {
                fastrand::shuffle(&mut selected);
            }
            selected
        }
    }
}

pub fn select_hashable<'a, T: Hashable>(
    candidates: &'a [T],
    dispersion: Option<&Dispersion>,
    request_key: &str,
) -> Option<&'a T> {
    select_hashables(candidates, dispersion, request_key)
        .into_iter()
        .next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::DefaultHashable;

    #[derive(Debug, PartialEq)]
    struct Node {
        name: &'static str,
        inner: DefaultHashable,
    }

    impl Node {
        fn weighted(name: &'static str, count: usize) -> Self {
            Self {
                name,
                inner: DefaultHashable::generate_hashes(name, count),
            }
        }

        fn ordered(name: &'static str, order: i32) -> Self {
            Self {
                name,
                inner: DefaultHashable::generate_hashes(name, 0).with_order(order),
            }
        }
    }

    impl Hashable for Node {
        fn hash_values(&self) -> &[f64] {
            self.inner.hash_values()
        }

        fn order(&self) -> i32 {
            self.inner.order()
        }
    }

    fn names(nodes: &[&Node]) -> Vec<&'static str> {
        nodes.iter().map(|n| n.name).collect()
    }

    #[test]
    fn test_next_up_steps_one_ulp() {
        let v = 1.0_f64;
        assert_eq!(next_up(v), Some(f64::from_bits(v.to_bits() + 1)));
        assert_eq!(Nudge::Down.step(v), Some(f64::from_bits(v.to_bits() - 1)));
        assert_eq!(next_up(f64::MAX), None);
        assert_eq!(next_up(f64::INFINITY), None);
        assert_eq!(next_up(-0.0), Some(f64::from_bits(1)));
    }

    #[test]
    fn test_empty_candidates() {
        let empty: Vec<Node> = Vec::new();
        assert!(select_hashables(&empty, None, "key").is_empty());
        assert!(select_hashable(&empty, None, "key").is_none());
    }

    #[test]
    fn test_selection_is_deterministic() {
        let nodes: Vec<Node> = ["a", "b", "c", "d"].iter().map(|n| Node::weighted(n, 100)).collect();
        let first = names(&select_hashables(&nodes, None, "/some/path"));
        for _ in 0..20 {
            assert_eq!(names(&select_hashables(&nodes, None, "/some/path")), first);
        }
    }

    #[test]
    fn test_ranking_contains_every_candidate() {
        let nodes: Vec<Node> = vec![
            Node::weighted("a", 10),
            Node::ordered("z1", 5),
            Node::weighted("b", 10),
            Node::ordered("z2", -2),
            Node::ordered("z3", -7),
            Node::ordered("z4", 1),
        ];
        let ranked = names(&select_hashables(&nodes, None, "key"));
        assert_eq!(ranked.len(), nodes.len());
        assert_eq!(&ranked[..2], &["z3", "z2"]);
        assert_eq!(&ranked[4..], &["z4", "z1"]);
    }

    #[test]
    fn test_only_zero_weight_candidates() {
        let nodes = vec![Node::ordered("x", 3), Node::ordered("y", -1), Node::ordered("w", 0)];
        assert_eq!(names(&select_hashables(&nodes, None, "k")), vec!["y", "w", "x"]);
    }

    #[test]
    fn test_identical_positions_are_all_kept() {
        // Same hash id means identical ring positions and colliding distances.
        let nodes: Vec<Node> = (0..50).map(|_| Node::weighted("same", 20)).collect();
        assert_eq!(select_hashables(&nodes, None, "collide").len(), 50);
    }

    #[test]
    fn test_collision_fallback_keeps_item() {
        let a = 1;
        let b = 2;
        let c = 3;
        let mut ranking: Ranking<'_, i32> = BTreeMap::new();
        insert_nudged(&mut ranking, f64::MAX, &a, Nudge::Up);
        insert_nudged(&mut ranking, f64::MAX, &b, Nudge::Up);
        insert_nudged(&mut ranking, f64::MAX, &c, Nudge::Down);
        let all: Vec<i32> = ranking.into_values().flatten().copied().collect();
        assert_eq!(all.len(), 3);
        assert!(all.contains(&1) && all.contains(&2) && all.contains(&3));
    }

    #[test]
    fn test_random_populations_never_drop_candidates() {
        let mut rng = fastrand::Rng::with_seed(7);
        let pool = ["a", "b", "c", "d", "e", "f", "g"];
        for round in 0..200 {
            let nodes: Vec<Node> = (0..rng.usize(1..12))
                .map(|_| {
                    let name = pool[rng.usize(..pool.len())];
                    if rng.bool() {
                        Node::weighted(name, rng.usize(0..5))
                    } else {
                        Node::ordered(name, rng.i32(-3..3))
                    }
                })
                .collect();
            let key = format!("request-{round}");
            assert_eq!(select_hashables(&nodes, None, &key).len(), nodes.len());
        }
    }

    #[test]
    fn test_dispersion_limits_result() {
        let nodes: Vec<Node> = ["a", "b", "c", "d"].iter().map(|n| Node::weighted(n, 100)).collect();
        let full = names(&select_hashables(&nodes, None, "/path"));

        let limited = Dispersion::new(2, false);
        assert_eq!(names(&select_hashables(&nodes, Some(&limited), "/path")), full[..2].to_vec());

        let shuffled = Dispersion::new(2, true);
        let mut picked = names(&select_hashables(&nodes, Some(&shuffled), "/path"));
        picked.sort();
        let mut expected = full[..2].to_vec();
        expected.sort();
        assert_eq!(picked, expected);
    }

    #[test]
    fn test_select_hashable_matches_head() {
        let nodes: Vec<Node> = ["a", "b", "c"].iter().map(|n| Node::weighted(n, 100)).collect();
        let head = select_hashables(&nodes, None, "/x")[0].name;
        let single = Dispersion::new(1, true);
        assert_eq!(select_hashable(&nodes, Some(&single), "/x").map(|n| n.name), Some(head));
    }
}
