use std::sync::Arc;

use super::hash_function::Md5HashFunction;
use super::number_searcher;

/// Something that owns points on the hash ring.
///
/// Entities without points are still selectable; they are ranked by
/// [`Hashable::order`] instead of by distance.
pub trait Hashable {
    /// Ring positions, ascending and de-duplicated.
    fn hash_values(&self) -> &[f64];

    fn order(&self) -> i32 {
        0
    }

    fn has_hashes(&self) -> bool {
        !self.hash_values().is_empty()
    }

    fn closest_hash(&self, target: f64) -> Option<f64> {
        number_searcher::closest(self.hash_values(), target)
    }
}

impl<T: Hashable + ?Sized> Hashable for Arc<T> {
    fn hash_values(&self) -> &[f64] {
        (**self).hash_values()
    }

    fn order(&self) -> i32 {
        (**self).order()
    }
}

impl<T: Hashable + ?Sized> Hashable for &T {
    fn hash_values(&self) -> &[f64] {
        (**self).hash_values()
    }

    fn order(&self) -> i32 {
        (**self).order()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultHashable {
    hashes: Vec<f64>,
    order: i32,
}

impl DefaultHashable {
    /// Positions are `MD5(hash_id + "--" + i)` for `i` in `0..hash_count`.
    pub fn generate_hashes(hash_id: &str, hash_count: usize) -> Self {
        let mut hashes: Vec<f64> = (0..hash_count)
            .map(|i| Md5HashFunction::hash(&format!("{hash_id}--{i}")))
            .collect();
        hashes.sort_by(f64::total_cmp);
        hashes.dedup();
        Self { hashes, order: 0 }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

impl Hashable for DefaultHashable {
    fn hash_values(&self) -> &[f64] {
        &self.hashes
    }

    fn order(&self) -> i32 {
        self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_deterministic() {
        let a = DefaultHashable::generate_hashes("cache-01", 100);
        let b = DefaultHashable::generate_hashes("cache-01", 100);
        assert_eq!(a, b);
        assert_eq!(a.hash_values().len(), 100);
    }

    #[test]
    fn test_positions_sorted() {
        let h = DefaultHashable::generate_hashes("cache-01", 50);
        assert!(h.hash_values().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_first_position() {
        let h = DefaultHashable::generate_hashes("cache-01", 1);
        assert_eq!(h.hash_values(), &[2.9910622959496387e38]);
    }

    #[test]
    fn test_zero_count_has_no_positions() {
        let h = DefaultHashable::generate_hashes("cache-01", 0).with_order(-3);
        assert!(!h.has_hashes());
        assert_eq!(h.closest_hash(1.0), None);
        assert_eq!(h.order(), -3);
    }

    #[test]
    fn test_weight_growth_keeps_old_positions() {
        let small = DefaultHashable::generate_hashes("edge", 50);
        let large = DefaultHashable::generate_hashes("edge", 200);
        for h in small.hash_values() {
            assert!(large.hash_values().contains(h));
        }
    }
}
