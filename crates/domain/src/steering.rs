use fancy_regex::Regex;

use crate::hash::{DefaultHashable, Hashable};
use crate::DomainError;

/// A delivery service a steering service may send clients to. The weight is
/// its number of ring positions.
#[derive(Debug, Clone)]
pub struct SteeringTarget {
    delivery_service_id: String,
    weight: usize,
    hashable: DefaultHashable,
}

impl SteeringTarget {
    pub fn new(delivery_service_id: &str, weight: usize, order: i32) -> Self {
        Self {
            delivery_service_id: delivery_service_id.to_string(),
            weight,
            hashable: DefaultHashable::generate_hashes(delivery_service_id, weight).with_order(order),
        }
    }

    pub fn delivery_service_id(&self) -> &str {
        &self.delivery_service_id
    }

    pub fn weight(&self) -> usize {
        self.weight
    }
}

impl Hashable for SteeringTarget {
    fn hash_values(&self) -> &[f64] {
        self.hashable.hash_values()
    }

    fn order(&self) -> i32 {
        self.hashable.order()
    }
}

/// Request header naming the steering target a client wants explicitly.
pub const STEERING_OPTION_HEADER: &str = "X-TC-Steering-Option";

#[derive(Debug, Clone)]
struct SteeringFilter {
    regex: Regex,
    delivery_service_id: String,
}

#[derive(Debug, Clone)]
pub struct Steering {
    delivery_service_id: String,
    targets: Vec<SteeringTarget>,
    filters: Vec<SteeringFilter>,
}

impl Steering {
    pub fn new(delivery_service_id: &str, targets: Vec<SteeringTarget>) -> Self {
        Self {
            delivery_service_id: delivery_service_id.to_string(),
            targets,
            filters: Vec::new(),
        }
    }

    /// Requests whose whole path matches `pattern` bypass hashing and go to
    /// `delivery_service_id`.
    pub fn with_filter(mut self, pattern: &str, delivery_service_id: &str) -> Result<Self, DomainError> {
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| DomainError::InvalidRegex {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        self.filters.push(SteeringFilter {
            regex,
            delivery_service_id: delivery_service_id.to_string(),
        });
        Ok(self)
    }

    pub fn delivery_service_id(&self) -> &str {
        &self.delivery_service_id
    }

    pub fn targets(&self) -> &[SteeringTarget] {
        &self.targets
    }

    pub fn has_target(&self, delivery_service_id: &str) -> bool {
        self.targets
            .iter()
            .any(|t| t.delivery_service_id == delivery_service_id)
    }

    pub fn bypass_destination(&self, path: &str) -> Option<&str> {
        self.filters
            .iter()
            .find(|f| f.regex.is_match(path).unwrap_or(false))
            .map(|f| f.delivery_service_id.as_str())
    }
}
