use std::cmp::Ordering;

use crate::{Request, RequestMatcher};

/// A set of request matchers that must all match for a request to belong to
/// one delivery service.
#[derive(Debug, Clone)]
pub struct DeliveryServiceMatcher {
    delivery_service_id: String,
    matchers: Vec<RequestMatcher>,
    sequence: u64,
}

impl DeliveryServiceMatcher {
    /// `sequence` only separates otherwise identical matchers.
    pub fn new(delivery_service_id: &str, sequence: u64) -> Self {
        Self {
            delivery_service_id: delivery_service_id.to_string(),
            matchers: Vec::new(),
            sequence,
        }
    }

    pub fn with_match(mut self, matcher: RequestMatcher) -> Self {
        self.add_match(matcher);
        self
    }

    pub fn add_match(&mut self, matcher: RequestMatcher) {
        let at = self.matchers.partition_point(|m| m <= &matcher);
        self.matchers.insert(at, matcher);
    }

    pub fn delivery_service_id(&self) -> &str {
        &self.delivery_service_id
    }

    pub fn request_matchers(&self) -> &[RequestMatcher] {
        &self.matchers
    }

    /// An empty matcher set never matches.
    pub fn matches(&self, request: &Request) -> bool {
        !self.matchers.is_empty() && self.matchers.iter().all(|m| m.matches(request))
    }
}

impl PartialEq for DeliveryServiceMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DeliveryServiceMatcher {}

impl PartialOrd for DeliveryServiceMatcher {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Element-wise over the sorted request matchers, then longer sets first,
/// then delivery service id, then sequence.
impl Ord for DeliveryServiceMatcher {
    fn cmp(&self, other: &Self) -> Ordering {
        for (ours, theirs) in self.matchers.iter().zip(other.matchers.iter()) {
            match ours.cmp(theirs) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        other
            .matchers
            .len()
            .cmp(&self.matchers.len())
            .then_with(|| self.delivery_service_id.cmp(&other.delivery_service_id))
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HttpRequest;
    use std::collections::BTreeSet;

    fn http(host: &str, path: &str) -> Request {
        HttpRequest::new("10.0.0.1".parse().unwrap(), host, path).into()
    }

    #[test]
    fn test_all_matchers_must_match() {
        let m = DeliveryServiceMatcher::new("ds", 0)
            .with_match(RequestMatcher::host(r".*\.ds\..*").unwrap())
            .with_match(RequestMatcher::path("/live/.*").unwrap());
        assert!(m.matches(&http("ccr.ds.example.com", "/live/a.ts")));
        assert!(!m.matches(&http("ccr.ds.example.com", "/vod/a.ts")));
    }

    #[test]
    fn test_empty_never_matches() {
        assert!(!DeliveryServiceMatcher::new("ds", 0).matches(&http("h", "/")));
    }

    #[test]
    fn test_more_specific_pattern_first() {
        let general = DeliveryServiceMatcher::new("general", 0)
            .with_match(RequestMatcher::host(r".*\.abc\..*").unwrap());
        let specific = DeliveryServiceMatcher::new("specific", 1)
            .with_match(RequestMatcher::host(r".*\.abcde\..*").unwrap());
        let ordered: Vec<_> = [general, specific].into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        assert_eq!(ordered[0].delivery_service_id(), "specific");
    }

    #[test]
    fn test_more_matchers_first_on_common_prefix() {
        let host = || RequestMatcher::host("zzz").unwrap();
        let single = DeliveryServiceMatcher::new("a", 0).with_match(host());
        let double = DeliveryServiceMatcher::new("b", 1)
            .with_match(host())
            .with_match(RequestMatcher::path("/aaa/.*").unwrap());
        assert_eq!(double.request_matchers()[0].pattern(), "zzz");
        assert!(double < single);
    }

    #[test]
    fn test_identical_matchers_are_both_kept() {
        let a = DeliveryServiceMatcher::new("ds", 0).with_match(RequestMatcher::host("x").unwrap());
        let b = DeliveryServiceMatcher::new("ds", 1).with_match(RequestMatcher::host("x").unwrap());
        let set: BTreeSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
