use std::collections::HashSet;
use std::sync::Arc;

use crate::{Cache, Geolocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalizationMethod {
    CoverageZone,
    Geo,
}

/// A cache group: caches sharing one site and geolocation.
#[derive(Debug, Clone)]
pub struct CacheLocation {
    id: String,
    geolocation: Geolocation,
    caches: Vec<Arc<Cache>>,
    backup_cache_groups: Vec<String>,
    use_closest_geo_on_backup_failure: bool,
    localization_methods: HashSet<LocalizationMethod>,
}

impl CacheLocation {
    pub fn new(id: &str, geolocation: Geolocation) -> Self {
        Self {
            id: id.to_string(),
            geolocation,
            caches: Vec::new(),
            backup_cache_groups: Vec::new(),
            use_closest_geo_on_backup_failure: true,
            localization_methods: [LocalizationMethod::CoverageZone, LocalizationMethod::Geo]
                .into_iter()
                .collect(),
        }
    }

    pub fn with_backups(mut self, groups: Vec<String>, use_closest_geo_on_failure: bool) -> Self {
        self.backup_cache_groups = groups;
        self.use_closest_geo_on_backup_failure = use_closest_geo_on_failure;
        self
    }

    /// An empty set leaves every method enabled.
    pub fn with_localization_methods(mut self, methods: HashSet<LocalizationMethod>) -> Self {
        if !methods.is_empty() {
            self.localization_methods = methods;
        }
        self
    }

    pub fn add_cache(&mut self, cache: Arc<Cache>) {
        if !self.caches.iter().any(|c| c.id() == cache.id()) {
            self.caches.push(cache);
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn geolocation(&self) -> &Geolocation {
        &self.geolocation
    }

    pub fn caches(&self) -> &[Arc<Cache>] {
        &self.caches
    }

    pub fn backup_cache_groups(&self) -> &[String] {
        &self.backup_cache_groups
    }

    pub fn use_closest_geo_on_backup_failure(&self) -> bool {
        self.use_closest_geo_on_backup_failure
    }

    pub fn is_enabled_for(&self, method: LocalizationMethod) -> bool {
        self.localization_methods.contains(&method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_cache_ignores_duplicates() {
        let mut loc = CacheLocation::new("west", Geolocation::new(37.0, -122.0).unwrap());
        loc.add_cache(Arc::new(Cache::new("edge-1", "west")));
        loc.add_cache(Arc::new(Cache::new("edge-1", "west")));
        loc.add_cache(Arc::new(Cache::new("edge-2", "west")));
        assert_eq!(loc.caches().len(), 2);
    }

    #[test]
    fn test_localization_defaults_to_all() {
        let loc = CacheLocation::new("west", Geolocation::new(0.0, 0.0).unwrap())
            .with_localization_methods(HashSet::new());
        assert!(loc.is_enabled_for(LocalizationMethod::CoverageZone));
        assert!(loc.is_enabled_for(LocalizationMethod::Geo));

        let geo_only = CacheLocation::new("east", Geolocation::new(0.0, 0.0).unwrap())
            .with_localization_methods([LocalizationMethod::Geo].into_iter().collect());
        assert!(!geo_only.is_enabled_for(LocalizationMethod::CoverageZone));
    }
}
