//! Ordered registry of monitored dashboards.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A monitored site. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    /// Unique key; also the key of the site's persisted state.
    pub name: String,
    /// Dashboard URL handed to the sensor.
    pub url: String,
    /// Minimum online worker count for the site to count as healthy.
    pub expected_workers: u32,
    /// Pool client id, passed through to alert bodies.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Free-form hardware description, passed through to alert bodies.
    #[serde(default)]
    pub machine_types: Option<String>,
    /// Where to open a support ticket, passed through to alert bodies.
    #[serde(default)]
    pub support_url: Option<String>,
}

impl Site {
    /// Whether `worker_count` meets the threshold. Equality is healthy.
    pub fn is_healthy(&self, worker_count: u32) -> bool {
        worker_count >= self.expected_workers
    }

    /// How many workers are missing; zero when healthy.
    pub fn workers_down(&self, worker_count: u32) -> u32 {
        self.expected_workers.saturating_sub(worker_count)
    }
}

/// Validated, ordered collection of sites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRegistry {
    sites: Vec<Site>,
}

impl SiteRegistry {
    /// Validate and wrap a list of sites, preserving their order.
    pub fn new(sites: Vec<Site>) -> Result<Self, ConfigError> {
        if sites.is_empty() {
            return Err(ConfigError::NoSites);
        }

        let mut seen = HashSet::new();
        for site in &sites {
            if site.name.trim().is_empty() {
                return Err(ConfigError::EmptySiteName);
            }
            if !seen.insert(site.name.as_str()) {
                return Err(ConfigError::DuplicateSite(site.name.clone()));
            }
            if site.expected_workers == 0 {
                return Err(ConfigError::ZeroExpectedWorkers(site.name.clone()));
            }
            if site.url.trim().is_empty() {
                return Err(ConfigError::MissingUrl(site.name.clone()));
            }
        }

        Ok(Self { sites })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Site> {
        self.sites.iter()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Look up a site by name.
    pub fn get(&self, name: &str) -> Option<&Site> {
        self.sites.iter().find(|s| s.name == name)
    }

    /// The only site, when the registry holds exactly one.
    pub fn single(&self) -> Option<&Site> {
        match self.sites.as_slice() {
            [site] => Some(site),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(name: &str, expected: u32) -> Site {
        Site {
            name: name.to_string(),
            url: format!("http://{name}.example/watcher"),
            expected_workers: expected,
            client_id: None,
            machine_types: None,
            support_url: None,
        }
    }

    #[test]
    fn healthy_threshold_is_inclusive() {
        let s = site("a", 57);
        assert!(s.is_healthy(57));
        assert!(s.is_healthy(60));
        assert!(!s.is_healthy(56));
        assert_eq!(s.workers_down(50), 7);
        assert_eq!(s.workers_down(60), 0);
    }

    #[test]
    fn registry_preserves_order() {
        let reg = SiteRegistry::new(vec![site("b", 1), site("a", 2)]).unwrap();
        let names: Vec<_> = reg.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(reg.get("a").map(|s| s.expected_workers), Some(2));
        assert!(reg.single().is_none());
    }

    #[test]
    fn registry_rejects_empty() {
        assert!(matches!(SiteRegistry::new(vec![]), Err(ConfigError::NoSites)));
    }

    #[test]
    fn registry_rejects_duplicates() {
        let err = SiteRegistry::new(vec![site("a", 1), site("a", 2)]).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateSite(name) if name == "a"));
    }

    #[test]
    fn registry_rejects_zero_expected() {
        let err = SiteRegistry::new(vec![site("a", 0)]).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroExpectedWorkers(_)));
    }

    #[test]
    fn registry_rejects_blank_name_and_url() {
        let err = SiteRegistry::new(vec![site(" ", 1)]).unwrap_err();
        assert!(matches!(err, ConfigError::EmptySiteName));

        let mut s = site("a", 1);
        s.url = String::new();
        let err = SiteRegistry::new(vec![s]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingUrl(_)));
    }

    #[test]
    fn single_site_registry() {
        let reg = SiteRegistry::new(vec![site("only", 3)]).unwrap();
        assert_eq!(reg.single().map(|s| s.name.as_str()), Some("only"));
        assert_eq!(reg.len(), 1);
    }
}
