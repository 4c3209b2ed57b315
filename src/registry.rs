//! Provider registration table
//!
//! Built once at startup and passed to whatever needs to look providers up.

use std::sync::Arc;

use crate::error::{Result, ScrapeError};
use crate::fetch::Fetch;
use crate::providers::{Ave, Heyzo, MovieProvider};

pub type BuildFn = fn(Arc<dyn Fetch>) -> Result<Box<dyn MovieProvider>>;

/// Named constructor for one provider.
#[derive(Debug, Clone, Copy)]
pub struct ProviderFactory {
    pub name: &'static str,
    pub priority: i32,
    pub build: BuildFn,
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    factories: Vec<ProviderFactory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every provider shipped with this crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(ProviderFactory {
            name: Ave::NAME,
            priority: Ave::PRIORITY,
            build: |fetcher| Ok(Box::new(Ave::new(fetcher)?)),
        });
        registry.register(ProviderFactory {
            name: Heyzo::NAME,
            priority: Heyzo::PRIORITY,
            build: |fetcher| Ok(Box::new(Heyzo::new(fetcher)?)),
        });
        registry
    }

    /// Add `factory`, replacing any factory registered under the same name.
    pub fn register(&mut self, factory: ProviderFactory) {
        self.factories
            .retain(|f| !f.name.eq_ignore_ascii_case(factory.name));
        self.factories.push(factory);
        self.factories.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Factories, highest priority first
    pub fn factories(&self) -> &[ProviderFactory] {
        &self.factories
    }

    pub fn get(&self, name: &str) -> Option<&ProviderFactory> {
        self.factories
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Build the provider registered as `name` (case-insensitive).
    pub fn create(&self, name: &str, fetcher: Arc<dyn Fetch>) -> Result<Box<dyn MovieProvider>> {
        let factory = self
            .get(name)
            .ok_or_else(|| ScrapeError::UnknownProvider(name.to_string()))?;
        (factory.build)(fetcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MemoryFetcher;

    #[test]
    fn test_builtin_ordered_by_priority() {
        let registry = Registry::builtin();
        let names: Vec<_> = registry.factories().iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["HEYZO", "AVE"]);
    }

    #[test]
    fn test_create_case_insensitive() {
        let registry = Registry::builtin();
        let provider = registry
            .create("heyzo", Arc::new(MemoryFetcher::new()))
            .unwrap();
        assert_eq!(provider.name(), "HEYZO");
        assert_eq!(provider.priority(), 1000);

        let provider = registry.create("Ave", Arc::new(MemoryFetcher::new())).unwrap();
        assert!(provider.supports_search());
    }

    #[test]
    fn test_unknown_provider() {
        let err = Registry::builtin()
            .create("nope", Arc::new(MemoryFetcher::new()))
            .err()
            .unwrap();
        assert!(matches!(err, ScrapeError::UnknownProvider(name) if name == "nope"));
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = Registry::builtin();
        registry.register(ProviderFactory {
            name: "ave",
            priority: 2000,
            build: |fetcher| Ok(Box::new(Ave::new(fetcher)?)),
        });

        assert_eq!(registry.factories().len(), 2);
        assert_eq!(registry.factories()[0].priority, 2000);
    }
}
