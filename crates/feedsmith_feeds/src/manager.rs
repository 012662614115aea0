use feedsmith_core::{Error, Result};
use reqwest::Client;
use tracing::{error, info};

use crate::feed;
use crate::fetch;
use crate::generators::{get_generator_factories, Generator, GeneratorFactory};

/// Aggregate outcome of a run-all pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub succeeded: usize,
    pub failed: usize,
}

impl RunReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Runs feed generators sequentially. A failing source is logged and counted
/// but never blocks its siblings.
pub struct GeneratorManager {
    client: Client,
    factories: Vec<GeneratorFactory>,
}

impl GeneratorManager {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: fetch::client()?,
            factories: get_generator_factories(),
        })
    }

    /// Replaces the default registry; used by tests and embedders.
    pub fn with_factories(factories: Vec<GeneratorFactory>) -> Result<Self> {
        Ok(Self {
            client: fetch::client()?,
            factories,
        })
    }

    pub fn add_factory(&mut self, factory: GeneratorFactory) {
        self.factories.push(factory);
    }

    /// (cli name, feed title) for every registered generator.
    pub fn list(&self) -> Vec<(String, String)> {
        self.factories
            .iter()
            .map(|factory| {
                let generator = factory();
                (generator.cli_name().to_string(), generator.meta().title)
            })
            .collect()
    }

    /// Runs a single generator by cli name, propagating its failure.
    pub async fn run_source(&self, name: &str) -> Result<usize> {
        let generator = self
            .factories
            .iter()
            .map(|factory| factory())
            .find(|generator| generator.cli_name() == name)
            .ok_or_else(|| Error::Extraction(format!("No generator named: {}", name)))?;
        self.run_generator(&*generator).await
    }

    /// Runs every generator to completion, one at a time, and tallies the
    /// outcome.
    pub async fn run_all(&self) -> RunReport {
        let mut report = RunReport::default();
        info!("Found {} feed generator(s)", self.factories.len());

        for factory in &self.factories {
            let generator = factory();
            let name = generator.cli_name();
            info!("Running: {}", name);
            match self.run_generator(&*generator).await {
                Ok(count) => {
                    info!("Generated {} with {} entries", generator.meta().output_file, count);
                    report.succeeded += 1;
                }
                Err(e) => {
                    error!("Error running {}: {}", name, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Summary: {} succeeded, {} failed",
            report.succeeded, report.failed
        );
        report
    }

    async fn run_generator(&self, generator: &dyn Generator) -> Result<usize> {
        let meta = generator.meta();
        let entries = generator.collect_entries(&self.client).await?;
        feed::write_feed(&meta, &entries)?;
        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use feedsmith_core::{FeedEntry, FeedMeta};

    struct StubGenerator {
        name: &'static str,
        fail: bool,
    }

    #[async_trait]
    impl Generator for StubGenerator {
        fn meta(&self) -> FeedMeta {
            FeedMeta {
                title: format!("Stub {}", self.name),
                link: "https://example.com".to_string(),
                description: "stub".to_string(),
                language: "en".to_string(),
                output_file: format!("feed_stub_{}.xml", self.name),
            }
        }

        fn cli_name(&self) -> &'static str {
            self.name
        }

        async fn collect_entries(&self, _client: &Client) -> Result<Vec<FeedEntry>> {
            if self.fail {
                return Err(Error::Extraction("listing fetch failed".to_string()));
            }
            Ok(vec![FeedEntry {
                title: "entry".to_string(),
                link: "https://example.com/1".to_string(),
                description: String::new(),
                published_at: Utc::now(),
                guid: None,
            }])
        }
    }

    fn stub_factory(name: &'static str, fail: bool) -> GeneratorFactory {
        Box::new(move || Box::new(StubGenerator { name, fail }))
    }

    #[tokio::test]
    async fn test_run_all_survives_a_failing_source() {
        let manager = GeneratorManager::with_factories(vec![
            stub_factory("ok-one", false),
            stub_factory("broken", true),
            stub_factory("ok-two", false),
        ])
        .unwrap();

        let report = manager.run_all().await;
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert!(!report.all_succeeded());

        // Both healthy sources still wrote their files.
        assert!(std::path::Path::new("feed_stub_ok-one.xml").exists());
        assert!(std::path::Path::new("feed_stub_ok-two.xml").exists());
        let _ = std::fs::remove_file("feed_stub_ok-one.xml");
        let _ = std::fs::remove_file("feed_stub_ok-two.xml");
    }

    #[tokio::test]
    async fn test_run_source_propagates_failure() {
        let manager =
            GeneratorManager::with_factories(vec![stub_factory("broken", true)]).unwrap();
        assert!(manager.run_source("broken").await.is_err());
        assert!(manager.run_source("missing").await.is_err());
    }

    #[test]
    fn test_default_registry_lists_all_sources() {
        let manager = GeneratorManager::new().unwrap();
        let names: Vec<String> = manager.list().into_iter().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            vec!["arxiv-cs-ai", "deepmind-blog", "deepmind-publications"]
        );
    }
}
