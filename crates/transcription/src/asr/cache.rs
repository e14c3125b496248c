use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::info;

use super::{ModelLoader, RecognitionModel};

type ModelSlot = Arc<OnceCell<Arc<dyn RecognitionModel>>>;

/// Process-wide cache of loaded recognition models, keyed by model name.
///
/// Entries are never evicted. Concurrent first requests for the same name
/// wait on a single load; reads of a populated slot take no lock. A failed
/// load leaves the slot empty so the next request retries.
pub struct ModelCache {
    loader: Arc<dyn ModelLoader>,
    models: DashMap<String, ModelSlot>,
}

impl ModelCache {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        info!(backend = %loader.backend(), "Model cache created");
        Self {
            loader,
            models: DashMap::new(),
        }
    }

    pub async fn get_or_load(&self, model_name: &str) -> anyhow::Result<Arc<dyn RecognitionModel>> {
        let slot: ModelSlot = self
            .models
            .entry(model_name.to_string())
            .or_default()
            .clone();

        let model = slot
            .get_or_try_init(|| async {
                let loader = Arc::clone(&self.loader);
                let name = model_name.to_string();
                info!(model = %name, backend = %loader.backend(), "Loading recognition model");
                tokio::task::spawn_blocking(move || loader.load(&name))
                    .await
                    .map_err(|e| anyhow::anyhow!("Model load task join error: {}", e))?
            })
            .await?;

        Ok(Arc::clone(model))
    }

    pub fn is_loaded(&self, model_name: &str) -> bool {
        self.models
            .get(model_name)
            .is_some_and(|slot| slot.initialized())
    }

    /// Names of every model loaded so far.
    pub fn loaded_models(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .models
            .iter()
            .filter(|entry| entry.value().initialized())
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn backend(&self) -> &str {
        self.loader.backend()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModelLoader;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_loads_run_once() {
        let loader = Arc::new(ScriptedModelLoader::default().with_load_delay_ms(50));
        let cache = Arc::new(ModelCache::new(loader.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move { cache.get_or_load("small").await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().name(), "small");
        }

        assert_eq!(loader.load_count(), 1);
        assert!(cache.is_loaded("small"));
        assert!(!cache.is_loaded("large"));
    }

    #[tokio::test]
    async fn failed_load_is_retried() {
        let loader = Arc::new(ScriptedModelLoader::default().failing_model("broken"));
        let cache = ModelCache::new(loader.clone());

        assert!(cache.get_or_load("broken").await.is_err());
        assert!(cache.get_or_load("broken").await.is_err());
        assert_eq!(loader.load_count(), 2);
        assert!(cache.loaded_models().is_empty());

        cache.get_or_load("base").await.unwrap();
        cache.get_or_load("base").await.unwrap();
        assert_eq!(loader.load_count(), 3);
        assert_eq!(cache.loaded_models(), vec!["base"]);
    }
}
