//! Test doubles: a keyword-axis embedding model with load and batch counters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::provider::{EmbeddingModel, ModelLoader};

#[derive(Default)]
pub(crate) struct Counters {
    loads: AtomicUsize,
    batches: AtomicUsize,
    texts: Mutex<Vec<String>>,
}

impl Counters {
    pub(crate) fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub(crate) fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    /// Every text passed to the model, in call order.
    pub(crate) fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    pub(crate) fn embedded(&self) -> usize {
        self.texts.lock().unwrap().len()
    }
}

/// Deterministic model: one axis per keyword plus a trailing "other" axis.
///
/// A text gets weight 1.0 on every axis whose keyword it contains
/// (case-insensitive), or on the "other" axis if it contains none.
/// Exact texts can be pinned to fixed vectors with [`with_vector`](Self::with_vector).
pub(crate) struct StubModel {
    axes: Vec<String>,
    fixed: HashMap<String, Vec<f32>>,
    fail_batches: AtomicUsize,
    counters: Arc<Counters>,
}

impl StubModel {
    pub(crate) fn keywords(axes: &[&str]) -> Self {
        Self {
            axes: axes.iter().map(|a| a.to_lowercase()).collect(),
            fixed: HashMap::new(),
            fail_batches: AtomicUsize::new(0),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Pin a full (already prefixed) text to a vector.
    pub(crate) fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.fixed.insert(text.to_string(), vector);
        self
    }

    /// Fail the next `n` calls to `embed_batch`, then recover.
    pub(crate) fn failing_batches(self, n: usize) -> Self {
        self.fail_batches.store(n, Ordering::SeqCst);
        self
    }

    pub(crate) fn counters(&self) -> Arc<Counters> {
        self.counters.clone()
    }

    pub(crate) fn loader(self) -> StubLoader {
        StubLoader {
            model: Arc::new(self),
            delay: Duration::ZERO,
            fail: false,
        }
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        if let Some(v) = self.fixed.get(text) {
            return v.clone();
        }
        let lower = text.to_lowercase();
        let mut v = vec![0.0f32; self.axes.len() + 1];
        for (i, axis) in self.axes.iter().enumerate() {
            if lower.contains(axis.as_str()) {
                v[i] = 1.0;
            }
        }
        if v.iter().all(|&x| x == 0.0) {
            v[self.axes.len()] = 1.0;
        }
        v
    }
}

#[async_trait]
impl EmbeddingModel for StubModel {
    fn dim(&self) -> usize {
        self.axes.len() + 1
    }

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.counters.batches.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .fail_batches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        anyhow::ensure!(!failing, "onnx runtime: inference failed");
        self.counters
            .texts
            .lock()
            .unwrap()
            .extend(texts.iter().cloned());
        Ok(texts.iter().map(|t| self.encode(t)).collect())
    }
}

pub(crate) struct StubLoader {
    model: Arc<StubModel>,
    delay: Duration,
    fail: bool,
}

impl StubLoader {
    /// Hold every load for `delay` so concurrent callers overlap.
    pub(crate) fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl ModelLoader for StubLoader {
    async fn load(&self) -> anyhow::Result<Arc<dyn EmbeddingModel>> {
        self.model.counters.loads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        anyhow::ensure!(!self.fail, "model.onnx not found in models/stub");
        Ok(self.model.clone())
    }
}
