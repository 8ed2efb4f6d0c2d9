//! Test doubles and common utilities for reconciler contract tests
//!
//! This module provides minimal test doubles that count store calls and can
//! be told to fail, so the contract tests can verify exactly which remote
//! calls an operation makes.

#![allow(dead_code)]

use akc_core::error::{Error, Result};
use akc_core::traits::{ConfigStore, ConfigStoreFactory, KeyValue};
use akc_core::{KeyValueReconciler, MemoryConfigStore, ReconcilerConfig};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ENDPOINT: &str = "https://cfg.example.com";

/// Which store method a failure is injected into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Get,
    Set,
    Delete,
}

/// Shared counters and switches for every client a factory hands out
#[derive(Default)]
pub struct Probe {
    pub connects: AtomicUsize,
    pub gets: AtomicUsize,
    pub sets: AtomicUsize,
    pub deletes: AtomicUsize,
    pub fail_connect: AtomicBool,
    pub failing: Mutex<Vec<Op>>,
    pub delay: Mutex<Option<Duration>>,
    pub endpoints: Mutex<Vec<String>>,
}

impl Probe {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Make every later call of `op` fail
    pub fn fail(&self, op: Op) {
        self.failing.lock().unwrap().push(op);
    }

    /// Make every later store call sleep first
    pub fn slow_down(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.endpoints.lock().unwrap().clone()
    }

    fn check(&self, op: Op) -> Result<()> {
        if self.failing.lock().unwrap().contains(&op) {
            return Err(Error::provider("counting", format!("{:?} unavailable", op)));
        }
        Ok(())
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

/// A ConfigStore that counts calls and delegates to a memory store
pub struct CountingConfigStore {
    probe: Arc<Probe>,
    inner: MemoryConfigStore,
}

#[async_trait::async_trait]
impl ConfigStore for CountingConfigStore {
    async fn get_key_value(&self, label: &str, key: &str) -> Result<Option<KeyValue>> {
        self.probe.gets.fetch_add(1, Ordering::SeqCst);
        self.probe.pause().await;
        self.probe.check(Op::Get)?;
        self.inner.get_key_value(label, key).await
    }

    async fn set_key_value(&self, label: &str, key: &str, value: &str) -> Result<KeyValue> {
        self.probe.sets.fetch_add(1, Ordering::SeqCst);
        self.probe.pause().await;
        self.probe.check(Op::Set)?;
        self.inner.set_key_value(label, key, value).await
    }

    async fn delete_key_value(&self, label: &str, key: &str) -> Result<Option<KeyValue>> {
        self.probe.deletes.fetch_add(1, Ordering::SeqCst);
        self.probe.pause().await;
        self.probe.check(Op::Delete)?;
        self.inner.delete_key_value(label, key).await
    }

    fn store_name(&self) -> &'static str {
        "counting"
    }
}

/// A factory whose clients all share one memory store and one probe
pub struct CountingStoreFactory {
    pub probe: Arc<Probe>,
    pub store: MemoryConfigStore,
}

impl CountingStoreFactory {
    pub fn new() -> Self {
        Self {
            probe: Arc::new(Probe::default()),
            store: MemoryConfigStore::new(),
        }
    }
}

impl ConfigStoreFactory for CountingStoreFactory {
    fn connect(&self, endpoint: &str) -> Result<Box<dyn ConfigStore>> {
        self.probe.connects.fetch_add(1, Ordering::SeqCst);
        self.probe.endpoints.lock().unwrap().push(endpoint.to_string());

        if self.probe.fail_connect.load(Ordering::SeqCst) {
            return Err(Error::client_construction(endpoint, "no credentials"));
        }

        Ok(Box::new(CountingConfigStore {
            probe: Arc::clone(&self.probe),
            inner: self.store.clone(),
        }))
    }
}

/// Build a reconciler over a fresh counting factory
pub fn counting_reconciler(config: ReconcilerConfig) -> (KeyValueReconciler, Arc<Probe>, MemoryConfigStore) {
    let factory = CountingStoreFactory::new();
    let probe = Arc::clone(&factory.probe);
    let store = factory.store.clone();
    (KeyValueReconciler::new(Arc::new(factory), config), probe, store)
}

/// Reconciler config with the operation timeout disabled
pub fn no_timeout() -> ReconcilerConfig {
    ReconcilerConfig {
        operation_timeout_secs: 0,
    }
}
