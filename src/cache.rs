// src/cache.rs

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct CacheEntry<V> {
    value: V,
    deadline: Instant,
}

/// Cache com TTL por entrada, injetado como dependência nos serviços
/// que memorizam leituras. As entradas expiram na leitura; não há
/// tarefa de limpeza em segundo plano.
pub struct TtlCache<V> {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().expect("cache lock envenenado");
        match entries.get(key) {
            Some(entry) if Instant::now() < entry.deadline => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        let mut entries = self.entries.lock().expect("cache lock envenenado");
        entries.insert(
            key.into(),
            CacheEntry {
                value,
                deadline: Instant::now() + self.ttl,
            },
        );
    }

    /// Gancho de invalidação pontual.
    pub fn invalidate(&self, key: &str) {
        let mut entries = self.entries.lock().expect("cache lock envenenado");
        entries.remove(key);
    }

    /// Remove todas as entradas com o prefixo dado (ex.: todas as
    /// janelas de um mesmo pacote).
    pub fn invalidate_prefix(&self, prefix: &str) {
        let mut entries = self.entries.lock().expect("cache lock envenenado");
        entries.retain(|key, _| !key.starts_with(prefix));
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock().expect("cache lock envenenado");
        entries.clear();
    }
}
