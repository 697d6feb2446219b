//! One in-flight operation per key; concurrent callers share its result.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::debug;

/// Deduplicates concurrent work by key.
///
/// The first caller for a key (the leader) runs the operation; everyone who
/// arrives while it is running waits for the leader's value instead of
/// starting their own. Once the leader finishes the key is free again.
///
/// If the leader is dropped mid-flight its waiters are released and one of
/// them takes over as the new leader.
#[derive(Debug)]
pub struct SingleFlight<K, V> {
    in_flight: Mutex<HashMap<K, broadcast::Sender<V>>>,
}

impl<K, V> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone + core::fmt::Display,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run<F, Fut>(&self, key: K, operation: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let sender = loop {
            let mut waiter = {
                let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
                match in_flight.get(&key) {
                    Some(sender) => sender.subscribe(),
                    None => {
                        let (sender, _) = broadcast::channel(1);
                        in_flight.insert(key.clone(), sender.clone());
                        break sender;
                    }
                }
            };
            debug!(key = %key, "joining in-flight operation");
            match waiter.recv().await {
                Ok(value) => return value,
                // Leader went away without a result; try to lead ourselves.
                Err(_) => continue,
            }
        };

        let release = Release {
            flights: self,
            key: &key,
            sender: &sender,
        };
        let value = operation().await;
        drop(release);
        let _ = sender.send(value.clone());
        value
    }

    /// Number of keys with an operation currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Frees the key when the leader finishes or is dropped.
struct Release<'a, K: Eq + Hash, V> {
    flights: &'a SingleFlight<K, V>,
    key: &'a K,
    sender: &'a broadcast::Sender<V>,
}

impl<K: Eq + Hash, V> Drop for Release<'_, K, V> {
    fn drop(&mut self) {
        let mut in_flight = self
            .flights
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if in_flight
            .get(self.key)
            .is_some_and(|current| current.same_channel(self.sender))
        {
            in_flight.remove(self.key);
        }
    }
}
