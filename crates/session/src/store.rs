use tokio::sync::RwLock;

use backoffice_auth::Credential;

/// Holder of the current credential for one session context.
///
/// Read by many, written only after a sign-in or a refresh. Refresh results
/// go through [`CredentialStore::replace_if_current`] so they never clobber a
/// newer generation written in the meantime.
#[derive(Debug, Default)]
pub struct CredentialStore {
    current: RwLock<Option<Credential>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Option<Credential> {
        self.current.read().await.clone()
    }

    pub async fn is_present(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Store `credential`, returning the previous one.
    pub async fn replace(&self, credential: Credential) -> Option<Credential> {
        self.current.write().await.replace(credential)
    }

    /// Store `next` only if the store still holds the generation of `read`.
    pub async fn replace_if_current(&self, read: &Credential, next: Credential) -> bool {
        let mut current = self.current.write().await;
        match current.as_ref() {
            Some(held) if held.same_generation(read) => {
                *current = Some(next);
                true
            }
            _ => false,
        }
    }

    /// Drop the credential only if it is still the generation of `read`.
    pub async fn clear_if_current(&self, read: &Credential) -> bool {
        let mut current = self.current.write().await;
        match current.as_ref() {
            Some(held) if held.same_generation(read) => {
                *current = None;
                true
            }
            _ => false,
        }
    }

    pub async fn clear(&self) -> Option<Credential> {
        self.current.write().await.take()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::testing::credential;

    #[tokio::test]
    async fn replace_and_clear() {
        let store = CredentialStore::new();
        assert!(!store.is_present().await);

        let c = credential(Utc::now(), 60);
        assert!(store.replace(c.clone()).await.is_none());
        assert_eq!(store.snapshot().await, Some(c.clone()));

        assert_eq!(store.clear().await, Some(c));
        assert!(store.snapshot().await.is_none());
    }

    #[tokio::test]
    async fn conditional_writes_respect_newer_generations() {
        let store = CredentialStore::new();
        let old = credential(Utc::now(), 60);
        store.replace(old.clone()).await;

        let newer = backoffice_auth::Credential::issue(
            "A9",
            None,
            old.principal().clone(),
            Utc::now(),
            chrono::Duration::seconds(60),
        )
        .unwrap();
        store.replace(newer.clone()).await;

        assert!(!store.replace_if_current(&old, old.clone()).await);
        assert!(!store.clear_if_current(&old).await);
        assert_eq!(store.snapshot().await, Some(newer.clone()));

        assert!(store.clear_if_current(&newer).await);
        assert!(!store.is_present().await);
    }
}
