//! Game records on the portal landing page.
//!
//! Thin CRUD over the keyed store's `games/` collection. Creating a game
//! requires a signed-in session; the landing page renders the collection via
//! the store's live [`watch`](store::KeyedStore::watch) subscription.

use serde::{Deserialize, Serialize};
use store::{KeyedStore, StoreError};
use tokio::sync::watch;

use crate::clock::Clock;
use crate::models::{local_part, AuthSession};

const GAMES_NAMESPACE: &str = "games";

/// A game entry as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameRecord {
    pub name: String,
    pub created_at: i64,
    pub players: u32,
    pub status: String,
    pub created_by: GameCreator,
}

/// Who created a game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameCreator {
    pub uid: String,
    pub email: String,
    pub display_name: String,
}

/// Errors from game operations.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// Creating a game requires a signed-in session.
    #[error("not authenticated")]
    NotAuthenticated,
    /// Game names cannot be empty or whitespace.
    #[error("game name is empty")]
    EmptyName,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Game collection access over a [`KeyedStore`].
pub struct Games<S: KeyedStore, C: Clock> {
    store: S,
    clock: C,
}

impl<S: KeyedStore, C: Clock> Games<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// Create a game record. The caller must hold a session.
    pub async fn create(
        &self,
        session: Option<&AuthSession>,
        name: &str,
    ) -> Result<String, GameError> {
        let session = session.ok_or(GameError::NotAuthenticated)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(GameError::EmptyName);
        }

        let record = GameRecord {
            name: name.to_string(),
            created_at: self.clock.now_ms(),
            players: 1,
            status: "waiting".to_string(),
            created_by: GameCreator {
                uid: session.uid.clone(),
                email: session.email.clone(),
                display_name: local_part(&session.email).to_string(),
            },
        };
        let key = format!("{}/{}", GAMES_NAMESPACE, uuid::Uuid::new_v4());
        self.store
            .write(&key, serde_json::to_value(&record).map_err(StoreError::from)?)
            .await?;
        Ok(key)
    }

    /// Snapshot of all games.
    pub async fn list(&self) -> Result<Vec<(String, GameRecord)>, GameError> {
        let raw = self.store.list(&format!("{}/", GAMES_NAMESPACE)).await?;
        let mut games = Vec::with_capacity(raw.len());
        for (key, value) in raw {
            games.push((key, serde_json::from_value(value).map_err(StoreError::from)?));
        }
        Ok(games)
    }

    /// Live subscription to the game collection.
    pub fn watch(&self) -> watch::Receiver<Vec<(String, serde_json::Value)>> {
        self.store.watch(&format!("{}/", GAMES_NAMESPACE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use store::MemoryStore;

    fn session() -> AuthSession {
        AuthSession {
            uid: "u1".into(),
            email: "player@nexus.gg".into(),
            display_name: None,
        }
    }

    #[tokio::test]
    async fn test_create_requires_session_and_name() {
        let games = Games::new(MemoryStore::new(), SystemClock);

        assert!(matches!(
            games.create(None, "Arena").await,
            Err(GameError::NotAuthenticated)
        ));
        assert!(matches!(
            games.create(Some(&session()), "   ").await,
            Err(GameError::EmptyName)
        ));
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let games = Games::new(MemoryStore::new(), SystemClock);
        let key = games.create(Some(&session()), " Arena ").await.unwrap();
        assert!(key.starts_with("games/"));

        let listed = games.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        let (listed_key, record) = &listed[0];
        assert_eq!(listed_key, &key);
        assert_eq!(record.name, "Arena");
        assert_eq!(record.players, 1);
        assert_eq!(record.status, "waiting");
        assert_eq!(record.created_by.display_name, "player");
    }

    #[tokio::test]
    async fn test_watch_sees_new_games() {
        let games = Games::new(MemoryStore::new(), SystemClock);
        let mut rx = games.watch();
        assert!(rx.borrow().is_empty());

        games.create(Some(&session()), "Arena").await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 1);
    }
}
