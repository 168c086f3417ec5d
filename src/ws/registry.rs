//! Live connections per game
//!
//! Each connection owns a bounded outbound queue drained by its own writer
//! task. The registry only ever enqueues, so delivering to one peer never
//! waits on the other.

use std::collections::HashMap;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::protocol::ServerMsg;

/// Outbound messages buffered per connection before new ones are dropped
pub const OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// Sending half of one connection's outbound queue
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: Uuid,
    tx: mpsc::Sender<ServerMsg>,
}

impl ConnectionHandle {
    /// New handle plus the receiver its writer task drains
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ServerMsg>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }

    /// Enqueue without waiting
    pub fn deliver(&self, msg: ServerMsg) -> Result<(), DeliveryError> {
        self.tx.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("outbound queue full")]
    Full,

    #[error("connection closed")]
    Closed,
}

/// Registry of connections: game_id -> (player_id -> connection)
#[derive(Default)]
pub struct SessionRegistry {
    games: DashMap<Uuid, HashMap<Uuid, ConnectionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a connection, replacing any previous one for the same player.
    /// Returns the replaced handle.
    pub fn register(
        &self,
        game_id: Uuid,
        player_id: Uuid,
        handle: ConnectionHandle,
    ) -> Option<ConnectionHandle> {
        let previous = self.games.entry(game_id).or_default().insert(player_id, handle);
        debug!(
            game_id = %game_id,
            player_id = %player_id,
            replaced = previous.is_some(),
            "Connection registered"
        );
        previous
    }

    /// Remove a player's binding; the game entry goes away with its last one
    #[allow(dead_code)]
    pub fn unregister(&self, game_id: Uuid, player_id: Uuid) -> Option<ConnectionHandle> {
        self.remove_where(game_id, player_id, |_| true)
    }

    /// Remove the binding only if it still points at `connection_id`, so a
    /// closing connection never evicts the one that replaced it
    pub fn unregister_connection(&self, game_id: Uuid, player_id: Uuid, connection_id: Uuid) -> bool {
        self.remove_where(game_id, player_id, |h| h.id == connection_id)
            .is_some()
    }

    fn remove_where(
        &self,
        game_id: Uuid,
        player_id: Uuid,
        predicate: impl FnOnce(&ConnectionHandle) -> bool,
    ) -> Option<ConnectionHandle> {
        let Entry::Occupied(mut entry) = self.games.entry(game_id) else {
            return None;
        };

        let bound = entry.get().get(&player_id).is_some_and(predicate);
        let removed = if bound {
            entry.get_mut().remove(&player_id)
        } else {
            None
        };
        if entry.get().is_empty() {
            entry.remove();
        }

        if removed.is_some() {
            debug!(game_id = %game_id, player_id = %player_id, "Connection unregistered");
        }
        removed
    }

    /// Deliver to one player's connection. Missing connections are a no-op.
    pub fn send_to(&self, game_id: Uuid, player_id: Uuid, msg: ServerMsg) -> bool {
        let handle = self
            .games
            .get(&game_id)
            .and_then(|players| players.get(&player_id).cloned());

        match handle {
            Some(handle) => deliver_logged(game_id, player_id, &handle, msg),
            None => false,
        }
    }

    /// Deliver to every connection of a game. Each delivery is independent;
    /// returns how many succeeded.
    pub fn broadcast(&self, game_id: Uuid, msg: ServerMsg) -> usize {
        let handles: Vec<(Uuid, ConnectionHandle)> = match self.games.get(&game_id) {
            Some(players) => players.iter().map(|(p, h)| (*p, h.clone())).collect(),
            None => return 0,
        };

        handles
            .iter()
            .filter(|(player_id, handle)| deliver_logged(game_id, *player_id, handle, msg.clone()))
            .count()
    }

    #[cfg(test)]
    pub fn is_connected(&self, game_id: Uuid, player_id: Uuid) -> bool {
        self.games
            .get(&game_id)
            .is_some_and(|players| players.contains_key(&player_id))
    }

    /// Games with at least one live connection
    pub fn active_games(&self) -> usize {
        self.games.len()
    }

    pub fn connection_count(&self) -> usize {
        self.games.iter().map(|g| g.value().len()).sum()
    }
}

fn deliver_logged(game_id: Uuid, player_id: Uuid, handle: &ConnectionHandle, msg: ServerMsg) -> bool {
    match handle.deliver(msg) {
        Ok(()) => true,
        Err(e) => {
            warn!(
                game_id = %game_id,
                player_id = %player_id,
                connection_id = %handle.id,
                error = %e,
                "Dropped outbound message"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (Uuid, Uuid, Uuid) {
        (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn register_overwrites_and_send_reaches_latest() {
        let registry = SessionRegistry::new();
        let (game, player, _) = ids();
        let (first, mut first_rx) = ConnectionHandle::new(4);
        let (second, mut second_rx) = ConnectionHandle::new(4);

        assert!(registry.register(game, player, first).is_none());
        assert!(registry.register(game, player, second).is_some());
        assert_eq!(registry.connection_count(), 1);

        assert!(registry.send_to(game, player, ServerMsg::GameStarted));
        assert!(matches!(second_rx.try_recv(), Ok(ServerMsg::GameStarted)));
        assert!(first_rx.try_recv().is_err());
    }

    #[test]
    fn unregister_drops_empty_games() {
        let registry = SessionRegistry::new();
        let (game, a, b) = ids();
        let (ha, _rx_a) = ConnectionHandle::new(4);
        let (hb, _rx_b) = ConnectionHandle::new(4);
        registry.register(game, a, ha);
        registry.register(game, b, hb);

        assert!(registry.unregister(game, a).is_some());
        assert_eq!(registry.active_games(), 1);
        assert!(registry.unregister(game, b).is_some());
        assert_eq!(registry.active_games(), 0);
        assert!(registry.unregister(game, b).is_none());
    }

    #[test]
    fn stale_connection_does_not_evict_replacement() {
        let registry = SessionRegistry::new();
        let (game, player, _) = ids();
        let (old, _old_rx) = ConnectionHandle::new(4);
        let (new, _new_rx) = ConnectionHandle::new(4);
        let old_id = old.id;
        let new_id = new.id;

        registry.register(game, player, old);
        registry.register(game, player, new);

        assert!(!registry.unregister_connection(game, player, old_id));
        assert!(registry.is_connected(game, player));
        assert!(registry.unregister_connection(game, player, new_id));
        assert!(!registry.is_connected(game, player));
        assert_eq!(registry.active_games(), 0);
    }

    #[test]
    fn send_to_missing_player_is_a_noop() {
        let registry = SessionRegistry::new();
        let (game, player, _) = ids();
        assert!(!registry.send_to(game, player, ServerMsg::GameStarted));
        assert_eq!(registry.broadcast(game, ServerMsg::GameStarted), 0);
    }

    #[test]
    fn broadcast_survives_a_closed_connection() {
        let registry = SessionRegistry::new();
        let (game, a, b) = ids();
        let (ha, rx_a) = ConnectionHandle::new(4);
        let (hb, mut rx_b) = ConnectionHandle::new(4);
        registry.register(game, a, ha);
        registry.register(game, b, hb);
        drop(rx_a);

        assert_eq!(registry.broadcast(game, ServerMsg::GameStarted), 1);
        assert!(matches!(rx_b.try_recv(), Ok(ServerMsg::GameStarted)));
    }

    #[test]
    fn broadcast_survives_a_full_connection() {
        let registry = SessionRegistry::new();
        let (game, slow, fast) = ids();
        let (h_slow, _rx_slow) = ConnectionHandle::new(1);
        let (h_fast, mut rx_fast) = ConnectionHandle::new(4);
        registry.register(game, slow, h_slow);
        registry.register(game, fast, h_fast);

        assert_eq!(registry.broadcast(game, ServerMsg::GameStarted), 2);
        // slow peer never drains; its queue is now full
        assert_eq!(registry.broadcast(game, ServerMsg::GameStarted), 1);
        assert_eq!(registry.broadcast(game, ServerMsg::GameStarted), 1);

        let mut received = 0;
        while rx_fast.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 3);
    }

    #[test]
    fn concurrent_registration_is_consistent() {
        let registry = std::sync::Arc::new(SessionRegistry::new());
        let game = Uuid::new_v4();

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let player = Uuid::new_v4();
                        let (handle, _rx) = ConnectionHandle::new(1);
                        registry.register(game, player, handle);
                        registry.unregister(game, player);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(registry.connection_count(), 0);
        assert_eq!(registry.active_games(), 0);
    }
}
