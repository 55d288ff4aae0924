//! Fixed-capacity pool of connection slots.
//!
//! Slot ids double as player identities (0 = ninja, 1-6 = samurai), so the
//! pool never grows: an accept with no free slot is refused. The pool is
//! the sole owner of session lifetime; the dispatcher requests closure
//! through it instead of touching sockets.

use shared::{NetError, Session, PLAYER_COUNT};

/// Number of connection slots: one per player role.
pub const MAX_SLOTS: usize = PLAYER_COUNT;

/// Slot table mapping id -> session. `None` marks a FREE slot; a freed
/// slot is immediately eligible for reuse.
pub struct SlotPool {
    slots: Vec<Option<Session>>,
}

impl SlotPool {
    pub fn new() -> Self {
        Self {
            slots: (0..MAX_SLOTS).map(|_| None).collect(),
        }
    }

    /// Lowest FREE slot id, if any.
    pub fn free_slot(&self) -> Option<u8> {
        self.slots
            .iter()
            .position(Option::is_none)
            .map(|index| index as u8)
    }

    pub fn is_full(&self) -> bool {
        self.free_slot().is_none()
    }

    /// Claims the lowest free slot for `session`. Lowest-free-wins keeps
    /// reassigned ids stable across churn.
    pub fn claim(&mut self, session: Session) -> Result<u8, NetError> {
        let id = self.free_slot().ok_or(NetError::CapacityExceeded)?;
        self.slots[id as usize] = Some(session);
        Ok(id)
    }

    /// Frees a slot, handing the session back for the caller to stop.
    pub fn release(&mut self, id: u8) -> Option<Session> {
        self.slots.get_mut(id as usize).and_then(Option::take)
    }

    pub fn get(&self, id: u8) -> Option<&Session> {
        self.slots.get(id as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: u8) -> Option<&mut Session> {
        self.slots.get_mut(id as usize).and_then(Option::as_mut)
    }

    /// Ids of every CLAIMED slot, in slot order.
    pub fn claimed_ids(&self) -> Vec<u8> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| index as u8)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empties the pool, used on server shutdown.
    pub fn drain_all(&mut self) -> Vec<(u8, Session)> {
        let mut sessions = Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(session) = slot.take() {
                sessions.push((index as u8, session));
            }
        }
        sessions
    }
}

impl Default for SlotPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::{TcpListener, TcpStream};

    async fn test_session() -> Session {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connect = TcpStream::connect(addr);
        let accept = async { listener.accept().await.unwrap().0 };
        let (_held, stream) = tokio::join!(accept, connect);
        Session::new(stream.unwrap())
    }

    #[tokio::test]
    async fn claims_lowest_free_slot() {
        let mut pool = SlotPool::new();
        assert_eq!(pool.claim(test_session().await).unwrap(), 0);
        assert_eq!(pool.claim(test_session().await).unwrap(), 1);
        assert_eq!(pool.claim(test_session().await).unwrap(), 2);
        assert_eq!(pool.claimed_ids(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn released_slot_is_reused_first() {
        let mut pool = SlotPool::new();
        for _ in 0..4 {
            pool.claim(test_session().await).unwrap();
        }

        assert!(pool.release(1).is_some());
        assert_eq!(pool.free_slot(), Some(1));
        assert_eq!(pool.claim(test_session().await).unwrap(), 1);
    }

    #[tokio::test]
    async fn refuses_when_full() {
        let mut pool = SlotPool::new();
        for index in 0..MAX_SLOTS {
            assert_eq!(pool.claim(test_session().await).unwrap(), index as u8);
        }
        assert!(pool.is_full());
        assert!(matches!(
            pool.claim(test_session().await),
            Err(NetError::CapacityExceeded)
        ));
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let mut pool = SlotPool::new();
        pool.claim(test_session().await).unwrap();
        assert!(pool.release(0).is_some());
        assert!(pool.release(0).is_none());
        assert!(pool.release(42).is_none());
    }
}
