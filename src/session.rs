use crate::cart::{Cart, MissingPrice};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// How long an idle session keeps its cart.
const SESSION_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

struct Entry {
    cart: Cart,
    expires_at: SystemTime,
}

/// Registry of per-session carts, keyed by an opaque session id.
///
/// The store is owned by the application state and handed to each handler, so
/// the cart is an explicitly passed handle rather than ambient global state.
/// Each operation takes the write lock, runs to completion and releases it;
/// within one session there is a single writer by construction.
pub struct SessionStore {
    policy: MissingPrice,
    duration: Duration,
    sessions: RwLock<HashMap<String, Entry>>,
}

impl SessionStore {
    pub fn new(policy: MissingPrice) -> Self {
        Self::with_duration(policy, SESSION_DURATION)
    }

    pub fn with_duration(policy: MissingPrice, duration: Duration) -> Self {
        SessionStore {
            policy,
            duration,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Mint a fresh opaque session id.
    pub fn new_session_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Run `op` against the session's cart, creating an empty cart on first
    /// access. Touching a session refreshes its expiry; expired sessions are
    /// pruned opportunistically on the way in.
    pub fn with_cart<R>(&self, session_id: &str, op: impl FnOnce(&mut Cart) -> R) -> R {
        let mut sessions = self.sessions.write().unwrap();
        let now = SystemTime::now();
        sessions.retain(|_, entry| entry.expires_at > now);

        let entry = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Entry {
                cart: Cart::new(self.policy),
                expires_at: now + self.duration,
            });
        entry.expires_at = now + self.duration;
        op(&mut entry.cart)
    }

    /// Read-only snapshot of the session's cart; an unknown or expired
    /// session reads as an empty cart.
    pub fn cart(&self, session_id: &str) -> Cart {
        let sessions = self.sessions.read().unwrap();
        match sessions.get(session_id) {
            Some(entry) if entry.expires_at > SystemTime::now() => entry.cart.clone(),
            _ => Cart::new(self.policy),
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().unwrap().len()
    }
}
