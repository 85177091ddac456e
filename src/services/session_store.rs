// Session Store
// Session ids issued by a successful login; a session cookie only
// authenticates when its value is one of these.

use std::collections::HashSet;
use std::sync::RwLock;

use subtle::ConstantTimeEq;

#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashSet<String>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue and remember a new session id
    pub fn issue(&self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        match self.sessions.write() {
            Ok(mut sessions) => {
                sessions.insert(id.clone());
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(id.clone());
            }
        }
        id
    }

    /// Constant-time membership check. Every stored id is compared so the
    /// timing does not depend on which one matched.
    pub fn is_valid(&self, provided: &str) -> bool {
        if provided.is_empty() {
            return false;
        }
        let sessions = match self.sessions.read() {
            Ok(sessions) => sessions,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions.iter().fold(false, |found, id| {
            let matched: bool = id.as_bytes().ct_eq(provided.as_bytes()).into();
            found | matched
        })
    }

    pub fn revoke(&self, id: &str) {
        match self.sessions.write() {
            Ok(mut sessions) => {
                sessions.remove(id);
            }
            Err(poisoned) => {
                poisoned.into_inner().remove(id);
            }
        }
    }
}
