// In-memory SessionTokenStore used by default and by tests. A real
// deployment binds the same port to whatever service issues player session
// tokens.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::ports::SessionTokenStore;

pub struct InMemorySessionTokenStore {
    tokens: RwLock<HashMap<u64, String>>,
}

impl InMemorySessionTokenStore {
    pub fn new(tokens: HashMap<u64, String>) -> Self {
        Self {
            tokens: RwLock::new(tokens),
        }
    }

    pub fn empty() -> Self {
        Self::new(HashMap::new())
    }

    pub fn set_token(&self, user_id: u64, token: impl Into<String>) {
        self.tokens
            .write()
            .expect("session token store lock poisoned")
            .insert(user_id, token.into());
    }
}

#[async_trait]
impl SessionTokenStore for InMemorySessionTokenStore {
    async fn get_token(&self, user_id: u64) -> String {
        self.tokens
            .read()
            .expect("session token store lock poisoned")
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }
}
