use serde::{Deserialize, Serialize};
use std::fmt;

/// Binds one call's conversation state in the remote service
///
/// The key is `prefix + call_id`. With a fixed prefix this is injective, so
/// distinct calls never share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn derive(prefix: &str, call_id: &str) -> Self {
        let mut key = String::with_capacity(prefix.len() + call_id.len());
        key.push_str(prefix);
        key.push_str(call_id);
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
