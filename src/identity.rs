use crate::storage::{Storage, StorageError};

/// Query parameters that may carry the learner identity, highest priority first.
pub const IDENTITY_PARAMS: [&str; 6] = [
    "userId",
    "user_id",
    "id",
    "uid",
    "custom_user_id",
    "lis_person_name_full",
];

const LAST_USER_KEY_PREFIX: &str = "linguistics_lab_last_user_";

/// Identity carried by a URL query string such as `userId=alice&course=3`.
/// A bare value without `=` is taken as the identity itself.
pub fn identity_from_query(query: &str) -> Option<String> {
    let query = query.trim().trim_start_matches('?');
    if query.is_empty() {
        return None;
    }
    if !query.contains('=') {
        return Some(query.to_string());
    }

    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    IDENTITY_PARAMS.iter().find_map(|name| {
        pairs
            .iter()
            .find(|(key, value)| key == name && !value.trim().is_empty())
            .map(|(_, value)| value.trim().to_string())
    })
}

/// Remembers the last identity seen on one client (a chat).
pub struct LastUser<'a> {
    storage: &'a dyn Storage,
    key: String,
}

impl<'a> LastUser<'a> {
    pub fn new(storage: &'a dyn Storage, client: &str) -> Self {
        Self {
            storage,
            key: format!("{}{}", LAST_USER_KEY_PREFIX, client),
        }
    }

    pub fn get(&self) -> Option<String> {
        match self.storage.read(&self.key) {
            Ok(value) => value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()),
            Err(e) => {
                log::error!("Failed to read {}: {}", self.key, e);
                None
            }
        }
    }

    pub fn set(&self, identity: &str) -> Result<(), StorageError> {
        self.storage.write(&self.key, identity)
    }
}

/// Query parameter first, then the client's last identity. `None` puts the
/// client into "access required" mode.
pub fn resolve_identity(query: Option<&str>, last_user: &LastUser) -> Option<String> {
    if let Some(identity) = query.and_then(identity_from_query) {
        if let Err(e) = last_user.set(&identity) {
            log::error!("Failed to remember last user {}: {}", identity, e);
        }
        return Some(identity);
    }
    last_user.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn accepted_names_are_checked_in_priority_order() {
        assert_eq!(
            identity_from_query("uid=low&userId=high").as_deref(),
            Some("high")
        );
        assert_eq!(identity_from_query("?user_id=%20Ada%20").as_deref(), Some("Ada"));
        assert_eq!(
            identity_from_query("lis_person_name_full=Ada+Lovelace").as_deref(),
            Some("Ada Lovelace")
        );
    }

    #[test]
    fn blank_or_unknown_params_resolve_nothing() {
        assert_eq!(identity_from_query(""), None);
        assert_eq!(identity_from_query("userId=&course=3"), None);
        assert_eq!(identity_from_query("name=Ada"), None);
    }

    #[test]
    fn bare_payload_is_the_identity() {
        assert_eq!(identity_from_query(" ada ").as_deref(), Some("ada"));
    }

    #[test]
    fn query_wins_and_is_remembered() {
        let store = MemoryStore::new();
        let last = LastUser::new(&store, "42");
        last.set("Bea").unwrap();

        assert_eq!(resolve_identity(Some("userId=Ada"), &last).as_deref(), Some("Ada"));
        assert_eq!(last.get().as_deref(), Some("Ada"));
    }

    #[test]
    fn falls_back_to_last_user_per_client() {
        let store = MemoryStore::new();
        LastUser::new(&store, "42").set("Ada").unwrap();

        assert_eq!(
            resolve_identity(None, &LastUser::new(&store, "42")).as_deref(),
            Some("Ada")
        );
        assert_eq!(resolve_identity(Some(""), &LastUser::new(&store, "7")), None);
    }
}
