//! Location (query string) state
//!
//! The editor keeps two values in the location: the id of the will being
//! edited (`willId`) and the current wizard step (`step`). Saving replaces
//! the current entry so a reload resumes the same will; step navigation
//! pushes a new history entry.

use std::sync::RwLock;

/// Query parameter holding the id of the will being edited
pub const WILL_ID_PARAM: &str = "willId";

/// Query parameter holding the current wizard step
pub const STEP_PARAM: &str = "step";

/// Access to the current location's query parameters
pub trait Location: Send + Sync {
    /// Get a query parameter
    fn query_param(&self, key: &str) -> Option<String>;

    /// Set a query parameter in place, without adding a history entry
    fn replace_query(&self, key: &str, value: &str);

    /// Set a query parameter as a new history entry
    fn push_query(&self, key: &str, value: &str);
}

#[derive(Debug, Default)]
struct Inner {
    params: Vec<(String, String)>,
    /// Query strings of previous entries, oldest first
    history: Vec<String>,
}

impl Inner {
    fn set(&mut self, key: &str, value: &str) {
        match self.params.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.params.push((key.to_string(), value.to_string())),
        }
    }

    fn query_string(&self) -> String {
        if self.params.is_empty() {
            return String::new();
        }
        let pairs: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("?{}", pairs.join("&"))
    }
}

/// In-memory location with a history stack
///
/// Values are stored as given; no percent-encoding is applied.
#[derive(Debug, Default)]
pub struct QueryLocation {
    inner: RwLock<Inner>,
}

impl QueryLocation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string such as `?willId=abc&step=skills`
    pub fn from_query(query: &str) -> Self {
        let mut inner = Inner::default();
        for pair in query.trim_start_matches('?').split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            inner.set(key, value);
        }
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Current query string, including the leading `?` (empty if none)
    pub fn query_string(&self) -> String {
        self.read(|inner| inner.query_string())
    }

    /// Number of entries in the history, including the current one
    pub fn history_len(&self) -> usize {
        self.read(|inner| inner.history.len() + 1)
    }

    /// Go back one history entry; returns false at the first entry
    pub fn back(&self) -> bool {
        self.write(|inner| match inner.history.pop() {
            Some(previous) => {
                inner.params = Self::from_query(&previous).into_inner().params;
                true
            }
            None => false,
        })
    }

    fn into_inner(self) -> Inner {
        self.inner.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn read<T>(&self, f: impl FnOnce(&Inner) -> T) -> T {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    fn write<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}

impl Location for QueryLocation {
    fn query_param(&self, key: &str) -> Option<String> {
        self.read(|inner| {
            inner
                .params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        })
    }

    fn replace_query(&self, key: &str, value: &str) {
        self.write(|inner| inner.set(key, value));
    }

    fn push_query(&self, key: &str, value: &str) {
        self.write(|inner| {
            let current = inner.query_string();
            inner.history.push(current);
            inner.set(key, value);
        });
    }
}
