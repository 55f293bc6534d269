use std::{collections::BTreeMap, fmt};

use urlencoding::encode as url_encode;

/// Deterministic cache key for a single logical operation.
///
/// Parameters are kept sorted by name, so the order in which a caller adds
/// them never changes the key. Leave out anything that does not affect the
/// result (nonces, timestamps, refresh flags), otherwise identical requests
/// will never collapse.
///
/// ```
/// use netscope_coalesced::CacheKey;
///
/// let a = CacheKey::new("dns").param("target", "example.com").param("type", "A");
/// let b = CacheKey::new("dns").param("type", "A").param("target", "example.com");
///
/// assert_eq!(a.to_string(), b.to_string());
/// assert_eq!(a.to_string(), "dns?target=example.com&type=A");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    operation: String,
    params: BTreeMap<String, String>,
}

impl CacheKey {
    /// Start a key for the given operation name
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add a parameter, replacing any earlier value under the same name
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(name.into(), value.to_string());
        self
    }

    /// Add a parameter only if it is present
    ///
    /// An absent parameter and a parameter that was never added produce the
    /// same key.
    pub fn param_opt<T: ToString>(self, name: impl Into<String>, value: Option<T>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    /// Operation this key belongs to
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.operation)?;

        for (index, (name, value)) in self.params.iter().enumerate() {
            let separator = if index == 0 { '?' } else { '&' };
            write!(f, "{separator}{}={}", url_encode(name), url_encode(value))?;
        }

        Ok(())
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.to_string()
    }
}
