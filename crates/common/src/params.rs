//! Named parameters
//!
//! [`ParamStore`] is an ordered key/value store holding string values.
//! Typed lookups parse on access; a missing key reads as the empty string,
//! `0` or `0.0`, as does a value that does not parse.

use std::fmt;

/// Ordered key/value parameter store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamStore {
    params: Vec<(String, String)>,
}

impl ParamStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `PREFIXKEY=VALUE` arguments
    ///
    /// Arguments without the prefix are ignored. A bare `PREFIXKEY` sets an
    /// empty value. Later arguments overwrite earlier ones.
    ///
    /// ```
    /// use common::ParamStore;
    ///
    /// let params = ParamStore::from_args(["--usb-timeout=0.5", "-v"], "--usb-");
    /// assert_eq!(params.get_float("timeout"), 0.5);
    /// assert_eq!(params.len(), 1);
    /// ```
    pub fn from_args<I, S>(args: I, prefix: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut store = Self::new();
        for arg in args {
            let Some(param) = arg.as_ref().strip_prefix(prefix) else {
                continue;
            };
            let (key, value) = param.split_once('=').unwrap_or((param, ""));
            store.set(key, value);
        }
        store
    }

    /// Set `key`, keeping its position if already present
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.params.push((key, value)),
        }
    }

    pub fn set_int(&mut self, key: impl Into<String>, value: i64) {
        self.set(key, value.to_string());
    }

    pub fn set_float(&mut self, key: impl Into<String>, value: f64) {
        self.set(key, value.to_string());
    }

    /// Copy every parameter of `other` into this store
    pub fn merge(&mut self, other: &ParamStore) {
        for (key, value) in &other.params {
            self.set(key.as_str(), value.as_str());
        }
    }

    /// Raw value, `None` if the key is absent
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get_string(&self, key: &str) -> &str {
        self.get(key).unwrap_or_default()
    }

    pub fn get_int(&self, key: &str) -> i64 {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn get_float(&self, key: &str) -> f64 {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterate parameters in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for ParamStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.params {
            writeln!(f, "{} = {}", key, value)?;
        }
        Ok(())
    }
}
