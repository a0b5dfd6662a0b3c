//! Named, filterable collection with fan-out execution.

use futures::future::join_all;
use std::collections::BTreeMap;
use std::future::Future;

use super::Filter;
use crate::errors::PactError;

/// A name-keyed collection whose members can be run together.
#[derive(Debug)]
pub struct Picker<T> {
    items: BTreeMap<String, T>,
}

impl<T> Default for Picker<T> {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }
}

impl<T> Picker<T> {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a member.
    pub fn insert(&mut self, name: impl Into<String>, item: T) {
        self.items.insert(name.into(), item);
    }

    /// Looks up a member.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&T> {
        self.items.get(name)
    }

    /// Whether a member exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    /// Member names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    /// Iterates over members.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Members selected by `filter`.
    #[must_use]
    pub fn pick(&self, filter: &Filter) -> Vec<(&str, &T)> {
        self.iter().filter(|(name, _)| filter.admits(name)).collect()
    }

    /// Runs `f` on every selected member concurrently.
    ///
    /// All runs settle before this returns. If any failed, the first failure
    /// in name order is returned; siblings are never cancelled.
    pub async fn exec<'a, F, Fut, R>(
        &'a self,
        filter: &Filter,
        f: F,
    ) -> Result<BTreeMap<String, R>, PactError>
    where
        F: Fn(&'a str, &'a T) -> Fut,
        Fut: Future<Output = Result<R, PactError>>,
    {
        let f = &f;
        let runs = self
            .pick(filter)
            .into_iter()
            .map(|(name, item)| async move { (name, f(name, item).await) });

        let mut results = BTreeMap::new();
        let mut first_error = None;
        for (name, outcome) in join_all(runs).await {
            match outcome {
                Ok(value) => {
                    results.insert(name.to_string(), value);
                }
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(results),
        }
    }
}
