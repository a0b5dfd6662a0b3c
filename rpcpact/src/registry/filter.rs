//! Include/exclude filters over named collections.

use std::collections::BTreeMap;

/// A normalized include/exclude filter.
///
/// A non-empty `include` takes precedence and `exclude` is ignored; an empty
/// filter selects everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    /// Names to select.
    pub include: Vec<String>,
    /// Names to skip when `include` is empty.
    pub exclude: Vec<String>,
}

impl Filter {
    /// Selects everything.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Selects only the given names.
    #[must_use]
    pub fn include<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: names.into_iter().map(Into::into).collect(),
            exclude: Vec::new(),
        }
    }

    /// Selects everything except the given names.
    #[must_use]
    pub fn exclude<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: Vec::new(),
            exclude: names.into_iter().map(Into::into).collect(),
        }
    }

    /// True when the filter selects everything.
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Whether `name` is selected.
    #[must_use]
    pub fn admits(&self, name: &str) -> bool {
        if !self.include.is_empty() {
            return self.include.iter().any(|n| n == name);
        }
        !self.exclude.iter().any(|n| n == name)
    }

    pub(crate) fn add_include(&mut self, name: &str) {
        if !self.include.iter().any(|n| n == name) {
            self.include.push(name.to_string());
        }
    }
}

impl From<&str> for Filter {
    fn from(name: &str) -> Self {
        Self::include([name])
    }
}

impl From<String> for Filter {
    fn from(name: String) -> Self {
        Self::include([name])
    }
}

impl From<Vec<&str>> for Filter {
    fn from(names: Vec<&str>) -> Self {
        Self::include(names)
    }
}

impl From<Vec<String>> for Filter {
    fn from(names: Vec<String>) -> Self {
        Self::include(names)
    }
}

/// How one service takes part in a collector run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceSelection {
    /// Leave the service out.
    Skip,
    /// Run every method.
    All,
    /// Run the methods selected by the filter.
    Methods(Filter),
}

impl ServiceSelection {
    /// The method filter for an included service.
    #[must_use]
    pub fn method_filter(&self) -> Filter {
        match self {
            Self::Methods(filter) => filter.clone(),
            Self::Skip | Self::All => Filter::all(),
        }
    }
}

impl From<bool> for ServiceSelection {
    fn from(on: bool) -> Self {
        if on {
            Self::All
        } else {
            Self::Skip
        }
    }
}

impl From<Filter> for ServiceSelection {
    fn from(filter: Filter) -> Self {
        Self::Methods(filter)
    }
}

impl From<&str> for ServiceSelection {
    fn from(method: &str) -> Self {
        Self::Methods(Filter::from(method))
    }
}

impl From<Vec<&str>> for ServiceSelection {
    fn from(methods: Vec<&str>) -> Self {
        Self::Methods(Filter::from(methods))
    }
}

/// Per-service selection for a collector run.
///
/// An empty filter means "use the default filter", i.e. every method that
/// currently holds declared executions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceFilter(BTreeMap<String, ServiceSelection>);

impl ServiceFilter {
    /// Creates an empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a service selection.
    #[must_use]
    pub fn with(mut self, service: impl Into<String>, selection: impl Into<ServiceSelection>) -> Self {
        self.0.insert(service.into(), selection.into());
        self
    }

    /// True when no service is named.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The selection for a service, if named.
    #[must_use]
    pub fn get(&self, service: &str) -> Option<&ServiceSelection> {
        self.0.get(service)
    }

    /// Splits into a service-level include/exclude filter.
    #[must_use]
    pub fn service_filter(&self) -> Filter {
        let mut filter = Filter::all();
        for (name, selection) in &self.0 {
            match selection {
                ServiceSelection::Skip => filter.exclude.push(name.clone()),
                _ => filter.include.push(name.clone()),
            }
        }
        filter
    }

    /// The method filter to hand to a selected service.
    #[must_use]
    pub fn method_filter(&self, service: &str) -> Filter {
        self.0
            .get(service)
            .map_or_else(Filter::all, ServiceSelection::method_filter)
    }

    pub(crate) fn include_method(&mut self, service: &str, method: &str) {
        let entry = self
            .0
            .entry(service.to_string())
            .or_insert_with(|| ServiceSelection::Methods(Filter::all()));
        match entry {
            ServiceSelection::Methods(filter) => filter.add_include(method),
            other => *other = ServiceSelection::Methods(Filter::include([method])),
        }
    }
}

impl From<&str> for ServiceFilter {
    fn from(service: &str) -> Self {
        Self::new().with(service, true)
    }
}

impl From<Vec<&str>> for ServiceFilter {
    fn from(services: Vec<&str>) -> Self {
        services
            .into_iter()
            .fold(Self::new(), |f, s| f.with(s, true))
    }
}

impl<K, V> FromIterator<(K, V)> for ServiceFilter
where
    K: Into<String>,
    V: Into<ServiceSelection>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
