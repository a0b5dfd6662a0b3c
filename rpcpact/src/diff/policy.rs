//! Assertion policy applied when replay results are verified.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::DiffEvent;
use crate::contract::Exchange;
use crate::errors::VerificationError;

/// Serializable part of the assertion policy.
///
/// Every field is optional so policies from different sources can be layered;
/// see [`AssertOpts::merged`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertOpts {
    /// Forgive observed keys the declaration does not mention.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim_uncovered: Option<bool>,
    /// Turn the first difference into a verification failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_assertion_on: Option<bool>,
    /// Error fields compared when a call fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_fields: Option<Vec<String>>,
}

impl AssertOpts {
    /// Creates an empty policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `trimUncovered`.
    #[must_use]
    pub fn with_trim_uncovered(mut self, trim: bool) -> Self {
        self.trim_uncovered = Some(trim);
        self
    }

    /// Sets `defaultAssertionOn`.
    #[must_use]
    pub fn with_default_assertion_on(mut self, on: bool) -> Self {
        self.default_assertion_on = Some(on);
        self
    }

    /// Sets `errorFields`.
    #[must_use]
    pub fn with_error_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.error_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Fills `trimUncovered` with its default, as done for policies read from
    /// a contract document.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.trim_uncovered.get_or_insert(true);
        self
    }

    /// Layers `over` on top of `self`; fields set in `over` win.
    #[must_use]
    pub fn merged(&self, over: &Self) -> Self {
        Self {
            trim_uncovered: over.trim_uncovered.or(self.trim_uncovered),
            default_assertion_on: over.default_assertion_on.or(self.default_assertion_on),
            error_fields: over
                .error_fields
                .clone()
                .or_else(|| self.error_fields.clone()),
        }
    }

    /// Resolved `trimUncovered` (default `true`).
    #[must_use]
    pub fn trim_uncovered(&self) -> bool {
        self.trim_uncovered.unwrap_or(true)
    }

    /// Resolved `defaultAssertionOn` (default `false`).
    #[must_use]
    pub fn default_assertion_on(&self) -> bool {
        self.default_assertion_on.unwrap_or(false)
    }

    /// Configured error fields, empty when unset.
    #[must_use]
    pub fn error_fields(&self) -> &[String] {
        self.error_fields.as_deref().unwrap_or(&[])
    }
}

/// Receives every difference found during verification.
pub type DiffHook = Arc<dyn Fn(&DiffEvent) + Send + Sync>;

/// Custom check over `(declared, observed)` exchanges.
pub type AssertionHook = Arc<dyn Fn(&Exchange, &Exchange) -> Result<(), String> + Send + Sync>;

/// Runtime callbacks of the assertion policy.
#[derive(Clone, Default)]
pub struct AssertHooks {
    /// Difference sink; when set, differences never fail verification.
    pub on_diff: Option<DiffHook>,
    /// Custom assertion run after diffing.
    pub assertion: Option<AssertionHook>,
}

impl AssertHooks {
    /// Layers `over` on top of `self`.
    #[must_use]
    pub fn merged(&self, over: &Self) -> Self {
        Self {
            on_diff: over.on_diff.clone().or_else(|| self.on_diff.clone()),
            assertion: over.assertion.clone().or_else(|| self.assertion.clone()),
        }
    }
}

impl std::fmt::Debug for AssertHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssertHooks")
            .field("on_diff", &self.on_diff.is_some())
            .field("assertion", &self.assertion.is_some())
            .finish()
    }
}

/// Full assertion policy: options plus hooks.
#[derive(Debug, Clone, Default)]
pub struct AssertPolicy {
    /// Serializable options.
    pub opts: AssertOpts,
    /// Runtime hooks.
    pub hooks: AssertHooks,
}

impl AssertPolicy {
    /// Creates an empty policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the difference hook.
    #[must_use]
    pub fn with_on_diff<F>(mut self, f: F) -> Self
    where
        F: Fn(&DiffEvent) + Send + Sync + 'static,
    {
        self.hooks.on_diff = Some(Arc::new(f));
        self
    }

    /// Sets the custom assertion hook.
    #[must_use]
    pub fn with_assertion<F>(mut self, f: F) -> Self
    where
        F: Fn(&Exchange, &Exchange) -> Result<(), String> + Send + Sync + 'static,
    {
        self.hooks.assertion = Some(Arc::new(f));
        self
    }

    /// Layers `over` on top of `self`; anything set in `over` wins.
    #[must_use]
    pub fn merged(&self, over: &Self) -> Self {
        Self {
            opts: self.opts.merged(&over.opts),
            hooks: self.hooks.merged(&over.hooks),
        }
    }

    /// Routes differences found for one execution.
    ///
    /// A difference hook receives everything. Without one, the first
    /// difference fails verification when `defaultAssertionOn` is set.
    pub fn report(&self, events: Vec<DiffEvent>) -> Result<(), VerificationError> {
        for event in &events {
            tracing::debug!(
                url = %event.url,
                path = %event.path,
                missed_key_on = ?event.missed_key_on,
                "Contract difference"
            );
        }

        if let Some(ref hook) = self.hooks.on_diff {
            events.iter().for_each(|e| hook(e));
            return Ok(());
        }

        if self.opts.default_assertion_on() {
            if let Some(first) = events.into_iter().next() {
                return Err(first.into_verification_error());
            }
        }
        Ok(())
    }
}

impl From<AssertOpts> for AssertPolicy {
    fn from(opts: AssertOpts) -> Self {
        Self {
            opts,
            hooks: AssertHooks::default(),
        }
    }
}
