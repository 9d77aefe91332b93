#![forbid(unsafe_code)]

//! Binding options: key filter and value selector.

use std::fmt;
use std::rc::Rc;

use tether_store::Store;

/// Options for binding a store.
///
/// The type-changing builder keeps the selector's output type in `R`:
///
/// ```
/// use tether_bind::BindOptions;
/// use tether_store::MapStore;
///
/// let _options: BindOptions<MapStore<&str, u32>, u32> = BindOptions::new()
///     .keys(["hits"])
///     .selector(|value| value.get("hits").copied().unwrap_or(0));
/// ```
///
/// `keys` elements are the store's own key type, so a non-empty filter for
/// an unkeyed store is unrepresentable.
pub struct BindOptions<S: Store, R = <S as Store>::Value> {
    pub(crate) keys: Option<Vec<S::Key>>,
    pub(crate) selector: Rc<dyn Fn(&S::Value) -> R>,
}

impl<S: Store> BindOptions<S> {
    /// No key filter, identity selector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            keys: None,
            selector: Rc::new(|value: &S::Value| value.clone()),
        }
    }
}

impl<S: Store> Default for BindOptions<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Store, R> BindOptions<S, R> {
    /// Re-render only when one of `keys` changes. Meaningful for keyed
    /// stores; the filter never narrows the selector's input.
    #[must_use]
    pub fn keys(mut self, keys: impl IntoIterator<Item = S::Key>) -> Self {
        self.keys = Some(keys.into_iter().collect());
        self
    }

    /// Project the observed value. Changes what is returned, not what
    /// triggers re-renders.
    pub fn selector<R2>(self, selector: impl Fn(&S::Value) -> R2 + 'static) -> BindOptions<S, R2> {
        BindOptions {
            keys: self.keys,
            selector: Rc::new(selector),
        }
    }

    /// Canonical token for the key filter, compared by value across
    /// renders to decide re-subscription. `None` when unfiltered.
    pub(crate) fn keys_token(&self) -> Option<String> {
        self.keys.as_ref().map(|keys| {
            keys.iter()
                .map(|key| format!("{key:?}"))
                .collect::<Vec<_>>()
                .join(",")
        })
    }
}

impl<S: Store, R> Clone for BindOptions<S, R> {
    fn clone(&self) -> Self {
        Self {
            keys: self.keys.clone(),
            selector: Rc::clone(&self.selector),
        }
    }
}

impl<S: Store, R> fmt::Debug for BindOptions<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindOptions")
            .field("keys", &self.keys)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
