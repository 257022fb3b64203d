//! Agent interfacing the places autocomplete API with the pub/sub context.
//!
//! Subscribes to `ADDRESS_ENTRY` and publishes completions to
//! `ADDRESS_SUGGESTION`. Keeps the last prediction batch (plus a lowercased
//! copy for prefix matching) and the last prefix that produced nothing, so
//! keystrokes extending a dead end never hit the API.

use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::debug;
use voterinfo_api::autocomplete::{AutocompleteApi, PredictionStatus};
use voterinfo_core::context::{Context, SubscriptionId, keys};

/// Minimum number of characters before the API is consulted.
pub const MIN_CHARS: usize = 7;

#[derive(Default)]
struct SuggestState {
    suggestions: Vec<String>,
    suggestions_lower: Vec<String>,
    failed_prefix: Option<String>,
}

/// Agent that owns address suggestion state.
pub struct AutocompleteAgent {
    context: Arc<Context>,
    api: Arc<AutocompleteApi>,
    state: Arc<Mutex<SuggestState>>,
    subscription: Option<SubscriptionId>,
}

impl AutocompleteAgent {
    pub fn new(context: Arc<Context>, api: AutocompleteApi) -> Self {
        Self {
            context,
            api: Arc::new(api),
            state: Arc::new(Mutex::new(SuggestState::default())),
            subscription: None,
        }
    }

    /// Subscribe to address-entry changes.
    pub fn init(&mut self) {
        let api = Arc::clone(&self.api);
        let state = Arc::clone(&self.state);
        let context = Arc::downgrade(&self.context);
        let id = self
            .context
            .subscribe(keys::ADDRESS_ENTRY, move |new, old| {
                let entry = new.and_then(Value::as_str).unwrap_or_default();
                let previous = old.and_then(Value::as_str).unwrap_or_default();
                // Skip no-ops and deletions (the old entry starting with the
                // new one means characters were removed).
                if entry == previous || (!entry.is_empty() && previous.starts_with(entry)) {
                    return;
                }
                if let Some(context) = context.upgrade() {
                    make_suggestion(&context, &api, &state, entry);
                }
            });
        self.subscription = Some(id);
    }

    /// Drop the agent's subscription. The context must still be live.
    pub fn dispose(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.context.unsubscribe_by_id(id);
        }
    }
}

/// Attempt to complete the entry from the cached predictions, or fetch new
/// ones.
fn make_suggestion(
    context: &Arc<Context>,
    api: &Arc<AutocompleteApi>,
    state: &Arc<Mutex<SuggestState>>,
    entry: &str,
) {
    if entry.len() < MIN_CHARS {
        context.set(keys::ADDRESS_SUGGESTION, "");
        return;
    }

    if try_complete(context, state, entry) {
        return;
    }
    context.set(keys::ADDRESS_SUGGESTION, "");

    let entry_lower = entry.to_lowercase();
    {
        let guard = lock(state);
        if let Some(failed) = &guard.failed_prefix {
            if entry_lower.starts_with(failed.as_str()) {
                debug!(entry = %entry, "Entry extends a failed prefix, skipping API");
                return;
            }
        }
    }

    let api = Arc::clone(api);
    let state = Arc::clone(state);
    let context = Arc::downgrade(context);
    let entry = entry.to_string();
    tokio::spawn(async move {
        let Some((predictions, status)) = api.autocomplete(&entry).await else {
            return; // dropped by the cooldown throttle
        };
        if status != PredictionStatus::Ok {
            // Fail quietly; just remember the dead end.
            lock(&state).failed_prefix = Some(entry.to_lowercase());
            return;
        }

        {
            let mut guard = lock(&state);
            guard.suggestions = predictions
                .iter()
                .map(|p| p.description.clone())
                .filter(|d| !d.is_empty())
                .collect();
            guard.suggestions_lower = guard.suggestions.iter().map(|s| s.to_lowercase()).collect();
        }

        // Re-attempt the match against whatever the user has typed by now.
        let Some(context) = context.upgrade() else {
            return;
        };
        let current = context
            .get(keys::ADDRESS_ENTRY)
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        if current.len() < MIN_CHARS || !try_complete(&context, &state, &current) {
            context.set(keys::ADDRESS_SUGGESTION, "");
        }
    });
}

/// Complete the entry from the cache. Returns whether a suggestion was
/// published.
fn try_complete(context: &Context, state: &Arc<Mutex<SuggestState>>, entry: &str) -> bool {
    let entry_lower = entry.to_lowercase();
    let guard = lock(state);
    for (i, candidate) in guard.suggestions_lower.iter().enumerate() {
        if candidate.starts_with(&entry_lower) {
            let tail = guard.suggestions[i].get(entry.len()..).unwrap_or("");
            let completed = format!("{entry}{tail}");
            context.set(keys::ADDRESS_SUGGESTION, completed);
            return true;
        }
    }
    false
}

fn lock(state: &Arc<Mutex<SuggestState>>) -> std::sync::MutexGuard<'_, SuggestState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
