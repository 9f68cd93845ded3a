//! Trigger dispatcher
//!
//! Holds the ordered set of [`Action`]s and resolves competing matches:
//! - every targeted action produces, in registration order
//! - failed actions are logged and excluded
//! - the smallest [`MatchOffset`] wins, ties go to the earlier registration

use crate::action::{Action, MatchOffset};
use crate::error::{ActionFailure, DispatchError};
use crate::event::Event;
use crate::types::Post;
use std::sync::Arc;

/// Winning event of a dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    /// Name of the winning action
    pub action: String,
    /// Event it produced
    pub event: Event,
    /// Where it matched
    pub offset: MatchOffset,
}

/// Ordered collection of triggers
#[derive(Clone, Default)]
pub struct Dispatcher {
    actions: Vec<Arc<dyn Action>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("actions", &self.names())
            .finish()
    }
}

impl Dispatcher {
    /// Create an empty dispatcher
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action after all existing ones
    pub fn register(&mut self, action: impl Action + 'static) -> &mut Self {
        self.actions.push(Arc::new(action));
        self
    }

    /// Register a shared action after all existing ones
    pub fn register_shared(&mut self, action: Arc<dyn Action>) -> &mut Self {
        self.actions.push(action);
        self
    }

    /// Builder form of [`Dispatcher::register`]
    #[must_use]
    pub fn with_action(mut self, action: impl Action + 'static) -> Self {
        self.register(action);
        self
    }

    /// Number of registered actions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether no action is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Action names in registration order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.name()).collect()
    }

    /// Pick the event for a post
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::NoMatch`] when no targeted action produced
    /// an event. The error lists the actions that were targeted but failed.
    pub async fn dispatch(&self, post: &Post) -> Result<Dispatched, DispatchError> {
        let mut winner: Option<Dispatched> = None;
        let mut failures = Vec::new();

        for action in self.actions.iter().filter(|a| a.target(post)) {
            match action.produce(post).await {
                Ok(produced) => {
                    tracing::trace!(
                        action = action.name(),
                        offset = produced.offset.get(),
                        post_id = %post.id,
                        "action produced"
                    );
                    // Strict comparison keeps the earlier registration on ties.
                    if winner.as_ref().map_or(true, |w| produced.offset < w.offset) {
                        winner = Some(Dispatched {
                            action: action.name().to_string(),
                            event: produced.event,
                            offset: produced.offset,
                        });
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        action = action.name(),
                        post_id = %post.id,
                        error = %error,
                        "action failed to produce"
                    );
                    failures.push(ActionFailure {
                        action: action.name().to_string(),
                        error,
                    });
                }
            }
        }

        match winner {
            Some(dispatched) => Ok(dispatched),
            None => {
                tracing::debug!(post_id = %post.id, failed = failures.len(), "no action matched");
                Err(DispatchError::NoMatch { failures })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Produced;
    use crate::error::ActionError;
    use crate::event::UpdateEvent;
    use crate::types::Account;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    struct Fixed {
        name: &'static str,
        offset: Option<usize>,
        day: u32,
    }

    #[async_trait]
    impl Action for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn target(&self, _post: &Post) -> bool {
            true
        }

        async fn produce(&self, post: &Post) -> Result<Produced, ActionError> {
            let date = NaiveDate::from_ymd_opt(2024, 1, self.day).unwrap();
            match self.offset {
                Some(offset) => Ok(Produced::new(UpdateEvent { date }, offset)),
                None => Err(ActionError::PatternNotFound {
                    post_id: post.id.clone(),
                }),
            }
        }
    }

    fn post() -> Post {
        Post::new("1", Account::new("1", "alice"), "hello")
    }

    #[tokio::test]
    async fn earlier_registration_wins_tie() {
        let dispatcher = Dispatcher::new()
            .with_action(Fixed { name: "a", offset: Some(4), day: 1 })
            .with_action(Fixed { name: "b", offset: Some(4), day: 2 });

        let dispatched = dispatcher.dispatch(&post()).await.unwrap();
        assert_eq!(dispatched.action, "a");
    }

    #[tokio::test]
    async fn failures_are_reported_with_no_match() {
        let dispatcher = Dispatcher::new().with_action(Fixed { name: "a", offset: None, day: 1 });

        let err = dispatcher.dispatch(&post()).await.unwrap_err();
        assert!(!err.is_untargeted());
        let DispatchError::NoMatch { failures } = err;
        assert_eq!(failures[0].action, "a");
    }

    #[tokio::test]
    async fn empty_dispatcher_never_matches() {
        let err = Dispatcher::new().dispatch(&post()).await.unwrap_err();
        assert!(err.is_untargeted());
    }
}
