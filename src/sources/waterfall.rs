//! Ordered "first non-empty wins" evaluation of provider steps.
//!
//! Steps run strictly one after another: whether step N+1 runs at all
//! depends on step N coming back empty.

use futures::future::BoxFuture;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::SourceError;

/// One provider attempt, not yet started
pub struct Step<'a, T> {
    pub provider: String,
    pub run: BoxFuture<'a, Result<T, SourceError>>,
}

impl<'a, T> Step<'a, T> {
    pub fn new(provider: impl Into<String>, run: BoxFuture<'a, Result<T, SourceError>>) -> Self {
        Self {
            provider: provider.into(),
            run,
        }
    }
}

/// What happened when a provider was asked
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum ProviderOutcome {
    /// Returned data, which was accepted
    Accepted,
    /// Returned nothing
    Empty,
    /// Errored; treated like empty
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderAttempt {
    pub provider: String,
    #[serde(flatten)]
    pub outcome: ProviderOutcome,
}

/// Which provider supplied the accepted data, and what was tried on the way
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Provenance {
    /// Name of the accepting provider, `None` if every provider came back empty
    pub provider: Option<String>,
    /// Position of the accepting provider in priority order (0 = primary)
    pub rank: Option<usize>,
    pub attempts: Vec<ProviderAttempt>,
}

impl Provenance {
    /// True when data came from anything other than the primary provider
    pub fn is_fallback(&self) -> bool {
        self.rank.map_or(false, |rank| rank > 0)
    }

    pub fn is_exhausted(&self) -> bool {
        self.provider.is_none()
    }
}

/// Accepted data (if any) plus provenance
#[derive(Debug, Clone)]
pub struct Acquired<T> {
    pub data: Option<T>,
    pub provenance: Provenance,
}

impl<T: Default> Acquired<T> {
    /// Accepted data, or an empty value when the waterfall was exhausted
    pub fn into_data(self) -> (T, Provenance) {
        (self.data.unwrap_or_default(), self.provenance)
    }
}

/// Run `steps` in order and accept the first result that is not empty.
///
/// Errors are logged and recorded, never propagated.
pub async fn first_non_empty<T, P>(
    label: &str,
    steps: Vec<Step<'_, T>>,
    is_empty: P,
) -> Acquired<T>
where
    P: Fn(&T) -> bool,
{
    let mut attempts = Vec::with_capacity(steps.len());

    for (rank, step) in steps.into_iter().enumerate() {
        match step.run.await {
            Ok(data) if !is_empty(&data) => {
                info!("{}: accepted data from '{}' (rank {})", label, step.provider, rank);
                attempts.push(ProviderAttempt {
                    provider: step.provider.clone(),
                    outcome: ProviderOutcome::Accepted,
                });
                return Acquired {
                    data: Some(data),
                    provenance: Provenance {
                        provider: Some(step.provider),
                        rank: Some(rank),
                        attempts,
                    },
                };
            }
            Ok(_) => {
                debug!("{}: '{}' returned no data", label, step.provider);
                attempts.push(ProviderAttempt {
                    provider: step.provider,
                    outcome: ProviderOutcome::Empty,
                });
            }
            Err(e) => {
                warn!("{}: '{}' failed: {}", label, step.provider, e);
                attempts.push(ProviderAttempt {
                    provider: step.provider,
                    outcome: ProviderOutcome::Failed(e.to_string()),
                });
            }
        }
    }

    info!("{}: all {} providers exhausted", label, attempts.len());
    Acquired {
        data: None,
        provenance: Provenance {
            provider: None,
            rank: None,
            attempts,
        },
    }
}
