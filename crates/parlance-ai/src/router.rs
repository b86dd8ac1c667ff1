//! Layered router: deterministic resolver, then semantic match, then hand-off.
//!
//! Layer 0 is the caller's deterministic resolver and runs on every message.
//! Layer 1 embeds the message, ranks it against the intent centroids, and
//! runs the matched card's resolver when the confidence gate passes. Anything
//! left over is returned as [`RouteOutcome::Unhandled`] so the caller can ask
//! its general-purpose model (Layer 2).

use std::sync::Arc;
use std::time::Instant;

use parlance_core::{IntentCatalog, RouteContext, StructuredCommand};
use serde::Serialize;
use tracing::{debug, warn};

use crate::AiError;
use crate::centroid::{CentroidCache, CentroidIndex};
use crate::matcher::{Gate, SemanticMatch, rank};
use crate::provider::{EmbeddingProvider, Role};

/// Layer 0: exact, cheap pattern matching supplied by the caller.
///
/// Errors are not swallowed by the router; they propagate from
/// [`Router::route`] unchanged.
pub trait DeterministicResolver: Send + Sync {
    fn resolve(
        &self,
        input: &str,
        ctx: &RouteContext,
    ) -> anyhow::Result<Option<StructuredCommand>>;
}

impl<F> DeterministicResolver for F
where
    F: Fn(&str, &RouteContext) -> anyhow::Result<Option<StructuredCommand>> + Send + Sync,
{
    fn resolve(
        &self,
        input: &str,
        ctx: &RouteContext,
    ) -> anyhow::Result<Option<StructuredCommand>> {
        self(input, ctx)
    }
}

/// A Layer 0 that never matches.
pub struct NoDeterministic;

impl DeterministicResolver for NoDeterministic {
    fn resolve(&self, _: &str, _: &RouteContext) -> anyhow::Result<Option<StructuredCommand>> {
        Ok(None)
    }
}

/// The layer that produced a command. Serializes as `0` or `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u8")]
pub enum Layer {
    Deterministic,
    Semantic,
}

impl From<Layer> for u8 {
    fn from(layer: Layer) -> Self {
        match layer {
            Layer::Deterministic => 0,
            Layer::Semantic => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteResult {
    pub command: StructuredCommand,
    pub layer: Layer,
    /// Matched intent; set only for semantic matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_id: Option<String>,
}

/// Advisory context for Layer 2 when the router could not finish the job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "match", rename_all = "snake_case")]
pub enum Handoff {
    /// Layer 1 was unavailable or had nothing to compare against.
    None,
    /// The gate rejected the top match; it is only the closest guess.
    BestGuess(SemanticMatch),
    /// The gate accepted the intent but its resolver needs more than the
    /// surface text to build a command.
    Identified(SemanticMatch),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RouteOutcome {
    Resolved(RouteResult),
    Unhandled { handoff: Handoff },
}

impl RouteOutcome {
    fn unhandled(handoff: Handoff) -> Self {
        Self::Unhandled { handoff }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// The command, or `None` when Layer 2 is required.
    pub fn into_result(self) -> Option<RouteResult> {
        match self {
            Self::Resolved(result) => Some(result),
            Self::Unhandled { .. } => None,
        }
    }

    pub fn handoff(&self) -> Option<&Handoff> {
        match self {
            Self::Resolved(_) => None,
            Self::Unhandled { handoff } => Some(handoff),
        }
    }
}

/// Owns one catalog, its centroid cache, and a shared embedding provider.
///
/// Several routers may share a provider (and so one loaded model); each
/// builds its own index from its own catalog and keeps the first one that
/// succeeds.
pub struct Router {
    catalog: IntentCatalog,
    deterministic: Box<dyn DeterministicResolver>,
    provider: Arc<EmbeddingProvider>,
    index: CentroidCache,
    gate: Gate,
}

impl Router {
    pub fn new(
        catalog: IntentCatalog,
        deterministic: impl DeterministicResolver + 'static,
        provider: Arc<EmbeddingProvider>,
        gate: Gate,
    ) -> Self {
        Self {
            catalog,
            deterministic: Box::new(deterministic),
            provider,
            index: CentroidCache::new(),
            gate,
        }
    }

    pub fn catalog(&self) -> &IntentCatalog {
        &self.catalog
    }

    pub fn gate(&self) -> Gate {
        self.gate
    }

    pub fn provider(&self) -> &Arc<EmbeddingProvider> {
        &self.provider
    }

    /// Load the model and build the centroid index ahead of the first request.
    ///
    /// Safe to call repeatedly and concurrently. Once a build has succeeded,
    /// later calls do no work; a failed build is retried by the next caller.
    pub async fn warmup(&self) -> Result<(), AiError> {
        let index = self.index().await?;
        debug!(intents = index.len(), "router warm");
        Ok(())
    }

    /// The built index, or [`AiError::NotInitialized`] until a build succeeds.
    pub fn index_snapshot(&self) -> Result<Arc<CentroidIndex>, AiError> {
        self.index.lookup()
    }

    /// Rank every intent for `input` without gating or resolving.
    pub async fn explain(&self, input: &str) -> Result<Vec<SemanticMatch>, AiError> {
        let index = self.index().await?;
        let query = self.provider.embed(input, Role::Query).await?;
        rank(&query, &index)
    }

    /// Route one user message.
    ///
    /// Only Layer 0 errors are returned as `Err`. Layer 1 failures degrade to
    /// [`Handoff::None`].
    pub async fn route(&self, input: &str, ctx: &RouteContext) -> anyhow::Result<RouteOutcome> {
        let start = Instant::now();

        if let Some(command) = self.deterministic.resolve(input, ctx)? {
            debug!(kind = command.kind(), "layer 0 resolved");
            return Ok(RouteOutcome::Resolved(RouteResult {
                command,
                layer: Layer::Deterministic,
                intent_id: None,
            }));
        }

        if input.trim().is_empty() {
            return Ok(RouteOutcome::unhandled(Handoff::None));
        }

        let outcome = match self.semantic(input).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "semantic layer unavailable, handing off");
                RouteOutcome::unhandled(Handoff::None)
            }
        };
        debug!(
            resolved = outcome.is_resolved(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "routed"
        );
        Ok(outcome)
    }

    async fn semantic(&self, input: &str) -> Result<RouteOutcome, AiError> {
        let Some(top) = self.explain(input).await?.into_iter().next() else {
            return Ok(RouteOutcome::unhandled(Handoff::None));
        };

        if !self.gate.accepts(&top) {
            debug!(
                intent = %top.intent_id,
                score = top.score,
                gap = top.gap,
                "layer 1 below confidence gate"
            );
            return Ok(RouteOutcome::unhandled(Handoff::BestGuess(top)));
        }

        // The index was built from this catalog, so the card exists.
        let Some(card) = self.catalog.get(&top.intent_id) else {
            return Ok(RouteOutcome::unhandled(Handoff::BestGuess(top)));
        };

        match card.resolve(input) {
            Some(command) => {
                debug!(intent = %top.intent_id, score = top.score, gap = top.gap, "layer 1 resolved");
                Ok(RouteOutcome::Resolved(RouteResult {
                    command,
                    layer: Layer::Semantic,
                    intent_id: Some(top.intent_id),
                }))
            }
            None => {
                debug!(intent = %top.intent_id, "intent identified, resolver needs layer 2");
                Ok(RouteOutcome::unhandled(Handoff::Identified(top)))
            }
        }
    }

    async fn index(&self) -> Result<Arc<CentroidIndex>, AiError> {
        self.index.get_or_build(&self.catalog, &self.provider).await
    }
}
