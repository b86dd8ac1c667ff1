//! Intent catalog: the registry of intents the semantic layer can recognise.
//!
//! Each [`IntentCard`] pairs canonical example phrases with a resolver that
//! turns the raw utterance into a [`StructuredCommand`]. Cards are immutable
//! once constructed; the catalog only grows by registration.

use crate::CatalogError;
use crate::command::StructuredCommand;

/// Turns surface text into a command once the intent class is known.
///
/// Returns `None` when the text identifies the intent but lacks a referent
/// the command needs.
pub type Resolver = fn(&str) -> Option<StructuredCommand>;

/// A single intent definition.
#[derive(Clone)]
pub struct IntentCard {
    id: String,
    examples: Vec<String>,
    resolve: Resolver,
}

impl IntentCard {
    /// Create a card, copying the example phrases.
    pub fn new<S: AsRef<str>>(id: impl Into<String>, examples: &[S], resolve: Resolver) -> Self {
        Self {
            id: id.into(),
            examples: examples.iter().map(|s| s.as_ref().to_string()).collect(),
            resolve,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn examples(&self) -> &[String] {
        &self.examples
    }

    /// Run the card's resolver against the raw user input.
    pub fn resolve(&self, input: &str) -> Option<StructuredCommand> {
        (self.resolve)(input)
    }
}

impl std::fmt::Debug for IntentCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentCard")
            .field("id", &self.id)
            .field("examples", &self.examples.len())
            .finish()
    }
}

/// Ordered registry of intent cards with unique ids.
#[derive(Debug, Clone, Default)]
pub struct IntentCatalog {
    cards: Vec<IntentCard>,
}

impl IntentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a card. Fails on a repeated id or a card without usable examples.
    pub fn register(&mut self, card: IntentCard) -> Result<(), CatalogError> {
        if self.get(card.id()).is_some() {
            return Err(CatalogError::DuplicateIntent(card.id));
        }
        if card.examples.iter().all(|e| e.trim().is_empty()) {
            return Err(CatalogError::NoExamples(card.id));
        }
        tracing::debug!(intent = %card.id, examples = card.examples.len(), "registered intent");
        self.cards.push(card);
        Ok(())
    }

    /// All cards in registration order.
    pub fn list(&self) -> &[IntentCard] {
        &self.cards
    }

    pub fn get(&self, id: &str) -> Option<&IntentCard> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Total number of example phrases across all cards.
    pub fn example_count(&self) -> usize {
        self.cards.iter().map(|c| c.examples.len()).sum()
    }
}
