//! Saved payment cards: at most one credit and one debit card.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::Store;

/// Card type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    /// Credit card
    Credit,
    /// Debit card
    Debit,
}

/// A card the user saved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedCard {
    /// Card type
    pub kind: CardKind,
    /// Card number as entered
    pub card_number: String,
    /// Name on the card
    pub card_holder: String,
    /// Expiry, `MM/YY`
    pub expiry: String,
    /// Security code
    pub cvv: String,
}

impl SavedCard {
    /// Card number with everything but the last four digits hidden.
    ///
    /// ```
    /// use servicearea::store::cards::{CardKind, SavedCard};
    ///
    /// let card = SavedCard {
    ///     kind: CardKind::Debit,
    ///     card_number: "4111 1111 1111 1234".to_string(),
    ///     card_holder: "Asha".to_string(),
    ///     expiry: "12/28".to_string(),
    ///     cvv: "123".to_string(),
    /// };
    /// assert_eq!(card.masked_number(), "**** **** **** 1234");
    /// ```
    pub fn masked_number(&self) -> String {
        let digits: Vec<char> = self
            .card_number
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        let last_four: String = digits[digits.len().saturating_sub(4)..].iter().collect();
        format!("**** **** **** {last_four}")
    }
}

/// Both card slots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedCards {
    /// Saved credit card
    pub credit_card: Option<SavedCard>,
    /// Saved debit card
    pub debit_card: Option<SavedCard>,
}

/// Store of [`SavedCards`].
#[derive(Default)]
pub struct SavedCardsStore {
    store: Store<SavedCards>,
}

impl SavedCardsStore {
    /// Current cards.
    pub fn cards(&self) -> SavedCards {
        self.store.get()
    }

    /// Observe changes.
    pub fn subscribe(&self) -> watch::Receiver<SavedCards> {
        self.store.subscribe()
    }

    /// Save a card into the slot matching its kind, replacing the previous one.
    pub fn save(&self, card: SavedCard) {
        self.store.update(|cards| match card.kind {
            CardKind::Credit => cards.credit_card = Some(card),
            CardKind::Debit => cards.debit_card = Some(card),
        });
    }

    /// Empty the slot of `kind`.
    pub fn remove(&self, kind: CardKind) {
        self.store.update(|cards| match kind {
            CardKind::Credit => cards.credit_card = None,
            CardKind::Debit => cards.debit_card = None,
        });
    }
}
