//! Subscription cart: plan choice and per-plan quantities.

use rustc_hash::FxHashMap;
use tokio::sync::watch;

use super::Store;

/// A subscription plan on offer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Plan identifier
    pub id: String,
    /// Short title
    pub title: String,
    /// Marketing description
    pub description: String,
    /// Price per unit, in rupees
    pub price: u32,
    /// Optional badge text (e.g. "SAVE 28%")
    pub badge: Option<String>,
    /// Badge color as a hex string
    pub badge_color: Option<String>,
}

/// Cart contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartState {
    /// Plans on offer
    pub plans: Vec<Plan>,
    /// Currently selected plan
    pub selected_plan_id: String,
    /// Quantity per plan id; a missing entry counts as 1
    pub quantity: FxHashMap<String, u32>,
}

impl CartState {
    /// Quantity of `plan_id`, defaulting to 1.
    pub fn quantity_of(&self, plan_id: &str) -> u32 {
        self.quantity.get(plan_id).copied().unwrap_or(1)
    }

    /// The selected plan, if it is on offer.
    pub fn selected_plan(&self) -> Option<&Plan> {
        self.plans.iter().find(|plan| plan.id == self.selected_plan_id)
    }

    /// Sum of price times quantity over every plan.
    pub fn total(&self) -> u64 {
        self.plans
            .iter()
            .map(|plan| u64::from(plan.price) * u64::from(self.quantity_of(&plan.id)))
            .sum()
    }
}

impl Default for CartState {
    fn default() -> Self {
        let plans = vec![
            Plan {
                id: "plan1".to_string(),
                title: "1 months".to_string(),
                description: "Enjoy 14-16 vibrant plants with bi-monthly expert care. Includes \
                              seasonal plant replacements and home-friendly greenery."
                    .to_string(),
                price: 4999,
                badge: Some("SAVE 28%".to_string()),
                badge_color: Some("#B6FF5C".to_string()),
            },
            Plan {
                id: "plan2".to_string(),
                title: "1 months".to_string(),
                description: "Get 36-38 premium plants with twice-a-month maintenance. Includes \
                              plant swaps, soil enrichment, and pest control for a lush space."
                    .to_string(),
                price: 8999,
                badge: None,
                badge_color: None,
            },
        ];

        let mut quantity = FxHashMap::default();
        quantity.insert("plan1".to_string(), 2);
        quantity.insert("plan2".to_string(), 1);

        Self {
            plans,
            selected_plan_id: "plan1".to_string(),
            quantity,
        }
    }
}

/// Store of the [`CartState`].
pub struct CartStore {
    store: Store<CartState>,
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new(CartState::default())
    }
}

impl CartStore {
    /// A cart starting at `initial`.
    pub fn new(initial: CartState) -> Self {
        Self {
            store: Store::new(initial),
        }
    }

    /// Current contents.
    pub fn state(&self) -> CartState {
        self.store.get()
    }

    /// Observe changes.
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.store.subscribe()
    }

    /// Select a plan.
    pub fn select_plan(&self, plan_id: &str) {
        self.store
            .update(|state| state.selected_plan_id = plan_id.to_string());
    }

    /// Add one unit of `plan_id`.
    pub fn increment(&self, plan_id: &str) {
        self.store.update(|state| {
            let next = state.quantity_of(plan_id).saturating_add(1);
            state.quantity.insert(plan_id.to_string(), next);
        });
    }

    /// Remove one unit of `plan_id`, never going below 1.
    pub fn decrement(&self, plan_id: &str) {
        self.store.update(|state| {
            let next = state.quantity_of(plan_id).saturating_sub(1).max(1);
            state.quantity.insert(plan_id.to_string(), next);
        });
    }

    /// Cart total in rupees.
    pub fn total(&self) -> u64 {
        self.store.read(CartState::total)
    }
}
