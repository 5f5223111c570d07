//! Credit balance, plan and history.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::Store;

/// The credit plan the user is subscribed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditPlan {
    /// Plan identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Price in rupees
    pub price: u32,
    /// Credits granted per cycle
    pub credits: u32,
    /// Whether the plan renews automatically
    pub is_auto_pay: bool,
}

impl Default for CreditPlan {
    fn default() -> Self {
        Self {
            id: "plan-1".to_string(),
            name: "Current Plan".to_string(),
            price: 4999,
            credits: 300,
            is_auto_pay: true,
        }
    }
}

/// Direction of a credit movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditKind {
    /// Credits received
    Credit,
    /// Credits spent
    Debit,
}

/// One credit movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditHistoryItem {
    /// Entry identifier
    pub id: String,
    /// Direction
    pub kind: CreditKind,
    /// Signed amount: positive for credits, negative for debits
    pub amount: i64,
    /// Short title
    pub title: String,
    /// Longer description
    pub description: String,
    /// When it happened
    pub date: DateTime<Utc>,
}

/// Outcome of a plan payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Payment went through
    Success,
    /// Payment failed
    Failed,
}

/// One plan payment attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanHistoryItem {
    /// Entry identifier
    pub id: String,
    /// Outcome
    pub status: PaymentStatus,
    /// Amount in rupees
    pub amount: u32,
    /// Description
    pub description: String,
    /// When it happened
    pub date: DateTime<Utc>,
}

/// Which history list is shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryTab {
    /// Credit movements
    #[default]
    Credit,
    /// Plan payments
    Plan,
}

/// Complete credit state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditState {
    /// Spendable credits
    pub available_credits: i64,
    /// Subscribed plan
    pub current_plan: CreditPlan,
    /// Credit movements, newest first
    pub history: Vec<CreditHistoryItem>,
    /// Plan payments, newest first
    pub plan_history: Vec<PlanHistoryItem>,
    /// Selected history tab
    pub history_tab: HistoryTab,
}

impl Default for CreditState {
    fn default() -> Self {
        Self {
            available_credits: 180,
            current_plan: CreditPlan::default(),
            history: seed_history(),
            plan_history: seed_plan_history(),
            history_tab: HistoryTab::default(),
        }
    }
}

fn seed_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 12, 15, 15, 45, 0)
        .single()
        .unwrap_or_default()
}

fn seed_history() -> Vec<CreditHistoryItem> {
    [
        (1, -75, "Rose flower pot"),
        (2, 25, "Referral"),
        (3, -120, "Tulip flower pot"),
        (4, -75, "Rose flower pot"),
        (5, -120, "Tulip flower pot"),
        (6, 75, "Rose flower pot"),
    ]
    .into_iter()
    .map(|(id, amount, title): (u32, i64, &str)| CreditHistoryItem {
        id: id.to_string(),
        kind: if amount < 0 {
            CreditKind::Debit
        } else {
            CreditKind::Credit
        },
        amount,
        title: title.to_string(),
        description: format!("{amount:+} Pran Credit for {title}"),
        date: seed_date(),
    })
    .collect()
}

fn seed_plan_history() -> Vec<PlanHistoryItem> {
    [PaymentStatus::Success, PaymentStatus::Failed]
        .into_iter()
        .cycle()
        .take(4)
        .enumerate()
        .map(|(i, status)| PlanHistoryItem {
            id: format!("p{}", i + 1),
            status,
            amount: 4999,
            description: match status {
                PaymentStatus::Success => "Auto pay ₹4,999 credited to Account".to_string(),
                PaymentStatus::Failed => "Auto pay Failed ₹4,999".to_string(),
            },
            date: seed_date(),
        })
        .collect()
}

/// Store of the [`CreditState`].
#[derive(Default)]
pub struct CreditStore {
    store: Store<CreditState>,
}

impl CreditStore {
    /// Current state.
    pub fn state(&self) -> CreditState {
        self.store.get()
    }

    /// Observe changes.
    pub fn subscribe(&self) -> watch::Receiver<CreditState> {
        self.store.subscribe()
    }

    /// Switch the visible history list.
    pub fn set_history_tab(&self, tab: HistoryTab) {
        self.store.update(|state| state.history_tab = tab);
    }

    /// Turn automatic renewal on or off.
    pub fn set_auto_pay(&self, is_auto_pay: bool) {
        self.store
            .update(|state| state.current_plan.is_auto_pay = is_auto_pay);
    }

    /// Switch to another plan.
    pub fn set_plan(&self, plan: CreditPlan) {
        self.store.update(|state| state.current_plan = plan);
    }

    /// Record a credit movement and apply it to the balance.
    pub fn record(&self, item: CreditHistoryItem) {
        self.store.update(|state| {
            state.available_credits += item.amount;
            state.history.insert(0, item);
        });
    }

    /// Record a plan payment; successful payments add the plan's credits.
    pub fn record_plan_payment(&self, item: PlanHistoryItem) {
        self.store.update(|state| {
            if item.status == PaymentStatus::Success {
                state.available_credits += i64::from(state.current_plan.credits);
            }
            state.plan_history.insert(0, item);
        });
    }
}
