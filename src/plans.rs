// src/plans.rs
//
// Static credit-pack table. Prices are CNY minor units (fen).

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Plan {
    pub id: &'static str,
    pub name: &'static str,
    /// Price in minor units.
    pub amount: i64,
    pub credits: i32,
    pub description: &'static str,
}

pub const PLANS: [Plan; 2] = [
    Plan {
        id: "starter",
        name: "Starter Pack",
        amount: 100,
        credits: 2,
        description: "For first-time users",
    },
    Plan {
        id: "pro",
        name: "Pro Pack",
        amount: 500,
        credits: 12,
        description: "The most popular choice",
    },
];

pub fn find(plan_id: &str) -> Option<&'static Plan> {
    PLANS.iter().find(|p| p.id == plan_id)
}

/// "100" -> "1.00"
pub fn amount_string(minor: i64) -> String {
    format!("{}.{:02}", minor / 100, minor % 100)
}
