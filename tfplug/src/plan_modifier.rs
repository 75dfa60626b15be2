//! Attribute plan modifiers
//!
//! Modifiers run during `PlanResourceChange` once for every attribute that
//! declares them, after computed attributes have been marked unknown.

use crate::types::{AttributePath, Diagnostics, Dynamic};

#[derive(Debug, Clone)]
pub struct PlanModifyRequest {
    /// Prior state value, `Dynamic::Null` when the resource is being created
    pub state: Dynamic,
    pub plan: Dynamic,
    pub config: Dynamic,
    pub path: AttributePath,
}

#[derive(Debug, Clone)]
pub struct PlanModifyResponse {
    pub plan_value: Dynamic,
    pub requires_replace: bool,
    pub diagnostics: Diagnostics,
}

impl PlanModifyResponse {
    fn keep(plan_value: Dynamic) -> Self {
        Self {
            plan_value,
            requires_replace: false,
            diagnostics: Diagnostics::new(),
        }
    }
}

/// Adjusts the planned value of a single attribute or flags it for replacement
pub trait PlanModifier: Send + Sync {
    fn description(&self) -> &'static str;

    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse;
}

/// Forces replacement when a known value differs from the prior state.
/// Creation (null prior state) never requires replacement.
pub struct RequiresReplaceIfChanged;

impl PlanModifier for RequiresReplaceIfChanged {
    fn description(&self) -> &'static str {
        "changing this value forces a new resource"
    }

    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let requires_replace = match (&request.state, &request.plan) {
            (Dynamic::Null, _) => false,
            (Dynamic::Unknown, _) | (_, Dynamic::Unknown) => false,
            (state, plan) => !values_equal(state, plan),
        };

        PlanModifyResponse {
            requires_replace,
            ..PlanModifyResponse::keep(request.plan)
        }
    }
}

/// Carries the prior state value forward while the planned value is unknown.
pub struct UseStateForUnknown;

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> &'static str {
        "value does not change once known"
    }

    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let plan_value = match (&request.plan, request.state) {
            (Dynamic::Unknown, state) if !state.is_null() && !state.is_unknown() => state,
            _ => request.plan,
        };

        PlanModifyResponse::keep(plan_value)
    }
}

/// Structural equality with numbers compared within `f64::EPSILON`
pub fn values_equal(a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (Dynamic::Null, Dynamic::Null) | (Dynamic::Unknown, Dynamic::Unknown) => true,
        (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
        (Dynamic::Number(a), Dynamic::Number(b)) => (a - b).abs() < f64::EPSILON,
        (Dynamic::String(a), Dynamic::String(b)) => a == b,
        (Dynamic::List(a), Dynamic::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Dynamic::Map(a), Dynamic::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|v2| values_equal(v, v2)))
        }
        _ => false,
    }
}
