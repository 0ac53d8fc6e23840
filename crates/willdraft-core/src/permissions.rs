//! Subscription plans and what they unlock
//!
//! Billing happens elsewhere; this module only answers "what may this plan
//! do" and maps a billing subscription to a plan.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Subscription plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionLevel {
    #[default]
    Free,
    Pro,
    ProPlus,
}

impl SubscriptionLevel {
    /// Maximum number of wills, `None` meaning unlimited
    pub fn max_wills(self) -> Option<usize> {
        match self {
            SubscriptionLevel::Free => Some(1),
            SubscriptionLevel::Pro => Some(5),
            SubscriptionLevel::ProPlus => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionLevel::Free => "free",
            SubscriptionLevel::Pro => "pro",
            SubscriptionLevel::ProPlus => "pro_plus",
        }
    }
}

impl fmt::Display for SubscriptionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    #[error("Unknown subscription level '{0}'. Valid levels: free, pro, pro_plus")]
    UnknownLevel(String),

    #[error("Invalid subscription: unknown price id '{0}'")]
    UnknownPrice(String),
}

impl FromStr for SubscriptionLevel {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "free" => Ok(SubscriptionLevel::Free),
            "pro" => Ok(SubscriptionLevel::Pro),
            "pro_plus" => Ok(SubscriptionLevel::ProPlus),
            _ => Err(PermissionError::UnknownLevel(s.to_string())),
        }
    }
}

/// Whether another will may be created given the current count
pub fn can_create_will(level: SubscriptionLevel, current_count: usize) -> bool {
    match level.max_wills() {
        Some(max) => current_count < max,
        None => true,
    }
}

/// Border style and color customizations
pub fn can_use_customizations(level: SubscriptionLevel) -> bool {
    level == SubscriptionLevel::ProPlus
}

pub fn can_use_ai_tools(level: SubscriptionLevel) -> bool {
    level != SubscriptionLevel::Free
}

/// A billing subscription as reported by the billing provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub price_id: String,
    pub current_period_end: DateTime<Utc>,
}

/// Price identifiers of the paid plans
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceIds {
    pub pro_monthly: String,
    pub pro_plus_monthly: String,
}

/// Resolve the plan for a (possibly missing) subscription
///
/// No subscription, or one whose period has ended, is the free plan.
pub fn resolve_level(
    subscription: Option<&Subscription>,
    prices: &PriceIds,
    now: DateTime<Utc>,
) -> Result<SubscriptionLevel, PermissionError> {
    let Some(sub) = subscription else {
        return Ok(SubscriptionLevel::Free);
    };

    if sub.current_period_end < now {
        return Ok(SubscriptionLevel::Free);
    }

    if sub.price_id == prices.pro_monthly {
        Ok(SubscriptionLevel::Pro)
    } else if sub.price_id == prices.pro_plus_monthly {
        Ok(SubscriptionLevel::ProPlus)
    } else {
        Err(PermissionError::UnknownPrice(sub.price_id.clone()))
    }
}
