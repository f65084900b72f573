//! Priority scoring
//!
//! A task's score is a weighted sum of four 0-100 components multiplied by an
//! effort boost, rounded and clamped to `[0, 100]`:
//!
//! ```text
//! score = round((user·w_user + decay·w_decay + urgency·w_deadline + bump·w_bump) · boost)
//! ```
//!
//! Every time-dependent component is a pure function of `now`, so the score is
//! recomputed on each read and never stored. All constants come from an
//! injected [`PriorityConfig`].

use crate::db::models::{Effort, Task};
use crate::error::{Result, TaskError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Relative weight of each component in the weighted sum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorityWeights {
    pub user_priority: f64,
    pub time_decay: f64,
    pub deadline_urgency: f64,
    pub bump_penalty: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            user_priority: 0.4,
            time_decay: 0.3,
            deadline_urgency: 0.2,
            bump_penalty: 0.1,
        }
    }
}

/// Multiplier applied to the weighted sum for each effort size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffortBoosts {
    pub small: f64,
    pub medium: f64,
    pub large: f64,
    pub xlarge: f64,
}

impl Default for EffortBoosts {
    fn default() -> Self {
        Self {
            small: 1.3,
            medium: 1.15,
            large: 1.0,
            xlarge: 1.0,
        }
    }
}

/// Tunable scoring constants.
///
/// Stored overrides live in the configuration store under the `priority.`
/// prefix; see [`PriorityConfig::from_entries`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityConfig {
    pub weights: PriorityWeights,
    /// Age in days at which time decay saturates at 100
    pub decay_window_days: f64,
    /// Due dates further away than this contribute no urgency
    pub urgency_window_days: f64,
    /// Days-until-due at which the urgency curve crosses 50
    pub urgency_midpoint_days: f64,
    /// Slope of the urgency curve around its midpoint
    pub urgency_steepness: f64,
    /// Penalty added per bump
    pub bump_step: f64,
    /// Number of bumps after which the penalty stops growing
    pub bump_cap: u32,
    pub effort_boosts: EffortBoosts,
    pub at_risk_bumps: i32,
    pub at_risk_overdue_days: f64,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            weights: PriorityWeights::default(),
            decay_window_days: 30.0,
            urgency_window_days: 7.0,
            urgency_midpoint_days: 3.3,
            urgency_steepness: 1.7,
            bump_step: 10.0,
            bump_cap: 5,
            effort_boosts: EffortBoosts::default(),
            at_risk_bumps: 3,
            at_risk_overdue_days: 3.0,
        }
    }
}

impl PriorityConfig {
    /// Configuration key prefix for stored overrides
    pub const KEY_PREFIX: &'static str = "priority.";

    /// Build a config from `(key, value)` pairs, starting from the defaults.
    ///
    /// Keys outside the `priority.` prefix are ignored; unknown keys inside it
    /// and unparsable values are rejected so a typo never silently falls back.
    pub fn from_entries<'a, I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut config = Self::default();

        for (key, value) in entries {
            let Some(name) = key.strip_prefix(Self::KEY_PREFIX) else {
                continue;
            };

            match name {
                "weight.user" => config.weights.user_priority = parse_f64(key, value)?,
                "weight.time_decay" => config.weights.time_decay = parse_f64(key, value)?,
                "weight.deadline" => config.weights.deadline_urgency = parse_f64(key, value)?,
                "weight.bump" => config.weights.bump_penalty = parse_f64(key, value)?,
                "decay_window_days" => config.decay_window_days = parse_f64(key, value)?,
                "urgency_window_days" => config.urgency_window_days = parse_f64(key, value)?,
                "urgency_midpoint_days" => config.urgency_midpoint_days = parse_f64(key, value)?,
                "urgency_steepness" => config.urgency_steepness = parse_f64(key, value)?,
                "bump_step" => config.bump_step = parse_f64(key, value)?,
                "bump_cap" => {
                    config.bump_cap = value.trim().parse().map_err(|_| {
                        TaskError::InvalidInput(format!(
                            "Invalid value for '{}': '{}' is not a non-negative integer",
                            key, value
                        ))
                    })?
                },
                "boost.small" => config.effort_boosts.small = parse_f64(key, value)?,
                "boost.medium" => config.effort_boosts.medium = parse_f64(key, value)?,
                "boost.large" => config.effort_boosts.large = parse_f64(key, value)?,
                "boost.xlarge" => config.effort_boosts.xlarge = parse_f64(key, value)?,
                "at_risk.bumps" => {
                    config.at_risk_bumps = value.trim().parse().map_err(|_| {
                        TaskError::InvalidInput(format!(
                            "Invalid value for '{}': '{}' is not an integer",
                            key, value
                        ))
                    })?
                },
                "at_risk.overdue_days" => config.at_risk_overdue_days = parse_f64(key, value)?,
                _ => {
                    return Err(TaskError::InvalidInput(format!(
                        "Unknown priority setting '{}'",
                        key
                    )))
                },
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let w = &self.weights;
        let non_negative = [
            ("priority.weight.user", w.user_priority),
            ("priority.weight.time_decay", w.time_decay),
            ("priority.weight.deadline", w.deadline_urgency),
            ("priority.weight.bump", w.bump_penalty),
            ("priority.bump_step", self.bump_step),
            ("priority.urgency_steepness", self.urgency_steepness),
            ("priority.urgency_midpoint_days", self.urgency_midpoint_days),
            ("priority.at_risk.overdue_days", self.at_risk_overdue_days),
            ("priority.boost.small", self.effort_boosts.small),
            ("priority.boost.medium", self.effort_boosts.medium),
            ("priority.boost.large", self.effort_boosts.large),
            ("priority.boost.xlarge", self.effort_boosts.xlarge),
        ];
        for (key, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(TaskError::InvalidInput(format!(
                    "'{}' must be a finite number >= 0 (got {})",
                    key, value
                )));
            }
        }

        for (key, value) in [
            ("priority.decay_window_days", self.decay_window_days),
            ("priority.urgency_window_days", self.urgency_window_days),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(TaskError::InvalidInput(format!(
                    "'{}' must be a finite number > 0 (got {})",
                    key, value
                )));
            }
        }

        Ok(())
    }

    /// Largest bump penalty reachable (`bump_step · bump_cap`)
    pub fn max_bump_penalty(&self) -> f64 {
        self.bump_step * self.bump_cap as f64
    }
}

fn parse_f64(key: &str, value: &str) -> Result<f64> {
    value.trim().parse::<f64>().map_err(|_| {
        TaskError::InvalidInput(format!(
            "Invalid value for '{}': '{}' is not a number",
            key, value
        ))
    })
}

/// Weighted contribution of each component before the effort boost
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedComponents {
    pub user_priority: f64,
    pub time_decay: f64,
    pub deadline_urgency: f64,
    pub bump_penalty: f64,
}

impl WeightedComponents {
    pub fn sum(&self) -> f64 {
        self.user_priority + self.time_decay + self.deadline_urgency + self.bump_penalty
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorityBreakdown {
    pub score: u8,
    /// 0-100
    pub user_priority: f64,
    /// 0-100
    pub time_decay: f64,
    /// 0-100
    pub deadline_urgency: f64,
    /// 0 up to the configured cap (50 by default)
    pub bump_penalty: f64,
    /// Multiplier, 1.0-1.3 by default
    pub effort_boost: f64,
    pub weighted: WeightedComponents,
}

/// Scale a 1-10 user priority onto 0-100. Out-of-range values are clamped.
pub fn user_component(user_priority: i32) -> f64 {
    (user_priority as f64 * 10.0).clamp(0.0, 100.0)
}

/// Linear ramp from 0 at creation to 100 at `window_days` old
pub fn time_decay(age_days: f64, window_days: f64) -> f64 {
    if age_days <= 0.0 {
        return 0.0;
    }
    (age_days / window_days * 100.0).min(100.0)
}

/// Urgency from days remaining until the due date.
///
/// Negative `days_until_due` means overdue and pins urgency at 100. Beyond the
/// window urgency is 0; inside it a logistic curve rises towards 100.
pub fn deadline_urgency(days_until_due: Option<f64>, config: &PriorityConfig) -> f64 {
    let Some(days) = days_until_due else {
        return 0.0;
    };

    if days < 0.0 {
        return 100.0;
    }
    if days > config.urgency_window_days {
        return 0.0;
    }

    let exponent = config.urgency_steepness * (days - config.urgency_midpoint_days);
    100.0 / (1.0 + exponent.exp())
}

pub fn bump_penalty(bump_count: i32, config: &PriorityConfig) -> f64 {
    let bumps = bump_count.max(0) as f64;
    (bumps * config.bump_step).min(config.max_bump_penalty())
}

pub fn effort_boost(effort: Option<Effort>, boosts: &EffortBoosts) -> f64 {
    match effort {
        Some(Effort::Small) => boosts.small,
        Some(Effort::Medium) => boosts.medium,
        Some(Effort::Large) => boosts.large,
        Some(Effort::XLarge) => boosts.xlarge,
        None => 1.0,
    }
}

fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_seconds() as f64 / SECONDS_PER_DAY
}

#[derive(Debug, Clone, Default)]
pub struct PriorityCalculator {
    config: PriorityConfig,
}

impl PriorityCalculator {
    pub fn new(config: PriorityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PriorityConfig {
        &self.config
    }

    pub fn calculate(&self, task: &Task) -> u8 {
        self.calculate_at(task, Utc::now())
    }

    pub fn calculate_at(&self, task: &Task, now: DateTime<Utc>) -> u8 {
        self.calculate_with_breakdown_at(task, now).score
    }

    pub fn calculate_with_breakdown(&self, task: &Task) -> PriorityBreakdown {
        self.calculate_with_breakdown_at(task, Utc::now())
    }

    pub fn calculate_with_breakdown_at(&self, task: &Task, now: DateTime<Utc>) -> PriorityBreakdown {
        let config = &self.config;
        let weights = &config.weights;

        let user = user_component(task.user_priority);
        let decay = time_decay(days_between(task.created_at, now), config.decay_window_days);
        let urgency = deadline_urgency(task.due_date.map(|due| days_between(now, due)), config);
        let bump = bump_penalty(task.bump_count, config);
        let boost = effort_boost(task.estimated_effort, &config.effort_boosts);

        let weighted = WeightedComponents {
            user_priority: user * weights.user_priority,
            time_decay: decay * weights.time_decay,
            deadline_urgency: urgency * weights.deadline_urgency,
            bump_penalty: bump * weights.bump_penalty,
        };

        let raw = (weighted.sum() * boost).round();
        let score = if raw.is_finite() {
            raw.clamp(0.0, 100.0) as u8
        } else {
            0
        };

        PriorityBreakdown {
            score,
            user_priority: user,
            time_decay: decay,
            deadline_urgency: urgency,
            bump_penalty: bump,
            effort_boost: boost,
            weighted,
        }
    }

    pub fn is_at_risk(&self, task: &Task) -> bool {
        self.is_at_risk_at(task, Utc::now())
    }

    /// Bumped too often, or overdue by at least the configured number of days
    pub fn is_at_risk_at(&self, task: &Task, now: DateTime<Utc>) -> bool {
        if task.bump_count >= self.config.at_risk_bumps {
            return true;
        }

        task.due_date
            .map(|due| days_between(due, now) >= self.config.at_risk_overdue_days)
            .unwrap_or(false)
    }
}
