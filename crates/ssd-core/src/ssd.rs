//! Subjective State Dynamics: habit strength `κ`, accumulated pressure `E`
//! and exploration temperature `T`.
//!
//! ```text
//! flow(a, p)   = (G0 + g·κ[a]) · p
//! κ[a]        += η·reward          (success)
//! κ[a]        -= ρ·κ[a]²           (failure)
//! κ[a]        -= λ·(κ[a] − κ_min)  (always), then κ[a] ≥ κ_min
//! E           += α·max(0, p − processed) − β·E, then E ≥ 0
//! T            = clip(T0 + c1·E − c2·σ(κ), T_min, T_max)
//! Θ            = Θ0 + a1·mean(κ) − a2·fatigue/100
//! P(leap)      = 1 − exp(−h0·exp((E − Θ)/γ))
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::agent::ActionKind;
use crate::clip;
use crate::config::SsdParams;
use crate::rng::RandomSource;

/// Outcome of one leap (death hazard) evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeapCheck {
    pub fired: bool,
    /// Hazard rate `h`.
    pub hazard: f64,
    /// Adaptive threshold `Θ`.
    pub threshold: f64,
    /// Jump probability `1 − exp(−h)`.
    pub probability: f64,
}

/// Per-agent SSD state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SsdState {
    kappa: BTreeMap<ActionKind, f64>,
    energy: f64,
    temperature: f64,
}

impl SsdState {
    #[must_use]
    pub fn new(params: &SsdParams) -> Self {
        Self {
            kappa: BTreeMap::new(),
            energy: 0.0,
            temperature: params.initial_temperature,
        }
    }

    /// Accumulated unprocessed pressure `E`.
    #[must_use]
    pub const fn energy(&self) -> f64 {
        self.energy
    }

    /// Exploration temperature `T`.
    #[must_use]
    pub const fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Habits the agent has engaged so far.
    #[must_use]
    pub fn kappa_map(&self) -> &BTreeMap<ActionKind, f64> {
        &self.kappa
    }

    /// Habit strength of `kind`, or the default when never engaged.
    #[must_use]
    pub fn kappa(&self, kind: ActionKind, params: &SsdParams) -> f64 {
        self.kappa
            .get(&kind)
            .copied()
            .unwrap_or(params.kappa_default)
    }

    /// Habit strength of `kind`, registering the default on first use.
    pub fn kappa_or_insert(&mut self, kind: ActionKind, params: &SsdParams) -> f64 {
        *self.kappa.entry(kind).or_insert(params.kappa_default)
    }

    /// Amount of `pressure` the agent can process through `kind`.
    pub fn alignment_flow(&mut self, kind: ActionKind, pressure: f64, params: &SsdParams) -> f64 {
        let kappa = self.kappa_or_insert(kind, params);
        (params.g0 + params.g * kappa) * pressure
    }

    /// Strengthens (success) or weakens (failure) the `kind` habit, then
    /// applies forgetting toward the floor.
    pub fn update_kappa(
        &mut self,
        kind: ActionKind,
        success: bool,
        reward: f64,
        params: &SsdParams,
    ) {
        let kappa = self.kappa_or_insert(kind, params);
        let work = if success {
            params.eta * reward
        } else {
            -params.rho * kappa * kappa
        };
        let decay = params.lambda_forget * (kappa - params.kappa_min);
        self.kappa
            .insert(kind, (kappa + work - decay).max(params.kappa_min));
    }

    /// Accumulates the part of `pressure` left unprocessed and decays the rest.
    pub fn update_heat(&mut self, pressure: f64, processed: f64, params: &SsdParams) {
        let unprocessed = (pressure - processed).max(0.0);
        let next = self.energy + params.alpha * unprocessed - params.beta * self.energy;
        self.energy = if next.is_finite() { next.max(0.0) } else { 0.0 };
    }

    /// Mean habit strength over engaged habits.
    #[must_use]
    pub fn mean_kappa(&self, params: &SsdParams) -> f64 {
        if self.kappa.is_empty() {
            return params.kappa_default;
        }
        self.kappa.values().sum::<f64>() / self.kappa.len() as f64
    }

    /// Population standard deviation of engaged habits.
    #[must_use]
    pub fn dispersion(&self, params: &SsdParams) -> f64 {
        if self.kappa.len() < 2 {
            return params.default_dispersion;
        }
        let mean = self.mean_kappa(params);
        let variance = self
            .kappa
            .values()
            .map(|k| (k - mean).powi(2))
            .sum::<f64>()
            / self.kappa.len() as f64;
        variance.sqrt()
    }

    /// Recomputes `T` from pressure and habit dispersion.
    pub fn update_temperature(&mut self, params: &SsdParams) {
        let raw = params.t0 + params.c1 * self.energy - params.c2 * self.dispersion(params);
        let bounds = params.temperature_bounds;
        self.temperature = clip(raw, bounds.min, bounds.max);
    }

    /// Evaluates the pressure-driven death hazard for the given fatigue.
    pub fn check_leap(
        &self,
        fatigue: f64,
        params: &SsdParams,
        rng: &mut dyn RandomSource,
    ) -> LeapCheck {
        let threshold = params.theta0 + params.a1 * self.mean_kappa(params)
            - params.a2 * (fatigue / 100.0);
        let hazard = params.h0 * ((self.energy - threshold) / params.gamma).exp();
        let probability = if hazard.is_finite() {
            1.0 - (-hazard).exp()
        } else {
            1.0
        };
        LeapCheck {
            fired: rng.chance(probability),
            hazard,
            threshold,
            probability,
        }
    }

    #[cfg(test)]
    pub(crate) fn set_energy(&mut self, energy: f64) {
        self.energy = energy.max(0.0);
    }
}
