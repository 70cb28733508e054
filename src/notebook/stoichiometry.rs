// src/notebook/stoichiometry.rs
//! Moles, limiting reagent and equivalents for the reagent rows of an entry.
//!
//! `moles = concentration (mol/L) * volume (mL) / 1000`. The limiting reagent
//! is the first row with the smallest amount; every row's equivalents are
//! its moles divided by the limiting amount. An entry whose limiting amount
//! is zero is rejected rather than stored with undefined equivalents.

use std::fmt;

use super::models::{Reagent, ReagentInput};

#[derive(Debug, Clone, PartialEq)]
pub enum StoichiometryError {
    NoReagents,
    InvalidQuantity { reagent: String, field: &'static str },
    ZeroMoles { reagent: String },
    /// Moles or equivalents overflowed to a non-finite value.
    AmountOutOfRange { reagent: String },
}

impl fmt::Display for StoichiometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoichiometryError::NoReagents => write!(f, "at least one reagent is required"),
            StoichiometryError::InvalidQuantity { reagent, field } => write!(
                f,
                "{} of reagent '{}' must be a finite, non-negative number",
                field, reagent
            ),
            StoichiometryError::ZeroMoles { reagent } => write!(
                f,
                "cannot compute equivalents: at least one reagent has zero moles ({})",
                reagent
            ),
            StoichiometryError::AmountOutOfRange { reagent } => write!(
                f,
                "amount of reagent '{}' is too large to compute",
                reagent
            ),
        }
    }
}

impl std::error::Error for StoichiometryError {}

pub fn moles(concentration: f64, volume_ml: f64) -> f64 {
    concentration * (volume_ml / 1000.0)
}

/// Fills in `moles` and `equivalents` for every row, preserving input order.
pub fn compute_stoichiometry(inputs: &[ReagentInput]) -> Result<Vec<Reagent>, StoichiometryError> {
    if inputs.is_empty() {
        return Err(StoichiometryError::NoReagents);
    }

    for input in inputs {
        check_quantity(input, "concentration", input.concentration)?;
        check_quantity(input, "volume", input.volume)?;
    }

    let amounts: Vec<f64> = inputs
        .iter()
        .map(|input| moles(input.concentration, input.volume))
        .collect();

    if let Some(i) = amounts.iter().position(|m| !m.is_finite()) {
        return Err(StoichiometryError::AmountOutOfRange {
            reagent: inputs[i].name.clone(),
        });
    }

    let limiting = first_minimum(&amounts).ok_or(StoichiometryError::NoReagents)?;
    let limiting_moles = amounts[limiting];
    if limiting_moles == 0.0 {
        return Err(StoichiometryError::ZeroMoles {
            reagent: inputs[limiting].name.clone(),
        });
    }

    inputs
        .iter()
        .zip(amounts)
        .map(|(input, moles)| {
            let equivalents = moles / limiting_moles;
            if !equivalents.is_finite() {
                return Err(StoichiometryError::AmountOutOfRange {
                    reagent: input.name.clone(),
                });
            }
            Ok(Reagent {
                name: input.name.clone(),
                concentration: input.concentration,
                volume: input.volume,
                moles,
                equivalents,
            })
        })
        .collect()
}

/// Index of the limiting reagent (first row with the smallest moles).
pub fn limiting_reagent(reagents: &[Reagent]) -> Option<usize> {
    let amounts: Vec<f64> = reagents.iter().map(|r| r.moles).collect();
    first_minimum(&amounts)
}

fn first_minimum(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, min)) if v >= min => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

fn check_quantity(input: &ReagentInput, field: &'static str, value: f64) -> Result<(), StoichiometryError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(StoichiometryError::InvalidQuantity {
            reagent: input.name.clone(),
            field,
        })
    }
}
