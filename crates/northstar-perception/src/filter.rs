//! Finite-impulse-response smoothing for one raw sensor channel.
//!
//! The filter keeps the last `N` samples (`N` = number of coefficients) and
//! returns their weighted sum.  Coefficient `0` weighs the newest sample.
//! Until the window has filled, the missing slots count as zero, so the
//! first `N - 1` outputs are biased towards zero; check
//! [`FirFilter::is_primed`] before trusting the output.
//!
//! There is no reset.  To start over, build a new filter.

use std::collections::VecDeque;

use northstar_types::NavError;

#[derive(Debug, Clone)]
pub struct FirFilter {
    coefficients: Vec<f32>,
    window: VecDeque<f32>,
}

impl FirFilter {
    /// Build a filter for `channel` from its coefficient vector.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::InvalidFilter`] when the vector is empty or holds a
    /// non-finite value.
    pub fn new(channel: &str, coefficients: Vec<f32>) -> Result<Self, NavError> {
        if coefficients.is_empty() {
            return Err(NavError::InvalidFilter {
                channel: channel.to_string(),
                reason: "no coefficients".to_string(),
            });
        }
        if let Some(bad) = coefficients.iter().find(|c| !c.is_finite()) {
            return Err(NavError::InvalidFilter {
                channel: channel.to_string(),
                reason: format!("non-finite coefficient {bad}"),
            });
        }
        let taps = coefficients.len();
        Ok(Self {
            coefficients,
            window: VecDeque::with_capacity(taps),
        })
    }

    /// Slide `sample` into the window and return the weighted sum.
    pub fn filter(&mut self, sample: f32) -> f32 {
        if self.window.len() == self.coefficients.len() {
            self.window.pop_back();
        }
        self.window.push_front(sample);

        self.coefficients
            .iter()
            .zip(self.window.iter())
            .map(|(c, s)| c * s)
            .sum()
    }

    /// `true` once every slot of the window holds a real sample.
    pub fn is_primed(&self) -> bool {
        self.window.len() == self.coefficients.len()
    }

    /// Number of taps.
    pub fn taps(&self) -> usize {
        self.coefficients.len()
    }

    /// DC gain: the sum of all coefficients.
    pub fn gain(&self) -> f32 {
        self.coefficients.iter().sum()
    }
}
