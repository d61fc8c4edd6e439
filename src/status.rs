use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::i18n::I18nManager;

pub const ALERT_PERCENT: Decimal = Decimal::from_parts(80, 0, 0, false, 0);
pub const EXCEEDED_PERCENT: Decimal = Decimal::ONE_HUNDRED;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum StatusState {
    Normal,
    Alert,
    Exceeded,
}

impl StatusState {
    pub const fn catalog_key(self) -> &'static str {
        match self {
            StatusState::Normal => "status.normal",
            StatusState::Alert => "status.alert",
            StatusState::Exceeded => "status.exceeded",
        }
    }

    pub fn label(self, i18n: &I18nManager) -> String {
        i18n.t(self.catalog_key())
    }
}

/// Progress of a budget (spent vs. limit) or goal (saved vs. target).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StatusReport {
    /// Share of the limit used, clamped to `0..=100`.
    pub percentage: Decimal,
    pub state: StatusState,
}

impl StatusReport {
    /// A goal is complete once its target is reached.
    pub fn is_completed(&self) -> bool {
        self.state == StatusState::Exceeded
    }

    /// Label for a savings goal, which reads as completed rather than
    /// exceeded once the target is reached.
    pub fn goal_label(&self, i18n: &I18nManager) -> String {
        if self.is_completed() {
            i18n.t("status.completed")
        } else {
            self.state.label(i18n)
        }
    }

    /// Whole percent for progress bar widths.
    pub fn percentage_rounded(&self) -> u32 {
        self.percentage.round().to_u32().unwrap_or(0)
    }
}

/// Classifies `spent` against `limit`.
///
/// The state is taken from the unclamped ratio: 100% or more is
/// `Exceeded`, 80% or more is `Alert`. A non-positive limit yields 0% and
/// `Normal`. A ratio too large to represent counts as fully exceeded.
pub fn derive(spent: Decimal, limit: Decimal) -> StatusReport {
    if limit <= Decimal::ZERO {
        return StatusReport {
            percentage: Decimal::ZERO,
            state: StatusState::Normal,
        };
    }

    let Some(ratio) = spent
        .checked_div(limit)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
    else {
        return StatusReport {
            percentage: Decimal::ONE_HUNDRED,
            state: StatusState::Exceeded,
        };
    };

    let state = if ratio >= EXCEEDED_PERCENT {
        StatusState::Exceeded
    } else if ratio >= ALERT_PERCENT {
        StatusState::Alert
    } else {
        StatusState::Normal
    };

    StatusReport {
        percentage: ratio.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED),
        state,
    }
}

/// [`derive`] for float inputs; non-finite values count as zero.
///
/// Classification compares the inputs directly, so magnitudes outside the
/// decimal range still land in the right state.
pub fn derive_f64(spent: f64, limit: f64) -> StatusReport {
    let spent = finite_or_zero(spent);
    let limit = finite_or_zero(limit);
    if limit <= 0.0 {
        return StatusReport {
            percentage: Decimal::ZERO,
            state: StatusState::Normal,
        };
    }

    // spent / limit >= 0.8 without the division.
    let state = if spent >= limit {
        StatusState::Exceeded
    } else if spent * 1.25 >= limit {
        StatusState::Alert
    } else {
        StatusState::Normal
    };

    let percentage = (spent / limit * 100.0).clamp(0.0, 100.0);
    StatusReport {
        percentage: decimal_from_f64(percentage).unwrap_or_default(),
        state,
    }
}

/// What is left of `limit`; negative once it is overspent.
pub fn remaining(spent: Decimal, limit: Decimal) -> Decimal {
    limit.saturating_sub(spent)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

fn decimal_from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_str(&format!("{value:.18}"))
        .ok()
        .or_else(|| Decimal::from_f64_retain(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(spent: i64, limit: i64) -> StatusReport {
        derive(Decimal::from(spent), Decimal::from(limit))
    }

    #[test]
    fn thresholds() {
        assert_eq!(
            report(0, 100),
            StatusReport { percentage: Decimal::ZERO, state: StatusState::Normal }
        );
        assert_eq!(
            report(79, 100),
            StatusReport { percentage: Decimal::from(79), state: StatusState::Normal }
        );
        assert_eq!(
            report(80, 100),
            StatusReport { percentage: Decimal::from(80), state: StatusState::Alert }
        );
        assert_eq!(
            report(100, 100),
            StatusReport { percentage: Decimal::ONE_HUNDRED, state: StatusState::Exceeded }
        );
    }

    #[test]
    fn percentage_is_clamped_but_state_is_not() {
        let over = report(150, 100);
        assert_eq!(over.percentage, Decimal::ONE_HUNDRED);
        assert_eq!(over.state, StatusState::Exceeded);

        let refund = report(-20, 100);
        assert_eq!(refund.percentage, Decimal::ZERO);
        assert_eq!(refund.state, StatusState::Normal);
    }

    #[test]
    fn non_positive_limit_is_safe() {
        assert_eq!(
            report(10, 0),
            StatusReport { percentage: Decimal::ZERO, state: StatusState::Normal }
        );
        assert_eq!(report(10, -5).state, StatusState::Normal);
    }

    #[test]
    fn fractional_amounts_keep_exact_thresholds() {
        let spent = Decimal::new(4000, 2);
        let limit = Decimal::new(5000, 2);
        assert_eq!(derive(spent, limit).state, StatusState::Alert);
        assert_eq!(derive(Decimal::new(7999, 2), Decimal::ONE_HUNDRED).state, StatusState::Normal);
    }

    #[test]
    fn overflowing_ratio_counts_as_exceeded() {
        let tiny = Decimal::new(1, 28);
        let result = derive(Decimal::MAX, tiny);
        assert_eq!(result.percentage, Decimal::ONE_HUNDRED);
        assert!(result.is_completed());
    }

    #[test]
    fn derivation_is_deterministic() {
        let first = report(333, 1000);
        let second = report(333, 1000);
        assert_eq!(first, second);
    }

    #[test]
    fn float_inputs() {
        assert_eq!(derive_f64(40.0, 50.0).state, StatusState::Alert);
        assert_eq!(derive_f64(f64::NAN, 50.0).percentage, Decimal::ZERO);
        assert_eq!(derive_f64(10.0, f64::INFINITY).state, StatusState::Normal);
        assert_eq!(derive_f64(79.9, 100.0).state, StatusState::Normal);
        assert_eq!(derive_f64(-5.0, 100.0).percentage, Decimal::ZERO);
    }

    #[test]
    fn float_magnitudes_beyond_decimal_range() {
        let exceeded = StatusReport {
            percentage: Decimal::ONE_HUNDRED,
            state: StatusState::Exceeded,
        };
        assert_eq!(derive_f64(1e29, 100.0), exceeded);
        assert_eq!(derive_f64(150.0, 1e-30), exceeded);
        assert_eq!(derive_f64(1e300, 1e300), exceeded);
        assert_eq!(derive_f64(1.0, 1e29).state, StatusState::Normal);
        assert_eq!(derive_f64(5.0, -1e-30).state, StatusState::Normal);
    }

    #[test]
    fn goal_completion_and_remaining() {
        assert!(report(5000, 5000).is_completed());
        assert!(!report(4999, 5000).is_completed());
        assert_eq!(remaining(Decimal::from(120), Decimal::from(100)), Decimal::from(-20));
        assert_eq!(report(2, 3).percentage_rounded(), 67);
    }

    #[test]
    fn labels_are_localized() {
        let es = I18nManager::with_locale("es");
        assert_eq!(StatusState::Exceeded.label(&es), "Excedido");
        assert_eq!(StatusState::Alert.label(&I18nManager::with_locale("en")), "Alert");
        assert_eq!(report(120, 100).goal_label(&es), "Completada");
        assert_eq!(report(50, 100).goal_label(&es), "Normal");
    }
}
