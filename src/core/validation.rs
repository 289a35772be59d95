use serde::Serialize;
use thiserror::Error;

use super::types::{CalculationInput, JourneyInput};

pub const MAX_YEARS: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every constraint an input violated, in rule-table order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation error: {}", summarize(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::new(field, message)],
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|e| e.field.as_str())
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// One row of a validation table: where to read the value and what it must satisfy.
/// Optional fields that are absent are skipped.
pub struct FieldRule<T> {
    pub field: &'static str,
    pub value: fn(&T) -> Option<f64>,
    pub accepts: fn(f64) -> bool,
    pub message: &'static str,
}

fn years_in_range(v: f64) -> bool {
    v >= 1.0 && v <= MAX_YEARS as f64
}

fn rate_in_range(v: f64) -> bool {
    (0.0..=100.0).contains(&v)
}

pub const CALCULATION_RULES: &[FieldRule<CalculationInput>] = &[
    FieldRule {
        field: "monthly_investment",
        value: |i| Some(i.monthly_investment),
        accepts: |v| v > 0.0,
        message: "must be greater than 0",
    },
    FieldRule {
        field: "time_period_years",
        value: |i| Some(i.time_period_years as f64),
        accepts: years_in_range,
        message: "must be between 1 and 50",
    },
    FieldRule {
        field: "annual_return_rate",
        value: |i| Some(i.annual_return_rate),
        accepts: rate_in_range,
        message: "must be between 0 and 100",
    },
    FieldRule {
        field: "initial_investment",
        value: |i| Some(i.initial_investment),
        accepts: |v| v >= 0.0,
        message: "must be greater than or equal to 0",
    },
    FieldRule {
        field: "annual_step_up_rate",
        value: |i| Some(i.annual_step_up_rate),
        accepts: rate_in_range,
        message: "must be between 0 and 100",
    },
    FieldRule {
        field: "step_up_cap",
        value: |i| i.step_up_cap,
        accepts: |v| v > 0.0,
        message: "must be greater than 0",
    },
];

pub const JOURNEY_RULES: &[FieldRule<JourneyInput>] = &[
    FieldRule {
        field: "monthly_investment",
        value: |i| Some(i.monthly_investment),
        accepts: |v| v > 0.0,
        message: "must be greater than 0",
    },
    FieldRule {
        field: "accumulation_years",
        value: |i| Some(i.accumulation_years as f64),
        accepts: years_in_range,
        message: "must be between 1 and 50",
    },
    FieldRule {
        field: "accumulation_return_rate",
        value: |i| Some(i.accumulation_return_rate),
        accepts: rate_in_range,
        message: "must be between 0 and 100",
    },
    FieldRule {
        field: "initial_investment",
        value: |i| Some(i.initial_investment),
        accepts: |v| v >= 0.0,
        message: "must be greater than or equal to 0",
    },
    FieldRule {
        field: "annual_step_up_rate",
        value: |i| Some(i.annual_step_up_rate),
        accepts: rate_in_range,
        message: "must be between 0 and 100",
    },
    FieldRule {
        field: "step_up_cap",
        value: |i| i.step_up_cap,
        accepts: |v| v > 0.0,
        message: "must be greater than 0",
    },
    FieldRule {
        field: "monthly_withdrawal",
        value: |i| Some(i.monthly_withdrawal),
        accepts: |v| v >= 0.0,
        message: "must be greater than or equal to 0",
    },
    FieldRule {
        field: "withdrawal_years",
        value: |i| Some(i.withdrawal_years as f64),
        accepts: years_in_range,
        message: "must be between 1 and 50",
    },
    FieldRule {
        field: "withdrawal_return_rate",
        value: |i| Some(i.withdrawal_return_rate),
        accepts: rate_in_range,
        message: "must be between 0 and 100",
    },
    FieldRule {
        field: "withdrawal_step_up_rate",
        value: |i| Some(i.withdrawal_step_up_rate),
        accepts: |v| (-50.0..=100.0).contains(&v),
        message: "must be between -50 and 100",
    },
    FieldRule {
        field: "withdrawal_step_up_cap",
        value: |i| i.withdrawal_step_up_cap,
        accepts: |v| v > 0.0,
        message: "must be greater than 0",
    },
];

/// Checks `input` against every rule. Non-finite values always fail.
pub fn check<T>(input: &T, rules: &[FieldRule<T>]) -> Result<(), ValidationError> {
    let errors: Vec<FieldError> = rules
        .iter()
        .filter_map(|rule| {
            let value = (rule.value)(input)?;
            if value.is_finite() && (rule.accepts)(value) {
                None
            } else {
                Some(FieldError::new(rule.field, rule.message))
            }
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { errors })
    }
}

impl CalculationInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check(self, CALCULATION_RULES)
    }
}

impl JourneyInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check(self, JOURNEY_RULES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_journey() -> JourneyInput {
        JourneyInput {
            monthly_investment: 5_000.0,
            accumulation_years: 10,
            accumulation_return_rate: 12.0,
            initial_investment: 0.0,
            annual_step_up_rate: 0.0,
            step_up_cap: None,
            monthly_withdrawal: 50_000.0,
            withdrawal_years: 20,
            withdrawal_return_rate: 8.0,
            withdrawal_step_up_rate: 0.0,
            withdrawal_step_up_cap: None,
        }
    }

    #[test]
    fn valid_calculation_input_passes() {
        let input = CalculationInput::new(5_000.0, 10, 12.0);
        assert_eq!(input.validate(), Ok(()));
    }

    #[test]
    fn rejects_non_positive_monthly_investment() {
        for amount in [0.0, -1_000.0] {
            let err = CalculationInput::new(amount, 10, 12.0)
                .validate()
                .expect_err("must reject non-positive contribution");
            assert_eq!(err.fields().collect::<Vec<_>>(), vec!["monthly_investment"]);
        }
    }

    #[test]
    fn rejects_years_outside_range() {
        for years in [0, 51] {
            let err = CalculationInput::new(5_000.0, years, 12.0)
                .validate()
                .expect_err("must reject duration");
            assert_eq!(err.errors[0].field, "time_period_years");
        }
        assert!(CalculationInput::new(5_000.0, 50, 12.0).validate().is_ok());
        assert!(CalculationInput::new(5_000.0, 1, 12.0).validate().is_ok());
    }

    #[test]
    fn rejects_rate_outside_range() {
        for rate in [-5.0, 101.0] {
            let err = CalculationInput::new(5_000.0, 10, rate)
                .validate()
                .expect_err("must reject rate");
            assert_eq!(err.errors[0].field, "annual_return_rate");
        }
    }

    #[test]
    fn rejects_non_finite_values() {
        let err = CalculationInput::new(f64::NAN, 10, f64::INFINITY)
            .validate()
            .expect_err("must reject NaN and infinity");
        assert_eq!(
            err.fields().collect::<Vec<_>>(),
            vec!["monthly_investment", "annual_return_rate"]
        );
    }

    #[test]
    fn absent_cap_is_skipped_but_zero_cap_is_rejected() {
        let mut input = CalculationInput::new(5_000.0, 10, 12.0);
        assert!(input.validate().is_ok());
        input.step_up_cap = Some(0.0);
        let err = input.validate().expect_err("zero cap is invalid");
        assert_eq!(err.errors[0].field, "step_up_cap");
    }

    #[test]
    fn collects_every_violation_in_table_order() {
        let mut input = sample_journey();
        input.monthly_investment = -1.0;
        input.withdrawal_years = 0;
        input.withdrawal_step_up_rate = -60.0;

        let err = input.validate().expect_err("three violations");
        assert_eq!(
            err.fields().collect::<Vec<_>>(),
            vec!["monthly_investment", "withdrawal_years", "withdrawal_step_up_rate"]
        );
        assert!(err.to_string().contains("withdrawal_step_up_rate: must be between -50 and 100"));
    }

    #[test]
    fn zero_monthly_withdrawal_is_allowed() {
        let mut input = sample_journey();
        input.monthly_withdrawal = 0.0;
        assert!(input.validate().is_ok());
    }

    #[test]
    fn journey_step_up_bounds() {
        let mut input = sample_journey();
        input.withdrawal_step_up_rate = -50.0;
        assert!(input.validate().is_ok());
        input.withdrawal_step_up_rate = 100.0;
        assert!(input.validate().is_ok());
        input.accumulation_years = 51;
        assert!(input.validate().is_err());
    }
}
