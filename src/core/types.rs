use serde::Serialize;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Accumulation,
    Withdrawal,
}

/// Parameters of a systematic investment plan. Rates are percentages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationInput {
    pub monthly_investment: f64,
    pub time_period_years: u32,
    pub annual_return_rate: f64,
    pub initial_investment: f64,
    pub annual_step_up_rate: f64,
    pub step_up_cap: Option<f64>,
}

impl CalculationInput {
    /// Flat plan with no lump sum and no step-up.
    pub fn new(monthly_investment: f64, time_period_years: u32, annual_return_rate: f64) -> Self {
        Self {
            monthly_investment,
            time_period_years,
            annual_return_rate,
            initial_investment: 0.0,
            annual_step_up_rate: 0.0,
            step_up_cap: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearRecord {
    pub year: u32,
    pub monthly_contribution: f64,
    pub invested_this_year: f64,
    pub cumulative_invested: f64,
    pub future_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccumulationSummary {
    pub future_value: f64,
    pub total_invested: f64,
    pub total_returns: f64,
    pub returns_percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccumulationResult {
    pub summary: AccumulationSummary,
    pub yearly_breakdown: Vec<YearRecord>,
}

/// Accumulation followed by a withdrawal phase over the resulting corpus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JourneyInput {
    pub monthly_investment: f64,
    pub accumulation_years: u32,
    pub accumulation_return_rate: f64,
    pub initial_investment: f64,
    pub annual_step_up_rate: f64,
    pub step_up_cap: Option<f64>,
    pub monthly_withdrawal: f64,
    pub withdrawal_years: u32,
    pub withdrawal_return_rate: f64,
    pub withdrawal_step_up_rate: f64,
    pub withdrawal_step_up_cap: Option<f64>,
}

impl JourneyInput {
    pub fn accumulation_input(&self) -> CalculationInput {
        CalculationInput {
            monthly_investment: self.monthly_investment,
            time_period_years: self.accumulation_years,
            annual_return_rate: self.accumulation_return_rate,
            initial_investment: self.initial_investment,
            annual_step_up_rate: self.annual_step_up_rate,
            step_up_cap: self.step_up_cap,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JourneyYearRecord {
    pub year: u32,
    pub phase: Phase,
    pub monthly_amount: f64,
    pub annual_amount: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JourneySummary {
    pub corpus_at_retirement: f64,
    pub total_contributions: f64,
    pub total_withdrawals: f64,
    pub final_balance: f64,
    pub depleted: bool,
    pub depletion_year: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JourneyResult {
    pub summary: JourneySummary,
    pub yearly_breakdown: Vec<JourneyYearRecord>,
}
