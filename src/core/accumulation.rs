use super::money::{StepUpSchedule, round_cents};
use super::types::{AccumulationResult, AccumulationSummary, CalculationInput, YearRecord};
use super::validation::ValidationError;

/// Projects a plan year by year under annual compounding.
///
/// The twelve contributions of a year are treated as a single block: a block
/// made in year `k` has grown for `y - k` whole years by the end of year `y`,
/// so contributions of the current year do not compound yet. The initial lump
/// sum compounds for the full `y` years.
pub fn accumulate(input: &CalculationInput) -> Result<AccumulationResult, ValidationError> {
    input.validate()?;

    let years = input.time_period_years as usize;
    let rate = input.annual_return_rate / 100.0;
    let initial = input.initial_investment;

    let mut schedule =
        StepUpSchedule::new(input.monthly_investment, input.annual_step_up_rate, input.step_up_cap);
    let mut annual_blocks: Vec<f64> = Vec::with_capacity(years);
    let mut yearly_breakdown = Vec::with_capacity(years);
    let mut cumulative_invested = initial;

    for year in 1..=input.time_period_years {
        let monthly = schedule.next().unwrap_or(input.monthly_investment);
        let block = monthly * 12.0;
        annual_blocks.push(block);
        cumulative_invested += block;

        let invested_this_year = if year == 1 { block + initial } else { block };

        let mut future_value = 0.0;
        if initial > 0.0 {
            future_value += initial * growth_factor(rate, year);
        }
        for (k, block) in annual_blocks.iter().enumerate() {
            let years_to_compound = year - (k as u32 + 1);
            future_value += block * growth_factor(rate, years_to_compound);
        }

        yearly_breakdown.push(YearRecord {
            year,
            monthly_contribution: round_cents(monthly),
            invested_this_year: round_cents(invested_this_year),
            cumulative_invested: round_cents(cumulative_invested),
            future_value: round_cents(future_value),
        });
    }

    let future_value = yearly_breakdown
        .last()
        .map(|record| record.future_value)
        .unwrap_or(initial);
    let total_returns = future_value - cumulative_invested;
    let returns_percentage = if cumulative_invested > 0.0 {
        total_returns / cumulative_invested * 100.0
    } else {
        0.0
    };

    Ok(AccumulationResult {
        summary: AccumulationSummary {
            future_value: round_cents(future_value),
            total_invested: round_cents(cumulative_invested),
            total_returns: round_cents(total_returns),
            returns_percentage: round_cents(returns_percentage),
        },
        yearly_breakdown,
    })
}

fn growth_factor(rate: f64, years: u32) -> f64 {
    if years == 0 {
        1.0
    } else {
        (1.0 + rate).powi(years as i32)
    }
}

/// Closed-form future value of a flat plan, `12P((1+r)^n - 1)/r`.
///
/// `annual_rate` is a decimal (0.12 for 12%). Matches [`accumulate`] for flat
/// contributions without an initial lump sum, up to floating-point noise.
pub fn simple_future_value(monthly_investment: f64, years: u32, annual_rate: f64) -> f64 {
    let annual = monthly_investment * 12.0;
    if annual_rate == 0.0 {
        return annual * years as f64;
    }
    annual * (((1.0 + annual_rate).powi(years as i32) - 1.0) / annual_rate)
}
