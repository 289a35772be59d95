use super::accumulation::accumulate;
use super::money::{StepUpSchedule, round_cents};
use super::types::{JourneyInput, JourneyResult, JourneySummary, JourneyYearRecord, Phase};
use super::validation::ValidationError;

/// Runs the accumulation phase, then draws the corpus down year by year.
///
/// Withdrawals happen at the start of each year and the remainder compounds at
/// the withdrawal rate. A year that cannot fund the full withdrawal takes what
/// is left and ends the corpus; every later year reports zeros.
pub fn run_journey(input: &JourneyInput) -> Result<JourneyResult, ValidationError> {
    input.validate()?;

    let accumulation = accumulate(&input.accumulation_input())?;
    let corpus_at_retirement = accumulation.summary.future_value;
    let total_years = (input.accumulation_years + input.withdrawal_years) as usize;

    let mut yearly_breakdown: Vec<JourneyYearRecord> = Vec::with_capacity(total_years);
    yearly_breakdown.extend(accumulation.yearly_breakdown.iter().map(|record| {
        JourneyYearRecord {
            year: record.year,
            phase: Phase::Accumulation,
            monthly_amount: record.monthly_contribution,
            annual_amount: record.invested_this_year,
            balance: record.future_value,
        }
    }));

    let growth = 1.0 + input.withdrawal_return_rate / 100.0;
    let mut schedule = StepUpSchedule::new(
        input.monthly_withdrawal,
        input.withdrawal_step_up_rate,
        input.withdrawal_step_up_cap,
    );
    let mut balance = corpus_at_retirement;
    let mut total_withdrawals = 0.0;
    let mut depletion_year: Option<u32> = None;

    for offset in 1..=input.withdrawal_years {
        let year = input.accumulation_years + offset;
        let monthly = schedule.next().unwrap_or(input.monthly_withdrawal);
        let annual = monthly * 12.0;

        let record = if balance <= 0.0 {
            depletion_year.get_or_insert(year);
            withdrawal_record(year, 0.0, 0.0, 0.0)
        } else if balance < annual {
            let remaining = balance;
            total_withdrawals += remaining;
            balance = 0.0;
            depletion_year.get_or_insert(year);
            withdrawal_record(year, remaining / 12.0, remaining, 0.0)
        } else {
            balance = (balance - annual) * growth;
            total_withdrawals += annual;
            if balance <= 0.0 {
                depletion_year.get_or_insert(year);
            }
            withdrawal_record(year, monthly, annual, balance)
        };
        yearly_breakdown.push(record);
    }

    Ok(JourneyResult {
        summary: JourneySummary {
            corpus_at_retirement: round_cents(corpus_at_retirement),
            total_contributions: round_cents(accumulation.summary.total_invested),
            total_withdrawals: round_cents(total_withdrawals),
            final_balance: round_cents(balance),
            depleted: depletion_year.is_some(),
            depletion_year,
        },
        yearly_breakdown,
    })
}

fn withdrawal_record(year: u32, monthly: f64, annual: f64, balance: f64) -> JourneyYearRecord {
    JourneyYearRecord {
        year,
        phase: Phase::Withdrawal,
        monthly_amount: round_cents(monthly),
        annual_amount: round_cents(annual),
        balance: round_cents(balance),
    }
}
