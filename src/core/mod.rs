mod accumulation;
mod journey;
mod money;
mod types;
mod validation;

pub use accumulation::{accumulate, simple_future_value};
pub use journey::run_journey;
pub use money::{StepUpSchedule, format_currency, round_cents};
pub use types::{
    AccumulationResult, AccumulationSummary, CalculationInput, JourneyInput, JourneyResult,
    JourneySummary, JourneyYearRecord, Phase, YearRecord,
};
pub use validation::{
    CALCULATION_RULES, FieldError, FieldRule, JOURNEY_RULES, MAX_YEARS, ValidationError, check,
};
