/// Rounds to the cent, half away from zero.
pub fn round_cents(amount: f64) -> f64 {
    let rounded = (amount * 100.0).round() / 100.0;
    // Avoid emitting -0.0 for tiny negative residues.
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Formats an amount as `$1,234,567.89`.
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u128;
    let whole = (cents / 100).to_string();
    let frac = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${grouped}.{frac:02}")
}

/// Yields the monthly amount for each successive year of a stepped-up cash flow.
///
/// The first year pays the base amount. Every later year grows the previous
/// year's amount by `step_up_rate` and then clamps it to `cap`, so the cap only
/// ever lowers a grown value.
#[derive(Debug, Clone)]
pub struct StepUpSchedule {
    next: f64,
    growth: f64,
    cap: Option<f64>,
}

impl StepUpSchedule {
    /// `step_up_rate` is a percentage.
    pub fn new(base_monthly: f64, step_up_rate: f64, cap: Option<f64>) -> Self {
        Self {
            next: base_monthly,
            growth: 1.0 + step_up_rate / 100.0,
            cap,
        }
    }
}

impl Iterator for StepUpSchedule {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let current = self.next;
        let mut grown = current * self.growth;
        if let Some(cap) = self.cap {
            grown = grown.min(cap);
        }
        self.next = grown;
        Some(current)
    }
}
