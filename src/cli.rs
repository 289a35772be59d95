use std::fmt::Write as _;
use std::net::{IpAddr, SocketAddr};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::error;

use crate::api::{DEFAULT_ALLOWED_ORIGINS, JourneyResponse, ServerConfig, SipResponse, run_http_server};
use crate::core::{
    AccumulationResult, CalculationInput, JourneyInput, JourneyResult, Phase, ValidationError,
    accumulate, format_currency, run_journey,
};

#[derive(Parser, Debug)]
#[command(
    name = "sipcalc",
    version,
    about = "SIP and money-journey projections under annual compounding"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API over HTTP
    Serve(ServeArgs),
    /// Project a systematic investment plan
    Sip(SipArgs),
    /// Project accumulation followed by withdrawals
    Journey(JourneyArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, env = "SIPCALC_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,
    #[arg(long, env = "SIPCALC_PORT", default_value_t = 8000)]
    pub port: u16,
    #[arg(
        long = "allowed-origin",
        env = "SIPCALC_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_values_t = DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()),
        help = "Origin allowed to call the API cross-origin; repeatable, '*' allows any"
    )]
    pub allowed_origins: Vec<String>,
}

impl From<ServeArgs> for ServerConfig {
    fn from(args: ServeArgs) -> Self {
        ServerConfig {
            addr: SocketAddr::new(args.host, args.port),
            allowed_origins: args.allowed_origins,
        }
    }
}

#[derive(Args, Debug)]
pub struct SipArgs {
    #[arg(long)]
    pub monthly_investment: f64,
    #[arg(long, help = "Investment period in whole years (1-50)")]
    pub years: u32,
    #[arg(long, help = "Expected annual return in percent, e.g. 12")]
    pub annual_return_rate: f64,
    #[arg(long, default_value_t = 0.0)]
    pub initial_investment: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Yearly increase of the monthly contribution in percent"
    )]
    pub step_up_rate: f64,
    #[arg(long, help = "Ceiling for the stepped-up monthly contribution")]
    pub step_up_cap: Option<f64>,
    #[arg(long, help = "Print the JSON envelope instead of a table")]
    pub json: bool,
}

impl From<&SipArgs> for CalculationInput {
    fn from(args: &SipArgs) -> Self {
        CalculationInput {
            monthly_investment: args.monthly_investment,
            time_period_years: args.years,
            annual_return_rate: args.annual_return_rate,
            initial_investment: args.initial_investment,
            annual_step_up_rate: args.step_up_rate,
            step_up_cap: args.step_up_cap,
        }
    }
}

#[derive(Args, Debug)]
pub struct JourneyArgs {
    #[arg(long)]
    pub monthly_investment: f64,
    #[arg(long, help = "Accumulation period in whole years (1-50)")]
    pub accumulation_years: u32,
    #[arg(long, help = "Expected annual return while accumulating, in percent")]
    pub accumulation_return_rate: f64,
    #[arg(long, default_value_t = 0.0)]
    pub initial_investment: f64,
    #[arg(long, default_value_t = 0.0)]
    pub step_up_rate: f64,
    #[arg(long)]
    pub step_up_cap: Option<f64>,
    #[arg(long, help = "Monthly withdrawal; 0 models a passive growth phase")]
    pub monthly_withdrawal: f64,
    #[arg(long, help = "Withdrawal period in whole years (1-50)")]
    pub withdrawal_years: u32,
    #[arg(long, help = "Expected annual return while withdrawing, in percent")]
    pub withdrawal_return_rate: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        allow_negative_numbers = true,
        help = "Yearly change of the monthly withdrawal in percent (-50 to 100)"
    )]
    pub withdrawal_step_up_rate: f64,
    #[arg(long)]
    pub withdrawal_step_up_cap: Option<f64>,
    #[arg(long)]
    pub json: bool,
}

impl From<&JourneyArgs> for JourneyInput {
    fn from(args: &JourneyArgs) -> Self {
        JourneyInput {
            monthly_investment: args.monthly_investment,
            accumulation_years: args.accumulation_years,
            accumulation_return_rate: args.accumulation_return_rate,
            initial_investment: args.initial_investment,
            annual_step_up_rate: args.step_up_rate,
            step_up_cap: args.step_up_cap,
            monthly_withdrawal: args.monthly_withdrawal,
            withdrawal_years: args.withdrawal_years,
            withdrawal_return_rate: args.withdrawal_return_rate,
            withdrawal_step_up_rate: args.withdrawal_step_up_rate,
            withdrawal_step_up_cap: args.withdrawal_step_up_cap,
        }
    }
}

pub async fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Serve(args) => {
            if let Err(e) = run_http_server(args.into()).await {
                error!(error = %e, "server error");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Command::Sip(args) => report(sip_output(&args)),
        Command::Journey(args) => report(journey_output(&args)),
    }
}

fn report(output: Result<String, ValidationError>) -> ExitCode {
    match output {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Validation error:");
            for field in &err.errors {
                eprintln!("  --{}: {}", field.field.replace('_', "-"), field.message);
            }
            ExitCode::from(2)
        }
    }
}

pub fn sip_output(args: &SipArgs) -> Result<String, ValidationError> {
    let input = CalculationInput::from(args);
    let result = accumulate(&input)?;
    if args.json {
        return Ok(to_json(&SipResponse::new(&input, &result)));
    }
    Ok(render_sip_table(&result))
}

pub fn journey_output(args: &JourneyArgs) -> Result<String, ValidationError> {
    let input = JourneyInput::from(args);
    let result = run_journey(&input)?;
    if args.json {
        return Ok(to_json(&JourneyResponse::new(&input, &result)));
    }
    Ok(render_journey_table(&result))
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    // Response envelopes only hold plain numbers, strings and options.
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
}

fn render_sip_table(result: &AccumulationResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:>16}  {:>18}  {:>18}  {:>18}",
        "Year", "Monthly", "Invested", "Cumulative", "Value"
    );
    for row in &result.yearly_breakdown {
        let _ = writeln!(
            out,
            "{:>4}  {:>16}  {:>18}  {:>18}  {:>18}",
            row.year,
            format_currency(row.monthly_contribution),
            format_currency(row.invested_this_year),
            format_currency(row.cumulative_invested),
            format_currency(row.future_value),
        );
    }
    let s = &result.summary;
    let _ = writeln!(out);
    let _ = writeln!(out, "Future value:   {}", format_currency(s.future_value));
    let _ = writeln!(out, "Total invested: {}", format_currency(s.total_invested));
    let _ = write!(
        out,
        "Total returns:  {} ({:.2}%)",
        format_currency(s.total_returns),
        s.returns_percentage
    );
    out
}

fn render_journey_table(result: &JourneyResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:<12}  {:>16}  {:>18}  {:>18}",
        "Year", "Phase", "Monthly", "Annual", "Balance"
    );
    for row in &result.yearly_breakdown {
        let phase = match row.phase {
            Phase::Accumulation => "accumulation",
            Phase::Withdrawal => "withdrawal",
        };
        let _ = writeln!(
            out,
            "{:>4}  {:<12}  {:>16}  {:>18}  {:>18}",
            row.year,
            phase,
            format_currency(row.monthly_amount),
            format_currency(row.annual_amount),
            format_currency(row.balance),
        );
    }
    let s = &result.summary;
    let _ = writeln!(out);
    let _ = writeln!(out, "Corpus at retirement: {}", format_currency(s.corpus_at_retirement));
    let _ = writeln!(out, "Total contributions:  {}", format_currency(s.total_contributions));
    let _ = writeln!(out, "Total withdrawals:    {}", format_currency(s.total_withdrawals));
    let _ = write!(out, "Final balance:        {}", format_currency(s.final_balance));
    if let Some(year) = s.depletion_year {
        let _ = write!(out, "\nCorpus depleted in year {year}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("valid arguments")
    }

    #[test]
    fn sip_subcommand_maps_to_calculation_input() {
        let cli = parse(&[
            "sipcalc",
            "sip",
            "--monthly-investment",
            "5000",
            "--years",
            "3",
            "--annual-return-rate",
            "10",
            "--initial-investment",
            "100000",
        ]);
        let Command::Sip(args) = cli.command else {
            panic!("expected sip subcommand");
        };
        let input = CalculationInput::from(&args);
        assert_eq!(input.time_period_years, 3);
        assert_eq!(input.initial_investment, 100_000.0);
        assert_eq!(input.annual_step_up_rate, 0.0);
        assert_eq!(input.step_up_cap, None);

        let text = sip_output(&args).expect("valid input");
        assert!(text.contains("Future value:   $331,700.00"));
        assert!(text.contains("Total invested: $280,000.00"));
    }

    #[test]
    fn journey_subcommand_accepts_negative_step_up() {
        let cli = parse(&[
            "sipcalc",
            "journey",
            "--monthly-investment",
            "0.01",
            "--accumulation-years",
            "1",
            "--accumulation-return-rate",
            "0",
            "--initial-investment",
            "1000000",
            "--monthly-withdrawal",
            "10000",
            "--withdrawal-years",
            "3",
            "--withdrawal-return-rate",
            "0",
            "--withdrawal-step-up-rate",
            "-10",
        ]);
        let Command::Journey(args) = cli.command else {
            panic!("expected journey subcommand");
        };
        assert_eq!(args.withdrawal_step_up_rate, -10.0);

        let text = journey_output(&args).expect("valid input");
        assert!(text.contains("$9,000.00"));
        assert!(text.contains("$8,100.00"));
        assert!(!text.contains("depleted"));
    }

    #[test]
    fn journey_table_reports_depletion_year() {
        let cli = parse(&[
            "sipcalc",
            "journey",
            "--monthly-investment",
            "0.01",
            "--accumulation-years",
            "1",
            "--accumulation-return-rate",
            "0",
            "--initial-investment",
            "100000",
            "--monthly-withdrawal",
            "3000",
            "--withdrawal-years",
            "10",
            "--withdrawal-return-rate",
            "0",
        ]);
        let Command::Journey(args) = cli.command else {
            panic!("expected journey subcommand");
        };
        let text = journey_output(&args).expect("valid input");
        assert!(text.ends_with("Corpus depleted in year 4"));
    }

    #[test]
    fn sip_json_flag_prints_envelope() {
        let cli = parse(&[
            "sipcalc",
            "sip",
            "--monthly-investment",
            "1000",
            "--years",
            "10",
            "--annual-return-rate",
            "0",
            "--json",
        ]);
        let Command::Sip(args) = cli.command else {
            panic!("expected sip subcommand");
        };
        let text = sip_output(&args).expect("valid input");
        let value: serde_json::Value = serde_json::from_str(&text).expect("JSON output");
        assert_eq!(value["results"]["future_value"], 120_000.0);
        assert_eq!(value["results"]["total_returns"], 0.0);
    }

    #[test]
    fn sip_output_surfaces_validation_errors() {
        let cli = parse(&[
            "sipcalc",
            "sip",
            "--monthly-investment",
            "5000",
            "--years",
            "60",
            "--annual-return-rate",
            "12",
        ]);
        let Command::Sip(args) = cli.command else {
            panic!("expected sip subcommand");
        };
        let err = sip_output(&args).expect_err("60 years is out of range");
        assert_eq!(err.errors[0].field, "time_period_years");
    }

    #[test]
    fn serve_defaults_and_origin_list() {
        let cli = parse(&["sipcalc", "serve", "--port", "9000"]);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve subcommand");
        };
        let config = ServerConfig::from(args);
        assert_eq!(config.addr.port(), 9000);
        assert_eq!(config.allowed_origins.len(), DEFAULT_ALLOWED_ORIGINS.len());

        let cli = parse(&[
            "sipcalc",
            "serve",
            "--allowed-origin",
            "https://a.example,https://b.example",
        ]);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve subcommand");
        };
        assert_eq!(
            args.allowed_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }
}
