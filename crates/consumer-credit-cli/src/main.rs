mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::consumer_credit::{AmortizationArgs, LoanCostArgs};
use commands::time_value::{ExpenseAmountArgs, IrrArgs, PaymentArgs};

/// Consumer-credit cost calculations
#[derive(Parser)]
#[command(
    name = "tae",
    version,
    about = "Consumer-credit cost calculations (TAE, instalments, amortisation)",
    long_about = "A CLI for computing the true annual cost (TAE) of consumer instalment \
                  loans with decimal precision: level monthly payments, cost of credit \
                  including opening, monthly and annual expenses, IRR and amortisation \
                  tables."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute instalment, TAE and cost breakdown including expenses
    LoanCost(LoanCostArgs),
    /// Build the month-by-month amortisation table
    Amortization(AmortizationArgs),
    /// Level monthly payment for a principal, TIN and term
    Payment(PaymentArgs),
    /// Periodic internal rate of return of a cash-flow series
    Irr(IrrArgs),
    /// Resolve an expense (percent of principal or fixed amount) to an amount
    ExpenseAmount(ExpenseAmountArgs),
    /// Print a loan input template with the default expenses
    Template,
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::LoanCost(args) => commands::consumer_credit::run_loan_cost(args),
        Commands::Amortization(args) => commands::consumer_credit::run_amortization(args),
        Commands::Payment(args) => commands::time_value::run_payment(args),
        Commands::Irr(args) => commands::time_value::run_irr(args),
        Commands::ExpenseAmount(args) => commands::time_value::run_expense_amount(args),
        Commands::Template => commands::consumer_credit::run_template(),
        Commands::Version => {
            println!("tae {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            log::debug!("command failed: {e:?}");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_loan_cost_with_expenses() {
        let cli = Cli::try_parse_from([
            "tae",
            "loan-cost",
            "--principal",
            "10000",
            "--tin",
            "5.99",
            "--months",
            "60",
            "--expense",
            "initial:currency:300",
            "--expense",
            "annual:currency:120:Seguro Vida",
            "--output",
            "minimal",
        ])
        .unwrap();
        assert!(matches!(cli.output, OutputFormat::Minimal));
        match cli.command {
            Commands::LoanCost(args) => {
                assert_eq!(args.expenses.len(), 2);
                assert_eq!(args.months, Some(60));
            }
            _ => panic!("expected loan-cost"),
        }
    }

    #[test]
    fn test_parse_irr_negative_flows() {
        let cli = Cli::try_parse_from(["tae", "irr", "--cash-flows", "1000,-520,-520", "--strict"])
            .unwrap();
        match cli.command {
            Commands::Irr(args) => {
                assert_eq!(args.cash_flows.len(), 3);
                assert!(args.strict);
            }
            _ => panic!("expected irr"),
        }
    }

    #[test]
    fn test_irr_command_output() {
        let value = commands::time_value::run_irr(IrrArgs {
            cash_flows: vec![
                rust_decimal_macros::dec!(1000),
                rust_decimal_macros::dec!(-550),
                rust_decimal_macros::dec!(-550),
            ],
            guess: None,
            strict: true,
        })
        .unwrap();
        assert_eq!(value["iterations"].as_u64().map(|n| n > 0), Some(true));
        assert!(value["rate"].is_string());
    }

    #[test]
    fn test_payment_command_zero_months_fails() {
        let err = commands::time_value::run_payment(PaymentArgs {
            principal: rust_decimal_macros::dec!(1000),
            tin: rust_decimal_macros::dec!(5),
            months: 0,
        })
        .unwrap_err();
        assert!(err.to_string().contains("months"));
    }
}
