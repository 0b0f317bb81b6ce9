//! One-shot trip planning from the shell.

use anyhow::{bail, Context, Result};
use chrono::{Duration as Days, Local, NaiveDate};
use clap::Args;
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use wayfarer_core::{
    AggregatedPlan, BudgetTier, CapabilityResult, Coordinator, PlannerConfig, TripRequest,
};
use wayfarer_llm::{ChatCompletionClient, LlmConfig};

#[derive(Args, Debug)]
pub struct TripArgs {
    #[arg(long)]
    pub destination: Option<String>,

    /// YYYY-MM-DD
    #[arg(long)]
    pub check_in: Option<NaiveDate>,

    /// YYYY-MM-DD
    #[arg(long)]
    pub check_out: Option<NaiveDate>,

    #[arg(long, default_value = "any")]
    pub budget: BudgetTier,

    #[arg(long, default_value_t = 1)]
    pub guests: u32,

    /// Also look for a rental car
    #[arg(long)]
    pub car: bool,

    #[arg(long)]
    pub preferences: Option<String>,
}

impl TripArgs {
    /// Fills missing fields interactively when attached to a terminal.
    fn into_request(self) -> Result<TripRequest> {
        let interactive = console::user_attended();
        let destination = match self.destination {
            Some(destination) => destination,
            None if interactive => Input::<String>::new()
                .with_prompt("Destination")
                .interact_text()?,
            None => bail!("--destination is required"),
        };

        let next_week = Local::now().date_naive() + Days::days(7);
        let check_in = match self.check_in {
            Some(date) => date,
            None if interactive => Input::<NaiveDate>::new()
                .with_prompt("Check-in (YYYY-MM-DD)")
                .default(next_week)
                .interact_text()?,
            None => bail!("--check-in is required"),
        };
        let check_out = match self.check_out {
            Some(date) => date,
            None if interactive => Input::<NaiveDate>::new()
                .with_prompt("Check-out (YYYY-MM-DD)")
                .default(check_in + Days::days(1))
                .interact_text()?,
            None => bail!("--check-out is required"),
        };

        let request = TripRequest {
            destination,
            check_in,
            check_out,
            budget_tier: self.budget,
            guest_count: self.guests,
            car_needed: self.car,
            preferences: self.preferences,
        };
        request.validate()?;
        Ok(request)
    }
}

pub async fn run(trip: TripArgs, json: bool, config: PlannerConfig, llm: LlmConfig) -> Result<()> {
    let request = trip.into_request()?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("Discovering agents...");

    let coordinator = Coordinator::connect(config, Arc::new(ChatCompletionClient::new(llm)))
        .await
        .context("Failed to initialize the coordinator")?;

    spinner.set_message(format!("Planning your trip to {}...", request.destination));
    let outcome = coordinator.plan(request).await;
    spinner.finish_and_clear();
    let plan = outcome?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }
    Ok(())
}

fn print_section(title: &str, result: Option<&CapabilityResult>) {
    println!("{}", style(title).bold().underlined());
    match result {
        Some(result) => println!("{}", result.render_text()),
        None => println!("{}", style("Not requested or no agent answered.").dim()),
    }
    println!();
}

fn print_plan(plan: &AggregatedPlan) {
    println!(
        "{} {} ({} to {})\n",
        style("Trip to").bold(),
        style(&plan.destination).green().bold(),
        plan.dates.check_in,
        plan.dates.check_out
    );

    print_section("Hotels", plan.hotel_results.as_ref());
    if plan.car_results.is_some() {
        print_section("Rental cars", plan.car_results.as_ref());
    }

    println!("{}", style("Itinerary").bold().underlined());
    println!("{}\n", plan.narrative);

    println!("{}", style("Agents").bold().underlined());
    for (name, status) in &plan.per_agent_status {
        let marker = if status.reachable {
            style("ok").green()
        } else {
            style("failed").red()
        };
        match &status.error {
            Some(error) => println!("  {} {} {}ms ({})", marker, name, status.latency_ms, error),
            None => println!("  {} {} {}ms", marker, name, status.latency_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> TripArgs {
        TripArgs {
            destination: Some("Paris".into()),
            check_in: NaiveDate::from_ymd_opt(2025, 11, 11),
            check_out: NaiveDate::from_ymd_opt(2025, 11, 12),
            budget: BudgetTier::Luxury,
            guests: 2,
            car: true,
            preferences: Some("near the Louvre".into()),
        }
    }

    #[test]
    fn test_complete_args_make_a_request() {
        let request = args().into_request().unwrap();
        assert_eq!(request.destination, "Paris");
        assert_eq!(request.nights(), 1);
        assert_eq!(request.budget_tier, BudgetTier::Luxury);
        assert!(request.car_needed);
    }

    #[test]
    fn test_reversed_dates_are_rejected() {
        let mut trip = args();
        trip.check_out = NaiveDate::from_ymd_opt(2025, 11, 10);
        assert!(trip.into_request().is_err());
    }
}
