use crate::models::FinalReport;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Output format options
#[derive(Debug, Clone, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    Plain,
    Json,
}

/// Print the evaluation report in the specified format
pub fn print_report(report: &FinalReport, format: OutputFormat) {
    match format {
        OutputFormat::Plain => print_plain(report),
        OutputFormat::Json => print_json(report),
    }
}

/// Print the report in plain text format
fn print_plain(report: &FinalReport) {
    println!("📊 VARIANT COMPARISON ({} sampled reviews)", report.sample_size);
    println!("{}", "-".repeat(88));
    println!(
        "{:<8} {:<9} {:<7} {:<9} {:<7} {:<7} {:<9} {:<9} {:<9}",
        "Variant", "Attempts", "Valid", "Accuracy", "MAE", "RMSE", "Validity", "Off-by-1", "Off-by-2+"
    );
    for variant in &report.variants {
        println!(
            "{:<8} {:<9} {:<7} {:<9.3} {:<7.3} {:<7.3} {:<9.3} {:<9.3} {:<9.3}",
            variant.variant.id(),
            variant.attempts,
            variant.valid,
            variant.accuracy,
            variant.mae,
            variant.rmse,
            variant.validity_rate,
            variant.off_by_1_fraction,
            variant.off_by_2_plus_fraction
        );
    }
    println!();

    if !report.shortfalls.is_empty() {
        println!("⚠️  SAMPLING SHORTFALLS");
        for shortfall in &report.shortfalls {
            println!(
                "  • {}-star class: requested {}, corpus had {}",
                shortfall.stars, shortfall.requested, shortfall.available
            );
        }
        println!();
    }

    print_reliability_plain(report);
    print_insights_plain(report);
}

fn print_reliability_plain(report: &FinalReport) {
    let reliability = &report.reliability;
    if reliability.rows.is_empty() {
        return;
    }

    println!(
        "🔁 RELIABILITY ({} x {} repeats)",
        reliability.variant.id(),
        reliability.repeats
    );
    println!("{:<8} {:<20} {:<10}", "Review", "Observed", "Agreement");
    for row in &reliability.rows {
        let observed: Vec<String> = row
            .observed_ratings
            .iter()
            .map(|r| r.to_string())
            .collect();
        println!(
            "{:<8} {:<20} {:<10}",
            row.review_index,
            observed.join(","),
            if row.agreement { "yes" } else { "no" }
        );
    }
    println!("Agreement rate: {:.2}", reliability.agreement_rate);
    println!();
}

fn print_insights_plain(report: &FinalReport) {
    if report.insights.is_empty() {
        return;
    }

    println!("📝 INSIGHTS");
    for result in &report.insights {
        match &result.insight {
            Some(insight) => {
                println!("Review #{} [{:?}]", result.review_index, insight.sentiment);
                println!("  {}", insight.summary);
                for action in &insight.actions {
                    println!("  • {}", action);
                }
            }
            None => println!("Review #{}: insight generation failed", result.review_index),
        }
    }
    println!();
}

/// Print the report in JSON format
fn print_json(report: &FinalReport) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing report to JSON: {}", e),
    }
}
