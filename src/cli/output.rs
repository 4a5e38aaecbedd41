//! Output formatting for CLI

use crate::{presets::DesignAggregates, simulation::SharedContext, trace::SimulationTrace};

/// Print a section header
pub fn print_section(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{title}");
    println!("{}", "=".repeat(60));
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:20} {}", format!("{}:", key), value);
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Per-agent mean and final free energies
pub fn print_trace_summary(trace: &SimulationTrace) {
    for id in trace.agent_ids() {
        print_section(&format!("Agent {id}"));
        let vfe = trace.vfe_series(id);
        let efe = trace.efe_series(id);
        print_kv("Steps", &vfe.len().to_string());
        print_kv("Mean VFE", &format!("{:.4}", mean(&vfe)));
        print_kv("Mean EFE", &format!("{:.4}", mean(&efe)));
        if let Some(last) = trace.last_for(id) {
            print_kv("Final state", &last.state_label);
            print_kv("Final VFE", &format!("{:.4}", last.vfe));
            print_kv("Final EFE", &format!("{:.4}", last.efe));
            print_kv("Final fatigue", &format!("{:.2}", last.fatigue));
            print_kv("Belief entropy", &format!("{:.4}", last.belief_entropy));
        }
    }
}

fn format_distribution(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{v:.3}")).collect();
    format!("[{}]", parts.join(", "))
}

/// Shared observable aggregates after the last step
pub fn print_context_summary(context: &SharedContext, design_triad: bool) {
    print_section("Shared observables");
    match context.engagement() {
        Some(mean) => print_kv("Mean observable", &format_distribution(&mean)),
        None => print_kv("Mean observable", "n/a (observation spaces differ)"),
    }
    if design_triad && let Some(aggregates) = DesignAggregates::from_context(context) {
        print_kv("Engagement", &format_distribution(&aggregates.engagement));
        print_kv("Task success", &format_distribution(&aggregates.task_success));
    }
}
