// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use std::io::Write;

use anyhow::Result;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use serde::Serialize;

use crate::simulate::SimulationReport;
use crate::verify::VerifyOutcome;

/// Pretty-printed JSON followed by a newline.
pub fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

pub fn simulation_table(reports: &[SimulationReport]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "strategy",
        "entries",
        "steps",
        "final pairs",
        "mean pairs",
        "mean update (µs)",
        "max update (µs)",
        "revalidations",
        "parallel steps",
    ]);
    for r in reports {
        table.add_row(vec![
            r.strategy.to_owned(),
            r.entries.to_string(),
            r.steps.to_string(),
            r.final_pairs.to_string(),
            format!("{:.1}", r.mean_pairs),
            format!("{:.1}", r.mean_update_us),
            format!("{:.1}", r.max_update_us),
            r.revalidations.to_string(),
            r.multithreaded_steps.to_string(),
        ]);
    }
    table
}

pub fn verify_table(outcome: &VerifyOutcome) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    if outcome.mismatches.is_empty() {
        table.set_header(vec!["strategy", "steps", "reference pairs", "result"]);
        for name in &outcome.strategies {
            table.add_row(vec![
                name.clone(),
                outcome.steps.to_string(),
                outcome.reference_pairs.to_string(),
                "ok".to_owned(),
            ]);
        }
        return table;
    }
    table.set_header(vec!["step", "strategy", "expected", "actual", "first difference"]);
    for m in &outcome.mismatches {
        table.add_row(vec![
            m.step.to_string(),
            m.strategy.clone(),
            m.expected_pairs.to_string(),
            m.actual_pairs.to_string(),
            m.first_difference.map_or_else(|| "-".to_owned(), |[a, b]| format!("({a}, {b})")),
        ]);
    }
    table
}
