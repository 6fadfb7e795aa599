//! CLI output: result tables and error mapping.

use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use owo_colors::OwoColorize;

use crate::error::QueryError;
use crate::results::SparqlResults;

/// Map query errors to a string for CLI output.
pub fn map_error(e: &QueryError) -> String {
    match e {
        QueryError::Status { status, body } => {
            format!("{} endpoint returned {}: {}", "error:".red().bold(), status, body)
        }
        other => format!("{} {}", "error:".red().bold(), other),
    }
}

/// One column per variable; unbound cells are left blank.
pub fn render_results_table(results: &SparqlResults) -> String {
    if let Some(answer) = results.boolean {
        return answer.to_string();
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(results.vars().to_vec());
    for row in results.bindings() {
        let cells: Vec<&str> = results
            .vars()
            .iter()
            .map(|var| row.get(var).map(|term| term.value()).unwrap_or(""))
            .collect();
        table.add_row(cells);
    }

    let count = results.bindings().len();
    let summary = format!("{} row{}", count, if count == 1 { "" } else { "s" });
    format!("{}\n{}", table, summary.dimmed())
}
