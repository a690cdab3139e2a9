use std::fs;
use std::path::Path;

use crate::constants::TRACE_COLUMN_WIDTH;
use crate::error::InputError;
use crate::simulation::RunReport;

/// Parse a reference string: non-negative integers separated by commas
/// and/or whitespace.
pub fn parse_references(content: &str) -> Result<Vec<usize>, InputError> {
    let references = content
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<usize>()
                .map_err(|_| InputError::InvalidReference { token: token.to_string() })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if references.is_empty() {
        return Err(InputError::Empty);
    }
    Ok(references)
}

pub fn read_references<P: AsRef<Path>>(path: P) -> Result<Vec<usize>, InputError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|source| InputError::Io { path: path.to_path_buf(), source })?;
    parse_references(&content)
}

/// Write the physical address of every step, space separated, with -1 for
/// the step that stopped the run.
pub fn write_results<P: AsRef<Path>>(path: P, report: &RunReport) -> Result<(), InputError> {
    let path = path.as_ref();
    let output: Vec<String> = report.physical_addresses().iter().map(|pa| pa.to_string()).collect();
    fs::write(path, output.join(" "))
        .map_err(|source| InputError::Io { path: path.to_path_buf(), source })
}

/// Step-by-step table of a run followed by its summary
pub fn render_trace(report: &RunReport) -> String {
    let w = TRACE_COLUMN_WIDTH;

    let frame_headers: Vec<String> =
        (0..report.num_frames).map(|frame| format!("{:<w$}", format!("Frame{}", frame))).collect();
    let header = format!(
        "{:<4} {:<5} {} {:<13} {}",
        "Ref",
        "Page",
        frame_headers.join(" "),
        "Result",
        "Action"
    );

    let mut lines = vec![header.clone(), "-".repeat(header.len())];
    for step in &report.steps {
        let cells: Vec<String> = step
            .frames
            .iter()
            .map(|slot| match slot {
                Some(owner) => format!("{:<w$}", owner.page),
                None => format!("{:<w$}", "-"),
            })
            .collect();
        let row = format!(
            "{:<4} {:<5} {} {:<13} {}",
            step.step,
            step.outcome.page,
            cells.join(" "),
            step.status().tag(),
            step.action()
        );
        lines.push(row.trim_end().to_string());
    }

    if let Some(failure) = &report.error {
        lines.push(format!("{:<4} {:<5} stopped: {}", failure.step, failure.reference, failure.error));
    }

    format!("{}\n\n{}", lines.join("\n"), render_summary(report))
}

pub fn render_summary(report: &RunReport) -> String {
    let lines = [
        format!("Policy:           {}", report.policy),
        format!("Frames:           {}", report.num_frames),
        format!("Total references: {}", report.total_references()),
        format!("Page faults:      {}", report.faults()),
        format!("Hits:             {}", report.hits()),
        format!("Hit rate:         {:.2}%", report.hit_rate()),
        format!("Fault rate:       {:.2}%", report.fault_rate()),
    ];
    lines.join("\n") + "\n"
}
