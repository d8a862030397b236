//! ASCII chart of probability against group size.

use std::fmt::Write as _;

use bday_core::ResultRecord;

/// Default plot height in rows (excluding the axis).
pub const PLOT_HEIGHT: usize = 20;

/// Default maximum plot width in columns.
pub const PLOT_WIDTH: usize = 64;

/// Render `records` as a scatter of `*` marks, 0% at the bottom row and
/// 100% at the top. More records than `width` are sampled evenly.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn render_chart(records: &[ResultRecord], width: usize, height: usize) -> String {
    if records.is_empty() || width == 0 || height < 2 {
        return String::from("(no data)\n");
    }

    let columns = records.len().min(width);
    let column_records: Vec<&ResultRecord> = (0..columns)
        .map(|col| {
            let idx = if columns == 1 {
                0
            } else {
                col * (records.len() - 1) / (columns - 1)
            };
            &records[idx]
        })
        .collect();

    let top = (height - 1) as f64;
    let rows: Vec<usize> = column_records
        .iter()
        .map(|r| (r.probability.clamp(0.0, 1.0) * top).round() as usize)
        .collect();

    let mut out = String::new();
    for level in (0..height).rev() {
        let label = match level {
            l if l == height - 1 => "100%",
            l if l == (height - 1) / 2 => " 50%",
            0 => "  0%",
            _ => "    ",
        };
        let line: String = rows
            .iter()
            .map(|&row| if row == level { '*' } else { ' ' })
            .collect();
        let _ = writeln!(out, "{label} |{}", line.trim_end());
    }
    let _ = writeln!(out, "     +{}", "-".repeat(columns));

    let first = column_records[0].group_size.to_string();
    let last = column_records[columns - 1].group_size.to_string();
    let gap = columns.saturating_sub(first.len() + last.len()).max(1);
    let _ = writeln!(out, "      {first}{}{last}", " ".repeat(gap));
    let _ = writeln!(out, "      group size");
    out
}
