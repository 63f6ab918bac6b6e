//! Plain-text rendering of a comparison for the terminal

use crate::state::ComparisonReport;

/// Render a comparison as aligned columns, flagging mismatching rows with `!`
pub fn render(report: &ComparisonReport) -> String {
    let mut header = vec![String::new(), "Addr".to_string(), "Name".to_string()];
    header.extend(report.columns.iter().map(|c| c.name.clone()));

    let mut lines = vec![header];
    for row in &report.rows {
        let mut line = vec![
            if row.is_mismatch { "!" } else { "" }.to_string(),
            row.address.clone(),
            row.name.clone(),
        ];
        line.extend(row.values.iter().map(|v| v.to_string()));
        lines.push(line);
    }

    let widths: Vec<usize> = (0..lines[0].len())
        .map(|col| lines.iter().map(|l| l[col].chars().count()).max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    for line in &lines {
        let cells: Vec<String> = line
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect();
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ComparisonColumn;
    use regscope_core::{CellValue, ComparisonRow, ComparisonSummary, DumpId};

    #[test]
    fn test_render() {
        let rows = vec![
            ComparisonRow {
                address: "0x10".to_string(),
                name: "CTRL".to_string(),
                description: String::new(),
                values: vec![CellValue::Present("1".into()), CellValue::Present("2".into())],
                is_mismatch: true,
            },
            ComparisonRow {
                address: "0x14".to_string(),
                name: "Unknown".to_string(),
                description: String::new(),
                values: vec![CellValue::Present("7".into()), CellValue::Missing],
                is_mismatch: false,
            },
        ];
        let report = ComparisonReport {
            columns: vec![
                ComparisonColumn { id: DumpId::from("a"), name: "good".into() },
                ComparisonColumn { id: DumpId::from("b"), name: "bad".into() },
            ],
            summary: ComparisonSummary::from_rows(&rows),
            rows,
        };

        let text = render(&report);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "   Addr  Name     good  bad");
        assert_eq!(lines[1], "!  0x10  CTRL     1     2");
        assert_eq!(lines[2], "   0x14  Unknown  7     -");
    }
}
