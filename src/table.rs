//! Plain-text table rendering for terminal output.

use std::fmt::Write as _;

pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|header| header.chars().count()).collect();
    for row in rows {
        for (index, cell) in row.iter().enumerate().take(widths.len()) {
            widths[index] = widths[index].max(cell.chars().count());
        }
    }

    let mut output = String::new();
    write_row(&mut output, headers.iter().copied(), &widths);
    let separators: Vec<String> = widths.iter().map(|width| "-".repeat((*width).max(3))).collect();
    write_row(&mut output, separators.iter().map(String::as_str), &widths);
    for row in rows {
        write_row(&mut output, row.iter().map(String::as_str), &widths);
    }
    output
}

pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn write_row<'a>(output: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let mut line = String::new();
    for (index, cell) in cells.enumerate() {
        let Some(width) = widths.get(index).copied() else {
            break;
        };
        if index > 0 {
            line.push_str("  ");
        }
        let cell: String = cell
            .chars()
            .map(|ch| if matches!(ch, '\n' | '\r' | '\t') { ' ' } else { ch })
            .collect();
        let padding = width.max(3).saturating_sub(cell.chars().count());
        line.push_str(&cell);
        line.push_str(&" ".repeat(padding));
    }
    while line.ends_with(' ') {
        line.pop();
    }
    let _ = writeln!(output, "{line}");
}
