//! Markdown tables for tool output
//!
//! Two layouts: `grid` (boxed, one rule per row) for the hotel list and
//! `pipe` (GitHub style) for search results. Both start with an index column.

/// A rectangular table of text cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; short rows are padded, long rows truncated
    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row: Vec<String> = cells.into_iter().map(|c| clean(c.into())).collect();
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Header row and body rows with the index column prepended
    fn indexed(&self) -> (Vec<String>, Vec<Vec<String>>) {
        let mut headers = vec![String::new()];
        headers.extend(self.headers.iter().cloned());

        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let mut cells = vec![i.to_string()];
                cells.extend(row.iter().cloned());
                cells
            })
            .collect();

        (headers, rows)
    }

    fn widths(headers: &[String], rows: &[Vec<String>]) -> Vec<usize> {
        headers
            .iter()
            .enumerate()
            .map(|(col, h)| {
                rows.iter()
                    .map(|r| width(&r[col]))
                    .chain(std::iter::once(width(h)))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }

    /// Grid layout
    pub fn to_grid(&self) -> String {
        let (headers, rows) = self.indexed();
        let widths = Self::widths(&headers, &rows);

        let rule = |fill: char| {
            let mut line = String::from("+");
            for w in &widths {
                line.push_str(&fill.to_string().repeat(w + 2));
                line.push('+');
            }
            line
        };

        let mut out = Vec::with_capacity(rows.len() * 2 + 3);
        out.push(rule('-'));
        out.push(render_row(&headers, &widths, |i| i == 0));
        out.push(rule('='));
        for row in &rows {
            out.push(render_row(row, &widths, |i| i == 0));
            out.push(rule('-'));
        }
        if rows.is_empty() {
            out.pop();
            out.push(rule('-'));
        }
        out.join("\n")
    }

    /// Pipe layout
    pub fn to_pipe(&self) -> String {
        let (headers, rows) = self.indexed();
        let widths = Self::widths(&headers, &rows);

        let mut out = Vec::with_capacity(rows.len() + 2);
        out.push(render_row(&headers, &widths, |i| i == 0));

        let mut align = String::from("|");
        for (i, w) in widths.iter().enumerate() {
            let dashes = "-".repeat(w + 1);
            if i == 0 {
                align.push_str(&format!("{}:|", dashes));
            } else {
                align.push_str(&format!(":{}|", dashes));
            }
        }
        out.push(align);

        for row in &rows {
            out.push(render_row(row, &widths, |i| i == 0));
        }
        out.join("\n")
    }
}

fn render_row(cells: &[String], widths: &[usize], right_align: impl Fn(usize) -> bool) -> String {
    let mut line = String::from("|");
    for (i, (cell, w)) in cells.iter().zip(widths).enumerate() {
        let pad = " ".repeat(w - width(cell));
        if right_align(i) {
            line.push_str(&format!(" {}{} |", pad, cell));
        } else {
            line.push_str(&format!(" {}{} |", cell, pad));
        }
    }
    line
}

fn width(s: &str) -> usize {
    s.chars().count()
}

fn clean(cell: String) -> String {
    cell.replace(['\n', '\r'], " ").replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut table = Table::new(["hotel_name", "review_score_word"]);
        table.push_row(["Hôtel Lutetia", "Excellent"]);
        table.push_row(["Ibis", "Good"]);
        table
    }

    #[test]
    fn test_grid_layout() {
        let grid = sample().to_grid();
        let lines: Vec<&str> = grid.lines().collect();

        assert_eq!(lines[0], "+---+---------------+-------------------+");
        assert_eq!(lines[1], "|   | hotel_name    | review_score_word |");
        assert_eq!(lines[2], "+===+===============+===================+");
        assert_eq!(lines[3], "| 0 | Hôtel Lutetia | Excellent         |");
        assert_eq!(lines[5], "| 1 | Ibis          | Good              |");
        assert_eq!(lines.len(), 7);
    }

    #[test]
    fn test_pipe_layout() {
        let pipe = sample().to_pipe();
        let lines: Vec<&str> = pipe.lines().collect();

        assert_eq!(lines[0], "|   | hotel_name    | review_score_word |");
        assert_eq!(lines[1], "|--:|:--------------|:------------------|");
        assert_eq!(lines[2], "| 0 | Hôtel Lutetia | Excellent         |");
    }

    #[test]
    fn test_cells_are_single_line() {
        let mut table = Table::new(["content"]);
        table.push_row(["line one\nline | two"]);
        let pipe = table.to_pipe();
        assert_eq!(pipe.lines().count(), 3);
        assert!(pipe.contains("line one line \\| two"));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let mut table = Table::new(["a", "b"]);
        table.push_row(["only a"]);
        assert_eq!(table.len(), 1);
        assert!(table.to_grid().contains("| only a |"));
    }
}
