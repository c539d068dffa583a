//! Plain-text rendering of the loaded page and selection summary.

use std::fmt::Write as _;

use super::PagedSelection;

/// One-line selection summary, e.g. `page 2/9 | 20 selected (8 pending) | all`.
pub fn status_line(client: &PagedSelection) -> String {
    let page = client.current_page();
    let selection = client.selection();
    let mut line = format!(
        "page {}/{} | {} selected",
        page.number,
        client.page_count(),
        selection.len()
    );
    let pending = selection.pending_count();
    if pending > 0 {
        let _ = write!(line, " ({pending} pending)");
    }
    if client.is_all_selected() {
        line.push_str(" | all");
    }
    if let Some(request) = client.pending_request() {
        let _ = write!(line, " | loading page {}", request.page);
    }
    if let Some(err) = client.last_error() {
        let _ = write!(line, " | {err}");
    }
    line
}

/// Status line followed by one row per record with its checkbox state.
pub fn render_page(client: &PagedSelection) -> String {
    let page = client.current_page();
    let mut out = status_line(client);
    out.push('\n');
    if page.is_empty() {
        out.push_str("  (no records)\n");
        return out;
    }
    let first = page.first_position();
    for (index, record) in page.records.iter().enumerate() {
        let mark = if client.is_row_selected(record) { 'x' } else { ' ' };
        let _ = writeln!(
            out,
            "  [{mark}] {index:>3}  {:>8}  {}",
            first + index as u64,
            record.label()
        );
    }
    out
}
