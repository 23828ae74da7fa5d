use crate::gee::QueryResult;

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

pub fn to_csv(result: &QueryResult) -> String {
    let mut output = String::new();

    // Header
    let headers: Vec<String> = result.columns.iter().map(|c| csv_escape(&c.name)).collect();
    output.push_str(&headers.join(","));
    output.push('\n');

    for row in &result.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| csv_escape(&cell.display()))
            .collect();
        output.push_str(&cells.join(","));
        output.push('\n');
    }

    output
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
