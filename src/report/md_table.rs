/// Markdown 管線表格轉簡單 HTML 表格。
/// 假設：
/// - 列用 | 分隔
/// - 第二列是分隔列（破折號與冒號）
/// - 粗體標記 ** 直接剝掉，不轉 <b>
pub fn markdown_table_to_html(md: &str) -> String {
    let lines: Vec<&str> = md
        .trim()
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    if lines.len() < 2 {
        return format!("<pre>{}</pre>", html_escape(md));
    }

    let header = split_row(lines[0]);
    // 跳過分隔列
    let body_rows: Vec<Vec<String>> = lines[2..].iter().map(|l| split_row(l)).collect();

    let mut html = String::new();
    html.push_str(
        "<table border=\"1\" cellpadding=\"6\" cellspacing=\"0\" style=\"border-collapse:collapse; font-family:Arial, sans-serif; font-size: 13px;\">",
    );
    html.push_str("<thead><tr>");
    for h in &header {
        html.push_str(&format!(
            "<th style='text-align:left; background:#f2f2f2;'>{}</th>",
            html_escape(h)
        ));
    }
    html.push_str("</tr></thead>");
    html.push_str("<tbody>");
    for row in &body_rows {
        html.push_str("<tr>");
        for cell in row {
            let clean = cell.replace("**", "");
            html.push_str(&format!("<td>{}</td>", html_escape(&clean)));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

fn split_row(row: &str) -> Vec<String> {
    let mut row = row.trim();
    if let Some(stripped) = row.strip_prefix('|') {
        row = stripped;
    }
    if let Some(stripped) = row.strip_suffix('|') {
        row = stripped;
    }
    row.split('|').map(|c| c.trim().to_string()).collect()
}

pub fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_table() {
        let md = "| Asset | Value |\n| --- | ---: |\n| Primary Home | $850,000 |";
        let html = markdown_table_to_html(md);

        assert!(html.starts_with("<table"));
        assert!(html.contains("<th style='text-align:left; background:#f2f2f2;'>Asset</th>"));
        assert!(html.contains("<td>Primary Home</td>"));
        assert!(html.contains("<td>$850,000</td>"));
        // 分隔列不該出現在輸出
        assert!(!html.contains("---"));
    }

    #[test]
    fn test_bold_markers_stripped() {
        let md = "| A |\n| - |\n| **TOTAL** |";
        let html = markdown_table_to_html(md);
        assert!(html.contains("<td>TOTAL</td>"));
        assert!(!html.contains("**"));
    }

    #[test]
    fn test_cells_are_escaped() {
        let md = "| A |\n| - |\n| <script> & 'x' |";
        let html = markdown_table_to_html(md);
        assert!(html.contains("&lt;script&gt; &amp; &#x27;x&#x27;"));
    }

    #[test]
    fn test_degenerate_input_becomes_pre() {
        let html = markdown_table_to_html("just text");
        assert_eq!(html, "<pre>just text</pre>");
    }
}
