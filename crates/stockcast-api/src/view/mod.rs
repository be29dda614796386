//! HTML 렌더링.
//!
//! 템플릿 엔진 없이 문자열로 조립합니다. 사용자 입력과 에러 메시지는
//! 모두 [`escape_html`]을 거칩니다.

pub mod page;
pub mod table;

pub use page::{render_page, PageView, StatsView};
pub use table::{render_series_table, render_table, TableView, TABLE_ROW_LIMIT};

/// HTML 특수 문자를 이스케이프합니다.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&#39;");
        assert_eq!(escape_html("上升"), "上升");
    }
}
