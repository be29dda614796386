//! 서버 렌더링 페이지.

use std::fmt::Write;

use super::escape_html;
use super::table::TableView;

const STYLE: &str = r#"
  body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'PingFang SC', 'Microsoft YaHei', sans-serif; margin: 24px; }
  .card { max-width: 1000px; margin: 12px auto; padding: 20px; border: 1px solid #eee; border-radius: 12px; box-shadow: 0 2px 12px rgba(0,0,0,0.06); }
  h1 { margin: 0 0 16px; font-size: 20px; }
  h2 { margin: 0 0 8px; font-size: 16px; }
  .row { display: flex; gap: 12px; flex-wrap: wrap; align-items: center; }
  input, select, button { padding: 10px 12px; border: 1px solid #ddd; border-radius: 8px; font-size: 14px; }
  button { background: #0ea5e9; color: white; border: none; cursor: pointer; }
  button:hover { background: #0284c7; }
  .btn-secondary { background: #64748b; }
  .stats { display: grid; gap: 12px; margin-top: 12px; grid-template-columns: repeat(auto-fit, minmax(220px, 1fr)); }
  .stat { background: #f8fafc; padding: 12px; border-radius: 8px; }
  .img-wrap { background: #fff; padding: 8px; border: 1px solid #eee; border-radius: 8px; }
  .error { color: #b91c1c; background: #fef2f2; border: 1px solid #fee2e2; padding: 10px; border-radius: 8px; }
  .table-wrap { overflow: auto; max-height: 420px; border: 1px solid #eee; border-radius: 8px; }
  table { width: 100%; border-collapse: collapse; font-size: 13px; }
  thead th { position: sticky; top: 0; background: #f1f5f9; }
  th, td { padding: 8px 10px; border-bottom: 1px solid #eee; text-align: right; }
  td:first-child, th:first-child { text-align: left; }
  pre.log { background: #0b1020; color: #d1d5db; padding: 12px; border-radius: 8px; overflow: auto; max-height: 360px; font-size: 12px; }
"#;

const MARKETS: [(&str, &str); 5] = [
    ("auto", "自动判断"),
    ("sh", "沪"),
    ("sz", "深"),
    ("cyb", "创"),
    ("bj", "北"),
];
const PERIODS: [&str; 5] = ["60", "30", "15", "5", "1"];
const ADJUSTS: [(&str, &str); 3] = [("", "不复权"), ("qfq", "前复权"), ("hfq", "后复权")];

/// 예측 요약 표시 값. 모두 미리 포맷된 문자열입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsView {
    pub chart_base64: String,
    pub current_price: String,
    pub trend: String,
    /// `%` 없이 포맷된 값
    pub volatility: String,
    pub max_gain: String,
    pub max_loss: String,
    /// 최대 상승률로 환산한 가격
    pub gain_price: String,
    /// 최대 하락률로 환산한 가격
    pub loss_price: String,
}

/// 페이지 렌더링 입력.
#[derive(Debug, Clone, Default)]
pub struct PageView {
    /// 사용자가 입력한 그대로의 종목 코드
    pub symbol: String,
    pub market: String,
    pub period: String,
    pub adjust: String,
    pub today: bool,
    pub lookback: String,
    pub horizon: String,
    pub next3: bool,
    pub error: Option<String>,
    pub table: Option<TableView>,
    pub stats: Option<StatsView>,
    pub logs: Vec<String>,
}

fn selected(cond: bool) -> &'static str {
    if cond {
        " selected"
    } else {
        ""
    }
}

fn checked(cond: bool) -> &'static str {
    if cond {
        " checked"
    } else {
        ""
    }
}

/// 페이지 HTML을 렌더링합니다.
pub fn render_page(view: &PageView) -> String {
    let mut html = String::with_capacity(8 * 1024);

    html.push_str("<!doctype html>\n<html lang=\"zh-CN\">\n<head>\n<meta charset=\"utf-8\" />\n");
    html.push_str(
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n",
    );
    html.push_str("<title>TimesFM 股票预测</title>\n<style>");
    html.push_str(STYLE);
    html.push_str("</style>\n</head>\n<body>\n<div class=\"card\">\n<h1>TimesFM 股票预测</h1>\n");
    html.push_str("<form id=\"query-form\" method=\"GET\" action=\"/\">\n");

    // 수집 설정
    html.push_str("<div class=\"card\"><h2>获取数据设置</h2><div class=\"row\">\n");
    let _ = write!(
        html,
        "<label>股票代码</label><input name=\"symbol\" value=\"{}\" placeholder=\"603688 或 000001\" />\n",
        escape_html(&view.symbol)
    );
    html.push_str("<label>市场</label><select name=\"market\">");
    for (value, label) in MARKETS {
        let _ = write!(
            html,
            "<option value=\"{}\"{}>{}</option>",
            value,
            selected(view.market == value),
            label
        );
    }
    html.push_str("</select>\n<label>周期</label><select name=\"period\">");
    for value in PERIODS {
        let _ = write!(
            html,
            "<option value=\"{0}\"{1}>{0} 分钟</option>",
            value,
            selected(view.period == value)
        );
    }
    html.push_str("</select>\n<label>复权</label><select name=\"adjust\">");
    for (value, label) in ADJUSTS {
        let _ = write!(
            html,
            "<option value=\"{}\"{}>{}</option>",
            value,
            selected(view.adjust == value),
            label
        );
    }
    html.push_str("</select>\n");
    let _ = write!(
        html,
        "<label><input type=\"checkbox\" name=\"today\" value=\"1\"{} /> 仅今日数据</label>\n",
        checked(view.today)
    );
    html.push_str(
        "<button name=\"action\" value=\"fetch\" type=\"submit\" class=\"btn-secondary\">获取数据</button>\n",
    );
    html.push_str("</div></div>\n");

    if let Some(table) = &view.table {
        let _ = write!(
            html,
            "<div class=\"card\" id=\"table-wrap\"><h2>数据表格（最近 {} 行）</h2><div class=\"table-wrap\">{}</div></div>\n",
            table.rows, table.html
        );
    }

    // 예측 설정
    html.push_str("<div class=\"card\"><h2>预测设置</h2><div class=\"row\">\n");
    let _ = write!(
        html,
        "<label>参考历史条数（用于建模）</label><input name=\"lookback\" value=\"{}\" type=\"number\" min=\"10\" max=\"1024\" />\n",
        escape_html(&view.lookback)
    );
    let _ = write!(
        html,
        "<label>预测未来点数（向前推多少个时间点）</label><input name=\"horizon\" value=\"{}\" type=\"number\" min=\"1\" max=\"256\" />\n",
        escape_html(&view.horizon)
    );
    let _ = write!(
        html,
        "<label><input type=\"checkbox\" name=\"next3\" value=\"1\"{} /> 预测后3个交易日</label>\n",
        checked(view.next3)
    );
    html.push_str("<button type=\"submit\" name=\"action\" value=\"predict\">预测</button>\n");
    html.push_str("</div></div>\n</form>\n");

    if let Some(error) = &view.error {
        let _ = write!(html, "<div class=\"error\">{}</div>\n", escape_html(error));
    }

    if let Some(stats) = &view.stats {
        let _ = write!(
            html,
            "<div style=\"margin-top:16px;\"><div class=\"img-wrap\"><img src=\"data:image/png;base64,{}\" style=\"width:100%;\" alt=\"forecast\" /></div>\n",
            stats.chart_base64
        );
        html.push_str("<div class=\"stats\">\n");
        let _ = write!(
            html,
            "<div class=\"stat\">当前价格：<b>{}</b></div>\n\
             <div class=\"stat\">趋势：<b>{}</b></div>\n\
             <div class=\"stat\">预测波动率：<b>{}%</b></div>\n\
             <div class=\"stat\">最大涨幅：<b>{}%</b></div>\n\
             <div class=\"stat\">最大跌幅：<b>{}%</b></div>\n\
             <div class=\"stat\">换算价格上/下限：<b>{}</b> / <b>{}</b></div>\n",
            stats.current_price,
            stats.trend,
            stats.volatility,
            stats.max_gain,
            stats.max_loss,
            stats.gain_price,
            stats.loss_price
        );
        html.push_str("</div></div>\n");
    }

    if !view.logs.is_empty() {
        html.push_str("<details style=\"margin-top:16px;\"><summary>获取日志</summary><pre class=\"log\">");
        for line in &view.logs {
            html.push_str(&escape_html(line));
            html.push('\n');
        }
        html.push_str("</pre></details>\n");
    }

    html.push_str("</div>\n</body>\n</html>\n");
    html
}
