// src/report/chart.rs
use crate::report::{format_money, RunReport};
use crate::types::{Side, TradeRecord};
use anyhow::Result;
use serde_json::{json, Value};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.27.0.min.js";

fn markers(trades: &[TradeRecord], side: Side, name: &str, color: &str, symbol: &str) -> Value {
    let (x, y): (Vec<_>, Vec<_>) = trades
        .iter()
        .filter(|t| t.side == side)
        .map(|t| (t.timestamp, t.price))
        .unzip();
    json!({
        "type": "scatter",
        "mode": "markers",
        "name": name,
        "x": x,
        "y": y,
        "xaxis": "x",
        "yaxis": "y",
        "marker": { "color": color, "size": 10, "symbol": symbol },
    })
}

/// Plotly figure: price with trade markers on top, portfolio value below.
pub fn figure(report: &RunReport<'_>) -> Result<Value> {
    let summary = report.summary();
    let close = report.series.close()?;
    let trades = &report.outcome.trades;

    let (value_x, value_y): (Vec<_>, Vec<_>) = report
        .outcome
        .history
        .iter()
        .map(|s| (s.timestamp, s.total_value))
        .unzip();

    let summary_html = format!(
        "Initial Deposit: <span style='color:#FFD700'>{}</span><br>\
         Final Value: <span style='color:#FFD700'>{}</span><br>\
         Total Profit: <span style='color:#FFD700'>{} ({:.2}%)</span><br>\
         <span style='color:rgba(255, 255, 255, 0.7)'>Run Time: {}</span><br>\
         <span style='color:rgba(255, 255, 255, 0.7)'>Duration: {}</span>",
        format_money(summary.initial_deposit),
        format_money(summary.final_value),
        format_money(summary.profit),
        summary.profit_percent,
        report.started_at.format("%Y-%m-%d %H:%M:%S"),
        report.duration_label(),
    );

    Ok(json!({
        "data": [
            {
                "type": "scatter",
                "mode": "lines",
                "name": format!("Price {}", report.ticker),
                "x": report.series.timestamps(),
                "y": close,
                "xaxis": "x",
                "yaxis": "y",
                "line": { "color": "#80cbc4", "width": 1.5 },
            },
            markers(trades, Side::Buy, "Buy Orders", "lime", "triangle-up"),
            markers(trades, Side::Sell, "Sell Orders", "red", "triangle-down"),
            {
                "type": "scatter",
                "mode": "lines",
                "name": "Portfolio Value",
                "x": value_x,
                "y": value_y,
                "xaxis": "x2",
                "yaxis": "y2",
                "line": { "color": "white", "width": 1.5 },
            },
        ],
        "layout": {
            "title": { "text": format!("<b>Trading Report for {}</b>", report.ticker), "x": 0.5 },
            "template": "plotly_dark",
            "paper_bgcolor": "#111111",
            "plot_bgcolor": "#111111",
            "font": { "color": "#dddddd" },
            "height": 800,
            "legend": { "orientation": "h", "yanchor": "bottom", "y": 1.02, "xanchor": "right", "x": 1 },
            "xaxis": { "anchor": "y", "showticklabels": false, "rangeslider": { "visible": false } },
            "xaxis2": { "anchor": "y2", "matches": "x", "title": { "text": "Date" } },
            "yaxis": { "domain": [0.33, 1.0], "title": { "text": "Price, $" } },
            "yaxis2": { "domain": [0.0, 0.28], "title": { "text": "Portfolio Value, $" } },
            "annotations": [{
                "text": summary_html,
                "align": "left",
                "showarrow": false,
                "xref": "paper",
                "yref": "paper",
                "x": 0.02,
                "y": 0.98,
                "xanchor": "left",
                "yanchor": "top",
                "bordercolor": "gray",
                "borderwidth": 1,
                "bgcolor": "rgba(28, 28, 28, 0.85)",
            }],
        },
    }))
}

/// Standalone HTML page embedding the figure.
pub fn render_html(report: &RunReport<'_>) -> Result<String> {
    // keep a literal "</script>" inside strings from closing the tag
    let figure = serde_json::to_string(&figure(report)?)?.replace("</", "<\\/");
    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Trading Report for {ticker}</title>
<script src="{cdn}"></script>
</head>
<body style="margin:0;background:#111111">
<div id="chart"></div>
<script>
const figure = {figure};
Plotly.newPlot("chart", figure.data, figure.layout, {{ responsive: true }});
</script>
</body>
</html>
"#,
        ticker = html_escape(report.ticker),
        cdn = PLOTLY_CDN,
        figure = figure,
    ))
}

fn html_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
