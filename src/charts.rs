//! Plotly figure payloads for the Charts page.

use serde::Serialize;
use serde_json::{json, Value};

use crate::processing::{age_by_city, age_totals, sum_by, top_campaigns, AgeByCity, TOP_CAMPAIGNS};
use crate::types::{Field, View};

const DONUT_HOLE: f64 = 0.4;

#[derive(Debug, Clone, Serialize)]
pub struct ChartTab {
    pub title: &'static str,
    pub charts: Vec<Chart>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Chart {
    pub id: &'static str,
    pub title: &'static str,
    pub data: Vec<Trace>,
    pub layout: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trace {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hole: Option<f64>,
}

/// All six chart pipelines, grouped into the page's tabs.
pub fn build_charts(view: &View) -> Vec<ChartTab> {
    let by_city = sum_by(view, Field::City, Field::ItemsCollected);
    let by_zoning = sum_by(view, Field::Zoning, Field::ItemsCollected);
    let ages: Vec<(String, f64)> = age_totals(view)
        .into_iter()
        .map(|(label, total)| (label.to_string(), total))
        .collect();
    let campaigns: Vec<(String, f64)> = top_campaigns(view, TOP_CAMPAIGNS)
        .into_iter()
        .map(|(name, count)| (name, count as f64))
        .collect();
    let items = Field::ItemsCollected.header();

    vec![
        ChartTab {
            title: "Coleta por Cidade e Zoneamento",
            charts: vec![
                bar_per_category("itens-cidade", "Itens Coletados por Cidade", "Cidade", items, &by_city),
                bar_per_category("itens-zoneamento", "Itens Coletados por Zoneamento", "Zoneamento", items, &by_zoning),
            ],
        },
        ChartTab {
            title: "Top 15 Campanhas",
            charts: vec![bar_per_category("top-campanhas", "Top 15 Campanhas", "Campanha", "Quantidade", &campaigns)],
        },
        ChartTab {
            title: "Distribuição por Faixa Etária",
            charts: vec![bar_per_category("faixa-etaria", "Distribuição por Faixa Etária", "Faixa Etária", "Quantidade", &ages)],
        },
        ChartTab {
            title: "Proporção por Faixa Etária",
            charts: vec![donut("faixa-etaria-pizza", "Proporção por Faixa Etária", &ages)],
        },
        ChartTab {
            title: "Proporção por Cidade e Zoneamento",
            charts: vec![
                donut("zoneamento-pizza", "Proporção por Zoneamento", &by_zoning),
                donut("cidade-pizza", "Proporção por Cidade", &by_city),
            ],
        },
        ChartTab {
            title: "Distribuição Etária por Cidade",
            charts: vec![stacked_by_bracket("faixa-cidade", "Distribuição Etária por Cidade", &age_by_city(view))],
        },
    ]
}

/// One bar per category, each its own trace so Plotly colors them apart.
fn bar_per_category(
    id: &'static str,
    title: &'static str,
    x_title: &str,
    y_title: &str,
    rows: &[(String, f64)],
) -> Chart {
    let data = rows
        .iter()
        .map(|(category, value)| Trace {
            kind: "bar",
            name: Some(category.clone()),
            x: Some(vec![category.clone()]),
            y: Some(vec![*value]),
            ..Default::default()
        })
        .collect();

    Chart { id, title, data, layout: axes_layout(x_title, y_title, None) }
}

fn donut(id: &'static str, title: &'static str, rows: &[(String, f64)]) -> Chart {
    let trace = Trace {
        kind: "pie",
        labels: Some(rows.iter().map(|(label, _)| label.clone()).collect()),
        values: Some(rows.iter().map(|(_, value)| *value).collect()),
        hole: Some(DONUT_HOLE),
        ..Default::default()
    };
    Chart { id, title, data: vec![trace], layout: json!({}) }
}

fn stacked_by_bracket(id: &'static str, title: &'static str, rows: &[AgeByCity]) -> Chart {
    let mut data: Vec<Trace> = Vec::new();
    for row in rows {
        let existing = data.iter().position(|t| t.name.as_deref() == Some(row.bracket));
        let trace = match existing {
            Some(i) => &mut data[i],
            None => {
                data.push(Trace {
                    kind: "bar",
                    name: Some(row.bracket.to_string()),
                    x: Some(Vec::new()),
                    y: Some(Vec::new()),
                    ..Default::default()
                });
                let last = data.len() - 1;
                &mut data[last]
            }
        };
        if let (Some(x), Some(y)) = (trace.x.as_mut(), trace.y.as_mut()) {
            x.push(row.city.clone());
            y.push(row.quantity);
        }
    }

    Chart { id, title, data, layout: axes_layout("Cidade", "Quantidade", Some("relative")) }
}

fn axes_layout(x_title: &str, y_title: &str, barmode: Option<&str>) -> Value {
    let mut layout = json!({
        "xaxis": { "title": { "text": x_title } },
        "yaxis": { "title": { "text": y_title } },
        "showlegend": true,
    });
    if let Some(mode) = barmode {
        layout["barmode"] = json!(mode);
    }
    layout
}
