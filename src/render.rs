//! HTML rendering for the dashboard pages.
//!
//! Pages are self-contained documents: the sidebar form carries the filter
//! state in its query string, charts are drawn client-side by Plotly and the
//! map by Leaflet with the markercluster plugin.

use std::fmt::Write;

use serde::Serialize;

use crate::charts::{build_charts, ChartTab};
use crate::config::MapConfig;
use crate::error::NO_DATA_NOTICE;
use crate::filter::{ControlKind, FilterControl, FilterPanel, FilterSpec, FilterState};
use crate::map::{build_map, CityCoordinates, MapData};
use crate::nav::Page;
use crate::processing::{summarize, Summary};
use crate::types::{format_number, Table};

const PLOTLY_JS: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";
const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const CLUSTER_CSS: &str = "https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.Default.css";
const CLUSTER_BASE_CSS: &str = "https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.css";
const CLUSTER_JS: &str = "https://unpkg.com/leaflet.markercluster@1.5.3/dist/leaflet.markercluster.js";
const FONT_AWESOME_CSS: &str = "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/4.7.0/css/font-awesome.min.css";

/// Everything a page needs besides the table and the current selections.
pub struct RenderContext<'a> {
    pub spec: &'a FilterSpec,
    pub coords: &'a CityCoordinates,
    pub map: &'a MapConfig,
}

pub struct RenderedPage {
    pub html: String,
    pub no_data: bool,
}

/// Filter the table, compute the selected page and wrap it in the layout.
///
/// An empty filtered view renders only the sidebar and the no-data notice.
pub fn render_dashboard(page: Page, table: &Table, ctx: &RenderContext, filters: &FilterState) -> RenderedPage {
    let view = ctx.spec.apply(table, filters);
    let panel = ctx.spec.panel(table, filters);
    let query = filters.to_query();

    let (body, no_data) = if view.is_empty() {
        (render_notice(NO_DATA_NOTICE), true)
    } else {
        let body = match page {
            Page::Home => render_home(&summarize(&view)),
            Page::Charts => render_charts(&build_charts(&view)),
            Page::Map => render_map(&build_map(&view, ctx.coords, ctx.map)),
        };
        (body, false)
    };

    let html = render_layout(page, &render_sidebar(page, &panel, &query), &body);
    RenderedPage { html, no_data }
}

fn render_layout(page: Page, sidebar: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Dashboard de Coleta de Lixo - {title}</title>
    <style>{css}</style>
</head>
<body>
    <aside class="sidebar">{sidebar}</aside>
    <main class="content">{body}</main>
</body>
</html>"#,
        title = escape_html(page.title()),
        css = inline_css(),
        sidebar = sidebar,
        body = body,
    )
}

fn render_sidebar(current: Page, panel: &FilterPanel, query: &str) -> String {
    let suffix = if query.is_empty() { String::new() } else { format!("?{}", query) };

    let mut nav = String::from(r#"<nav class="menu"><h2>Menu Principal</h2><ul>"#);
    for page in Page::ALL {
        let class = if page == current { " class=\"active\"" } else { "" };
        let _ = write!(
            nav,
            r#"<li{class}><a href="{href}">{icon} {title}</a></li>"#,
            class = class,
            href = escape_html(&format!("{}{}", page.path(), suffix)),
            icon = page.icon(),
            title = escape_html(page.title()),
        );
    }
    nav.push_str("</ul></nav>");

    format!(
        r#"{nav}
<details class="filters" open>
    <summary>🔍 Filtros Avançados</summary>
    <a class="reset" href="/reset?page={slug}">🔄 Resetar Filtros</a>
    <form method="get" action="{action}">
        {search}
        <hr>
        <h3>Outros filtros:</h3>
        {controls}
        <button type="submit">Aplicar</button>
    </form>
</details>
<script>
document.querySelectorAll('.filter > label > input[name=use]').forEach(toggle => toggle.addEventListener('change', () => {{
    toggle.closest('.filter').querySelector('.inputs').disabled = !toggle.checked;
}}));
</script>"#,
        nav = nav,
        slug = current.slug(),
        action = current.path(),
        search = panel.search.as_ref().map(render_search).unwrap_or_default(),
        controls = panel.controls.iter().map(render_control).collect::<String>(),
    )
}

fn render_search(search: &crate::filter::SearchControl) -> String {
    let mut options = String::from(r#"<option value="">Digite parte do nome da organização...</option>"#);
    for option in &search.options {
        let selected = if search.selected.as_deref() == Some(option.as_str()) { " selected" } else { "" };
        let _ = write!(
            options,
            r#"<option value="{v}"{s}>{v}</option>"#,
            v = escape_html(option),
            s = selected,
        );
    }
    format!(
        r#"<p class="search-title">Buscar por Organização</p>
<label>🔎 Digite para buscar:<select name="org">{options}</select></label>"#,
        options = options,
    )
}

fn render_control(control: &FilterControl) -> String {
    let key = escape_html(&control.key);
    let column = escape_html(&control.column);
    let checked = if control.enabled { " checked" } else { "" };
    // Disabled fields are left out of the submitted query.
    let disabled = if control.enabled { "" } else { " disabled" };

    let inputs = match &control.kind {
        ControlKind::Range { min, max, .. } => format!(
            r#"<div class="range">
    <label>Mínimo de {column}<input type="number" step="any" name="{key}.min" value="{min}"></label>
    <label>Máximo de {column}<input type="number" step="any" name="{key}.max" value="{max}"></label>
</div>"#,
            column = column,
            key = key,
            min = min.map(format_number).unwrap_or_default(),
            max = max.map(format_number).unwrap_or_default(),
        ),
        ControlKind::Choice { options, selected } => {
            let mut html = format!(r#"<select multiple name="{}">"#, key);
            for option in options {
                let s = if selected.contains(option) { " selected" } else { "" };
                let _ = write!(html, r#"<option value="{v}"{s}>{v}</option>"#, v = escape_html(option), s = s);
            }
            html.push_str("</select>");
            html
        }
    };

    format!(
        r#"<fieldset class="filter">
    <label><input type="checkbox" name="use" value="{key}"{checked}> Filtrar por: {column}</label>
    <fieldset class="inputs"{disabled}>{inputs}</fieldset>
</fieldset>"#,
        key = key,
        checked = checked,
        disabled = disabled,
        column = column,
        inputs = inputs,
    )
}

fn render_notice(message: &str) -> String {
    format!(r#"<div class="warning">⚠️ {}</div>"#, escape_html(message))
}

fn render_metric(label: &str, value: &str) -> String {
    format!(
        r#"<div class="metric"><div class="label">{}</div><div class="value">{}</div></div>"#,
        escape_html(label),
        escape_html(value),
    )
}

/// Displayed integer metrics truncate toward zero.
fn whole(n: f64) -> String {
    format!("{}", n.trunc() as i64)
}

pub fn render_home(summary: &Summary) -> String {
    let mean = summary.mean_items.map(|m| format!("{:.1}", m)).unwrap_or_else(|| "—".to_string());

    let collection = [
        render_metric("Total de Itens Coletados", &whole(summary.total_items)),
        render_metric("Média por Entrada", &mean),
        render_metric("Campanhas Diferentes", &summary.campaigns.to_string()),
    ]
    .concat();

    let people = [
        render_metric("Participantes", &whole(summary.participants)),
        render_metric("Crianças", &whole(summary.children)),
        render_metric("Jovens", &whole(summary.youth)),
        render_metric("Adultos", &whole(summary.adults)),
        render_metric("Idosos", &whole(summary.elderly)),
    ]
    .concat();

    format!(
        r#"<h1>📊 Visão Geral da Coleta de Lixo</h1>
<div class="metrics cols-3">{collection}</div>
<hr>
<h1>📊 Visão Geral dos Participantes</h1>
<div class="metrics cols-5">{people}</div>"#,
        collection = collection,
        people = people,
    )
}

pub fn render_charts(tabs: &[ChartTab]) -> String {
    let mut buttons = String::new();
    let mut panels = String::new();

    for (i, tab) in tabs.iter().enumerate() {
        let active = if i == 0 { " active" } else { "" };
        let _ = write!(
            buttons,
            r#"<button class="tab{active}" data-tab="tab-{i}">{title}</button>"#,
            active = active,
            i = i,
            title = escape_html(tab.title),
        );
        let _ = write!(panels, r#"<section class="tab-panel{active}" id="tab-{i}">"#, active = active, i = i);
        for chart in &tab.charts {
            let _ = write!(
                panels,
                r#"<h3>{title}</h3><div class="chart" id="{id}"></div>"#,
                title = escape_html(chart.title),
                id = chart.id,
            );
        }
        panels.push_str("</section>");
    }

    let figures: Vec<_> = tabs.iter().flat_map(|t| &t.charts).collect();

    format!(
        r#"<h1>📈 Gráficos Interativos</h1>
<div class="tabs">{buttons}</div>
{panels}
<script src="{plotly}"></script>
<script>
const figures = {figures};
for (const fig of figures) {{
    Plotly.newPlot(fig.id, fig.data, fig.layout, {{responsive: true}});
}}
document.querySelectorAll('.tab').forEach(btn => btn.addEventListener('click', () => {{
    document.querySelectorAll('.tab, .tab-panel').forEach(el => el.classList.remove('active'));
    btn.classList.add('active');
    const panel = document.getElementById(btn.dataset.tab);
    panel.classList.add('active');
    panel.querySelectorAll('.chart').forEach(el => Plotly.Plots.resize(el));
}}));
</script>"#,
        buttons = buttons,
        panels = panels,
        plotly = PLOTLY_JS,
        figures = script_json(&figures),
    )
}

pub fn render_map(map: &MapData) -> String {
    let unmapped = if map.unmapped.is_empty() {
        String::new()
    } else {
        format!(
            r#"<p class="note">Cidades sem coordenadas (não exibidas): {}</p>"#,
            escape_html(&map.unmapped.join(", "))
        )
    };

    format!(
        r#"<h1>🗺 Mapa da Coleta por Cidade</h1>
<link rel="stylesheet" href="{leaflet_css}">
<link rel="stylesheet" href="{cluster_base_css}">
<link rel="stylesheet" href="{cluster_css}">
<link rel="stylesheet" href="{font_awesome_css}">
<div id="map"></div>
{unmapped}
<script src="{leaflet_js}"></script>
<script src="{cluster_js}"></script>
<script>
const data = {data};
const esc = s => String(s).replace(/[&<>"']/g, c => ({{'&':'&amp;','<':'&lt;','>':'&gt;','"':'&quot;',"'":'&#39;'}})[c]);
const map = L.map('map').setView(data.center, data.zoom);
L.tileLayer('https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png', {{
    attribution: '&copy; OpenStreetMap contributors'
}}).addTo(map);
const trash = L.divIcon({{
    className: 'trash-marker',
    html: '<i class="fa fa-trash"></i>',
    iconSize: [28, 28],
    iconAnchor: [14, 14],
    popupAnchor: [0, -14]
}});
const cluster = L.markerClusterGroup();
for (const m of data.markers) {{
    L.marker([m.lat, m.lon], {{icon: trash}})
        .bindPopup(`<b>${{esc(m.city)}}</b><br>Total de itens: ${{m.total}}`)
        .bindTooltip(esc(m.city))
        .addTo(cluster);
}}
map.addLayer(cluster);
</script>"#,
        leaflet_css = LEAFLET_CSS,
        cluster_base_css = CLUSTER_BASE_CSS,
        cluster_css = CLUSTER_CSS,
        font_awesome_css = FONT_AWESOME_CSS,
        leaflet_js = LEAFLET_JS,
        cluster_js = CLUSTER_JS,
        unmapped = unmapped,
        data = script_json(map),
    )
}

/// JSON safe to inline inside a `<script>` element.
fn script_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/")
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

fn inline_css() -> &'static str {
    r#"
* { box-sizing: border-box; }
body { margin: 0; display: flex; min-height: 100vh; font-family: system-ui, -apple-system, 'Segoe UI', sans-serif; color: #1f2937; }
.sidebar { width: 320px; flex-shrink: 0; padding: 1rem; background: #f3f4f6; border-right: 1px solid #e5e7eb; overflow-y: auto; }
.content { flex: 1; padding: 2rem; min-width: 0; }
.menu ul { list-style: none; padding: 0; }
.menu li a { display: block; padding: 0.5rem 0.75rem; border-radius: 6px; color: inherit; text-decoration: none; }
.menu li.active a { background: #16a34a; color: #fff; }
.filters summary { font-weight: 600; cursor: pointer; margin: 1rem 0 0.5rem; }
.filters select, .filters input[type=number] { width: 100%; }
.filters select[multiple] { min-height: 6rem; }
.filter { border: none; padding: 0.5rem 0; margin: 0; }
.filter .inputs { border: none; padding: 0; margin: 0; }
.filter .inputs:disabled { opacity: 0.5; }
.range { display: grid; grid-template-columns: 1fr 1fr; gap: 0.5rem; font-size: 0.8rem; }
.reset { display: inline-block; margin-bottom: 0.5rem; }
.search-title { font-size: 18px; font-weight: bold; }
.metrics { display: grid; gap: 1rem; }
.cols-3 { grid-template-columns: repeat(3, 1fr); }
.cols-5 { grid-template-columns: repeat(5, 1fr); }
.metric .label { font-size: 0.875rem; color: #6b7280; }
.metric .value { font-size: 2rem; font-weight: 600; }
.warning { padding: 1rem; background: #fef3c7; border: 1px solid #f59e0b; border-radius: 6px; }
.tabs { display: flex; flex-wrap: wrap; gap: 0.25rem; border-bottom: 1px solid #e5e7eb; margin-bottom: 1rem; }
.tab { border: none; background: none; padding: 0.5rem 0.75rem; cursor: pointer; }
.tab.active { border-bottom: 2px solid #16a34a; font-weight: 600; }
.tab-panel { display: none; }
.tab-panel.active { display: block; }
.chart { width: 100%; min-height: 420px; }
#map { height: 600px; }
.note { color: #6b7280; font-size: 0.875rem; }
.trash-marker { display: flex; align-items: center; justify-content: center; background: #16a34a; color: #fff; border: 2px solid #fff; border-radius: 50%; box-shadow: 0 1px 4px rgba(0,0,0,0.4); font-size: 14px; }
"#
}
