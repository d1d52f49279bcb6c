//! Sidebar filter engine.
//!
//! A [`FilterSpec`] maps logical keys to column names. One key is the
//! organization search (exact match); every other key whose column exists can
//! be switched on as a numeric range or a categorical inclusion set depending
//! on the column's type. Active filters combine with AND.
//!
//! Selections travel as a URL query string:
//! `org=<value>`, `use=<key>`, `<key>.min=<n>`, `<key>.max=<n>`, `<key>=<value>`.
//! A categorical key that is enabled but carries no values is a no-op, which
//! is what the browser sends when every option is deselected.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::types::{Column, Field, Table, View};

const ORG_PARAM: &str = "org";
const USE_PARAM: &str = "use";

#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    entries: Vec<(String, String)>,
    search_key: String,
}

impl FilterSpec {
    pub fn new(entries: Vec<(String, String)>, search_key: impl Into<String>) -> Self {
        FilterSpec { entries, search_key: search_key.into() }
    }

    /// Every known field, with the organization field as the search key.
    pub fn standard() -> Self {
        let entries = Field::ALL
            .iter()
            .map(|f| (f.key().to_string(), f.header().to_string()))
            .collect();
        FilterSpec::new(entries, Field::Organization.key())
    }

    pub fn column_for(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, c)| c.as_str())
    }

    fn search_column(&self) -> Option<&str> {
        self.column_for(&self.search_key)
    }

    /// Keys that get a toggle in the panel: column present and not the search column.
    fn optional_entries<'s, 't>(&'s self, table: &'t Table) -> impl Iterator<Item = (&'s str, &'t Column)> + 's
    where
        't: 's,
    {
        let search_column = self.search_column();
        self.entries.iter().filter_map(move |(key, column)| {
            if *key == self.search_key || Some(column.as_str()) == search_column {
                return None;
            }
            table.column(column).map(|c| (key.as_str(), c))
        })
    }

    /// Narrow `table` to the rows matching every active selection in `state`.
    pub fn apply<'t>(&self, table: &'t Table, state: &FilterState) -> View<'t> {
        let mut view = table.view();

        if let (Some(column), Some(wanted)) = (
            self.search_column().and_then(|c| table.column(c)),
            state.organization.as_deref().filter(|v| !v.is_empty()),
        ) {
            view.retain(|row| column.label_at(row).as_deref() == Some(wanted));
        }

        for (key, column) in self.optional_entries(table) {
            if !state.enabled.contains(key) {
                continue;
            }
            if column.is_numeric() {
                let (lo, hi) = state.resolved_bounds(key, column);
                view.retain(|row| match column.number_at(row) {
                    Some(v) => lo.map_or(true, |lo| v >= lo) && hi.map_or(true, |hi| v <= hi),
                    None => false,
                });
            } else {
                let selected: BTreeSet<&str> = match state.selections.get(key) {
                    Some(values) if !values.is_empty() => values.iter().map(String::as_str).collect(),
                    _ => continue,
                };
                view.retain(|row| {
                    column.label_at(row).is_some_and(|v| selected.contains(&*v))
                });
            }
        }

        debug!(kept = view.len(), total = table.row_count(), "Applied filters");
        view
    }

    /// Controls to show in the sidebar, pre-filled from `state`.
    pub fn panel(&self, table: &Table, state: &FilterState) -> FilterPanel {
        let search = self.search_column().and_then(|name| table.column(name)).map(|column| SearchControl {
            key: self.search_key.clone(),
            column: column.name.clone(),
            options: column.distinct_labels(),
            selected: state.organization.clone().filter(|v| !v.is_empty()),
        });

        let controls = self
            .optional_entries(table)
            .map(|(key, column)| {
                let kind = if column.is_numeric() {
                    let observed = column.numeric_range();
                    let (min, max) = state.resolved_bounds(key, column);
                    ControlKind::Range {
                        observed_min: observed.map(|(lo, _)| lo),
                        observed_max: observed.map(|(_, hi)| hi),
                        min,
                        max,
                    }
                } else {
                    let options = column.distinct_labels();
                    // A control that is switched off shows every option picked, so
                    // enabling it starts from "everything".
                    let selected = match state.selections.get(key) {
                        Some(values) => values.clone(),
                        None if state.enabled.contains(key) => Vec::new(),
                        None => options.clone(),
                    };
                    ControlKind::Choice { options, selected }
                };
                FilterControl {
                    key: key.to_string(),
                    column: column.name.clone(),
                    enabled: state.enabled.contains(key),
                    kind,
                }
            })
            .collect();

        FilterPanel { search, controls }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Current sidebar selections. The default value is the reset state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    pub organization: Option<String>,
    pub enabled: BTreeSet<String>,
    pub bounds: BTreeMap<String, Bounds>,
    pub selections: BTreeMap<String, Vec<String>>,
}

impl FilterState {
    pub fn reset() -> Self {
        FilterState::default()
    }

    pub fn from_query(query: &str) -> Self {
        match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
            Ok(pairs) => FilterState::from_pairs(pairs),
            Err(err) => {
                debug!(error = %err, "Ignoring malformed filter query");
                FilterState::default()
            }
        }
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut state = FilterState::default();
        for (name, value) in pairs {
            if name == ORG_PARAM {
                let value = value.trim();
                state.organization = (!value.is_empty()).then(|| value.to_string());
            } else if name == USE_PARAM {
                state.enabled.insert(value);
            } else if let Some(key) = name.strip_suffix(".min") {
                state.bounds.entry(key.to_string()).or_default().min = parse_bound(&value);
            } else if let Some(key) = name.strip_suffix(".max") {
                state.bounds.entry(key.to_string()).or_default().max = parse_bound(&value);
            } else if name != "page" && !value.is_empty() {
                state.selections.entry(name).or_default().push(value);
            }
        }
        state
    }

    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(org) = &self.organization {
            pairs.push((ORG_PARAM.to_string(), org.clone()));
        }
        for key in &self.enabled {
            pairs.push((USE_PARAM.to_string(), key.clone()));
        }
        for (key, bounds) in &self.bounds {
            if let Some(min) = bounds.min {
                pairs.push((format!("{key}.min"), min.to_string()));
            }
            if let Some(max) = bounds.max {
                pairs.push((format!("{key}.max"), max.to_string()));
            }
        }
        for (key, values) in &self.selections {
            pairs.extend(values.iter().filter(|v| !v.is_empty()).map(|v| (key.clone(), v.clone())));
        }
        pairs
    }

    pub fn to_query(&self) -> String {
        serde_urlencoded::to_string(self.to_pairs()).unwrap_or_default()
    }

    /// Bounds for `key`, falling back to the column's observed min/max.
    fn resolved_bounds(&self, key: &str, column: &Column) -> (Option<f64>, Option<f64>) {
        let observed = column.numeric_range();
        let set = self.bounds.get(key).copied().unwrap_or_default();
        (
            set.min.or(observed.map(|(lo, _)| lo)),
            set.max.or(observed.map(|(_, hi)| hi)),
        )
    }
}

fn parse_bound(value: &str) -> Option<f64> {
    value.trim().replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite())
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterPanel {
    pub search: Option<SearchControl>,
    pub controls: Vec<FilterControl>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchControl {
    pub key: String,
    pub column: String,
    pub options: Vec<String>,
    pub selected: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterControl {
    pub key: String,
    pub column: String,
    pub enabled: bool,
    pub kind: ControlKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlKind {
    Range {
        observed_min: Option<f64>,
        observed_max: Option<f64>,
        min: Option<f64>,
        max: Option<f64>,
    },
    Choice {
        options: Vec<String>,
        selected: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, record};

    fn query(q: &str) -> FilterState {
        FilterState::from_query(q)
    }

    fn cities<'a>(view: &View<'a>) -> Vec<String> {
        view.labels(Field::City).into_iter().map(|c| c.unwrap_or_default().into_owned()).collect()
    }

    #[test]
    fn no_selection_keeps_every_row() {
        let table = fixtures::campaigns();
        let view = FilterSpec::standard().apply(&table, &FilterState::default());
        assert_eq!(view.len(), table.row_count());
    }

    #[test]
    fn organization_is_exact_match() {
        let table = fixtures::table(&[
            record(Some("ONG X"), "A", "Santos", "Urbana", Some(1.0), [0.0; 4]),
            record(Some("ONG X"), "B", "Santos", "Urbana", Some(2.0), [0.0; 4]),
            record(Some("ONG XY"), "C", "Recife", "Urbana", Some(3.0), [0.0; 4]),
            record(Some("ong x"), "D", "Recife", "Urbana", Some(4.0), [0.0; 4]),
            record(None, "E", "Natal", "Urbana", Some(5.0), [0.0; 4]),
        ]);
        let view = FilterSpec::standard().apply(&table, &query("org=ONG+X"));
        assert_eq!(view.len(), 2);
        for org in view.labels(Field::Organization) {
            assert_eq!(org.as_deref(), Some("ONG X"));
        }
    }

    #[test]
    fn range_is_inclusive_and_excludes_missing() {
        let table = fixtures::campaigns();
        let view = FilterSpec::standard().apply(&table, &query("use=Coletados&Coletados.min=5&Coletados.max=7"));
        let mut items = view.numbers(Field::ItemsCollected);
        items.sort_by(f64::total_cmp);
        assert_eq!(items, vec![5.0, 7.0]);
    }

    #[test]
    fn range_defaults_to_observed_bounds() {
        let table = fixtures::campaigns();
        let view = FilterSpec::standard().apply(&table, &query("use=Coletados"));
        // Only the row with a missing item count drops out.
        assert_eq!(view.len(), 4);
    }

    #[test]
    fn widening_a_range_never_drops_rows() {
        let table = fixtures::campaigns();
        let spec = FilterSpec::standard();
        let narrow = spec.apply(&table, &query("use=Coletados&Coletados.min=5&Coletados.max=7"));
        let wide = spec.apply(&table, &query("use=Coletados&Coletados.min=3&Coletados.max=10"));
        for row in narrow.rows() {
            assert!(wide.rows().contains(row));
        }
    }

    #[test]
    fn bounds_without_toggle_are_ignored() {
        let table = fixtures::campaigns();
        let view = FilterSpec::standard().apply(&table, &query("Coletados.min=100"));
        assert_eq!(view.len(), table.row_count());
    }

    fn cities_with_a_gap() -> Table {
        let city = Column::text("Cidade", vec![Some("Santos".into()), None, Some("Recife".into())]);
        Table::new(vec![city]).unwrap()
    }

    #[test]
    fn categorical_selection_keeps_listed_values() {
        let table = fixtures::campaigns();
        let view = FilterSpec::standard().apply(&table, &query("use=Regiao&Regiao=Santos&Regiao=Natal"));
        assert_eq!(cities(&view), vec!["Santos", "Santos", "Natal"]);
    }

    #[test]
    fn deselecting_every_option_is_a_no_op() {
        // Only the toggle reaches the server when no option is selected.
        let table = cities_with_a_gap();
        let view = FilterSpec::standard().apply(&table, &query("use=Regiao"));
        assert_eq!(view.len(), 3);

        let mut state = FilterState::default();
        state.enabled.insert("Regiao".into());
        state.selections.insert("Regiao".into(), Vec::new());
        assert_eq!(FilterSpec::standard().apply(&table, &state).len(), 3);

        let reparsed = FilterState::from_query(&state.to_query());
        assert_eq!(FilterSpec::standard().apply(&table, &reparsed).len(), 3);
    }

    #[test]
    fn selecting_every_option_drops_missing_values() {
        let table = cities_with_a_gap();
        let view = FilterSpec::standard().apply(&table, &query("use=Regiao&Regiao=Santos&Regiao=Recife"));
        assert_eq!(view.len(), 2);
    }

    #[test]
    fn enabled_choice_without_values_shows_nothing_picked() {
        let table = fixtures::campaigns();
        let panel = FilterSpec::standard().panel(&table, &query("use=Regiao"));
        let city = panel.controls.iter().find(|c| c.key == "Regiao").unwrap();
        assert!(city.enabled);
        match &city.kind {
            ControlKind::Choice { selected, .. } => assert!(selected.is_empty()),
            other => panic!("unexpected control: {other:?}"),
        }
    }

    #[test]
    fn filters_combine_with_and() {
        let table = fixtures::campaigns();
        let view = FilterSpec::standard().apply(
            &table,
            &query("org=ONG+X&use=Zoneamento&Zoneamento=Costeira&Zoneamento=Rural"),
        );
        assert_eq!(view.len(), 1);
        assert_eq!(view.numbers(Field::ItemsCollected), vec![5.0]);
    }

    #[test]
    fn filtered_view_is_subset_of_source() {
        let table = fixtures::campaigns();
        let spec = FilterSpec::standard();
        for q in ["", "org=Nobody", "use=Crianca&Crianca.min=1", "use=Campanha&Campanha=Praia+Limpa", "use=Idoso&Idoso.max=-1"] {
            let view = spec.apply(&table, &query(q));
            assert!(view.len() <= table.row_count());
            assert!(view.rows().iter().all(|&r| r < table.row_count()));
        }
    }

    #[test]
    fn reset_restores_full_table() {
        let table = fixtures::campaigns();
        let spec = FilterSpec::standard();
        let narrowed = spec.apply(&table, &query("org=ONG+X&use=Regiao&Regiao=Santos"));
        assert!(narrowed.len() < table.row_count());

        let reset = FilterState::reset();
        assert_eq!(reset, FilterState::default());
        assert_eq!(spec.apply(&table, &reset).len(), table.row_count());
    }

    #[test]
    fn unknown_or_missing_columns_are_skipped() {
        let table = fixtures::campaigns();
        let spec = FilterSpec::new(
            vec![
                ("Organizacao".into(), "Sem coluna".into()),
                ("Fantasma".into(), "Coluna inexistente".into()),
                ("Regiao".into(), "Cidade".into()),
            ],
            "Organizacao",
        );
        let view = spec.apply(&table, &query("org=ONG+X&use=Fantasma&Fantasma=1"));
        assert_eq!(view.len(), table.row_count());

        let panel = spec.panel(&table, &FilterState::default());
        assert!(panel.search.is_none());
        assert_eq!(panel.controls.len(), 1);
        assert_eq!(panel.controls[0].key, "Regiao");
    }

    #[test]
    fn panel_describes_controls_by_column_type() {
        let table = fixtures::campaigns();
        let panel = FilterSpec::standard().panel(&table, &query("org=ONG+X&use=Coletados&Coletados.max=8"));

        let search = panel.search.unwrap();
        assert_eq!(search.options, vec!["Empresa Z", "Escola Y", "ONG X"]);
        assert_eq!(search.selected.as_deref(), Some("ONG X"));
        assert_eq!(panel.controls.len(), 10);

        let items = panel.controls.iter().find(|c| c.key == "Coletados").unwrap();
        assert!(items.enabled);
        match &items.kind {
            ControlKind::Range { observed_min, observed_max, min, max } => {
                assert_eq!(*observed_min, Some(3.0));
                assert_eq!(*observed_max, Some(10.0));
                assert_eq!(*min, Some(3.0));
                assert_eq!(*max, Some(8.0));
            }
            other => panic!("unexpected control: {other:?}"),
        }

        let city = panel.controls.iter().find(|c| c.key == "Regiao").unwrap();
        assert!(!city.enabled);
        match &city.kind {
            ControlKind::Choice { options, selected } => {
                assert_eq!(options, selected);
                assert_eq!(options.len(), 4);
            }
            other => panic!("unexpected control: {other:?}"),
        }
    }

    #[test]
    fn query_round_trips_through_state() {
        let state = query("org=ONG+X&use=Regiao&use=Coletados&Coletados.min=2&Regiao=S%C3%A3o+Paulo&page=map");
        assert_eq!(state.organization.as_deref(), Some("ONG X"));
        assert_eq!(state.selections.get("Regiao"), Some(&vec!["São Paulo".to_string()]));
        assert!(!state.selections.contains_key("page"));
        assert_eq!(FilterState::from_query(&state.to_query()), state);
    }

    #[test]
    fn malformed_bounds_fall_back_to_observed() {
        let state = query("use=Coletados&Coletados.min=abc&Coletados.max=7,5");
        let bounds = state.bounds["Coletados"];
        assert_eq!(bounds.min, None);
        assert_eq!(bounds.max, Some(7.5));
    }
}
