use crate::types::{Field, View};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const TOP_CAMPAIGNS: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub rows: usize,
    pub total_items: f64,
    pub mean_items: Option<f64>,
    pub campaigns: usize,
    pub participants: f64,
    pub children: f64,
    pub youth: f64,
    pub adults: f64,
    pub elderly: f64,
}

/// Headline metrics for the Home page. Missing cells are skipped.
pub fn summarize(view: &View) -> Summary {
    let items = view.numbers(Field::ItemsCollected);
    let total_items: f64 = items.iter().sum();
    let mean_items = (!items.is_empty()).then(|| total_items / items.len() as f64);

    let campaigns = view
        .labels(Field::Campaign)
        .into_iter()
        .flatten()
        .collect::<BTreeSet<_>>()
        .len();

    let sum = |field| view.numbers(field).iter().sum::<f64>();

    Summary {
        rows: view.len(),
        total_items,
        mean_items,
        campaigns,
        participants: sum(Field::Participants),
        children: sum(Field::Children),
        youth: sum(Field::Youth),
        adults: sum(Field::Adults),
        elderly: sum(Field::Elderly),
    }
}

/// Sum `value` per distinct `key`, ordered by key. Rows with a missing key are dropped.
pub fn sum_by(view: &View, key: Field, value: Field) -> Vec<(String, f64)> {
    let mut groups: BTreeMap<String, f64> = BTreeMap::new();
    for (k, v) in view.labels(key).into_iter().zip(view.values(value)) {
        if let Some(k) = k {
            *groups.entry(k.into_owned()).or_insert(0.0) += v.unwrap_or(0.0);
        }
    }
    groups.into_iter().collect()
}

/// Campaign names by number of entries, most frequent first, at most `limit`.
pub fn top_campaigns(view: &View, limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for name in view.labels(Field::Campaign).into_iter().flatten() {
        *counts.entry(name.into_owned()).or_insert(0) += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

/// Totals of the four age-bracket columns, in bracket order.
pub fn age_totals(view: &View) -> Vec<(&'static str, f64)> {
    Field::AGE_BRACKETS
        .iter()
        .map(|f| (f.label(), view.numbers(*f).iter().sum()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeByCity {
    pub city: String,
    pub bracket: &'static str,
    pub quantity: f64,
}

/// Age-bracket totals per city in long form: one row per city and bracket.
pub fn age_by_city(view: &View) -> Vec<AgeByCity> {
    let wide: Vec<(&'static str, Vec<(String, f64)>)> = Field::AGE_BRACKETS
        .iter()
        .map(|f| (f.label(), sum_by(view, Field::City, *f)))
        .collect();

    let mut long = Vec::new();
    for (bracket, per_city) in wide {
        for (city, quantity) in per_city {
            long.push(AgeByCity { city, bracket, quantity });
        }
    }
    long
}
