use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeSet;

use crate::error::DashboardError;

/// Columns the dashboard knows about, keyed by their normalized header text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Field {
    Organization,
    ParticipantRole,
    Campaign,
    Participants,
    Children,
    Youth,
    Adults,
    Elderly,
    ItemsCollected,
    Zoning,
    City,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::Organization,
        Field::ParticipantRole,
        Field::Campaign,
        Field::Participants,
        Field::Children,
        Field::Youth,
        Field::Adults,
        Field::Elderly,
        Field::ItemsCollected,
        Field::Zoning,
        Field::City,
    ];

    pub const AGE_BRACKETS: [Field; 4] = [Field::Children, Field::Youth, Field::Adults, Field::Elderly];

    /// Header text after trimming and colon removal.
    pub fn header(self) -> &'static str {
        match self {
            Field::Organization => {
                "Representa alguma Organização/ONG/Escola/Empresa etc? Se sim, descreva o nome"
            }
            Field::ParticipantRole => "Participante como",
            Field::Campaign => "Nome",
            Field::Participants => "Número aproximado de participantes",
            Field::Children => "Número aproximado de crianças",
            Field::Youth => "Número aproximado de jovens",
            Field::Adults => "Número aproximado de adultos",
            Field::Elderly => "Número aproximado de idosos",
            Field::ItemsCollected => "Quantidade total de itens coletados",
            Field::Zoning => "Zoneamento",
            Field::City => "Cidade",
        }
    }

    /// Logical key used by the filter panel and in query strings.
    pub fn key(self) -> &'static str {
        match self {
            Field::Organization => "Organizacao",
            Field::ParticipantRole => "Tipo_participante",
            Field::Campaign => "Campanha",
            Field::Participants => "Participantes",
            Field::Children => "Crianca",
            Field::Youth => "Jovem",
            Field::Adults => "Adulto",
            Field::Elderly => "Idoso",
            Field::ItemsCollected => "Coletados",
            Field::Zoning => "Zoneamento",
            Field::City => "Regiao",
        }
    }

    /// Short display label. Age brackets use their plural bracket name.
    pub fn label(self) -> &'static str {
        match self {
            Field::Children => "Crianças",
            Field::Youth => "Jovens",
            Field::Adults => "Adultos",
            Field::Elderly => "Idosos",
            Field::Participants => "Participantes",
            Field::ItemsCollected => "Itens coletados",
            Field::Organization => "Organização",
            Field::ParticipantRole => "Participante como",
            Field::Campaign => "Campanha",
            Field::Zoning => "Zoneamento",
            Field::City => "Cidade",
        }
    }

    /// Every page aggregates over these, so a file without them is rejected at load.
    pub fn is_required(self) -> bool {
        !matches!(self, Field::Organization | Field::ParticipantRole)
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Field::Participants
                | Field::Children
                | Field::Youth
                | Field::Adults
                | Field::Elderly
                | Field::ItemsCollected
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Column { name: name.into(), data: ColumnData::Numeric(values) }
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Column { name: name.into(), data: ColumnData::Text(values) }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.data, ColumnData::Numeric(_))
    }

    pub fn number_at(&self, row: usize) -> Option<f64> {
        match &self.data {
            ColumnData::Numeric(v) => v.get(row).copied().flatten(),
            ColumnData::Text(_) => None,
        }
    }

    /// Cell rendered as text; numbers print without a trailing `.0` when integral.
    pub fn label_at(&self, row: usize) -> Option<Cow<'_, str>> {
        match &self.data {
            ColumnData::Numeric(v) => v.get(row).copied().flatten().map(|n| Cow::Owned(format_number(n))),
            ColumnData::Text(v) => v.get(row).and_then(|s| s.as_deref()).map(Cow::Borrowed),
        }
    }

    /// Observed (min, max) over non-missing values.
    pub fn numeric_range(&self) -> Option<(f64, f64)> {
        let ColumnData::Numeric(values) = &self.data else {
            return None;
        };
        values.iter().flatten().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    /// Sorted distinct non-missing, non-empty values.
    pub fn distinct_labels(&self) -> Vec<String> {
        let set: BTreeSet<String> = (0..self.len())
            .filter_map(|row| self.label_at(row))
            .filter(|s| !s.is_empty())
            .map(Cow::into_owned)
            .collect();
        set.into_iter().collect()
    }
}

pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// The loaded source table. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self, DashboardError> {
        let rows = columns.first().map(Column::len).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.len() != rows) {
            return Err(DashboardError::RaggedColumn {
                column: bad.name.clone(),
                found: bad.len(),
                expected: rows,
            });
        }
        Ok(Table { columns, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn field(&self, field: Field) -> Option<&Column> {
        self.column(field.header())
    }

    pub fn view(&self) -> View<'_> {
        View { table: self, rows: (0..self.rows).collect() }
    }
}

/// Row subset of a [`Table`]. Only ever narrowed, so it stays a subset of its table.
#[derive(Debug, Clone)]
pub struct View<'a> {
    table: &'a Table,
    rows: Vec<usize>,
}

impl<'a> View<'a> {
    pub fn table(&self) -> &'a Table {
        self.table
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(usize) -> bool) {
        self.rows.retain(|&row| keep(row));
    }

    /// Numeric cells of `field` for the rows in view, missing cells dropped.
    pub fn numbers(&self, field: Field) -> Vec<f64> {
        match self.table.field(field) {
            Some(column) => self.rows.iter().filter_map(|&row| column.number_at(row)).collect(),
            None => Vec::new(),
        }
    }

    /// Cells of `field` as labels, aligned with `rows()`.
    pub fn labels(&self, field: Field) -> Vec<Option<Cow<'a, str>>> {
        match self.table.field(field) {
            Some(column) => self.rows.iter().map(|&row| column.label_at(row)).collect(),
            None => vec![None; self.rows.len()],
        }
    }

    /// Numeric cells of `field`, aligned with `rows()`.
    pub fn values(&self, field: Field) -> Vec<Option<f64>> {
        match self.table.field(field) {
            Some(column) => self.rows.iter().map(|&row| column.number_at(row)).collect(),
            None => vec![None; self.rows.len()],
        }
    }
}
