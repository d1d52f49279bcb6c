//! Test helpers for building campaign tables in memory or on disk.

use std::path::PathBuf;

use tempfile::TempDir;

use crate::types::{Column, Field, Table};

#[derive(Debug, Clone)]
pub(crate) struct Record {
    pub org: Option<String>,
    pub role: String,
    pub campaign: String,
    pub ages: [f64; 4],
    pub items: Option<String>,
    pub zoning: String,
    pub city: String,
}

pub(crate) fn record(
    org: Option<&str>,
    campaign: &str,
    city: &str,
    zoning: &str,
    items: Option<f64>,
    ages: [f64; 4],
) -> Record {
    Record {
        org: org.map(str::to_string),
        role: "Voluntário".to_string(),
        campaign: campaign.to_string(),
        ages,
        items: items.map(|n| n.to_string()),
        zoning: zoning.to_string(),
        city: city.to_string(),
    }
}

impl Record {
    fn cells(&self) -> Vec<String> {
        let participants: f64 = self.ages.iter().sum();
        let mut cells = vec![
            self.org.clone().unwrap_or_default(),
            self.role.clone(),
            self.campaign.clone(),
            participants.to_string(),
        ];
        cells.extend(self.ages.iter().map(|a| a.to_string()));
        cells.push(self.items.clone().unwrap_or_default());
        cells.push(self.zoning.clone());
        cells.push(self.city.clone());
        cells
    }
}

pub(crate) fn write_csv(dir: &TempDir, rows: &[Record]) -> PathBuf {
    let path = dir.path().join("dados.csv");
    let mut wtr = csv::Writer::from_path(&path).unwrap();
    wtr.write_record(Field::ALL.iter().map(|f| f.header())).unwrap();
    for row in rows {
        wtr.write_record(row.cells()).unwrap();
    }
    wtr.flush().unwrap();
    path
}

pub(crate) fn table(rows: &[Record]) -> Table {
    let text = |f: fn(&Record) -> Option<String>| rows.iter().map(f).collect::<Vec<_>>();
    let number = |i: usize| {
        rows.iter()
            .map(|r| r.cells()[i].parse::<f64>().ok())
            .collect::<Vec<_>>()
    };

    Table::new(vec![
        Column::text(Field::Organization.header(), text(|r| r.org.clone())),
        Column::text(Field::ParticipantRole.header(), text(|r| Some(r.role.clone()))),
        Column::text(Field::Campaign.header(), text(|r| Some(r.campaign.clone()))),
        Column::numeric(Field::Participants.header(), number(3)),
        Column::numeric(Field::Children.header(), number(4)),
        Column::numeric(Field::Youth.header(), number(5)),
        Column::numeric(Field::Adults.header(), number(6)),
        Column::numeric(Field::Elderly.header(), number(7)),
        Column::numeric(Field::ItemsCollected.header(), number(8)),
        Column::text(Field::Zoning.header(), text(|r| Some(r.zoning.clone()))),
        Column::text(Field::City.header(), text(|r| Some(r.city.clone()))),
    ])
    .unwrap()
}

/// Five campaigns across three cities, two of them run by "ONG X".
pub(crate) fn campaigns() -> Table {
    table(&sample_records())
}

pub(crate) fn sample_records() -> Vec<Record> {
    vec![
        record(Some("ONG X"), "Praia Limpa", "Santos", "Urbana", Some(10.0), [2.0, 3.0, 4.0, 1.0]),
        record(Some("ONG X"), "Praia Limpa", "Santos", "Costeira", Some(5.0), [0.0, 1.0, 2.0, 0.0]),
        record(Some("Escola Y"), "Mangue Vivo", "Recife", "Costeira", Some(7.0), [5.0, 0.0, 1.0, 0.0]),
        record(None, "Rio Limpo", "Atlantis", "Rural", Some(3.0), [0.0, 0.0, 2.0, 2.0]),
        record(Some("Empresa Z"), "Mutirão", "Natal", "Urbana", None, [1.0, 1.0, 1.0, 1.0]),
    ]
}
