//! Output file names and month grouping for the downstream archiver.

use std::collections::BTreeMap;

use time::Date;

use crate::{
    domain::{Direction, MeteringPoint},
    edifact::{EdifactMessage, PartnerConfig},
};

fn ymd(day: Date) -> String {
    format!("{:04}{:02}{:02}", day.year(), u8::from(day.month()), day.day())
}

/// `YYYYMM` of `day`.
pub fn month_key(day: Date) -> String {
    format!("{:04}{:02}", day.year(), u8::from(day.month()))
}

/// `MSCONS_<app>_<sender>_<recipient>_<YYYYMMDD>_<point>_<VERBRAUCH|ERZEUGUNG>.txt`
pub fn document_file_name(partner: &PartnerConfig, day: Date, metering_point: &MeteringPoint, direction: Direction) -> String {
    format!(
        "MSCONS_{}_{}_{}_{}_{}_{}.txt",
        partner.app_code,
        partner.sender_id,
        partner.recipient_id,
        ymd(day),
        metering_point,
        direction.file_label()
    )
}

/// A built message together with the name it is delivered under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedDocument {
    pub file_name: String,
    pub day: Date,
    pub content: EdifactMessage,
}

impl NamedDocument {
    pub fn new(partner: &PartnerConfig, day: Date, metering_point: &MeteringPoint, direction: Direction, content: EdifactMessage) -> Self {
        Self {
            file_name: document_file_name(partner, day, metering_point, direction),
            day,
            content,
        }
    }

    pub fn month(&self) -> String {
        month_key(self.day)
    }
}

/// Approximate payload size of a batch in bytes.
pub fn approximate_size(documents: &[NamedDocument]) -> usize {
    documents.iter().map(|d| d.content.len()).sum()
}

/// How bundle names are formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleNaming {
    /// One metering point converted from an uploaded log.
    Csv {
        partner: PartnerConfig,
        metering_point: MeteringPoint,
        direction: Direction,
    },
    /// Synthetic profiles for a list of metering points.
    Slp { start: Date, point_count: usize },
}

impl BundleNaming {
    fn month_bundle(&self, month: &str) -> String {
        match self {
            Self::Csv {
                partner,
                metering_point,
                direction,
            } => format!(
                "MSCONS_{}_{}_{}_{}_{}_{}_CSV.zip",
                partner.app_code,
                partner.sender_id,
                partner.recipient_id,
                month,
                metering_point,
                direction.file_label()
            ),
            Self::Slp { point_count, .. } => format!("MSCONS_{month}_{point_count}MaLo.zip"),
        }
    }

    fn master_bundle(&self, first_month: &str, last_month: &str) -> String {
        match self {
            Self::Csv {
                partner,
                metering_point,
                direction,
            } => format!(
                "MSCONS_{}_{}_{}_{}-{}_{}_{}_CSV_master.zip",
                partner.app_code,
                partner.sender_id,
                partner.recipient_id,
                first_month,
                last_month,
                metering_point,
                direction.file_label()
            ),
            Self::Slp { start, point_count } => format!("MSCONS_{}_{point_count}MaLo_master.zip", ymd(*start)),
        }
    }
}

/// A named group of documents, by index into the planned batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub name: String,
    pub documents: Vec<usize>,
}

impl Bundle {
    /// Bundle name without the archive extension.
    pub fn stem(&self) -> &str {
        self.name.strip_suffix(".zip").unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlePlan {
    /// One per calendar month, ascending.
    pub months: Vec<Bundle>,
    /// Every document.
    pub master: Bundle,
}

/// Group `documents` by the month of their day.
pub fn plan_bundles(documents: &[NamedDocument], naming: &BundleNaming) -> BundlePlan {
    let mut by_month: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (idx, doc) in documents.iter().enumerate() {
        by_month.entry(doc.month()).or_default().push(idx);
    }

    let first = by_month.keys().next().cloned().unwrap_or_default();
    let last = by_month.keys().next_back().cloned().unwrap_or_default();

    let months = by_month
        .into_iter()
        .map(|(month, docs)| Bundle {
            name: naming.month_bundle(&month),
            documents: docs,
        })
        .collect();

    BundlePlan {
        months,
        master: Bundle {
            name: naming.master_bundle(&first, &last),
            documents: (0..documents.len()).collect(),
        },
    }
}
