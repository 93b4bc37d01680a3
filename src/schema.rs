use getset::Getters;
use serde::Serialize;
use strum::{Display, EnumString};
use typed_builder::TypedBuilder;

use crate::text::CanonicalFormat;

/// Column layout of an output table.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum Schema {
    Maintenance,
    Status,
}
impl Schema {
    pub fn header(self) -> &'static [&'static str] {
        match self {
            Self::Maintenance => &["facility", "start_date", "end_date", "notes"],
            Self::Status => &["update_time", "facility", "status"],
        }
    }

    pub fn canonical_format(self) -> CanonicalFormat {
        match self {
            Self::Maintenance => CanonicalFormat::Date,
            Self::Status => CanonicalFormat::DateTime,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Getters, TypedBuilder, Serialize)]
#[getset(get = "pub")]
pub struct MaintenanceRecord {
    #[builder(setter(into))]
    facility: String,
    #[builder(setter(into))]
    start_date: String,
    #[builder(setter(into))]
    end_date: String,
    #[builder(setter(into))]
    notes: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Getters, TypedBuilder, Serialize)]
#[getset(get = "pub")]
pub struct StatusRecord {
    #[builder(setter(into))]
    update_time: String,
    #[builder(setter(into))]
    facility: String,
    #[builder(setter(into))]
    status: String,
}

#[derive(Clone, PartialEq, Eq, Debug, derive_more::From, Serialize)]
#[serde(untagged)]
pub enum Record {
    Maintenance(MaintenanceRecord),
    Status(StatusRecord),
}
impl Record {
    pub fn schema(&self) -> Schema {
        match self {
            Self::Maintenance(_) => Schema::Maintenance,
            Self::Status(_) => Schema::Status,
        }
    }

    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::Maintenance(r) => [&r.facility, &r.start_date, &r.end_date, &r.notes]
                .into_iter()
                .map(String::as_str)
                .collect(),
            Self::Status(r) => [&r.update_time, &r.facility, &r.status]
                .into_iter()
                .map(String::as_str)
                .collect(),
        }
    }

    pub fn facility(&self) -> &str {
        match self {
            Self::Maintenance(r) => &r.facility,
            Self::Status(r) => &r.facility,
        }
    }

    /// A record with only blank fields carries nothing worth writing.
    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|field| field.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::{MaintenanceRecord, Record, Schema, StatusRecord};

    #[test]
    fn fields_follow_header_order() {
        let record: Record = MaintenanceRecord::builder()
            .facility("gorgon")
            .start_date("2021/05/01")
            .end_date("2021/05/09")
            .notes("a || b")
            .build()
            .into();
        assert_eq!(record.schema(), Schema::Maintenance);
        assert_eq!(
            record.fields(),
            ["gorgon", "2021/05/01", "2021/05/09", "a || b"]
        );
        assert_eq!(record.fields().len(), Schema::Maintenance.header().len());

        let record: Record = StatusRecord::builder()
            .update_time("2021-05-01 13:45:00")
            .facility("genkai #3")
            .status("運転中")
            .build()
            .into();
        assert_eq!(record.facility(), "genkai #3");
        assert_eq!(record.fields().len(), Schema::Status.header().len());
    }

    #[test]
    fn blank_record_is_empty() {
        let record: Record = StatusRecord::builder()
            .update_time("")
            .facility(" ")
            .status("")
            .build()
            .into();
        assert!(record.is_empty());
    }

    #[test]
    fn schema_names() {
        assert_eq!(Schema::Maintenance.to_string(), "maintenance");
        assert_eq!("status".parse::<Schema>().unwrap(), Schema::Status);
    }
}
