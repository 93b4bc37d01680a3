use itertools::Itertools;
use maintenance_scraping_utils::selector;
use scraper::ElementRef;
use serde::Deserialize;
use thiserror::Error;
use typed_builder::TypedBuilder;

use crate::{
    schema::{MaintenanceRecord, Record, Schema, StatusRecord},
    text::{collapse_whitespace, fold_width, parse_localized_date, DateFormatError},
};

pub const DEFAULT_NOTE_DELIMITER: &str = " || ";
pub const DEFAULT_RANGE_DELIMITER: &str = " - ";

/// Maps one raw table row to a record.
///
/// Any context a rule needs beyond the row itself (facility name, a timestamp
/// shared by the whole table) is stored in the rule value.
pub trait ParsingRule {
    fn schema(&self) -> Schema;
    fn parse_row(&self, row: ElementRef) -> Result<Record, RowParseError>;
}

#[derive(Debug, Error)]
pub enum RowParseError {
    #[error("{0} not found")]
    Missing(&'static str),
    #[error("{0} is empty")]
    Empty(&'static str),
    #[error("Expected {expected} values in {what}, found {found}: {text:?}")]
    Shape {
        what: &'static str,
        expected: usize,
        found: usize,
        text: String,
    },
    #[error("Invalid date: {0}")]
    Date(#[from] DateFormatError),
}

/// Per-site overrides read from the configuration file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleOptions {
    pub date_format: Option<String>,
    pub note_delimiter: Option<String>,
    pub range_delimiter: Option<String>,
    pub column_order: ColumnOrder,
}

/// Zero-based `td` index of each field; `None` keeps the rule's default.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnOrder {
    pub facility: Option<usize>,
    pub dates: Option<usize>,
    pub start_date: Option<usize>,
    pub end_date: Option<usize>,
    pub notes: Option<usize>,
}

fn cells(row: ElementRef) -> Vec<ElementRef> {
    row.select(selector!("td")).collect_vec()
}

fn cell<'a>(
    cells: &[ElementRef<'a>],
    index: usize,
    name: &'static str,
) -> Result<ElementRef<'a>, RowParseError> {
    cells.get(index).copied().ok_or(RowParseError::Missing(name))
}

fn text_of(elem: ElementRef) -> String {
    collapse_whitespace(&elem.text().collect::<String>())
}

/// A date range in one cell and the notes as a bullet list in another.
#[derive(Clone, Debug, TypedBuilder)]
pub struct DateRangeNotesRule {
    #[builder(setter(into))]
    facility: String,
    #[builder(default = "%d/%m/%Y".to_owned(), setter(into))]
    date_format: String,
    #[builder(default = DEFAULT_RANGE_DELIMITER.to_owned(), setter(into))]
    range_delimiter: String,
    #[builder(default = DEFAULT_NOTE_DELIMITER.to_owned(), setter(into))]
    note_delimiter: String,
    #[builder(default = 0)]
    dates_column: usize,
    #[builder(default = 1)]
    notes_column: usize,
}
impl DateRangeNotesRule {
    pub fn configured(mut self, options: &RuleOptions) -> Self {
        if let Some(date_format) = &options.date_format {
            self.date_format = date_format.clone();
        }
        if let Some(delimiter) = &options.range_delimiter {
            self.range_delimiter = delimiter.clone();
        }
        if let Some(delimiter) = &options.note_delimiter {
            self.note_delimiter = delimiter.clone();
        }
        let order = options.column_order;
        self.dates_column = order.dates.unwrap_or(self.dates_column);
        self.notes_column = order.notes.unwrap_or(self.notes_column);
        self
    }
}
impl ParsingRule for DateRangeNotesRule {
    fn schema(&self) -> Schema {
        Schema::Maintenance
    }

    fn parse_row(&self, row: ElementRef) -> Result<Record, RowParseError> {
        let cells = cells(row);
        let range = text_of(cell(&cells, self.dates_column, "Date range cell")?);
        let parts = range.split(self.range_delimiter.as_str()).collect_vec();
        let [start, end] = parts[..] else {
            return Err(RowParseError::Shape {
                what: "date range",
                expected: 2,
                found: parts.len(),
                text: range.clone(),
            });
        };
        let format = self.schema().canonical_format();
        let start_date = parse_localized_date(start, &self.date_format, format)?;
        let end_date = parse_localized_date(end, &self.date_format, format)?;

        let notes = cell(&cells, self.notes_column, "Notes cell")?
            .select(selector!("ul > li"))
            .map(text_of)
            .join(&self.note_delimiter);

        Ok(MaintenanceRecord::builder()
            .facility(self.facility.clone())
            .start_date(start_date)
            .end_date(end_date)
            .notes(notes)
            .build()
            .into())
    }
}

/// Facility and free-text notes first, then a start and an end date column.
#[derive(Clone, Debug, TypedBuilder)]
pub struct NotesThenDatesRule {
    #[builder(default = "%d %B %Y".to_owned(), setter(into))]
    date_format: String,
    #[builder(default = 0)]
    facility_column: usize,
    #[builder(default = 1)]
    notes_column: usize,
    #[builder(default = 2)]
    start_date_column: usize,
    #[builder(default = 3)]
    end_date_column: usize,
}
impl NotesThenDatesRule {
    pub fn configured(mut self, options: &RuleOptions) -> Self {
        if let Some(date_format) = &options.date_format {
            self.date_format = date_format.clone();
        }
        let order = options.column_order;
        self.facility_column = order.facility.unwrap_or(self.facility_column);
        self.notes_column = order.notes.unwrap_or(self.notes_column);
        self.start_date_column = order.start_date.unwrap_or(self.start_date_column);
        self.end_date_column = order.end_date.unwrap_or(self.end_date_column);
        self
    }
}
impl ParsingRule for NotesThenDatesRule {
    fn schema(&self) -> Schema {
        Schema::Maintenance
    }

    fn parse_row(&self, row: ElementRef) -> Result<Record, RowParseError> {
        let cells = cells(row);
        let facility = text_of(cell(&cells, self.facility_column, "Facility cell")?);
        if facility.is_empty() {
            return Err(RowParseError::Empty("Facility"));
        }
        let notes = text_of(cell(&cells, self.notes_column, "Notes cell")?);
        let format = self.schema().canonical_format();
        let start_date = parse_localized_date(
            &text_of(cell(&cells, self.start_date_column, "Start date cell")?),
            &self.date_format,
            format,
        )?;
        let end_date = parse_localized_date(
            &text_of(cell(&cells, self.end_date_column, "End date cell")?),
            &self.date_format,
            format,
        )?;

        Ok(MaintenanceRecord::builder()
            .facility(facility)
            .start_date(start_date)
            .end_date(end_date)
            .notes(notes)
            .build()
            .into())
    }
}

/// One status value per unit; the unit number is the first character of the
/// row's `th`, and the whole table shares one update time.
#[derive(Clone, Debug, TypedBuilder)]
pub struct UnitStatusRule {
    #[builder(setter(into))]
    facility: String,
    /// Already in canonical form.
    #[builder(setter(into))]
    update_time: String,
}
impl ParsingRule for UnitStatusRule {
    fn schema(&self) -> Schema {
        Schema::Status
    }

    fn parse_row(&self, row: ElementRef) -> Result<Record, RowParseError> {
        let status = text_of(
            row.select(selector!("td"))
                .next()
                .ok_or(RowParseError::Missing("Status cell"))?,
        );
        let unit = text_of(
            row.select(selector!("th"))
                .next()
                .ok_or(RowParseError::Missing("Unit header cell"))?,
        )
        .chars()
        .next()
        .map(|c| fold_width(&c.to_string()))
        .ok_or(RowParseError::Empty("Unit header cell"))?;

        Ok(StatusRecord::builder()
            .update_time(self.update_time.clone())
            .facility(format!("{} #{}", self.facility, unit))
            .status(status)
            .build()
            .into())
    }
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::{
        ColumnOrder, DateRangeNotesRule, NotesThenDatesRule, ParsingRule, RowParseError,
        RuleOptions, UnitStatusRule,
    };
    use crate::schema::{MaintenanceRecord, Record, StatusRecord};
    use maintenance_scraping_utils::selector;

    fn first_row(html: &Html) -> scraper::ElementRef<'_> {
        html.select(selector!("tr")).next().unwrap()
    }

    fn table(rows: &str) -> Html {
        Html::parse_document(&format!("<table><tbody>{rows}</tbody></table>"))
    }

    #[test]
    fn date_range_with_bullet_notes() {
        let html = table(
            r#"<tr>
                <td> 03/05/2021 - 09/05/2021 </td>
                <td><ul><li> planned outage </li><li>unit
                    offline</li></ul></td>
            </tr>"#,
        );
        let rule = DateRangeNotesRule::builder().facility("gorgon").build();
        assert_eq!(
            rule.parse_row(first_row(&html)).unwrap(),
            Record::from(
                MaintenanceRecord::builder()
                    .facility("gorgon")
                    .start_date("2021/05/03")
                    .end_date("2021/05/09")
                    .notes("planned outage || unit offline")
                    .build()
            )
        );
    }

    #[test]
    fn date_range_without_second_date() {
        let html = table("<tr><td>03/05/2021</td><td><ul><li>x</li></ul></td></tr>");
        let rule = DateRangeNotesRule::builder().facility("gorgon").build();
        assert!(matches!(
            rule.parse_row(first_row(&html)),
            Err(RowParseError::Shape { found: 1, .. })
        ));
    }

    #[test]
    fn date_range_without_notes_cell() {
        let html = table("<tr><td>03/05/2021 - 04/05/2021</td></tr>");
        let rule = DateRangeNotesRule::builder().facility("gorgon").build();
        assert!(matches!(
            rule.parse_row(first_row(&html)),
            Err(RowParseError::Missing(_))
        ));
    }

    #[test]
    fn date_range_with_options() {
        let html = table(
            "<tr><td><ul><li>a</li><li>b</li></ul></td><td>2021-05-03 ~ 2021-05-04</td></tr>",
        );
        let options = RuleOptions {
            date_format: Some("%Y-%m-%d".to_owned()),
            note_delimiter: Some("; ".to_owned()),
            range_delimiter: Some(" ~ ".to_owned()),
            column_order: ColumnOrder {
                dates: Some(1),
                notes: Some(0),
                ..Default::default()
            },
        };
        let rule = DateRangeNotesRule::builder()
            .facility("wheatstone")
            .build()
            .configured(&options);
        let record = rule.parse_row(first_row(&html)).unwrap();
        assert_eq!(
            record.fields(),
            ["wheatstone", "2021/05/03", "2021/05/04", "a; b"]
        );
    }

    #[test]
    fn notes_then_dates() {
        let html = table(
            "<tr><td>Pluto LNG</td><td>Train 1 shutdown</td><td>7 March 2022</td><td>21 March 2022</td></tr>",
        );
        let rule = NotesThenDatesRule::builder().build();
        assert_eq!(
            rule.parse_row(first_row(&html)).unwrap().fields(),
            ["Pluto LNG", "2022/03/07", "2022/03/21", "Train 1 shutdown"]
        );
    }

    #[test]
    fn notes_then_dates_rejects_bad_date() {
        let html =
            table("<tr><td>Pluto LNG</td><td>x</td><td>TBC</td><td>21 March 2022</td></tr>");
        let rule = NotesThenDatesRule::builder().build();
        assert!(matches!(
            rule.parse_row(first_row(&html)),
            Err(RowParseError::Date(_))
        ));
    }

    #[test]
    fn notes_then_dates_rejects_blank_facility() {
        let html = table("<tr><td> </td><td>x</td><td>7 March 2022</td><td>8 March 2022</td></tr>");
        let rule = NotesThenDatesRule::builder().build();
        assert!(matches!(
            rule.parse_row(first_row(&html)),
            Err(RowParseError::Empty(_))
        ));
    }

    #[test]
    fn unit_status() {
        let html = table("<tr><th>３号機</th><td> 運転中 </td></tr>");
        let rule = UnitStatusRule::builder()
            .facility("genkai")
            .update_time("2021-05-01 13:45:00")
            .build();
        assert_eq!(
            rule.parse_row(first_row(&html)).unwrap(),
            Record::from(
                StatusRecord::builder()
                    .update_time("2021-05-01 13:45:00")
                    .facility("genkai #3")
                    .status("運転中")
                    .build()
            )
        );
    }

    #[test]
    fn unit_status_needs_header_cell() {
        let html = table("<tr><td>運転中</td></tr>");
        let rule = UnitStatusRule::builder()
            .facility("sendai")
            .update_time("2021-05-01 13:45:00")
            .build();
        assert!(matches!(
            rule.parse_row(first_row(&html)),
            Err(RowParseError::Missing(_))
        ));
    }
}
