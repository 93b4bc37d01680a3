use log::{debug, warn};
use scraper::ElementRef;

use crate::{rule::ParsingRule, schema::Record};

/// Applies `rule` to every row in document order.
/// Rows the rule cannot parse are logged and left out.
pub fn extract_rows<'a, R, I>(rows: I, rule: &R) -> Vec<Record>
where
    R: ParsingRule + ?Sized,
    I: IntoIterator<Item = ElementRef<'a>>,
{
    let mut records = vec![];
    for (i, row) in rows.into_iter().enumerate() {
        match rule.parse_row(row) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!("Dropping row {i}: {e}");
                debug!("  Row html: {}", row.html());
            }
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use maintenance_scraping_utils::selector;
    use scraper::Html;

    use super::extract_rows;
    use crate::rule::{DateRangeNotesRule, NotesThenDatesRule};

    #[test]
    fn malformed_row_is_dropped_and_order_kept() {
        let html = Html::parse_document(
            r#"<table><tbody>
                <tr><td>Pluto</td><td>first</td><td>1 May 2021</td><td>2 May 2021</td></tr>
                <tr><td>Pluto</td><td>missing dates</td></tr>
                <tr><td>Scarborough</td><td>third</td><td>3 May 2021</td><td>4 May 2021</td></tr>
            </tbody></table>"#,
        );
        let rule = NotesThenDatesRule::builder().build();
        let records = extract_rows(html.select(selector!("tr")), &rule);
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].fields(),
            ["Pluto", "2021/05/01", "2021/05/02", "first"]
        );
        assert_eq!(
            records[1].fields(),
            ["Scarborough", "2021/05/03", "2021/05/04", "third"]
        );
    }

    #[test]
    fn surviving_count_is_inputs_minus_malformed() {
        let rows = [
            "01/05/2021 - 02/05/2021",
            "TBC",
            "03/05/2021 - 04/05/2021",
            "05/05/2021 -",
            "06/05/2021 - 31/02/2021",
            "07/05/2021 - 08/05/2021",
        ]
        .map(|dates| format!("<tr><td>{dates}</td><td><ul><li>n</li></ul></td></tr>"))
        .concat();
        let html = Html::parse_document(&format!("<table><tbody>{rows}</tbody></table>"));
        let rule = DateRangeNotesRule::builder().facility("gorgon").build();
        let records = extract_rows(html.select(selector!("tr")), &rule);
        assert_eq!(records.len(), 6 - 3);
        let starts = records
            .iter()
            .map(|r| r.fields()[1].to_owned())
            .collect::<Vec<_>>();
        assert_eq!(starts, ["2021/05/01", "2021/05/03", "2021/05/07"]);
    }

    #[test]
    fn empty_container() {
        let html = Html::parse_document("<table><tbody></tbody></table>");
        let rule = NotesThenDatesRule::builder().build();
        assert!(extract_rows(html.select(selector!("tr")), &rule).is_empty());
    }
}
