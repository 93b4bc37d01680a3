use std::{io, iter, path::PathBuf};

use chrono::NaiveDateTime;
use getset::{CopyGetters, Getters};
use itertools::Itertools;
use log::{error, info, warn};
use maintenance_scraping_utils::selector;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

use crate::{
    config::Config,
    extract::extract_rows,
    rule::{DateRangeNotesRule, NotesThenDatesRule, ParsingRule, RuleOptions, UnitStatusRule},
    schema::Record,
    session::{with_session, DocumentSource, LoadError, SavedPages, SessionError},
    site::{Run, Site},
    text::{collapse_whitespace, fold_width, parse_localized_date, CanonicalFormat, DateFormatError},
    writer::{OutputTable, WriteError},
};

const CHEVRON_FACILITIES: [(&str, &str); 2] = [
    ("gorgon LNG facility", "gorgon"),
    ("wheatstone LNG facility", "wheatstone"),
];
const KYUDEN_LAST_UPDATE_FORMAT: &str = "%Y年%m月%d日 %H時%M分";

#[derive(Debug, Error)]
#[error("{site}: {query} not found")]
pub struct ContainerNotFoundError {
    pub site: Site,
    pub query: String,
}

/// Failure of a single site's job.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    ContainerNotFound(#[from] ContainerNotFoundError),
    #[error("Invalid last-update time: {0}")]
    SharedTimestamp(#[source] DateFormatError),
    #[error("Failed to write rows: {0}")]
    Write(#[from] WriteError),
}
impl JobError {
    /// Errors after which the remaining sites cannot run either.
    pub fn into_run_error(self) -> Result<Self, RunError> {
        match self {
            Self::Load(LoadError::Session(e)) => Err(e.into()),
            Self::Write(e) => Err(e.into()),
            e => Ok(e),
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("Failed to write the output table: {0}")]
    Write(#[from] WriteError),
    #[error("Failed to prepare the output directory: {0}")]
    Io(#[from] io::Error),
}

/// Everything a run needs to know about itself, created once at start-up.
#[derive(Getters, CopyGetters)]
pub struct RunContext {
    #[getset(get_copy = "pub")]
    run: Run,
    #[getset(get = "pub")]
    output_dir: PathBuf,
    #[getset(get = "pub")]
    config: Config,
}
impl RunContext {
    pub fn new(run: Run, config: Config, started_at: NaiveDateTime) -> Self {
        let output_dir = config
            .output_root
            .join(format!("{run}_{}", started_at.format("%Y-%m-%d_%H,%M,%S")));
        Self {
            run,
            output_dir,
            config,
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join("output.csv")
    }

    pub fn snapshot_path(&self, site: Site) -> PathBuf {
        SavedPages::path_of(&self.output_dir, site)
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub written: Vec<(Site, usize)>,
    pub failed: Vec<(Site, JobError)>,
    /// Rows of the output table, for runs that keep it.
    pub table: Option<Vec<Record>>,
}

/// Creates the output directory and table, then scrapes every site of the run.
/// `source` is closed before this returns.
pub fn run<S: DocumentSource>(ctx: &RunContext, source: S) -> Result<RunSummary, RunError> {
    let prepared = prepare_output(ctx);
    with_session(source, |source| {
        let mut table = prepared?;
        let mut summary = run_jobs(ctx, source, &mut table)?;
        summary.table = table.into_rows();
        info!("All done.");
        Ok(summary)
    })
}

fn prepare_output(ctx: &RunContext) -> Result<OutputTable, RunError> {
    fs_err::create_dir_all(ctx.output_dir())?;
    info!("Files will be written in the directory: {:?}", ctx.output_dir());
    Ok(OutputTable::create(
        ctx.output_path(),
        ctx.run().schema(),
        ctx.run().keeps_table(),
    )?)
}

/// Runs the sites one after another. A failed site is logged and skipped;
/// session and output failures end the run.
pub fn run_jobs<S: DocumentSource + ?Sized>(
    ctx: &RunContext,
    source: &mut S,
    table: &mut OutputTable,
) -> Result<RunSummary, RunError> {
    let mut summary = RunSummary::default();
    for &site in ctx.run().sites() {
        info!("Scraping {site}");
        match run_site(ctx, source, site, table) {
            Ok(written) => {
                info!("  Wrote {written} rows for {site}");
                summary.written.push((site, written));
            }
            Err(e) => {
                let e = e.into_run_error()?;
                error!("  Skipping {site}: {e}");
                summary.failed.push((site, e));
            }
        }
    }
    Ok(summary)
}

pub fn run_site<S: DocumentSource + ?Sized>(
    ctx: &RunContext,
    source: &mut S,
    site: Site,
    table: &mut OutputTable,
) -> Result<usize, JobError> {
    let markup = source.load(site)?;
    let snapshot = ctx.snapshot_path(site);
    if let Err(e) = fs_err::write(&snapshot, &markup) {
        warn!("  Could not save the page snapshot: {e}");
    }
    let html = Html::parse_document(&markup);
    scrape_document(site, &html, &ctx.config().rule_options(site), table)
}

/// Locates every container of the page before writing anything, so a
/// missing container leaves no rows of this site behind.
pub fn scrape_document(
    site: Site,
    html: &Html,
    options: &RuleOptions,
    table: &mut OutputTable,
) -> Result<usize, JobError> {
    let batches = locate_batches(site, html, options)?;
    let mut written = 0;
    for Batch { rows, rule } in batches {
        let records = extract_rows(rows, rule.as_ref());
        written += table.write_rows(records)?;
    }
    Ok(written)
}

/// Rows of one container, and the rule that parses them.
struct Batch<'a> {
    rows: Vec<ElementRef<'a>>,
    rule: Box<dyn ParsingRule>,
}

fn locate_batches<'a>(
    site: Site,
    html: &'a Html,
    options: &RuleOptions,
) -> Result<Vec<Batch<'a>>, JobError> {
    let not_found = |query: &str| ContainerNotFoundError {
        site,
        query: query.to_owned(),
    };
    Ok(match site {
        Site::Chevron => CHEVRON_FACILITIES
            .into_iter()
            .map(|(heading, facility)| -> Result<_, JobError> {
                let tbody = table_under_heading(html, selector!("h4"), heading, 3)
                    .ok_or_else(|| not_found(&format!("Table under h4 {heading:?}")))?;
                Ok(Batch {
                    rows: body_rows(tbody).skip(1).collect(),
                    rule: Box::new(
                        DateRangeNotesRule::builder()
                            .facility(facility)
                            .build()
                            .configured(options),
                    ),
                })
            })
            .try_collect::<_, Vec<_>, _>()?,
        Site::Woodside => {
            let tbody = html
                .select(selector!("table.table.k-table > tbody"))
                .next()
                .ok_or_else(|| not_found("table.table.k-table > tbody"))?;
            vec![Batch {
                rows: body_rows(tbody).skip(1).collect(),
                rule: Box::new(NotesThenDatesRule::builder().build().configured(options)),
            }]
        }
        Site::Genkai | Site::Sendai => {
            let last_update = html
                .select(selector!("#lastupdate"))
                .find(|e| e.text().any(|t| t.contains('月')))
                .ok_or_else(|| not_found("#lastupdate"))?;
            let update_time = parse_localized_date(
                &fold_width(&collapse_whitespace(
                    &last_update.text().collect::<String>(),
                )),
                options
                    .date_format
                    .as_deref()
                    .unwrap_or(KYUDEN_LAST_UPDATE_FORMAT),
                CanonicalFormat::DateTime,
            )
            .map_err(JobError::SharedTimestamp)?;
            let tbodies = html
                .select(selector!(
                    "div.nuclear__dataArea > table.newclear__hatsudenki > tbody"
                ))
                .collect_vec();
            if tbodies.is_empty() {
                return Err(not_found("Power generation tables").into());
            }
            tbodies
                .into_iter()
                .map(|tbody| Batch {
                    rows: body_rows(tbody).collect(),
                    rule: Box::new(
                        UnitStatusRule::builder()
                            .facility(site.to_string())
                            .update_time(update_time.clone())
                            .build(),
                    ),
                })
                .collect()
        }
    })
}

fn body_rows<'a>(tbody: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    tbody.select(selector!("tr"))
}

/// Finds the first `heading` containing `needle`, climbs `levels` ancestors
/// and returns the first `tbody` below.
fn table_under_heading<'a>(
    html: &'a Html,
    heading: &Selector,
    needle: &str,
    levels: usize,
) -> Option<ElementRef<'a>> {
    html.select(heading)
        .filter(|h| h.text().any(|t| t.contains(needle)))
        .find_map(|h| {
            iter::successors(Some(h), |e| e.parent().and_then(ElementRef::wrap))
                .nth(levels)?
                .select(selector!("tbody"))
                .next()
        })
}
