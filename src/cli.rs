//! CLI argument definitions using clap derive macros.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use catalog_spider::{DEFAULT_CONCURRENCY, DEFAULT_OUTPUT_DIR, RequestModifier};
use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use url::Url;

/// Popularity windows the site publishes, in days.
pub const POPULAR_RANGES: [u16; 3] = [7, 30, 60];

/// Default popularity window.
const DEFAULT_POPULAR_RANGE: u16 = 7;

/// Default popular top-N.
const DEFAULT_POPULAR_COUNT: usize = 50;

/// Popular listings are never walked past this many pages.
pub const POPULAR_MAX_PAGES: usize = 5;

/// Crawl a paginated catalog and download every listed artifact.
///
/// Each artifact lands in its own directory with a metadata.json, its
/// torrent file, a thumbnail and an extrafanart/ folder of extra images.
/// Files already on disk are skipped, so an interrupted run can be resumed.
#[derive(Parser, Debug)]
#[command(name = "catalog-spider")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Target website host (required by `date` and `popular`)
    #[arg(short = 'H', long, global = true)]
    pub host: Option<String>,

    /// Maximum concurrent artifact downloads (1-100)
    #[arg(short = 'c', long, global = true, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: u8,

    /// Stop after this many artifacts (unlimited when omitted)
    #[arg(short = 'n', long, global = true)]
    pub limit: Option<usize>,

    /// Output directory
    #[arg(short = 'o', long, global = true, default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// Cookie sent with every request, as NAME=VALUE (repeatable)
    #[arg(long = "cookie", value_name = "NAME=VALUE", global = true)]
    pub cookies: Vec<RequestModifier>,

    #[command(subcommand)]
    pub command: Command,
}

/// Crawl modes.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Crawl from a list page URL
    Url {
        /// First list page to crawl
        list_url: Url,
    },

    /// Crawl the listing of one publish date
    Date {
        /// Date as YYYY-M-D, or `now` for today
        #[arg(default_value = "now")]
        date: DateSpec,
    },

    /// Crawl the most popular artifacts of a recent window
    Popular {
        /// Window in days (7, 30 or 60)
        #[arg(default_value_t = DEFAULT_POPULAR_RANGE, value_parser = parse_popular_range)]
        range: u16,

        /// How many of the top artifacts to fetch (at most five pages are read)
        #[arg(default_value_t = DEFAULT_POPULAR_COUNT)]
        count: usize,
    },
}

/// A calendar date, or today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSpec {
    /// The local date when the crawl starts.
    Now,
    /// A fixed date.
    On(NaiveDate),
}

impl DateSpec {
    /// Resolves `Now` against `today`.
    pub fn resolve(self, today: NaiveDate) -> NaiveDate {
        match self {
            Self::Now => today,
            Self::On(date) => date,
        }
    }
}

impl FromStr for DateSpec {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.eq_ignore_ascii_case("now") {
            return Ok(Self::Now);
        }
        let invalid = || format!("expected YYYY-M-D or `now`, got `{raw}`");
        let mut parts = raw.split('-');
        let (Some(y), Some(m), Some(d), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        let year = y.parse::<i32>().map_err(|_| invalid())?;
        let month = m.parse::<u32>().map_err(|_| invalid())?;
        let day = d.parse::<u32>().map_err(|_| invalid())?;
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self::On)
            .ok_or_else(|| format!("`{raw}` is not a calendar date"))
    }
}

fn parse_popular_range(raw: &str) -> Result<u16, String> {
    let range: u16 = raw
        .parse()
        .map_err(|_| format!("unknown time range `{raw}`"))?;
    if POPULAR_RANGES.contains(&range) {
        Ok(range)
    } else {
        Err(format!("time range must be one of 7, 30, 60; got {range}"))
    }
}

/// Where one crawl starts, where it writes, and how many items it takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlPlan {
    /// First list page.
    pub start_url: Url,
    /// Directory receiving artifact directories.
    pub output_dir: PathBuf,
    /// Item limit for this crawl.
    pub limit: Option<usize>,
    /// Page cap for this crawl.
    pub max_pages: Option<usize>,
}

impl Args {
    /// Turns the selected subcommand into a [`CrawlPlan`].
    ///
    /// `today` resolves `date now`.
    ///
    /// # Errors
    ///
    /// Fails when `date` or `popular` is used without `--host`, or the host
    /// does not form a valid URL.
    pub fn plan(&self, today: NaiveDate) -> Result<CrawlPlan> {
        match &self.command {
            Command::Url { list_url } => Ok(CrawlPlan {
                start_url: list_url.clone(),
                output_dir: self.output.clone(),
                limit: self.limit,
                max_pages: None,
            }),
            Command::Date { date } => {
                let date = date.resolve(today);
                let start_url = self.site_url(&format!(
                    "{:04}/{:02}/{:02}",
                    date.year(),
                    date.month(),
                    date.day()
                ))?;
                Ok(CrawlPlan {
                    start_url,
                    output_dir: date_output_dir(&self.output, date),
                    limit: self.limit,
                    max_pages: None,
                })
            }
            Command::Popular { range, count } => Ok(CrawlPlan {
                start_url: self.site_url(&format!("popular/{range}"))?,
                output_dir: self.output.join(format!("last-{range}-top-{count}")),
                limit: Some(*count),
                max_pages: Some(POPULAR_MAX_PAGES),
            }),
        }
    }

    fn site_url(&self, path: &str) -> Result<Url> {
        let Some(host) = self.host.as_deref() else {
            bail!(
                "--host is required for this command.\n  \
                 Example: catalog-spider -H example.com date now"
            );
        };
        let base = Url::parse(&format!("https://{host}/"))
            .with_context(|| format!("invalid host `{host}`"))?;
        base.join(path)
            .with_context(|| format!("cannot build URL for `{path}` on `{host}`"))
    }
}

/// `<output>/<Y>/<M>/<D>` without zero padding.
fn date_output_dir(output: &Path, date: NaiveDate) -> PathBuf {
    output
        .join(date.year().to_string())
        .join(date.month().to_string())
        .join(date.day().to_string())
}
