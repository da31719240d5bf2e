//! Run configuration.
//!
//! [`Config`] describes one invocation: which files, where the result goes,
//! which pages to take and how chatty to be. [`MergeOptions`] is the subset
//! the core merge needs and is derived from it with [`Config::merge_options`].

use anyhow::{Context, Result, anyhow, bail, ensure};

use crate::MergeError;
use std::ops::RangeInclusive;
use std::{path::PathBuf, str::FromStr};

/// Producer string written to the output `/Info` dictionary.
pub const DEFAULT_PRODUCER: &str = concat!("pdfmerge ", env!("CARGO_PKG_VERSION"));

/// What to do when a merge ends up with no pages at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyOutputPolicy {
    /// Fail with [`MergeError::EmptyOutput`] (default).
    #[default]
    Reject,
    /// Write a structurally valid document with an empty page tree.
    Allow,
}

impl FromStr for EmptyOutputPolicy {
    type Err = MergeError;

    fn from_str(s: &str) -> crate::Result<Self> {
        if s.eq_ignore_ascii_case("reject") {
            Ok(Self::Reject)
        } else if s.eq_ignore_ascii_case("allow") {
            Ok(Self::Allow)
        } else {
            Err(MergeError::invalid_config(format!(
                "Unknown empty output policy '{s}' (expected 'reject' or 'allow')"
            )))
        }
    }
}

/// Pages to take from every input, written like `"1-3,7,2"`.
///
/// Numbers are 1-based. Spans are taken in the order written, so `"3,1"`
/// puts page 3 first and a page listed twice appears twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRange {
    spans: Vec<RangeInclusive<u32>>,
}

impl PageRange {
    /// Parse a comma-separated list of pages and `first-last` spans.
    ///
    /// # Errors
    ///
    /// Fails on empty input, page 0, a span that runs backwards, or anything
    /// that is not a number.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdfmerge::config::PageRange;
    ///
    /// let range = PageRange::parse("1-5,10").unwrap();
    /// assert!(range.contains(3));
    /// assert!(range.contains(10));
    /// assert!(!range.contains(7));
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        ensure!(!s.trim().is_empty(), "Page range is empty");

        let spans = s
            .split(',')
            .map(|item| parse_span(item.trim()))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("Invalid page range '{s}'"))?;

        Ok(Self { spans })
    }

    /// Whether 1-based `page` is named anywhere in the range.
    pub fn contains(&self, page: u32) -> bool {
        self.spans.iter().any(|span| span.contains(&page))
    }

    /// 0-based page indices in the order written, limited to `page_count` pages.
    ///
    /// Repeated pages are kept; each occurrence becomes its own output page.
    pub fn to_selection(&self, page_count: usize) -> Vec<usize> {
        let last = u32::try_from(page_count).unwrap_or(u32::MAX);
        self.spans
            .iter()
            .flat_map(|span| *span.start()..=(*span.end()).min(last))
            .map(|page| page as usize - 1)
            .collect()
    }
}

impl FromStr for PageRange {
    type Err = MergeError;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::parse(s).map_err(|e| MergeError::invalid_config(format!("{e:#}")))
    }
}

fn parse_span(item: &str) -> Result<RangeInclusive<u32>> {
    let (first, last) = match item.split_once('-') {
        Some((first, last)) => (parse_page(first)?, parse_page(last)?),
        None => {
            let page = parse_page(item)?;
            (page, page)
        }
    };
    ensure!(first <= last, "'{item}' runs backwards");
    Ok(first..=last)
}

fn parse_page(text: &str) -> Result<u32> {
    let text = text.trim();
    let page: u32 = text
        .parse()
        .map_err(|_| anyhow!("'{text}' is not a page number"))?;
    ensure!(page > 0, "pages are numbered from 1");
    Ok(page)
}

/// Document information written to the output `/Info` dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// `/Title`.
    pub title: Option<String>,
    /// `/Author`.
    pub author: Option<String>,
    /// `/Subject`.
    pub subject: Option<String>,
    /// `/Keywords`, comma-separated.
    pub keywords: Option<String>,
}

impl Metadata {
    /// Build from optional values; blank values count as unset.
    pub fn new(
        title: Option<String>,
        author: Option<String>,
        subject: Option<String>,
        keywords: Option<String>,
    ) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            title: clean(title),
            author: clean(author),
            subject: clean(subject),
            keywords: clean(keywords),
        }
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }

    /// Entries as `/Info` keys, skipping unset fields.
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("Title", self.title.as_deref()),
            ("Author", self.author.as_deref()),
            ("Subject", self.subject.as_deref()),
            ("Keywords", self.keywords.as_deref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| (key, value)))
    }
}

/// Options of the core merge itself, independent of files and terminals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    /// What to do when no pages were appended.
    pub empty_output: EmptyOutputPolicy,
    /// Metadata for the output `/Info` dictionary.
    pub metadata: Metadata,
    /// `/Producer` entry; `None` leaves it out.
    pub producer: Option<String>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            empty_output: EmptyOutputPolicy::default(),
            metadata: Metadata::default(),
            producer: Some(DEFAULT_PRODUCER.to_string()),
        }
    }
}

/// What to do when the output file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwriteMode {
    /// Ask on the terminal (default).
    #[default]
    Prompt,
    /// Replace it.
    Force,
    /// Fail with [`MergeError::OutputExists`].
    NoClobber,
}

/// Everything one merge run needs.
#[derive(Debug, Clone)]
pub struct Config {
    /// Input files, in merge order.
    pub inputs: Vec<PathBuf>,
    /// Where the merged document is written.
    pub output: PathBuf,
    /// Validate and report only.
    pub dry_run: bool,
    /// Per-file detail and statistics.
    pub verbose: bool,
    /// Behaviour when `output` exists.
    pub overwrite_mode: OverwriteMode,
    /// Errors only.
    pub quiet: bool,
    /// Behaviour when every input turns out to have no pages.
    pub empty_output: EmptyOutputPolicy,
    /// Metadata to set on the output document.
    pub metadata: Metadata,
    /// Concurrent loaders; `None` means one per CPU.
    pub jobs: Option<usize>,
    /// Pages to take from each input; `None` takes all of them.
    pub page_range: Option<PageRange>,
    /// Print the dry-run report as JSON.
    pub json: bool,
}

impl Config {
    /// Configuration with defaults for everything but inputs and output.
    pub fn new(inputs: Vec<PathBuf>, output: PathBuf) -> Self {
        Self {
            inputs,
            output,
            dry_run: false,
            verbose: false,
            overwrite_mode: OverwriteMode::default(),
            quiet: false,
            empty_output: EmptyOutputPolicy::default(),
            metadata: Metadata::default(),
            jobs: None,
            page_range: None,
            json: false,
        }
    }

    /// Reject settings that contradict each other.
    ///
    /// # Errors
    ///
    /// Fails when there are no inputs, verbose and quiet are both set, the job
    /// count is zero, or the output path is also one of the inputs.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.inputs.is_empty(), "No input files specified");
        ensure!(
            !(self.verbose && self.quiet),
            "--verbose and --quiet are mutually exclusive"
        );
        ensure!(self.jobs != Some(0), "--jobs must be at least 1");

        if self.inputs.contains(&self.output) {
            bail!(
                "Output {} would overwrite one of the inputs",
                self.output.display()
            );
        }

        Ok(())
    }

    /// Number of concurrent loaders to use.
    pub fn effective_jobs(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Whether progress messages are wanted; a dry run always reports.
    pub fn should_print(&self) -> bool {
        self.dry_run || !self.quiet
    }

    /// Options handed to the core merge.
    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            empty_output: self.empty_output,
            metadata: self.metadata.clone(),
            ..MergeOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn config() -> Config {
        Config::new(vec![PathBuf::from("a.pdf")], PathBuf::from("out.pdf"))
    }

    #[rstest]
    #[case("reject", EmptyOutputPolicy::Reject)]
    #[case("ALLOW", EmptyOutputPolicy::Allow)]
    fn test_empty_output_policy_from_str(#[case] input: &str, #[case] expected: EmptyOutputPolicy) {
        assert_eq!(input.parse::<EmptyOutputPolicy>().unwrap(), expected);
    }

    #[test]
    fn test_empty_output_policy_unknown() {
        assert!(matches!(
            "maybe".parse::<EmptyOutputPolicy>(),
            Err(MergeError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_page_range_contains() {
        let range = PageRange::parse("1-3, 5 ,7-9").unwrap();
        let named: Vec<u32> = (1..=10).filter(|p| range.contains(*p)).collect();
        assert_eq!(named, vec![1, 2, 3, 5, 7, 8, 9]);
    }

    #[rstest]
    #[case("3,1-2,3", 5, vec![2, 0, 1, 2])]
    #[case("2-6,9", 4, vec![1, 2, 3])]
    #[case("2-6,9", 1, vec![])]
    #[case("4", 4, vec![3])]
    fn test_page_range_to_selection(
        #[case] input: &str,
        #[case] page_count: usize,
        #[case] expected: Vec<usize>,
    ) {
        let range = PageRange::parse(input).unwrap();
        assert_eq!(range.to_selection(page_count), expected);
    }

    #[rstest]
    #[case("")]
    #[case(" ")]
    #[case("0")]
    #[case("0-2")]
    #[case("5-3")]
    #[case("abc")]
    #[case("1-2-3")]
    #[case("1,,2")]
    fn test_page_range_invalid(#[case] input: &str) {
        assert!(PageRange::parse(input).is_err());
    }

    #[test]
    fn test_page_range_from_str_error_names_the_input() {
        let err = "4-2".parse::<PageRange>().unwrap_err();
        assert!(err.to_string().contains("4-2"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_metadata_blank_values_are_unset() {
        let meta = Metadata::new(
            Some("  Title  ".to_string()),
            Some("   ".to_string()),
            None,
            Some("keyword".to_string()),
        );

        assert_eq!(meta.title.as_deref(), Some("Title"));
        assert_eq!(meta.author, None);
        assert_eq!(
            meta.entries().collect::<Vec<_>>(),
            vec![("Title", "Title"), ("Keywords", "keyword")]
        );
        assert!(!meta.is_empty());
        assert!(Metadata::default().is_empty());
    }

    #[test]
    fn test_config_validation() {
        assert!(config().validate().is_ok());

        let no_inputs = Config {
            inputs: Vec::new(),
            ..config()
        };
        assert!(no_inputs.validate().is_err());

        let loud_and_quiet = Config {
            verbose: true,
            quiet: true,
            ..config()
        };
        assert!(loud_and_quiet.validate().is_err());

        let zero_jobs = Config {
            jobs: Some(0),
            ..config()
        };
        assert!(zero_jobs.validate().is_err());

        let overwrites_input = Config {
            output: PathBuf::from("a.pdf"),
            ..config()
        };
        assert!(overwrites_input.validate().is_err());
    }

    #[test]
    fn test_effective_jobs() {
        assert_eq!(Config { jobs: Some(4), ..config() }.effective_jobs(), 4);
        assert!(config().effective_jobs() >= 1);
    }

    #[test]
    fn test_should_print() {
        let mut config = config();
        assert!(config.should_print());

        config.quiet = true;
        assert!(!config.should_print());

        config.dry_run = true;
        assert!(config.should_print());
    }

    #[test]
    fn test_merge_options_follow_config() {
        let mut config = config();
        config.empty_output = EmptyOutputPolicy::Allow;
        config.metadata.title = Some("Report".to_string());

        let options = config.merge_options();
        assert_eq!(options.empty_output, EmptyOutputPolicy::Allow);
        assert_eq!(options.metadata.title.as_deref(), Some("Report"));
        assert_eq!(options.producer.as_deref(), Some(DEFAULT_PRODUCER));
    }
}
