//! patline - USPTO bulk data corpus builder
//!
//! Downloads weekly bulk archives one at a time and extracts the patent
//! documents matching the given CPC/USPC classifications into a single
//! corpus file or zip archive.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail, ensure};
use clap::{Parser, ValueEnum};
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use patline_core::{CorpusSink, SingleFileSink, ZipSink, fmt_num};
use patline_uspto::{
    ClassScanMatcher, Classification, CpcCode, DocType, PatentDocMatcher, RecordMatcher,
    RunConfig, UspcCode,
};

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "patline")]
#[command(about = "Extract a classified patent corpus from USPTO bulk archives")]
#[command(version)]
struct Cli {
    /// Patent document type
    #[arg(long, value_enum)]
    doc_type: DocTypeArg,

    /// Years; comma for individual years, dash for a range (2014,2016 or 2014-2016)
    #[arg(long)]
    years: String,

    /// CPC classifications to keep (comma separated, e.g. H04N21/00)
    #[arg(long, value_delimiter = ',')]
    cpc: Vec<String>,

    /// USPC classifications to keep (comma separated, e.g. 725 or 725/32)
    #[arg(long, value_delimiter = ',')]
    uspc: Vec<String>,

    /// Only process these bulk file names (comma separated)
    #[arg(long, value_delimiter = ',')]
    files: Vec<String>,

    /// Number of bulk files to drop from the front of the queue
    #[arg(long, default_value_t = 0)]
    skip: usize,

    /// Keep each bulk archive after processing instead of deleting it
    #[arg(long)]
    keep: bool,

    /// Output form
    #[arg(long, value_enum, default_value = "xml")]
    out: OutForm,

    /// Name for the output corpus file
    #[arg(long, default_value = "corpus")]
    name: String,

    /// Directory for downloads and the output corpus
    #[arg(long, default_value = "download")]
    outdir: PathBuf,

    /// Record evaluation strategy
    #[arg(long, value_enum, default_value = "scan")]
    eval: EvalKind,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Config file path (default: ./patline.toml or ~/.config/patline/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum, Debug)]
enum DocTypeArg {
    /// Granted patents
    Grant,
    /// Patent applications
    Application,
}

impl From<DocTypeArg> for DocType {
    fn from(value: DocTypeArg) -> Self {
        match value {
            DocTypeArg::Grant => DocType::Grant,
            DocTypeArg::Application => DocType::Application,
        }
    }
}

#[derive(Clone, Copy, ValueEnum, Debug)]
enum OutForm {
    /// One concatenated XML file
    Xml,
    /// Zip archive with one entry per document
    Zip,
}

#[derive(Clone, Copy, ValueEnum, Debug)]
enum EvalKind {
    /// Streaming scan of classification elements only
    Scan,
    /// Full patent document parse
    Patent,
}

/// Parse `2014,2016` or `2014-2016` into an ordered year list.
fn parse_years(text: &str) -> Result<Vec<u16>> {
    let text = text.trim();
    ensure!(!text.is_empty(), "--years must not be empty");

    if let Some((from, to)) = text.split_once('-') {
        let from: u16 = from.trim().parse().context("invalid year range start")?;
        let to: u16 = to.trim().parse().context("invalid year range end")?;
        ensure!(from <= to, "year range must run low to high");
        return Ok((from..=to).collect());
    }

    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u16>().with_context(|| format!("invalid year '{s}'")))
        .collect()
}

/// Assemble the wanted classification set from the CPC and USPC flags.
fn parse_classes(cpcs: &[String], uspcs: &[String]) -> Result<Vec<Classification>> {
    let mut wanted = Vec::new();
    for text in cpcs.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        wanted.push(Classification::Cpc(CpcCode::parse(text)?));
    }
    for text in uspcs.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        wanted.push(Classification::Uspc(UspcCode::parse(text)?));
    }
    Ok(wanted)
}

/// Print a key-value summary table on stderr
fn print_summary(title: &str, rows: &[(&str, String)]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new(title).fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    eprintln!("\n{table}");
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(patline_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug  — progress bars show activity
    //   non-TTY: info unless --debug          — logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    patline_core::init_logging(quiet, cli.debug, multi);

    // Everything below here is a fatal configuration fault until the run starts
    let file_config = if let Some(path) = &cli.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    let years = parse_years(&cli.years)?;
    let wanted = parse_classes(&cli.cpc, &cli.uspc)?;
    if wanted.is_empty() {
        bail!("at least one --cpc or --uspc classification is required");
    }

    let run_config = RunConfig {
        doc_type: cli.doc_type.into(),
        years,
        download_dir: cli.outdir.clone(),
        base_url: file_config.bulkdata.base_url,
        record_tag: file_config.bulkdata.record_tag,
        whitelist: (!cli.files.is_empty()).then(|| cli.files.clone()),
        skip: cli.skip,
        delete_done: !cli.keep,
        max_retries: file_config.http.max_retries,
    };

    let matcher: Box<dyn RecordMatcher> = match cli.eval {
        EvalKind::Scan => Box::new(ClassScanMatcher::new(wanted)),
        EvalKind::Patent => Box::new(PatentDocMatcher::new(wanted)),
    };

    let sink: Box<dyn CorpusSink> = match cli.out {
        OutForm::Xml => Box::new(SingleFileSink::new(
            cli.outdir.join(format!("{}.xml", cli.name)),
        )),
        OutForm::Zip => Box::new(ZipSink::new(cli.outdir.join(format!("{}.zip", cli.name)))),
    };

    log::info!("--- Start ---");
    log::info!("  Type: {}", run_config.doc_type);
    log::info!("  Years: {:?}", run_config.years);
    log::info!("  Output: {}", cli.outdir.display());

    let summary = patline_uspto::run(&run_config, matcher, sink, progress.clone())?;

    log::info!(
        "--- Finished --- bulk: {}, wrote: {}",
        summary.archives_processed,
        summary.records_written
    );

    print_summary(
        "Corpus",
        &[
            ("Bulk files", fmt_num(summary.archives_processed)),
            ("Records written", fmt_num(summary.records_written)),
            ("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())),
        ],
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn years_comma_list() {
        assert_eq!(parse_years("2014,2016").unwrap(), vec![2014, 2016]);
        assert_eq!(parse_years(" 2014 , 2016 ").unwrap(), vec![2014, 2016]);
    }

    #[test]
    fn years_dash_range() {
        assert_eq!(parse_years("2014-2016").unwrap(), vec![2014, 2015, 2016]);
        assert_eq!(parse_years("2020-2020").unwrap(), vec![2020]);
    }

    #[test]
    fn years_invalid() {
        assert!(parse_years("").is_err());
        assert!(parse_years("twenty").is_err());
        assert!(parse_years("2016-2014").is_err());
    }

    #[test]
    fn classes_from_both_taxonomies() {
        let wanted = parse_classes(
            &["H04N21/00".to_string()],
            &["725".to_string(), "341/50".to_string()],
        )
        .unwrap();
        assert_eq!(wanted.len(), 3);
        assert!(matches!(wanted[0], Classification::Cpc(_)));
        assert!(matches!(wanted[1], Classification::Uspc(_)));
    }

    #[test]
    fn classes_skip_empty_items() {
        let wanted = parse_classes(&["".to_string()], &[" ".to_string()]).unwrap();
        assert!(wanted.is_empty());
    }

    #[test]
    fn classes_reject_garbage() {
        assert!(parse_classes(&["X99".to_string()], &[]).is_err());
    }

    #[test]
    fn cli_parses_full_invocation() {
        let cli = Cli::try_parse_from([
            "patline",
            "--doc-type",
            "grant",
            "--years",
            "2014,2016",
            "--cpc",
            "H04N21/00",
            "--uspc",
            "725",
            "--files",
            "ipg240102.zip,ipg240109.zip",
            "--skip",
            "1",
            "--out",
            "zip",
            "--name",
            "video",
            "--eval",
            "patent",
        ])
        .unwrap();

        assert_eq!(cli.cpc, ["H04N21/00"]);
        assert_eq!(cli.files.len(), 2);
        assert_eq!(cli.skip, 1);
        assert!(matches!(cli.out, OutForm::Zip));
        assert!(matches!(cli.eval, EvalKind::Patent));
        assert!(!cli.keep);
    }

    #[test]
    fn cli_requires_doc_type_and_years() {
        assert!(Cli::try_parse_from(["patline", "--years", "2014"]).is_err());
        assert!(Cli::try_parse_from(["patline", "--doc-type", "grant"]).is_err());
    }

    #[test]
    fn cli_rejects_unknown_doc_type() {
        assert!(
            Cli::try_parse_from(["patline", "--doc-type", "design", "--years", "2014"]).is_err()
        );
    }
}
