//! Commands behind the `fund-overlap` binary. Each one loads funds, runs an
//! analytics function and writes JSON.

use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;

use analytics::{FundSummary, OverlapMode, PieChart, Presenter, exposure_by, overlap_charts};
use anyhow::{Context, Result, anyhow, bail};
use fund_parsers::{LoadRequest, Registry, load_batch};
use grid_reader::GridReader;
use models::FundSnapshot;
use serde::Serialize;

/// A fund on the command line: `<issuer>=<path>[,<path>...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundArg(pub LoadRequest);

impl FromStr for FundArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (issuer, paths) = s
            .split_once('=')
            .ok_or_else(|| format!("expected <issuer>=<path>[,<path>...], got '{}'", s))?;
        let issuer = issuer.trim();
        if issuer.is_empty() {
            return Err(format!("missing issuer in '{}'", s));
        }

        let sources: Vec<PathBuf> = paths
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .collect();
        if sources.is_empty() {
            return Err(format!("no source files in '{}'", s));
        }

        Ok(FundArg(LoadRequest::new(issuer, sources)))
    }
}

impl fmt::Display for FundArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let paths: Vec<String> = self.0.sources.iter().map(|p| p.display().to_string()).collect();
        write!(f, "{}={}", self.0.issuer, paths.join(","))
    }
}

pub fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, value)?;
    } else {
        serde_json::to_writer(&mut *out, value)?;
    }
    writeln!(out)?;
    Ok(())
}

/// Writes each chart as one JSON document.
pub struct JsonPresenter<W: Write> {
    out: RefCell<W>,
    pretty: bool,
}

impl<W: Write> JsonPresenter<W> {
    pub fn new(out: W, pretty: bool) -> Self {
        Self {
            out: RefCell::new(out),
            pretty,
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write> Presenter for JsonPresenter<W> {
    fn render(&self, chart: &PieChart) {
        let mut out = self.out.borrow_mut();
        if let Err(e) = write_json(&mut *out, chart, self.pretty) {
            tracing::warn!(fund = %chart.title_fund, "chart not written: {e:#}");
        }
    }
}

/// Loads every fund in parallel. Fails after logging each failed load.
pub fn load_funds(
    registry: &Registry,
    reader: &dyn GridReader,
    funds: &[FundArg],
) -> Result<Vec<FundSnapshot>> {
    let requests: Vec<LoadRequest> = funds.iter().map(|f| f.0.clone()).collect();
    let mut snapshots = Vec::with_capacity(requests.len());
    let mut failed = 0;

    for (fund, result) in funds.iter().zip(load_batch(registry, reader, &requests)) {
        match result {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(e) => {
                tracing::error!(fund = %fund, "load failed: {e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} fund(s) failed to load", failed, funds.len());
    }
    Ok(snapshots)
}

pub fn run_summary<W: Write>(
    registry: &Registry,
    reader: &dyn GridReader,
    funds: &[FundArg],
    out: &mut W,
    pretty: bool,
) -> Result<()> {
    let snapshots = load_funds(registry, reader, funds)?;
    let summaries: Vec<FundSummary> = snapshots.iter().map(FundSummary::from).collect();
    write_json(out, &summaries, pretty)
}

#[derive(Debug, Serialize)]
struct ExposureOutput<'a> {
    fund: &'a str,
    by: &'a str,
    exposure: Vec<analytics::Exposure>,
}

pub fn run_exposure<W: Write>(
    registry: &Registry,
    reader: &dyn GridReader,
    fund: &FundArg,
    by: &str,
    out: &mut W,
    pretty: bool,
) -> Result<()> {
    let snapshot = load_funds(registry, reader, std::slice::from_ref(fund))?
        .pop()
        .ok_or_else(|| anyhow!("no fund loaded from {}", fund))?;

    let exposure = exposure_by(&snapshot, by);
    if exposure.is_empty() && !snapshot.holdings().is_empty() {
        tracing::warn!(column = by, "no exposure: not a holdings column");
    }

    let output = ExposureOutput {
        fund: snapshot.fund_name(),
        by,
        exposure,
    };
    write_json(out, &output, pretty)
}

#[allow(clippy::too_many_arguments)]
pub fn run_overlap<W: Write>(
    registry: &Registry,
    reader: &dyn GridReader,
    funds: &[FundArg],
    key: &str,
    mode: OverlapMode,
    out: &mut W,
    presenter: &dyn Presenter,
    pretty: bool,
) -> Result<()> {
    let [a, b] = funds else {
        bail!("overlap compares exactly two funds, got {}", funds.len());
    };
    let snapshots = load_funds(registry, reader, &[a.clone(), b.clone()])?;
    let [first, second] = snapshots.as_slice() else {
        bail!("expected two loaded funds");
    };

    let report = overlap_charts(first, second, key, mode);
    write_json(out, &report, pretty).context("writing overlap report")?;
    report.render(presenter);
    Ok(())
}
