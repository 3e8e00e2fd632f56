use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use tracing::{error, info};

use subs_dashboard::config::DashboardConfig;
use subs_dashboard::export;
use subs_dashboard::logging;
use subs_dashboard::view::{NumericColumn, SortOrder, TableView};
use subs_dashboard::{DataPipeline, MergedTable, SubRecommendation};

#[derive(Debug, Default)]
struct CliArgs {
    perf: Option<PathBuf>,
    subs: Option<PathBuf>,
    recommendations: Vec<SubRecommendation>,
    position: Option<String>,
    sort: Option<NumericColumn>,
    descending: bool,
    top: Option<usize>,
    export: Option<PathBuf>,
    json: bool,
}

fn main() -> ExitCode {
    logging::init();
    match run() {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let config = DashboardConfig::load();
    let args = parse_args(std::env::args().skip(1).collect())?;

    let perf = args.perf.clone().unwrap_or(config.performance_source.clone());
    let subs = args.subs.clone().unwrap_or(config.substitution_source.clone());

    let mut pipeline = DataPipeline::new();
    let table = match pipeline.load(&perf, &subs) {
        Ok(table) => table,
        Err(err) => {
            error!(path = %err.path().display(), "{err}");
            println!("No data available: {err}");
            return Ok(ExitCode::FAILURE);
        }
    };
    info!(
        loaded_at = %table.loaded_at.to_rfc3339(),
        rows = table.len(),
        "pipeline ready"
    );

    let view = apply_view(&table, &args);

    if args.json {
        let summary = view.summary();
        let json = serde_json::to_string_pretty(&summary).context("serialize summary")?;
        println!("{json}");
    } else {
        print_view(&view, &config);
    }

    if let Some(path) = args.export.as_ref() {
        let path = if path.is_relative() && path.parent().is_none_or(|p| p.as_os_str().is_empty()) {
            config.export_dir.join(path)
        } else {
            path.clone()
        };
        let is_xlsx = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
        let report = if is_xlsx {
            export::export_xlsx(&path, &view)?
        } else {
            export::export_csv(&path, &view)?
        };
        println!(
            "Exported {} rows x {} columns to {}",
            report.rows,
            report.columns,
            report.path.display()
        );
    }

    Ok(ExitCode::SUCCESS)
}

fn apply_view<'a>(table: &'a MergedTable, args: &CliArgs) -> TableView<'a> {
    let mut view = TableView::new(table).filter_recommendation(&args.recommendations);
    if let Some(position) = args.position.as_deref() {
        view = view.filter_position(position);
    }
    if let Some(n) = args.top {
        return view.top_by_overperformance(n);
    }
    if let Some(column) = args.sort {
        let order = if args.descending {
            SortOrder::Descending
        } else {
            SortOrder::Ascending
        };
        view = view.sort_by(column, order);
    }
    view
}

fn print_view(view: &TableView<'_>, config: &DashboardConfig) {
    if view.is_empty() {
        println!("No players match the current filters.");
        return;
    }
    println!(
        "{:<24} {:<10} {:>7} {:>8} {:<9} {:<13} {:>8} {:>9} {:>9}",
        "Player", "Position", "Minutes", "Fatigue", "Level", "Rec", "Actual", "Predicted", "Over"
    );
    for (row, level) in view.fatigue_levels(&config.fatigue) {
        println!(
            "{:<24} {:<10} {:>7} {:>8.2} {:<9} {:<13} {:>8} {:>9} {:>9}",
            row.player,
            row.position,
            row.minutes,
            row.fatigue_score,
            level.label(),
            row.sub_recommendation.label(),
            fmt_opt(row.actual_impact),
            fmt_opt(row.predicted_impact),
            fmt_opt(row.overperformance()),
        );
    }

    let summary = view.summary();
    println!();
    println!("Players: {}", summary.rows);
    for (label, count) in &summary.by_recommendation {
        println!(" - {label}: {count}");
    }
    if let Some(mean) = summary.mean_overperformance {
        println!("Mean overperformance: {mean:+.3}");
    }
    if summary.missing_impact > 0 {
        println!("Without impact data: {}", summary.missing_impact);
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.3}")).unwrap_or_else(|| "-".to_string())
}

fn parse_args(args: Vec<String>) -> Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut idx = 0usize;
    while idx < args.len() {
        let arg = args[idx].as_str();
        let (name, inline) = match arg.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (arg, None),
        };
        let mut value = || -> Result<String> {
            if let Some(v) = inline.clone() {
                return Ok(v);
            }
            idx += 1;
            args.get(idx)
                .cloned()
                .ok_or_else(|| anyhow!("missing value for {name}"))
        };

        match name {
            "--perf" => out.perf = Some(PathBuf::from(value()?)),
            "--subs" => out.subs = Some(PathBuf::from(value()?)),
            "--rec" => {
                for part in value()?.split([',', ';']) {
                    if part.trim().is_empty() {
                        continue;
                    }
                    let rec = part
                        .parse::<SubRecommendation>()
                        .with_context(|| format!("--rec {part}"))?;
                    out.recommendations.push(rec);
                }
            }
            "--position" => out.position = Some(value()?),
            "--sort" => out.sort = Some(value()?.parse()?),
            "--desc" => out.descending = true,
            "--top" => {
                let raw = value()?;
                out.top = Some(
                    raw.trim()
                        .parse::<usize>()
                        .with_context(|| format!("--top expects a count, got {raw}"))?,
                );
            }
            "--export" => out.export = Some(PathBuf::from(value()?)),
            "--json" => out.json = true,
            other => return Err(anyhow!("unknown argument {other}")),
        }
        idx += 1;
    }
    Ok(out)
}
