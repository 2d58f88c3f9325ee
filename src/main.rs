use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use furniture_estimator::config::SortOrder;
use furniture_estimator::estimate::{Estimate, EstimateRequest, nest_and_price};
use furniture_estimator::pricing::{PriceBook, Rate, RateSource};
use furniture_estimator::render;
use furniture_estimator::templates::{StandardTemplates, UnitSpec};
use furniture_estimator::types::SheetSpec;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "furniture_estimator",
    about = "Nest furniture panels onto stock sheets and price the purchase list"
)]
struct Cli {
    /// Job file (JSON): panels, hardware, units, sheet, finish and config
    job: PathBuf,

    /// Price book (JSON object mapping price keys to configuration records)
    #[arg(long)]
    prices: Option<PathBuf>,

    /// Nesting order: area or max-side (overrides the job file)
    #[arg(long, value_parser = parse_order)]
    order: Option<SortOrder>,

    /// Show ASCII layout of each sheet
    #[arg(long)]
    layout: bool,

    /// Print the full estimate as JSON
    #[arg(long)]
    json: bool,

    /// Log nesting and pricing decisions to stderr
    #[arg(long)]
    verbose: bool,
}

/// A request plus furniture units to expand through the built-in templates.
#[derive(Deserialize)]
struct JobFile {
    #[serde(flatten)]
    request: EstimateRequest,
    #[serde(default)]
    units: Vec<UnitSpec>,
}

fn parse_order(s: &str) -> Result<SortOrder, String> {
    s.parse().map_err(|e| format!("{}", e))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid JSON in {}: {}", path.display(), e))
}

fn fail(msg: impl Display) -> ! {
    eprintln!("Error: {}", msg);
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let job: JobFile = read_json(&cli.job).unwrap_or_else(|e| fail(e));
    let mut request = job.request;
    for unit in &job.units {
        if !request.add_unit(&StandardTemplates, unit) {
            fail(format!("unsupported unit type for '{}'", unit.label));
        }
    }
    if let Some(order) = cli.order {
        request.config.order = order;
    }

    let prices = match &cli.prices {
        Some(path) => read_json::<PriceBook>(path).unwrap_or_else(|e| fail(e)),
        None => PriceBook::new(),
    };

    let estimate = nest_and_price(&request, &prices).unwrap_or_else(|e| fail(e));

    if cli.json {
        let out = serde_json::to_string_pretty(&estimate).unwrap_or_else(|e| fail(e));
        println!("{}", out);
        return;
    }

    print_layout(&request.sheet, &estimate, cli.layout);
    print_purchase(&estimate);
}

fn print_layout(sheet: &SheetSpec, estimate: &Estimate, layout: bool) {
    for material in &estimate.nesting.materials {
        println!(
            "{}: {} sheet{}, {:.1}% utilization",
            material.material,
            material.sheet_count(),
            if material.sheet_count() == 1 { "" } else { "s" },
            material.utilization * 100.0,
        );
        for s in &material.sheets {
            println!("  Sheet {}:", s.index + 1);
            for p in &s.placements {
                let rot = if p.rotated { " [rotated]" } else { "" };
                println!(
                    "    {} {}x{} @ ({}, {}){}",
                    p.panel_id, p.placed_width, p.placed_height, p.x, p.y, rot
                );
            }
            if layout {
                print!("{}", render::render_sheet(sheet, s));
            }
        }
        println!();
    }

    for id in &estimate.finishes.flagged {
        println!("Warning: panel '{}' has no face assignment and was left unfinished", id);
    }
}

fn source(rate: &Rate) -> &'static str {
    match rate.source {
        RateSource::LinkedProduct => "product",
        RateSource::Custom => "custom",
        RateSource::Default => "default",
    }
}

fn print_purchase(estimate: &Estimate) {
    let purchase = &estimate.purchase;

    println!("Boards:");
    for g in &purchase.boards {
        println!(
            "  {:<32} {:>9.2} sqft {:>3} sheets {:>5.1}%  @ {:>8.2}/sqft ({}) = {:>10.2}",
            g.material.to_string(),
            g.total_area,
            g.sheet_count,
            g.utilization_percent,
            g.rate.value,
            source(&g.rate),
            g.cost
        );
    }

    if !purchase.laminates.is_empty() {
        println!("Surface finish:");
        for g in &purchase.laminates {
            let face = format!("{:?} {}", g.face, g.finish);
            println!(
                "  {:<32} {:>9.2} sqft {:>3} sheets         @ {:>8.2}/sqft ({}) = {:>10.2}",
                face,
                g.area,
                g.sheet_count,
                g.rate.value,
                source(&g.rate),
                g.cost
            );
        }
    }

    if !purchase.edge_bands.is_empty() {
        println!("Edge banding:");
        for g in &purchase.edge_bands {
            println!(
                "  {:<32} {:>9.2} m    {:>3} rolls          @ {:>8.2}/roll ({}) = {:>10.2}",
                g.band_class.to_string(),
                g.length_required,
                g.rolls_needed,
                g.rate.value,
                source(&g.rate),
                g.cost
            );
        }
    }

    if !purchase.hardware.is_empty() {
        println!("Hardware:");
        for line in &purchase.hardware {
            println!(
                "  {:<32} {:>9} pcs                        @ {:>8.2}/pc ({}) = {:>10.2}",
                line.name,
                line.qty,
                line.rate.value,
                source(&line.rate),
                line.cost
            );
        }
    }

    if let Some(adhesive) = &purchase.adhesive {
        println!(
            "Adhesive: {} bottle{} @ {:.2} ({}) = {:.2}",
            adhesive.bottle_count,
            if adhesive.bottle_count == 1 { "" } else { "s" },
            adhesive.rate.value,
            source(&adhesive.rate),
            adhesive.cost
        );
    }

    println!();
    println!("Total: {:.2}", purchase.total_cost);
}
