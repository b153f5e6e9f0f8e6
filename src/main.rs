use anyhow::{anyhow, bail, Result};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cost_derivation::{
    format_thousands, load_item_sheet_csv, parse_amount, parse_item_selection, select_items,
    BatchReport, Catalog, CostPipeline, ItemCosting, LineItem, PipelineConfig, ReferencePrices,
};

const USAGE: &str = "\
Usage:
  cost-derivation quote <total> <description...> [options]
  cost-derivation batch <items.csv> [options]

Options:
  --catalog <file>   reference catalog CSV (Description, Tools, Materials)
  --config <file>    pipeline configuration JSON
  --json             print JSON instead of text
  --items <list>     batch only: item numbers to cost, e.g. 3,11-15,18
  --prices <file>    batch only: reference unit price report CSV

Environment:
  COSTING_MATCH_THRESHOLD, COSTING_VAT_DIVISOR override the config file
  RUST_LOG sets the log filter (default: info)";

#[derive(Debug, PartialEq)]
enum Command {
    Quote { total: f64, description: String },
    Batch { items: PathBuf },
}

#[derive(Debug, PartialEq)]
struct Options {
    command: Command,
    catalog: Option<PathBuf>,
    config: Option<PathBuf>,
    selection: Option<String>,
    prices: Option<PathBuf>,
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() || args.iter().any(|a| a == "-h" || a == "--help") {
        println!("{}", USAGE);
        return Ok(());
    }

    let options = parse_args(&args)?;
    run(options)
}

fn parse_args(args: &[String]) -> Result<Options> {
    let mut positional = Vec::new();
    let mut catalog = None;
    let mut config = None;
    let mut selection = None;
    let mut prices = None;
    let mut json = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--catalog" => {
                let value = iter.next().ok_or_else(|| anyhow!("--catalog needs a file"))?;
                catalog = Some(PathBuf::from(value));
            }
            "--config" => {
                let value = iter.next().ok_or_else(|| anyhow!("--config needs a file"))?;
                config = Some(PathBuf::from(value));
            }
            "--items" => {
                let value = iter.next().ok_or_else(|| anyhow!("--items needs a list"))?;
                selection = Some(value.clone());
            }
            "--prices" => {
                let value = iter.next().ok_or_else(|| anyhow!("--prices needs a file"))?;
                prices = Some(PathBuf::from(value));
            }
            "--json" => json = true,
            other if other.starts_with("--") => bail!("unknown option {}\n\n{}", other, USAGE),
            other => positional.push(other.to_string()),
        }
    }

    let command = match positional.split_first() {
        Some((cmd, rest)) if cmd == "quote" => {
            let (raw_total, words) = rest
                .split_first()
                .ok_or_else(|| anyhow!("quote needs a total\n\n{}", USAGE))?;
            let total = parse_amount(raw_total).unwrap_or_else(|| {
                warn!(total = raw_total.as_str(), "unreadable total, costing as zero");
                0.0
            });
            Command::Quote {
                total,
                description: words.join(" "),
            }
        }
        Some((cmd, rest)) if cmd == "batch" => match rest {
            [path] => Command::Batch {
                items: PathBuf::from(path),
            },
            _ => bail!("batch needs exactly one items file\n\n{}", USAGE),
        },
        Some((cmd, _)) => bail!("unknown command {}\n\n{}", cmd, USAGE),
        None => bail!("missing command\n\n{}", USAGE),
    };

    if matches!(command, Command::Quote { .. }) && (selection.is_some() || prices.is_some()) {
        bail!("--items and --prices only apply to batch\n\n{}", USAGE);
    }

    Ok(Options {
        command,
        catalog,
        config,
        selection,
        prices,
        json,
    })
}

fn run(options: Options) -> Result<()> {
    let config = PipelineConfig::load(options.config.as_deref())?;
    let pipeline = CostPipeline::new(&config);

    let catalog = match &options.catalog {
        Some(path) => Catalog::from_path(path)?,
        None => Catalog::new(),
    };

    match options.command {
        Command::Quote { total, description } => {
            let item = LineItem::new("1", &description).with_quantity(1.0).with_total_price(total);
            let costed = pipeline.cost_item(&item, &catalog, 1);

            if options.json {
                println!("{}", serde_json::to_string_pretty(&costed)?);
            } else {
                print_item(&costed);
            }
        }
        Command::Batch { items: path } => {
            let sheet = load_item_sheet_csv(&path)?;
            let mut items = sheet.items;

            if let Some(text) = &options.selection {
                let wanted = parse_item_selection(text);
                if wanted.is_empty() {
                    bail!("no item numbers in selection {:?}", text);
                }
                items = select_items(items, &wanted);
                info!(selected = items.len(), "item selection applied");
            }

            if let Some(prices_path) = &options.prices {
                let prices = ReferencePrices::from_path(prices_path)?;
                let repriced = prices.apply(&mut items);
                info!(repriced, "reference prices applied");
            }

            let report =
                BatchReport::new(pipeline.cost_items(&items, &catalog)).with_heading(sheet.heading);

            if options.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                if !report.heading.title.is_empty() {
                    println!("📄 {}", report.heading.title);
                }
                if !report.heading.lot.is_empty() {
                    println!("   {}", report.heading.lot);
                }
                for costed in &report.items {
                    print_item(costed);
                }
                println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
                println!("{}", report.summary());
            }
        }
    }

    Ok(())
}

fn print_item(costed: &ItemCosting) {
    let b = &costed.breakdown;
    let texts = &costed.texts;

    println!("\n📦 Item {} - {} [{}]", costed.item, costed.description, costed.category);
    if costed.matched.is_default {
        println!("   catalog: default (best score {:.2})", costed.matched.score);
    } else {
        println!("   catalog: {} ({:.2})", costed.matched.description, costed.matched.score);
    }

    println!("   CU+IVA {:>14}   IVA {:>12}   CU {:>14}", format_thousands(b.cu_iva), format_thousands(b.iva), format_thousands(b.cu));
    println!("   CDT    {:>14}   GG  {:>12}   BEL {:>13}", format_thousands(b.cdt), format_thousands(b.gg), format_thousands(b.bel));
    println!("   A  equipment  {:>14}  {}", format_thousands(b.a), texts.equipment);
    if b.b > 0 {
        println!("   B  labor      {:>14}  {}", format_thousands(b.b), texts.labor);
    }
    println!("   D  execution  {:>14}", format_thousands(b.d));
    if b.e > 0 {
        println!("   E  materials  {:>14}  {}", format_thousands(b.e), texts.materials);
    }
    println!("   F  transport  {:>14}  {}", format_thousands(b.f), texts.transport);
}
