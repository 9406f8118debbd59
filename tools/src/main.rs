//! price-runner: command-line front end for the repair pricing engine.
//!
//! Usage:
//!   price-runner seed --db shop.db --data-dir ./data
//!   price-runner estimate --device 12 --repair 1 --part 2 --db shop.db
//!   price-runner review --db shop.db
//!   price-runner stats --db shop.db
//!   price-runner devices --brand 1 --db shop.db
//!   price-runner --ipc-mode --db shop.db
//!
//! With the default `:memory:` database the catalog seed is loaded first,
//! so one-shot commands have something to price against.

use anyhow::{bail, Result};
use repairdesk_core::{
    catalog::{seed_catalog, CatalogSeed, SeedSummary},
    config::EstimatorConfig,
    estimator::{EstimateRequest, PriceEstimator},
    price::{ConfirmedPrice, PriceKey},
    price_book::PriceBook,
    store::PriceStore,
    types::{BrandId, Money, PriceRecordId},
};
use std::env;
use std::io::{self, BufRead, Write};

/// Flags that take the following argument as their value.
const VALUE_FLAGS: [&str; 6] = ["--db", "--data-dir", "--device", "--repair", "--part", "--brand"];

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Estimate {
        #[serde(flatten)]
        request: EstimateRequest,
    },
    EstimateBatch {
        requests: Vec<EstimateRequest>,
    },
    Confirm {
        #[serde(flatten)]
        key: PriceKey,
        price: Money,
        #[serde(default)]
        cost: Option<Money>,
    },
    Deactivate {
        #[serde(rename = "priceRecordId")]
        price_record_id: PriceRecordId,
    },
    Review,
    Stats,
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let command = command_of(&args)?;

    let config = EstimatorConfig::load(data_dir)?;
    let store = PriceStore::open_with_timeout(db, config.busy_timeout_ms)?;
    store.migrate()?;
    log::info!("price-runner: db={db} data_dir={data_dir} version={}", config.algorithm_version);

    if db == ":memory:" && command != "seed" {
        seed(&store, &config, data_dir)?;
    }

    if ipc_mode {
        return run_ipc_loop(&store, &config);
    }

    match command {
        "seed" => print_json(&seed(&store, &config, data_dir)?)?,
        "estimate" => {
            let request = EstimateRequest::new(
                parse_arg(&args, "--device", 0),
                parse_arg(&args, "--repair", 0),
                parse_arg(&args, "--part", 0),
            );
            let estimate = PriceEstimator::new(&store, &config).estimate(&request)?;
            print_json(&estimate)?;
        }
        "review" => print_json(&PriceBook::new(&store, &config).review_queue()?)?,
        "stats" => print_json(&PriceBook::new(&store, &config).stats()?)?,
        "devices" => {
            let brand_id: BrandId = parse_arg(&args, "--brand", 0);
            let Some(brand) = store.brand(brand_id)? else {
                bail!("unknown brand {brand_id}");
            };
            let devices = store.device_models_for_brand(brand_id)?;
            print_json(&serde_json::json!({ "brand": brand, "devices": devices }))?;
        }
        other => bail!("unknown command '{other}' (expected seed, estimate, review, stats, devices)"),
    }

    Ok(())
}

fn seed(store: &PriceStore, config: &EstimatorConfig, data_dir: &str) -> Result<SeedSummary> {
    let catalog = CatalogSeed::load(data_dir)?;
    Ok(seed_catalog(store, config, &catalog)?)
}

/// One JSON command per stdin line, one JSON reply per stdout line.
fn run_ipc_loop(store: &PriceStore, config: &EstimatorConfig) -> Result<()> {
    let estimator = PriceEstimator::new(store, config);
    let book = PriceBook::new(store, config);
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        if handle.read_line(&mut buffer)? == 0 {
            break;
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };

        let reply = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Estimate { request } => {
                reply_of(estimator.estimate(&request).map(|e| serde_json::to_value(e)))
            }
            IpcCommand::EstimateBatch { requests } => {
                let results: Vec<serde_json::Value> = estimator
                    .estimate_batch(&requests)
                    .into_iter()
                    .map(|(request, result)| match result {
                        Ok(estimate) => serde_json::json!({ "request": request, "estimate": estimate }),
                        Err(e) => serde_json::json!({ "request": request, "error": e.to_string() }),
                    })
                    .collect();
                serde_json::json!({ "results": results })
            }
            IpcCommand::Confirm { key, price, cost } => {
                let result = book.set_confirmed_price(&ConfirmedPrice {
                    key,
                    price,
                    cost,
                    notes: String::new(),
                    reason: "Confirmed via price-runner".into(),
                });
                reply_of(result.map(|id| Ok(serde_json::json!({ "priceRecordId": id }))))
            }
            IpcCommand::Deactivate { price_record_id } => reply_of(
                book.deactivate_price(price_record_id)
                    .map(|done| Ok(serde_json::json!({ "deactivated": done }))),
            ),
            IpcCommand::Review => reply_of(book.review_queue().map(|q| serde_json::to_value(q))),
            IpcCommand::Stats => reply_of(book.stats().map(|s| serde_json::to_value(s))),
        };
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn reply_of<E: std::fmt::Display>(
    result: std::result::Result<serde_json::Result<serde_json::Value>, E>,
) -> serde_json::Value {
    match result {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => serde_json::json!({ "error": e.to_string() }),
        Err(e) => serde_json::json!({ "error": e.to_string() }),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// The single positional argument, wherever it sits among the flags.
/// Defaults to `stats`.
fn command_of(args: &[String]) -> Result<&str> {
    let mut positionals = Vec::new();
    let mut rest = args.iter().skip(1);
    while let Some(arg) = rest.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            if rest.next().is_none() {
                bail!("{arg} needs a value");
            }
        } else if arg == "--ipc-mode" {
            continue;
        } else if arg.starts_with("--") {
            bail!("unknown flag '{arg}'");
        } else {
            positionals.push(arg.as_str());
        }
    }
    match positionals.as_slice() {
        [] => Ok("stats"),
        [command] => Ok(*command),
        [command, extra @ ..] => bail!("unexpected arguments after '{command}': {}", extra.join(" ")),
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
