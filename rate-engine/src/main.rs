use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use rate_client::{ClientConfig, NetworkRateClient};
use rate_engine::pricing::{format_money, summarize_bracket};
use rate_engine::{Dimensions, EngineConfig, EngineError, PricingWorkbench, QuoteRequest};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "rate-cli", about = "Inspect pricing schemes and compute shipping quotes", version)]
struct Cli {
    /// Default log level when RUST_LOG is unset
    #[arg(long, env = "RATE_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the zone × segment price matrix of a scheme
    Matrix { scheme_id: i64 },

    /// Price one order
    Quote {
        scheme_id: i64,
        #[arg(long)]
        province: String,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        district: Option<String>,
        /// Real weight in kg
        #[arg(long)]
        weight: Decimal,
        /// Dimensions in cm, e.g. `40x30x20`
        #[arg(long)]
        dims: Option<String>,
        /// Order flag such as `bulky`; repeatable
        #[arg(long = "flag")]
        flags: Vec<String>,
        /// Print the breakdown as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_dims(raw: &str) -> anyhow::Result<Dimensions> {
    let parts: Vec<&str> = raw.split(['x', 'X', '*']).map(str::trim).collect();
    let [l, w, h] = parts.as_slice() else {
        bail!("dimensions must look like LxWxH, got {raw:?}");
    };
    let parse = |s: &str| Decimal::from_str(s).with_context(|| format!("invalid dimension {s:?}"));
    Ok(Dimensions {
        length: parse(*l)?,
        width: parse(*w)?,
        height: parse(*h)?,
    })
}

fn print_matrix(workbench: &PricingWorkbench<NetworkRateClient>) -> anyhow::Result<()> {
    let matrix = workbench.matrix();
    let cache = workbench.cache();
    for group in &matrix.groups {
        println!("== {} (template #{}) ==", group.template_name, group.template_id);
        let header: Vec<&str> = group.columns.iter().map(|c| c.label.as_str()).collect();
        println!("zone\t{}", header.join("\t"));
        for zone in &group.zones {
            let cells: Vec<String> = {
                let cache = cache.lock();
                group
                    .columns
                    .iter()
                    .map(|c| {
                        cache
                            .bracket_at(zone.id, &c.key)
                            .map(summarize_bracket)
                            .unwrap_or_else(|| "-".to_string())
                    })
                    .collect()
            };
            println!("{}\t{}", zone.name, cells.join("\t"));
            let diagnostics = workbench.zone_diagnostics(zone.id)?;
            if !diagnostics.is_clean() {
                println!("  ! {}", diagnostics.summary());
            }
        }
        if !group.invalid_items.is_empty() {
            println!("  ! invalid template items: {:?}", group.invalid_items);
        }
    }
    if !matrix.unbound_zones.is_empty() {
        let names: Vec<&str> = matrix.unbound_zones.iter().map(|z| z.name.as_str()).collect();
        println!("unbound zones: {}", names.join(", "));
    }
    if matrix.excluded_zones > 0 {
        println!("{} inactive or archived zone(s) hidden", matrix.excluded_zones);
    }
    Ok(())
}

fn report(err: EngineError) -> anyhow::Error {
    let code = err.code();
    tracing::debug!(code = code.code(), category = code.category().name(), error = %err, "Command failed");
    anyhow::anyhow!(err.user_message())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    rate_engine::init_logger_with_level(Some(&cli.log_level), cli.log_json);

    let client_config = ClientConfig::from_env();
    let engine_config = EngineConfig::from_env();
    tracing::debug!(base_url = %client_config.base_url, "Connecting to pricing backend");
    let api = Arc::new(NetworkRateClient::new(&client_config)?);

    match cli.command {
        Commands::Matrix { scheme_id } => {
            let workbench = PricingWorkbench::open(api, scheme_id, engine_config)
                .await
                .map_err(report)?;
            print_matrix(&workbench)?;
        }
        Commands::Quote {
            scheme_id,
            province,
            city,
            district,
            weight,
            dims,
            flags,
            json,
        } => {
            let workbench = PricingWorkbench::open(api, scheme_id, engine_config)
                .await
                .map_err(report)?;
            let request = QuoteRequest {
                weight_kg: weight,
                dimensions: dims.as_deref().map(parse_dims).transpose()?,
                province,
                city,
                district,
                flags,
            };
            let quote = workbench
                .quote(&request)
                .map_err(report)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&quote)?);
            } else {
                println!("zone      {} (#{})", quote.zone_name, quote.zone_id);
                println!("billable  {}kg in {}", quote.billable_weight, quote.segment);
                println!("base      {}", format_money(quote.base));
                if let Some(adj) = &quote.adjustment {
                    println!("dest adj  {} {}", adj.label, format_money(adj.amount));
                }
                for line in &quote.surcharges {
                    println!("surcharge {} {}", line.label, format_money(line.amount));
                }
                println!("total     {}", format_money(quote.total));
            }
        }
    }
    Ok(())
}
