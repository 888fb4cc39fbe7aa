use crate::{config::Config, gateways};
use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use geocache_core::{
    cancel::Cancellation,
    entities::{Address, GeoQuery},
    usecases::{self, Resolver},
};
use geocache_db_tantivy::SearchEngine;
use geocache_gateways::dead_letter::DeadLettersToJsonFile;
use std::{path::PathBuf, process, time::Duration};
use tokio::time::Instant;

#[derive(Debug, Parser)]
#[command(name = "geocache", version, about = "Resolve and cache geo codes and postal codes")]
struct Cli {
    /// Configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// File system directory of the cache index
    #[arg(long, value_name = "DIR")]
    index_dir: Option<PathBuf>,

    /// Give up after this duration, e.g. "30s" or "2m"
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    timeout: Option<Duration>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print "<latitude>,<longitude>"
    LatLng(QueryArgs),
    /// Print the latitude
    Lat(QueryArgs),
    /// Print the longitude
    Lng(QueryArgs),
    /// Print the postal code of an address
    PostalCode(QueryArgs),
}

#[derive(Debug, Args)]
struct QueryArgs {
    /// Free-text place name
    #[arg(long, conflicts_with_all = ["street", "number", "city", "country"])]
    term: Option<String>,

    #[arg(long, requires = "city")]
    street: Option<String>,

    /// House number that is appended to the street
    #[arg(long, requires = "street")]
    number: Option<String>,

    #[arg(long, requires = "street")]
    city: Option<String>,

    #[arg(long, requires = "street")]
    country: Option<String>,
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    duration_str::parse(s).map_err(|err| err.to_string())
}

impl QueryArgs {
    fn into_query(self) -> Result<GeoQuery> {
        let Self {
            term,
            street,
            number,
            city,
            country,
        } = self;
        if let Some(term) = term {
            return Ok(GeoQuery::term(term));
        }
        let (Some(street), Some(city)) = (street, city) else {
            return Err(anyhow!("Either --term or --street and --city are required"));
        };
        let country = country.unwrap_or_default();
        let addr = match number {
            Some(number) => Address::with_house_number(street, number, city, country),
            None => Address::new(street, city, country),
        };
        Ok(addr.into())
    }
}

fn cancel_on_ctrl_c() -> Cancellation {
    let (handle, cancel) = Cancellation::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Cancelling");
            handle.cancel();
        }
    });
    cancel
}

pub async fn run() -> Result<()> {
    let Cli {
        config,
        index_dir,
        timeout,
        command,
    } = Cli::parse();

    let mut cfg = Config::try_load_from_file_or_default(config)?;
    if index_dir.is_some() {
        cfg.db.index_dir = index_dir;
    }

    log::info!("Initializing Tantivy geo record index");
    let search_engine =
        SearchEngine::init_with_path(cfg.db.index_dir.as_ref(), cfg.cache.write_mode)?;
    let term_gw = gateways::term_geocoding_gateway(&cfg.geocoding)?;
    let address_gw = gateways::address_geocoding_gateway(&cfg.geocoding)?;
    let mut resolver = Resolver::new(search_engine, term_gw, address_gw)
        .with_fingerprint_scope(cfg.cache.fingerprint_scope)
        .with_retry_policy(cfg.retry);
    if let Some(dir) = &cfg.dead_letters.dir {
        resolver = resolver.with_dead_letters(DeadLettersToJsonFile::try_new(dir)?);
    }

    let mut cancel = cancel_on_ctrl_c();
    if let Some(timeout) = timeout {
        cancel = cancel.with_deadline(Instant::now() + timeout);
    }

    let res = match command {
        Command::LatLng(args) => {
            let query = args.into_query()?;
            resolver
                .resolve_lat_lng(&query, &cancel)
                .await
                .map(|geocode| geocode.to_string())
        }
        Command::Lat(args) => {
            let query = args.into_query()?;
            resolver
                .resolve_lat(&query, &cancel)
                .await
                .map(|lat| lat.to_string())
        }
        Command::Lng(args) => {
            let query = args.into_query()?;
            resolver
                .resolve_lng(&query, &cancel)
                .await
                .map(|lng| lng.to_string())
        }
        Command::PostalCode(args) => {
            let query = args.into_query()?;
            resolver.resolve_postal_code(&query, &cancel).await
        }
    };
    match res {
        Ok(value) => {
            println!("{value}");
            Ok(())
        }
        Err(usecases::Error::NotFound(query)) => {
            eprintln!("Not found (404): {query}");
            process::exit(1)
        }
        Err(err) => Err(err.into()),
    }
}
