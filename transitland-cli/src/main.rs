// Copyright (C) 2025 Hove and/or its affiliates.
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, version 3.

// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more
// details.

// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    layer::SubscriberExt as _,
    util::SubscriberInitExt as _,
};
use transitland::{geometry_file, output, Client, Config, Query};

lazy_static::lazy_static! {
    pub static ref GIT_VERSION: String = transitland::binary_full_version(env!("CARGO_PKG_VERSION"));
}

fn get_version() -> &'static str {
    &GIT_VERSION
}

#[derive(Debug, Parser)]
#[command(
    name = "transitland",
    about = "Query the transit.land API and write each result as a line of JSON.",
    version = get_version()
)]
struct Opt {
    /// JSON file containing the client configuration.
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Root URL of the API, overriding the one of the configuration.
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GeometryArgs {
    /// Bounding box to search within: 'minlon,minlat,maxlon,maxlat'.
    #[arg(short = 'b', long, allow_hyphen_values = true)]
    bbox: Option<String>,

    /// GeoJSON or WKT file with the geometry to search within.
    #[arg(short = 'g', long)]
    geometry: Option<PathBuf>,
}

impl GeometryArgs {
    fn apply(&self, query: Query) -> Result<Query> {
        let geometry =
            geometry_file::resolve_geometry(self.bbox.as_deref(), self.geometry.as_ref())?;
        Ok(query.geometry(geometry))
    }
}

#[derive(Debug, Args)]
struct PagingArgs {
    /// Number of results per page.
    #[arg(short = 'p', long, default_value_t = transitland::params::DEFAULT_PER_PAGE)]
    per_page: u32,

    /// Follow the pages until the last one (default).
    #[arg(long, overrides_with = "no_page_all")]
    page_all: bool,

    /// Only request the first page of results.
    #[arg(long, overrides_with = "page_all")]
    no_page_all: bool,
}

impl PagingArgs {
    fn apply(&self, query: Query) -> Query {
        query.per_page(self.per_page).page_all(self.page_all || !self.no_page_all)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Request stops info.
    Stops {
        #[command(flatten)]
        geometry: GeometryArgs,

        /// Radius in meters to search around a point geometry.
        #[arg(short = 'r', long)]
        radius: Option<f64>,

        /// Operator or route Onestop ID serving the stops.
        #[arg(long, value_delimiter = ',')]
        served_by: Vec<String>,

        /// ID used in a GTFS feed's stops.txt file.
        #[arg(long)]
        gtfs_id: Option<String>,

        #[command(flatten)]
        paging: PagingArgs,
    },

    /// Request operators info.
    Operators {
        #[command(flatten)]
        geometry: GeometryArgs,

        /// Radius in meters to search around a point geometry.
        #[arg(short = 'r', long)]
        radius: Option<f64>,

        /// ID used in a GTFS feed's agency.txt file.
        #[arg(long)]
        gtfs_id: Option<String>,

        #[command(flatten)]
        paging: PagingArgs,
    },

    /// Request routes info.
    Routes {
        #[command(flatten)]
        geometry: GeometryArgs,

        /// Radius in meters to search around a point geometry.
        #[arg(short = 'r', long)]
        radius: Option<f64>,

        /// Operator Onestop ID.
        #[arg(long)]
        operated_by: Option<String>,

        /// Vehicle type(s), as GTFS route_type integers or names.
        #[arg(long, value_delimiter = ',')]
        vehicle_type: Vec<String>,

        /// ID used in a GTFS feed's routes.txt file.
        #[arg(long)]
        gtfs_id: Option<String>,

        /// Include the route geometries (default).
        #[arg(long, overrides_with = "no_include_geometry")]
        include_geometry: bool,

        /// Do not include the route geometries.
        #[arg(long, overrides_with = "include_geometry")]
        no_include_geometry: bool,

        #[command(flatten)]
        paging: PagingArgs,
    },

    /// Request route stop patterns info.
    RouteStopPatterns {
        #[command(flatten)]
        geometry: GeometryArgs,

        /// Route Onestop ID the patterns belong to.
        #[arg(long)]
        traversed_by: Option<String>,

        /// Stop Onestop ID(s) visited by the patterns.
        #[arg(long, value_delimiter = ',')]
        stops_visited: Vec<String>,

        /// Trip ID(s) of the patterns.
        #[arg(long, value_delimiter = ',')]
        trips: Vec<String>,

        #[command(flatten)]
        paging: PagingArgs,
    },

    /// Request schedule stop pairs info.
    ScheduleStopPairs {
        #[command(flatten)]
        geometry: GeometryArgs,

        /// Origin stop Onestop ID(s).
        #[arg(long, value_delimiter = ',')]
        origin_onestop_id: Vec<String>,

        /// Destination stop Onestop ID(s).
        #[arg(long, value_delimiter = ',')]
        destination_onestop_id: Vec<String>,

        /// Service date (YYYY-MM-DD).
        #[arg(long)]
        date: Option<String>,

        /// Pairs in effect from this date (YYYY-MM-DD).
        #[arg(long)]
        service_from_date: Option<String>,

        /// Pairs in effect before this date (YYYY-MM-DD).
        #[arg(long)]
        service_before_date: Option<String>,

        /// Range of origin departure times, e.g. '07:00:00,09:00:00'.
        #[arg(long)]
        origin_departure_between: Option<String>,

        /// Trip identifier.
        #[arg(long)]
        trip: Option<String>,

        /// Route Onestop ID(s).
        #[arg(long, value_delimiter = ',')]
        route_onestop_id: Vec<String>,

        /// Operator Onestop ID(s).
        #[arg(long, value_delimiter = ',')]
        operator_onestop_id: Vec<String>,

        /// Only pairs from active feed versions (default).
        #[arg(long, overrides_with = "no_active")]
        active: bool,

        /// Include pairs from inactive feed versions.
        #[arg(long, overrides_with = "active")]
        no_active: bool,

        #[command(flatten)]
        paging: PagingArgs,
    },

    /// Request any entity by its Onestop ID.
    OnestopId {
        /// A Onestop ID of any type of entity (stop, operator, ...).
        #[arg(long)]
        oid: Option<String>,

        /// A file with one Onestop ID per line.
        #[arg(short = 'f', long)]
        file: Option<PathBuf>,
    },
}

fn build_query(command: Command) -> Result<Query> {
    let query = match command {
        Command::Stops {
            geometry,
            radius,
            served_by,
            gtfs_id,
            paging,
        } => {
            let query = Query::stops()
                .radius(radius)
                .filter_list("served_by", served_by)
                .filter_opt("gtfs_id", gtfs_id);
            paging.apply(geometry.apply(query)?)
        }
        Command::Operators {
            geometry,
            radius,
            gtfs_id,
            paging,
        } => {
            let query = Query::operators()
                .radius(radius)
                .filter_opt("gtfs_id", gtfs_id);
            paging.apply(geometry.apply(query)?)
        }
        Command::Routes {
            geometry,
            radius,
            operated_by,
            vehicle_type,
            gtfs_id,
            include_geometry,
            no_include_geometry,
            paging,
        } => {
            let query = Query::routes()
                .radius(radius)
                .filter_opt("operated_by", operated_by)
                .filter_list("vehicle_type", vehicle_type)
                .filter_opt("gtfs_id", gtfs_id)
                .filter("include_geometry", include_geometry || !no_include_geometry);
            paging.apply(geometry.apply(query)?)
        }
        Command::RouteStopPatterns {
            geometry,
            traversed_by,
            stops_visited,
            trips,
            paging,
        } => {
            let query = Query::route_stop_patterns()
                .filter_opt("traversed_by", traversed_by)
                .filter_list("stops_visited", stops_visited)
                .filter_list("trips", trips);
            paging.apply(geometry.apply(query)?)
        }
        Command::ScheduleStopPairs {
            geometry,
            origin_onestop_id,
            destination_onestop_id,
            date,
            service_from_date,
            service_before_date,
            origin_departure_between,
            trip,
            route_onestop_id,
            operator_onestop_id,
            active,
            no_active,
            paging,
        } => {
            let query = Query::schedule_stop_pairs()
                .filter_list("origin_onestop_id", origin_onestop_id)
                .filter_list("destination_onestop_id", destination_onestop_id)
                .filter_opt("date", date)
                .filter_opt("service_from_date", service_from_date)
                .filter_opt("service_before_date", service_before_date)
                .filter_opt("origin_departure_between", origin_departure_between)
                .filter_opt("trip", trip)
                .filter_list("route_onestop_id", route_onestop_id)
                .filter_list("operator_onestop_id", operator_onestop_id)
                .filter("active", active || !no_active);
            paging.apply(geometry.apply(query)?)
        }
        Command::OnestopId { .. } => bail!("Onestop ID lookups are not paged queries"),
    };
    Ok(query)
}

fn read_onestop_ids(oid: Option<String>, file: Option<PathBuf>) -> Result<Vec<String>> {
    match (oid, file) {
        (Some(oid), None) => Ok(vec![oid]),
        (None, Some(file)) => {
            let content = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read Onestop IDs from {:?}", file))?;
            Ok(content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect())
        }
        _ => bail!("must provide either --oid or --file"),
    }
}

fn init_logger() {
    let default_level = LevelFilter::INFO;
    let rust_log =
        std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| default_level.to_string());
    let env_filter_subscriber = EnvFilter::try_new(rust_log).unwrap_or_else(|e| {
        eprintln!(
            "invalid {}, falling back to level '{}' - {}",
            EnvFilter::DEFAULT_ENV,
            default_level,
            e,
        );
        EnvFilter::new(default_level.to_string())
    });
    // stdout only carries the records
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(env_filter_subscriber)
        .init();
}

fn run(opt: Opt) -> Result<()> {
    info!("Launching transitland...");

    let mut config = Config::read(opt.config)?;
    if let Some(base_url) = opt.base_url {
        config.base_url = base_url;
    }
    let client = Client::new(config).context("Failed to build the HTTP client")?;

    let count = match opt.command {
        Command::OnestopId { oid, file } => {
            let mut count = 0;
            for onestop_id in read_onestop_ids(oid, file)? {
                let pages = client.onestop_id(&onestop_id)?;
                count += output::write_pages(io::stdout().lock(), pages)
                    .with_context(|| format!("Failed to look up {}", onestop_id))?;
            }
            count
        }
        command => {
            let query = build_query(command)?;
            let pages = client.fetch(&query)?;
            output::write_pages(io::stdout().lock(), pages)
                .with_context(|| format!("Failed to query {}", query.endpoint))?
        }
    };
    info!("{} records written", count);
    Ok(())
}

fn main() {
    init_logger();
    if let Err(err) = run(Opt::parse()) {
        for cause in err.chain() {
            eprintln!("{cause}");
        }
        std::process::exit(1);
    }
}
