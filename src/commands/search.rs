//! Search command handlers
//!
//! Thin wrappers over the auxiliary search and lookup endpoints that
//! print results as tables.

use chrono::{Days, Local, NaiveDate};
use colored::Colorize;
use prettytable::{format, row, Table};

use crate::api::{
    ApiClient, DateRange, FlightOption, FlightSearchRequest, GeoLocation, HotelOption,
    HotelSearchRequest, ItemsResponse, Paging, PlaceItem, PoiSearchRequest,
};
use crate::cli::SearchCommand;
use crate::config::Config;
use crate::error::{Result, TripPlannerError};

const DATE_FORMAT: &str = "%Y-%m-%d";
const MIN_LOOKUP_CHARS: usize = 2;

/// Handle a `search` subcommand
///
/// # Errors
///
/// Returns error for malformed dates, lookup text shorter than two
/// characters, or a failing backend call
pub async fn handle_search(config: &Config, command: SearchCommand) -> Result<()> {
    let client = ApiClient::new(&config.api)?;
    let today = Local::now().date_naive();

    match command {
        SearchCommand::Flights {
            from,
            to,
            depart,
            return_date,
            adults,
            currency,
        } => {
            let request = FlightSearchRequest {
                origin: GeoLocation::city(from),
                destination: GeoLocation::city(to),
                dates: resolve_dates(depart.as_deref(), return_date.as_deref(), today)?,
                adults,
                children: 0,
                currency,
            };
            tracing::info!(
                "Searching flights {:?} -> {:?}",
                request.origin.city,
                request.destination.city
            );
            let response = client.search_flights(&request).await?;
            print_flights(&response.options);
        }
        SearchCommand::Hotels {
            city,
            check_in,
            check_out,
            adults,
            currency,
        } => {
            let request = HotelSearchRequest {
                destination: GeoLocation::city(city),
                dates: resolve_dates(check_in.as_deref(), check_out.as_deref(), today)?,
                rooms: 1,
                adults,
                children: 0,
                currency,
                paging: Paging::default(),
            };
            let response = client.search_hotels(&request).await?;
            if let Some(error) = &response.error {
                println!("{}", format!("Backend note: {}", error).yellow());
            }
            print_hotels(&response.options);
        }
        SearchCommand::Poi { lat, lon } => {
            let request = PoiSearchRequest {
                location: GeoLocation::point(lat, lon),
                paging: Paging::default(),
            };
            print_items("Points of interest", &client.search_poi(&request).await?);
        }
        SearchCommand::Destinations { query } => {
            let query = lookup_text(&query)?;
            print_items("Destinations", &client.booking_destinations(query).await?);
        }
        SearchCommand::FlightDestinations { query } => {
            let query = lookup_text(&query)?;
            print_items(
                "Flight destinations",
                &client.flight_destinations(query).await?,
            );
        }
        SearchCommand::Places { query } => {
            let query = lookup_text(&query)?;
            print_items("Places", &client.places_suggest(query).await?);
        }
    }

    Ok(())
}

/// Travel dates from optional CLI values
///
/// The start defaults to `today` and the end to the day after the start.
/// An end before the start is rejected.
pub fn resolve_dates(start: Option<&str>, end: Option<&str>, today: NaiveDate) -> Result<DateRange> {
    let start = match start {
        Some(s) => parse_date(s)?,
        None => today,
    };
    let end = match end {
        Some(s) => parse_date(s)?,
        None => start.checked_add_days(Days::new(1)).unwrap_or(start),
    };
    if end < start {
        return Err(TripPlannerError::InvalidArgument(format!(
            "end date {} is before start date {}",
            end, start
        ))
        .into());
    }
    Ok(DateRange {
        start: start.format(DATE_FORMAT).to_string(),
        end: end.format(DATE_FORMAT).to_string(),
    })
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| {
        TripPlannerError::InvalidArgument(format!("'{}' is not a YYYY-MM-DD date: {}", value, e))
            .into()
    })
}

fn lookup_text(query: &str) -> Result<&str> {
    let query = query.trim();
    if query.chars().count() < MIN_LOOKUP_CHARS {
        return Err(TripPlannerError::InvalidArgument(format!(
            "search text must be at least {} characters",
            MIN_LOOKUP_CHARS
        ))
        .into());
    }
    Ok(query)
}

fn format_duration(minutes: u32) -> String {
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

fn print_flights(options: &[FlightOption]) {
    if options.is_empty() {
        println!("{}", "No flights found.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row!["Carrier", "Departs", "Arrives", "Duration", "Price"]);
    for option in options {
        table.add_row(row![
            option.carrier,
            option.depart_at,
            option.arrive_at,
            format_duration(option.duration_minutes),
            format!(
                "{} {:.2}",
                option.price.currency.as_deref().unwrap_or_default(),
                option.price.amount
            )
        ]);
    }

    println!("\nFlights:");
    table.printstd();
    println!();
}

fn print_hotels(options: &[HotelOption]) {
    if options.is_empty() {
        println!("{}", "No hotels found.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row!["Name", "Stars", "Neighborhood", "Per night"]);
    for option in options {
        table.add_row(row![
            option.name,
            option
                .stars
                .map(|s| format!("{:.1}", s))
                .unwrap_or_else(|| "-".to_string()),
            option.neighborhood.as_deref().unwrap_or("-"),
            format!(
                "{} {:.2}",
                option.price_per_night.currency.as_deref().unwrap_or_default(),
                option.price_per_night.amount
            )
        ]);
    }

    println!("\nHotels:");
    table.printstd();
    println!();
}

fn item_row(item: &PlaceItem) -> [String; 4] {
    let coord = |v: Option<f64>| v.map(|v| format!("{:.4}", v)).unwrap_or_else(|| "-".to_string());
    [
        item.name.clone().unwrap_or_else(|| "(unnamed)".to_string()),
        item.category.clone().unwrap_or_else(|| "-".to_string()),
        coord(item.lat),
        coord(item.lon),
    ]
}

fn print_items(title: &str, response: &ItemsResponse) {
    if let Some(error) = &response.error {
        println!("{}", format!("Backend note: {}", error).yellow());
    }
    if response.items.is_empty() {
        println!("{}", "Nothing found.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row!["Name", "Category", "Lat", "Lon"]);
    for item in &response.items {
        let [name, category, lat, lon] = item_row(item);
        table.add_row(row![name, category, lat, lon]);
    }

    println!("\n{}:", title);
    table.printstd();
    println!();
}
