use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use dotenv::dotenv;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};
use travel_search_session::amadeus::AmadeusClient;
use travel_search_session::places::{Accommodation, PlacesClient, StayDiscovery};
use travel_search_session::presentation::{format_price, SearchView};
use travel_search_session::{
    AirportDirectory, Clock, FlightQuery, ParameterNormalizer, ProviderConfig, ResultCache,
    SearchController, SearchProvider, SearchQuery, SessionConfig, SubmitOutcome, SystemClock,
};

const USAGE: &str = "usage: travel-search <ORIGIN> <DESTINATION> <DEPARTURE> [RETURN] [ADULTS]\n       travel-search stays <LOCATION> [CHECK_IN] [CHECK_OUT] [GUESTS]";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("stays") {
        return discover_stays(&args[1..]).await;
    }
    if args.len() < 3 {
        bail!(USAGE);
    }
    let mut query = FlightQuery::new(args[0].as_str(), args[1].as_str(), args[2].as_str());
    if let Some(return_date) = args.get(3) {
        query = query.returning(return_date.as_str());
    }
    if let Some(adults) = args.get(4) {
        query = query.with_adults(adults.as_str());
    }

    let session = SessionConfig::from_env().context("invalid session configuration")?;
    let providers = ProviderConfig::from_env().context("invalid provider configuration")?;

    // Without a directory only raw airport codes can be used
    let directory = match std::env::var("AIRPORTS_CSV") {
        Ok(path) => AirportDirectory::load(&path)
            .with_context(|| format!("failed to load airports from {}", path))?,
        Err(_) => AirportDirectory::default(),
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = Arc::new(ResultCache::new(Arc::clone(&clock)));
    let amadeus = AmadeusClient::new(&providers, Arc::clone(&clock))
        .context("failed to set up the Amadeus client")?;
    let normalizer = Arc::new(ParameterNormalizer::new(
        Arc::new(directory),
        session.normalizer.clone(),
    ));
    let controller = SearchController::new(
        SearchProvider::Flights(Arc::new(amadeus)),
        normalizer,
        cache,
        session,
    );

    match controller.submit(&SearchQuery::Flights(query)).await {
        SubmitOutcome::Completed(result) => print_view(&SearchView::from(&*result)),
        SubmitOutcome::Failed(failure) => bail!("{}", failure.message),
        SubmitOutcome::Invalid(errors) => {
            for error in errors.errors() {
                eprintln!("{}: {}", error.field, error.message());
            }
            bail!("search input rejected");
        }
        other => bail!("search did not complete: {:?}", other),
    }
    Ok(())
}

// Location-based discovery through Places; runs outside the session controller
async fn discover_stays(args: &[String]) -> Result<()> {
    let search = stay_discovery(args)?;
    let providers = ProviderConfig::from_env().context("invalid provider configuration")?;
    let places = PlacesClient::new(&providers).context("failed to set up the Places client")?;
    let stays = places
        .search(&search)
        .await
        .with_context(|| format!("accommodation search for {} failed", search.location))?;

    if stays.is_empty() {
        println!("{}", travel_search_session::presentation::NO_ACCOMMODATIONS_MESSAGE);
    }
    for stay in &stays {
        print_stay(stay);
    }
    Ok(())
}

fn stay_discovery(args: &[String]) -> Result<StayDiscovery> {
    let location = match args.first() {
        Some(location) => location.clone(),
        None => bail!(USAGE),
    };
    let date = |index: usize| -> Result<Option<NaiveDate>> {
        args.get(index)
            .map(|text| {
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .with_context(|| format!("invalid date {}", text))
            })
            .transpose()
    };
    let guests = match args.get(3) {
        Some(text) => text.parse::<u32>().with_context(|| format!("invalid guest count {}", text))?,
        None => 1,
    };
    Ok(StayDiscovery {
        location,
        check_in: date(1)?,
        check_out: date(2)?,
        guests,
    })
}

fn print_stay(stay: &Accommodation) {
    println!(
        "{}  {:.1}*  from {}",
        stay.name,
        stay.rating,
        format_price(&stay.price)
    );
    println!("  {}", stay.address);
    if let Some(website) = &stay.website {
        println!("  {}", website);
    }
}

fn print_view(view: &SearchView) {
    match view {
        SearchView::Flights { cards } => {
            for card in cards {
                println!("{}  ({} seats left)", card.price, card.seats_left);
                for line in &card.itineraries {
                    println!(
                        "  {} {} -> {} {}  {}  {}  [{}]",
                        line.from,
                        line.departs,
                        line.to,
                        line.arrives,
                        line.duration,
                        line.stops,
                        line.flights.join(", ")
                    );
                }
                for link in &card.links {
                    println!("  {}: {}", link.site, link.url);
                }
            }
        }
        SearchView::Empty { message } => println!("{}", message),
        other => println!("{:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_stay_discovery_arguments() {
        let search = stay_discovery(&args(&["Lisbon", "2025-03-01", "2025-03-04", "2"])).unwrap();
        assert_eq!(search.location, "Lisbon");
        assert_eq!(search.check_in, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(search.check_out, NaiveDate::from_ymd_opt(2025, 3, 4));
        assert_eq!(search.guests, 2);

        let bare = stay_discovery(&args(&["Lisbon"])).unwrap();
        assert_eq!((bare.check_in, bare.guests), (None, 1));

        assert!(stay_discovery(&[]).is_err());
        assert!(stay_discovery(&args(&["Lisbon", "March"])).is_err());
        assert!(stay_discovery(&args(&["Lisbon", "2025-03-01", "2025-03-04", "two"])).is_err());
    }
}
