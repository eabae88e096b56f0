//! Flight search adapter
//!
//! Reduces the first offer returned by a [`FlightOfferSource`] to a compact
//! outbound/return [`FlightBundle`]. Flights only enrich an itinerary, so
//! every failure is logged and reported as "no flights".

use crate::client::{
    FlightOffer, FlightOfferSource, FlightSearchError, OfferDictionaries, OfferItinerary, OfferPrice, OfferQuery,
    SegmentEndpoint,
};
use crate::dates;
use crate::{FlightBundle, FlightEndpoint, FlightLeg};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Best-effort round-trip flight lookup
#[derive(Clone)]
pub struct FlightSearch {
    source: Arc<dyn FlightOfferSource>,
}

impl FlightSearch {
    pub fn new(source: Arc<dyn FlightOfferSource>) -> Self {
        Self { source }
    }

    /// Look up a round trip for one adult.
    ///
    /// Both dates may be in any form [`dates::parse_calendar_date`] accepts.
    /// Returns `None` when the lookup fails for any reason.
    #[instrument(level = "info", skip(self))]
    pub async fn search_flights(
        &self,
        origin: &str,
        destination: &str,
        departure_date: &str,
        return_date: &str,
    ) -> Option<FlightBundle> {
        match self.try_search(origin, destination, departure_date, return_date).await {
            Ok(bundle) => {
                info!(
                    has_outbound = bundle.outbound.is_some(),
                    has_return = bundle.return_leg.is_some(),
                    "Flight search completed"
                );
                Some(bundle)
            }
            Err(e) => {
                warn!(error = %e, "Flight search failed, continuing without flights");
                None
            }
        }
    }

    async fn try_search(
        &self,
        origin: &str,
        destination: &str,
        departure_date: &str,
        return_date: &str,
    ) -> Result<FlightBundle, FlightSearchError> {
        let query = OfferQuery {
            origin: origin.trim().to_uppercase(),
            destination: destination.trim().to_uppercase(),
            departure_date: dates::to_query_date(departure_date)
                .ok_or_else(|| FlightSearchError::DateParseError(departure_date.to_string()))?,
            return_date: dates::to_query_date(return_date)
                .ok_or_else(|| FlightSearchError::DateParseError(return_date.to_string()))?,
            adults: 1,
        };
        debug!(?query, "Built flight offer query");

        let response = self.source.search_offers(&query).await?;
        // First offer in source order, no ranking
        let offer = response.data.first().ok_or_else(|| FlightSearchError::NoOffers {
            origin: query.origin.clone(),
            destination: query.destination.clone(),
        })?;

        summarize_offer(offer, response.dictionaries.as_ref())
    }
}

/// Reduce an offer to its outbound leg and, when present, its return leg.
pub fn summarize_offer(
    offer: &FlightOffer,
    dictionaries: Option<&OfferDictionaries>,
) -> Result<FlightBundle, FlightSearchError> {
    let mut itineraries = offer.itineraries.iter();
    let outbound = itineraries
        .next()
        .ok_or_else(|| FlightSearchError::MalformedOffer("offer has no itineraries".to_string()))?;

    Ok(FlightBundle {
        outbound: Some(summarize_leg(outbound, &offer.price, dictionaries)?),
        return_leg: itineraries
            .next()
            .map(|itinerary| summarize_leg(itinerary, &offer.price, dictionaries))
            .transpose()?,
    })
}

fn summarize_leg(
    itinerary: &OfferItinerary,
    price: &OfferPrice,
    dictionaries: Option<&OfferDictionaries>,
) -> Result<FlightLeg, FlightSearchError> {
    let (first, last) = match (itinerary.segments.first(), itinerary.segments.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(FlightSearchError::MalformedOffer("itinerary has no segments".to_string())),
    };

    let airline = dictionaries
        .and_then(|d| d.carriers.get(&first.carrier_code))
        .cloned()
        .unwrap_or_else(|| first.carrier_code.clone());

    Ok(FlightLeg {
        price: format!("{}{}", price.total, price.currency),
        duration: itinerary.duration.as_deref().map(compact_duration).unwrap_or_default(),
        airline,
        departure: display_endpoint(&first.departure)?,
        arrival: display_endpoint(&last.arrival)?,
    })
}

fn display_endpoint(endpoint: &SegmentEndpoint) -> Result<FlightEndpoint, FlightSearchError> {
    let at = dates::parse_offer_timestamp(&endpoint.at)
        .ok_or_else(|| FlightSearchError::MalformedOffer(format!("invalid segment timestamp '{}'", endpoint.at)))?;

    Ok(FlightEndpoint {
        date: dates::display_date(&at),
        time: dates::display_time(&at),
        airport_iata: endpoint.iata_code.trim().to_uppercase(),
    })
}

/// `PT9H10M` -> `9h10m`
pub fn compact_duration(iso: &str) -> String {
    iso.trim().replace(['P', 'T'], "").to_lowercase()
}
