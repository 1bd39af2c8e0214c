use super::clean::CleanRow;
use super::model::Listing;
use crate::geo::{haversine_km, GeoPoint};

/// Attach `distance_to_landmark_km` to every cleaned row.
pub fn enrich(rows: Vec<CleanRow>, landmark: &GeoPoint) -> Vec<Listing> {
    rows.into_iter()
        .map(|row| {
            let distance_to_landmark_km = haversine_km(&row.location, landmark);
            Listing {
                id: row.id,
                name: row.name,
                neighbourhood: row.neighbourhood,
                room_type: row.room_type,
                latitude: row.location.latitude,
                longitude: row.location.longitude,
                price: row.price,
                number_of_reviews: row.number_of_reviews,
                security_index: row.security_index,
                distance_to_landmark_km,
            }
        })
        .collect()
}
