use super::model::Listing;

pub(crate) fn listing(id: usize, hood: &str, room: &str, price: f64, reviews: u64) -> Listing {
    Listing {
        id,
        name: format!("listing {id}"),
        neighbourhood: hood.to_string(),
        room_type: room.to_string(),
        latitude: 19.42,
        longitude: -99.16,
        price,
        number_of_reviews: reviews,
        security_index: None,
        distance_to_landmark_km: 0.0,
    }
}
