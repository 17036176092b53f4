use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw record from CSV ingestion, keyed by the dispatch system's column codes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CsvRecord {
    #[serde(rename = "LiefZeitV", default)]
    pub earliest_delivery_time: Option<String>,
    #[serde(rename = "LiefZeitB", default)]
    pub latest_delivery_time: Option<String>,
    #[serde(rename = "LiefKWJ", default)]
    pub delivery_year: Option<String>,
    #[serde(rename = "Monat", default)]
    pub delivery_month: Option<String>,
    #[serde(rename = "LiefDatum")]
    pub delivery_date: String,
    #[serde(rename = "CVgId", default)]
    pub order_id: Option<String>,
    #[serde(rename = "Typ", default)]
    pub customer_type: Option<String>,
    #[serde(rename = "LoAdrId", default)]
    pub customer_site_id: Option<String>,
    #[serde(rename = "LoPlz", default)]
    pub customer_zipcode: Option<String>,
    #[serde(rename = "LoOrt", default)]
    pub customer_city: Option<String>,
    #[serde(rename = "DspGrpKz", default)]
    pub vehicle_group: Option<String>,
    #[serde(rename = "DspZenKz", default)]
    pub hub_location: Option<String>,
    #[serde(rename = "AArtKz", default)]
    pub order_type: Option<String>,
    #[serde(rename = "ConTyp", default)]
    pub container_type: Option<String>,
    #[serde(rename = "CSAnz", default)]
    pub containers_delivered: Option<f64>,
    #[serde(rename = "CHAnz", default)]
    pub containers_picked_up: Option<f64>,
    #[serde(rename = "FzgNr", default)]
    pub vehicle_id: Option<String>,
    #[serde(rename = "Bez", default)]
    pub waste_type: Option<String>,
    #[serde(rename = "Plz", default)]
    pub disposal_site_zipcode: Option<String>,
    #[serde(rename = "Ort", default)]
    pub disposal_site_city: Option<String>,
    #[serde(rename = "AddDatum", default)]
    pub order_datetime: Option<String>,
    #[serde(rename = "EntPlz", default)]
    pub destination_zipcode: Option<String>,
    #[serde(rename = "EntOrt", default)]
    pub destination_city: Option<String>,
}

/// Delivery window cohort, split at noon on the latest delivery time
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeOfDay {
    Morning,
    Afternoon,
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeOfDay::Morning => write!(f, "Morning"),
            TimeOfDay::Afternoon => write!(f, "Afternoon"),
        }
    }
}

/// One delivery event with normalized field names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub delivery_date: NaiveDate,
    pub earliest_delivery_time: Option<String>,
    pub latest_delivery_time: Option<String>,
    pub delivery_year: Option<String>,
    pub delivery_month: Option<String>,
    pub order_id: Option<String>,
    pub customer_type: Option<String>,
    pub customer_site_id: Option<String>,
    pub customer_zipcode: Option<String>,
    pub customer_city: Option<String>,
    pub vehicle_group: Option<String>,
    pub hub_location: Option<String>,
    pub order_type: Option<String>,
    pub container_type: Option<String>,
    pub containers_delivered: Option<f64>,
    pub containers_picked_up: Option<f64>,
    pub vehicle_id: Option<String>,
    pub waste_type: Option<String>,
    pub disposal_site_zipcode: Option<String>,
    pub disposal_site_city: Option<String>,
    pub order_datetime: Option<String>,
    pub destination_zipcode: Option<String>,
    pub destination_city: Option<String>,
}

/// Parse a delivery date as exported by the dispatch system.
///
/// Accepts ISO dates, ISO date-times (space or `T` separated) and the German
/// `DD.MM.YYYY` layout. The time part of a date-time is dropped.
pub fn parse_delivery_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%d", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d.%m.%Y %H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts.date());
        }
    }
    None
}

impl CsvRecord {
    /// Converts the raw row, returning `None` when the delivery date is unusable.
    pub fn to_delivery(self) -> Option<DeliveryRecord> {
        let delivery_date = parse_delivery_date(&self.delivery_date)?;

        Some(DeliveryRecord {
            delivery_date,
            earliest_delivery_time: self.earliest_delivery_time,
            latest_delivery_time: self.latest_delivery_time,
            delivery_year: self.delivery_year,
            delivery_month: self.delivery_month,
            order_id: self.order_id,
            customer_type: self.customer_type,
            customer_site_id: self.customer_site_id,
            customer_zipcode: self.customer_zipcode,
            customer_city: self.customer_city,
            vehicle_group: self.vehicle_group,
            hub_location: self.hub_location,
            order_type: self.order_type,
            container_type: self.container_type,
            containers_delivered: self.containers_delivered,
            containers_picked_up: self.containers_picked_up,
            vehicle_id: self.vehicle_id,
            waste_type: self.waste_type,
            disposal_site_zipcode: self.disposal_site_zipcode,
            disposal_site_city: self.disposal_site_city,
            order_datetime: self.order_datetime,
            destination_zipcode: self.destination_zipcode,
            destination_city: self.destination_city,
        })
    }
}

impl DeliveryRecord {
    /// Record for a date with every other field empty.
    pub fn on(delivery_date: NaiveDate) -> Self {
        Self {
            delivery_date,
            earliest_delivery_time: None,
            latest_delivery_time: None,
            delivery_year: None,
            delivery_month: None,
            order_id: None,
            customer_type: None,
            customer_site_id: None,
            customer_zipcode: None,
            customer_city: None,
            vehicle_group: None,
            hub_location: None,
            order_type: None,
            container_type: None,
            containers_delivered: None,
            containers_picked_up: None,
            vehicle_id: None,
            waste_type: None,
            disposal_site_zipcode: None,
            disposal_site_city: None,
            order_datetime: None,
            destination_zipcode: None,
            destination_city: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delivery_date_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(parse_delivery_date("2024-03-05"), Some(expected));
        assert_eq!(parse_delivery_date("2024-03-05 07:30:00"), Some(expected));
        assert_eq!(parse_delivery_date("2024-03-05T07:30:00"), Some(expected));
        assert_eq!(parse_delivery_date("05.03.2024"), Some(expected));
        assert_eq!(parse_delivery_date(" 2024-03-05 "), Some(expected));
    }

    #[test]
    fn test_parse_delivery_date_rejects_garbage() {
        assert_eq!(parse_delivery_date(""), None);
        assert_eq!(parse_delivery_date("yesterday"), None);
        assert_eq!(parse_delivery_date("2024-13-01"), None);
    }
}
