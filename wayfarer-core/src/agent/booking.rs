//! Simulated reservations. Confirmations only live in memory.

use crate::error::{Error, Result};
use crate::registry::TravelCapability;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Confirmation numbers tried before a booking is refused.
const MAX_ID_ATTEMPTS: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingRequest {
    /// Hotel or rental company name.
    #[serde(alias = "hotel_name", alias = "company")]
    pub name: String,
    #[serde(alias = "check_in", alias = "pickup_date")]
    pub start_date: NaiveDate,
    #[serde(alias = "check_out", alias = "return_date")]
    pub end_date: NaiveDate,
    #[serde(default = "one")]
    pub guests: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub booking_id: String,
    pub kind: TravelCapability,
    #[serde(flatten)]
    pub request: BookingRequest,
    pub status: BookingStatus,
    pub booking_date: NaiveDate,
}

/// Issues and remembers confirmations for one agent.
#[derive(Clone)]
pub struct BookingDesk {
    kind: TravelCapability,
    sequence: Arc<AtomicU64>,
    bookings: Arc<RwLock<HashMap<String, Booking>>>,
}

impl BookingDesk {
    pub fn new(kind: TravelCapability) -> Self {
        Self {
            kind,
            sequence: Arc::new(AtomicU64::new(0)),
            bookings: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn prefix(&self) -> &'static str {
        match self.kind {
            TravelCapability::Hotel => "HB",
            TravelCapability::CarRental => "CR",
        }
    }

    fn confirmation_id(&self, request: &BookingRequest, today: NaiveDate) -> String {
        let mut hasher = DefaultHasher::new();
        request.name.hash(&mut hasher);
        self.sequence.fetch_add(1, Ordering::Relaxed).hash(&mut hasher);
        format!(
            "{}{}{:04}",
            self.prefix(),
            today.format("%Y%m%d"),
            hasher.finish() % 10_000
        )
    }

    pub async fn book(&self, request: BookingRequest) -> Result<Booking> {
        if request.name.trim().is_empty() {
            return Err(Error::validation("booking needs a hotel or company name"));
        }
        if request.end_date < request.start_date {
            return Err(Error::validation("booking ends before it starts"));
        }
        if request.guests < 1 {
            return Err(Error::validation("booking needs at least one guest"));
        }

        let today = Local::now().date_naive();
        let mut bookings = self.bookings.write().await;
        let booking_id = (0..MAX_ID_ATTEMPTS)
            .map(|_| self.confirmation_id(&request, today))
            .find(|id| !bookings.contains_key(id))
            .ok_or_else(|| {
                Error::validation(format!(
                    "no free confirmation number after {} attempts",
                    MAX_ID_ATTEMPTS
                ))
            })?;

        let booking = Booking {
            booking_id: booking_id.clone(),
            kind: self.kind,
            request,
            status: BookingStatus::Confirmed,
            booking_date: today,
        };
        bookings.insert(booking_id.clone(), booking.clone());
        info!(booking_id = %booking_id, kind = %self.kind, "Booking confirmed");
        Ok(booking)
    }

    pub async fn get(&self, booking_id: &str) -> Option<Booking> {
        self.bookings.read().await.get(booking_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.bookings.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str) -> BookingRequest {
        BookingRequest {
            name: name.to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 11, 11).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 11, 12).unwrap(),
            guests: 2,
            contact: None,
        }
    }

    #[tokio::test]
    async fn test_hotel_confirmation_format() {
        let desk = BookingDesk::new(TravelCapability::Hotel);
        let booking = desk.book(request("Hotel Lumiere")).await.unwrap();

        assert!(booking.booking_id.starts_with("HB"));
        assert_eq!(booking.booking_id.len(), 2 + 8 + 4);
        assert!(booking.booking_id[2..].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(desk.get(&booking.booking_id).await, Some(booking));
    }

    #[tokio::test]
    async fn test_repeat_bookings_get_distinct_ids() {
        let desk = BookingDesk::new(TravelCapability::CarRental);
        let a = desk.book(request("Budget Cars")).await.unwrap();
        let b = desk.book(request("Budget Cars")).await.unwrap();

        assert!(a.booking_id.starts_with("CR"));
        assert_ne!(a.booking_id, b.booking_id);
        assert_eq!(desk.len().await, 2);
    }

    #[tokio::test]
    async fn test_invalid_booking() {
        let desk = BookingDesk::new(TravelCapability::Hotel);
        let mut bad = request("Hotel Lumiere");
        bad.end_date = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        assert!(matches!(desk.book(bad).await, Err(Error::Validation(_))));
        assert!(desk.get("HB000000000000").await.is_none());
    }

    #[tokio::test]
    async fn test_exhausted_day_is_refused() {
        let desk = BookingDesk::new(TravelCapability::Hotel);
        let sample = desk.book(request("Hotel Lumiere")).await.unwrap();
        let today = Local::now().date_naive().format("%Y%m%d").to_string();
        {
            let mut bookings = desk.bookings.write().await;
            for n in 0..10_000 {
                bookings.insert(format!("HB{}{:04}", today, n), sample.clone());
            }
        }

        let refused = desk.book(request("Hotel Lumiere")).await;
        assert!(matches!(refused, Err(Error::Validation(_))));
        assert_eq!(desk.len().await, 10_000);
    }

    #[test]
    fn test_wire_aliases() {
        let request: BookingRequest = serde_json::from_value(serde_json::json!({
            "hotel_name": "Hotel Lumiere",
            "check_in": "2025-11-11",
            "check_out": "2025-11-12"
        }))
        .unwrap();
        assert_eq!(request.guests, 1);
        assert_eq!(request.name, "Hotel Lumiere");
    }
}
