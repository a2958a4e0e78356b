//! Request and response bodies for the marketplace backend
//!
//! Field names follow the backend's camelCase JSON. Response types default
//! every optional field so that additive backend changes do not break
//! deserialization.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Unread-notification snapshot for the current session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    /// Notifications not yet marked read
    pub unread_count: u64,
    /// Identifier of the authenticated user; keys the event-stream channel
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
}

/// Aggregate rating of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRating {
    /// Mean rating, absent when the user has no reviews
    #[serde(default)]
    pub average_rating: Option<f64>,
    /// Number of reviews
    #[serde(default)]
    pub total_reviews: u64,
}

/// A tenant's request to rent a property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRentalRequest {
    /// Property being requested
    pub property_id: String,
    /// Requested move-in date
    pub start_date: NaiveDate,
    /// Requested move-out date, open-ended when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Note to the landlord
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Rental request state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RentalRequestStatus {
    /// Awaiting the landlord
    Pending,
    /// Accepted; a lease follows
    Approved,
    /// Declined by the landlord
    Rejected,
}

/// A rental request as stored by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalRequest {
    /// Request identifier
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Property being requested
    #[serde(deserialize_with = "string_or_number")]
    pub property_id: String,
    /// Current state
    pub status: RentalRequestStatus,
    /// Requested move-in date
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Requested move-out date
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// Fields a landlord edits on a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDraft {
    /// Listing title
    pub title: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Street address
    pub address: String,
    /// Monthly rent in the listing currency
    pub monthly_rent: f64,
    /// First available date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_from: Option<NaiveDate>,
}

/// A listing as stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    /// Listing identifier
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Editable fields
    #[serde(flatten)]
    pub details: PropertyDraft,
}

/// Payment to start for a lease
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Lease being paid
    pub lease_id: String,
    /// Amount in the lease currency
    pub amount: f64,
    /// Payment method chosen by the tenant
    pub method: String,
}

/// Backend acknowledgement of a started payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    /// Payment identifier
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Processor status string
    pub status: String,
    /// Hosted checkout page, when the processor needs one
    #[serde(default)]
    pub checkout_url: Option<String>,
}

/// Review left for a landlord or tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    /// User being reviewed
    pub reviewee_id: String,
    /// Property the stay was at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    /// Stars, 1 to 5
    pub rating: u8,
    /// Review text
    #[serde(default)]
    pub comment: String,
}

/// Body for boolean account settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleSetting {
    /// New value
    pub enabled: bool,
}

/// Body for a phone number change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumberUpdate {
    /// Number in E.164 form
    pub phone_number: String,
}

/// Accept identifiers sent either as JSON strings or numbers
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unread_count_accepts_string_user_id() {
        let v: UnreadCount = serde_json::from_str(r#"{"unreadCount":5,"userId":"u1"}"#).unwrap();
        assert_eq!(v.unread_count, 5);
        assert_eq!(v.user_id, "u1");
    }

    #[test]
    fn test_unread_count_accepts_numeric_user_id() {
        let v: UnreadCount = serde_json::from_str(r#"{"unreadCount":0,"userId":42}"#).unwrap();
        assert_eq!(v.user_id, "42");
    }

    #[test]
    fn test_unread_count_rejects_negative_count() {
        assert!(serde_json::from_str::<UnreadCount>(r#"{"unreadCount":-1,"userId":"u1"}"#).is_err());
    }

    #[test]
    fn test_new_rental_request_serializes_camel_case() {
        let req = NewRentalRequest {
            property_id: "p9".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
            end_date: None,
            message: Some("Quiet student".to_string()),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["propertyId"], "p9");
        assert_eq!(json["startDate"], "2026-11-01");
        assert!(json.get("endDate").is_none());
        assert_eq!(json["message"], "Quiet student");
    }

    #[test]
    fn test_property_flattens_details() {
        let json = r#"{
            "id": 7,
            "title": "Sunny room",
            "address": "1 Main St",
            "monthlyRent": 650.0
        }"#;
        let p: Property = serde_json::from_str(json).unwrap();
        assert_eq!(p.id, "7");
        assert_eq!(p.details.title, "Sunny room");
        assert_eq!(p.details.description, "");
        assert!(p.details.available_from.is_none());
    }

    #[test]
    fn test_rental_request_status_lowercase() {
        let r: RentalRequest =
            serde_json::from_str(r#"{"id":"r1","propertyId":"p1","status":"approved"}"#).unwrap();
        assert_eq!(r.status, RentalRequestStatus::Approved);
    }
}
