//! Typed wrappers for the backend endpoints the app consumes
//!
//! Each helper is a thin call through [`ApiClient::request`], so every one
//! of them carries the bearer credential and participates in the 401
//! session contract.

use std::borrow::Cow;

use reqwest::Method;

use crate::api::models::{
    NewRentalRequest, NewReview, PaymentReceipt, PaymentRequest, PhoneNumberUpdate, Property,
    PropertyDraft, RentalRequest, ToggleSetting, UnreadCount, UserRating,
};
use crate::api::ApiClient;
use crate::error::{Result, RoomletError};

/// Unread-notification snapshot path
pub const UNREAD_COUNT_PATH: &str = "/api/notifications/unread-count";

/// Landlord listings path
pub const MY_PROPERTIES_PATH: &str = "/api/my-properties";

/// Logout path
pub const LOGOUT_PATH: &str = "/api/auth/logout";

impl ApiClient {
    /// Unread count and user id for the current session
    pub async fn unread_count(&self) -> Result<UnreadCount> {
        self.get_json(UNREAD_COUNT_PATH).await
    }

    /// Rating summary for a user
    pub async fn user_rating(&self, user_id: &str) -> Result<UserRating> {
        self.get_json(&format!("/api/users/{}/rating", segment(user_id)?))
            .await
    }

    /// Ask to rent a property
    pub async fn create_rental_request(&self, request: &NewRentalRequest) -> Result<RentalRequest> {
        self.send_json(Method::POST, "/api/rental-requests", request)
            .await
    }

    /// Landlord accepts a rental request
    pub async fn approve_rental_request(&self, request_id: &str) -> Result<RentalRequest> {
        self.request(
            Method::PUT,
            &format!("/api/rental-requests/{}/approve", segment(request_id)?),
            None,
            None,
        )
        .await?
        .json()
    }

    /// Landlord declines a rental request
    pub async fn reject_rental_request(&self, request_id: &str) -> Result<RentalRequest> {
        self.request(
            Method::PUT,
            &format!("/api/rental-requests/{}/reject", segment(request_id)?),
            None,
            None,
        )
        .await?
        .json()
    }

    /// Listings owned by the current user
    pub async fn my_properties(&self) -> Result<Vec<Property>> {
        self.get_json(MY_PROPERTIES_PATH).await
    }

    /// A single listing
    pub async fn property(&self, property_id: &str) -> Result<Property> {
        self.get_json(&format!("/api/properties/{}", segment(property_id)?))
            .await
    }

    /// Publish a new listing
    pub async fn create_property(&self, draft: &PropertyDraft) -> Result<Property> {
        self.send_json(Method::POST, "/api/properties", draft).await
    }

    /// Edit a listing
    pub async fn update_property(&self, property_id: &str, draft: &PropertyDraft) -> Result<Property> {
        self.send_json(
            Method::PUT,
            &format!("/api/properties/{}", segment(property_id)?),
            draft,
        )
        .await
    }

    /// Remove a listing
    pub async fn delete_property(&self, property_id: &str) -> Result<()> {
        self.request(
            Method::DELETE,
            &format!("/api/properties/{}", segment(property_id)?),
            None,
            None,
        )
        .await?;
        Ok(())
    }

    /// Start a lease payment
    pub async fn initiate_payment(&self, payment: &PaymentRequest) -> Result<PaymentReceipt> {
        self.send_json(Method::POST, "/api/payments", payment).await
    }

    /// Leave a review
    pub async fn submit_review(&self, review: &NewReview) -> Result<()> {
        let body = serde_json::to_value(review)?;
        self.request(Method::POST, "/api/reviews", Some(&body), None)
            .await?;
        Ok(())
    }

    /// Turn two-factor sign-in on or off
    pub async fn set_two_factor(&self, enabled: bool) -> Result<()> {
        self.put_toggle("/api/settings/two-factor", enabled).await
    }

    /// Opt in or out of marketing email
    pub async fn set_marketing_emails(&self, enabled: bool) -> Result<()> {
        self.put_toggle("/api/settings/marketing-emails", enabled)
            .await
    }

    /// Change the account phone number
    pub async fn update_phone_number(&self, phone_number: &str) -> Result<()> {
        let body = serde_json::to_value(PhoneNumberUpdate {
            phone_number: phone_number.to_string(),
        })?;
        self.request(Method::PUT, "/api/users/phone", Some(&body), None)
            .await?;
        Ok(())
    }

    /// Tell the backend the session is ending
    ///
    /// Only the backend call; local teardown lives in
    /// [`crate::session::logout`].
    pub async fn logout(&self) -> Result<()> {
        self.request(Method::POST, LOGOUT_PATH, None, None).await?;
        Ok(())
    }

    async fn put_toggle(&self, path: &str, enabled: bool) -> Result<()> {
        let body = serde_json::to_value(ToggleSetting { enabled })?;
        self.request(Method::PUT, path, Some(&body), None).await?;
        Ok(())
    }
}

/// Encode an identifier as exactly one path segment
///
/// `/`, `?`, `#` and `%` are percent-encoded. Empty, `.` and `..` are
/// rejected because URL normalisation would drop or climb over them.
fn segment(id: &str) -> Result<Cow<'_, str>> {
    if id.is_empty() || id == "." || id == ".." {
        return Err(RoomletError::InvalidIdentifier(id.to_string()).into());
    }
    Ok(urlencoding::encode(id))
}
