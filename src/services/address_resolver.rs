use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;
use utoipa::ToSchema;

use crate::{
    middleware::auth::Credential,
    models::{AddressType, DraftAddress, PersistedAddress},
    services::backend::{AddressApi, BackendError},
};

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9(][0-9 ().\-]*$").expect("Invalid regex"));

const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 7..=15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub address_type: AddressType,
    pub field: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("address is invalid")]
    Invalid(Vec<FieldError>),

    #[error("address was reported as duplicate but no saved copy was found")]
    DuplicateUnresolved,

    #[error("address could not be saved: {0}")]
    Rejected(#[from] BackendError),
}

pub fn validate_address(address: &DraftAddress) -> Result<(), Vec<FieldError>> {
    let required = [
        ("full_name", &address.full_name),
        ("phone", &address.phone),
        ("street", &address.street),
        ("city", &address.city),
        ("state", &address.state),
        ("postal_code", &address.postal_code),
        ("country", &address.country),
    ];

    let mut errors: Vec<FieldError> = required
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| FieldError {
            address_type: address.address_type,
            field: field.to_string(),
            message: "is required".to_string(),
        })
        .collect();

    let phone = address.phone.trim();
    if !phone.is_empty() && !is_valid_phone(phone) {
        errors.push(FieldError {
            address_type: address.address_type,
            field: "phone".to_string(),
            message: "is not a valid phone number".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

pub fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    PHONE_PATTERN.is_match(phone) && PHONE_DIGITS.contains(&digits)
}

pub fn default_addresses(
    saved: &[PersistedAddress],
) -> (Option<&PersistedAddress>, Option<&PersistedAddress>) {
    let find = |address_type: AddressType| {
        saved
            .iter()
            .find(|a| a.address.is_default && a.address.address_type == address_type)
    };
    (find(AddressType::Billing), find(AddressType::Shipping))
}

fn find_duplicate<'a>(
    candidate: &DraftAddress,
    existing: &'a [PersistedAddress],
) -> Option<&'a PersistedAddress> {
    existing
        .iter()
        .find(|saved| saved.address.same_record_as(candidate))
}

pub struct AddressResolver<'a> {
    api: &'a dyn AddressApi,
}

impl<'a> AddressResolver<'a> {
    pub fn new(api: &'a dyn AddressApi) -> Self {
        Self { api }
    }

    /// Created records are appended to `existing`. A duplicate report
    /// replaces it with a fresh listing before one more scan.
    #[instrument(skip_all, fields(address_type = %candidate.address_type))]
    pub async fn resolve_address_id(
        &self,
        candidate: &DraftAddress,
        existing: &mut Vec<PersistedAddress>,
        credential: &Credential,
    ) -> Result<String, ResolveError> {
        validate_address(candidate).map_err(ResolveError::Invalid)?;

        if let Some(saved) = find_duplicate(candidate, existing) {
            tracing::debug!(address_id = %saved.id, "reusing saved address");
            return Ok(saved.id.clone());
        }

        match self.api.create_address(credential, &candidate.trimmed()).await {
            Ok(created) => {
                let id = created.id.clone();
                tracing::info!(address_id = %id, "address saved");
                existing.push(created);
                Ok(id)
            }
            Err(BackendError::Duplicate) => {
                tracing::info!("backend reports duplicate address, refreshing saved list");
                *existing = self.api.list_addresses(credential).await?;
                find_duplicate(candidate, existing)
                    .map(|saved| saved.id.clone())
                    .ok_or(ResolveError::DuplicateUnresolved)
            }
            Err(err) => Err(ResolveError::Rejected(err)),
        }
    }
}
