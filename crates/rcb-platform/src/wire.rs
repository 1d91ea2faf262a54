//! JSON shapes of the platform REST API, and their mapping into core types.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use rcb_core::{
    domain::{AddressBookContact, ExtensionDirectoryEntry, Identity, PhoneNumberEntry, Token},
    paging::{Page, PageRequest},
};

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default = "bearer")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub refresh_token_expires_in: Option<i64>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

fn bearer() -> String {
    "bearer".to_string()
}

impl TokenResponse {
    pub fn into_token(self, now: DateTime<Utc>) -> Token {
        Token {
            access_token: self.access_token,
            token_type: self.token_type,
            refresh_token: self.refresh_token,
            expires_at: now + Duration::seconds(self.expires_in.unwrap_or(3600)),
            refresh_token_expires_at: self
                .refresh_token_expires_in
                .map(|s| now + Duration::seconds(s)),
            owner_id: self.owner_id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ContactInfo {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServiceFeature {
    pub feature_name: String,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExtensionInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub extension_number: Option<String>,
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub service_features: Vec<ServiceFeature>,
}

impl From<ExtensionInfo> for Identity {
    fn from(e: ExtensionInfo) -> Self {
        Self {
            name: e.name,
            extension_number: e.extension_number.unwrap_or_default(),
            email: e.contact.email.unwrap_or_default(),
        }
    }
}

impl From<ExtensionInfo> for ExtensionDirectoryEntry {
    fn from(e: ExtensionInfo) -> Self {
        Self {
            name: e.name,
            first_name: e.contact.first_name,
            last_name: e.contact.last_name,
            extension_number: e.extension_number,
            features: e
                .service_features
                .into_iter()
                .filter(|f| f.enabled)
                .map(|f| f.feature_name)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PhoneNumberInfo {
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub features: Option<Vec<String>>,
}

impl From<PhoneNumberInfo> for PhoneNumberEntry {
    fn from(p: PhoneNumberInfo) -> Self {
        Self {
            phone_number: p.phone_number,
            features: p.features,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PersonalContact {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub mobile_phone: Option<String>,
}

impl From<PersonalContact> for AddressBookContact {
    fn from(c: PersonalContact) -> Self {
        Self {
            first_name: c.first_name,
            last_name: c.last_name,
            mobile_phone: c.mobile_phone,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Paging {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordList<T> {
    pub records: Vec<T>,
    #[serde(default)]
    pub paging: Paging,
}

impl<T> RecordList<T> {
    /// Missing paging metadata is read as "this is the only page".
    pub fn into_page<U: From<T>>(self, req: PageRequest) -> Page<U> {
        let page = self.paging.page.unwrap_or(req.page);
        Page {
            records: self.records.into_iter().map(U::from).collect(),
            page,
            total_pages: self.paging.total_pages.unwrap_or(page),
        }
    }
}
