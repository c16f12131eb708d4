// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SlipOK API request and response types.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Provider error code for an exhausted monthly quota.
pub const QUOTA_EXCEEDED_CODE: i32 = 1008;

/// Request body: verify the slip image at `url`. `log` enables the
/// provider's duplicate-slip detection.
#[derive(Debug, Clone, Serialize)]
pub struct SlipokRequest {
    pub url: String,
    pub log: bool,
}

/// Sender or receiver of the transfer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl AccountInfo {
    fn best_name(&self) -> Option<String> {
        self.display_name.clone().or_else(|| self.name.clone())
    }
}

/// Response body. On `success: false` only `code` and `message` are set.
///
/// Unknown fields are ignored; the raw JSON is persisted separately.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlipokResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trans_ref: Option<String>,
    /// `yyyyMMdd`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trans_date: Option<String>,
    /// `HH:mm:ss`, Bangkok time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trans_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trans_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sending_bank: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiving_bank: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<AccountInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<AccountInfo>,
}

/// Normalized view of a verified slip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlipDetails {
    pub transaction_id: Option<String>,
    pub amount: Option<Decimal>,
    pub sender_name: Option<String>,
    pub receiver_name: Option<String>,
    pub sending_bank: Option<String>,
    pub receiving_bank: Option<String>,
    pub transaction_date: Option<DateTime<Utc>>,
}

impl SlipokResponse {
    pub fn is_quota_error(&self) -> bool {
        self.code == Some(QUOTA_EXCEEDED_CODE)
    }

    pub fn details(&self) -> SlipDetails {
        let transaction_date = self
            .trans_timestamp
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|| parse_thai_datetime(self.trans_date.as_deref(), self.trans_time.as_deref()));

        SlipDetails {
            transaction_id: self.trans_ref.clone(),
            amount: self.amount.and_then(|a| Decimal::try_from(a).ok()),
            sender_name: self.sender.as_ref().and_then(AccountInfo::best_name),
            receiver_name: self.receiver.as_ref().and_then(AccountInfo::best_name),
            sending_bank: self.sending_bank.clone(),
            receiving_bank: self.receiving_bank.clone(),
            transaction_date,
        }
    }
}

/// Combine `yyyyMMdd` and `HH:mm:ss` read in Bangkok time (UTC+7).
pub fn parse_thai_datetime(date: Option<&str>, time: Option<&str>) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date?, "%Y%m%d").ok()?;
    let time = NaiveTime::parse_from_str(time?, "%H:%M:%S").ok()?;
    let bangkok = FixedOffset::east_opt(7 * 3600)?;
    bangkok
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}
