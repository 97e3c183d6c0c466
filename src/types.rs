//! Core types for the Pesepay API

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Amount and currency of a payment request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestAmount {
    /// Amount to charge; unit semantics are owned by the service
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// ISO 4217 currency code (e.g., "USD", "ZWL")
    pub currency_code: String,
}

/// A payment to be initiated
///
/// Field order is the order the service receives them in after encryption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Amount and currency
    pub amount_details: RequestAmount,
    /// Free-text reason shown to the customer
    pub reason_for_payment: String,
    /// URL the service notifies with the transaction result
    pub result_url: String,
    /// URL the customer is sent back to after paying
    pub return_url: String,
    /// Merchant-side reference for reconciliation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_reference: Option<String>,
}

impl PaymentRequest {
    /// Create a new payment request
    pub fn new(
        amount: Decimal,
        currency_code: impl Into<String>,
        reason_for_payment: impl Into<String>,
        result_url: impl Into<String>,
        return_url: impl Into<String>,
    ) -> Self {
        Self {
            amount_details: RequestAmount {
                amount,
                currency_code: currency_code.into(),
            },
            reason_for_payment: reason_for_payment.into(),
            result_url: result_url.into(),
            return_url: return_url.into(),
            merchant_reference: None,
        }
    }

    /// Set the merchant reference
    pub fn with_merchant_reference(mut self, reference: impl Into<String>) -> Self {
        self.merchant_reference = Some(reference.into());
        self
    }

    /// Set a freshly generated UUID v4 as the merchant reference
    pub fn with_generated_reference(self) -> Self {
        self.with_merchant_reference(uuid::Uuid::new_v4().to_string())
    }

    /// Payment amount
    pub fn amount(&self) -> Decimal {
        self.amount_details.amount
    }

    /// Payment currency code
    pub fn currency_code(&self) -> &str {
        &self.amount_details.currency_code
    }
}

/// Wire wrapper carrying an encrypted payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Base64 ciphertext
    pub payload: String,
}

impl Envelope {
    /// Wrap an encrypted payload
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

// Vendor status strings: the known values get variants, anything else is
// kept verbatim so it serializes back unchanged.
macro_rules! open_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            /// A value this client does not know about
            Other(String),
        }

        impl $name {
            /// Wire representation
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $wire,)+
                    Self::Other(value) => value,
                }
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                match value.as_str() {
                    $($wire => Self::$variant,)+
                    _ => Self::Other(value),
                }
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::from(value.to_string())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                match value {
                    $name::Other(value) => value,
                    known => known.as_str().to_string(),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

open_enum! {
    /// Lifecycle status of a transaction
    TransactionStatus {
        AuthorizationFailed => "AUTHORIZATION_FAILED",
        Cancelled => "CANCELLED",
        Closed => "CLOSED",
        ClosedPeriodElapsed => "CLOSED_PERIOD_ELAPSED",
        Declined => "DECLINED",
        Error => "ERROR",
        Failed => "FAILED",
        Initiated => "INITIATED",
        InsufficientFunds => "INSUFFICIENT_FUNDS",
        PartiallyPaid => "PARTIALLY_PAID",
        Pending => "PENDING",
        Processing => "PROCESSING",
        Reversed => "REVERSED",
        ServiceUnavailable => "SERVICE_UNAVAILABLE",
        Success => "SUCCESS",
        Terminated => "TERMINATED",
        TimeOut => "TIME_OUT",
    }
}

impl TransactionStatus {
    /// Whether the status will not change on further polling.
    /// Unknown statuses are treated as still in flight.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            Self::Initiated | Self::Pending | Self::Processing | Self::PartiallyPaid | Self::Other(_)
        )
    }
}

open_enum! {
    /// Who bears the transaction fee
    ChargeType {
        NoCharge => "NO_CHARGE",
    }
}

open_enum! {
    /// Settlement of funds to the merchant
    LiquidationStatus {
        Completed => "COMPLETED",
        Pending => "PENDING",
    }
}

open_enum! {
    /// How the merchant is settled
    SettlementMode {
        DirectlySettled => "DIRECTLY_SETTLED",
    }
}

open_enum! {
    /// Kind of transaction
    TransactionType {
        Basic => "BASIC",
    }
}

/// Amount breakdown computed by the service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AmountDetails {
    #[serde(
        serialize_with = "rust_decimal::serde::float_option::serialize",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<Decimal>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
    #[serde(
        serialize_with = "rust_decimal::serde::float_option::serialize",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub customer_payable_amount: Option<Decimal>,
    #[serde(
        serialize_with = "rust_decimal::serde::float_option::serialize",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_currency_amount: Option<Decimal>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub default_currency_code: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub formatted_merchant_amount: Option<String>,
    #[serde(
        serialize_with = "rust_decimal::serde::float_option::serialize",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub merchant_amount: Option<Decimal>,
    #[serde(
        serialize_with = "rust_decimal::serde::float_option::serialize",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_transaction_amount: Option<Decimal>,
    #[serde(
        serialize_with = "rust_decimal::serde::float_option::serialize",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub transaction_service_fee: Option<Decimal>,
}

/// Customer attached to a transaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Customer {
    #[serde(deserialize_with = "lenient")]
    pub contact_numbers: Vec<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// What the customer actually paid
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerAmountPaid {
    #[serde(
        serialize_with = "rust_decimal::serde::float_option::serialize",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount_paid: Option<Decimal>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
}

/// Payment method used for the transaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentMethodDetails {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub payment_method_code: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<i64>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub payment_method_message: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub payment_method_name: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub payment_method_reference: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub payment_method_status: Option<String>,
}

/// Decrypted transaction record returned by the service
///
/// Every field is optional: the client passes the record through without
/// validating it, and any JSON object is accepted. Fields this type does not
/// name, and named fields whose value has an unexpected type, are kept
/// verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_details: Option<AmountDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_type: Option<ChargeType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<Customer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_amount_paid: Option<CustomerAmountPaid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_transaction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquidation_status: Option<LiquidationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquidation_transaction_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_date_time_of_transaction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_reference: Option<String>,
    /// Open-ended metadata, preserved as received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_metadata: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_details: Option<PaymentMethodDetails>,
    /// URL that reports the current state of this transaction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_for_payment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    /// Identifier used to check the payment later
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement_mode: Option<SettlementMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_of_transaction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_status: Option<TransactionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_status_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_status_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<TransactionType>,
    /// Fields not modelled above, or whose value did not fit the model
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// Wire names of the modelled fields. A value that does not decode into its
// field is handed back to go into `extra`.
macro_rules! record_fields {
    ($record:ident { $($field:ident => $wire:literal),+ $(,)? }) => {
        impl $record {
            fn assign(&mut self, name: &str, value: Value) -> Option<Value> {
                match name {
                    $($wire => match serde_json::from_value(value.clone()) {
                        Ok(parsed) => {
                            self.$field = parsed;
                            None
                        }
                        Err(_) => Some(value),
                    },)+
                    _ => Some(value),
                }
            }
        }
    };
}

record_fields! {
    TransactionDetails {
        amount_details => "amountDetails",
        application_code => "applicationCode",
        application_name => "applicationName",
        charge_type => "chargeType",
        customer => "customer",
        customer_amount_paid => "customerAmountPaid",
        date_of_transaction => "dateOfTransaction",
        id => "id",
        internal_reference => "internalReference",
        liquidation_status => "liquidationStatus",
        liquidation_transaction_reference => "liquidationTransactionReference",
        local_date_time_of_transaction => "localDateTimeOfTransaction",
        merchant_reference => "merchantReference",
        payment_metadata => "paymentMetadata",
        payment_method_details => "paymentMethodDetails",
        poll_url => "pollUrl",
        reason_for_payment => "reasonForPayment",
        redirect_required => "redirectRequired",
        redirect_url => "redirectUrl",
        reference_number => "referenceNumber",
        result_url => "resultUrl",
        return_url => "returnUrl",
        settlement_mode => "settlementMode",
        time_of_transaction => "timeOfTransaction",
        transaction_date => "transactionDate",
        transaction_status => "transactionStatus",
        transaction_status_code => "transactionStatusCode",
        transaction_status_description => "transactionStatusDescription",
        transaction_type => "transactionType",
    }
}

impl<'de> Deserialize<'de> for TransactionDetails {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let fields = Map::<String, Value>::deserialize(deserializer)?;

        let mut details = TransactionDetails::default();
        for (name, value) in fields {
            if let Some(value) = details.assign(&name, value) {
                details.extra.insert(name, value);
            }
        }
        Ok(details)
    }
}

/// Decode a nested record field, falling back to its default when the vendor
/// sent a value of another type
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

impl TransactionDetails {
    /// Whether the service reports the payment as successful
    pub fn is_paid(&self) -> bool {
        self.transaction_status == Some(TransactionStatus::Success)
    }

    /// Whether the transaction reached a final status
    pub fn is_terminal(&self) -> bool {
        self.transaction_status
            .as_ref()
            .is_some_and(TransactionStatus::is_terminal)
    }

    /// Redirect target, if the customer must be sent to the service to pay
    pub fn requires_redirect(&self) -> Option<&str> {
        match (self.redirect_required, self.redirect_url.as_deref()) {
            (Some(true), Some(url)) if !url.is_empty() => Some(url),
            _ => None,
        }
    }

    /// `dateOfTransaction` as a UTC timestamp, if it parses
    pub fn date_of_transaction_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.date_of_transaction.as_deref()?;
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        // Timestamps without an offset are taken as UTC
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}
