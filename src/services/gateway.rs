use crate::errors::ServiceError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Outbound interface to the hosted-payment provider.
///
/// The metadata embedded at initialization is echoed back verbatim on
/// verification and is the only identity source the reconciliation engine
/// trusts. Implementations must bound every call with a timeout; a timeout
/// or transport failure surfaces as `ExternalApiError` and the payment state
/// machine does not advance.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<InitializedPayment, ServiceError>;

    async fn verify_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<VerifiedTransaction, ServiceError>;
}

/// Opaque metadata round-tripped through the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMeta {
    pub user_id: Uuid,
    pub order_id: Uuid,
}

/// Customer snapshot sent with a payment initialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCustomer {
    pub email: String,
    pub name: String,
    #[serde(rename = "phonenumber")]
    pub phone: String,
}

/// Request for a hosted-payment link
#[derive(Debug, Clone, Serialize)]
pub struct CreatePaymentRequest {
    pub tx_ref: String,
    pub amount: Decimal,
    pub currency: String,
    pub redirect_url: String,
    pub customer: PaymentCustomer,
    pub meta: PaymentMeta,
    pub customizations: PaymentCustomizations,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentCustomizations {
    pub title: String,
    pub description: String,
}

/// Successful initialization: the redirect link the client completes payment at
#[derive(Debug, Clone)]
pub struct InitializedPayment {
    pub link: String,
}

/// Authoritative transaction state fetched from the gateway
#[derive(Debug, Clone)]
pub struct VerifiedTransaction {
    pub status: String,
    pub amount: Decimal,
    pub currency: String,
    pub meta: PaymentMeta,
}

impl VerifiedTransaction {
    pub fn is_successful(&self) -> bool {
        self.status == "successful"
    }
}

/// Flutterwave v3 client.
#[derive(Clone)]
pub struct FlutterwaveGateway {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl FlutterwaveGateway {
    pub fn new(base_url: String, secret_key: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url,
            secret_key,
        }
    }
}

#[async_trait]
impl PaymentGateway for FlutterwaveGateway {
    #[instrument(skip(self, request), fields(tx_ref = %request.tx_ref))]
    async fn create_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<InitializedPayment, ServiceError> {
        let response = self
            .client
            .post(format!("{}/payments", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalApiError(format!("payment request failed: {}", e)))?;

        let body: FlutterwaveResponse<PaymentLinkData> = response
            .json()
            .await
            .map_err(|e| ServiceError::ExternalApiError(format!("malformed gateway reply: {}", e)))?;

        if body.status != "success" {
            return Err(ServiceError::ExternalApiError(format!(
                "gateway rejected payment initialization: {}",
                body.message.unwrap_or_else(|| body.status.clone())
            )));
        }

        let link = body
            .data
            .map(|d| d.link)
            .ok_or_else(|| {
                ServiceError::ExternalApiError("gateway reply carried no payment link".to_string())
            })?;

        info!("Obtained hosted-payment link");
        Ok(InitializedPayment { link })
    }

    #[instrument(skip(self))]
    async fn verify_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<VerifiedTransaction, ServiceError> {
        let response = self
            .client
            .get(format!(
                "{}/transactions/{}/verify",
                self.base_url, transaction_id
            ))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| {
                ServiceError::ExternalApiError(format!("verification request failed: {}", e))
            })?;

        let body: FlutterwaveResponse<TransactionData> = response
            .json()
            .await
            .map_err(|e| ServiceError::ExternalApiError(format!("malformed gateway reply: {}", e)))?;

        if body.status != "success" {
            return Err(ServiceError::ExternalApiError(format!(
                "gateway could not verify transaction: {}",
                body.message.unwrap_or_else(|| body.status.clone())
            )));
        }

        let data = body.data.ok_or_else(|| {
            ServiceError::ExternalApiError("gateway reply carried no transaction data".to_string())
        })?;

        Ok(VerifiedTransaction {
            status: data.status,
            amount: data.amount,
            currency: data.currency,
            meta: data.meta,
        })
    }
}

/// Flutterwave envelope: {"status": "...", "message": "...", "data": {...}}
#[derive(Debug, Deserialize)]
struct FlutterwaveResponse<T> {
    status: String,
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct PaymentLinkData {
    link: String,
}

#[derive(Debug, Deserialize)]
struct TransactionData {
    status: String,
    amount: Decimal,
    currency: String,
    meta: PaymentMeta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn verified_transaction_success_check() {
        let meta = PaymentMeta {
            user_id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
        };
        let tx = VerifiedTransaction {
            status: "successful".to_string(),
            amount: dec!(2500),
            currency: "NGN".to_string(),
            meta,
        };
        assert!(tx.is_successful());

        let failed = VerifiedTransaction {
            status: "failed".to_string(),
            ..tx
        };
        assert!(!failed.is_successful());
    }

    #[test]
    fn gateway_envelope_deserializes() {
        let raw = r#"{
            "status": "success",
            "message": "Transaction fetched successfully",
            "data": {
                "status": "successful",
                "amount": 2500,
                "currency": "NGN",
                "meta": {
                    "user_id": "550e8400-e29b-41d4-a716-446655440000",
                    "order_id": "650e8400-e29b-41d4-a716-446655440000"
                }
            }
        }"#;

        let parsed: FlutterwaveResponse<TransactionData> =
            serde_json::from_str(raw).expect("envelope should parse");
        let data = parsed.data.expect("data should be present");
        assert_eq!(data.amount, dec!(2500));
        assert_eq!(data.status, "successful");
    }
}
