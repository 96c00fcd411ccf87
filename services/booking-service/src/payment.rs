use std::time::Duration;
use thiserror::Error;

use crate::models::PaymentInfo;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("invalid payment amount: {0}")]
    InvalidAmount(f64),
    #[error("payment method is required")]
    MissingMethod,
    #[error("payment gateway declined transaction")]
    Declined,
}

/// Simulated payment gateway: fixed latency plus a configured decline rate.
/// Setting the rate to 1.0 forces the failure path deterministically.
#[derive(Clone)]
pub struct PaymentProcessor {
    latency: Duration,
    failure_rate: f64,
}

impl PaymentProcessor {
    pub fn new(latency_ms: u64, failure_rate: f64) -> Self {
        PaymentProcessor {
            latency: Duration::from_millis(latency_ms),
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }

    pub async fn charge(&self, info: &PaymentInfo) -> Result<(), PaymentError> {
        tokio::time::sleep(self.latency).await;

        if info.amount <= 0.0 {
            return Err(PaymentError::InvalidAmount(info.amount));
        }
        if info.payment_method.is_empty() {
            return Err(PaymentError::MissingMethod);
        }
        if self.failure_rate > 0.0 && rand::random::<f64>() < self.failure_rate {
            return Err(PaymentError::Declined);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(amount: f64, method: &str) -> PaymentInfo {
        PaymentInfo {
            payment_method: method.to_string(),
            amount,
        }
    }

    #[tokio::test]
    async fn zero_failure_rate_always_succeeds() {
        let processor = PaymentProcessor::new(0, 0.0);
        for _ in 0..50 {
            assert!(processor.charge(&info(99.99, "credit_card")).await.is_ok());
        }
    }

    #[tokio::test]
    async fn full_failure_rate_always_declines() {
        let processor = PaymentProcessor::new(0, 1.0);
        for _ in 0..50 {
            assert!(matches!(
                processor.charge(&info(99.99, "credit_card")).await,
                Err(PaymentError::Declined)
            ));
        }
    }

    #[tokio::test]
    async fn rejects_non_positive_amount() {
        let processor = PaymentProcessor::new(0, 0.0);
        assert!(matches!(
            processor.charge(&info(0.0, "credit_card")).await,
            Err(PaymentError::InvalidAmount(_))
        ));
        assert!(matches!(
            processor.charge(&info(-1.0, "credit_card")).await,
            Err(PaymentError::InvalidAmount(_))
        ));
    }

    #[tokio::test]
    async fn rejects_missing_method() {
        let processor = PaymentProcessor::new(0, 0.0);
        assert!(matches!(
            processor.charge(&info(10.0, "")).await,
            Err(PaymentError::MissingMethod)
        ));
    }

    #[test]
    fn rate_is_clamped() {
        let processor = PaymentProcessor::new(0, 7.5);
        assert_eq!(processor.failure_rate, 1.0);
        let processor = PaymentProcessor::new(0, -1.0);
        assert_eq!(processor.failure_rate, 0.0);
    }
}
