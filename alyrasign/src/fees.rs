//! Best-effort prioritization fee estimate, for display and logging only.

use chain_clients_svm::SvmRpcClient;
use tracing::{debug, warn};

/// Estimate returned when the network gives no usable sample.
pub const DEFAULT_FEE_SOL: f64 = 0.000005;

/// Divisor from the sampled fee unit to the display unit.
const FEE_UNIT_DIVISOR: f64 = 1e9;

#[derive(Debug, Clone)]
pub struct FeeEstimator {
    rpc: SvmRpcClient,
}

impl FeeEstimator {
    pub fn new(rpc: SvmRpcClient) -> Self {
        Self { rpc }
    }

    /// First recent prioritization fee sample, converted to SOL.
    ///
    /// Never fails: transport errors and empty sample sets yield
    /// [`DEFAULT_FEE_SOL`].
    pub async fn estimate(&self) -> f64 {
        match self.rpc.get_recent_prioritization_fees().await {
            Ok(samples) => match samples.first() {
                Some(sample) => {
                    let fee = sample.prioritization_fee as f64 / FEE_UNIT_DIVISOR;
                    debug!(slot = sample.slot, fee, "Estimated prioritization fee");
                    fee
                }
                None => DEFAULT_FEE_SOL,
            },
            Err(e) => {
                warn!("Fee estimation failed, using default: {:#}", e);
                DEFAULT_FEE_SOL
            }
        }
    }
}
