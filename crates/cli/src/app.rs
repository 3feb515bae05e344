//! Wiring configuration into relay clients and bundle pipelines

use anyhow::{Context, Result};
use bundler::{build_tracker, BundlePipeline, TipAccountSelector};
use config::{Config, TrackingStrategy};
use relay_client::{BundleEventSource, BundleRelay, RecentBlockhash, RelayClient, RelayStream, UpstreamRpc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use types::{BundleHandle, SignedTransaction, TipAccount, TrackingOutcome};

/// Shared clients for one process run
pub struct Application {
    config: Config,
    relay: Arc<dyn BundleRelay>,
    upstream: UpstreamRpc,
}

impl Application {
    pub fn new(config: Config) -> Result<Self> {
        let relay = RelayClient::new(config.relay_endpoint())
            .context("Failed to create relay client")?;

        let upstream = UpstreamRpc::new(
            config.upstream.rpc_url.clone(),
            config.upstream.commitment.clone(),
            Duration::from_secs(config.upstream.timeout_seconds),
        )
        .context("Failed to create upstream RPC client")?;

        info!(
            relay = %config.relay.name,
            url = %config.relay.url,
            encoding = %config.relay.encoding,
            "Relay client ready"
        );

        Ok(Self {
            config,
            relay: Arc::new(relay),
            upstream,
        })
    }

    pub async fn tip_account(&self) -> Result<TipAccount> {
        let account = TipAccountSelector::new(self.relay.clone())
            .select_tip_account()
            .await?;
        Ok(account)
    }

    pub async fn blockhash(&self) -> Result<RecentBlockhash> {
        let blockhash = self.upstream.latest_blockhash().await?;
        Ok(blockhash)
    }

    pub async fn send(
        &self,
        transactions: Vec<SignedTransaction>,
        strategy: Option<TrackingStrategy>,
    ) -> Result<TrackingOutcome> {
        let (pipeline, stream) = self.pipeline(strategy).await?;
        let outcome = pipeline.run(transactions).await;
        close_stream(stream);
        Ok(outcome?)
    }

    pub async fn status(
        &self,
        handle: &BundleHandle,
        strategy: Option<TrackingStrategy>,
    ) -> Result<TrackingOutcome> {
        let (pipeline, stream) = self.pipeline(strategy).await?;
        let outcome = pipeline.track(handle).await;
        close_stream(stream);
        Ok(outcome?)
    }

    /// Pipeline for the configured strategy, or `strategy` when given, plus
    /// the result stream it tracks on in event mode
    async fn pipeline(
        &self,
        strategy: Option<TrackingStrategy>,
    ) -> Result<(BundlePipeline, Option<Arc<RelayStream>>)> {
        let mut tracking = self.config.tracking.clone();
        if let Some(strategy) = strategy {
            tracking.strategy = strategy;
        }

        let stream = match tracking.strategy {
            TrackingStrategy::Poll => None,
            TrackingStrategy::Event => Some(Arc::new(
                RelayStream::connect(&self.config.relay_endpoint())
                    .await
                    .context("Failed to open bundle result stream")?,
            )),
        };
        let events = stream
            .clone()
            .map(|stream| stream as Arc<dyn BundleEventSource>);

        let tracker = build_tracker(&tracking, self.relay.clone(), events)?;
        info!(strategy = %tracking.strategy, "Tracker ready");

        let pipeline = BundlePipeline::new(
            self.relay.clone(),
            self.config.relay.encoding,
            tracker,
            self.config.bundle.max_transactions,
        );
        Ok((pipeline, stream))
    }
}

fn close_stream(stream: Option<Arc<RelayStream>>) {
    if let Some(stream) = stream {
        stream.close();
        debug!(relay = %stream.name(), "Bundle result stream closed");
    }
}
