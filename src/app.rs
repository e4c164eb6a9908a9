use crate::caller::CallDispatcher;
use crate::composer::MessageComposer;
use crate::config::{AppConfig, TLSConfig};
use crate::http::create_app;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::log::{error, info, warn};

const STARTUP_CALL_DELAY: Duration = Duration::from_secs(2);

pub struct AppHandles {
    tasks: Vec<(&'static str, JoinHandle<()>)>,
    startup_call: Option<JoinHandle<()>>,
}
impl AppHandles {
    pub fn new(config: AppConfig) -> Result<AppHandles> {
        let config = Arc::new(config);
        let mut tasks = Vec::new();

        let dispatcher = CallDispatcher::new(config.caller.clone())?;
        let composer = MessageComposer::from_config(&config.generation)?;
        if composer.is_some() {
            info!(
                "AI message generation enabled with model {}",
                config.generation.model
            );
        }

        let http_handle =
            Self::start_http_server(Arc::clone(&config), dispatcher.clone(), composer);
        tasks.push(("HTTP Server", http_handle));
        Self::log_endpoints(config.http.address);

        // Not supervised, finishing the startup call must not stop the server.
        let startup_call = config
            .auto_call_on_start
            .then(|| Self::schedule_startup_call(dispatcher));

        Ok(AppHandles {
            tasks,
            startup_call,
        })
    }

    pub async fn run(self) {
        let AppHandles {
            tasks,
            startup_call,
        } = self;

        let futures: Vec<_> = tasks
            .into_iter()
            .map(|(name, handle)| {
                info!("Starting task: {name}");
                Box::pin(async move {
                    match handle.await {
                        Ok(_) => error!("{name} task completed!"),
                        Err(e) => error!("{name} task failed: {e:?}!"),
                    }
                })
            })
            .collect();

        // Wait for any task to complete. All handles are boxed, so when dropped they are cancelled.
        let (_, _, remaining) = futures::future::select_all(futures).await;
        drop(remaining);

        if let Some(startup_call) = startup_call {
            startup_call.abort();
        }
    }

    fn schedule_startup_call(dispatcher: CallDispatcher) -> JoinHandle<()> {
        info!(
            "Auto call on start enabled, calling in {}s",
            STARTUP_CALL_DELAY.as_secs()
        );
        tokio::spawn(async move {
            sleep(STARTUP_CALL_DELAY).await;

            info!("Auto call triggered!");
            let result = dispatcher.place_default_call().await;
            match result.error {
                None => info!("Startup call initiated"),
                Some(e) => warn!("Startup call failed: {e}"),
            }
        })
    }

    fn start_http_server(
        config: Arc<AppConfig>,
        dispatcher: CallDispatcher,
        composer: Option<MessageComposer>,
    ) -> JoinHandle<()> {
        let address = config.http.address;
        let tls_config = config.http.tls.clone();

        let app = create_app(config, dispatcher, composer);
        tokio::spawn(async move {
            let result = match tls_config {
                Some(tls_config) => {
                    info!("Starting HTTPS (secure) server on {address}");
                    serve_tls(address, tls_config, app).await
                }
                None => {
                    info!("Starting HTTP (insecure) server on {address}");
                    axum_server::bind(address)
                        .serve(app.into_make_service())
                        .await
                        .map_err(anyhow::Error::from)
                }
            };

            if let Err(e) = result {
                error!("Server error: {e:?}");
            }
        })
    }

    fn log_endpoints(address: SocketAddr) {
        info!("Endpoints:");
        info!("  GET  /          : Health check");
        info!("  GET  /call-now  : Make immediate call");
        info!("  POST /call      : Make call with custom message");
        info!(
            "To make a call right now, run: curl http://localhost:{}/call-now",
            address.port()
        );
    }
}

#[cfg(feature = "tls-rustls")]
async fn serve_tls(address: SocketAddr, tls_config: TLSConfig, app: axum::Router) -> Result<()> {
    let _ = rustls::crypto::CryptoProvider::install_default(
        rustls::crypto::aws_lc_rs::default_provider(),
    );
    let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(
        &tls_config.certificate_path,
        &tls_config.key_path,
    )
    .await
    .context("Failed to load rustls TLS certificates!")?;

    axum_server::bind_rustls(address, tls)
        .serve(app.into_make_service())
        .await
        .map_err(anyhow::Error::from)
}

#[cfg(all(feature = "tls-native", not(feature = "tls-rustls")))]
async fn serve_tls(address: SocketAddr, tls_config: TLSConfig, app: axum::Router) -> Result<()> {
    let tls = axum_server::tls_openssl::OpenSSLConfig::from_pem_file(
        &tls_config.certificate_path,
        &tls_config.key_path,
    )
    .context("Failed to load openssl TLS certificates!")?;

    axum_server::bind_openssl(address, tls)
        .serve(app.into_make_service())
        .await
        .map_err(anyhow::Error::from)
}

#[cfg(not(any(feature = "tls-rustls", feature = "tls-native")))]
async fn serve_tls(_address: SocketAddr, _tls_config: TLSConfig, _app: axum::Router) -> Result<()> {
    Err(anyhow::anyhow!(
        "HTTP Server TLS configuration provided but no TLS features enabled. Compile with a TLS backend feature!"
    ))
}

#[cfg(test)]
mod app_tests {
    use super::*;
    use crate::config::CallerConfig;
    use crate::testing::{closed_url, FakeProvider};
    use axum::http::StatusCode;

    fn dispatcher_for(provider_url: String) -> CallDispatcher {
        let caller = CallerConfig {
            message: "Startup default".to_string(),
            provider_url,
            ..CallerConfig::default()
        };
        CallDispatcher::new(caller).unwrap()
    }

    #[tokio::test]
    async fn test_startup_call_waits_then_dispatches_default_message() {
        let provider = FakeProvider::start("/start.php", StatusCode::OK, "Call queued").await;
        let handle = AppHandles::schedule_startup_call(dispatcher_for(provider.url()));

        sleep(Duration::from_millis(1500)).await;
        assert!(provider.requests().is_empty());

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].query["text"], "Startup default");
    }

    #[tokio::test]
    async fn test_startup_call_failure_completes_task() {
        let dispatcher = dispatcher_for(closed_url("/start.php").await);
        let handle = AppHandles::schedule_startup_call(dispatcher);

        let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(result.unwrap().is_ok());
    }
}
