use crate::{
    Error,
    app::query_api::{
        Query,
        QueryAPI,
    },
    records::{
        MarketRisk,
        OwnedDashboard,
    },
};
use actix_cors::Cors;
use actix_web::{
    App,
    HttpResponse,
    HttpServer,
    ResponseError,
    dev::ServerHandle,
    http::StatusCode,
    web,
};
use alloy::primitives::Address;
use anyhow::{
    Context,
    anyhow,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    net::TcpListener,
    str::FromStr,
    thread::JoinHandle,
};
use tokio::sync::{
    mpsc,
    oneshot,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorDto {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("invalid account address: {0}")]
    InvalidAccount(String),
    #[error("scanner is not running")]
    Unavailable,
    #[error(transparent)]
    Scan(#[from] Error),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidAccount(_) | ApiError::Scan(Error::NoAccount) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Scan(Error::ScanInProgress(_)) => StatusCode::CONFLICT,
            ApiError::Scan(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorDto {
            error: self.to_string(),
        })
    }
}

pub struct ActixQueryApi {
    receiver: mpsc::Receiver<Query>,
    base_url: String,
    server_handle: ServerHandle,
    server_thread: Option<JoinHandle<()>>,
}

impl ActixQueryApi {
    pub async fn new(port: Option<u16>) -> anyhow::Result<Self> {
        let (sender, receiver) = mpsc::channel(16);

        let listener = TcpListener::bind(("127.0.0.1", port.unwrap_or(0)))
            .context("failed to bind HTTP listener for query API")?;
        let address = listener
            .local_addr()
            .context("failed to read listener address")?;
        let base_url = format!("http://{address}");

        tracing::info!("query API listening on {base_url}");

        let server = HttpServer::new(move || {
            App::new()
                .wrap(Cors::permissive())
                .app_data(web::Data::new(sender.clone()))
                .route("/owned/{account}", web::get().to(handle_owned_records))
                .route("/market", web::get().to(handle_market_risk))
        })
        .listen(listener)
        .context("failed to start Actix server")?
        .run();

        let server_handle = server.handle();
        let server_thread = std::thread::spawn(move || {
            let sys = actix_web::rt::System::new();
            let _ = sys.block_on(server);
        });

        Ok(Self {
            receiver,
            base_url,
            server_handle,
            server_thread: Some(server_thread),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl QueryAPI for ActixQueryApi {
    async fn query(&mut self) -> anyhow::Result<Query> {
        self.receiver
            .recv()
            .await
            .ok_or_else(|| anyhow!("query server closed"))
    }
}

impl Drop for ActixQueryApi {
    fn drop(&mut self) {
        let _ = self.server_handle.stop(true);
        if let Some(thread) = self.server_thread.take() {
            let _ = thread.join();
        }
    }
}

async fn forward<T>(
    sender: &mpsc::Sender<Query>,
    query: Query,
    response: oneshot::Receiver<crate::Result<T>>,
) -> Result<T, ApiError> {
    sender.send(query).await.map_err(|_| ApiError::Unavailable)?;
    let outcome = response.await.map_err(|_| ApiError::Unavailable)?;
    Ok(outcome?)
}

async fn handle_owned_records(
    sender: web::Data<mpsc::Sender<Query>>,
    account: web::Path<String>,
) -> Result<web::Json<OwnedDashboard>, ApiError> {
    let raw = account.into_inner();
    tracing::info!("received owned records request for {raw}");
    let account =
        Address::from_str(raw.trim()).map_err(|_| ApiError::InvalidAccount(raw))?;
    let (respond_to, response) = oneshot::channel();
    let query = Query::OwnedRecords {
        account,
        respond_to,
    };
    let dashboard = forward(sender.get_ref(), query, response).await?;
    Ok(web::Json(dashboard))
}

async fn handle_market_risk(
    sender: web::Data<mpsc::Sender<Query>>,
) -> Result<web::Json<MarketRisk>, ApiError> {
    tracing::info!("received market risk request");
    let (respond_to, response) = oneshot::channel();
    let query = Query::MarketRisk { respond_to };
    let report = forward(sender.get_ref(), query, response).await?;
    Ok(web::Json(report))
}
