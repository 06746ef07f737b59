//! Service wiring: collaborators, dispatcher, IPC loop and webhook

use anyhow::{Context, Result};
use haruki_api::{
    Command, ErrorCode, ErrorInfo, Event, EventPayload, Request, Response, ResponsePayload,
    API_VERSION,
};
use haruki_config::Settings;
use haruki_core::{Collaborators, Dispatcher};
use haruki_ipc::{IpcServer, ServerMessage};
use haruki_remote_api::{
    AcquisitionClient, ActivityClient, CatalogClient, IdentityLinker, ViewSink,
};
use haruki_remote_http::{ArrClient, JellyseerrClient, TautulliClient};
use haruki_util::{ClientId, HarukiError};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, error, info, warn};

use crate::sink::IpcViewSink;
use crate::webhook;

/// Build HTTP collaborators for every configured section
pub fn build_collaborators(settings: &Settings, sink: Arc<dyn ViewSink>) -> Result<Collaborators> {
    let timeout = settings.wizard.http_timeout;

    let (catalog, identity) = match &settings.catalog {
        Some(endpoint) => {
            let client = Arc::new(
                JellyseerrClient::new(&endpoint.url, &endpoint.api_key, timeout)
                    .with_context(|| format!("Failed to build catalog client for {}", endpoint.url))?,
            );
            let catalog: Arc<dyn CatalogClient> = client.clone();
            let identity: Arc<dyn IdentityLinker> = client;
            (Some(catalog), Some(identity))
        }
        None => {
            warn!("No catalog configured, request wizard disabled");
            (None, None)
        }
    };

    let series: Option<Arc<dyn AcquisitionClient>> = match &settings.series {
        Some(endpoint) => Some(Arc::new(
            ArrClient::series(&endpoint.url, &endpoint.api_key, timeout)
                .with_context(|| format!("Failed to build series client for {}", endpoint.url))?,
        )),
        None => None,
    };

    let movies: Option<Arc<dyn AcquisitionClient>> = match &settings.movies {
        Some(endpoint) => Some(Arc::new(
            ArrClient::movies(&endpoint.url, &endpoint.api_key, timeout)
                .with_context(|| format!("Failed to build movie client for {}", endpoint.url))?,
        )),
        None => None,
    };

    let activity: Option<Arc<dyn ActivityClient>> = match &settings.activity {
        Some(endpoint) => Some(Arc::new(
            TautulliClient::new(&endpoint.url, &endpoint.api_key, timeout)
                .with_context(|| format!("Failed to build activity client for {}", endpoint.url))?,
        )),
        None => None,
    };

    Ok(Collaborators {
        catalog,
        identity,
        series,
        movies,
        activity,
        sink,
    })
}

fn error_response(request_id: u64, err: &HarukiError) -> Response {
    let code = match err {
        HarukiError::UnknownComponent(_) => ErrorCode::UnknownComponent,
        HarukiError::InvalidValue { .. } => ErrorCode::InvalidValue,
        HarukiError::NotConfigured(_) => ErrorCode::NotConfigured,
        _ => ErrorCode::InternalError,
    };
    Response::error(request_id, ErrorInfo::new(code, err.to_string()))
}

/// Execute one protocol request
pub async fn handle_command(dispatcher: &Dispatcher, client_id: &ClientId, request: Request) -> Response {
    let request_id = request.request_id;
    if request.api_version != API_VERSION {
        return Response::error(
            request_id,
            ErrorInfo::new(
                ErrorCode::UnsupportedVersion,
                format!("API version {} is not supported (expected {})", request.api_version, API_VERSION),
            ),
        );
    }

    match request.command {
        Command::Invoke {
            caller,
            target,
            invocation,
        } => {
            let reply = dispatcher.invoke(&caller, target, invocation).await;
            Response::success(request_id, ResponsePayload::Reply(reply))
        }

        Command::Component {
            caller,
            target,
            component_id,
            values,
        } => match dispatcher.component(&caller, &target, &component_id, &values).await {
            Ok(reply) => Response::success(request_id, ResponsePayload::Reply(reply)),
            Err(e) => {
                warn!(client_id = %client_id, component = %component_id, error = %e, "Component rejected");
                error_response(request_id, &e)
            }
        },

        Command::SubscribeEvents => Response::success(
            request_id,
            ResponsePayload::Subscribed {
                client_id: client_id.clone(),
            },
        ),

        Command::UnsubscribeEvents => Response::success(request_id, ResponsePayload::Unsubscribed),

        Command::GetHealth => Response::success(request_id, ResponsePayload::Health(dispatcher.health())),

        Command::Ping => Response::success(request_id, ResponsePayload::Pong),
    }
}

/// Main service state
pub struct Service {
    settings: Settings,
    dispatcher: Arc<Dispatcher>,
    ipc: Arc<IpcServer>,
}

impl Service {
    pub async fn new(settings: Settings, socket_override: Option<PathBuf>) -> Result<Self> {
        let socket_path = socket_override.unwrap_or_else(|| settings.service.socket_path.clone());

        let mut ipc = IpcServer::new(&socket_path);
        ipc.start()
            .await
            .with_context(|| format!("Failed to start IPC server on {:?}", socket_path))?;

        let sink: Arc<dyn ViewSink> = Arc::new(IpcViewSink::new(ipc.event_sender()));
        let collaborators = build_collaborators(&settings, sink)?;
        let dispatcher = Dispatcher::new(&settings, collaborators);

        let health = dispatcher.health();
        info!(
            catalog = health.catalog_configured,
            series = health.series_configured,
            movies = health.movies_configured,
            activity = health.activity_configured,
            webhook = health.webhook_enabled,
            "Collaborators ready"
        );

        Ok(Self {
            settings,
            dispatcher: Arc::new(dispatcher),
            ipc: Arc::new(ipc),
        })
    }

    pub async fn run(self) -> Result<()> {
        let ipc = self.ipc.clone();
        let mut messages = ipc
            .take_message_receiver()
            .await
            .context("IPC message receiver already taken")?;

        let ipc_accept = ipc.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        let webhook_task = self.settings.webhook.clone().map(|settings| {
            let relay = self.dispatcher.relay().clone();
            tokio::spawn(async move {
                if let Err(e) = webhook::serve(&settings, relay).await {
                    error!(error = %e, addr = %settings.listen, "Webhook listener failed");
                }
            })
        });

        let mut sigterm = signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                msg = messages.recv() => {
                    let Some(msg) = msg else {
                        warn!("IPC message channel closed");
                        break;
                    };
                    self.handle_ipc_message(msg);
                }
            }
        }

        info!("Shutting down harukid");
        ipc.broadcast_event(Event::new(EventPayload::Shutdown));
        if let Some(task) = webhook_task {
            task.abort();
        }
        ipc.shutdown();
        info!("Shutdown complete");
        Ok(())
    }

    fn handle_ipc_message(&self, msg: ServerMessage) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                let dispatcher = self.dispatcher.clone();
                let ipc = self.ipc.clone();
                // remote calls may take up to a minute
                tokio::spawn(async move {
                    let response = handle_command(&dispatcher, &client_id, request).await;
                    if let Err(e) = ipc.send_response(&client_id, response).await {
                        debug!(client_id = %client_id, error = %e, "Client gone before response");
                    }
                });
            }
            ServerMessage::ClientConnected { client_id, peer_uid } => {
                info!(client_id = %client_id, uid = ?peer_uid, "Bridge connected");
            }
            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Bridge disconnected");
            }
        }
    }
}
