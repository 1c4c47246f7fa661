//! The `serve` command: open the repository and serve its catalog.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use reelvault_catalog::Collection;
use reelvault_http::{HttpServer, Method, Outcome, Router, ServerConfig};
use reelvault_repo::Repo;
use serde_json::json;

use crate::error::CliError;

pub(crate) fn run(
    repository: &Path,
    port: u16,
    timeout_secs: u64,
) -> Result<ExitCode, CliError> {
    // A catalog that fails the schema gate aborts startup; serving a
    // possibly-corrupt catalog is never an option.
    let repo = match Repo::open(repository) {
        Ok(repo) => repo,
        Err(err) => {
            log::error!("cannot open repository: {err}");
            return Ok(ExitCode::FAILURE);
        }
    };
    let repo = Arc::new(Mutex::new(repo));

    let router = build_router(repo);

    let workers = thread::available_parallelism().map(usize::from).unwrap_or(1);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .enable_all()
        .build()?;

    let config = ServerConfig::new(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port))
        .with_session_timeout(Duration::from_secs(timeout_secs));

    runtime.block_on(async move {
        let server = HttpServer::bind(config, router)?;
        tokio::select! {
            () = server.run() => {}
            _ = tokio::signal::ctrl_c() => {
                log::info!("shutting down");
            }
        }
        Ok::<(), CliError>(())
    })?;

    Ok(ExitCode::SUCCESS)
}

fn build_router(repo: Arc<Mutex<Repo>>) -> Router {
    let mut router = Router::new();

    router.register(Method::Get, "/", |_req| {
        Outcome::Json(json!({
            "service": "reelvault",
            "version": env!("CARGO_PKG_VERSION"),
        }))
    });

    router.register(Method::Get, "/collections", move |_req| {
        // The catalog connection is not safe for concurrent use; this lock
        // is the single serialization point for all sessions.
        let mut repo = match repo.lock() {
            Ok(repo) => repo,
            Err(_) => return Outcome::ServerError("Catalog state is poisoned.".to_string()),
        };
        match repo.collections() {
            Ok(collections) => Outcome::Json(json!({
                "collections": collections
                    .iter()
                    .map(Collection::to_json)
                    .collect::<Vec<_>>(),
            })),
            Err(err) => {
                log::error!("failed to read collections: {err}");
                Outcome::ServerError("Failed to read the catalog.".to_string())
            }
        }
    });

    router
}
