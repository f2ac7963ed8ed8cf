use std::{future::Future, process, sync::Arc, time::Duration};

use clubhouse::{
    application::{
        error::AppError,
        polls::PollDeletionService,
        repos::{PollsRepo, StoreHealth},
        revalidation::RevalidationService,
    },
    cache::{CacheConfig, CacheState, PageCacheInvalidator, PageStore},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState, HttpState, RouterState},
        origin::PageOrigin,
        telemetry,
    },
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let router_state = build_router_state(repositories, &settings)?;
    serve_http(&settings, router_state).await
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| InfraError::database(err.to_string()))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_router_state(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<RouterState, AppError> {
    let polls_repo: Arc<dyn PollsRepo> = repositories.clone();
    let health: Arc<dyn StoreHealth> = repositories;

    let cache_config = CacheConfig::from(&settings.cache);
    let store = Arc::new(PageStore::new(&cache_config));
    let invalidator: Arc<dyn PageCacheInvalidator> = store.clone();
    let cache_state = cache_config.enabled.then(|| CacheState {
        config: cache_config.clone(),
        store,
    });

    let origin = Arc::new(PageOrigin::new(&settings.origin)?);
    if !origin.is_configured() {
        warn!(
            target = "clubhouse::startup",
            "No origin renderer configured; public pages will answer 404"
        );
    }

    let revalidation = Arc::new(RevalidationService::new(
        settings.revalidation.clone(),
        invalidator.clone(),
    ));
    let polls = Arc::new(
        PollDeletionService::new(polls_repo)
            .with_page_invalidation(invalidator, settings.polls.page_prefix.clone()),
    );

    Ok(RouterState {
        http: HttpState {
            origin,
            health,
            cache: cache_state,
        },
        api: ApiState {
            revalidation,
            polls,
        },
    })
}

async fn serve_http(settings: &config::Settings, state: RouterState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(InfraError::from)?;

    info!(
        target = "clubhouse::startup",
        addr = %settings.server.addr,
        "Listening"
    );

    let draining = Arc::new(Notify::new());
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(notify_on_shutdown(draining.clone()));

    tokio::select! {
        result = server.into_future() => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        () = drain_deadline(draining, settings.server.graceful_shutdown) => {
            warn!(
                target = "clubhouse::shutdown",
                "Graceful shutdown timed out; dropping open connections"
            );
        }
    }

    info!(target = "clubhouse::shutdown", "Server stopped");
    Ok(())
}

fn notify_on_shutdown(draining: Arc<Notify>) -> impl Future<Output = ()> + Send + 'static {
    async move {
        shutdown_signal().await;
        info!(
            target = "clubhouse::shutdown",
            "Shutdown signal received; draining connections"
        );
        draining.notify_one();
    }
}

async fn drain_deadline(draining: Arc<Notify>, grace: Duration) {
    draining.notified().await;
    tokio::time::sleep(grace).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
