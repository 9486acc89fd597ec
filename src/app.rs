use std::{
    env,
    sync::{Arc, Mutex, MutexGuard},
};

use actix_web::web::{self, scope, Data};
use lazy_static::lazy_static;
use log::{log, Level};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{
    endpoints::*,
    source::{HttpIncidentSource, IncidentSource},
    store::{sample_incidents, IncidentStore},
};

lazy_static! {
    pub static ref CORS_PERMISSIVE: bool = env::var("CORS_PERMISSIVE")
        .map(|x| x.parse::<bool>().unwrap_or(true))
        .unwrap_or(true);
    pub static ref REPORTS_API_URL: Option<String> = env::var("REPORTS_API_URL")
        .ok()
        .filter(|x| !x.trim().is_empty());
    pub static ref BIND_ADDR: String =
        env::var("VECINO_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string());
    pub static ref PORT: u16 = env::var("VECINO_PORT")
        .ok()
        .and_then(|x| x.parse().ok())
        .unwrap_or(3000);
}

pub struct AppState {
    pub store: Mutex<IncidentStore>,
    pub source: Option<Arc<dyn IncidentSource>>,
}

impl AppState {
    pub fn new(store: IncidentStore, source: Option<Arc<dyn IncidentSource>>) -> Self {
        Self {
            store: Mutex::new(store),
            source,
        }
    }

    /// Every store operation runs to completion under the lock, so a poisoned
    /// lock still holds consistent state.
    pub fn lock_store(&self) -> MutexGuard<'_, IncidentStore> {
        self.store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub fn configure_app(cfg: &mut web::ServiceConfig) {
    let cors = if *CORS_PERMISSIVE {
        actix_cors::Cors::permissive()
    } else {
        actix_cors::Cors::default()
            .allowed_headers(vec!["Content-Type", "Accept", "X-Viewer-Id"])
            .allow_any_method()
            .max_age(3600)
    };

    #[derive(OpenApi)]
    #[openapi(
        paths(
            cancel_vote,
            change_vote,
            create_comment,
            create_vote,
            get_comments,
            get_report,
            get_reports,
            get_taxonomy,
            get_version,
            get_vote
        ),
        components(schemas(
            crate::schema::model::Incident,
            crate::schema::model::Comment,
            crate::schema::model::Viewer,
            crate::schema::api::NewVote,
            crate::schema::api::VoteChange,
            crate::schema::api::NewCommentRequest,
            crate::schema::api::VoteResponse,
            crate::schema::api::TaxonomyResponse,
            crate::schema::api::TaxonomyEntry,
            crate::schema::api::VersionResponse,
            crate::taxonomy::Category,
            crate::taxonomy::Status,
            crate::votes::VoteDirection,
            crate::votes::VoteState,
            crate::utils::ValidationErrors
        )),
        tags(
            (name = "Vecino", description = "Civic incident reports API")
        ),
    )]
    struct ApiDoc;

    let openapi = ApiDoc::openapi();

    cfg.service(SwaggerUi::new("/api/docs/{_:.*}").url("/api/openapi.json", openapi))
        .service(
            scope("/api")
                .wrap(cors)
                .service(get_reports)
                .service(get_comments)
                .service(get_report)
                .service(create_comment)
                .service(create_vote)
                .service(get_vote)
                .service(change_vote)
                .service(cancel_vote)
                .service(get_taxonomy)
                .service(get_version),
        );
}

pub async fn get_app_data() -> Data<AppState> {
    let state = match REPORTS_API_URL.as_deref() {
        Some(url) => {
            log!(Level::Info, "Serving incidents from {url}");
            let source: Arc<dyn IncidentSource> = Arc::new(HttpIncidentSource::new(url));
            let mut store = IncidentStore::new();
            match source.fetch_incidents().await {
                Ok(incidents) => store.load(incidents),
                Err(e) => log!(
                    Level::Warn,
                    "Initial incident fetch failed, retrying on first request: {e}"
                ),
            }
            AppState::new(store, Some(source))
        }
        None => {
            log!(Level::Info, "REPORTS_API_URL not set, serving sample incidents");
            AppState::new(IncidentStore::from_incidents(sample_incidents()), None)
        }
    };
    Data::new(state)
}
