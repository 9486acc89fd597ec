use actix_web::{
    delete, get, post, put,
    web::{self, Data, Json, Path},
    HttpResponse, Responder,
};
use chrono::Utc;
use log::{log, Level};

use crate::{
    api::{
        source::fetch_incident,
        store::{StoreError, VoteIntent},
    },
    app::AppState,
    filter::FilterSelection,
    schema::api::{
        NewCommentRequest, NewVote, ReportsQuery, TaxonomyResponse, VersionResponse, VoteChange,
        VoteResponse,
    },
    session::ViewerSession,
    votes::VoteError,
};

fn error_response(err: StoreError) -> HttpResponse {
    match err {
        StoreError::NotFound(_) => HttpResponse::NotFound().body(err.to_string()),
        StoreError::Conflict(msg) => HttpResponse::Conflict().body(msg),
        StoreError::Validation(errors) => HttpResponse::BadRequest().json(errors),
        StoreError::Vote(VoteError::InvalidIdentity(errors)) => {
            HttpResponse::BadRequest().json(errors)
        }
        StoreError::Vote(VoteError::IdentityRequired) => {
            HttpResponse::BadRequest().body(VoteError::IdentityRequired.to_string())
        }
        StoreError::Vote(e @ (VoteError::InFlight | VoteError::StaleTicket)) => {
            log!(Level::Debug, "Dropped vote submission: {e}");
            HttpResponse::Conflict().body(e.to_string())
        }
    }
}

/// Loads incidents from upstream the first time they are needed. Any request
/// after a failed load retries.
async fn ensure_loaded(state: &AppState) -> Result<(), HttpResponse> {
    if state.lock_store().is_loaded() {
        return Ok(());
    }
    let source = match &state.source {
        Some(source) => source,
        None => return Ok(()),
    };
    match source.fetch_incidents().await {
        Ok(incidents) => {
            let mut store = state.lock_store();
            if !store.is_loaded() {
                store.load(incidents);
            }
            Ok(())
        }
        Err(e) => {
            log!(Level::Error, "Failed to fetch incidents: {e}");
            Err(HttpResponse::BadGateway().body("Could not load incidents, try again later"))
        }
    }
}

#[utoipa::path(
    context_path = "/api",
    params(ReportsQuery),
    responses(
        (status = 200, description = "Incidents matching the filters, in source order", body = [crate::schema::model::Incident]),
        (status = 400, description = "Unknown category or status"),
        (status = 502, description = "Upstream reports API unavailable")
    )
)]
#[get("/reports")]
pub async fn get_reports(state: Data<AppState>, params: web::Query<ReportsQuery>) -> impl Responder {
    log!(Level::Info, "GET /api/reports");
    let selection =
        match FilterSelection::from_query(params.category.as_deref(), params.status.as_deref()) {
            Ok(selection) => selection,
            Err(e) => return HttpResponse::BadRequest().body(e.to_string()),
        };
    if let Err(res) = ensure_loaded(&state).await {
        return res;
    }
    let incidents = state.lock_store().list(&selection);
    HttpResponse::Ok().json(incidents)
}

#[utoipa::path(
    context_path = "/api",
    responses(
        (status = 200, description = "The incident", body = crate::schema::model::Incident),
        (status = 404, description = "No such incident"),
        (status = 502, description = "Upstream reports API unavailable")
    )
)]
#[get("/reports/{id}")]
pub async fn get_report(state: Data<AppState>, path: Path<(u64,)>) -> impl Responder {
    let (id,) = path.into_inner();
    log!(Level::Info, "GET /api/reports/{id}");
    if let Err(res) = ensure_loaded(&state).await {
        return res;
    }
    if let Some(incident) = state.lock_store().get(id).cloned() {
        return HttpResponse::Ok().json(incident);
    }

    let source = match &state.source {
        Some(source) => source,
        None => return HttpResponse::NotFound().body("Incident could not be found"),
    };
    match fetch_incident(source.as_ref(), id).await {
        Ok(Some(incident)) => {
            state.lock_store().insert(incident.clone());
            HttpResponse::Ok().json(incident)
        }
        Ok(None) => HttpResponse::NotFound().body("Incident could not be found"),
        Err(_) => HttpResponse::BadGateway().body("Could not load incident, try again later"),
    }
}

#[utoipa::path(
    context_path = "/api",
    responses(
        (status = 200, description = "Comments, newest first", body = [crate::schema::model::Comment]),
        (status = 404, description = "No such incident")
    )
)]
#[get("/reports/{id}/comments")]
pub async fn get_comments(state: Data<AppState>, path: Path<(u64,)>) -> impl Responder {
    let (id,) = path.into_inner();
    log!(Level::Info, "GET /api/reports/{id}/comments");
    if let Err(res) = ensure_loaded(&state).await {
        return res;
    }
    match state.lock_store().comments(id) {
        Ok(comments) => HttpResponse::Ok().json(comments),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    context_path = "/api",
    request_body = NewCommentRequest,
    responses(
        (status = 200, description = "The stored comment", body = crate::schema::model::Comment),
        (status = 400, description = "Per-field validation errors", body = crate::utils::ValidationErrors),
        (status = 404, description = "No such incident")
    )
)]
#[post("/comments")]
pub async fn create_comment(state: Data<AppState>, body: Json<NewCommentRequest>) -> impl Responder {
    log!(Level::Info, "POST /api/comments");
    if let Err(res) = ensure_loaded(&state).await {
        return res;
    }
    let (id, new) = body.into_inner().into_parts();
    match state.lock_store().add_comment(id, new, Utc::now()) {
        Ok(comment) => HttpResponse::Ok().json(comment),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    context_path = "/api",
    params(("X-Viewer-Id" = String, Header, description = "Viewer session")),
    responses(
        (status = 200, description = "The caller's vote and the tally", body = VoteResponse),
        (status = 404, description = "No such incident")
    )
)]
#[get("/votes/{incident_id}")]
pub async fn get_vote(
    state: Data<AppState>,
    path: Path<(u64,)>,
    viewer: ViewerSession,
) -> impl Responder {
    let (id,) = path.into_inner();
    if let Err(res) = ensure_loaded(&state).await {
        return res;
    }
    match state.lock_store().vote_state(id, &viewer.0) {
        Ok((vote, tally)) => HttpResponse::Ok().json(VoteResponse::from_state(id, vote, tally)),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    context_path = "/api",
    request_body = NewVote,
    params(("X-Viewer-Id" = String, Header, description = "Viewer session")),
    responses(
        (status = 200, description = "Vote cast", body = VoteResponse),
        (status = 400, description = "Invalid identity"),
        (status = 404, description = "No such incident"),
        (status = 409, description = "The viewer already voted")
    )
)]
#[post("/votes")]
pub async fn create_vote(
    state: Data<AppState>,
    body: Json<NewVote>,
    viewer: ViewerSession,
) -> impl Responder {
    log!(Level::Info, "POST /api/votes");
    if let Err(res) = ensure_loaded(&state).await {
        return res;
    }
    let NewVote {
        incident_id,
        direction,
        viewer: identity,
    } = body.into_inner();
    match state.lock_store().vote(
        incident_id,
        &viewer.0,
        VoteIntent::Create,
        Some(direction),
        Some(identity),
    ) {
        Ok(receipt) => HttpResponse::Ok().json(VoteResponse::from_receipt(incident_id, &receipt)),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    context_path = "/api",
    request_body = VoteChange,
    params(("X-Viewer-Id" = String, Header, description = "Viewer session")),
    responses(
        (status = 200, description = "Vote switched", body = VoteResponse),
        (status = 400, description = "Invalid identity"),
        (status = 404, description = "No such incident"),
        (status = 409, description = "No vote to change, or same direction")
    )
)]
#[put("/votes/{incident_id}")]
pub async fn change_vote(
    state: Data<AppState>,
    path: Path<(u64,)>,
    body: Json<VoteChange>,
    viewer: ViewerSession,
) -> impl Responder {
    let (id,) = path.into_inner();
    log!(Level::Info, "PUT /api/votes/{id}");
    if let Err(res) = ensure_loaded(&state).await {
        return res;
    }
    let VoteChange {
        direction,
        viewer: identity,
    } = body.into_inner();
    match state.lock_store().vote(
        id,
        &viewer.0,
        VoteIntent::Change,
        Some(direction),
        Some(identity),
    ) {
        Ok(receipt) => HttpResponse::Ok().json(VoteResponse::from_receipt(id, &receipt)),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    context_path = "/api",
    params(("X-Viewer-Id" = String, Header, description = "Viewer session")),
    responses(
        (status = 200, description = "Vote cancelled", body = VoteResponse),
        (status = 404, description = "No such incident"),
        (status = 409, description = "No vote to cancel")
    )
)]
#[delete("/votes/{incident_id}")]
pub async fn cancel_vote(
    state: Data<AppState>,
    path: Path<(u64,)>,
    viewer: ViewerSession,
) -> impl Responder {
    let (id,) = path.into_inner();
    log!(Level::Info, "DELETE /api/votes/{id}");
    if let Err(res) = ensure_loaded(&state).await {
        return res;
    }
    match state
        .lock_store()
        .vote(id, &viewer.0, VoteIntent::Cancel, None, None)
    {
        Ok(receipt) => HttpResponse::Ok().json(VoteResponse::from_receipt(id, &receipt)),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    context_path = "/api",
    responses((status = 200, description = "Categories and statuses", body = TaxonomyResponse))
)]
#[get("/taxonomy")]
pub async fn get_taxonomy() -> impl Responder {
    HttpResponse::Ok().json(TaxonomyResponse::build())
}

#[utoipa::path(
    context_path = "/api",
    responses((status = 200, description = "Build information", body = VersionResponse))
)]
#[get("/version")]
pub async fn get_version() -> impl Responder {
    HttpResponse::Ok().json(VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        build_timestamp: option_env!("VERGEN_BUILD_TIMESTAMP"),
        git_sha: option_env!("VERGEN_GIT_SHA"),
        git_commit_timestamp: option_env!("VERGEN_GIT_COMMIT_TIMESTAMP"),
    })
}
