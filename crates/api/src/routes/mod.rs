use axum::extract::{Extension, Path, Query, State};
use axum::{
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use urun_domain::collaboration::{ContributionBuckets, ContributionRequest, ResponseDecision};
use urun_domain::engagement::{Activity, Notification};
use urun_domain::ideas::{Idea, IdeaCreate, IdeaVisibility};
use urun_domain::matching::{IdeaMatch, SkillMatch};
use urun_domain::users::{ProfileUpdate, SkillLevel, User, UserSkill};
use validator::Validate;

use crate::middleware::AuthContext;
use crate::{error::ApiError, middleware as app_middleware, observability, state::AppState, validation};

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/v1/profile", put(upsert_profile))
        .route("/v1/ideas", post(create_idea))
        .route("/v1/ideas/:idea_id", get(get_idea))
        .route(
            "/v1/ideas/:idea_id/requests",
            post(request_contribution)
                .get(list_idea_requests)
                .delete(withdraw_request),
        )
        .route("/v1/ideas/:idea_id/invites", post(invite_contribution))
        .route("/v1/ideas/:idea_id/candidates", get(rank_candidates))
        .route("/v1/requests/:request_id/respond", post(respond_to_invite))
        .route("/v1/requests/:request_id", delete(cancel_invite))
        .route("/v1/contributions", get(list_contributions))
        .route("/v1/matches/ideas", get(rank_ideas))
        .route("/v1/notifications", get(list_notifications))
        .route("/v1/activities", get(list_activities))
        .route_layer(middleware::from_fn(app_middleware::require_auth_middleware));

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .merge(protected)
        .layer(app_middleware::timeout_layer())
        .layer(app_middleware::trace_layer())
        .layer(middleware::from_fn(app_middleware::track_metrics_middleware))
        .layer(app_middleware::set_request_id_layer())
        .layer(app_middleware::propagate_request_id_layer())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::auth_middleware,
        ))
        .layer(middleware::from_fn(
            app_middleware::correlation_id_middleware,
        ));

    if !state.config.app_env.eq_ignore_ascii_case("test") {
        app = app.layer(app_middleware::rate_limit_layer());
    }

    app.with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    environment: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.app_env.clone(),
    })
}

async fn metrics() -> Result<String, ApiError> {
    observability::render_metrics().ok_or(ApiError::Internal)
}

#[derive(Debug, Deserialize, Serialize)]
struct SkillEntryBody {
    skill: String,
    level: Option<SkillLevel>,
}

#[derive(Debug, Deserialize, Validate)]
struct UpsertProfileRequest {
    #[validate(length(max = 30))]
    skills: Vec<SkillEntryBody>,
}

async fn upsert_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<UpsertProfileRequest>,
) -> Result<Json<User>, ApiError> {
    validation::validate(&payload)?;
    let actor = auth.actor()?;
    let input = ProfileUpdate {
        skills: payload
            .skills
            .into_iter()
            .map(|entry| UserSkill {
                skill: entry.skill,
                level: entry.level,
            })
            .collect(),
    };
    let user = state.profiles.upsert_profile(actor, input).await?;
    Ok(Json(user))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateIdeaRequest {
    #[validate(length(min = 1, max = 160))]
    title: String,
    summary: Option<String>,
    #[validate(length(max = 10))]
    required_skills: Vec<String>,
    visibility: Option<IdeaVisibility>,
    published: Option<bool>,
}

async fn create_idea(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateIdeaRequest>,
) -> Result<(StatusCode, Json<Idea>), ApiError> {
    validation::validate(&payload)?;
    let actor = auth.actor()?;
    let idea = state
        .ideas
        .create(
            actor,
            IdeaCreate {
                title: payload.title,
                summary: payload.summary,
                required_skills: payload.required_skills,
                visibility: payload.visibility.unwrap_or(IdeaVisibility::Public),
                published: payload.published.unwrap_or(true),
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(idea)))
}

async fn get_idea(
    State(state): State<AppState>,
    Path(idea_id): Path<String>,
) -> Result<Json<Idea>, ApiError> {
    let idea = state.ideas.get(&idea_id).await?;
    Ok(Json(idea))
}

#[derive(Debug, Deserialize, Validate)]
struct RequestContributionBody {
    #[validate(length(min = 1, max = 1000))]
    message: String,
}

async fn request_contribution(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(idea_id): Path<String>,
    Json(payload): Json<RequestContributionBody>,
) -> Result<(StatusCode, Json<ContributionRequest>), ApiError> {
    validation::validate(&payload)?;
    let actor = auth.actor()?;
    let request = state
        .collaboration
        .request_contribution(actor, &idea_id, payload.message)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn withdraw_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(idea_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let actor = auth.actor()?;
    state.collaboration.withdraw_request(actor, &idea_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_idea_requests(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(idea_id): Path<String>,
) -> Result<Json<Vec<ContributionRequest>>, ApiError> {
    let actor = auth.actor()?;
    let requests = state
        .collaboration
        .list_invites_for_idea(&actor, &idea_id)
        .await?;
    Ok(Json(requests))
}

#[derive(Debug, Deserialize, Validate)]
struct InviteContributionBody {
    #[validate(length(min = 1, max = 128))]
    candidate_id: String,
    #[validate(length(min = 1, max = 1000))]
    message: String,
    #[validate(length(min = 1, max = 10))]
    required_skills: Vec<String>,
}

async fn invite_contribution(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(idea_id): Path<String>,
    Json(payload): Json<InviteContributionBody>,
) -> Result<(StatusCode, Json<ContributionRequest>), ApiError> {
    validation::validate(&payload)?;
    let actor = auth.actor()?;
    let request = state
        .collaboration
        .invite_contribution(
            actor,
            &idea_id,
            &payload.candidate_id,
            payload.message,
            payload.required_skills,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

#[derive(Debug, Deserialize, Validate)]
struct RespondToInviteBody {
    #[validate(length(min = 1, max = 16))]
    decision: String,
}

async fn respond_to_invite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(request_id): Path<String>,
    Json(payload): Json<RespondToInviteBody>,
) -> Result<Json<ContributionRequest>, ApiError> {
    validation::validate(&payload)?;
    let actor = auth.actor()?;
    let decision = parse_decision(&payload.decision)?;
    let request = state
        .collaboration
        .respond_to_invite(actor, &request_id, decision)
        .await?;
    Ok(Json(request))
}

fn parse_decision(raw: &str) -> Result<ResponseDecision, ApiError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "accepted" => Ok(ResponseDecision::Accepted),
        "rejected" => Ok(ResponseDecision::Rejected),
        _ => Err(ApiError::Validation(
            "decision must be accepted or rejected".into(),
        )),
    }
}

async fn cancel_invite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(request_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let actor = auth.actor()?;
    state.collaboration.cancel_invite(actor, &request_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_contributions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ContributionBuckets>, ApiError> {
    let actor = auth.actor()?;
    let buckets = state
        .collaboration
        .list_contributions_for_user(&actor)
        .await?;
    Ok(Json(buckets))
}

#[derive(Debug, Deserialize)]
struct RankCandidatesQuery {
    limit: Option<usize>,
    /// Comma-separated override; the idea's own required skills otherwise.
    skills: Option<String>,
}

async fn rank_candidates(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(idea_id): Path<String>,
    Query(query): Query<RankCandidatesQuery>,
) -> Result<Json<Vec<SkillMatch>>, ApiError> {
    let actor = auth.actor()?;
    let idea = state.ideas.get(&idea_id).await?;
    if idea.author_id != actor.user_id {
        return Err(ApiError::Forbidden(
            "only the idea author can rank candidates".into(),
        ));
    }

    let required_skills = query.skills.map(|raw| {
        raw.split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
    });
    let matches = state
        .matching
        .rank_candidates(&idea_id, required_skills, query.limit)
        .await?;
    Ok(Json(matches))
}

#[derive(Debug, Deserialize)]
struct RankIdeasQuery {
    limit: Option<usize>,
}

async fn rank_ideas(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<RankIdeasQuery>,
) -> Result<Json<Vec<IdeaMatch>>, ApiError> {
    let actor = auth.actor()?;
    let matches = state
        .matching
        .rank_ideas_for_user(&actor.user_id, query.limit)
        .await?;
    Ok(Json(matches))
}

async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let actor = auth.actor()?;
    let notifications = state
        .engagement
        .list_notifications_for_user(&actor.user_id)
        .await?;
    Ok(Json(notifications))
}

#[derive(Debug, Deserialize)]
struct ListActivitiesQuery {
    idea_id: Option<String>,
}

async fn list_activities(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListActivitiesQuery>,
) -> Result<Json<Vec<Activity>>, ApiError> {
    let actor = auth.actor()?;
    let activities = match query.idea_id {
        Some(idea_id) => state.engagement.list_activities_for_idea(&idea_id).await?,
        None => {
            state
                .engagement
                .list_activities_for_user(&actor.user_id)
                .await?
        }
    };
    Ok(Json(activities))
}
