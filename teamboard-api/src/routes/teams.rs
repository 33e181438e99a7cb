/// Team endpoints
///
/// # Endpoints
///
/// - `GET /api/teams` - All teams
/// - `POST /api/teams` - Create a team owned by the caller
/// - `GET /api/teams/mine` - Teams the caller belongs to
/// - `POST /api/teams/:id/join` - Join a team
///
/// Team creation and successful joins are broadcast to every connected
/// socket (`team:created`, `team:updated`).

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
    routes::non_blank,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use teamboard_shared::{
    auth::gate::Principal,
    models::team::{JoinOutcome, NewTeam, Team, TeamMember, TeamRole, TeamSettings},
    realtime::events::{TEAM_CREATED, TEAM_UPDATED},
};
use tracing::info;
use validator::Validate;

/// Create team request
///
/// `settings` may be partial; missing switches take their defaults.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTeamRequest {
    #[validate(length(max = 100, message = "Team name must be at most 100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    pub settings: Option<TeamSettings>,
}

/// Team write response
#[derive(Debug, Serialize, Deserialize)]
pub struct TeamResponse {
    pub ok: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    pub team: Team,
}

fn member_of(principal: &Principal, role: TeamRole) -> TeamMember {
    let name = if principal.name.is_empty() {
        &principal.email
    } else {
        &principal.name
    };
    TeamMember::new(&principal.id, &principal.email, name, role)
}

/// List all teams
pub async fn list_teams(State(state): State<AppState>) -> ApiResult<Json<Vec<Team>>> {
    let teams = state.repo().list_teams().await?;
    Ok(Json(teams))
}

/// Teams listing the caller as a member
pub async fn my_teams(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<Vec<Team>>> {
    let teams = state.repo().list_teams_for_member(&principal.id).await?;
    Ok(Json(teams))
}

/// Create a team with the caller as its sole owner
///
/// # Errors
///
/// - `400 Bad Request`: Blank name
pub async fn create_team(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<CreateTeamRequest>,
) -> ApiResult<(StatusCode, Json<TeamResponse>)> {
    req.validate()?;

    let name = non_blank(req.name.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Team name is required".to_string()))?
        .to_string();

    let team = state
        .repo()
        .create_team(NewTeam {
            name,
            description: req.description.unwrap_or_default(),
            settings: req.settings.unwrap_or_default(),
            owner: member_of(&principal, TeamRole::Owner),
        })
        .await?;

    info!(team_id = %team.id, owner = %principal.id, "Team created");

    state.hub.broadcast(TEAM_CREATED, &team).await;

    Ok((
        StatusCode::CREATED,
        Json(TeamResponse {
            ok: true,
            message: None,
            team,
        }),
    ))
}

/// Join a team
///
/// Joining twice is a successful no-op.
///
/// # Errors
///
/// - `404 Not Found`: No such team
/// - `409 Conflict` (`team_full`): Team is at its member cap
pub async fn join_team(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Json<TeamResponse>> {
    let outcome = state
        .repo()
        .join_team(&id, member_of(&principal, TeamRole::Member))
        .await?;

    match outcome {
        JoinOutcome::Joined(team) => {
            info!(team_id = %team.id, user_id = %principal.id, members = team.members.len(), "Joined team");
            state.hub.broadcast(TEAM_UPDATED, &team).await;

            Ok(Json(TeamResponse {
                ok: true,
                message: None,
                team,
            }))
        }
        JoinOutcome::AlreadyMember(team) => Ok(Json(TeamResponse {
            ok: true,
            message: Some("Already a member of this team".to_string()),
            team,
        })),
        JoinOutcome::Full(team) => {
            info!(team_id = %team.id, user_id = %principal.id, "Join rejected: team full");
            Err(ApiError::TeamFull)
        }
    }
}
