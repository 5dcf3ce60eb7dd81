// web-server/src/api/staking.rs
use actix_web::{get, web, HttpResponse};
use common::{StakingState, StakingStatusResponse};

use crate::error::ServiceError;
use crate::gate::AuthenticatedUser;
use crate::state::AppState;

#[get("/status")]
pub async fn status(
    AuthenticatedUser(user): AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServiceError> {
    let staking = state.staking.staking_status(&user).await?;

    Ok(HttpResponse::Ok().json(StakingStatusResponse {
        status: staking.state,
        has_staked: staking.state == StakingState::HasStaked,
        staked_amount: staking.staked_amount.to_string(),
        min_staked_amount: staking.min_staked_amount.to_string(),
    }))
}
