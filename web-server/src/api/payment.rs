// web-server/src/api/payment.rs
use actix_web::{get, post, web, HttpResponse};
use common::models::{PaymentStatus, User};
use common::{
    ConfirmPaymentRequest, ConfirmPaymentResponse, PaymentInitiateResponse, PaymentStatusResponse,
    PaymentSummary,
};

use crate::error::ServiceError;
use crate::gate::AuthenticatedUser;
use crate::state::AppState;

// Where and how much to pay
#[post("/initiate")]
pub async fn initiate(
    AuthenticatedUser(user): AuthenticatedUser,
    state: web::Data<AppState>,
) -> HttpResponse {
    tracing::debug!("User {} requested payment details", user.id);

    HttpResponse::Ok().json(PaymentInitiateResponse {
        token_address: state.config.chain.token_address.clone(),
        payment_contract_address: state.payments.payment_contract().to_string(),
        fixed_amount: state.payments.required_amount().to_string(),
    })
}

#[post("/confirm")]
pub async fn confirm(
    AuthenticatedUser(user): AuthenticatedUser,
    state: web::Data<AppState>,
    body: web::Json<ConfirmPaymentRequest>,
) -> Result<HttpResponse, ServiceError> {
    let confirmation = state.payments.verify_payment(&user, &body.tx_hash).await?;

    let message = if confirmation.already_confirmed {
        "Payment already confirmed"
    } else {
        "Payment confirmed"
    };

    Ok(HttpResponse::Ok().json(ConfirmPaymentResponse {
        success: true,
        status: PaymentStatus::Confirmed,
        message: Some(message.to_string()),
        payment: Some(PaymentSummary::from(&confirmation.payment)),
    }))
}

async fn confirmed_payment(user: &User, state: &AppState) -> Result<HttpResponse, ServiceError> {
    let payment = state.payments.confirmed_payment_for(user).await?;

    Ok(HttpResponse::Ok().json(PaymentStatusResponse {
        has_paid: payment.is_some(),
        payment: payment.as_ref().map(PaymentSummary::from),
    }))
}

#[get("/status")]
pub async fn status(
    AuthenticatedUser(user): AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServiceError> {
    confirmed_payment(&user, &state).await
}

// Same answer as /status, kept for clients that poll this path
#[get("/check")]
pub async fn check(
    AuthenticatedUser(user): AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServiceError> {
    confirmed_payment(&user, &state).await
}
