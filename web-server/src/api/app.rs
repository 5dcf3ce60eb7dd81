// web-server/src/api/app.rs
use actix_web::{get, HttpResponse};
use common::{AppAccessResponse, PaymentSummary};

use crate::gate::PaidUser;

// The gated app itself: only reachable with a session and a confirmed payment
#[get("/app")]
pub async fn app(PaidUser { user, payment }: PaidUser) -> HttpResponse {
    HttpResponse::Ok().json(AppAccessResponse {
        address: user.address,
        has_access: user.has_access,
        payment: Some(PaymentSummary::from(&payment)),
    })
}
