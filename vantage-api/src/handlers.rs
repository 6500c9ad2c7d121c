use std::net::IpAddr;
use std::net::SocketAddr;

use axum::Json;
use axum::extract::ConnectInfo;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use vantage_ledger::NewTransaction;
use vantage_ratelimit::Bucket;
use vantage_subscription::Clock;

use crate::dto::AnomalyView;
use crate::dto::AuthResponse;
use crate::dto::BreakdownRow;
use crate::dto::CreateTransactionRequest;
use crate::dto::LoginRequest;
use crate::dto::MeResponse;
use crate::dto::MessageResponse;
use crate::dto::PnLReportView;
use crate::dto::RegisterRequest;
use crate::dto::StartTrialResponse;
use crate::dto::SubscriptionStatusResponse;
use crate::dto::TransactionView;
use crate::dto::subscription_status_str;
use crate::dto::tier_str;
use crate::error::ApiError;
use crate::middleware::AuthContext;
use crate::state::ApiState;

fn client_ip(addr: ConnectInfo<SocketAddr>) -> IpAddr {
    addr.0.ip()
}

pub async fn register<C: Clock + 'static>(
    State(state): State<ApiState<C>>,
    addr: ConnectInfo<SocketAddr>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    if !state.rate_limiter.try_consume(client_ip(addr), Bucket::Register) {
        return Err(ApiError::RateLimited);
    }

    let result = state
        .auth
        .register(&payload.email, &payload.password, &payload.company_name)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token: result.token,
            company_id: result.company_id,
            email: payload.email.trim().to_ascii_lowercase(),
            subscription_status: subscription_status_str(result.subscription.status),
            trial_days_remaining: result.subscription.trial_days_remaining,
            ai_chats_remaining: result.subscription.ai_chats_remaining,
        }),
    ))
}

pub async fn login<C: Clock + 'static>(
    State(state): State<ApiState<C>>,
    addr: ConnectInfo<SocketAddr>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if !state.rate_limiter.try_consume(client_ip(addr), Bucket::Login) {
        return Err(ApiError::RateLimited);
    }

    let result = state.auth.login(&payload.email, &payload.password).await?;

    Ok(Json(AuthResponse {
        token: result.token,
        company_id: result.company_id,
        email: payload.email.trim().to_ascii_lowercase(),
        subscription_status: subscription_status_str(result.subscription.status),
        trial_days_remaining: result.subscription.trial_days_remaining,
        ai_chats_remaining: result.subscription.ai_chats_remaining,
    }))
}

pub async fn logout<C: Clock + 'static>(
    State(state): State<ApiState<C>>,
    ctx: AuthContext,
) -> Json<MessageResponse> {
    state.auth.logout(&ctx.token).await;
    Json(MessageResponse {
        message: "logged out".to_string(),
    })
}

pub async fn me(ctx: AuthContext) -> Json<MeResponse> {
    Json(MeResponse {
        email: ctx.user.email,
        company_id: ctx.company_id,
    })
}

pub async fn start_trial<C: Clock + 'static>(
    State(state): State<ApiState<C>>,
    ctx: AuthContext,
) -> Result<Json<StartTrialResponse>, ApiError> {
    let mut user = ctx.user;
    state.subscriptions.start_trial(&mut user.subscription)?;
    let user = state.credentials.save_user(user).await?;

    Ok(Json(StartTrialResponse {
        tier: tier_str(state.subscriptions.effective_tier(&user.subscription)),
        trial_days_remaining: state.subscriptions.trial_days_remaining(&user.subscription),
        ai_chats_remaining: state.subscriptions.ai_chats_remaining(&user.subscription),
    }))
}

pub async fn subscription_status<C: Clock + 'static>(
    State(state): State<ApiState<C>>,
    ctx: AuthContext,
) -> Json<SubscriptionStatusResponse> {
    let sub = &ctx.user.subscription;
    Json(SubscriptionStatusResponse {
        tier: tier_str(state.subscriptions.effective_tier(sub)),
        status: subscription_status_str(sub.status),
        trial_days_remaining: state.subscriptions.trial_days_remaining(sub),
        ai_chats_remaining: state.subscriptions.ai_chats_remaining(sub),
        ai_chat_daily_limit: state.subscriptions.quota_limit(sub),
        has_premium_access: state.subscriptions.has_premium_access(sub),
        trial_already_used: sub.trial_started_at.is_some(),
    })
}

async fn transaction_view<C: Clock + 'static>(
    state: &ApiState<C>,
    transaction: vantage_ledger::Transaction,
) -> Result<TransactionView, ApiError> {
    let category_name = match &transaction.category_id {
        Some(id) => state.ledger.find_category(id).await?.map(|category| category.name),
        None => None,
    };
    Ok(TransactionView {
        id: transaction.id,
        date: transaction.date,
        amount: transaction.amount,
        description: transaction.description,
        category_name,
    })
}

pub async fn list_transactions<C: Clock + 'static>(
    State(state): State<ApiState<C>>,
    Path(company_id): Path<String>,
) -> Result<Json<Vec<TransactionView>>, ApiError> {
    let transactions = state.transactions.list(&company_id).await?;
    let mut views = Vec::with_capacity(transactions.len());
    for transaction in transactions {
        views.push(transaction_view(&state, transaction).await?);
    }
    Ok(Json(views))
}

pub async fn create_transaction<C: Clock + 'static>(
    State(state): State<ApiState<C>>,
    Path(company_id): Path<String>,
    Json(payload): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<TransactionView>), ApiError> {
    let transaction = state
        .transactions
        .create(NewTransaction {
            company_id,
            date: payload.date,
            amount: payload.amount,
            description: payload.description,
            category_id: None,
        })
        .await?;
    let view = transaction_view(&state, transaction).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn delete_transaction<C: Clock + 'static>(
    State(state): State<ApiState<C>>,
    Path((company_id, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.transactions.delete(&company_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_pnl<C: Clock + 'static>(
    State(state): State<ApiState<C>>,
    Path(company_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<PnLReportView>, ApiError> {
    let period = params.get("period").cloned().unwrap_or_else(|| "month".to_string());
    let today = Utc::now().date_naive();
    let (start, end) = vantage_reporting::resolve_period(&period, today);
    let report = state.reporting.pnl(&company_id, &period, today).await?;

    Ok(Json(PnLReportView {
        period,
        start_date: start,
        end_date: end,
        total_income: report.income,
        total_expense: report.expense,
        net_profit: report.net,
        breakdown: report.categories.into_iter().map(BreakdownRow::from).collect(),
    }))
}

pub async fn list_anomalies<C: Clock + 'static>(
    State(state): State<ApiState<C>>,
    Path(company_id): Path<String>,
) -> Result<Json<Vec<AnomalyView>>, ApiError> {
    let anomalies = state.anomalies.list(&company_id).await?;
    Ok(Json(anomalies.into_iter().map(AnomalyView::from).collect()))
}

pub async fn dismiss_anomaly<C: Clock + 'static>(
    State(state): State<ApiState<C>>,
    Path((company_id, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.anomalies.dismiss(&company_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
