pub mod bookings;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod payouts;
pub mod reviews;
pub mod routes;
pub mod stats;
pub mod support;
pub mod transactions;
pub mod users;

use lingualink_auth::JwtService;

use crate::bookings::BookingService;
use crate::config::AppConfig;
use crate::payouts::PayoutService;
use crate::reviews::ReviewService;
use crate::stats::StatsService;
use crate::support::SupportService;
use crate::transactions::TransactionService;
use crate::users::UserService;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db_pool: sqlx::PgPool,
    pub jwt_service: JwtService,
    pub user_service: UserService,
    pub booking_service: BookingService,
    pub payout_service: PayoutService,
    pub transaction_service: TransactionService,
    pub review_service: ReviewService,
    pub stats_service: StatsService,
    pub support_service: SupportService,
}

impl AppState {
    pub fn new(config: AppConfig, db_pool: sqlx::PgPool) -> Self {
        let jwt_service = JwtService::new(&config.jwt.secret);

        Self {
            user_service: UserService::new(db_pool.clone(), jwt_service.clone(), config.clone()),
            booking_service: BookingService::new(db_pool.clone(), config.platform.fee_rate),
            payout_service: PayoutService::new(
                db_pool.clone(),
                config.platform.payout_method.clone(),
            ),
            transaction_service: TransactionService::new(db_pool.clone()),
            review_service: ReviewService::new(db_pool.clone()),
            stats_service: StatsService::new(db_pool.clone()),
            support_service: SupportService::new(db_pool.clone()),
            jwt_service,
            db_pool,
            config,
        }
    }
}
