use actix_web::{middleware::Logger, web, App, HttpServer};
use chrono::Local;
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use accounts_backend::{
    config::Config,
    database::{clone_conn, create_pool, run_migrations},
    external::{KakaoClient, MessagingClient, PaymentsClient, PlatformClient, SmsClient},
    handlers,
    middlewares::{cors, Auth},
    services::*,
    tasks::{self, TaskContext},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration file");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // External clients
    let payments = PaymentsClient::new(config.payments.clone());
    let platform = PlatformClient::new(config.platform.clone());
    let sms = SmsClient::new(config.sms.clone());
    let kakao = KakaoClient::new();
    let messaging = MessagingClient::new(config.messaging.clone());

    // Domain services
    let phone_service = PhoneService::new(clone_conn(&pool), sms, config.phone.bypass_code.clone());
    let license_service = LicenseService::new(clone_conn(&pool), platform);
    let method_service = MethodService::new(clone_conn(&pool), kakao);
    let session_service = SessionService::new(clone_conn(&pool));
    let user_service = UserService::new(
        clone_conn(&pool),
        phone_service.clone(),
        license_service.clone(),
        method_service.clone(),
        session_service.clone(),
    );
    let point_service = PointService::new(clone_conn(&pool));
    let level_service = LevelService::new(clone_conn(&pool), payments.clone(), point_service.clone());
    let coupon_service = CouponService::new(payments.clone());
    let pass_service = PassService::new(clone_conn(&pool), payments.clone());
    let pass_program_service = PassProgramService::new(clone_conn(&pool), pass_service.clone());
    let notification_service =
        NotificationService::new(clone_conn(&pool), messaging, session_service.clone());
    let referral_service = ReferralService::new(
        clone_conn(&pool),
        coupon_service.clone(),
        notification_service.clone(),
        config.referral.coupon_group_id.clone(),
    );
    let centercoin_service = CentercoinService::new(clone_conn(&pool), notification_service.clone());

    tasks::spawn_all(
        TaskContext {
            db: clone_conn(&pool),
            users: user_service.clone(),
            passes: pass_service.clone(),
            levels: level_service.clone(),
            notifications: notification_service.clone(),
        },
        &config.scheduler,
    );

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let internal_config = config.internal.clone();
    let pool_data = web::Data::new(clone_conn(&pool));
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(cors())
            .wrap(Auth::new(session_service.clone(), internal_config.clone()))
            .app_data(pool_data.clone())
            .app_data(web::Data::new(phone_service.clone()))
            .app_data(web::Data::new(license_service.clone()))
            .app_data(web::Data::new(method_service.clone()))
            .app_data(web::Data::new(session_service.clone()))
            .app_data(web::Data::new(user_service.clone()))
            .app_data(web::Data::new(point_service.clone()))
            .app_data(web::Data::new(level_service.clone()))
            .app_data(web::Data::new(coupon_service.clone()))
            .app_data(web::Data::new(pass_service.clone()))
            .app_data(web::Data::new(pass_program_service.clone()))
            .app_data(web::Data::new(notification_service.clone()))
            .app_data(web::Data::new(referral_service.clone()))
            .app_data(web::Data::new(centercoin_service.clone()))
            .configure(handlers::auth_config)
            .configure(handlers::methods_config)
            .configure(handlers::license_config)
            .configure(handlers::coupons_config)
            .configure(handlers::passes_config)
            .configure(handlers::points_config)
            .configure(handlers::referral_config)
            .configure(handlers::notifications_config)
            .configure(handlers::internal_config)
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
