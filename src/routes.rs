use crate::{
    api::{attendance, directory, leave, policy, regularization},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let attendance_limiter = Arc::new(build_limiter(config.rate_attendance_per_min));
    let admin_limiter = Arc::new(build_limiter(config.rate_admin_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(protected_limiter)
            .service(
                web::scope("/attendance")
                    .service(
                        web::resource("/check-in")
                            .wrap(attendance_limiter.clone())
                            .route(web::post().to(attendance::check_in)),
                    )
                    .service(
                        web::resource("/check-out")
                            .wrap(attendance_limiter.clone())
                            .route(web::post().to(attendance::check_out)),
                    )
                    .service(web::resource("/report").route(web::get().to(attendance::report))),
            )
            .service(
                web::scope("/policy")
                    // /policy
                    .service(
                        web::resource("")
                            .wrap(admin_limiter.clone())
                            .route(web::post().to(policy::create_policy))
                            .route(web::get().to(policy::list_policies)),
                    )
                    // /policy/assign
                    .service(
                        web::resource("/assign")
                            .wrap(admin_limiter.clone())
                            .route(web::post().to(policy::assign_policy)),
                    ),
            )
            .service(
                web::scope("/regularization")
                    .service(web::resource("").route(web::post().to(regularization::submit)))
                    .service(
                        web::resource("/pending").route(web::get().to(regularization::pending)),
                    )
                    .service(
                        web::resource("/{id}/decision")
                            .route(web::post().to(regularization::decide)),
                    ),
            )
            .service(
                web::scope("/leave")
                    .service(web::resource("/request").route(web::post().to(leave::request_leave)))
                    .service(
                        web::resource("/request/{id}/approve")
                            .route(web::put().to(leave::approve_leave)),
                    )
                    .service(
                        web::resource("/request/{id}/reject")
                            .route(web::put().to(leave::reject_leave)),
                    )
                    .service(
                        web::resource("/balance/{employee_id}")
                            .route(web::get().to(leave::balance)),
                    ),
            )
            .service(
                web::scope("/directory").service(
                    web::resource("")
                        .wrap(admin_limiter.clone())
                        .route(web::post().to(directory::upsert_entry)),
                ),
            ),
    );
}
