use crate::{
    api::{departamentos, marcadas, personal, query_config, usuarios},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

/// Per peer IP limiter allowing `requests_per_min` with an equal burst
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond((60_000 / requests_per_min as u64).max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_else(GovernorConfig::default);
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    cfg.app_data(query_config());

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter)
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(handlers::me)
            .service(
                web::scope("/marcadas")
                    // /marcadas
                    .service(web::resource("").route(web::get().to(marcadas::get_marcadas)))
                    // /marcadas/entre-fechas
                    .service(
                        web::resource("/entre-fechas")
                            .route(web::get().to(marcadas::get_marcadas_entre_fechas)),
                    )
                    // /marcadas/planilla
                    .service(
                        web::resource("/planilla").route(web::get().to(marcadas::get_planilla)),
                    )
                    // /marcadas/parte
                    .service(web::resource("/parte").route(web::get().to(marcadas::get_parte))),
            )
            .service(
                web::scope("/personal")
                    // /personal
                    .service(
                        web::resource("")
                            .route(web::get().to(personal::list_personal))
                            .route(web::post().to(personal::create_personal)),
                    )
                    // /personal/{uid}
                    .service(
                        web::resource("/{uid}")
                            .route(web::get().to(personal::get_personal))
                            .route(web::put().to(personal::update_personal)),
                    ),
            )
            .service(
                web::scope("/departamentos")
                    // /departamentos
                    .service(
                        web::resource("")
                            .route(web::get().to(departamentos::list_departamentos))
                            .route(web::put().to(departamentos::update_departamento)),
                    )
                    // /departamentos/{id}/sello
                    .service(
                        web::resource("/{id}/sello")
                            .route(web::get().to(departamentos::get_sello))
                            .route(web::put().to(departamentos::set_sello)),
                    )
                    // /departamentos/{name}
                    .service(
                        web::resource("/{name}")
                            .route(web::get().to(departamentos::get_departamento)),
                    ),
            )
            .service(
                web::scope("/usuarios")
                    // /usuarios
                    .service(
                        web::resource("")
                            .route(web::get().to(usuarios::list_usuarios))
                            .route(web::post().to(usuarios::create_usuario)),
                    )
                    // /usuarios/{username}/departamentos
                    .service(
                        web::resource("/{username}/departamentos")
                            .route(web::put().to(usuarios::set_departamentos)),
                    )
                    // /usuarios/{username}
                    .service(
                        web::resource("/{username}")
                            .route(web::put().to(usuarios::update_usuario))
                            .route(web::delete().to(usuarios::delete_usuario)),
                    ),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{lazy_pool, usuarios};
    use actix_web::{App, http::StatusCode, test};

    #[actix_web::test]
    async fn test_protected_scope_requires_token() {
        let config = Config::for_tests();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config.clone()))
                .app_data(web::Data::new(lazy_pool()))
                .app_data(usuarios())
                .configure(|cfg| configure(cfg, config.clone())),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/departamentos")
            .peer_addr("127.0.0.1:40000".parse().unwrap())
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
