use paperclip::actix::web;

use crate::handlers;

/// Fallback for requests none of the routes match
pub fn default_service() -> actix_web::Route {
    actix_web::web::route().to(handlers::not_found)
}

pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(
            web::resource("/get-by-isbn/{isbn}").route(web::get().to(handlers::get_by_isbn)),
        )
        .service(web::resource("/get-all-books").route(web::get().to(handlers::get_all_books)))
        .service(web::resource("/add-record").route(web::post().to(handlers::add_record)))
        .service(
            web::resource("/add-multiple-records")
                .route(web::post().to(handlers::add_multiple_records)),
        )
        .service(web::resource("/update-record").route(web::put().to(handlers::update_record)))
        .service(web::resource("/update-many").route(web::put().to(handlers::update_many)))
        .service(
            web::resource("/delete-record/{isbn}")
                .route(web::delete().to(handlers::delete_record)),
        )
        .service(web::resource("/delete-many").route(web::delete().to(handlers::delete_many)))
        .service(web::resource("/close").route(web::get().to(handlers::close)));
}
