use actix_web::{self, middleware::Logger, App, HttpServer};
use dotenv::dotenv;
use log::{log, Level};
use vecino_incidents::app::{configure_app, get_app_data, BIND_ADDR, PORT};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();
    let app_data = get_app_data().await;
    log!(Level::Info, "Listening on {}:{}", *BIND_ADDR, *PORT);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::new(
                "%a \"%r\" %s %b \"%{Referer}i\" \"%{User-Agent}i\" %T",
            ))
            .configure(configure_app)
            .app_data(app_data.clone())
    })
    .bind((BIND_ADDR.as_str(), *PORT))?
    .run()
    .await
}
