use log::{error, info, LevelFilter};
use log4rs_dynamic_filters::DynamicLevelFilter;

#[rocket::main]
async fn main() {
    log4rs::init_file("log4rs.yaml", log4rs_dynamic_filters::default_deserializers())
        .expect("Failed to initialise logging");
    info!("Initialised logging");

    let result = async {
        let rocket = nirapod_vote::build().ignite().await?;
        // Our own fairing logs each request from here on.
        DynamicLevelFilter::set("rocket", LevelFilter::Off);
        rocket.launch().await
    }
    .await;

    if let Err(err) = result {
        error!("{err}");
        error!("Critical failure, shutting down");
        std::process::exit(1)
    }
}
