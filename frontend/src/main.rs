use log::{error, info};
use marketing_frontend::{config, web};

fn main() {
    // Initialize console error panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize logging
    console_log::init_with_level(config::log_level()).expect("error initializing log");

    info!("Starting page behaviors");
    if let Err(err) = web::boot() {
        error!("could not start page behaviors: {}", err);
    }
}
