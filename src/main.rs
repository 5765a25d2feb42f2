use rehab_goals::config::AppConfig;

#[tokio::main]
async fn main() {
    rehab_goals::init_tracing();

    if let Err(e) = rehab_goals::run(AppConfig::from_env()).await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
