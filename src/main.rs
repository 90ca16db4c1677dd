use vendor_catalog_preview::{
    configuration::get_configuration,
    startup::Application,
    telemetry::{get_json_subscriber, init_subscriber},
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let subscriber =
        get_json_subscriber("vendor-catalog-preview".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let configuration = get_configuration().expect("Failed to read configuration.");
    let application = Application::build(configuration).await?;
    application.run_until_stopped().await?;
    Ok(())
}
