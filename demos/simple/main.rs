use prefinery::{ClientConfig, Settings, TesterRepository};

pub fn main() {
    env_logger::init();

    let settings_path =
        std::env::var("PREFINERY_SETTINGS").unwrap_or_else(|_| "prefinery.json".to_owned());
    let settings = Settings::from_path(&settings_path).unwrap();
    let client = ClientConfig::from_settings(settings).to_client();

    for beta in client.betas() {
        println!("Beta {} ({})", beta.id(), beta.name().unwrap_or("unnamed"));

        // Testers are parsed lazily while iterating.
        for tester in beta.get_testers().unwrap() {
            let tester = tester.unwrap();
            println!(
                "  {:>6} {:<30} {}",
                tester.id().unwrap_or_default(),
                tester.email,
                tester.status
            );
        }
    }
}
