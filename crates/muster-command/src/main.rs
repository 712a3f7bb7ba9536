use clap::{Parser, Subcommand};
use muster_client::{ClientError, RegistryClient};
use muster_core::{DEFAULT_SERVICES_URL, Registration, ServiceName};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "muster")]
#[command(about = "Service registry administrative CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Registry `/services` URL
    #[arg(long, env = "MUSTER_REGISTRY_URL", default_value = DEFAULT_SERVICES_URL)]
    registry: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a service instance
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        url: String,
        /// Service names this instance depends on
        #[arg(long = "requires")]
        requires: Vec<String>,
        #[arg(long)]
        update_url: Option<String>,
        #[arg(long)]
        heartbeat_url: Option<String>,
    },
    /// Deregister the instance at a URL
    Deregister {
        #[arg(long)]
        url: String,
    },
    /// List registered instances
    List {
        #[arg(long)]
        name: Option<String>,
    },
    /// Show the most recently registered instance of a service
    Resolve {
        #[arg(long)]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let client = RegistryClient::new(cli.registry);

    match cli.command {
        Commands::Register { name, url, requires, update_url, heartbeat_url } => {
            let mut registration = requires
                .into_iter()
                .fold(Registration::new(name, url.clone()), |reg, dep| reg.requires(dep));
            if let Some(update_url) = update_url {
                registration = registration.with_update_url(update_url);
            }
            if let Some(heartbeat_url) = heartbeat_url {
                registration = registration.with_heartbeat_url(heartbeat_url);
            }
            client.register(&registration).await?;
            println!("Service registered: {}", url);
        }
        Commands::Deregister { url } => {
            client.deregister(&url).await?;
            println!("Service deregistered: {}", url);
        }
        Commands::List { name } => {
            let name = name.map(ServiceName::from);
            let registrations = client.list().await?;
            println!("{:<20} {:<30} {:<30}", "Service", "URL", "Requires");
            println!("{}", "-".repeat(80));
            for reg in registrations
                .iter()
                .filter(|reg| name.as_ref().is_none_or(|n| &reg.service_name == n))
            {
                let requires: Vec<&str> = reg.required_services.iter().map(ServiceName::as_str).collect();
                println!("{:<20} {:<30} {:<30}", reg.service_name, reg.service_url, requires.join(","));
            }
        }
        Commands::Resolve { name } => {
            let name = ServiceName::from(name);
            let url = client
                .list()
                .await?
                .into_iter()
                .rev()
                .find(|reg| reg.service_name == name)
                .map(|reg| reg.service_url)
                .ok_or(ClientError::NoProvider(name))?;
            println!("{}", url);
        }
    }

    Ok(())
}
