//! netrpc CLI Client
//!
//! Calls the demo HelloService on a netrpc server.

use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use netrpc::serialize::Serialization;
use netrpc::service::{HelloServiceClient, HELLO_SERVICE};
use netrpc::{ClientConfig, ProxyFactory};
use tracing_subscriber::{fmt, EnvFilter};

/// netrpc CLI
#[derive(Parser, Debug)]
#[command(name = "netrpc-cli")]
#[command(about = "CLI for the netrpc demo HelloService")]
struct Args {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "20820")]
    port: u16,

    /// Call timeout in ms (0 = wait indefinitely)
    #[arg(short, long, default_value = "3000")]
    timeout_ms: u64,

    /// Payload serializer
    #[arg(short, long, default_value = "bincode")]
    serializer: Serialization,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Call sayHello
    Hello {
        /// Name to greet
        name: String,
    },

    /// Call random
    Random,

    /// Keep the connection open without calls so heartbeats show in the log
    Idle {
        /// Seconds to stay connected
        secs: u64,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,netrpc=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let config = ClientConfig::builder()
        .host(&args.host)
        .port(args.port)
        .timeout_ms(args.timeout_ms)
        .serialization(args.serializer)
        .build();

    let factory = ProxyFactory::new();
    let proxy = match factory.register_client_stub(HELLO_SERVICE, &config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot connect to {}: {}", config.address(), e);
            std::process::exit(1);
        }
    };
    let hello = HelloServiceClient::new(proxy);

    let result = match args.command {
        Commands::Hello { name } => hello.say_hello(&name).map(|greeting| println!("{}", greeting)),
        Commands::Random => hello.random().map(|numbers| println!("{:?}", numbers)),
        Commands::Idle { secs } => {
            thread::sleep(Duration::from_secs(secs));
            println!("OK");
            Ok(())
        }
    };

    factory.close();

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
