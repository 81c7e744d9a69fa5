//! Schema management CLI for the Courier database.

use clap::{Parser, Subcommand};
use courier_server::{config, startup};

/// Apply or inspect Courier database migrations.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file naming the database. `DATABASE_URL` still wins.
    #[arg(long, env = "COURIER_CONFIG_PATH", default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upgrade the database to the newest migration.
    Up,
    /// List every migration and whether it has been applied.
    Status,
}

fn main() {
    let cli = Cli::parse();

    let config = config::load_config(Some(&cli.config)).expect("failed to load configuration");
    startup::init_tracing(&config.logging);

    let pool = startup::open_pool(&config.database)
        .expect("failed to open database; check database.url or DATABASE_URL");

    match cli.command {
        Commands::Up => {
            let applied =
                startup::migrate_to_head(&pool).expect("failed to run database migrations");
            println!(
                "applied {} migration(s); database is at {}",
                applied,
                courier_db::head()
            );
        }
        Commands::Status => {
            let conn = pool.get().expect("failed to get database connection");
            let statuses =
                courier_db::migration_status(&conn).expect("failed to read migration state");
            for status in statuses {
                match status.applied_at {
                    Some(applied_at) => println!("applied  {}  {}", status.name, applied_at),
                    None => println!("pending  {}", status.name),
                }
            }
        }
    }
}
