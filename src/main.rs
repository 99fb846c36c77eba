use std::time::Instant;

use clap::{Args, Parser, Subcommand};

use dotenv::dotenv;

use log::{debug, error, info};
use modelkit::{params, repo, utils::print};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
/// Modelkit command-line-interface
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Args, Debug)]
struct CommandDb {
    /// Logical name of the database
    #[arg(long, default_value = repo::DEFAULT_DATABASE)]
    db: String,
}

#[derive(Args, Debug)]
struct CommandSql {
    #[command(flatten)]
    target: CommandDb,

    /// SQL text, sent to the database as is
    sql: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the configured databases
    Databases,
    /// Open and commit an empty transaction, reporting the round trip time
    Ping(CommandDb),
    /// Run a statement in a committed transaction
    Exec(CommandSql),
    /// Run a read-only query and print every row as JSON
    Query(CommandSql),
}

fn init_logger() {
    env_logger::builder().format_target(true).init();
}

/// Load the defined env variables from the system and declare every configured
/// database.
fn load_engines() -> Result<repo::Engines, Box<dyn std::error::Error>> {
    info!("Loading .env file");
    dotenv().ok();

    params::load_configurables_from_env();
    let configurables = params::configurables();
    debug!("{:#?}", configurables);

    let urls = params::database_urls_from_env()?;
    if urls.is_empty() {
        return Err(params::Error::MissingVar(params::ENV_DATABASE_URL.to_string()).into());
    }

    let engines = urls.into_iter().fold(repo::Engines::new(), |engines, (name, url)| {
        debug!("declaring database `{}`", name);
        engines.with_database(
            name,
            repo::Config::new(url)
                .with_max_connections(configurables.max_connections)
                .with_create_if_missing(configurables.create_if_missing),
        )
    });

    Ok(engines)
}

async fn ping(engines: &repo::Engines, database: &str) -> Result<(), repo::Error> {
    let start = Instant::now();
    repo::scoped(engines, database, repo::Commit::Yes, async |_| {
        Ok::<_, repo::Error>(())
    })
    .await?;
    print::print_ping(database, start.elapsed());
    Ok(())
}

async fn exec(engines: &repo::Engines, database: &str, sql: &str) -> Result<(), repo::Error> {
    let affected = repo::scoped(engines, database, repo::Commit::Yes, async |s| {
        repo::raw_execute(s, sql).await
    })
    .await?;
    print::print_affected(database, affected);
    Ok(())
}

async fn query(
    engines: &repo::Engines,
    database: &str,
    sql: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let records = repo::scoped(engines, database, repo::Commit::No, async |s| {
        repo::raw_fetch(s, sql).await
    })
    .await?;
    for record in records {
        println!("{}", serde_json::to_string(&record)?);
    }
    Ok(())
}

fn run(startup_time: &Instant) -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    init_logger();

    let engines = load_engines()?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(async {
        let res: Result<(), Box<dyn std::error::Error>> = match args.cmd {
            Commands::Databases => {
                let databases: Vec<(String, String)> = engines
                    .databases()
                    .map(|(name, config)| (name.to_string(), config.db_url.to_string()))
                    .collect();
                print::print_startup_info(&get_version(), &databases, startup_time);
                Ok(())
            }
            Commands::Ping(args) => ping(&engines, &args.db).await.map_err(Into::into),
            Commands::Exec(args) => exec(&engines, &args.target.db, &args.sql)
                .await
                .map_err(Into::into),
            Commands::Query(args) => query(&engines, &args.target.db, &args.sql).await,
        };

        engines.close().await;
        res
    })
}

fn get_version() -> String {
    if cfg!(debug_assertions) {
        "devel".to_string()
    } else {
        env!("CARGO_PKG_VERSION").to_string()
    }
}

use colored::Colorize;

fn main() {
    let startup_time = Instant::now();

    let res = run(&startup_time);

    match res {
        Ok(_) => println!("\n{}\n", "All done. Bye!".dimmed()),
        Err(e) => error!("{}", e),
    }
}
