use crate::demo::{run_demo, DemoArgs};
use crate::infra::{open_backend, Backend};
use crate::server;
use clap::{Args, Parser, Subcommand};
use connxt::config::AppConfig;
use connxt::error::AppError;
use connxt::workflows::board::{BoardStore, JobBoardService};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "ConnXt",
    about = "Run and administer the ConnXt student job board",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Manage user accounts in the configured database
    Users {
        #[command(subcommand)]
        command: UsersCommand,
    },
    /// Walk through posting, moderation, applications and notifications in memory
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum UsersCommand {
    /// Create an account
    Create(CreateUserArgs),
    /// List every account
    List(StorageArgs),
}

#[derive(Args, Debug)]
struct CreateUserArgs {
    /// Login name of the new account
    username: String,
    /// Grant admin rights (job moderation, every application)
    #[arg(long)]
    superuser: bool,
    #[command(flatten)]
    storage: StorageArgs,
}

#[derive(Args, Debug, Default)]
pub(crate) struct StorageArgs {
    /// Override the configured database path (`:memory:` for a throwaway store)
    #[arg(long)]
    pub(crate) database: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    #[command(flatten)]
    pub(crate) storage: StorageArgs,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Users { command } => run_users(command),
        Command::Demo(args) => run_demo(args),
    }
}

fn run_users(command: UsersCommand) -> Result<(), AppError> {
    let storage = match &command {
        UsersCommand::Create(args) => &args.storage,
        UsersCommand::List(args) => args,
    };
    let mut config = AppConfig::load()?;
    if let Some(database) = storage.database.clone() {
        config.storage.database_path = database;
    }

    match open_backend(&config.storage)? {
        Backend::Memory(store) => users_command(command, store, &config),
        Backend::Sqlite(store) => users_command(command, store, &config),
    }
}

fn users_command<S>(command: UsersCommand, store: Arc<S>, config: &AppConfig) -> Result<(), AppError>
where
    S: BoardStore + 'static,
{
    let service = JobBoardService::new(store.clone(), config.board);
    match command {
        UsersCommand::Create(args) => {
            let user = if args.superuser {
                service.ensure_superuser(&args.username)?
            } else {
                service.register_user(&args.username, false)?
            };
            println!(
                "Created {} (id {}){}",
                user.username,
                user.id,
                if user.is_superuser { " as superuser" } else { "" }
            );
        }
        UsersCommand::List(_) => {
            let users = store.users()?;
            if users.is_empty() {
                println!("No users in {}", config.storage.database_path.display());
            }
            for user in users {
                let role = if user.is_superuser { "superuser" } else { "member" };
                println!("{:>5}  {:<24} {role}", user.id.0, user.username);
            }
        }
    }
    Ok(())
}
