use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use job_tracker::api::ApiError;
use job_tracker::config::ClientConfig;
use job_tracker::models::{ApplicationUpdate, Credentials, NewApplication, NewUser};
use job_tracker::render::render_by_status;
use job_tracker::router::Route;
use job_tracker::store::FetchOptions;
use job_tracker::JobTracker;

#[derive(Parser)]
#[command(name = "jtc")]
#[command(about = "Track job applications and draft outreach emails")]
struct Cli {
    /// Backend base URL (overrides JOB_TRACKER_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Storage file (overrides JOB_TRACKER_STORAGE)
    #[arg(long, global = true)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and remember the session
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Manage job applications
    #[command(subcommand)]
    Apps(AppsCommand),
    /// Manage imported GitHub projects
    #[command(subcommand)]
    Github(GithubCommand),
}

#[derive(Subcommand)]
enum AppsCommand {
    /// List applications
    List {
        /// Print a tree grouped by status instead of JSON
        #[arg(long)]
        by_status: bool,
    },
    /// Show one application
    Show { id: String },
    /// Create an application from a LinkedIn job URL
    Create {
        #[arg(long)]
        url: String,
        #[command(flatten)]
        fields: ApplicationFields,
    },
    /// Update fields of an application
    Update {
        id: String,
        #[command(flatten)]
        fields: ApplicationFields,
    },
    /// Delete an application
    Delete { id: String },
    /// Generate an outreach email for an application
    Email {
        id: String,
        /// Project ids to mention (repeatable)
        #[arg(long = "project")]
        projects: Vec<String>,
        #[arg(long)]
        language: Option<String>,
    },
    /// Suggest projects that fit an application
    Suggest { id: String },
}

#[derive(Args)]
struct ApplicationFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    company: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Subcommand)]
enum GithubCommand {
    /// Set the GitHub username projects are fetched for
    Username { username: String },
    /// Import projects from GitHub
    Fetch {
        #[arg(long)]
        username: Option<String>,
        /// GitHub token for a higher rate limit
        #[arg(long)]
        token: Option<String>,
    },
    /// List imported projects
    List,
    /// Show the GitHub API quota
    RateLimit {
        #[arg(long)]
        token: Option<String>,
    },
}

/// Initialize tracing on stderr so stdout stays clean for JSON output
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "job_tracker=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

/// Attach the message the store recorded for a failed action.
fn failed(recorded: Option<String>, error: ApiError) -> anyhow::Error {
    let message = recorded.unwrap_or_else(|| "Request failed".to_string());
    anyhow::Error::new(error).context(message)
}

/// Enter `route` through the guard, refusing when it bounces to login.
fn require_session(tracker: &JobTracker, route: Route) -> anyhow::Result<()> {
    let navigator = tracker.navigator(route);
    if *navigator.current() == Route::Login {
        bail!("Not logged in. Run `jtc login` first.");
    }
    Ok(())
}

async fn run_apps(tracker: &JobTracker, command: AppsCommand) -> anyhow::Result<()> {
    let store = &tracker.applications;
    let recorded = || store.snapshot().error;

    match command {
        AppsCommand::List { by_status } => {
            require_session(tracker, Route::Applications)?;
            let applications = store.fetch_all().await.map_err(|e| failed(recorded(), e))?;
            if by_status {
                print!("{}", render_by_status(&store.applications_by_status()));
            } else {
                print_json(&applications)?;
            }
        }
        AppsCommand::Show { id } => {
            require_session(tracker, Route::EditApplication(id.clone()))?;
            let application = store.fetch_one(&id).await.map_err(|e| failed(recorded(), e))?;
            print_json(&application)?;
        }
        AppsCommand::Create { url, fields } => {
            require_session(tracker, Route::NewApplication)?;
            let mut input = NewApplication::new(url);
            input.title = fields.title;
            input.company = fields.company;
            input.location = fields.location;
            input.notes = fields.notes;
            if let Some(status) = fields.status {
                input.status = status;
            }
            let application = store.create(&input).await.map_err(|e| failed(recorded(), e))?;
            print_json(&application)?;
        }
        AppsCommand::Update { id, fields } => {
            require_session(tracker, Route::EditApplication(id.clone()))?;
            let input = ApplicationUpdate {
                title: fields.title,
                company: fields.company,
                location: fields.location,
                status: fields.status,
                notes: fields.notes,
                ..ApplicationUpdate::default()
            };
            let application = store
                .update(&id, &input)
                .await
                .map_err(|e| failed(recorded(), e))?;
            print_json(&application)?;
        }
        AppsCommand::Delete { id } => {
            require_session(tracker, Route::Applications)?;
            store.delete(&id).await.map_err(|e| failed(recorded(), e))?;
            tracing::info!("Deleted application {}", id);
        }
        AppsCommand::Email {
            id,
            projects,
            language,
        } => {
            require_session(tracker, Route::EditApplication(id.clone()))?;
            let email = store
                .generate_email(&id, projects, language.as_deref())
                .await
                .map_err(|e| failed(store.snapshot().email_error, e))?;
            println!("{}", email);
        }
        AppsCommand::Suggest { id } => {
            require_session(tracker, Route::EditApplication(id.clone()))?;
            let ids = store
                .suggest_projects(&id)
                .await
                .map_err(|e| failed(store.snapshot().suggestion_error, e))?;
            print_json(&ids)?;
        }
    }

    Ok(())
}

async fn run_github(tracker: &JobTracker, command: GithubCommand) -> anyhow::Result<()> {
    let store = &tracker.github;
    require_session(tracker, Route::GitHubProjects)?;

    match command {
        GithubCommand::Username { username } => {
            store.set_username(&username);
            tracing::info!("GitHub username set to {:?}", store.username());
        }
        GithubCommand::Fetch { username, token } => {
            let projects = store
                .fetch_projects(FetchOptions { username, token })
                .await
                .map_err(|e| failed(store.snapshot().error, e))?;
            if let Some(error) = store.snapshot().error {
                bail!(error);
            }
            print_json(&projects)?;
        }
        GithubCommand::List => {
            let projects = store
                .get_projects()
                .await
                .map_err(|e| failed(store.snapshot().error, e))?;
            if let Some(error) = store.snapshot().error {
                bail!(error);
            }
            print_json(&projects)?;
        }
        GithubCommand::RateLimit { token } => match store.get_rate_limit(token.as_deref()).await {
            Some(rate_limit) => print_json(&rate_limit)?,
            None => bail!("Rate limit information is unavailable"),
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = ClientConfig::from_env()
        .with_base_url(cli.base_url)
        .with_storage_path(cli.storage);
    let tracker = JobTracker::new(&config).context("Failed to open storage")?;
    let mut navigator = tracker.navigator(Route::Dashboard);

    match cli.command {
        Commands::Login { email, password } => {
            let user = tracker
                .auth
                .login(&Credentials { email, password })
                .await
                .map_err(|e| failed(tracker.auth.snapshot().error, e))?;
            print_json(&user)?;
        }
        Commands::Register {
            username,
            email,
            password,
        } => {
            let user = tracker
                .auth
                .register(&NewUser {
                    username,
                    email,
                    password,
                })
                .await
                .map_err(|e| failed(tracker.auth.snapshot().error, e))?;
            print_json(&user)?;
        }
        Commands::Logout => tracker.auth.logout(),
        Commands::Whoami => match tracker
            .auth
            .fetch_user()
            .await
            .map_err(|e| failed(tracker.auth.snapshot().error, e))?
        {
            Some(user) => print_json(&user)?,
            None => bail!("Not logged in. Run `jtc login` first."),
        },
        Commands::Apps(command) => run_apps(&tracker, command).await?,
        Commands::Github(command) => run_github(&tracker, command).await?,
    }

    let route = navigator.sync();
    tracing::debug!("Current view: {} ({})", route, route.path());

    Ok(())
}
