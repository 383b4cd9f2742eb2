use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jobmatch_client::config::Config;
use jobmatch_client::models::matches::EntityType;
use jobmatch_client::{
    Attachment, AttachmentSet, FieldFormState, FormKind, MatchingServiceClient, ServiceEndpoints,
    SubmissionClient, SubmissionOutcome, VisualizationLoader, VisualizationViewState,
};

#[derive(Parser)]
#[command(name = "jobmatch")]
#[command(about = "Submit job openings and seeker profiles to the matching service, and fetch similarity graphs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a job opening
    JobOpening(JobOpeningArgs),

    /// Upload a job seeker profile with documents
    JobSeeker(JobSeekerArgs),

    /// Fetch the similarity graph for an entity
    Visualize {
        /// Job or seeker ID returned by a previous submission
        entity_id: String,

        /// Where to save the image (defaults to keeping a temporary copy until exit)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List matches for an entity
    Matches {
        entity_id: String,

        #[arg(short = 't', long, value_enum)]
        entity_type: EntityArg,
    },
}

#[derive(Args)]
struct JobOpeningArgs {
    #[arg(long, default_value_t)]
    creator_email: String,
    #[arg(long, default_value_t)]
    job_title: String,
    #[arg(long, default_value_t)]
    company_name: String,
    #[arg(long, default_value_t)]
    job_description: String,
    #[arg(long, default_value_t)]
    company_values: String,
    #[arg(long, default_value_t)]
    team_structure: String,
    #[arg(long, default_value_t)]
    growth_opportunities: String,
}

#[derive(Args)]
struct JobSeekerArgs {
    #[arg(long, default_value_t)]
    email: String,
    #[arg(long, default_value_t)]
    linkedin_url: String,
    #[arg(long, default_value_t)]
    github_url: String,

    /// Resume file (required)
    #[arg(long)]
    resume: Option<PathBuf>,

    #[arg(long)]
    cover_letter: Option<PathBuf>,

    /// Certificate file; repeat for several, order is preserved
    #[arg(long = "certificate")]
    certificates: Vec<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum EntityArg {
    Seeker,
    Job,
}

impl From<EntityArg> for EntityType {
    fn from(arg: EntityArg) -> Self {
        match arg {
            EntityArg::Seeker => EntityType::Seeker,
            EntityArg::Job => EntityType::Job,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("jobmatch={0},jobmatch_client={0}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("jobmatch v{} using {}", env!("CARGO_PKG_VERSION"), config.base_url);

    let endpoints = ServiceEndpoints::new(config.base_url.clone())?;
    let service = Arc::new(MatchingServiceClient::new(endpoints, config.request_timeout)?);

    match cli.command {
        Commands::JobOpening(args) => {
            let form = job_opening_form(args)?;
            let submissions = SubmissionClient::new(service);
            let outcome = submissions.submit_job_opening(&form).await?;
            report(outcome, "Job ID")
        }
        Commands::JobSeeker(args) => {
            let (form, attachments) = job_seeker_form(args).await?;
            let submissions = SubmissionClient::new(service);
            let outcome = submissions.submit_job_seeker(&form, &attachments).await?;
            report(outcome, "Seeker ID")
        }
        Commands::Visualize { entity_id, output } => visualize(service, &entity_id, output).await,
        Commands::Matches {
            entity_id,
            entity_type,
        } => {
            let response = service.fetch_matches(&entity_id, entity_type.into()).await?;
            if response.matches.is_empty() {
                println!("No matches for {entity_id}");
            }
            for m in &response.matches {
                let label = match (&m.title, &m.company) {
                    (Some(title), Some(company)) => format!(" ({title} at {company})"),
                    _ => String::new(),
                };
                println!(
                    "{}{}  avg {:.2}  experience {:.2}  development {:.2}  personality {:.2}",
                    m.counterpart_id().unwrap_or("?"),
                    label,
                    m.average_score,
                    m.scores.experience,
                    m.scores.development,
                    m.scores.personality
                );
            }
            println!("Visualization: {}", response.visualization_url);
            Ok(())
        }
    }
}

fn job_opening_form(args: JobOpeningArgs) -> Result<FieldFormState> {
    Ok(FieldFormState::new(FormKind::JobOpening)
        .with("creator_email", args.creator_email)?
        .with("job_title", args.job_title)?
        .with("company_name", args.company_name)?
        .with("job_description", args.job_description)?
        .with("company_values", args.company_values)?
        .with("team_structure", args.team_structure)?
        .with("growth_opportunities", args.growth_opportunities)?)
}

async fn job_seeker_form(args: JobSeekerArgs) -> Result<(FieldFormState, AttachmentSet)> {
    let form = FieldFormState::new(FormKind::JobSeeker)
        .with("email", args.email)?
        .with("linkedin_url", args.linkedin_url)?
        .with("github_url", args.github_url)?;

    let mut attachments = AttachmentSet::new();
    if let Some(path) = args.resume {
        attachments.set_resume(read_attachment(&path).await?);
    }
    if let Some(path) = args.cover_letter {
        attachments.set_cover_letter(read_attachment(&path).await?);
    }
    for path in &args.certificates {
        attachments.add_certificate(read_attachment(path).await?);
    }
    Ok((form, attachments))
}

async fn read_attachment(path: &Path) -> Result<Attachment> {
    Attachment::from_path(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

fn report(outcome: SubmissionOutcome, id_label: &str) -> Result<()> {
    match outcome {
        SubmissionOutcome::Success { identifier } => {
            println!("{id_label}: {identifier}");
            Ok(())
        }
        SubmissionOutcome::Failure { reason } => bail!(reason),
    }
}

async fn visualize(
    service: Arc<MatchingServiceClient>,
    entity_id: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    if entity_id.trim().is_empty() {
        bail!("Entity ID is required");
    }

    let mut loader = VisualizationLoader::new(service);
    let mut state = loader.subscribe();

    println!("Loading visualization...");
    loader.load(entity_id);

    let settled = state
        .wait_for(VisualizationViewState::is_settled)
        .await
        .context("Visualization loader stopped unexpectedly")?;

    let (path, len) = match &*settled {
        VisualizationViewState::Ready { handle } => (handle.path().to_path_buf(), handle.len()),
        VisualizationViewState::Error { message } => bail!(message.clone()),
        other => bail!("Visualization ended in unexpected state {other:?}"),
    };
    drop(settled);

    match &output {
        Some(dest) => {
            let written = tokio::fs::copy(&path, dest)
                .await
                .with_context(|| format!("Failed to write {}", dest.display()))?;
            println!("Similarity graph saved to {} ({written} bytes)", dest.display());
        }
        None => println!(
            "Similarity graph ({len} bytes) at {} (removed on exit)",
            path.display()
        ),
    }
    Ok(())
}
