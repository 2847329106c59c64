use clap::Parser;
use ragchat::cli::handlers::AskOptions;
use ragchat::cli::print_error;
use ragchat::cli::Cli;
use ragchat::cli::Commands;
use ragchat::cli::DocsCommands;
use ragchat::cli::UserCommands;
use ragchat::cli::{
    self,
};
use ragchat::AppConfig;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // `ask` is a plain HTTP client and runs without a server config file
    let config = if cli.command.needs_config() {
        Some(AppConfig::load()?)
    } else {
        None
    };

    match (&config, cli.verbose) {
        (_, true) => ragchat::logging::init_logging_with_level("debug")?,
        (Some(config), false) => ragchat::logging::init_logging_with_config(config)?,
        (None, false) => ragchat::logging::init_logging_with_level("warn")?,
    }

    let result = match config {
        Some(config) => {
            info!("Configuration loaded successfully");
            run(cli.command, &config).await
        }
        None => run_client(cli.command).await,
    };

    if let Err(e) = result {
        print_error(&e.to_string());
        std::process::exit(1);
    }

    Ok(())
}

async fn run(command: Commands, config: &AppConfig) -> ragchat::Result<()> {
    match command {
        Commands::Init { vector_index_lists } => {
            cli::handle_init_command(config, vector_index_lists).await
        }
        Commands::Serve { host, port, cors } => {
            cli::handle_serve_api(config, host, port, cors).await
        }
        Commands::User(UserCommands::Create { name }) => {
            cli::handle_user_create(config, &name).await
        }
        Commands::User(UserCommands::List) => cli::handle_user_list(config).await,
        Commands::Ingest {
            path,
            user,
            title,
            skip_embeddings,
        } => cli::handle_ingest(config, &path, user, title, skip_embeddings).await,
        Commands::Docs(DocsCommands::List { user }) => cli::handle_docs_list(config, user).await,
        Commands::Docs(DocsCommands::Delete { id, user }) => {
            cli::handle_docs_delete(config, user, id).await
        }
        Commands::Docs(DocsCommands::Stats { user }) => cli::handle_docs_stats(config, user).await,
        Commands::Embed { user } => cli::handle_embed(config, user).await,
        Commands::Ask { .. } => run_client(command).await,
        Commands::Config => cli::handle_config_command(config).await,
    }
}

async fn run_client(command: Commands) -> ragchat::Result<()> {
    match command {
        Commands::Ask {
            question,
            server,
            token,
            conversation,
            sources,
        } => {
            cli::handle_ask(
                &question,
                AskOptions {
                    server,
                    token,
                    conversation,
                    show_sources: sources,
                },
            )
            .await
        }
        _ => Err(ragchat::RagChatError::Custom(
            "command requires a configuration file".to_string(),
        )),
    }
}
