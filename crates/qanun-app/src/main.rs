//! Qanun application binary - composition root.
//!
//! Ties together all Qanun crates into a single console chat:
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Read API credentials from the environment (fail fast)
//! 3. Initialize storage (JSON files or in-memory)
//! 4. Build the completion client, search client, and orchestrator
//! 5. Run the interactive chat loop on stdin/stdout

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::AsyncBufReadExt;

use qanun_core::config::{Credentials, QanunConfig};
use qanun_core::types::{Intent, Role, UserProfile};
use qanun_core::QanunError;
use qanun_pipeline::{AnswerOrchestrator, GoogleCseSearch, OpenAiClient, SourceSearch};
use qanun_store::{ChatStore, JsonFileBackend, MemoryBackend, NewUser, StorageBackend, UserStore};

mod cli;
use cli::CliArgs;

/// Shown when an unrecovered pipeline error reaches the console boundary.
const GENERIC_FAILURE_MESSAGE: &str = "Xəta baş verdi, zəhmət olmasa yenidən cəhd edin.";

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

/// Find or register the local console account.
async fn ensure_console_user(users: &UserStore) -> Result<UserProfile, QanunError> {
    if let Some(existing) = users.find_by_username("console").await? {
        return Ok(existing.profile());
    }
    let profile = users
        .register(NewUser {
            username: "console".to_string(),
            email: "console@qanun.local".to_string(),
            // Local account, never logged into with a password.
            password_hash: "!".to_string(),
            name: Some("Konsol".to_string()),
            surname: None,
        })
        .await?;
    Ok(profile)
}

/// Read questions from stdin and print answers until an empty line.
async fn run_chat_loop(
    args: &CliArgs,
    chats: &ChatStore,
    orchestrator: &AnswerOrchestrator,
    user_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let chat = chats.create_chat(user_id, "Yeni söhbət", None).await?;
    tracing::info!(chat_id = %chat.id, "Console chat ready");

    println!("Qanun hüquq köməkçisi. Sualınızı yazın; çıxmaq üçün boş sətir göndərin.");

    let stdin = tokio::io::stdin();
    let mut lines = tokio::io::BufReader::new(stdin).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            break;
        }

        if chats
            .add_message_to_chat(&chat.id, user_id, Role::User, question, None)
            .await?
            .is_none()
        {
            tracing::warn!(chat_id = %chat.id, "Chat no longer accessible");
            break;
        }

        let Some(current) = chats.get_chat(&chat.id, user_id).await? else {
            tracing::warn!(chat_id = %chat.id, "Chat no longer accessible");
            break;
        };

        let answer = match orchestrator.generate_answer(question, &current.messages).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!(error = %e, "Answer generation failed");
                println!("{}\n", GENERIC_FAILURE_MESSAGE);
                continue;
            }
        };

        // The Azerbaijani original is what gets persisted; translation below
        // is display-side only.
        let languages = (answer.intent == Intent::LegalQuestion)
            .then(|| ("az".to_string(), args.lang.clone()));
        chats
            .add_message_to_chat(&chat.id, user_id, Role::Assistant, &answer.content, languages)
            .await?;

        // First reply names the chat.
        if current.messages.len() == 1 {
            let prefix: String = answer.content.chars().take(40).collect();
            chats
                .rename_chat(&chat.id, user_id, &format!("{}...", prefix))
                .await?;
        }

        let display = if args.lang == "en" {
            orchestrator.translate(&answer.content, "Azerbaijani", "English").await
        } else {
            answer.content
        };
        println!("{}\n", display);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Tracing.
    let filter = match args.log_level.as_deref() {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting Qanun v{}", env!("CARGO_PKG_VERSION"));

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = QanunConfig::load_or_default(&config_file);
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    if let Some(ref dir) = args.data_dir {
        config.storage.data_dir = dir.clone();
    }

    // Credentials. The model key is mandatory and checked before any network
    // activity; search credentials are an optional pair.
    let credentials = match Credentials::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Mandatory credential missing");
            return Err(e.into());
        }
    };

    // Storage.
    let backend: Arc<dyn StorageBackend> = match config.storage.backend.as_str() {
        "file" => {
            let data_dir = resolve_data_dir(&config.storage.data_dir);
            if let Err(e) = std::fs::create_dir_all(&data_dir) {
                tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
                return Err(e.into());
            }
            tracing::info!(path = %data_dir.display(), "File storage ready");
            Arc::new(JsonFileBackend::new(data_dir))
        }
        "memory" => {
            tracing::info!("In-memory storage selected; records are not persisted");
            Arc::new(MemoryBackend::new())
        }
        other => {
            return Err(QanunError::Config(format!("Unknown storage backend: {}", other)).into());
        }
    };

    let chats = ChatStore::new(Arc::clone(&backend));
    let users = UserStore::new(backend);

    // Pipeline.
    let Credentials { api_key, search } = credentials;
    let client = Arc::new(OpenAiClient::new(config.model.api_base.clone(), api_key));

    let search: Option<Arc<dyn SourceSearch>> = match search {
        Some(creds) => {
            tracing::info!("Trusted-source search configured");
            Some(Arc::new(GoogleCseSearch::new(
                config.search.endpoint.clone(),
                creds,
                config.search.result_limit,
            )))
        }
        None => {
            tracing::warn!("Search credentials absent; legal questions get a static notice");
            None
        }
    };

    let orchestrator =
        AnswerOrchestrator::new(client, search, config.model.clone(), config.history.clone());

    // Console identity.
    let user = ensure_console_user(&users).await?;
    tracing::info!(user_id = %user.id, "Console session user ready");

    run_chat_loop(&args, &chats, &orchestrator, &user.id).await
}
