use clap::{Parser, Subcommand};
use parley_core::chat::{ChatId, Visibility};
use std::path::PathBuf;

/// Chat with the Parley service from the terminal.
#[derive(Parser)]
#[command(version, about, long_about = None, author)]
pub struct Cli {
    /// Base URL of the chat service
    #[arg(long, env = "PARLEY_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Session cookie value for an authenticated user
    #[arg(long, env = "PARLEY_SESSION_TOKEN", global = true, hide_env_values = true)]
    pub session_token: Option<String>,

    /// Path to the client config file (defaults to <config dir>/parley/config.toml)
    #[arg(long, env = "PARLEY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Send a message and print the streamed reply
    Chat {
        /// Continue an existing chat instead of starting a new one
        #[arg(long)]
        chat: Option<ChatId>,

        /// Chat model, as provider:modelId or an alias
        #[arg(short, long)]
        model: Option<String>,

        /// Image generation model, as provider:modelId or an alias
        #[arg(long)]
        image_model: Option<String>,

        /// Visibility of a new chat
        #[arg(long)]
        visibility: Option<Visibility>,

        /// Files to attach (repeatable)
        #[arg(long = "attach", value_name = "PATH")]
        attachments: Vec<PathBuf>,

        /// Toolkits to enable, optionally with JSON parameters (repeatable)
        #[arg(long = "toolkit", value_name = "ID[=JSON]")]
        toolkits: Vec<String>,

        /// Disable native search even if the model supports it
        #[arg(long)]
        no_search: bool,

        /// Message text. Read from stdin when omitted.
        message: Option<String>,
    },
    /// Reattach to a chat's in-flight response
    Resume {
        chat: ChatId,
    },
    /// Browse and manage chat history
    Chats {
        #[command(subcommand)]
        command: ChatsCommands,
    },
    /// Inspect the model catalog
    Models {
        #[command(subcommand)]
        command: ModelsCommands,
    },
    /// Inspect authentication setup
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Manage user preferences
    Preferences {
        #[command(subcommand)]
        action: PreferencesCommands,
    },
}

#[derive(Subcommand, Clone)]
pub enum ChatsCommands {
    /// List chats, newest first
    List {
        /// Page size
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Keep fetching until every chat is listed
        #[arg(long)]
        all: bool,
    },
    /// Delete a chat
    Delete { chat: ChatId },
    /// Print a chat's messages
    Show { chat: ChatId },
}

#[derive(Subcommand, Clone)]
pub enum ModelsCommands {
    /// List chat and image models
    List,
}

#[derive(Subcommand, Clone)]
pub enum AuthCommands {
    /// Show which OAuth providers the environment configures
    Providers,
}

#[derive(Subcommand, Clone)]
pub enum PreferencesCommands {
    /// Show current preferences
    Show,
    /// Reset preferences to defaults
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chat_flags() {
        let cli = Cli::try_parse_from([
            "parley",
            "chat",
            "--model",
            "sonnet",
            "--visibility",
            "public",
            "--attach",
            "a.png",
            "--attach",
            "b.pdf",
            "--toolkit",
            "spotify={\"limit\":5}",
            "--no-search",
            "hello there",
        ])
        .unwrap();

        let Commands::Chat {
            model,
            visibility,
            attachments,
            toolkits,
            no_search,
            message,
            ..
        } = cli.command
        else {
            panic!("expected chat command");
        };
        assert_eq!(model.as_deref(), Some("sonnet"));
        assert_eq!(visibility, Some(Visibility::Public));
        assert_eq!(attachments.len(), 2);
        assert_eq!(toolkits, vec!["spotify={\"limit\":5}".to_string()]);
        assert!(no_search);
        assert_eq!(message.as_deref(), Some("hello there"));
    }

    #[test]
    fn rejects_malformed_chat_id() {
        assert!(Cli::try_parse_from(["parley", "resume", "not-a-uuid"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "parley",
            "models",
            "list",
            "--base-url",
            "https://chat.example.com",
        ])
        .unwrap();
        assert_eq!(cli.base_url.as_deref(), Some("https://chat.example.com"));
    }
}
