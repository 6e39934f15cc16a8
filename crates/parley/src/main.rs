use clap::Parser;
use eyre::Result;

use parley::cli::{
    AuthCommands, ChatsCommands, Cli, Commands, ModelsCommands, PreferencesCommands,
};
use parley::commands::{
    Command,
    auth::AuthProvidersCommand,
    chat::ChatCommand,
    chats::{ChatsAction, ChatsCommand},
    models::ModelsCommand,
    preferences::{PreferencesAction, PreferencesCommand},
    resume::ResumeCommand,
};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    parley::cli::config::load_env()?;

    // Level comes from RUST_LOG
    parley_core::utils::tracing::init_tracing()?;

    let command: Box<dyn Command> = match cli.command.clone() {
        Commands::Chat {
            chat,
            model,
            image_model,
            visibility,
            attachments,
            toolkits,
            no_search,
            message,
        } => Box::new(ChatCommand {
            client: parley::cli::config::client_config(&cli)?,
            chat,
            model,
            image_model,
            visibility,
            attachments,
            toolkits,
            no_search,
            message,
        }),
        Commands::Resume { chat } => Box::new(ResumeCommand {
            client: parley::cli::config::client_config(&cli)?,
            chat,
        }),
        Commands::Chats { command } => {
            let action = match command {
                ChatsCommands::List { limit, all } => ChatsAction::List { limit, all },
                ChatsCommands::Delete { chat } => ChatsAction::Delete { chat },
                ChatsCommands::Show { chat } => ChatsAction::Show { chat },
            };
            Box::new(ChatsCommand {
                client: parley::cli::config::client_config(&cli)?,
                action,
            })
        }
        Commands::Models {
            command: ModelsCommands::List,
        } => Box::new(ModelsCommand),
        Commands::Auth {
            command: AuthCommands::Providers,
        } => Box::new(AuthProvidersCommand),
        Commands::Preferences { action } => {
            let action = match action {
                PreferencesCommands::Show => PreferencesAction::Show,
                PreferencesCommands::Reset => PreferencesAction::Reset,
            };
            Box::new(PreferencesCommand { action })
        }
    };

    command.execute().await
}
