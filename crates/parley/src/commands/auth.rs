use async_trait::async_trait;
use comfy_table::{Cell, Color, Table};
use eyre::Result;
use std::io::Write;
use strum::IntoEnumIterator;

use parley_core::auth::{OAuthProviderKind, ProcessEnv, configured_providers};

use super::Command;

pub struct AuthProvidersCommand;

#[async_trait]
impl Command for AuthProvidersCommand {
    async fn execute(&self) -> Result<()> {
        let configured = configured_providers(&ProcessEnv)?;

        let mut table = Table::new();
        table.set_header(vec![
            Cell::new("Provider").fg(Color::Green),
            Cell::new("Status").fg(Color::Green),
            Cell::new("Email linking").fg(Color::Green),
            Cell::new("Redirect URI").fg(Color::Green),
        ]);

        for kind in OAuthProviderKind::iter() {
            let row = match configured.iter().find(|p| p.kind == kind) {
                Some(provider) => vec![
                    Cell::new(kind),
                    Cell::new("✅ Configured"),
                    Cell::new(if provider.allow_dangerous_email_account_linking {
                        "allowed"
                    } else {
                        "-"
                    }),
                    Cell::new(
                        provider
                            .redirect_uri
                            .as_ref()
                            .map_or_else(|| "-".to_string(), ToString::to_string),
                    ),
                ],
                None => vec![
                    Cell::new(kind),
                    Cell::new(format!(
                        "❌ Set {} and {}",
                        kind.client_id_var(),
                        kind.client_secret_var()
                    )),
                    Cell::new("-"),
                    Cell::new("-"),
                ],
            };
            table.add_row(row);
        }

        let mut stdout = std::io::stdout();
        writeln!(stdout, "{table}")?;
        Ok(())
    }
}
