use super::Command;
use crate::error::Error;
use async_trait::async_trait;
use eyre::Result;
use parley_core::preferences::Preferences;
use std::io::Write;

pub struct PreferencesCommand {
    pub action: PreferencesAction,
}

pub enum PreferencesAction {
    Show,
    Reset,
}

#[async_trait]
impl Command for PreferencesCommand {
    async fn execute(&self) -> Result<()> {
        match &self.action {
            PreferencesAction::Show => self.show().map_err(Into::into),
            PreferencesAction::Reset => self.reset().map_err(Into::into),
        }
    }
}

impl PreferencesCommand {
    fn show(&self) -> std::result::Result<(), Error> {
        let prefs = Preferences::load()?;
        let path = Preferences::config_path()?;

        let mut stdout = std::io::stdout();
        writeln!(stdout, "Preferences file: {}", path.display())?;
        writeln!(stdout, "\n{}", toml::to_string_pretty(&prefs)?)?;
        Ok(())
    }

    fn reset(&self) -> std::result::Result<(), Error> {
        Preferences::default().save()?;

        let mut stdout = std::io::stdout();
        writeln!(stdout, "Preferences reset to defaults")?;
        Ok(())
    }
}
