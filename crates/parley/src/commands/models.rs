use async_trait::async_trait;
use comfy_table::{Cell, Color, Table};
use eyre::Result;
use std::io::Write;

use parley_core::model_registry::ModelRegistry;

use super::Command;

pub struct ModelsCommand;

#[async_trait]
impl Command for ModelsCommand {
    async fn execute(&self) -> Result<()> {
        let registry = ModelRegistry::load()?;
        let default = registry.default_language_model().map(|m| m.id());

        let mut chat = Table::new();
        chat.set_header(vec![
            Cell::new("Model").fg(Color::Green),
            Cell::new("Name").fg(Color::Green),
            Cell::new("Capabilities").fg(Color::Green),
            Cell::new("Aliases").fg(Color::Green),
        ]);
        for model in registry.language_models() {
            let id = model.id();
            let marker = if Some(&id) == default.as_ref() { " *" } else { "" };
            chat.add_row(vec![
                Cell::new(format!("{id}{marker}")),
                Cell::new(&model.name),
                Cell::new(
                    model
                        .capabilities
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", "),
                ),
                Cell::new(model.aliases.join(", ")),
            ]);
        }

        let mut image = Table::new();
        image.set_header(vec![
            Cell::new("Image model").fg(Color::Green),
            Cell::new("Name").fg(Color::Green),
            Cell::new("Aliases").fg(Color::Green),
        ]);
        for model in registry.image_models() {
            image.add_row(vec![
                Cell::new(model.id()),
                Cell::new(&model.name),
                Cell::new(model.aliases.join(", ")),
            ]);
        }

        let mut stdout = std::io::stdout();
        writeln!(stdout, "{chat}")?;
        writeln!(stdout, "* default")?;
        writeln!(stdout)?;
        writeln!(stdout, "{image}")?;
        Ok(())
    }
}
