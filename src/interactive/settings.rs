//! Settings flow: edit the session's environment configuration and apply it
//! by rebuilding the engine from the same seed.
//!
//! Edits accumulate in a [`SettingsEditor`] and take effect only on apply
//! (`a`); `r` throws them away. Changing the environment reloads every URL
//! from that environment's compiled-in defaults; editing the indexer HTTP
//! URL re-derives the WebSocket URL.

use anyhow::Result;
use console::{style, Key, Term};
use inquire::Text;
use url::Url;

use crate::config::{
    derive_indexer_ws_url, environment_config, Environment, EnvironmentConfig,
};

use super::{
    prompt_event, select_prompt, spinner, wait_for_key, App, FlowOutcome, PromptEvent,
};

/// Accumulated, not-yet-applied configuration edits.
pub struct SettingsEditor {
    original_environment: Environment,
    original: EnvironmentConfig,
    pub environment: Environment,
    pub config: EnvironmentConfig,
}

fn check_scheme(input: &str, allowed: &[&str]) -> Result<String, String> {
    let trimmed = input.trim();
    let url = Url::parse(trimmed).map_err(|e| format!("invalid URL: {e}"))?;
    if allowed.contains(&url.scheme()) {
        Ok(trimmed.to_string())
    } else {
        Err(format!(
            "URL scheme must be one of: {}",
            allowed.join(", ")
        ))
    }
}

impl SettingsEditor {
    pub fn new(environment: Environment, config: EnvironmentConfig) -> SettingsEditor {
        SettingsEditor {
            original_environment: environment,
            original: config.clone(),
            environment,
            config,
        }
    }

    /// Switch environments, reloading every URL from that environment's
    /// compiled-in defaults.
    pub fn set_environment(&mut self, environment: Environment) {
        self.environment = environment;
        self.config = environment_config(environment);
    }

    /// Set the indexer HTTP URL and re-derive the WebSocket URL from it.
    pub fn set_indexer_http_url(&mut self, input: &str) -> Result<(), String> {
        let url = check_scheme(input, &["http", "https"])?;
        self.config.indexer_ws_url = derive_indexer_ws_url(&url);
        self.config.indexer_http_url = url;
        Ok(())
    }

    pub fn set_indexer_ws_url(&mut self, input: &str) -> Result<(), String> {
        self.config.indexer_ws_url = check_scheme(input, &["ws", "wss"])?;
        Ok(())
    }

    pub fn set_node_ws_url(&mut self, input: &str) -> Result<(), String> {
        self.config.node_ws_url = check_scheme(input, &["ws", "wss"])?;
        Ok(())
    }

    pub fn set_proving_server_url(&mut self, input: &str) -> Result<(), String> {
        self.config.proving_server_url = check_scheme(input, &["http", "https"])?;
        Ok(())
    }

    pub fn has_changes(&self) -> bool {
        self.environment != self.original_environment || self.config != self.original
    }

    pub fn environment_changed(&self) -> bool {
        self.environment != self.original_environment
    }

    pub fn field_changed(&self, field: SettingsField) -> bool {
        match field {
            SettingsField::Environment => self.environment_changed(),
            SettingsField::IndexerHttpUrl => {
                self.config.indexer_http_url != self.original.indexer_http_url
            }
            SettingsField::IndexerWsUrl => {
                self.config.indexer_ws_url != self.original.indexer_ws_url
            }
            SettingsField::NodeWsUrl => self.config.node_ws_url != self.original.node_ws_url,
            SettingsField::ProvingServerUrl => {
                self.config.proving_server_url != self.original.proving_server_url
            }
        }
    }

    /// Throw away every pending edit.
    pub fn reset(&mut self) {
        self.environment = self.original_environment;
        self.config = self.original.clone();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    Environment,
    IndexerHttpUrl,
    IndexerWsUrl,
    NodeWsUrl,
    ProvingServerUrl,
}

const FIELDS: [SettingsField; 5] = [
    SettingsField::Environment,
    SettingsField::IndexerHttpUrl,
    SettingsField::IndexerWsUrl,
    SettingsField::NodeWsUrl,
    SettingsField::ProvingServerUrl,
];

/// What a key press on the settings menu means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    Up,
    Down,
    Edit,
    Apply,
    Reset,
    Back,
    Quit,
    None,
}

fn menu_action(key: &Key) -> MenuAction {
    match key {
        Key::ArrowUp | Key::Char('k') => MenuAction::Up,
        Key::ArrowDown | Key::Char('j') => MenuAction::Down,
        Key::Enter => MenuAction::Edit,
        Key::Char('a') => MenuAction::Apply,
        Key::Char('r') => MenuAction::Reset,
        Key::Escape => MenuAction::Back,
        Key::Char('\u{3}') => MenuAction::Quit,
        _ => MenuAction::None,
    }
}

fn field_line(editor: &SettingsEditor, field: SettingsField) -> String {
    let (label, value) = match field {
        SettingsField::Environment => ("Environment", editor.environment.label().to_string()),
        SettingsField::IndexerHttpUrl => {
            ("Indexer HTTP URL", editor.config.indexer_http_url.clone())
        }
        SettingsField::IndexerWsUrl => ("Indexer WS URL", editor.config.indexer_ws_url.clone()),
        SettingsField::NodeWsUrl => ("Node WS URL", editor.config.node_ws_url.clone()),
        SettingsField::ProvingServerUrl => {
            ("Proving server URL", editor.config.proving_server_url.clone())
        }
    };
    let marker = if editor.field_changed(field) { " *" } else { "" };
    format!("{label}: {value}{marker}")
}

fn edit_url(
    editor: &mut SettingsEditor,
    field: SettingsField,
    prompt: &str,
    current: String,
) -> Result<PromptEvent<()>> {
    let mut input = current;
    loop {
        let entered = match prompt_event(
            Text::new(prompt).with_initial_value(&input).prompt(),
        )? {
            PromptEvent::Value(value) => value,
            PromptEvent::Back => return Ok(PromptEvent::Back),
            PromptEvent::Quit => return Ok(PromptEvent::Quit),
        };

        let result = match field {
            SettingsField::IndexerHttpUrl => editor.set_indexer_http_url(&entered),
            SettingsField::IndexerWsUrl => editor.set_indexer_ws_url(&entered),
            SettingsField::NodeWsUrl => editor.set_node_ws_url(&entered),
            SettingsField::ProvingServerUrl => editor.set_proving_server_url(&entered),
            SettingsField::Environment => Ok(()),
        };
        match result {
            Ok(()) => return Ok(PromptEvent::Value(())),
            Err(error) => {
                println!("{}", style(format!("✖ {error}")).red());
                input = entered;
            }
        }
    }
}

/// Drive the settings flow. Applying stops the running engine and rebuilds
/// it against the edited configuration from the same seed.
pub(crate) async fn run(app: &mut App) -> Result<FlowOutcome> {
    let (environment, config) = match &app.session {
        Some(session) => (session.environment, session.config.clone()),
        None => return Ok(FlowOutcome::Done),
    };
    let mut editor = SettingsEditor::new(environment, config);
    let term = Term::stdout();
    let mut cursor = 0usize;
    let mut notice: Option<&str> = None;

    loop {
        clearscreen::clear().ok();
        println!("{}\n", style("⚙  Settings").bold());
        if editor.has_changes() {
            println!("{}\n", style("* unsaved changes").yellow());
        }

        for (index, &field) in FIELDS.iter().enumerate() {
            let line = field_line(&editor, field);
            if index == cursor {
                println!("{}", style(format!("> {line}")).cyan());
            } else {
                println!("  {line}");
            }
        }
        if let Some(message) = notice.take() {
            println!("\n{}", style(message).yellow());
        }
        println!(
            "\n{}",
            style("↑/↓ move · enter edit · [a] apply · [r] reset edits · esc back").dim()
        );

        let action = menu_action(&term.read_key()?);
        if action == MenuAction::Edit {
            let field = FIELDS[cursor];
            let event = match field {
                SettingsField::Environment => {
                    let labels: Vec<String> =
                        Environment::ALL.iter().map(|e| e.label().to_string()).collect();
                    match select_prompt("Environment:", &labels)? {
                        PromptEvent::Value(index) => {
                            editor.set_environment(Environment::ALL[index]);
                            PromptEvent::Value(())
                        }
                        PromptEvent::Back => PromptEvent::Back,
                        PromptEvent::Quit => PromptEvent::Quit,
                    }
                }
                SettingsField::IndexerHttpUrl => {
                    let current = editor.config.indexer_http_url.clone();
                    edit_url(&mut editor, field, "Indexer HTTP URL:", current)?
                }
                SettingsField::IndexerWsUrl => {
                    let current = editor.config.indexer_ws_url.clone();
                    edit_url(&mut editor, field, "Indexer WS URL:", current)?
                }
                SettingsField::NodeWsUrl => {
                    let current = editor.config.node_ws_url.clone();
                    edit_url(&mut editor, field, "Node WS URL:", current)?
                }
                SettingsField::ProvingServerUrl => {
                    let current = editor.config.proving_server_url.clone();
                    edit_url(&mut editor, field, "Proving server URL:", current)?
                }
            };
            if matches!(event, PromptEvent::Quit) {
                return Ok(FlowOutcome::Quit);
            }
            continue;
        }

        match action {
            MenuAction::Up => {
                cursor = if cursor == 0 { FIELDS.len() - 1 } else { cursor - 1 };
            }
            MenuAction::Down => cursor = (cursor + 1) % FIELDS.len(),
            MenuAction::Apply => {
                if !editor.has_changes() {
                    notice = Some("Nothing to apply.");
                    continue;
                }
                let progress = spinner("Reconfiguring the wallet engine...");
                let applied = app
                    .apply_configuration(editor.environment, editor.config.clone())
                    .await;
                progress.finish_and_clear();
                match applied {
                    Ok(true) => {
                        println!("\n{}", style("✔ Settings applied.").green().bold());
                        wait_for_key()?;
                        return Ok(FlowOutcome::Done);
                    }
                    Ok(false) => {
                        // Reverted (or dropped to setup); the banner explains it.
                        return Ok(FlowOutcome::Done);
                    }
                    Err(error) => {
                        println!("{}", style(format!("✖ {error}")).red());
                        wait_for_key()?;
                        return Ok(FlowOutcome::Done);
                    }
                }
            }
            MenuAction::Reset => editor.reset(),
            MenuAction::Back => return Ok(FlowOutcome::Done),
            MenuAction::Quit => return Ok(FlowOutcome::Quit),
            MenuAction::Edit | MenuAction::None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor() -> SettingsEditor {
        let environment = Environment::Undeployed;
        SettingsEditor::new(environment, environment_config(environment))
    }

    #[test]
    fn starts_clean() {
        let editor = editor();
        assert!(!editor.has_changes());
        for field in FIELDS {
            assert!(!editor.field_changed(field));
        }
    }

    #[test]
    fn indexer_http_edit_derives_the_ws_url() {
        let mut editor = editor();
        editor
            .set_indexer_http_url("https://indexer.example.net/api/v3/graphql")
            .unwrap();
        assert_eq!(
            editor.config.indexer_ws_url,
            "wss://indexer.example.net/api/v3/graphql/ws"
        );
        assert!(editor.field_changed(SettingsField::IndexerHttpUrl));
        assert!(editor.field_changed(SettingsField::IndexerWsUrl));
        assert!(editor.has_changes());
    }

    #[test]
    fn url_schemes_are_validated_per_field() {
        let mut editor = editor();
        assert!(editor.set_indexer_http_url("wss://wrong.example").is_err());
        assert!(editor.set_node_ws_url("https://wrong.example").is_err());
        assert!(editor.set_proving_server_url("not a url").is_err());
        assert!(!editor.has_changes());

        assert!(editor.set_node_ws_url("wss://node.example").is_ok());
        assert!(editor.field_changed(SettingsField::NodeWsUrl));
    }

    #[test]
    fn environment_change_reloads_defaults() {
        let mut editor = editor();
        editor
            .set_indexer_http_url("http://localhost:9999/graphql")
            .unwrap();

        editor.set_environment(Environment::DevNet);
        assert_eq!(editor.config, environment_config(Environment::DevNet));
        assert!(editor.environment_changed());
    }

    #[test]
    fn menu_key_map_matches_the_advertised_shortcuts() {
        assert_eq!(menu_action(&Key::Char('a')), MenuAction::Apply);
        assert_eq!(menu_action(&Key::Char('r')), MenuAction::Reset);
        assert_eq!(menu_action(&Key::Enter), MenuAction::Edit);
        assert_eq!(menu_action(&Key::Escape), MenuAction::Back);
        assert_eq!(menu_action(&Key::ArrowUp), MenuAction::Up);
        assert_eq!(menu_action(&Key::ArrowDown), MenuAction::Down);
        assert_eq!(menu_action(&Key::Char('\u{3}')), MenuAction::Quit);
        assert_eq!(menu_action(&Key::Char('x')), MenuAction::None);
    }

    #[test]
    fn reset_discards_every_edit() {
        let mut editor = editor();
        editor.set_environment(Environment::Preview);
        editor.set_node_ws_url("wss://elsewhere.example").unwrap();
        assert!(editor.has_changes());

        editor.reset();
        assert!(!editor.has_changes());
        assert_eq!(editor.environment, Environment::Undeployed);
        assert_eq!(editor.config, environment_config(Environment::Undeployed));
    }
}
