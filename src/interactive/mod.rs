//! Interactive surface: the application controller, the screen router, and
//! the wizards it dispatches to.

mod dashboard;
pub mod dust_deregister;
pub mod dust_register;
pub mod multi_select;
pub mod settings;
mod setup;
pub mod transfer;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use console::{style, Term};
use dialoguer::{theme::ColorfulTheme, Select};
use indicatif::ProgressBar;
use inquire::InquireError;
use log::{error, info, warn};
use tokio::sync::watch;

use crate::config::{Environment, EnvironmentConfig};
use crate::engine::keys::{Seed, UnshieldedKeystore, WalletSecretKeys};
use crate::engine::pipeline::TransactionOutcome;
use crate::engine::{LocalEngine, WalletEngine, WalletState};
use crate::navigation::{Navigator, Route};
use crate::types::EngineError;

/// What a prompt interaction produced: a committed value, Esc (back), or a
/// force-quit request.
pub(crate) enum PromptEvent<T> {
    Value(T),
    Back,
    Quit,
}

/// How a screen or wizard handed control back to the router.
pub(crate) enum FlowOutcome {
    Done,
    Quit,
}

/// Map an inquire prompt result into a [`PromptEvent`]: Esc is back,
/// Ctrl+C is quit, anything else is a real terminal error.
pub(crate) fn prompt_event<T>(result: Result<T, InquireError>) -> Result<PromptEvent<T>> {
    match result {
        Ok(value) => Ok(PromptEvent::Value(value)),
        Err(InquireError::OperationCanceled) => Ok(PromptEvent::Back),
        Err(InquireError::OperationInterrupted) => Ok(PromptEvent::Quit),
        Err(error) => Err(error.into()),
    }
}

/// A themed select menu with Esc-as-back and Ctrl+C-as-quit.
pub(crate) fn select_prompt(prompt: &str, items: &[String]) -> Result<PromptEvent<usize>> {
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(items)
        .default(0)
        .interact_opt();
    match selection {
        Ok(Some(index)) => Ok(PromptEvent::Value(index)),
        Ok(None) => Ok(PromptEvent::Back),
        Err(dialoguer::Error::IO(error)) if error.kind() == io::ErrorKind::Interrupted => {
            Ok(PromptEvent::Quit)
        }
        Err(error) => Err(error.into()),
    }
}

pub(crate) fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

pub(crate) fn wait_for_key() -> Result<()> {
    println!("\n{}", style("Press any key to continue...").dim());
    Term::stdout().read_key()?;
    Ok(())
}

/// Terminal result screen shared by every wizard.
pub(crate) fn render_outcome(label: &str, outcome: Option<&TransactionOutcome>) {
    clearscreen::clear().ok();
    match outcome {
        Some(TransactionOutcome::Success { tx_id }) => {
            println!("\n{}", format!("✔ {label} submitted!").green().bold());
            println!("Transaction id: {tx_id}");
        }
        Some(TransactionOutcome::Failure { error }) => {
            println!("\n{}", format!("✖ {label} failed").red().bold());
            println!("{error}");
        }
        None => {
            println!("\n{}", format!("✖ {label} produced no result").red());
        }
    }
}

/// Everything that exists only while an engine is running: the engine
/// handle, the key material derived from the seed, and the state stream.
pub struct WalletSession {
    pub environment: Environment,
    pub config: EnvironmentConfig,
    seed: Seed,
    pub keys: WalletSecretKeys,
    pub keystore: UnshieldedKeystore,
    pub engine: Arc<LocalEngine>,
    state_rx: watch::Receiver<WalletState>,
}

impl WalletSession {
    pub async fn start(
        environment: Environment,
        config: EnvironmentConfig,
        seed: Seed,
    ) -> Result<WalletSession, EngineError> {
        let keys = WalletSecretKeys::from_seed(&seed);
        let keystore = UnshieldedKeystore::from_seed(&seed);
        let engine = LocalEngine::start(&seed, &config).await?;
        let state_rx = engine.state();
        Ok(WalletSession {
            environment,
            config,
            seed,
            keys,
            keystore,
            engine,
            state_rx,
        })
    }

    /// Latest state snapshot. Renderers read this; wizards never write it.
    pub fn snapshot(&self) -> WalletState {
        self.state_rx.borrow().clone()
    }

    pub async fn stop(&self) {
        if let Err(err) = self.engine.stop().await {
            warn!("engine stop failed: {err}");
        }
    }
}

/// The application controller: owns the navigator, the running session (if
/// any), the seed in transit between the seed screen and initialization,
/// and the one-shot error banner shown on the next rendered screen.
pub struct App {
    navigator: Navigator,
    session: Option<WalletSession>,
    pending_seed: Option<Seed>,
    banner: Option<String>,
}

impl App {
    pub fn new() -> App {
        App {
            navigator: Navigator::new(Route::Environment),
            session: None,
            pending_seed: None,
            banner: None,
        }
    }

    /// Run until a screen requests quit or the process receives an
    /// interrupt signal, then stop the engine and return. Inside raw-mode
    /// prompts Ctrl+C arrives as a key event instead of a signal; the
    /// signal path covers the awaited stretches in between (engine start,
    /// the `processing` steps).
    pub async fn run(&mut self) -> Result<()> {
        let result = tokio::select! {
            result = self.run_screens() => result,
            _ = shutdown_signal() => {
                info!("interrupt received, shutting down");
                Ok(())
            }
        };
        self.shutdown().await;
        result
    }

    /// The screen router: dispatch on the current route until a screen
    /// requests quit.
    async fn run_screens(&mut self) -> Result<()> {
        loop {
            let route = self.navigator.current().clone();
            let outcome = match route {
                Route::Environment => setup::environment_screen(self)?,
                Route::SeedType { environment } => setup::seed_type_screen(self, environment)?,
                Route::Seed {
                    environment,
                    seed_type,
                } => setup::seed_screen(self, environment, seed_type)?,
                Route::Initializing {
                    environment,
                    seed_type,
                } => setup::initializing_screen(self, environment, seed_type).await?,
                Route::Dashboard { environment } => {
                    dashboard::dashboard_screen(self, environment)?
                }
                Route::Transfer { .. } => {
                    let outcome = match &self.session {
                        Some(session) => transfer::run(session).await?,
                        None => {
                            warn!("transfer flow requested without a running engine");
                            FlowOutcome::Done
                        }
                    };
                    self.navigator.pop();
                    outcome
                }
                Route::RegisterDust { .. } => {
                    let outcome = match &self.session {
                        Some(session) => dust_register::run(session).await?,
                        None => {
                            warn!("registration flow requested without a running engine");
                            FlowOutcome::Done
                        }
                    };
                    self.navigator.pop();
                    outcome
                }
                Route::DeregisterDust { .. } => {
                    let outcome = match &self.session {
                        Some(session) => dust_deregister::run(session).await?,
                        None => {
                            warn!("deregistration flow requested without a running engine");
                            FlowOutcome::Done
                        }
                    };
                    self.navigator.pop();
                    outcome
                }
                Route::Settings { .. } => {
                    let outcome = settings::run(self).await?;
                    // After a successful apply the stack was reset to the
                    // dashboard and this pop is a no-op.
                    self.navigator.pop();
                    outcome
                }
            };

            if matches!(outcome, FlowOutcome::Quit) {
                return Ok(());
            }
        }
    }

    /// Orderly teardown shared by the quit key and interrupt signals.
    pub(crate) async fn shutdown(&mut self) {
        if let Some(session) = self.session.take() {
            session.stop().await;
        }
        info!("session ended");
        println!("\n👋 Goodbye!");
    }

    /// Apply a new configuration: stop the running engine, rebuild it from
    /// the same seed, and land on the dashboard. On rebuild failure the
    /// previous configuration is restored so the user is never left with no
    /// engine and no explanation. Returns whether the new configuration
    /// took effect.
    pub(crate) async fn apply_configuration(
        &mut self,
        environment: Environment,
        config: EnvironmentConfig,
    ) -> Result<bool> {
        let Some(old) = self.session.take() else {
            return Ok(false);
        };
        old.stop().await;

        match WalletSession::start(environment, config, old.seed.clone()).await {
            Ok(session) => {
                self.session = Some(session);
                self.navigator.reset(Route::Dashboard { environment });
                info!("engine rebuilt for {environment}");
                Ok(true)
            }
            Err(err) => {
                warn!("engine rebuild failed: {err}");
                match WalletSession::start(old.environment, old.config.clone(), old.seed.clone())
                    .await
                {
                    Ok(restored) => {
                        let environment = restored.environment;
                        self.banner = Some(format!(
                            "Settings not applied ({err}); previous configuration restored."
                        ));
                        self.session = Some(restored);
                        self.navigator.reset(Route::Dashboard { environment });
                        Ok(false)
                    }
                    Err(restore_err) => {
                        error!("restart with the previous configuration failed: {restore_err}");
                        self.banner = Some(format!(
                            "The engine could not be restarted ({restore_err}); set up the wallet again."
                        ));
                        self.navigator.reset(Route::Environment);
                        Ok(false)
                    }
                }
            }
        }
    }
}

impl Default for App {
    fn default() -> Self {
        App::new()
    }
}

/// Resolves when the process receives SIGINT or, on unix, SIGTERM.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("interrupt handler unavailable: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!("SIGTERM handler unavailable: {err}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::environment_config;

    fn test_seed() -> Seed {
        Seed::from_hex("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb")
            .unwrap()
    }

    async fn app_with_session(environment: Environment) -> App {
        let mut app = App::new();
        let session =
            WalletSession::start(environment, environment_config(environment), test_seed())
                .await
                .unwrap();
        app.session = Some(session);
        app.navigator.reset(Route::Dashboard { environment });
        app
    }

    #[tokio::test]
    async fn shutdown_stops_the_engine_and_drops_the_session() {
        let mut app = app_with_session(Environment::Undeployed).await;
        let engine = app.session.as_ref().unwrap().engine.clone();

        app.shutdown().await;
        assert!(app.session.is_none());
        assert_eq!(
            engine.estimate_registration(&[]).await.unwrap_err(),
            EngineError::Stopped
        );
    }

    #[tokio::test]
    async fn shutdown_without_a_session_is_harmless() {
        let mut app = App::new();
        app.shutdown().await;
        assert!(app.session.is_none());
    }

    #[tokio::test]
    async fn apply_stops_the_old_engine_and_rebuilds_once() {
        let environment = Environment::Undeployed;
        let mut app = app_with_session(environment).await;
        let old_engine = app.session.as_ref().unwrap().engine.clone();

        let mut config = environment_config(environment);
        config.node_ws_url = "ws://localhost:9944".to_string();
        let applied = app
            .apply_configuration(environment, config.clone())
            .await
            .unwrap();
        assert!(applied);

        // The old engine received its stop; calls on it now fail.
        assert_eq!(
            old_engine.estimate_registration(&[]).await.unwrap_err(),
            EngineError::Stopped
        );

        // The new session runs against the edited configuration.
        let session = app.session.as_ref().unwrap();
        assert_eq!(session.config, config);
        assert!(session.engine.estimate_registration(&[]).await.is_ok());
        assert!(matches!(app.navigator.current(), Route::Dashboard { .. }));

        session.stop().await;
    }

    #[tokio::test]
    async fn apply_resets_navigation_to_a_single_dashboard_route() {
        let environment = Environment::Undeployed;
        let mut app = app_with_session(environment).await;
        app.navigator.push(Route::Settings { environment });

        app.apply_configuration(environment, environment_config(Environment::DevNet))
            .await
            .unwrap();
        assert_eq!(app.navigator.depth(), 1);
        assert!(matches!(
            app.navigator.current(),
            Route::Dashboard {
                environment: Environment::Undeployed
            }
        ));

        app.session.as_ref().unwrap().stop().await;
    }

    #[tokio::test]
    async fn apply_without_a_session_is_refused() {
        let mut app = App::new();
        let applied = app
            .apply_configuration(
                Environment::Undeployed,
                environment_config(Environment::Undeployed),
            )
            .await
            .unwrap();
        assert!(!applied);
        assert_eq!(*app.navigator.current(), Route::Environment);
    }
}
