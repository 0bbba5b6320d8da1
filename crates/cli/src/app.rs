//! The screen loop: reads commands, drives the controllers, and prints.
//!
//! Input lines, push messages, and notices are multiplexed with
//! `tokio::select!` on one task, so the dashboard state is only ever
//! touched from here.

use std::sync::Arc;

use qrtrack_client::api::{ApiError, QrTrackerApi};
use qrtrack_client::client::PushClient;
use qrtrack_client::config::ClientConfig;
use qrtrack_client::dashboard::Dashboard;
use qrtrack_client::events::PushMessage;
use qrtrack_client::notices::Notifier;
use qrtrack_client::reconnect::ReconnectConfig;
use qrtrack_client::session::SessionGate;
use qrtrack_core::notice::Notice;
use qrtrack_core::screen::Screen;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::command::{Command, HELP};
use crate::render;

pub struct App {
    config: ClientConfig,
    gate: SessionGate,
    dashboard: Dashboard,
    screen: Screen,
    notices: mpsc::UnboundedReceiver<Notice>,
    push: Option<mpsc::Receiver<PushMessage>>,
    reconnect: ReconnectConfig,
}

impl App {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let api = Arc::new(QrTrackerApi::new(config.api_base())?);
        let (notifier, notices) = Notifier::channel();
        let gate = SessionGate::new(Arc::clone(&api), notifier.clone());
        let dashboard = Dashboard::new(api, notifier, config.download_dir.clone());

        Ok(Self {
            config,
            gate,
            dashboard,
            screen: Screen::Entry,
            notices,
            push: None,
            reconnect: ReconnectConfig::default(),
        })
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    /// Run until `quit` or end of input.
    pub async fn run<R, W>(&mut self, input: R, output: &mut W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.start(output).await?;
        let mut lines = input.lines();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    match Command::parse(&line) {
                        Ok(Command::Quit) => break,
                        Ok(command) => self.handle(command, output).await?,
                        Err(e) => write_line(output, &e.to_string()).await?,
                    }
                    self.flush_notices(output).await?;
                    write_prompt(output, self.screen).await?;
                }
                Some(message) = next_push(&mut self.push) => {
                    self.on_push(message, output).await?;
                }
                Some(notice) = self.notices.recv() => {
                    output.write_all(render::notice(&notice).as_bytes()).await?;
                    output.flush().await?;
                }
            }
        }

        self.dashboard.unmount().await;
        self.flush_notices(output).await?;
        tracing::info!("Front-end exited");
        Ok(())
    }

    /// Pick the first screen: auto-login from the environment, else a live
    /// session in the cookie jar, else the login form.
    async fn start<W: AsyncWrite + Unpin>(&mut self, output: &mut W) -> std::io::Result<()> {
        let next = match self.config.auto_login() {
            Some((email, password)) => {
                let (email, password) = (email.to_string(), password.to_string());
                self.gate.login(&email, &password).await
            }
            None => self.gate.resume().await,
        };

        match next {
            Some(screen) => self.navigate(screen, output).await?,
            None => {
                output.write_all(render::header(self.screen).as_bytes()).await?;
                write_line(output, "Type `login <email> <password>` or `help`.").await?;
            }
        }
        self.flush_notices(output).await?;
        write_prompt(output, self.screen).await
    }

    async fn handle<W: AsyncWrite + Unpin>(
        &mut self,
        command: Command,
        output: &mut W,
    ) -> std::io::Result<()> {
        if command.needs_session() && self.screen != Screen::Dashboard {
            return write_line(output, "Sign in first.").await;
        }

        match command {
            Command::Help => write_line(output, HELP).await?,
            Command::Quit => {}
            Command::Login { email, password } => {
                if let Some(next) = self.gate.login(&email, &password).await {
                    self.navigate(next, output).await?;
                }
            }
            Command::Register(None) => self.navigate(Screen::Register, output).await?,
            Command::Register(Some((email, password))) => {
                if let Some(next) = self.gate.register(&email, &password).await {
                    self.navigate(next, output).await?;
                }
            }
            Command::List => self.print_dashboard(output).await?,
            Command::Refresh => {
                if let Some(next) = self.dashboard.load().await {
                    return self.navigate(next, output).await;
                }
                self.print_dashboard(output).await?;
            }
            Command::Generate { url, count } => {
                let form = self.dashboard.form_mut();
                form.url = url;
                if let Some(count) = count {
                    form.count = count;
                }
                if let Some(next) = self.dashboard.generate().await {
                    return self.navigate(next, output).await;
                }
                self.print_dashboard(output).await?;
            }
            Command::Edit(id) => match self.dashboard.begin_edit(id) {
                Ok(()) => self.print_dashboard(output).await?,
                Err(e) => write_line(output, &e.to_string()).await?,
            },
            Command::Name(text) => match self.dashboard.set_edit_text(text) {
                Ok(()) => self.print_dashboard(output).await?,
                Err(e) => write_line(output, &e.to_string()).await?,
            },
            Command::Save => {
                if self.dashboard.save_edit().await {
                    self.print_dashboard(output).await?;
                }
            }
            Command::Cancel => {
                self.dashboard.cancel_edit();
                self.print_dashboard(output).await?;
            }
            Command::Rename { id, label } => {
                if self.dashboard.rename(id, label).await {
                    self.print_dashboard(output).await?;
                }
            }
            Command::Delete(id) => {
                if self.dashboard.delete(id).await {
                    self.print_dashboard(output).await?;
                }
            }
            Command::Download(id) => {
                if let Some(path) = self.dashboard.download(id).await {
                    write_line(output, &format!("Saved {}", path.display())).await?;
                }
            }
            Command::Logout => {
                let next = self.dashboard.logout().await;
                self.push = None;
                self.navigate(next, output).await?;
            }
        }
        Ok(())
    }

    async fn navigate<W: AsyncWrite + Unpin>(
        &mut self,
        screen: Screen,
        output: &mut W,
    ) -> std::io::Result<()> {
        if self.screen == Screen::Dashboard && screen != Screen::Dashboard {
            self.dashboard.unmount().await;
            self.push = None;
        }
        self.screen = screen;
        tracing::debug!(screen = ?screen, "Navigated");

        if screen != Screen::Dashboard {
            return output.write_all(render::header(screen).as_bytes()).await;
        }

        if let Some(next) = self.dashboard.load().await {
            // Session rejected while mounting.
            self.screen = next;
            return output.write_all(render::header(next).as_bytes()).await;
        }
        self.push = Some(self.dashboard.subscribe(
            PushClient::new(self.config.push_base()),
            self.reconnect.clone(),
        ));
        self.print_dashboard(output).await
    }

    async fn on_push<W: AsyncWrite + Unpin>(
        &mut self,
        message: PushMessage,
        output: &mut W,
    ) -> std::io::Result<()> {
        let update = match &message {
            PushMessage::ScanUpdate(update) => Some(*update),
            _ => None,
        };
        if !self.dashboard.apply_push(message) {
            return Ok(());
        }
        if let Some(update) = update {
            write_line(
                output,
                &format!("#{} scanned, {} scans total", update.id, update.scan_count),
            )
            .await?;
        }
        Ok(())
    }

    async fn print_dashboard<W: AsyncWrite + Unpin>(&self, output: &mut W) -> std::io::Result<()> {
        let text = render::dashboard(
            self.dashboard.codes(),
            self.dashboard.edit_slot(),
            &self.config.api_base(),
        );
        output.write_all(text.as_bytes()).await
    }

    async fn flush_notices<W: AsyncWrite + Unpin>(&mut self, output: &mut W) -> std::io::Result<()> {
        while let Ok(notice) = self.notices.try_recv() {
            output.write_all(render::notice(&notice).as_bytes()).await?;
        }
        output.flush().await
    }
}

/// Next push message, or never when no subscription is mounted.
async fn next_push(push: &mut Option<mpsc::Receiver<PushMessage>>) -> Option<PushMessage> {
    match push {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> std::io::Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await
}

async fn write_prompt<W: AsyncWrite + Unpin>(output: &mut W, screen: Screen) -> std::io::Result<()> {
    let prompt = match screen {
        Screen::Entry => "login> ",
        Screen::Register => "register> ",
        Screen::Dashboard => "qrtrack> ",
    };
    output.write_all(prompt.as_bytes()).await?;
    output.flush().await
}
