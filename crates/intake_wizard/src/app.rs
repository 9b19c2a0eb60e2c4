use color_eyre::Result;
use ratatui::prelude::Rect;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::{
    action::Action,
    components::{Component, form_page::FormPage},
    config::Config,
    tui::{Event, EventResponse, Tui},
};

pub struct App {
    config: Config,
    page: FormPage,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config, page: FormPage) -> Self {
        Self {
            config,
            page,
            should_quit: false,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

        let mut tui = Tui::new()?
            .tick_rate(self.config.tick_rate)
            .frame_rate(self.config.frame_rate)
            .mouse(true);
        tui.enter()?;

        self.page.register_action_handler(action_tx.clone())?;

        loop {
            // 1. Terminal events → actions
            if let Some(ev) = tui.next_event().await {
                let stop_event_propagation = match self.page.handle_events(ev.clone())? {
                    Some(EventResponse::Continue(a)) => {
                        action_tx.send(a).ok();
                        false
                    }
                    Some(EventResponse::Stop(a)) => {
                        action_tx.send(a).ok();
                        true
                    }
                    None => false,
                };

                if !stop_event_propagation {
                    match ev {
                        Event::Tick => {
                            action_tx.send(Action::Tick).ok();
                        }
                        Event::Render => {
                            action_tx.send(Action::Render).ok();
                        }
                        Event::Resize(w, h) => {
                            action_tx.send(Action::Resize(w, h)).ok();
                        }
                        Event::Error => {
                            action_tx
                                .send(Action::Error("terminal event stream failed".into()))
                                .ok();
                        }
                        _ => {}
                    }
                }
            }

            // 2. Drain the action queue
            while let Ok(action) = action_rx.try_recv() {
                if action != Action::Tick && action != Action::Render {
                    debug!(%action, "action");
                }
                match action {
                    Action::Quit => self.should_quit = true,
                    Action::Resize(w, h) => {
                        tui.resize(Rect::new(0, 0, w, h))?;
                        self.draw(&mut tui, &action_tx)?;
                    }
                    Action::Render => self.draw(&mut tui, &action_tx)?,
                    Action::Error(ref msg) => error!("{msg}"),
                    _ => {}
                }
                if let Some(follow_up) = self.page.update(action)? {
                    action_tx.send(follow_up).ok();
                }
            }

            if self.should_quit {
                tui.stop()?;
                break;
            }
        }
        tui.exit()?;
        Ok(())
    }

    fn draw(&mut self, tui: &mut Tui, action_tx: &mpsc::UnboundedSender<Action>) -> Result<()> {
        tui.draw(|f| {
            let area = f.area();
            if let Err(err) = self.page.draw(f, area) {
                action_tx
                    .send(Action::Error(format!("Failed to draw: {err:?}")))
                    .ok();
            }
        })?;
        Ok(())
    }
}
