//! Application state shared by the draw loop: the five pages, the alert
//! banners and the queue of requests waiting to be dispatched.

use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::alert::{Alerts, Level};
use crate::config::Config;
use crate::network::{Job, Sequencer, Ticket, Update};
use crate::pages::{
    AnomaliesPage, DashboardPage, Effects, FlowsPage, PacketsPage, Page, PageId, ProtocolsPage,
};

pub struct App {
    pub active: PageId,
    pub alerts: Alerts,
    pub show_help: bool,
    pub should_quit: bool,
    pub base_url: String,
    dashboard: DashboardPage,
    packets: PacketsPage,
    flows: FlowsPage,
    protocols: ProtocolsPage,
    anomalies: AnomaliesPage,
    sequencer: Sequencer,
    outbox: Vec<(Ticket, Job)>,
}

impl App {
    pub fn new(config: &Config) -> Self {
        Self {
            active: PageId::Dashboard,
            alerts: Alerts::default(),
            show_help: false,
            should_quit: false,
            base_url: config.api.base_url.clone(),
            dashboard: DashboardPage::new(&config.ui),
            packets: PacketsPage::new(&config.ui),
            flows: FlowsPage::new(&config.ui),
            protocols: ProtocolsPage::new(&config.ui),
            anomalies: AnomaliesPage::new(&config.ui),
            sequencer: Sequencer::default(),
            outbox: Vec::new(),
        }
    }

    pub fn page(&self, id: PageId) -> &dyn Page {
        match id {
            PageId::Dashboard => &self.dashboard,
            PageId::Packets => &self.packets,
            PageId::Flows => &self.flows,
            PageId::Protocols => &self.protocols,
            PageId::Anomalies => &self.anomalies,
        }
    }

    pub fn page_mut(&mut self, id: PageId) -> &mut dyn Page {
        match id {
            PageId::Dashboard => &mut self.dashboard,
            PageId::Packets => &mut self.packets,
            PageId::Flows => &mut self.flows,
            PageId::Protocols => &mut self.protocols,
            PageId::Anomalies => &mut self.anomalies,
        }
    }

    /// Loads the landing page.
    pub fn start(&mut self, now: Instant) {
        self.reload(now);
    }

    fn reload(&mut self, now: Instant) {
        let active = self.active;
        let mut fx = Effects::default();
        self.page_mut(active).activate(now, &mut fx);
        self.run_effects(active, fx);
    }

    pub fn switch_to(&mut self, id: PageId, now: Instant) {
        if id == self.active {
            return;
        }
        tracing::debug!(page = id.title(), "switching page");
        self.active = id;
        self.reload(now);
    }

    pub fn tick(&mut self, now: Instant) {
        self.alerts.prune(now);
        let active = self.active;
        let mut fx = Effects::default();
        self.page_mut(active).tick(now, &mut fx);
        self.run_effects(active, fx);
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let now = Instant::now();
        let active = self.active;

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        if !self.page(active).editing() {
            match key.code {
                KeyCode::Char('q') => {
                    self.should_quit = true;
                    return;
                }
                KeyCode::Tab => return self.switch_to(active.next(), now),
                KeyCode::BackTab => return self.switch_to(active.prev(), now),
                KeyCode::Char(c @ '1'..='5') => {
                    let index = c as usize - '1' as usize;
                    return self.switch_to(PageId::ALL[index], now);
                }
                KeyCode::Char('r') => return self.reload(now),
                KeyCode::Char('?') => {
                    self.show_help = !self.show_help;
                    return;
                }
                _ => {}
            }
        }

        let mut fx = Effects::default();
        let handled = self.page_mut(active).handle_key(key, &mut fx);
        self.run_effects(active, fx);
        if !handled && key.code == KeyCode::Esc {
            self.alerts.dismiss_latest();
        }
    }

    /// Hands a finished request to the page that issued it, unless a newer
    /// response for the same feed has already been applied.
    pub fn apply(&mut self, update: Update) {
        let Update { ticket, result } = update;
        if !self.sequencer.accept(&ticket) {
            return;
        }
        let mut fx = Effects::default();
        let page = self.page_mut(ticket.origin);
        match result {
            Ok(payload) => page.apply(payload, &mut fx),
            Err(err) => page.fail(ticket.feed, &err, &mut fx),
        }
        self.run_effects(ticket.origin, fx);
    }

    fn run_effects(&mut self, origin: PageId, fx: Effects) {
        for job in fx.jobs {
            let ticket = self.sequencer.issue(origin, job.feed());
            self.outbox.push((ticket, job));
        }
        for (level, message) in fx.alerts {
            match level {
                Level::Danger => tracing::warn!(page = origin.title(), %message, "alert"),
                _ => tracing::info!(page = origin.title(), %message, "alert"),
            }
            self.alerts.push(level, message);
        }
    }

    /// Requests queued since the last call, in issue order.
    pub fn take_jobs(&mut self) -> Vec<(Ticket, Job)> {
        std::mem::take(&mut self.outbox)
    }
}
