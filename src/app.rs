use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::ConfigSources;
use crate::db::{Analytics, Db};
use crate::docs::{self, DocSegment};
use crate::models::{AnalyticsSnapshot, ChannelShorts, Section};
use crate::period::Period;
use crate::services::ShortsFetcher;
use crate::tui::AppAction;

pub const MIN_VIDEOS_PER_CHANNEL: usize = 3;
pub const MAX_VIDEOS_PER_CHANNEL: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Analytics,
    Videos,
    ArchitectureOverview,
    ArchitectureDeepdive,
}

impl Page {
    pub const ALL: [Page; 4] = [
        Page::Analytics,
        Page::Videos,
        Page::ArchitectureOverview,
        Page::ArchitectureDeepdive,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Page::Analytics => "Analytics",
            Page::Videos => "Videos",
            Page::ArchitectureOverview => "Architecture Overview",
            Page::ArchitectureDeepdive => "Architecture Deepdive",
        }
    }

    pub fn next(&self) -> Page {
        let index = Page::ALL.iter().position(|p| p == self).unwrap_or(0);
        Page::ALL[(index + 1) % Page::ALL.len()]
    }
}

pub struct App {
    // UI state
    pub page: Page,
    pub period: Period,
    pub scroll: u16,
    pub show_help: bool,

    // Analytics state (snapshots are tagged with their period so a stale
    // in-flight load cannot overwrite a newer selection)
    pub snapshot: Option<AnalyticsSnapshot>,
    pub is_loading_analytics: bool,
    snapshot_rx: mpsc::Receiver<(Period, AnalyticsSnapshot)>,
    snapshot_tx: mpsc::Sender<(Period, AnalyticsSnapshot)>,

    // Videos state (results arrive in completion order)
    pub channels: BTreeMap<String, String>,
    pub videos: Vec<ChannelShorts>,
    pub videos_per_channel: usize,
    pub is_loading_videos: bool,
    pending_channels: usize,
    shorts_rx: mpsc::Receiver<ChannelShorts>,
    shorts_tx: mpsc::Sender<ChannelShorts>,

    // Architecture documents
    pub overview: Section<Vec<DocSegment>>,
    pub deepdive: Section<Vec<DocSegment>>,

    // Services
    analytics: Arc<Analytics>,
    fetcher: Arc<ShortsFetcher>,
}

impl App {
    pub fn new(sources: &ConfigSources) -> Self {
        let analytics = Arc::new(Analytics::new(Db::new(sources.db_config())));
        let fetcher = Arc::new(ShortsFetcher::new());
        let channels = sources.channel_links();

        let (snapshot_tx, snapshot_rx) = mpsc::channel(1);
        let (shorts_tx, shorts_rx) = mpsc::channel(16);

        let mut app = Self {
            page: Page::Analytics,
            period: Period::default(),
            scroll: 0,
            show_help: false,
            snapshot: None,
            is_loading_analytics: false,
            snapshot_rx,
            snapshot_tx,
            channels,
            videos: Vec::new(),
            videos_per_channel: MIN_VIDEOS_PER_CHANNEL,
            is_loading_videos: false,
            pending_channels: 0,
            shorts_rx,
            shorts_tx,
            overview: docs::load(docs::OVERVIEW_PATH).map_err(|e| e.to_string()),
            deepdive: docs::load(docs::DEEPDIVE_PATH).map_err(|e| e.to_string()),
            analytics,
            fetcher,
        };
        app.reload_analytics();
        app
    }

    /// Drain completed background work; called once per render tick.
    pub fn poll_results(&mut self) {
        while let Ok((period, snapshot)) = self.snapshot_rx.try_recv() {
            if period == self.period {
                self.snapshot = Some(snapshot);
                self.is_loading_analytics = false;
            }
        }
        while let Ok(channel) = self.shorts_rx.try_recv() {
            self.videos.push(channel);
            self.pending_channels = self.pending_channels.saturating_sub(1);
            if self.pending_channels == 0 {
                self.is_loading_videos = false;
            }
        }
    }

    pub fn handle_action(&mut self, action: AppAction) -> bool {
        match action {
            AppAction::Quit => return true,

            AppAction::GoTo(page) => self.switch_to(page),
            AppAction::NextPage => self.switch_to(self.page.next()),

            AppAction::CyclePeriod => {
                if self.page == Page::Analytics {
                    self.period = self.period.next();
                    self.snapshot = None;
                    self.is_loading_analytics = false;
                    self.reload_analytics();
                }
            }

            AppAction::Refresh => self.refresh_current_page(),

            AppAction::ScrollUp => self.scroll = self.scroll.saturating_sub(1),
            AppAction::ScrollDown => self.scroll = self.scroll.saturating_add(1),

            AppAction::MoreVideos => {
                if self.page == Page::Videos
                    && self.videos_per_channel < MAX_VIDEOS_PER_CHANNEL
                    && !self.is_loading_videos
                {
                    self.videos_per_channel += 1;
                    self.reload_videos();
                }
            }
            AppAction::FewerVideos => {
                if self.page == Page::Videos
                    && self.videos_per_channel > MIN_VIDEOS_PER_CHANNEL
                    && !self.is_loading_videos
                {
                    self.videos_per_channel -= 1;
                    self.reload_videos();
                }
            }

            AppAction::ShowHelp => self.show_help = true,
            AppAction::HideHelp => self.show_help = false,
        }
        false
    }

    fn switch_to(&mut self, page: Page) {
        self.page = page;
        self.scroll = 0;
        if page == Page::Videos && self.videos.is_empty() && !self.is_loading_videos {
            self.reload_videos();
        }
    }

    fn refresh_current_page(&mut self) {
        match self.page {
            Page::Analytics => {
                self.snapshot = None;
                self.is_loading_analytics = false;
                self.reload_analytics();
            }
            Page::Videos => self.reload_videos(),
            Page::ArchitectureOverview => {
                self.overview = docs::load(docs::OVERVIEW_PATH).map_err(|e| e.to_string());
            }
            Page::ArchitectureDeepdive => {
                self.deepdive = docs::load(docs::DEEPDIVE_PATH).map_err(|e| e.to_string());
            }
        }
    }

    fn reload_analytics(&mut self) {
        if self.is_loading_analytics {
            return;
        }
        self.is_loading_analytics = true;

        let analytics = Arc::clone(&self.analytics);
        let period = self.period;
        let window = period.window();
        let tx = self.snapshot_tx.clone();
        tokio::spawn(async move {
            let snapshot = analytics.snapshot(&window).await;
            let _ = tx.send((period, snapshot)).await;
        });
    }

    fn reload_videos(&mut self) {
        if self.is_loading_videos || self.channels.is_empty() {
            return;
        }
        self.is_loading_videos = true;
        self.videos.clear();
        self.pending_channels = self.channels.len();

        let fetcher = Arc::clone(&self.fetcher);
        let channels = self.channels.clone();
        let max_entries = self.videos_per_channel;
        let tx = self.shorts_tx.clone();
        tokio::spawn(async move {
            fetcher.fetch_all(channels, max_entries, tx).await;
        });
    }
}
