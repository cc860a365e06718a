use crate::accounts::{self, CurrentUser};
use crate::config::Config;
use crate::display::{DisplaySink, Hints};
use crate::solve::{SessionHistory, SolveRecord};
use crate::stats::Aggregates;
use crate::storage::{KeyValueStore, Storage};
use crate::timer::{TimerSession, Transition};
use std::time::Instant;

/// Ties the timer to history, statistics, persistence and presentation.
///
/// Each handled input ends with exactly one frame pushed to the display.
/// A finished solve is appended once, the aggregates are rebuilt from the
/// whole history, and the history is written once.
#[derive(Debug)]
pub struct Session<S: KeyValueStore, D: DisplaySink> {
    timer: TimerSession,
    history: SessionHistory,
    aggregates: Aggregates,
    storage: Storage<S>,
    current_user: Option<CurrentUser>,
    display: D,
}

impl<S: KeyValueStore, D: DisplaySink> Session<S, D> {
    pub fn new(config: &Config, storage: Storage<S>, display: D) -> Self {
        let history = storage.load_session_history();
        let current_user = storage.load_current_user();
        log::info!(
            "loaded {} solves{}",
            history.len(),
            current_user
                .as_ref()
                .map(|u| format!(" for {}", u.username))
                .unwrap_or_default()
        );

        let mut session = Self {
            timer: TimerSession::new(config.inspection, config.scramble_length),
            aggregates: Aggregates::recompute(&history.times()),
            history,
            storage,
            current_user,
            display,
        };
        session.notify();
        session
    }

    pub fn timer(&self) -> &TimerSession {
        &self.timer
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn aggregates(&self) -> &Aggregates {
        &self.aggregates
    }

    pub fn current_user(&self) -> Option<&CurrentUser> {
        self.current_user.as_ref()
    }

    pub fn storage(&self) -> &Storage<S> {
        &self.storage
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn key_down(&mut self, at: Instant) -> Transition {
        let transition = self.timer.key_down(at);
        self.notify();
        transition
    }

    pub fn key_up(&mut self, at: Instant) -> Transition {
        let transition = self.timer.key_up(at);
        if let Transition::Stopped(record) = &transition {
            self.complete(record.clone());
        }
        self.notify();
        transition
    }

    pub fn tick(&mut self, at: Instant) -> Transition {
        let transition = self.timer.tick(at);
        if transition != Transition::Ignored {
            self.notify();
        }
        transition
    }

    pub fn new_scramble(&mut self) -> bool {
        let accepted = self.timer.request_new_scramble();
        self.notify();
        accepted
    }

    pub fn toggle_inspection(&mut self) -> bool {
        let enabled = !self.timer.inspection_enabled();
        let accepted = self.timer.set_inspection(enabled);
        self.notify();
        accepted
    }

    pub fn set_hints(&mut self, hints: Hints) {
        self.timer.set_hints(hints);
        self.notify();
    }

    fn complete(&mut self, record: SolveRecord) {
        let time = record.elapsed_seconds;
        self.history.append(record);
        self.aggregates = Aggregates::recompute(&self.history.times());
        log::info!(
            "solve #{} in {:.2}s (best {:?})",
            self.history.len(),
            time,
            self.aggregates.best
        );

        if let Err(e) = self.storage.save_session_history(&self.history) {
            log::warn!("could not save session history: {}", e);
        }

        if let Some(user) = &self.current_user {
            if let Err(e) = accounts::record_time(&mut self.storage, user, time) {
                log::warn!("could not record time for {}: {}", user.username, e);
            }
        }
    }

    fn notify(&mut self) {
        self.display.show(&self.timer.frame());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{LatestFrame, Phase};
    use crate::storage::{MemoryStore, SESSION_KEY};
    use assert_matches::assert_matches;
    use std::time::Duration;

    fn config() -> Config {
        Config {
            inspection: false,
            ..Config::default()
        }
    }

    fn solve<S: KeyValueStore, D: DisplaySink>(
        session: &mut Session<S, D>,
        t0: Instant,
        millis: u64,
    ) -> Instant {
        session.key_down(t0);
        let started = t0 + Duration::from_millis(300);
        session.key_up(started);
        let stopped = started + Duration::from_millis(millis);
        assert_matches!(session.key_up(stopped), Transition::Stopped(_));
        stopped
    }

    #[test]
    fn test_stop_appends_recomputes_and_writes_once() {
        let mut session = Session::new(
            &config(),
            Storage::new(MemoryStore::new()),
            LatestFrame::default(),
        );
        let t0 = Instant::now();

        session.key_down(t0);
        session.key_up(t0 + Duration::from_millis(300));
        assert_eq!(session.storage().store().writes(), 0);

        session.key_up(t0 + Duration::from_millis(10_300));

        assert_eq!(session.history().len(), 1);
        assert_eq!(session.aggregates().count, 1);
        assert_eq!(session.aggregates().best, Some(10.0));
        assert_eq!(session.storage().store().writes(), 1);
        assert_eq!(session.storage().load_session_history(), *session.history());
    }

    #[test]
    fn test_every_event_notifies_display_once() {
        let mut session = Session::new(
            &config(),
            Storage::new(MemoryStore::new()),
            LatestFrame::default(),
        );
        assert_eq!(session.display().updates, 1);

        let t0 = Instant::now();
        session.key_down(t0);
        session.key_up(t0 + Duration::from_millis(100));
        assert_eq!(session.display().updates, 3);

        let frame = session.display().frame.clone().unwrap();
        assert_eq!(frame.phase, Phase::Idle);
        assert_eq!(frame.hint, "Released too early (0.10s)");
    }

    #[test]
    fn test_idle_tick_does_not_notify() {
        let mut session = Session::new(
            &config(),
            Storage::new(MemoryStore::new()),
            LatestFrame::default(),
        );
        session.tick(Instant::now());
        assert_eq!(session.display().updates, 1);
    }

    #[test]
    fn test_history_reloads_into_new_session() {
        let mut first = Session::new(
            &config(),
            Storage::new(MemoryStore::new()),
            LatestFrame::default(),
        );
        let mut t = Instant::now();
        for millis in [12_340, 10_000, 15_500, 9_990, 20_000] {
            t = solve(&mut first, t, millis) + Duration::from_secs(1);
        }

        let store = first.storage().store().clone();
        let second = Session::new(&config(), Storage::new(store), LatestFrame::default());

        assert_eq!(second.history(), first.history());
        assert_eq!(second.aggregates(), first.aggregates());
        assert!((second.aggregates().best.unwrap() - 9.99).abs() < 1e-9);
        assert_eq!(second.aggregates().worst, Some(20.0));
        assert!((second.aggregates().average_of_5.unwrap() - 13.566).abs() < 1e-9);
    }

    #[test]
    fn test_logged_in_user_receives_times() {
        let mut storage = Storage::new(MemoryStore::new());
        let user = accounts::sign_up(&mut storage, "ana", "ana@x", "pw", "pw").unwrap();
        let mut session = Session::new(&config(), storage, LatestFrame::default());
        assert_eq!(session.current_user(), Some(&user));

        solve(&mut session, Instant::now(), 8_000);

        let profile = accounts::profile(session.storage(), &user);
        assert_eq!(profile.times, vec![8.0]);
    }

    #[test]
    fn test_new_scramble_refused_while_running() {
        let mut session = Session::new(
            &config(),
            Storage::new(MemoryStore::new()),
            LatestFrame::default(),
        );
        let t0 = Instant::now();
        session.key_down(t0);
        session.key_up(t0 + Duration::from_millis(400));

        assert!(!session.new_scramble());
        assert!(!session.toggle_inspection());
        assert!(!session.timer().inspection_enabled());
    }

    #[test]
    fn test_corrupt_history_starts_empty() {
        let mut store = MemoryStore::new();
        store.set(SESSION_KEY, "garbage").unwrap();

        let session = Session::new(&config(), Storage::new(store), LatestFrame::default());
        assert!(session.history().is_empty());
        assert_eq!(session.aggregates(), &Aggregates::default());
    }
}
