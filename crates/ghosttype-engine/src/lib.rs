//! Ghosttype Engine
//!
//! Coordinates the inline-suggestion lifecycle over a raw keystroke stream:
//! - buffers and debounces qualifying keystrokes
//! - triggers asynchronous completion requests when the user pauses
//! - tracks the single candidate suggestion (idle → pending → active)
//! - drives the synthetic injector to render, accept, and reject it
//!
//! Everything mutable — buffer, suggestion state, modifier flag, debounce
//! timer, request generation — is owned by one actor task fed by a
//! single-consumer command channel. The hook thread enqueues key events
//! through [`EngineHandle`] (dropping them while the injector's re-entrancy
//! guard is set); debounce fires and completion results come back through
//! the same channel, so every state transition is serialized and the
//! "refuse a new request unless idle" check is atomic by construction.
use std::sync::Arc;

use completion::CompletionProvider;
use hookev::{EventKind, Key, KeyEvent};
use keycast::{InjectGuard, Injector};
use screenctx::ContextSource;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, trace, warn};

mod buffer;
mod config;
mod debounce;
mod error;
mod pipeline;
mod stats;
mod suggestion;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use stats::{Stats, StatsSnapshot};
pub use suggestion::Suggestion;

use buffer::Buffer;
use debounce::Debounce;

/// Commands consumed by the engine actor. Key events, timer fires, and
/// completion results all funnel through one channel so the actor is the
/// single writer of all suggestion state.
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    /// A key event from the global hook (already guard-filtered).
    Key(KeyEvent),
    /// The debounce timer armed with this sequence number elapsed.
    PauseElapsed {
        /// Arm sequence the timer belonged to; stale fires are ignored.
        seq: u64,
    },
    /// A completion request finished.
    Completion {
        /// Request generation; mismatches mean the user typed meanwhile.
        generation: u64,
        /// Cleaned candidate, or nothing useful.
        candidate: Option<String>,
    },
    /// Stop the actor and report final stats.
    Shutdown,
}

/// Cheap handle for threads outside the actor: the hook callback and the
/// process shutdown path.
#[derive(Clone)]
pub struct EngineHandle {
    tx: UnboundedSender<Cmd>,
    guard: InjectGuard,
    stats: Arc<Stats>,
}

impl EngineHandle {
    /// Entry point for the hook thread. Must stay cheap: it runs inline
    /// with OS keystroke delivery.
    ///
    /// While the guard is set, everything arriving here is the engine's own
    /// synthetic output echoed back by the hook; it must not re-enter the
    /// engine. The guard — not anything on the event — is the only reliable
    /// signal, so it is checked here at the dispatch boundary.
    pub fn on_hook_event(&self, ev: KeyEvent) {
        if self.guard.is_active() {
            trace!(?ev, "suppressed_synthetic_event");
            return;
        }
        let _ = self.tx.send(Cmd::Key(ev));
    }

    /// Ask the actor to stop.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Cmd::Shutdown);
    }

    /// Current session counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

/// The engine actor. Construct with [`Engine::new`], hand the
/// [`EngineHandle`] to the hook thread, and drive with [`Engine::run`].
pub struct Engine {
    cfg: EngineConfig,
    buffer: Buffer,
    suggestion: Suggestion,
    /// Monotonic request generation; bumped whenever an in-flight request
    /// becomes stale so its late result can be recognized and discarded.
    generation: u64,
    ctrl_down: bool,
    debounce: Debounce,
    injector: Arc<Injector>,
    context: Arc<dyn ContextSource>,
    provider: Arc<dyn CompletionProvider>,
    stats: Arc<Stats>,
    tx: UnboundedSender<Cmd>,
    rx: UnboundedReceiver<Cmd>,
}

impl Engine {
    /// Create an engine and the handle used to feed and stop it.
    pub fn new(
        cfg: EngineConfig,
        injector: Arc<Injector>,
        context: Arc<dyn ContextSource>,
        provider: Arc<dyn CompletionProvider>,
    ) -> (Self, EngineHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let stats = Arc::new(Stats::default());
        let handle = EngineHandle {
            tx: tx.clone(),
            guard: injector.guard(),
            stats: stats.clone(),
        };
        let engine = Self {
            buffer: Buffer::new(cfg.buffer_cap),
            suggestion: Suggestion::Idle,
            generation: 0,
            ctrl_down: false,
            debounce: Debounce::new(cfg.pause, tx.clone()),
            cfg,
            injector,
            context,
            provider,
            stats,
            tx,
            rx,
        };
        (engine, handle)
    }

    /// Run the actor until shutdown; returns the final session counters.
    pub async fn run(mut self) -> StatsSnapshot {
        while self.step().await {}
        self.debounce.cancel();
        self.stats.snapshot()
    }

    /// Process one command. Returns false when the actor should stop.
    async fn step(&mut self) -> bool {
        match self.rx.recv().await {
            Some(cmd) => self.handle_cmd(cmd).await,
            None => false,
        }
    }

    async fn handle_cmd(&mut self, cmd: Cmd) -> bool {
        match cmd {
            Cmd::Key(ev) => self.handle_key(ev).await,
            Cmd::PauseElapsed { seq } => self.handle_pause(seq),
            Cmd::Completion {
                generation,
                candidate,
            } => self.handle_completion(generation, candidate).await,
            Cmd::Shutdown => return false,
        }
        true
    }

    async fn handle_key(&mut self, ev: KeyEvent) {
        match ev.kind {
            EventKind::Up => {
                if ev.key == Key::Ctrl {
                    self.ctrl_down = false;
                }
                return;
            }
            EventKind::Down => {}
        }

        if ev.key == Key::Ctrl {
            self.ctrl_down = true;
            return;
        }
        if self.ctrl_down
            && matches!(ev.key, Key::Char(c) if c.eq_ignore_ascii_case(&self.cfg.reset_key))
        {
            self.reset_context().await;
            return;
        }

        // Every qualifying key restarts the pause clock.
        self.debounce.cancel();
        self.stats.record_input();

        if let Suggestion::Active { text } = self.suggestion.clone() {
            match ev.key {
                Key::Tab => {
                    self.accept(text).await;
                    return;
                }
                Key::Escape => {
                    self.reject(&text).await;
                    return;
                }
                _ => {
                    // The rendered text is left in place, still selected, so
                    // this keystroke overwrites it through ordinary
                    // selection replacement. No removal is emitted.
                    trace!("suggestion_superseded");
                    self.suggestion = Suggestion::Idle;
                }
            }
        }
        if matches!(self.suggestion, Suggestion::Pending { .. }) {
            self.invalidate_pending();
        }

        match ev.key {
            Key::Char(c) => self.buffer.append(c),
            Key::Space => self.buffer.append(' '),
            Key::Backspace => self.buffer.backspace(),
            Key::Enter => {
                // A committed line is a finished thought; completing it
                // helps nobody.
                self.buffer.clear();
                return;
            }
            _ => {}
        }

        if self.buffer.trimmed_len() > self.cfg.trigger_min_chars {
            self.debounce.arm();
        }
    }

    /// Ctrl+<reset key>: drop all accumulated context. Repeats are no-ops.
    async fn reset_context(&mut self) {
        info!("context_reset");
        self.debounce.cancel();
        match std::mem::replace(&mut self.suggestion, Suggestion::Idle) {
            Suggestion::Active { text } => {
                let len = text.chars().count();
                if let Err(e) = self.run_injection(move |inj| inj.remove(len)).await {
                    warn!(error = %e, "failed_to_remove_suggestion_on_reset");
                }
            }
            Suggestion::Pending { .. } => self.generation += 1,
            Suggestion::Idle => {}
        }
        self.buffer.clear();
    }

    /// A keystroke arrived while a request was in flight: the snapshot it
    /// was built from is outdated, so its result must never render.
    fn invalidate_pending(&mut self) {
        self.generation += 1;
        self.suggestion = Suggestion::Idle;
        trace!(generation = self.generation, "pending_request_invalidated");
    }

    fn handle_pause(&mut self, seq: u64) {
        if seq != self.debounce.current_seq() {
            trace!(seq, "stale_debounce_fire_ignored");
            return;
        }
        if !self.suggestion.is_idle() {
            // Either a request is already in flight or a suggestion is on
            // screen; never start a second one.
            trace!("pause_ignored_not_idle");
            return;
        }
        if self.buffer.trimmed_len() <= self.cfg.trigger_min_chars {
            return;
        }

        self.generation += 1;
        let generation = self.generation;
        self.suggestion = Suggestion::Pending { generation };
        let text = self.buffer.snapshot();
        debug!(generation, chars = text.len(), "pause_detected");
        pipeline::spawn_request(
            generation,
            text,
            self.context.clone(),
            self.provider.clone(),
            self.tx.clone(),
        );
    }

    async fn handle_completion(&mut self, generation: u64, candidate: Option<String>) {
        match self.suggestion {
            Suggestion::Pending { generation: g } if g == generation => {}
            _ => {
                trace!(generation, "stale_completion_discarded");
                return;
            }
        }
        let Some(text) = candidate else {
            self.suggestion = Suggestion::Idle;
            return;
        };

        let rendered = text.clone();
        match self.run_injection(move |inj| inj.render(&rendered)).await {
            Ok(()) => {
                self.stats.record_shown();
                info!(chars = text.chars().count(), "suggestion_shown");
                self.suggestion = Suggestion::Active { text };
            }
            Err(e) => {
                // Partial render is an accepted risk; state must still
                // return to idle with the guard already cleared.
                warn!(error = %e, "failed_to_render_suggestion");
                self.suggestion = Suggestion::Idle;
            }
        }
    }

    async fn accept(&mut self, text: String) {
        match self.run_injection(|inj| inj.accept()).await {
            Ok(()) => {
                info!(chars = text.chars().count(), "suggestion_accepted");
                self.buffer.extend(&text);
            }
            Err(e) => warn!(error = %e, "failed_to_accept_suggestion"),
        }
        self.suggestion = Suggestion::Idle;
    }

    async fn reject(&mut self, text: &str) {
        let len = text.chars().count();
        if let Err(e) = self.run_injection(move |inj| inj.remove(len)).await {
            warn!(error = %e, "failed_to_remove_suggestion");
        }
        info!("suggestion_rejected");
        self.suggestion = Suggestion::Idle;
    }

    /// Run an injector operation off the async runtime. The injector paces
    /// itself with blocking sleeps; awaiting the blocking task here keeps
    /// injections serialized with command processing, so no key command is
    /// handled mid-injection.
    async fn run_injection<F>(&self, op: F) -> Result<()>
    where
        F: FnOnce(&Injector) -> keycast::Result<()> + Send + 'static,
    {
        let inj = self.injector.clone();
        tokio::task::spawn_blocking(move || op(&inj))
            .await
            .map_err(|e| Error::InjectTask(e.to_string()))?
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;
    use keycast::{RecordingSink, SynthKey};
    use screenctx::{ScreenContext, StaticContext};

    use super::*;

    /// Provider returning a fixed reply (or a fixed failure) and counting
    /// calls.
    struct FixedProvider {
        reply: Option<String>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CompletionProvider for FixedProvider {
        async fn complete(&self, _parts: &[String]) -> completion::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Some(s) => Ok(s.clone()),
                None => Err(completion::Error::Status(500)),
            }
        }
    }

    struct Rig {
        engine: Engine,
        handle: EngineHandle,
        sink: RecordingSink,
        calls: Arc<AtomicUsize>,
    }

    fn rig(reply: Option<&str>) -> Rig {
        let sink = RecordingSink::new();
        let injector = Arc::new(Injector::new(Box::new(sink.clone()), Duration::ZERO));
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Arc::new(FixedProvider {
            reply: reply.map(str::to_string),
            calls: calls.clone(),
        });
        let context = Arc::new(StaticContext(ScreenContext {
            window_title: "Editor".into(),
            ocr_text: "nearby screen text".into(),
        }));
        let (engine, handle) = Engine::new(EngineConfig::default(), injector, context, provider);
        Rig {
            engine,
            handle,
            sink,
            calls,
        }
    }

    fn down(key: Key) -> KeyEvent {
        KeyEvent {
            kind: EventKind::Down,
            key,
        }
    }

    fn up(key: Key) -> KeyEvent {
        KeyEvent {
            kind: EventKind::Up,
            key,
        }
    }

    async fn type_str(engine: &mut Engine, s: &str) {
        for c in s.chars() {
            let key = if c == ' ' { Key::Space } else { Key::Char(c) };
            engine.handle_key(down(key)).await;
        }
    }

    /// Drive: type, wait out the pause, process the fire and the completion.
    async fn pause_and_complete(engine: &mut Engine) {
        tokio::time::advance(Duration::from_millis(701)).await;
        assert!(engine.step().await); // PauseElapsed
        assert!(engine.step().await); // Completion
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_render_types_and_selects_candidate() {
        let mut r = rig(Some("ld, how are you?"));
        type_str(&mut r.engine, "hello wor").await;
        pause_and_complete(&mut r.engine).await;

        assert_eq!(
            r.engine.suggestion.active_text(),
            Some("ld, how are you?")
        );
        let sent = r.sink.sent();
        let typed: String = sent
            .iter()
            .filter_map(|k| match k {
                SynthKey::Char(c) => Some(*c),
                _ => None,
            })
            .collect();
        assert_eq!(typed, "ld, how are you?");
        let selects = sent
            .iter()
            .filter(|k| **k == SynthKey::SelectLeft)
            .count();
        assert_eq!(selects, typed.chars().count());
        assert_eq!(r.handle.stats().suggestions_shown, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_tab_accepts_and_extends_buffer() {
        let mut r = rig(Some("ld"));
        type_str(&mut r.engine, "hello wor").await;
        pause_and_complete(&mut r.engine).await;

        r.engine.handle_key(down(Key::Tab)).await;
        assert_eq!(r.engine.buffer.snapshot(), "hello world");
        assert!(r.engine.suggestion.is_idle());
        assert!(!r.engine.injector.guard().is_active());
        assert_eq!(*r.sink.sent().last().unwrap(), SynthKey::Right);
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_esc_rejects_with_backspaces() {
        let mut r = rig(Some("ld"));
        type_str(&mut r.engine, "hello wor").await;
        pause_and_complete(&mut r.engine).await;

        r.engine.handle_key(down(Key::Escape)).await;
        let backspaces = r
            .sink
            .sent()
            .iter()
            .filter(|k| **k == SynthKey::Backspace)
            .count();
        assert_eq!(backspaces, 2);
        assert_eq!(r.engine.buffer.snapshot(), "hello wor");
        assert!(r.engine.suggestion.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_provider_failure_is_no_suggestion() {
        let mut r = rig(None);
        type_str(&mut r.engine, "hello wor").await;
        pause_and_complete(&mut r.engine).await;

        assert!(r.engine.suggestion.is_idle());
        assert!(r.sink.sent().is_empty());
        assert_eq!(r.handle.stats().suggestions_shown, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn scenario_second_keystroke_rearms_single_fire() {
        let mut r = rig(Some("continuation"));
        type_str(&mut r.engine, "hello").await;
        tokio::time::advance(Duration::from_millis(300)).await;
        type_str(&mut r.engine, " w").await;
        pause_and_complete(&mut r.engine).await;

        assert_eq!(r.calls.load(Ordering::SeqCst), 1);
        // Nothing else queued: the first timer was cancelled, not deferred.
        assert!(r.engine.rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn typing_through_active_suggestion_supersedes_silently() {
        let mut r = rig(Some("ld"));
        type_str(&mut r.engine, "hello wor").await;
        pause_and_complete(&mut r.engine).await;
        let events_after_render = r.sink.sent().len();

        r.engine.handle_key(down(Key::Char('x'))).await;
        assert!(r.engine.suggestion.is_idle());
        // No removal emitted; the selected render is overwritten by the
        // application, not by us.
        assert_eq!(r.sink.sent().len(), events_after_render);
        assert_eq!(r.engine.buffer.snapshot(), "hello worx");
    }

    #[tokio::test(start_paused = true)]
    async fn keystroke_while_pending_discards_late_completion() {
        let mut r = rig(Some("ld"));
        type_str(&mut r.engine, "hello wor").await;
        tokio::time::advance(Duration::from_millis(701)).await;
        assert!(r.engine.step().await); // PauseElapsed -> Pending
        assert!(matches!(
            r.engine.suggestion,
            Suggestion::Pending { .. }
        ));

        r.engine.handle_key(down(Key::Char('x'))).await;
        assert!(r.engine.suggestion.is_idle());

        // The completion for the invalidated generation eventually lands.
        // It must not render. The keystroke re-armed the timer, so skip any
        // later PauseElapsed noise by handling the completion directly.
        loop {
            let cmd = r.engine.rx.recv().await.expect("pipeline result");
            let is_completion = matches!(cmd, Cmd::Completion { .. });
            assert!(r.engine.handle_cmd(cmd).await);
            if is_completion {
                break;
            }
        }
        assert!(r.sink.sent().is_empty());
        assert_eq!(r.handle.stats().suggestions_shown, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn no_request_for_short_buffers() {
        let mut r = rig(Some("whatever"));
        type_str(&mut r.engine, "hi y").await; // trimmed length 4, not > 4
        assert!(!r.engine.debounce.is_armed());

        // Even a forged fire must not start a request.
        let seq = r.engine.debounce.current_seq();
        r.engine.handle_pause(seq);
        assert!(r.engine.suggestion.is_idle());
        assert_eq!(r.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_sequence_fire_is_ignored() {
        let mut r = rig(Some("whatever"));
        type_str(&mut r.engine, "hello").await;
        type_str(&mut r.engine, "!").await; // re-arms, seq moves on
        let old = r.engine.debounce.current_seq() - 1;
        r.engine.handle_pause(old);
        assert!(r.engine.suggestion.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn pause_while_pending_refuses_second_request() {
        let mut r = rig(Some("ld"));
        type_str(&mut r.engine, "hello wor").await;
        tokio::time::advance(Duration::from_millis(701)).await;
        assert!(r.engine.step().await);
        let seq = r.engine.debounce.current_seq();
        r.engine.handle_pause(seq);
        assert_eq!(r.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn context_reset_is_idempotent() {
        let mut r = rig(Some("ld"));
        type_str(&mut r.engine, "hello wor").await;
        r.engine.handle_key(down(Key::Ctrl)).await;
        r.engine.handle_key(down(Key::Char('l'))).await;
        assert!(r.engine.buffer.is_empty());
        assert!(r.engine.suggestion.is_idle());
        assert!(!r.engine.debounce.is_armed());

        let inputs = r.handle.stats().total_inputs;
        r.engine.handle_key(down(Key::Char('l'))).await;
        r.engine.handle_key(down(Key::Char('l'))).await;
        assert!(r.engine.buffer.is_empty());
        // Reset is routed before input accounting; repeats change nothing.
        assert_eq!(r.handle.stats().total_inputs, inputs);
    }

    #[tokio::test(start_paused = true)]
    async fn context_reset_removes_active_suggestion() {
        let mut r = rig(Some("ld"));
        type_str(&mut r.engine, "hello wor").await;
        pause_and_complete(&mut r.engine).await;

        r.engine.handle_key(down(Key::Ctrl)).await;
        r.engine.handle_key(down(Key::Char('l'))).await;
        let backspaces = r
            .sink
            .sent()
            .iter()
            .filter(|k| **k == SynthKey::Backspace)
            .count();
        assert_eq!(backspaces, 2);
        assert!(r.engine.buffer.is_empty());
        assert!(r.engine.suggestion.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn ctrl_release_restores_normal_typing() {
        let mut r = rig(Some("ld"));
        r.engine.handle_key(down(Key::Ctrl)).await;
        r.engine.handle_key(up(Key::Ctrl)).await;
        r.engine.handle_key(down(Key::Char('l'))).await;
        assert_eq!(r.engine.buffer.snapshot(), "l");
    }

    #[tokio::test(start_paused = true)]
    async fn enter_clears_buffer_and_disarms() {
        let mut r = rig(Some("ld"));
        type_str(&mut r.engine, "hello wor").await;
        assert!(r.engine.debounce.is_armed());
        r.engine.handle_key(down(Key::Enter)).await;
        assert!(r.engine.buffer.is_empty());
        assert!(!r.engine.debounce.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn backspace_pops_and_modifiers_do_not_type() {
        let mut r = rig(Some("ld"));
        type_str(&mut r.engine, "abc").await;
        r.engine.handle_key(down(Key::Backspace)).await;
        r.engine.handle_key(down(Key::Shift)).await;
        r.engine.handle_key(down(Key::Other)).await;
        assert_eq!(r.engine.buffer.snapshot(), "ab");
    }

    #[tokio::test(start_paused = true)]
    async fn guarded_hook_events_are_dropped() {
        let mut r = rig(Some("ld"));
        let guard = r.engine.injector.guard();
        {
            let _scope = guard.enter();
            r.handle.on_hook_event(down(Key::Char('z')));
        }
        r.handle.on_hook_event(down(Key::Char('a')));
        assert!(matches!(
            r.engine.rx.try_recv(),
            Ok(Cmd::Key(ev)) if ev == down(Key::Char('a'))
        ));
        assert!(r.engine.rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_reports_final_stats() {
        let r = rig(Some("ld"));
        let handle = r.handle.clone();
        let task = tokio::spawn(r.engine.run());
        handle.on_hook_event(down(Key::Char('a')));
        handle.shutdown();
        let snap = task.await.unwrap();
        assert_eq!(snap.total_inputs, 1);
        assert_eq!(snap.suggestions_shown, 0);
    }
}
