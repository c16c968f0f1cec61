use std::fmt;

/// Closed set of state identifiers a [`StateMachine`] can hold.
///
/// Every kind maps to a unique slot index in `0..ALL.len()`, so the registry is
/// a plain array instead of a type-keyed map.
pub trait StateKind: Copy + Eq + fmt::Debug + 'static {
    /// Every kind, in slot order.
    const ALL: &'static [Self];

    fn index(self) -> usize;
}

/// Returned by [`State::enter`] when the state cannot activate (no target in
/// range, nothing to grab, ...). The machine falls back to its default kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryRefused;

/// One mode of a [`StateMachine`].
///
/// `Context<'a>` is whatever the states share; it is handed in by the driver on
/// every call so states never hold borrows across steps. Transitions are
/// *requested* by returning `Some(kind)` from [`tick`](State::tick) or
/// [`on_event`](State::on_event) and applied by the machine before the call
/// returns.
pub trait State {
    type Kind: StateKind;
    type Event;
    type Context<'a>;

    fn kind(&self) -> Self::Kind;

    /// Cheap pre-check run before the current state exits. Returning `false`
    /// leaves the machine where it is.
    fn can_enter(&self, _ctx: &Self::Context<'_>) -> bool {
        true
    }

    fn enter(&mut self, ctx: &mut Self::Context<'_>) -> Result<(), EntryRefused>;

    fn tick(&mut self, ctx: &mut Self::Context<'_>, dt: f32) -> Option<Self::Kind>;

    fn exit(&mut self, ctx: &mut Self::Context<'_>);

    fn on_event(
        &mut self,
        _ctx: &mut Self::Context<'_>,
        _event: &Self::Event,
    ) -> Option<Self::Kind> {
        None
    }
}

/// Configuration errors. These are setup bugs, not runtime conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsmError {
    /// A second instance of an already-registered kind was added.
    DuplicateState(String),
    /// `switch_state` named a kind that was never registered.
    UnregisteredState(String),
}

impl fmt::Display for FsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsmError::DuplicateState(kind) => {
                write!(f, "state {} registered twice", kind)
            }
            FsmError::UnregisteredState(kind) => write!(
                f,
                "state {} was never registered; add it with add_state() before switching to it",
                kind
            ),
        }
    }
}

impl std::error::Error for FsmError {}

/// Registry + dispatcher for a closed set of states.
///
/// Holds at most one instance per kind (created once, reused for the owner's
/// lifetime), the active kind, the previous kind, and how long the machine has
/// been in its current state.
///
/// # Usage
/// ```ignore
/// let mut fsm = StateMachine::new(MyKind::Idle);
/// fsm.add_state(IdleState::default())?;
/// fsm.switch_state(MyKind::Idle, &mut ctx)?;
/// // Each step:
/// fsm.tick(&mut ctx, dt)?;
/// ```
pub struct StateMachine<S: State> {
    slots: Vec<Option<S>>,
    active: Option<S::Kind>,
    previous: Option<S::Kind>,
    fallback: S::Kind,
    /// Seconds spent in the current state. Reset to 0.0 on each transition.
    pub elapsed: f32,
    entered_this_frame: bool,
}

impl<S: State> StateMachine<S> {
    /// Create an empty machine. `fallback` is activated whenever a state
    /// refuses entry; it must never refuse itself.
    pub fn new(fallback: S::Kind) -> Self {
        Self {
            slots: S::Kind::ALL.iter().map(|_| None).collect(),
            active: None,
            previous: None,
            fallback,
            elapsed: 0.0,
            entered_this_frame: false,
        }
    }

    /// Register one state instance. Each kind may be added once.
    pub fn add_state(&mut self, state: S) -> Result<(), FsmError> {
        let kind = state.kind();
        let slot = &mut self.slots[kind.index()];
        if slot.is_some() {
            log::error!("[fsm] duplicate registration of {:?}", kind);
            return Err(FsmError::DuplicateState(format!("{:?}", kind)));
        }
        *slot = Some(state);
        Ok(())
    }

    pub fn is_registered(&self, kind: S::Kind) -> bool {
        self.slots[kind.index()].is_some()
    }

    pub fn active(&self) -> Option<S::Kind> {
        self.active
    }

    pub fn previous(&self) -> Option<S::Kind> {
        self.previous
    }

    /// Returns `true` only during the step in which the current state was entered.
    pub fn just_entered(&self) -> bool {
        self.entered_this_frame
    }

    pub fn state(&self, kind: S::Kind) -> Option<&S> {
        self.slots[kind.index()].as_ref()
    }

    pub fn state_mut(&mut self, kind: S::Kind) -> Option<&mut S> {
        self.slots[kind.index()].as_mut()
    }

    /// Transition to `kind`.
    ///
    /// - Already active: no-op, no `exit`/`enter` pair fires.
    /// - Not registered: logged at error level and returned; the current state
    ///   is left untouched.
    /// - [`can_enter`](State::can_enter) says no: the current state stays
    ///   active, again without an `exit`/`enter` pair.
    /// - Otherwise the current state exits, then `kind` enters. If it still
    ///   refuses, the fallback kind is entered instead.
    pub fn switch_state(
        &mut self,
        kind: S::Kind,
        ctx: &mut S::Context<'_>,
    ) -> Result<(), FsmError> {
        if self.active == Some(kind) {
            return Ok(());
        }
        if !self.is_registered(kind) {
            log::error!(
                "[fsm] switch to {:?} failed: state was never registered (active: {:?})",
                kind,
                self.active
            );
            return Err(FsmError::UnregisteredState(format!("{:?}", kind)));
        }

        let admitted = kind == self.fallback
            || self.slots[kind.index()]
                .as_ref()
                .map_or(false, |state| state.can_enter(&*ctx));
        if !admitted {
            if self.active.is_some() {
                log::debug!("[fsm] {:?} declined entry, staying in {:?}", kind, self.active);
                return Ok(());
            }
            log::debug!("[fsm] {:?} declined entry, starting in {:?}", kind, self.fallback);
            return self.enter_fallback(ctx);
        }

        if let Some(current) = self.active.take() {
            if let Some(state) = self.slots[current.index()].as_mut() {
                state.exit(ctx);
            }
            self.previous = Some(current);
        }

        let entered = match self.slots[kind.index()].as_mut() {
            Some(state) => state.enter(ctx),
            None => Err(EntryRefused),
        };

        match entered {
            Ok(()) => {
                log::debug!("[fsm] {:?} -> {:?}", self.previous, kind);
                self.install(kind);
                Ok(())
            }
            Err(EntryRefused) if kind != self.fallback => {
                log::debug!("[fsm] {:?} refused entry, falling back to {:?}", kind, self.fallback);
                self.enter_fallback(ctx)
            }
            Err(EntryRefused) => {
                log::warn!("[fsm] fallback state {:?} refused entry; machine is idle", kind);
                Ok(())
            }
        }
    }

    /// Enter the fallback kind unconditionally. A refusal is logged and
    /// ignored since there is nowhere further to fall back to.
    fn enter_fallback(&mut self, ctx: &mut S::Context<'_>) -> Result<(), FsmError> {
        let fallback = self.fallback;
        let Some(state) = self.slots[fallback.index()].as_mut() else {
            log::error!("[fsm] fallback state {:?} was never registered", fallback);
            return Err(FsmError::UnregisteredState(format!("{:?}", fallback)));
        };
        if state.enter(ctx).is_err() {
            log::warn!("[fsm] fallback state {:?} refused entry", fallback);
        }
        self.install(fallback);
        Ok(())
    }

    fn install(&mut self, kind: S::Kind) {
        self.active = Some(kind);
        self.elapsed = 0.0;
        self.entered_this_frame = true;
    }

    /// Forward one simulation step to the active state and apply the transition
    /// it requests, if any.
    pub fn tick(&mut self, ctx: &mut S::Context<'_>, dt: f32) -> Result<(), FsmError> {
        self.entered_this_frame = false;
        let Some(kind) = self.active else {
            return Ok(());
        };
        self.elapsed += dt;
        let next = match self.slots[kind.index()].as_mut() {
            Some(state) => state.tick(ctx, dt),
            None => None,
        };
        match next {
            Some(next) => self.switch_state(next, ctx),
            None => Ok(()),
        }
    }

    /// Deliver a discrete event to the active state.
    pub fn dispatch(&mut self, ctx: &mut S::Context<'_>, event: &S::Event) -> Result<(), FsmError> {
        let Some(kind) = self.active else {
            return Ok(());
        };
        let next = match self.slots[kind.index()].as_mut() {
            Some(state) => state.on_event(ctx, event),
            None => None,
        };
        match next {
            Some(next) => self.switch_state(next, ctx),
            None => Ok(()),
        }
    }

    /// Exit the active state without entering another one.
    pub fn shutdown(&mut self, ctx: &mut S::Context<'_>) {
        if let Some(current) = self.active.take() {
            if let Some(state) = self.slots[current.index()].as_mut() {
                state.exit(ctx);
            }
            self.previous = Some(current);
        }
    }
}
