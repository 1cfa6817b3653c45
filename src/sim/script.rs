//! Behavior scripts: cooperative, resumable procedures
//!
//! A script is driven once per tick. It runs synchronously until its next
//! suspension point and reports [`Poll::Pending`] (more to do) or
//! [`Poll::Complete`] (finished). Everything a script does between two
//! suspensions happens inside one tick.
//!
//! Scripts are generic over their context `C`; the game drives them with
//! `C = World`, tests use small stand-in contexts.
//!
//! Suspension primitives: [`wait`], [`wait_until`], [`yield_once`].
//! Composition: [`sequence`], [`repeat`], [`repeat_while`], [`forever`],
//! [`defer`]. Leaf work: [`action`], [`poll_fn`], [`FireOnCooldown`].

use crate::error::Result;

/// Outcome of driving a script for one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// Suspended; drive again next tick
    Pending,
    /// Ran to completion
    Complete,
}

impl Poll {
    pub fn is_complete(self) -> bool {
        self == Poll::Complete
    }
}

/// A resumable procedure over a context `C`
pub trait Script<C> {
    /// Run from the beginning up to the first suspension point.
    /// No time is consumed here.
    fn start(&mut self, _ctx: &mut C) -> Result<Poll> {
        Ok(Poll::Pending)
    }

    /// Resume from the current suspension point with this tick's `dt`
    fn resume(&mut self, dt: f32, ctx: &mut C) -> Result<Poll>;
}

pub type BoxScript<C> = Box<dyn Script<C>>;

/// Suspend until the accumulated `dt` covers `duration`
#[derive(Debug, Clone)]
pub struct Wait {
    duration: f32,
    remaining: f32,
}

impl<C> Script<C> for Wait {
    fn start(&mut self, _ctx: &mut C) -> Result<Poll> {
        self.remaining = self.duration;
        Ok(if self.remaining > 0.0 { Poll::Pending } else { Poll::Complete })
    }

    fn resume(&mut self, dt: f32, _ctx: &mut C) -> Result<Poll> {
        self.remaining -= dt;
        Ok(if self.remaining > 0.0 { Poll::Pending } else { Poll::Complete })
    }
}

/// Suspend until a predicate over the context holds
pub struct WaitUntil<F> {
    predicate: F,
}

impl<C, F> Script<C> for WaitUntil<F>
where
    F: FnMut(&C) -> bool,
{
    fn start(&mut self, ctx: &mut C) -> Result<Poll> {
        Ok(if (self.predicate)(ctx) { Poll::Complete } else { Poll::Pending })
    }

    fn resume(&mut self, _dt: f32, ctx: &mut C) -> Result<Poll> {
        self.start(ctx)
    }
}

/// Suspend for exactly one tick
#[derive(Debug, Clone, Default)]
pub struct YieldOnce;

impl<C> Script<C> for YieldOnce {
    fn resume(&mut self, _dt: f32, _ctx: &mut C) -> Result<Poll> {
        Ok(Poll::Complete)
    }
}

/// Run a closure once, without suspending
pub struct Action<F> {
    run: F,
}

impl<C, F> Script<C> for Action<F>
where
    F: FnMut(&mut C) -> Result<()>,
{
    fn start(&mut self, ctx: &mut C) -> Result<Poll> {
        (self.run)(ctx)?;
        Ok(Poll::Complete)
    }

    fn resume(&mut self, _dt: f32, _ctx: &mut C) -> Result<Poll> {
        Ok(Poll::Complete)
    }
}

/// A hand-written state machine: the closure is called once per tick
pub struct PollFn<F> {
    step: F,
}

impl<C, F> Script<C> for PollFn<F>
where
    F: FnMut(f32, &mut C) -> Result<Poll>,
{
    fn resume(&mut self, dt: f32, ctx: &mut C) -> Result<Poll> {
        (self.step)(dt, ctx)
    }
}

/// Build the real script from the context at the moment it is reached
pub struct Defer<C, F> {
    build: Option<F>,
    inner: Option<BoxScript<C>>,
}

impl<C, F> Script<C> for Defer<C, F>
where
    F: FnOnce(&mut C) -> BoxScript<C>,
{
    fn start(&mut self, ctx: &mut C) -> Result<Poll> {
        let Some(build) = self.build.take() else {
            return Ok(Poll::Complete);
        };
        let mut inner = build(ctx);
        let poll = inner.start(ctx)?;
        self.inner = Some(inner);
        Ok(poll)
    }

    fn resume(&mut self, dt: f32, ctx: &mut C) -> Result<Poll> {
        match self.inner.as_mut() {
            Some(inner) => inner.resume(dt, ctx),
            None => Ok(Poll::Complete),
        }
    }
}

/// Run sub-scripts one after another
pub struct Sequence<C> {
    steps: Vec<BoxScript<C>>,
    index: usize,
}

impl<C> Sequence<C> {
    /// Start steps from `index` until one suspends
    fn run_from(&mut self, ctx: &mut C) -> Result<Poll> {
        while let Some(step) = self.steps.get_mut(self.index) {
            if step.start(ctx)? == Poll::Pending {
                return Ok(Poll::Pending);
            }
            self.index += 1;
        }
        Ok(Poll::Complete)
    }
}

impl<C> Script<C> for Sequence<C> {
    fn start(&mut self, ctx: &mut C) -> Result<Poll> {
        self.index = 0;
        self.run_from(ctx)
    }

    fn resume(&mut self, dt: f32, ctx: &mut C) -> Result<Poll> {
        let Some(step) = self.steps.get_mut(self.index) else {
            return Ok(Poll::Complete);
        };
        if step.resume(dt, ctx)? == Poll::Pending {
            return Ok(Poll::Pending);
        }
        self.index += 1;
        self.run_from(ctx)
    }
}

type Factory<C> = Box<dyn FnMut(u32, &mut C) -> BoxScript<C>>;
type Condition<C> = Box<dyn FnMut(&C) -> bool>;

/// Structured loop: builds a fresh body per iteration.
///
/// An iteration that completes without ever suspending is followed by a
/// one-tick suspension, so an unbounded loop can never spin inside one tick.
pub struct Repeat<C> {
    limit: Option<u32>,
    condition: Option<Condition<C>>,
    factory: Factory<C>,
    iteration: u32,
    body: Option<BoxScript<C>>,
}

impl<C> Repeat<C> {
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    fn may_continue(&mut self, ctx: &C) -> bool {
        if self.limit.is_some_and(|limit| self.iteration >= limit) {
            return false;
        }
        match self.condition.as_mut() {
            Some(condition) => condition(ctx),
            None => true,
        }
    }

    fn begin(&mut self, ctx: &mut C) -> Result<Poll> {
        if !self.may_continue(ctx) {
            return Ok(Poll::Complete);
        }
        let mut body = (self.factory)(self.iteration, ctx);
        self.iteration += 1;
        if body.start(ctx)? == Poll::Pending {
            self.body = Some(body);
        }
        Ok(Poll::Pending)
    }
}

impl<C> Script<C> for Repeat<C> {
    fn start(&mut self, ctx: &mut C) -> Result<Poll> {
        self.iteration = 0;
        self.body = None;
        self.begin(ctx)
    }

    fn resume(&mut self, dt: f32, ctx: &mut C) -> Result<Poll> {
        if let Some(body) = self.body.as_mut() {
            if body.resume(dt, ctx)? == Poll::Pending {
                return Ok(Poll::Pending);
            }
            self.body = None;
        }
        self.begin(ctx)
    }
}

/// A countdown that rests at zero until triggered
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cooldown {
    period: f32,
    remaining: f32,
}

impl Cooldown {
    /// `initial` is the delay before the first trigger is allowed
    pub fn new(period: f32, initial: f32) -> Self {
        Self {
            period,
            remaining: initial.max(0.0),
        }
    }

    pub fn period(&self) -> f32 {
        self.period
    }

    pub fn set_period(&mut self, period: f32) {
        self.period = period;
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn tick(&mut self, dt: f32) {
        self.remaining = (self.remaining - dt).max(0.0);
    }

    pub fn is_ready(&self) -> bool {
        self.remaining <= 0.0
    }

    pub fn trigger(&mut self) {
        self.remaining = self.period;
    }
}

/// Act on a cooldown for as long as a condition holds (e.g. a target exists).
///
/// Each tick the cooldown decays by `dt` first; if it has run out and the
/// condition holds, the action runs and the cooldown restarts. Never completes
/// on its own: the owner's death ends it.
pub struct FireOnCooldown<C> {
    cooldown: Cooldown,
    condition: Condition<C>,
    act: Box<dyn FnMut(&mut C) -> Result<()>>,
}

impl<C> FireOnCooldown<C> {
    pub fn new(
        cooldown: Cooldown,
        condition: impl FnMut(&C) -> bool + 'static,
        act: impl FnMut(&mut C) -> Result<()> + 'static,
    ) -> Self {
        Self {
            cooldown,
            condition: Box::new(condition),
            act: Box::new(act),
        }
    }

    pub fn cooldown(&self) -> &Cooldown {
        &self.cooldown
    }
}

impl<C> Script<C> for FireOnCooldown<C> {
    fn resume(&mut self, dt: f32, ctx: &mut C) -> Result<Poll> {
        self.cooldown.tick(dt);
        if self.cooldown.is_ready() && (self.condition)(ctx) {
            (self.act)(ctx)?;
            self.cooldown.trigger();
        }
        Ok(Poll::Pending)
    }
}

/// Drives one top-level script: starts it on the first tick, then resumes
/// it with each tick's `dt` until it completes.
pub struct ScriptRunner<C> {
    script: BoxScript<C>,
    started: bool,
    done: bool,
}

impl<C> ScriptRunner<C> {
    pub fn new(script: BoxScript<C>) -> Self {
        Self {
            script,
            started: false,
            done: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Advance one tick. Errors leave the runner marked done.
    pub fn tick(&mut self, dt: f32, ctx: &mut C) -> Result<Poll> {
        if self.done {
            return Ok(Poll::Complete);
        }
        let result = self.step(dt, ctx);
        if !matches!(result, Ok(Poll::Pending)) {
            self.done = true;
        }
        result
    }

    fn step(&mut self, dt: f32, ctx: &mut C) -> Result<Poll> {
        if !self.started {
            self.started = true;
            if self.script.start(ctx)? == Poll::Complete {
                return Ok(Poll::Complete);
            }
        }
        self.script.resume(dt, ctx)
    }
}

pub fn wait<C>(duration: f32) -> BoxScript<C> {
    Box::new(Wait {
        duration,
        remaining: duration,
    })
}

pub fn wait_until<C: 'static>(predicate: impl FnMut(&C) -> bool + 'static) -> BoxScript<C> {
    Box::new(WaitUntil { predicate })
}

pub fn yield_once<C>() -> BoxScript<C> {
    Box::new(YieldOnce)
}

pub fn action<C: 'static>(run: impl FnMut(&mut C) -> Result<()> + 'static) -> BoxScript<C> {
    Box::new(Action { run })
}

pub fn poll_fn<C: 'static>(step: impl FnMut(f32, &mut C) -> Result<Poll> + 'static) -> BoxScript<C> {
    Box::new(PollFn { step })
}

pub fn defer<C: 'static>(build: impl FnOnce(&mut C) -> BoxScript<C> + 'static) -> BoxScript<C> {
    Box::new(Defer {
        build: Some(build),
        inner: None,
    })
}

pub fn sequence<C: 'static>(steps: Vec<BoxScript<C>>) -> BoxScript<C> {
    Box::new(Sequence { steps, index: 0 })
}

/// Run `count` iterations of the body built by `factory(iteration, ctx)`
pub fn repeat<C: 'static>(
    count: u32,
    factory: impl FnMut(u32, &mut C) -> BoxScript<C> + 'static,
) -> BoxScript<C> {
    Box::new(Repeat {
        limit: Some(count),
        condition: None,
        factory: Box::new(factory),
        iteration: 0,
        body: None,
    })
}

/// Iterate while `condition` holds, checked before each iteration
pub fn repeat_while<C: 'static>(
    condition: impl FnMut(&C) -> bool + 'static,
    factory: impl FnMut(u32, &mut C) -> BoxScript<C> + 'static,
) -> BoxScript<C> {
    Box::new(Repeat {
        limit: None,
        condition: Some(Box::new(condition)),
        factory: Box::new(factory),
        iteration: 0,
        body: None,
    })
}

pub fn forever<C: 'static>(factory: impl FnMut(u32, &mut C) -> BoxScript<C> + 'static) -> BoxScript<C> {
    Box::new(Repeat {
        limit: None,
        condition: None,
        factory: Box::new(factory),
        iteration: 0,
        body: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;

    #[derive(Default)]
    struct Log {
        tick: u32,
        events: Vec<(u32, &'static str)>,
        enemies: u32,
    }

    impl Log {
        fn note(&mut self, what: &'static str) {
            self.events.push((self.tick, what));
        }
    }

    /// Drive a runner with fixed dt, recording the tick number in the context
    fn drive(runner: &mut ScriptRunner<Log>, log: &mut Log, dt: f32, ticks: u32) -> Poll {
        let mut poll = Poll::Pending;
        for _ in 0..ticks {
            log.tick += 1;
            poll = runner.tick(dt, log).expect("script ok");
        }
        poll
    }

    fn note(what: &'static str) -> BoxScript<Log> {
        action(move |log: &mut Log| {
            log.note(what);
            Ok(())
        })
    }

    fn ticks_of(log: &Log, what: &str) -> Vec<u32> {
        log.events.iter().filter(|(_, w)| *w == what).map(|(t, _)| *t).collect()
    }

    #[test]
    fn test_wait_accumulates_dt() {
        let mut runner = ScriptRunner::new(sequence(vec![wait(1.0), note("done")]));
        let mut log = Log::default();
        assert_eq!(drive(&mut runner, &mut log, 0.25, 3), Poll::Pending);
        assert_eq!(drive(&mut runner, &mut log, 0.25, 1), Poll::Complete);
        assert_eq!(ticks_of(&log, "done"), vec![4]);
    }

    #[test]
    fn test_wait_ignores_zero_dt() {
        let mut runner = ScriptRunner::new(sequence(vec![wait(0.5), note("done")]));
        let mut log = Log::default();
        drive(&mut runner, &mut log, 0.0, 100);
        assert!(log.events.is_empty());
        drive(&mut runner, &mut log, 0.5, 1);
        assert_eq!(ticks_of(&log, "done"), vec![101]);
    }

    #[test]
    fn test_wait_until_checks_each_tick() {
        let script = sequence(vec![wait_until(|log: &Log| log.enemies == 0), note("clear")]);
        let mut runner = ScriptRunner::new(script);
        let mut log = Log {
            enemies: 2,
            ..Default::default()
        };
        drive(&mut runner, &mut log, 0.1, 5);
        assert!(log.events.is_empty());
        log.enemies = 0;
        assert_eq!(drive(&mut runner, &mut log, 0.1, 1), Poll::Complete);
        assert_eq!(ticks_of(&log, "clear"), vec![6]);
    }

    #[test]
    fn test_yield_once_spreads_side_effects() {
        let script = repeat(3, |_, _: &mut Log| sequence(vec![yield_once(), note("spawn")]));
        let mut runner = ScriptRunner::new(script);
        let mut log = Log::default();
        let poll = drive(&mut runner, &mut log, 0.1, 3);
        assert_eq!(ticks_of(&log, "spawn"), vec![1, 2, 3]);
        assert_eq!(poll, Poll::Complete);
    }

    #[test]
    fn test_sequence_runs_atomically_between_suspensions() {
        let script = sequence(vec![note("a"), note("b"), note("c"), wait(1.0), note("d")]);
        let mut runner = ScriptRunner::new(script);
        let mut log = Log::default();
        drive(&mut runner, &mut log, 0.5, 1);
        assert_eq!(log.events, vec![(1, "a"), (1, "b"), (1, "c")]);
        drive(&mut runner, &mut log, 0.5, 1);
        assert_eq!(ticks_of(&log, "d"), vec![2]);
    }

    #[test]
    fn test_repeat_without_suspension_takes_one_tick_each() {
        let mut runner = ScriptRunner::new(forever(|_, _: &mut Log| note("tick")));
        let mut log = Log::default();
        drive(&mut runner, &mut log, 0.1, 4);
        // Start runs up to the first between-iteration yield, the first
        // resume happens in the same tick; afterwards one iteration per tick
        assert_eq!(ticks_of(&log, "tick"), vec![1, 1, 2, 3, 4]);
    }

    #[test]
    fn test_repeat_while_rechecks_condition() {
        let script = repeat_while(
            |log: &Log| log.enemies < 3,
            |_, _: &mut Log| {
                sequence(vec![
                    action(|log: &mut Log| {
                        log.enemies += 1;
                        Ok(())
                    }),
                    wait(1.0),
                ])
            },
        );
        let mut runner = ScriptRunner::new(script);
        let mut log = Log::default();
        let poll = drive(&mut runner, &mut log, 1.0, 3);
        assert_eq!(poll, Poll::Complete);
        assert_eq!(log.enemies, 3);
    }

    #[test]
    fn test_defer_reads_context_when_reached() {
        let script = sequence(vec![
            action(|log: &mut Log| {
                log.enemies = 7;
                Ok(())
            }),
            defer(|log: &mut Log| {
                let n = log.enemies;
                repeat(n, |_, _: &mut Log| sequence(vec![yield_once(), note("spawn")]))
            }),
        ]);
        let mut runner = ScriptRunner::new(script);
        let mut log = Log::default();
        drive(&mut runner, &mut log, 0.1, 10);
        assert_eq!(ticks_of(&log, "spawn").len(), 7);
        assert!(runner.is_done());
    }

    #[test]
    fn test_fire_on_cooldown_timing() {
        let script: BoxScript<Log> = Box::new(FireOnCooldown::new(
            Cooldown::new(1.0, 0.0),
            |_: &Log| true,
            |log: &mut Log| {
                log.note("fire");
                Ok(())
            },
        ));
        let mut runner = ScriptRunner::new(script);
        let mut log = Log::default();
        drive(&mut runner, &mut log, 0.5, 6);
        assert_eq!(ticks_of(&log, "fire"), vec![1, 3, 5]);
    }

    #[test]
    fn test_fire_on_cooldown_holds_without_target() {
        let script: BoxScript<Log> = Box::new(FireOnCooldown::new(
            Cooldown::new(1.0, 0.1),
            |log: &Log| log.enemies > 0,
            |log: &mut Log| {
                log.note("fire");
                Ok(())
            },
        ));
        let mut runner = ScriptRunner::new(script);
        let mut log = Log::default();
        drive(&mut runner, &mut log, 0.5, 4);
        assert!(log.events.is_empty());
        // Ready the moment a target shows up
        log.enemies = 1;
        drive(&mut runner, &mut log, 0.5, 1);
        assert_eq!(ticks_of(&log, "fire"), vec![5]);
    }

    #[test]
    fn test_burst_with_uneven_spacing() {
        let burst = forever(|_, _: &mut Log| {
            sequence(vec![
                wait(0.5),
                note("shot"),
                wait(0.5),
                note("shot"),
                wait(1.0),
                note("shot"),
            ])
        });
        let mut runner = ScriptRunner::new(burst);
        let mut log = Log::default();
        drive(&mut runner, &mut log, 0.25, 16);
        // Shots at 0.5 s, 1.0 s, 2.0 s, then the cycle repeats
        assert_eq!(ticks_of(&log, "shot"), vec![2, 4, 8, 10, 12, 16]);
    }

    #[test]
    fn test_errors_propagate_and_finish_runner() {
        let script = sequence(vec![
            wait(0.5),
            action(|_: &mut Log| Err(SimError::Script("boom".into()))),
        ]);
        let mut runner = ScriptRunner::new(script);
        let mut log = Log::default();
        assert!(runner.tick(0.25, &mut log).is_ok());
        assert!(matches!(runner.tick(0.25, &mut log), Err(SimError::Script(_))));
        assert!(runner.is_done());
        assert_eq!(runner.tick(0.25, &mut log).unwrap(), Poll::Complete);
    }
}
