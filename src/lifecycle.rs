//! Lifecycle manager
//!
//! Exactly one runtime instance per `Lifecycle`, brought up on first
//! `acquire()`:
//!
//! ```text
//! Uninitialized -> Initializing -> Ready
//!                              \-> Failed(cause)      (terminal, sticky)
//! any -> Released                                     (terminal)
//! ```
//!
//! Concurrent first callers block until the one running the boot function
//! finishes. A failure is recorded and returned to every later caller; boot
//! is never retried.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::{Condvar, Mutex};

use crate::config::RuntimeConf;
use crate::error::InitializationError;
use crate::interpreter::Interpreter;
use crate::loader::LibraryLoader;
use crate::vm::{Engine, EngineConfig};

/// Public view of the lifecycle state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuntimeState {
    Uninitialized,
    Initializing,
    Ready,
    Failed(InitializationError),
    Released,
}

enum State {
    Uninitialized,
    Initializing,
    Ready(Arc<Interpreter>),
    Failed(InitializationError),
    Released,
}

pub type BootFn = Box<dyn Fn() -> Result<Interpreter, InitializationError> + Send + Sync>;

pub struct Lifecycle {
    state: Mutex<State>,
    settled: Condvar,
    boot: BootFn,
    attempts: AtomicUsize,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// Lifecycle that boots the built-in runtime from the discovered
    /// configuration.
    pub fn new() -> Self {
        Self::with_boot(boot_default)
    }

    /// Lifecycle with a custom boot function.
    pub fn with_boot(
        boot: impl Fn() -> Result<Interpreter, InitializationError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            state: Mutex::new(State::Uninitialized),
            settled: Condvar::new(),
            boot: Box::new(boot),
            attempts: AtomicUsize::new(0),
        }
    }

    /// The ready runtime, initializing it on first use.
    pub fn acquire(&self) -> Result<Arc<Interpreter>, InitializationError> {
        let mut state = self.state.lock();
        loop {
            match &*state {
                State::Ready(interpreter) => return Ok(Arc::clone(interpreter)),
                State::Failed(cause) => return Err(cause.clone()),
                State::Released => return Err(InitializationError::Released),
                State::Initializing => {}
                State::Uninitialized => break,
            }
            self.settled.wait(&mut state);
        }
        *state = State::Initializing;
        drop(state);

        self.attempts.fetch_add(1, Ordering::SeqCst);
        let outcome = match catch_unwind(AssertUnwindSafe(|| (self.boot)())) {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(InitializationError::Panicked(message))
            }
        };

        let mut state = self.state.lock();
        let result = match outcome {
            Ok(interpreter) => {
                tracing::info!(runtime = interpreter.runtime_name(), "runtime initialized");
                let interpreter = Arc::new(interpreter);
                *state = State::Ready(Arc::clone(&interpreter));
                Ok(interpreter)
            }
            Err(cause) => {
                tracing::warn!("runtime initialization failed: {cause}");
                *state = State::Failed(cause.clone());
                Err(cause)
            }
        };
        self.settled.notify_all();
        result
    }

    /// Tear the runtime down. Returns whether a running runtime was
    /// finalized. The lifecycle cannot be acquired again afterwards.
    pub fn release(&self) -> bool {
        let mut state = self.state.lock();
        while matches!(*state, State::Initializing) {
            self.settled.wait(&mut state);
        }
        let previous = std::mem::replace(&mut *state, State::Released);
        drop(state);
        match previous {
            State::Ready(interpreter) => {
                interpreter.shutdown();
                true
            }
            _ => false,
        }
    }

    pub fn state(&self) -> RuntimeState {
        match &*self.state.lock() {
            State::Uninitialized => RuntimeState::Uninitialized,
            State::Initializing => RuntimeState::Initializing,
            State::Ready(_) => RuntimeState::Ready,
            State::Failed(cause) => RuntimeState::Failed(cause.clone()),
            State::Released => RuntimeState::Released,
        }
    }

    /// How many times the boot function ran (0 or 1).
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

/// Discover configuration, preload libraries, start the built-in runtime.
pub fn boot_default() -> Result<Interpreter, InitializationError> {
    let conf = RuntimeConf::discover()?;
    boot_with(&conf)
}

/// Boot the built-in runtime from an explicit configuration.
pub fn boot_with(conf: &RuntimeConf) -> Result<Interpreter, InitializationError> {
    let paths = LibraryLoader::load(conf)?;
    let engine = Engine::initialize(&EngineConfig {
        home: paths.home,
        lib_path: paths.lib_path,
        root_module: conf.root_module.clone(),
        seed: conf.seed,
    })
    .map_err(|e| InitializationError::Runtime(e.to_string()))?;
    Ok(Interpreter::new(Box::new(engine), conf.root_module.clone()))
}

static GLOBAL: OnceLock<Lifecycle> = OnceLock::new();

/// The process-wide lifecycle.
pub fn global() -> &'static Lifecycle {
    GLOBAL.get_or_init(Lifecycle::new)
}

/// Acquire the process-wide runtime.
pub fn acquire() -> Result<Arc<Interpreter>, InitializationError> {
    global().acquire()
}

/// Tear the process-wide runtime down.
pub fn release() -> bool {
    global().release()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_boot() -> Result<Interpreter, InitializationError> {
        boot_with(&RuntimeConf {
            seed: Some(1),
            ..RuntimeConf::default()
        })
    }

    #[test]
    fn test_state_transitions() {
        let lifecycle = Lifecycle::with_boot(engine_boot);
        assert_eq!(lifecycle.state(), RuntimeState::Uninitialized);
        lifecycle.acquire().unwrap();
        assert_eq!(lifecycle.state(), RuntimeState::Ready);
        assert!(lifecycle.release());
        assert_eq!(lifecycle.state(), RuntimeState::Released);
        assert!(!lifecycle.release());
        assert_eq!(lifecycle.acquire().unwrap_err(), InitializationError::Released);
    }

    #[test]
    fn test_panicking_boot_is_recorded() {
        let lifecycle = Lifecycle::with_boot(|| panic!("boom"));
        let err = lifecycle.acquire().unwrap_err();
        assert_eq!(err, InitializationError::Panicked("boom".to_string()));
        assert_eq!(lifecycle.acquire().unwrap_err(), err);
        assert_eq!(lifecycle.attempts(), 1);
    }

    #[test]
    fn test_release_before_acquire() {
        let lifecycle = Lifecycle::with_boot(engine_boot);
        assert!(!lifecycle.release());
        assert_eq!(lifecycle.attempts(), 0);
        assert_eq!(lifecycle.acquire().unwrap_err(), InitializationError::Released);
    }

    #[test]
    fn test_missing_home_fails_boot() {
        let conf = RuntimeConf {
            home: Some("/no/such/runtime/home".into()),
            ..RuntimeConf::default()
        };
        let err = boot_with(&conf).err().unwrap();
        assert!(matches!(err, InitializationError::Runtime(_)));
    }
}
