//! Centralized application state with context passing pattern
//!
//! 1. `AppState` is a single struct holding the fight
//! 2. Core functions take explicit references (`&mut Fight`, `&FightConfig`)
//! 3. WASM bindings are thin wrappers that extract from AppState and call into the core
//!
//! The core never touches the thread-local; it is only the holder the bindings use.

use std::cell::RefCell;

use crate::config::FightConfig;
use crate::error::FightError;
use crate::fight::Fight;

/// Functions should take explicit references to what they need, not access
/// this struct directly via globals.
#[derive(Debug)]
pub struct AppState {
    pub fight: Fight,
}

impl AppState {
    pub fn new(config: FightConfig) -> Result<Self, FightError> {
        Ok(Self {
            fight: Fight::new(config)?,
        })
    }
}

// Global state access, thin wrapper for WASM bindings only
thread_local! {
    static APP_STATE: RefCell<Option<AppState>> = const { RefCell::new(None) };
}

/// Execute a closure with immutable access to AppState
///
/// Returns None if AppState is not initialized
pub fn with_app_state<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&AppState) -> R,
{
    APP_STATE.with(|state| {
        let borrowed = state.borrow();
        borrowed.as_ref().map(f)
    })
}

/// Execute a closure with mutable access to AppState
///
/// Returns None if AppState is not initialized
pub fn with_app_state_mut<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut AppState) -> R,
{
    APP_STATE.with(|state| {
        let mut borrowed = state.borrow_mut();
        borrowed.as_mut().map(f)
    })
}

/// Initialize (or replace) the global AppState
///
/// Called from init_core()
pub fn initialize_app_state(config: FightConfig) -> Result<(), FightError> {
    let app = AppState::new(config)?;
    APP_STATE.with(|state| {
        *state.borrow_mut() = Some(app);
    });
    Ok(())
}
