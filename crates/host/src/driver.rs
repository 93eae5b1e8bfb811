//! Single-shot invocation driver.

use std::fmt;
use std::mem;

use tracing::{debug, info, warn};
use value::{EvaluationRequest, EvaluationResultContext};

use crate::guest::{GuestComponent, GuestExports, GuestInstance};
use crate::{CapabilityProvider, Error, Result};

/// Where a [`Driver`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Instantiated,
    Ready,
    Invoking,
    Completed,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Instantiated => "instantiated",
            Phase::Ready => "ready",
            Phase::Invoking => "invoking",
            Phase::Completed => "completed",
            Phase::Failed => "failed",
        })
    }
}

type Instance<C> = <C as GuestComponent>::Instance;
type Exports<C> = <Instance<C> as GuestInstance>::Exports;

enum State<C: GuestComponent> {
    Uninitialized {
        component: C,
        provider: CapabilityProvider,
    },
    Instantiated(Instance<C>),
    Ready(Exports<C>),
    Invoking,
    Completed,
    Failed(String),
}

impl<C: GuestComponent> State<C> {
    fn phase(&self) -> Phase {
        match self {
            State::Uninitialized { .. } => Phase::Uninitialized,
            State::Instantiated(_) => Phase::Instantiated,
            State::Ready(_) => Phase::Ready,
            State::Invoking => Phase::Invoking,
            State::Completed => Phase::Completed,
            State::Failed(_) => Phase::Failed,
        }
    }
}

/// Drives one guest through instantiate, bind, and a single `eval`.
///
/// Transitions only move forward:
///
/// ```text
/// Uninitialized -> Instantiated -> Ready -> Invoking -> Completed
///                                                    \-> Failed
/// ```
///
/// Any step may end in `Failed`; nothing is retried. Calling a step out of
/// order returns [`Error::InvalidState`] and leaves the phase unchanged.
pub struct Driver<C: GuestComponent> {
    state: State<C>,
}

impl<C: GuestComponent> Driver<C> {
    pub fn new(component: C, provider: CapabilityProvider) -> Self {
        Self {
            state: State::Uninitialized {
                component,
                provider,
            },
        }
    }

    /// Run every transition once and return the evaluation result.
    pub fn run(
        component: C,
        provider: CapabilityProvider,
        request: &EvaluationRequest,
    ) -> Result<EvaluationResultContext> {
        let mut driver = Self::new(component, provider);
        driver.instantiate()?;
        driver.bind()?;
        driver.invoke(request)
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// The message of the error that moved the driver to `Failed`.
    pub fn failure(&self) -> Option<&str> {
        match &self.state {
            State::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn instantiate(&mut self) -> Result<()> {
        match mem::replace(&mut self.state, State::Invoking) {
            State::Uninitialized {
                component,
                provider,
            } => match component.instantiate(provider) {
                Ok(instance) => {
                    info!("guest instantiated");
                    self.state = State::Instantiated(instance);
                    Ok(())
                }
                Err(error) => Err(self.fail("instantiate", error)),
            },
            other => Err(self.restore(other, "instantiate")),
        }
    }

    pub fn bind(&mut self) -> Result<()> {
        match mem::replace(&mut self.state, State::Invoking) {
            State::Instantiated(instance) => match instance.bind() {
                Ok(exports) => {
                    debug!("guest exports bound");
                    self.state = State::Ready(exports);
                    Ok(())
                }
                Err(error) => Err(self.fail("bind", error)),
            },
            other => Err(self.restore(other, "bind")),
        }
    }

    /// The guest's version string. Allowed while `Ready`.
    pub fn version(&mut self) -> Result<String> {
        let outcome = match &mut self.state {
            State::Ready(exports) => exports.version(),
            _ => return Err(self.reject("version")),
        };
        outcome.map_err(|error| self.fail("version", error))
    }

    /// Make the one `eval` call.
    ///
    /// A guest-reported failure becomes [`Error::Evaluation`] carrying the
    /// guest's message unchanged.
    pub fn invoke(&mut self, request: &EvaluationRequest) -> Result<EvaluationResultContext> {
        let mut exports = match mem::replace(&mut self.state, State::Invoking) {
            State::Ready(exports) => exports,
            other => return Err(self.restore(other, "invoke")),
        };

        info!(policy = %request.name, "invoking guest");
        let outcome = exports
            .eval(request)
            .and_then(|result| result.map_err(Error::Evaluation));
        drop(exports);

        match outcome {
            Ok(context) => {
                info!(satisfied = context.satisfied(), "evaluation completed");
                self.state = State::Completed;
                Ok(context)
            }
            Err(error) => Err(self.fail("invoke", error)),
        }
    }

    fn restore(&mut self, state: State<C>, operation: &str) -> Error {
        self.state = state;
        self.reject(operation)
    }

    fn reject(&self, operation: &str) -> Error {
        warn!(operation, phase = %self.phase(), "operation out of phase");
        Error::InvalidState(format!("cannot {operation} while {}", self.phase()))
    }

    fn fail(&mut self, operation: &str, error: Error) -> Error {
        warn!(operation, %error, "driver failed");
        self.state = State::Failed(error.to_string());
        error
    }
}

impl<C: GuestComponent> fmt::Debug for Driver<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("phase", &self.phase())
            .field("failure", &self.failure())
            .finish()
    }
}
