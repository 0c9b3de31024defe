// State machine module for the archivo lifecycle
//
// Fixed transition policy over a configurable state vocabulary, with
// atomic persistence of every transition plus its audit row.

pub mod archivo_state_machine;
pub mod errors;
pub mod events;
pub mod states;

pub use archivo_state_machine::ArchivoStateMachine;
pub use errors::{StateMachineError, StateMachineResult};
pub use events::ArchivoEvent;
pub use states::{ArchivoState, RtaProArchivoState};
