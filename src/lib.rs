/// ==============================================================================================
/// ========================================= ssanet ===============================================
/// ==============================================================================================
//
// Stochastic node-network simulation engine: a Gillespie direct-method SSA runs independently on
// each node, interleaved at integer tick boundaries with scheduled discrete events (EXIT, ENTER,
// INTERNAL_TRANSFER, EXTERNAL_TRANSFER). See `SPEC_FULL.md` for the full design.

pub mod driver;
pub mod error;
pub mod event;
pub mod gdata;
pub mod logging;
pub mod model;
pub mod node;
pub mod propensity;
pub mod recorder;
pub mod rng;
pub mod sparse;
pub mod status;

pub use driver::{run, SimOutput};
pub use error::{ErrorKind, Partial, Result, SimError};
pub use event::{Event, EventKind};
pub use gdata::GlobalData;
pub use model::{unnamed_gdata, Model, ModelInputs, PostStep, PostStepSignal};
pub use node::NodeState;
pub use propensity::{Closure, Propensity, Registry};
pub use recorder::{Recorder, SparseMask};
pub use rng::WorkerRng;
pub use sparse::CscMatrix;
pub use status::Status;
