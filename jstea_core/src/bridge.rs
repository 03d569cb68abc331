//! The script/renderer bridge.
//!
//! Scripts declare `{init, update, view}` models; the renderer drives them
//! from its own thread through [`model::BridgeModel`], every script call
//! marshalled onto the script thread by the event loop. [`manager`] owns the
//! program lifecycle, [`throttle`] rate-limits view invocations.

pub mod manager;
pub mod model;
pub mod registry;
pub mod throttle;
