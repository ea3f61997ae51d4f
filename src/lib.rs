//! Rowdy Radio.
//!
//! Two halves share this crate:
//!
//! - the **jukebox** (`rowdy-radio` binary): a web front end ([`server`])
//!   over a two-slot [`queue`] that submits songs to a generation service
//!   ([`gateway`]), polls them and plays the results ([`playback`]);
//! - the **ambient radio** (`paranoid-radio` binary): a [`pipeline`] that
//!   records the room ([`audio`]), transcribes it ([`stt`]), summarizes it
//!   ([`llm`]) and asks the jukebox for a song about it.

pub mod audio;
pub mod config;
pub mod gateway;
pub mod llm;
pub mod pipeline;
pub mod playback;
pub mod queue;
pub mod server;
pub mod shutdown;
pub mod stt;
