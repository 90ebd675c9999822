//! AcTEC gateway wire protocol
//!
//! This crate provides the pieces of the protocol that involve no I/O:
//!
//! - [`FrameCodec`] / [`encode_frame`] / [`decode_frame`] - the
//!   `[AT<token><len><json>]` framing
//! - [`Message`] and [`Header`] - the `[header, body]` envelope
//! - [`commands`] - constructors for every command the client sends
//! - [`Inbound`] - classification of everything the hub sends back
//! - [`PropertyValue`] - typed device/group property values
//! - [`topology`] - the floor/room/device report and area naming policy

pub mod commands;
mod error;
mod frame;
mod inbound;
mod message;
pub mod property;
pub mod topology;

pub use error::{FrameError, ProtocolResult};
pub use frame::{
    decode_frame, encode_frame, frame_len, FrameCodec, FRAME_END, FRAME_START, LENGTH_DIGITS,
    MAX_CONTENT_LEN, PREAMBLE_LEN, TOKEN_LEN, VENDOR_TAG,
};
pub use inbound::{Inbound, OperationKind, PropertyKey, PropertyReport};
pub use message::{Header, Message, Token};
pub use property::PropertyValue;
pub use topology::{AreaNameRule, FloorInfo, Report, TopologyError};
